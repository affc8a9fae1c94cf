//! Attribute table trait for abstraction and testability
//!
//! This trait is the boundary to the host stack's GATT server. The registry
//! drives it in two passes: `reserve` sizes the table for the whole layout,
//! then `add_service` installs each service in order.

use crate::config::gatt::MAX_CHARACTERISTICS_PER_SERVICE;
use crate::gatt::registry::Service;
use heapless::Vec;

/// Attribute handle assigned by the stack
pub type AttributeHandle = u16;

/// Errors reported by the stack's attribute table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// Not enough room in the attribute table
    NoMemory,
    /// The stack rejected a definition (bad UUID, duplicate, bad flags)
    InvalidDefinition,
    /// The table is already finalised
    AlreadyStarted,
}

/// Sizes reported to the stack during the count pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableLayout {
    pub services: usize,
    pub characteristics: usize,
}

impl TableLayout {
    /// Attributes needed: one declaration per service, a declaration and a
    /// value per characteristic
    pub fn attributes(&self) -> usize {
        self.services + 2 * self.characteristics
    }
}

/// Handles assigned to one installed service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandles {
    /// Service declaration handle
    pub service: AttributeHandle,
    /// Value handle of each characteristic, in definition order
    pub values: Vec<AttributeHandle, MAX_CHARACTERISTICS_PER_SERVICE>,
}

/// Abstract attribute table for testability
pub trait AttributeStore {
    /// Count pass: reserve capacity for the whole layout
    fn reserve(&mut self, layout: &TableLayout) -> Result<(), StackError>;

    /// Add pass: install one service and its characteristics
    fn add_service(&mut self, service: &Service<'_>) -> Result<ServiceHandles, StackError>;
}
