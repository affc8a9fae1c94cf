//! Advertised identity and legacy advertising payload
//!
//! The payload carries an AD `Flags` structure followed by the local name.
//! When the name does not fit the 31-byte legacy payload it is sent as a
//! Shortened Local Name, cut on a character boundary.

use crate::config::advertising::MAX_ADV_DATA_LEN;
use crate::config::gap::{DEVICE_NAME, MAX_DEVICE_NAME_LEN};
use heapless::String;

/// AD type: Flags
const AD_FLAGS: u8 = 0x01;
/// AD type: Shortened Local Name
const AD_SHORTENED_LOCAL_NAME: u8 = 0x08;
/// AD type: Complete Local Name
const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// Flags bit: LE Limited Discoverable Mode
pub const LE_LIMITED_DISCOVERABLE: u8 = 0x01;
/// Flags bit: LE General Discoverable Mode
pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
/// Flags bit: BR/EDR Not Supported
pub const BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// Encoded advertising payload
pub type AdvData = [u8; MAX_ADV_DATA_LEN];

/// Discoverability mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discoverability {
    NonDiscoverable,
    Limited,
    General,
}

impl Discoverability {
    fn flags(&self) -> u8 {
        match self {
            Discoverability::NonDiscoverable => 0,
            Discoverability::Limited => LE_LIMITED_DISCOVERABLE,
            Discoverability::General => LE_GENERAL_DISCOVERABLE,
        }
    }
}

/// Connection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Broadcast only, no central can connect
    NonConnectable,
    /// Any central may connect
    Undirected,
}

/// Errors building an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// Name longer than `MAX_DEVICE_NAME_LEN` bytes
    NameTooLong,
}

/// Who we say we are while advertising
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedIdentity {
    name: String<MAX_DEVICE_NAME_LEN>,
    discoverability: Discoverability,
    connection_mode: ConnectionMode,
}

impl AdvertisedIdentity {
    /// Generally discoverable, connectable identity with the given name
    pub fn new(name: &str) -> Result<Self, IdentityError> {
        let mut owned = String::new();
        owned.push_str(name).map_err(|_| IdentityError::NameTooLong)?;

        Ok(Self {
            name: owned,
            discoverability: Discoverability::General,
            connection_mode: ConnectionMode::Undirected,
        })
    }

    pub fn with_discoverability(mut self, discoverability: Discoverability) -> Self {
        self.discoverability = discoverability;
        self
    }

    pub fn with_connection_mode(mut self, connection_mode: ConnectionMode) -> Self {
        self.connection_mode = connection_mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discoverability(&self) -> Discoverability {
        self.discoverability
    }

    pub fn connection_mode(&self) -> ConnectionMode {
        self.connection_mode
    }

    pub fn is_connectable(&self) -> bool {
        self.connection_mode == ConnectionMode::Undirected
    }

    /// Value of the AD Flags structure
    pub fn ad_flags(&self) -> u8 {
        self.discoverability.flags() | BR_EDR_NOT_SUPPORTED
    }

    /// Encode the legacy advertising payload into `buf`, returning its length
    pub fn encode_adv_data(&self, buf: &mut AdvData) -> usize {
        buf[0] = 2;
        buf[1] = AD_FLAGS;
        buf[2] = self.ad_flags();
        let mut pos = 3;

        if self.name.is_empty() {
            return pos;
        }

        // length byte + type byte
        let room = MAX_ADV_DATA_LEN - pos - 2;
        let (name, ad_type) = if self.name.len() <= room {
            (self.name.as_str(), AD_COMPLETE_LOCAL_NAME)
        } else {
            let mut cut = room;
            while !self.name.is_char_boundary(cut) {
                cut -= 1;
            }
            (&self.name[..cut], AD_SHORTENED_LOCAL_NAME)
        };

        buf[pos] = (name.len() + 1) as u8;
        buf[pos + 1] = ad_type;
        pos += 2;
        buf[pos..pos + name.len()].copy_from_slice(name.as_bytes());
        pos + name.len()
    }
}

impl Default for AdvertisedIdentity {
    fn default() -> Self {
        let mut name = String::new();
        let _ = name.push_str(DEVICE_NAME);

        Self {
            name,
            discoverability: Discoverability::General,
            connection_mode: ConnectionMode::Undirected,
        }
    }
}
