//! The single connection slot

/// Stack-assigned connection handle of a remote central
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerHandle(pub u16);

/// Lifecycle state of the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Neither advertising nor connected
    Idle,
    /// Waiting for a central to connect
    Advertising,
    /// Serving one central
    Connected,
}

/// Current state plus the peer, which is present only while connected.
///
/// Mutated only by the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSlot {
    state: SlotState,
    peer: Option<PeerHandle>,
}

impl ConnectionSlot {
    pub const fn new() -> Self {
        Self {
            state: SlotState::Idle,
            peer: None,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn peer(&self) -> Option<PeerHandle> {
        self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.state == SlotState::Connected
    }

    pub(crate) fn set_idle(&mut self) {
        self.state = SlotState::Idle;
        self.peer = None;
    }

    pub(crate) fn set_advertising(&mut self) {
        self.state = SlotState::Advertising;
        self.peer = None;
    }

    /// Occupy the slot with `peer`. Fails with the current peer if taken.
    pub(crate) fn connect(&mut self, peer: PeerHandle) -> Result<(), Option<PeerHandle>> {
        if self.state != SlotState::Advertising {
            return Err(self.peer);
        }
        self.state = SlotState::Connected;
        self.peer = Some(peer);
        Ok(())
    }
}

impl Default for ConnectionSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_is_idle_without_peer() {
        let slot = ConnectionSlot::new();
        assert_eq!(slot.state(), SlotState::Idle);
        assert_eq!(slot.peer(), None);
    }

    #[test]
    fn test_connect_only_from_advertising() {
        let mut slot = ConnectionSlot::new();
        assert_eq!(slot.connect(PeerHandle(1)), Err(None));

        slot.set_advertising();
        assert_eq!(slot.connect(PeerHandle(1)), Ok(()));
        assert_eq!(slot.peer(), Some(PeerHandle(1)));

        assert_eq!(slot.connect(PeerHandle(2)), Err(Some(PeerHandle(1))));
        assert_eq!(slot.peer(), Some(PeerHandle(1)));
    }

    #[test]
    fn test_leaving_connected_clears_peer() {
        let mut slot = ConnectionSlot::new();
        slot.set_advertising();
        slot.connect(PeerHandle(9)).unwrap();

        slot.set_advertising();
        assert_eq!(slot.peer(), None);
        assert!(!slot.is_connected());
    }
}
