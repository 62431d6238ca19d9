//! Per-channel MTU state
use super::constants::ATT_DEFAULT_MTU;

/// MTU bookkeeping for one ATT channel.
///
/// Response sizing uses the default MTU of 23 until a well-formed MTU
/// exchange has happened, after which it is `min(local, peer)`. A peer that
/// announces less than the default is treated as announcing the default;
/// the original stack deliberately floors rather than rejecting, and that
/// contract is kept here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMtu {
    local: u16,
    peer: u16,
    exchanged: bool,
}

impl ChannelMtu {
    /// State for a fresh channel whose local Rx MTU is `local`.
    pub fn new(local: u16) -> Self {
        Self {
            local: local.max(ATT_DEFAULT_MTU),
            peer: ATT_DEFAULT_MTU,
            exchanged: false,
        }
    }

    /// Records the peer's Client Rx MTU and returns the Server Rx MTU to
    /// answer with.
    pub fn exchange(&mut self, client_rx_mtu: u16) -> u16 {
        self.peer = client_rx_mtu.max(ATT_DEFAULT_MTU);
        self.exchanged = true;
        self.local
    }

    /// The MTU responses on this channel must fit in.
    pub fn effective(&self) -> u16 {
        if self.exchanged {
            self.local.min(self.peer)
        } else {
            ATT_DEFAULT_MTU
        }
    }

    /// Whether an MTU exchange has completed on this channel.
    pub fn is_exchanged(&self) -> bool {
        self.exchanged
    }

    /// The peer MTU currently in effect (post-floor).
    pub fn peer(&self) -> u16 {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_until_exchanged() {
        let mtu = ChannelMtu::new(100);
        assert_eq!(mtu.effective(), ATT_DEFAULT_MTU);
        assert!(!mtu.is_exchanged());
    }

    #[test]
    fn low_peer_mtu_is_floored() {
        let mut mtu = ChannelMtu::new(ATT_DEFAULT_MTU);
        let server_mtu = mtu.exchange(5);
        assert_eq!(server_mtu, ATT_DEFAULT_MTU);
        assert_eq!(mtu.peer(), ATT_DEFAULT_MTU);
        assert_eq!(mtu.effective(), ATT_DEFAULT_MTU);
    }

    #[test]
    fn effective_is_min_of_both_sides() {
        let mut mtu = ChannelMtu::new(50);
        mtu.exchange(100);
        assert_eq!(mtu.effective(), 50);

        let mut mtu = ChannelMtu::new(100);
        mtu.exchange(50);
        assert_eq!(mtu.effective(), 50);
    }
}
