//! Agreement identification and configuration
//!
//! A Block Ack agreement is negotiated per (peer link-layer address, traffic
//! class) pair. The negotiation handshake itself is external to this crate;
//! this module holds the identifying types, the parameter validation both
//! agreement roles share, and the per-agreement statistics counters.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum negotiable reordering buffer size, in MPDUs
pub const MAX_BUFFER_SIZE: u16 = 1024;

/// Maximum traffic class identifier (4-bit TID)
pub const MAX_TRAFFIC_CLASS: u8 = 15;

/// Agreement errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementError {
    #[error("Buffer size {0} outside valid range 1..={MAX_BUFFER_SIZE}")]
    InvalidBufferSize(u16),

    #[error("Traffic class {0} exceeds maximum {MAX_TRAFFIC_CLASS}")]
    InvalidTrafficClass(u8),
}

/// Validate negotiated agreement parameters
pub(crate) fn validate_parameters(buffer_size: u16, tid: u8) -> Result<(), AgreementError> {
    if buffer_size == 0 || buffer_size > MAX_BUFFER_SIZE {
        return Err(AgreementError::InvalidBufferSize(buffer_size));
    }
    if tid > MAX_TRAFFIC_CLASS {
        return Err(AgreementError::InvalidTrafficClass(tid));
    }
    Ok(())
}

/// 48-bit link-layer address of an agreement peer
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Create an address from its six octets
    pub fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }

    /// Get the six octets
    pub fn octets(self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

/// Error parsing a textual MAC address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid MAC address: {0}")]
pub struct MacAddressParseError(String);

impl FromStr for MacAddress {
    type Err = MacAddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');

        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| MacAddressParseError(s.to_string()))?;
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| MacAddressParseError(s.to_string()))?;
        }

        if parts.next().is_some() {
            return Err(MacAddressParseError(s.to_string()));
        }

        Ok(MacAddress(octets))
    }
}

/// Key identifying one agreement: peer address plus traffic class
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct AgreementKey {
    /// Peer link-layer address
    pub peer: MacAddress,
    /// Traffic class identifier (TID)
    pub tid: u8,
}

impl AgreementKey {
    /// Create a new agreement key
    pub fn new(peer: MacAddress, tid: u8) -> Self {
        AgreementKey { peer, tid }
    }
}

impl fmt::Display for AgreementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.peer, self.tid)
    }
}

/// Originator-side agreement statistics
#[derive(Debug, Clone, Default)]
pub struct OriginatorStats {
    /// MPDUs acknowledged by the recipient
    pub mpdus_acked: u64,
    /// MPDUs given up on by the retry-limit collaborator
    pub mpdus_discarded: u64,
    /// Positions settled implicitly by transmitting beyond the window end
    pub implicitly_settled: u64,
}

/// Recipient-side agreement statistics
#[derive(Debug, Clone, Default)]
pub struct RecipientStats {
    /// MPDUs delivered in order to the upper layer
    pub mpdus_delivered: u64,
    /// Stale retransmissions dropped (old half of the sequence space)
    pub stale_dropped: u64,
    /// Duplicate receptions that overwrote a buffered payload
    pub duplicates_overwritten: u64,
    /// Window positions abandoned as permanent holes
    pub holes_abandoned: u64,
    /// Block Ack Requests processed
    pub bars_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_display_parse_roundtrip() {
        let addr = MacAddress::new([0x00, 0x1b, 0x44, 0x11, 0x3a, 0xb7]);
        let text = addr.to_string();
        assert_eq!(text, "00:1b:44:11:3a:b7");
        assert_eq!(text.parse::<MacAddress>().unwrap(), addr);
    }

    #[test]
    fn test_mac_parse_rejects_malformed() {
        assert!("00:1b:44:11:3a".parse::<MacAddress>().is_err());
        assert!("00:1b:44:11:3a:b7:ff".parse::<MacAddress>().is_err());
        assert!("00:1b:44:11:3a:zz".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_parameter_validation() {
        assert!(validate_parameters(64, 3).is_ok());
        assert!(validate_parameters(1, 0).is_ok());
        assert!(validate_parameters(MAX_BUFFER_SIZE, MAX_TRAFFIC_CLASS).is_ok());
        assert_eq!(
            validate_parameters(0, 0),
            Err(AgreementError::InvalidBufferSize(0))
        );
        assert_eq!(
            validate_parameters(MAX_BUFFER_SIZE + 1, 0),
            Err(AgreementError::InvalidBufferSize(MAX_BUFFER_SIZE + 1))
        );
        assert_eq!(
            validate_parameters(64, 16),
            Err(AgreementError::InvalidTrafficClass(16))
        );
    }
}
