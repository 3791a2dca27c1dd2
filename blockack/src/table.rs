//! Agreement table
//!
//! Agreements are keyed by (peer address, traffic class). There is no
//! process-wide registry: the channel-access collaborator owns a table and
//! passes the agreements it looks up into the protocol operations.

use blockack_protocol::reorder::RecipientAgreement;
use blockack_protocol::sequence::SeqNumber;
use blockack_protocol::window::OriginatorAgreement;
use blockack_protocol::{AgreementError, AgreementKey, MacAddress};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Agreement table errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Agreement {0} already established")]
    AlreadyEstablished(AgreementKey),

    #[error("Agreement error: {0}")]
    Agreement(#[from] AgreementError),
}

/// Per-role agreement storage for one station
#[derive(Default)]
pub struct AgreementTable {
    originators: HashMap<AgreementKey, OriginatorAgreement>,
    recipients: HashMap<AgreementKey, RecipientAgreement>,
}

impl AgreementTable {
    /// Create an empty table
    pub fn new() -> Self {
        AgreementTable::default()
    }

    /// Establish an originator agreement after a successful negotiation
    pub fn establish_originator(
        &mut self,
        peer: MacAddress,
        tid: u8,
        buffer_size: u16,
        starting_seq: SeqNumber,
    ) -> Result<(), TableError> {
        let key = AgreementKey::new(peer, tid);
        if self.originators.contains_key(&key) {
            return Err(TableError::AlreadyEstablished(key));
        }
        let agreement = OriginatorAgreement::new(peer, tid, buffer_size, starting_seq)?;
        debug!(agreement = %key, buffer_size, "Originator agreement established");
        self.originators.insert(key, agreement);
        Ok(())
    }

    /// Establish a recipient agreement after a successful negotiation
    pub fn establish_recipient(
        &mut self,
        peer: MacAddress,
        tid: u8,
        buffer_size: u16,
        starting_seq: SeqNumber,
    ) -> Result<(), TableError> {
        let key = AgreementKey::new(peer, tid);
        if self.recipients.contains_key(&key) {
            return Err(TableError::AlreadyEstablished(key));
        }
        let agreement = RecipientAgreement::new(peer, tid, buffer_size, starting_seq)?;
        debug!(agreement = %key, buffer_size, "Recipient agreement established");
        self.recipients.insert(key, agreement);
        Ok(())
    }

    /// Look up an originator agreement
    pub fn originator(&self, key: &AgreementKey) -> Option<&OriginatorAgreement> {
        self.originators.get(key)
    }

    /// Look up an originator agreement for mutation
    pub fn originator_mut(&mut self, key: &AgreementKey) -> Option<&mut OriginatorAgreement> {
        self.originators.get_mut(key)
    }

    /// Look up a recipient agreement
    pub fn recipient(&self, key: &AgreementKey) -> Option<&RecipientAgreement> {
        self.recipients.get(key)
    }

    /// Look up a recipient agreement for mutation
    pub fn recipient_mut(&mut self, key: &AgreementKey) -> Option<&mut RecipientAgreement> {
        self.recipients.get_mut(key)
    }

    /// Tear down an originator agreement on handshake teardown or timeout
    pub fn remove_originator(&mut self, key: &AgreementKey) -> Option<OriginatorAgreement> {
        let removed = self.originators.remove(key);
        if removed.is_some() {
            debug!(agreement = %key, "Originator agreement torn down");
        }
        removed
    }

    /// Tear down a recipient agreement on handshake teardown or timeout
    pub fn remove_recipient(&mut self, key: &AgreementKey) -> Option<RecipientAgreement> {
        let removed = self.recipients.remove(key);
        if removed.is_some() {
            debug!(agreement = %key, "Recipient agreement torn down");
        }
        removed
    }

    /// Number of established agreements, both roles
    pub fn len(&self) -> usize {
        self.originators.len() + self.recipients.len()
    }

    /// Whether no agreement is established
    pub fn is_empty(&self) -> bool {
        self.originators.is_empty() && self.recipients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(tag: u8) -> MacAddress {
        MacAddress::new([2, 0, 0, 0, 0, tag])
    }

    #[test]
    fn test_establish_and_lookup() {
        let mut table = AgreementTable::new();
        table
            .establish_originator(peer(1), 3, 64, SeqNumber::new(0))
            .unwrap();
        table
            .establish_recipient(peer(1), 3, 64, SeqNumber::new(0))
            .unwrap();

        let key = AgreementKey::new(peer(1), 3);
        assert!(table.originator(&key).is_some());
        assert!(table.recipient(&key).is_some());
        assert_eq!(table.len(), 2);

        // Same peer, different traffic class: independent agreement
        assert!(table.originator(&AgreementKey::new(peer(1), 4)).is_none());
    }

    #[test]
    fn test_duplicate_establishment_rejected() {
        let mut table = AgreementTable::new();
        table
            .establish_originator(peer(1), 0, 64, SeqNumber::new(0))
            .unwrap();

        let err = table
            .establish_originator(peer(1), 0, 128, SeqNumber::new(5))
            .unwrap_err();
        assert_eq!(
            err,
            TableError::AlreadyEstablished(AgreementKey::new(peer(1), 0))
        );
    }

    #[test]
    fn test_invalid_parameters_propagate() {
        let mut table = AgreementTable::new();
        let err = table
            .establish_recipient(peer(1), 0, 0, SeqNumber::new(0))
            .unwrap_err();
        assert_eq!(
            err,
            TableError::Agreement(AgreementError::InvalidBufferSize(0))
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_teardown() {
        let mut table = AgreementTable::new();
        table
            .establish_originator(peer(2), 1, 32, SeqNumber::new(100))
            .unwrap();

        let key = AgreementKey::new(peer(2), 1);
        assert!(table.remove_originator(&key).is_some());
        assert!(table.remove_originator(&key).is_none());
        assert!(table.is_empty());
    }
}
