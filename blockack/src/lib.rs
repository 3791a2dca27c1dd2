//! Block Ack - wireless MAC acknowledgment aggregation
//!
//! High-level API over the protocol core: thread-safe agreement handles,
//! channel-based upper-layer delivery, and the agreement table owned by the
//! channel-access collaborator.

pub use blockack_protocol as protocol;

pub mod session;
pub mod table;

// Re-export commonly used types
pub use protocol::{
    AgreementError, AgreementKey, BitmapLength, BlockAck, BlockAckBitmap, BlockAckReq,
    CompressedBlockAck, MacAddress, Mpdu, MultiRecipientBlockAck, OriginatorAgreement,
    RecipientAgreement, SeqControl, SeqNumber,
};
pub use session::{ChannelRecipient, SharedOriginator};
pub use table::{AgreementTable, TableError};
