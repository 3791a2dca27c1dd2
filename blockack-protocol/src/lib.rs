//! Block Ack Protocol Core Implementation
//!
//! This crate implements the acknowledgment-aggregation engine of a wireless
//! link-layer MAC: the cyclic 12-bit sequence number space, the
//! originator-side transmit window, the recipient-side reorder buffer and
//! scoreboard, and the Block Ack bitmap wire codec in both its compressed
//! and multi-recipient forms.
//!
//! The engine performs no I/O and keeps no global state. Each agreement is
//! driven by external collaborators (channel access, frame reception, retry
//! logic) from a single execution context at a time; distinct agreements
//! are fully independent.

pub mod agreement;
pub mod bitmap;
pub mod reorder;
pub mod sequence;
pub mod window;

pub use agreement::{
    AgreementError, AgreementKey, MacAddress, OriginatorStats, RecipientStats, MAX_BUFFER_SIZE,
    MAX_TRAFFIC_CLASS,
};
pub use bitmap::{
    AckSubfield, BitmapLength, BlockAck, BlockAckBitmap, BlockAckReq, CodecError,
    CompressedBlockAck, MultiRecipientBlockAck, RecipientInfo,
};
pub use reorder::{Mpdu, RecipientAgreement, ReorderBuffer, Scoreboard};
pub use sequence::{SeqControl, SeqNumber, MAX_SEQ_NUMBER, SEQ_SPACE_HALF_SIZE, SEQ_SPACE_SIZE};
pub use window::{OriginatorAgreement, SlotStatus, TransmitWindow};
