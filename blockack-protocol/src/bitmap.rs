//! Block Ack bitmap and frame serialization
//!
//! The acknowledgment state crossing the wire is a variable-length bitmap:
//! bit `j` of octet `k` reports the MPDU at relative position `8k + j` from
//! the frame's starting sequence number. The single-recipient ("compressed")
//! form carries one starting sequence control and one bitmap; the
//! multi-recipient form carries a sequence of independently sized subfields,
//! one per recipient. The multi-recipient form is self-describing but not
//! self-delimiting: the per-subfield bitmap lengths are fixed at agreement
//! negotiation time and must be supplied to the decoder.
//!
//! Decoding is pure: it never mutates a window or buffer. Callers apply a
//! decoded bitmap through the agreement notify operations.

use crate::sequence::SeqControl;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// Largest bitmap size on the wire, in octets
pub const MAX_BITMAP_OCTETS: usize = 32;

/// Codec errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("Bitmap length {0} is not one of 1, 2, 4, 8, 16, 32 octets")]
    InvalidBitmapLength(usize),

    #[error("Frame truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{0} trailing bytes after the declared subfields")]
    TrailingBytes(usize),
}

/// Valid on-wire bitmap length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapLength {
    Octets1 = 1,
    Octets2 = 2,
    Octets4 = 4,
    Octets8 = 8,
    Octets16 = 16,
    Octets32 = 32,
}

impl BitmapLength {
    /// All valid lengths, smallest first
    pub const ALL: [BitmapLength; 6] = [
        BitmapLength::Octets1,
        BitmapLength::Octets2,
        BitmapLength::Octets4,
        BitmapLength::Octets8,
        BitmapLength::Octets16,
        BitmapLength::Octets32,
    ];

    /// Validate an octet count against the allowed set
    pub fn from_octets(octets: usize) -> Result<Self, CodecError> {
        match octets {
            1 => Ok(BitmapLength::Octets1),
            2 => Ok(BitmapLength::Octets2),
            4 => Ok(BitmapLength::Octets4),
            8 => Ok(BitmapLength::Octets8),
            16 => Ok(BitmapLength::Octets16),
            32 => Ok(BitmapLength::Octets32),
            other => Err(CodecError::InvalidBitmapLength(other)),
        }
    }

    /// Length in octets
    #[inline]
    pub fn octets(self) -> usize {
        self as usize
    }

    /// Length in bit positions
    #[inline]
    pub fn bits(self) -> usize {
        self.octets() * 8
    }
}

/// Acknowledgment bitmap of one of the valid wire lengths
///
/// Positions at or beyond the bitmap length always read as 0.
#[derive(Clone, PartialEq, Eq)]
pub struct BlockAckBitmap {
    len: BitmapLength,
    octets: [u8; MAX_BITMAP_OCTETS],
}

impl BlockAckBitmap {
    /// Create an all-zero bitmap of the given length
    pub fn new(len: BitmapLength) -> Self {
        BlockAckBitmap {
            len,
            octets: [0; MAX_BITMAP_OCTETS],
        }
    }

    /// Get the bitmap length
    #[inline]
    pub fn len(&self) -> BitmapLength {
        self.len
    }

    /// Set the bit for a relative position
    ///
    /// # Panics
    /// Panics if `position` is at or beyond the bitmap length
    pub fn set(&mut self, position: usize) {
        assert!(
            position < self.len.bits(),
            "Position {} beyond bitmap of {} bits",
            position,
            self.len.bits()
        );
        self.octets[position / 8] |= 1 << (position % 8);
    }

    /// Read the bit for a relative position
    ///
    /// Positions beyond the bitmap length read as 0.
    #[inline]
    pub fn is_set(&self, position: usize) -> bool {
        if position >= self.len.bits() {
            return false;
        }
        self.octets[position / 8] & (1 << (position % 8)) != 0
    }

    /// Whether every position within the bitmap length is set
    pub fn all_set(&self) -> bool {
        self.octets[..self.len.octets()].iter().all(|&o| o == 0xFF)
    }

    /// Whether no position is set
    pub fn none_set(&self) -> bool {
        self.octets[..self.len.octets()].iter().all(|&o| o == 0)
    }

    /// Iterate over the set positions in increasing order
    pub fn set_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len.bits()).filter(move |&p| self.is_set(p))
    }

    /// Serialize the bitmap octets
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.octets[..self.len.octets()])
    }

    /// Parse a bitmap from wire octets
    ///
    /// The byte count must be one of the valid lengths.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let len = BitmapLength::from_octets(bytes.len())?;
        let mut octets = [0; MAX_BITMAP_OCTETS];
        octets[..bytes.len()].copy_from_slice(bytes);
        Ok(BlockAckBitmap { len, octets })
    }

    /// Access the raw octets within the bitmap length
    pub fn as_octets(&self) -> &[u8] {
        &self.octets[..self.len.octets()]
    }
}

impl fmt::Debug for BlockAckBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockAckBitmap[")?;
        for (i, octet) in self.as_octets().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", octet)?;
        }
        write!(f, "]")
    }
}

/// Single-recipient (compressed) Block Ack frame body
///
/// Two octets of starting sequence control, little-endian, followed by the
/// bitmap octets. The bitmap length is inferred from the byte count on
/// decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlockAck {
    /// Starting sequence control the bitmap is anchored at
    pub start: SeqControl,
    /// Reception status bitmap
    pub bitmap: BlockAckBitmap,
}

impl CompressedBlockAck {
    /// Create a new compressed Block Ack
    pub fn new(start: SeqControl, bitmap: BlockAckBitmap) -> Self {
        CompressedBlockAck { start, bitmap }
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.bitmap.len().octets());
        buf.put_u16_le(self.start.as_raw());
        buf.put_slice(self.bitmap.as_octets());
        buf.freeze()
    }

    /// Parse from wire bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < 2 {
            return Err(CodecError::Truncated {
                expected: 2,
                actual: bytes.len(),
            });
        }
        let mut buf = bytes;
        let start = SeqControl::from_raw(buf.get_u16_le());
        let bitmap = BlockAckBitmap::from_bytes(buf)?;
        Ok(CompressedBlockAck { start, bitmap })
    }
}

/// Block Ack Request frame body
///
/// Forces the recipient to advance its delivery point to the carried
/// starting sequence control, abandoning older holes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAckReq {
    /// Requested delivery point
    pub start: SeqControl,
}

impl BlockAckReq {
    /// Create a new Block Ack Request
    pub fn new(start: SeqControl) -> Self {
        BlockAckReq { start }
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_u16_le(self.start.as_raw());
        buf.freeze()
    }

    /// Parse from wire bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != 2 {
            return Err(CodecError::Truncated {
                expected: 2,
                actual: bytes.len(),
            });
        }
        let mut buf = bytes;
        Ok(BlockAckReq {
            start: SeqControl::from_raw(buf.get_u16_le()),
        })
    }
}

/// Per-recipient identification in the multi-recipient form
///
/// Packed into one little-endian u16: bits 0-10 association identifier,
/// bit 11 acknowledgment-type flag, bits 12-15 traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipientInfo {
    /// Association identifier (11 bits)
    pub aid: u16,
    /// Acknowledgment-type flag; in a subfield without a bitmap it
    /// distinguishes all-acknowledged from all-failed
    pub all_ack: bool,
    /// Traffic class identifier (4 bits)
    pub tid: u8,
}

impl RecipientInfo {
    /// Create a new recipient info, masking fields to their wire widths
    pub fn new(aid: u16, all_ack: bool, tid: u8) -> Self {
        RecipientInfo {
            aid: aid & 0x07FF,
            all_ack,
            tid: tid & 0x0F,
        }
    }

    /// Parse from the raw 16-bit wire value
    pub fn from_raw(raw: u16) -> Self {
        RecipientInfo {
            aid: raw & 0x07FF,
            all_ack: raw & (1 << 11) != 0,
            tid: (raw >> 12) as u8,
        }
    }

    /// Convert to the raw 16-bit wire value
    pub fn to_raw(self) -> u16 {
        let mut raw = self.aid & 0x07FF;
        if self.all_ack {
            raw |= 1 << 11;
        }
        raw |= (self.tid as u16 & 0x0F) << 12;
        raw
    }
}

/// One subfield of a multi-recipient Block Ack
///
/// `ack == None` is the degenerate form without a bitmap: all MPDUs
/// acknowledged or all failed, per the recipient info flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckSubfield {
    /// Recipient identification
    pub recipient: RecipientInfo,
    /// Starting sequence control and bitmap, absent in the degenerate form
    pub ack: Option<CompressedBlockAck>,
}

/// Multi-recipient Block Ack frame body
///
/// A sequence of independently sized subfields. The wire form carries no
/// per-subfield length, so decoding requires the bitmap length table
/// declared at negotiation time: one entry per subfield, `None` for the
/// degenerate bitmap-less form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiRecipientBlockAck {
    /// Per-recipient subfields in wire order
    pub subfields: Vec<AckSubfield>,
}

impl MultiRecipientBlockAck {
    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for subfield in &self.subfields {
            buf.put_u16_le(subfield.recipient.to_raw());
            if let Some(ack) = &subfield.ack {
                buf.put_u16_le(ack.start.as_raw());
                buf.put_slice(ack.bitmap.as_octets());
            }
        }
        buf.freeze()
    }

    /// Parse from wire bytes using the declared per-subfield length table
    ///
    /// Fails without partial results if the bytes run out before the table
    /// is exhausted, or if bytes remain after it.
    pub fn from_bytes(
        bytes: &[u8],
        lengths: &[Option<BitmapLength>],
    ) -> Result<Self, CodecError> {
        let mut buf = bytes;
        let mut subfields = Vec::with_capacity(lengths.len());

        for &len in lengths {
            let expected = 2 + len.map_or(0, |l| 2 + l.octets());
            if buf.remaining() < expected {
                return Err(CodecError::Truncated {
                    expected,
                    actual: buf.remaining(),
                });
            }

            let recipient = RecipientInfo::from_raw(buf.get_u16_le());
            let ack = match len {
                None => None,
                Some(l) => {
                    let start = SeqControl::from_raw(buf.get_u16_le());
                    let bitmap = BlockAckBitmap::from_bytes(&buf[..l.octets()])?;
                    buf.advance(l.octets());
                    Some(CompressedBlockAck::new(start, bitmap))
                }
            };

            subfields.push(AckSubfield { recipient, ack });
        }

        if buf.has_remaining() {
            return Err(CodecError::TrailingBytes(buf.remaining()));
        }

        Ok(MultiRecipientBlockAck { subfields })
    }
}

/// Block Ack frame body, over the closed set of wire variants
///
/// Decoding stays per-variant: the compressed form is identified by its
/// length alone, while the multi-recipient form additionally needs the
/// negotiated length table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockAck {
    /// Single-recipient compressed form
    Compressed(CompressedBlockAck),
    /// Multi-recipient form
    MultiRecipient(MultiRecipientBlockAck),
}

impl BlockAck {
    /// Serialize to wire bytes
    pub fn encode(&self) -> Bytes {
        match self {
            BlockAck::Compressed(ba) => ba.to_bytes(),
            BlockAck::MultiRecipient(ba) => ba.to_bytes(),
        }
    }
}
