//! Coordination message codec.
//!
//! Frames are a one-byte tag followed by fixed-layout little-endian
//! fields; the transport delivers whole frames, so no length prefix is
//! embedded here. The 128-bit sets travel as two 64-bit words, low limb
//! first. Decoding is strict: short frames, trailing bytes and unknown
//! tags are all rejected; a malformed frame is a protocol bug, not a
//! recoverable condition.

use std::fmt;

use crate::search::state::RulerState;
use crate::search::MAX_MARKS;
use crate::stdx::BitSet128;

const TAG_REQUEST: u8 = 1;
const TAG_ASSIGNMENT: u8 = 2;
const TAG_BOUND_UPDATE: u8 = 3;
const TAG_TERMINATE: u8 = 4;
const TAG_FINAL_RESULT: u8 = 5;
const TAG_COLLECTIVE: u8 = 6;

/// A coordination message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Worker asks for work, piggybacking its local best.
    Request { rank: u32, best_len: u32 },
    /// Master hands out a prefix with the current global bound.
    Assignment { best_len: u32, prefix: RulerState },
    /// Fire-and-forget bound improvement relay.
    BoundUpdate { best_len: u32 },
    /// No work remains for the requester.
    Terminate,
    /// A process's final witness; empty `marks` means no witness.
    FinalResult { best_len: u32, marks: Vec<u32> },
    /// One hypercube exchange step of a collective.
    Collective { round: u32, value: u32 },
}

/// Decode failures. Any of these aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireError {
    /// Zero-length frame.
    Empty,
    /// Tag byte not assigned to any message.
    UnknownTag { tag: u8 },
    /// Frame shorter than its fixed layout requires.
    Truncated { tag: u8, want: usize, got: usize },
    /// Frame longer than its layout requires.
    TrailingBytes { tag: u8, extra: usize },
    /// Final-result mark count beyond the supported envelope.
    MarkCount { got: u32, max: u32 },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty frame"),
            Self::UnknownTag { tag } => write!(f, "unknown frame tag {tag:#04x}"),
            Self::Truncated { tag, want, got } => {
                write!(f, "frame tag {tag:#04x} truncated: want {want} bytes, got {got}")
            }
            Self::TrailingBytes { tag, extra } => {
                write!(f, "frame tag {tag:#04x} has {extra} trailing bytes")
            }
            Self::MarkCount { got, max } => {
                write!(f, "final result mark count {got} exceeds {max}")
            }
        }
    }
}

impl std::error::Error for WireError {}

struct Reader<'a> {
    tag: u8,
    buf: &'a [u8],
    off: usize,
}

impl<'a> Reader<'a> {
    fn new(tag: u8, buf: &'a [u8]) -> Self {
        Self { tag, buf, off: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.off + len;
        if end > self.buf.len() {
            return Err(WireError::Truncated {
                tag: self.tag,
                want: 1 + end,
                got: 1 + self.buf.len(),
            });
        }
        let slice = &self.buf[self.off..end];
        self.off = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes(b.try_into().expect("4-byte slice")))
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().expect("8-byte slice")))
    }

    fn finish(self) -> Result<(), WireError> {
        if self.off != self.buf.len() {
            return Err(WireError::TrailingBytes {
                tag: self.tag,
                extra: self.buf.len() - self.off,
            });
        }
        Ok(())
    }
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl Message {
    /// Serializes into a frame.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Request { rank, best_len } => {
                let mut out = Vec::with_capacity(9);
                out.push(TAG_REQUEST);
                put_u32(&mut out, *rank);
                put_u32(&mut out, *best_len);
                out
            }
            Self::Assignment { best_len, prefix } => {
                let mut out = Vec::with_capacity(45);
                out.push(TAG_ASSIGNMENT);
                put_u32(&mut out, *best_len);
                let (rlo, rhi) = prefix.reversed_marks.to_words();
                let (ulo, uhi) = prefix.used_diffs.to_words();
                put_u64(&mut out, rlo);
                put_u64(&mut out, rhi);
                put_u64(&mut out, ulo);
                put_u64(&mut out, uhi);
                put_u32(&mut out, prefix.marks_count);
                put_u32(&mut out, prefix.ruler_length);
                out
            }
            Self::BoundUpdate { best_len } => {
                let mut out = Vec::with_capacity(5);
                out.push(TAG_BOUND_UPDATE);
                put_u32(&mut out, *best_len);
                out
            }
            Self::Terminate => vec![TAG_TERMINATE],
            Self::FinalResult { best_len, marks } => {
                let mut out = Vec::with_capacity(9 + marks.len() * 4);
                out.push(TAG_FINAL_RESULT);
                put_u32(&mut out, *best_len);
                put_u32(&mut out, marks.len() as u32);
                for m in marks {
                    put_u32(&mut out, *m);
                }
                out
            }
            Self::Collective { round, value } => {
                let mut out = Vec::with_capacity(9);
                out.push(TAG_COLLECTIVE);
                put_u32(&mut out, *round);
                put_u32(&mut out, *value);
                out
            }
        }
    }

    /// Parses a frame; strict about length and tags.
    pub fn decode(frame: &[u8]) -> Result<Self, WireError> {
        let (&tag, body) = frame.split_first().ok_or(WireError::Empty)?;
        let mut r = Reader::new(tag, body);
        let msg = match tag {
            TAG_REQUEST => Self::Request {
                rank: r.u32()?,
                best_len: r.u32()?,
            },
            TAG_ASSIGNMENT => {
                let best_len = r.u32()?;
                let reversed_marks = BitSet128::from_words(r.u64()?, r.u64()?);
                let used_diffs = BitSet128::from_words(r.u64()?, r.u64()?);
                let marks_count = r.u32()?;
                let ruler_length = r.u32()?;
                Self::Assignment {
                    best_len,
                    prefix: RulerState {
                        reversed_marks,
                        used_diffs,
                        marks_count,
                        ruler_length,
                    },
                }
            }
            TAG_BOUND_UPDATE => Self::BoundUpdate {
                best_len: r.u32()?,
            },
            TAG_TERMINATE => Self::Terminate,
            TAG_FINAL_RESULT => {
                let best_len = r.u32()?;
                let count = r.u32()?;
                if count > MAX_MARKS as u32 {
                    return Err(WireError::MarkCount {
                        got: count,
                        max: MAX_MARKS as u32,
                    });
                }
                let mut marks = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    marks.push(r.u32()?);
                }
                Self::FinalResult { best_len, marks }
            }
            TAG_COLLECTIVE => Self::Collective {
                round: r.u32()?,
                value: r.u32()?,
            },
            _ => return Err(WireError::UnknownTag { tag }),
        };
        r.finish()?;
        Ok(msg)
    }
}
