use bytes::{Bytes, BytesMut};

/// One column value sliced out of a row packet.
///
/// The value borrows (reference-counts) spans of the row's underlying
/// envelope buffers rather than copying them; cloning retains the
/// buffers and dropping the last handle releases them.
///
/// `Normal` holds at most `i32::MAX` bytes in total. A value larger than
/// that cannot be presented as one contiguous allocation and is carried
/// as `Large`, an ordered list of buffers whose combined size may pass
/// 2 GiB.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// SQL NULL (`0xFB` length marker in a text row).
    Null,

    /// A value of at most `i32::MAX` total bytes.
    Normal(Vec<Bytes>),

    /// A value exceeding `i32::MAX` total bytes.
    Large(Vec<Bytes>),
}

/// Threshold above which a value (or reader) switches to large mode.
pub(crate) const LARGE_THRESHOLD: u64 = i32::MAX as u64;

impl FieldValue {
    /// Wraps a list of buffer spans, selecting the variant by total size.
    pub(crate) fn from_buffers(buffers: Vec<Bytes>) -> Self {
        let total: u64 = buffers.iter().map(|b| b.len() as u64).sum();

        if total > LARGE_THRESHOLD {
            FieldValue::Large(buffers)
        } else {
            FieldValue::Normal(buffers)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Total size in bytes; `0` for NULL.
    pub fn total_len(&self) -> u64 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Normal(buffers) | FieldValue::Large(buffers) => {
                buffers.iter().map(|b| b.len() as u64).sum()
            }
        }
    }

    /// The underlying buffer spans, in order. Empty for NULL.
    pub fn buffers(&self) -> &[Bytes] {
        match self {
            FieldValue::Null => &[],
            FieldValue::Normal(buffers) | FieldValue::Large(buffers) => buffers,
        }
    }

    /// Releases this handle's hold on the buffers, returning them to the
    /// caller. The buffers are freed once every clone is gone.
    pub fn into_buffers(self) -> Vec<Bytes> {
        match self {
            FieldValue::Null => Vec::new(),
            FieldValue::Normal(buffers) | FieldValue::Large(buffers) => buffers,
        }
    }

    /// A contiguous copy-on-demand view of a `Normal` value. Returns
    /// `None` for NULL and for `Large` values, which cannot be made
    /// contiguous.
    pub fn contiguous(&self) -> Option<Bytes> {
        match self {
            FieldValue::Null | FieldValue::Large(_) => None,

            FieldValue::Normal(buffers) => match buffers.len() {
                0 => Some(Bytes::new()),
                1 => Some(buffers[0].clone()),
                _ => {
                    let mut joined = BytesMut::with_capacity(self.total_len() as usize);
                    for buf in buffers {
                        joined.extend_from_slice(buf);
                    }

                    Some(joined.freeze())
                }
            },
        }
    }
}
