//! Framed records
//!
//! Every field group in a domain file is stored as a record: a 4-byte little-endian
//! byte count, the payload, then the same byte count again.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

/// Size in bytes of a record marker.
pub const MARKER_SIZE: u64 = 4;

/// Errors decoding a framed record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The stream ended inside the record
    #[error("unexpected end of file in record starting at byte {at}")]
    UnexpectedEof {
        /// Offset of the record
        at: u64,
    },

    /// The two markers around the payload differ
    #[error("record at byte {at}: leading marker {head} does not match trailing marker {tail}")]
    MarkerMismatch {
        /// Offset of the record
        at: u64,
        /// Leading marker
        head: u32,
        /// Trailing marker
        tail: u32,
    },

    /// The payload does not split into values of the requested width
    #[error("record at byte {at}: {bytes} bytes is not a whole number of {width}-byte values")]
    Misaligned {
        /// Offset of the record
        at: u64,
        /// Payload length
        bytes: usize,
        /// Value width
        width: usize,
    },

    /// The record holds a different number of values than required
    #[error("record at byte {at}: expected {expected} values, found {found}")]
    LengthMismatch {
        /// Offset of the record
        at: u64,
        /// Required count
        expected: usize,
        /// Count present
        found: usize,
    },

    /// Underlying I/O failure
    #[error(transparent)]
    Io(std::io::Error),
}

/// A fixed-width little-endian value stored in a record.
pub trait Primitive: Copy {
    /// Width in bytes
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` bytes
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Append the encoded value to `out`
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_primitive {
    ($t:ty, $n:expr) => {
        impl Primitive for $t {
            const WIDTH: usize = $n;

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $n];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_primitive!(u8, 1);
impl_primitive!(i32, 4);
impl_primitive!(u32, 4);
impl_primitive!(i64, 8);
impl_primitive!(f64, 8);

/// Sequential reader over framed records.
pub struct RecordReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Wrap a stream, starting at its current position.
    pub fn new(mut inner: R) -> std::io::Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self { inner, position })
    }

    /// Byte offset of the next record.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move the cursor to an absolute byte offset.
    pub fn seek_to(&mut self, offset: u64) -> std::io::Result<()> {
        self.position = self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Total length of the underlying stream. The cursor is left unchanged.
    pub fn stream_len(&mut self) -> std::io::Result<u64> {
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(self.position))?;
        Ok(end)
    }

    fn read_marker(&mut self, at: u64) -> Result<u32, RecordError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(|e| eof(e, at))?;
        self.position += MARKER_SIZE;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read one record and return its payload.
    pub fn read_record(&mut self) -> Result<Vec<u8>, RecordError> {
        let at = self.position;
        let head = self.read_marker(at)?;
        // A corrupt marker must not trigger a huge up-front allocation.
        let mut payload = Vec::new();
        (&mut self.inner)
            .take(u64::from(head))
            .read_to_end(&mut payload)
            .map_err(RecordError::Io)?;
        if payload.len() != head as usize {
            return Err(RecordError::UnexpectedEof { at });
        }
        self.position += u64::from(head);
        let tail = self.read_marker(at)?;
        if head != tail {
            return Err(RecordError::MarkerMismatch { at, head, tail });
        }
        Ok(payload)
    }

    /// Skip `count` records, validating their markers.
    ///
    /// Payloads are read and dropped rather than seeked over, so a buffered stream keeps
    /// its buffer.
    pub fn skip(&mut self, count: usize) -> Result<(), RecordError> {
        for _ in 0..count {
            let at = self.position;
            let head = self.read_marker(at)?;
            let skipped = std::io::copy(
                &mut (&mut self.inner).take(u64::from(head)),
                &mut std::io::sink(),
            )
            .map_err(RecordError::Io)?;
            if skipped != u64::from(head) {
                return Err(RecordError::UnexpectedEof { at });
            }
            self.position += u64::from(head);
            let tail = self.read_marker(at)?;
            if head != tail {
                return Err(RecordError::MarkerMismatch { at, head, tail });
            }
        }
        Ok(())
    }

    /// Read one record as a vector of values of any length.
    pub fn read_vector<T: Primitive>(&mut self) -> Result<Vec<T>, RecordError> {
        let at = self.position;
        let payload = self.read_record()?;
        if payload.len() % T::WIDTH != 0 {
            return Err(RecordError::Misaligned {
                at,
                bytes: payload.len(),
                width: T::WIDTH,
            });
        }
        Ok(payload.chunks_exact(T::WIDTH).map(T::from_le_slice).collect())
    }

    /// Read one record holding exactly `count` values.
    pub fn read_exact_vector<T: Primitive>(
        &mut self,
        count: usize,
    ) -> Result<Vec<T>, RecordError> {
        let at = self.position;
        let values = self.read_vector::<T>()?;
        if values.len() != count {
            return Err(RecordError::LengthMismatch {
                at,
                expected: count,
                found: values.len(),
            });
        }
        Ok(values)
    }
}

fn eof(err: std::io::Error, at: u64) -> RecordError {
    if err.kind() == ErrorKind::UnexpectedEof {
        RecordError::UnexpectedEof { at }
    } else {
        RecordError::Io(err)
    }
}

/// Sequential writer of framed records.
pub struct RecordWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> RecordWriter<W> {
    /// Wrap a sink; positions count from zero.
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write one record around `payload`.
    pub fn write_record(&mut self, payload: &[u8]) -> std::io::Result<()> {
        let marker = u32::try_from(payload.len())
            .map_err(|_| std::io::Error::new(ErrorKind::InvalidInput, "record too large"))?;
        self.inner.write_all(&marker.to_le_bytes())?;
        self.inner.write_all(payload)?;
        self.inner.write_all(&marker.to_le_bytes())?;
        self.position += payload.len() as u64 + 2 * MARKER_SIZE;
        Ok(())
    }

    /// Write one record holding `values`.
    pub fn write_vector<T: Primitive>(&mut self, values: &[T]) -> std::io::Result<()> {
        let mut payload = Vec::with_capacity(values.len() * T::WIDTH);
        for v in values {
            v.write_le(&mut payload);
        }
        self.write_record(&payload)
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
