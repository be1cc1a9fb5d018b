//! Bounds-checked cursor over a byte buffer.
//!
//! Every field read validates the remaining length first, so a lying frame
//! header turns into a typed error instead of an out-of-bounds slice.

use crate::error::WireError;

/// A forward-only reader over a borrowed byte slice.
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `n` bytes as a slice.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::ShortRead {
                wanted: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes(bytes.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_in_order() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0x1122_3344_5566_7788_u64.to_le_bytes());
        buf.extend_from_slice(&42_u32.to_le_bytes());
        buf.push(7);

        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_u64().unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(cur.read_u32().unwrap(), 42);
        assert_eq!(cur.read_u8().unwrap(), 7);
        assert!(cur.is_empty());
    }

    #[test]
    fn short_read_is_typed_error() {
        let mut cur = Cursor::new(&[1, 2]);
        assert_eq!(
            cur.read_u32(),
            Err(WireError::ShortRead {
                wanted: 4,
                available: 2
            })
        );
        // Failed read consumes nothing.
        assert_eq!(cur.remaining(), 2);
    }
}
