use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("read of {length} bytes at offset {offset} is outside of a {size} byte buffer")]
    OutOfBounds {
        offset: usize,
        length: usize,
        size:   usize,
    },
    #[error("range of {length} bytes at offset {offset} overflows")]
    InvalidRange { offset: u32, length: u32 },
    #[error("buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
}

/// Little-endian reader over a borrowed buffer.
///
/// Every read is bounds-checked against the whole buffer; positioned reads
/// (`*_at`, [`ByteReader::range`]) ignore the sequential position.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer:   &'a [u8],
    position: usize,
}
impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self { ByteReader { buffer, position: 0 } }

    pub fn len(&self) -> usize { self.buffer.len() }

    pub fn is_empty(&self) -> bool { self.buffer.is_empty() }

    pub fn position(&self) -> usize { self.position }

    pub fn remaining(&self) -> usize { self.buffer.len().saturating_sub(self.position) }

    pub fn buffer(&self) -> &'a [u8] { self.buffer }

    pub fn seek(&mut self, position: usize) -> Result<(), CursorError> {
        if position > self.buffer.len() {
            return Err(CursorError::OutOfBounds {
                offset: position,
                length: 0,
                size:   self.buffer.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    pub fn slice(&self, offset: usize, length: usize) -> Result<&'a [u8], CursorError> {
        let out_of_bounds = CursorError::OutOfBounds {
            offset,
            length,
            size: self.buffer.len(),
        };
        let end = offset.checked_add(length).ok_or(out_of_bounds)?;
        self.buffer.get(offset..end).ok_or(out_of_bounds)
    }

    /// Borrow `length` bytes at `offset`, where both come from 32-bit format
    /// fields. The sum must fit into 32 bits.
    pub fn range(&self, offset: u32, length: u32) -> Result<&'a [u8], CursorError> {
        let end = offset
            .checked_add(length)
            .ok_or(CursorError::InvalidRange { offset, length })?;
        self.buffer
            .get(offset as usize..end as usize)
            .ok_or(CursorError::OutOfBounds {
                offset: offset as usize,
                length: length as usize,
                size:   self.buffer.len(),
            })
    }

    pub fn read_u32_at(&self, offset: usize) -> Result<u32, CursorError> {
        let bytes = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn take(&mut self, length: usize) -> Result<&'a [u8], CursorError> {
        let bytes = self.slice(self.position, length)?;
        self.position += length;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        let value = self.read_u32_at(self.position)?;
        self.position += 4;
        Ok(value)
    }
}

/// Little-endian writer into a pre-sized buffer. Never grows the buffer.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    buffer:   &'a mut [u8],
    position: usize,
}
impl<'a> ByteWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self { ByteWriter { buffer, position: 0 } }

    pub fn position(&self) -> usize { self.position }

    pub fn remaining(&self) -> usize { self.buffer.len() - self.position }

    fn reserve(&mut self, offset: usize, length: usize) -> Result<&mut [u8], CursorError> {
        let available = self.buffer.len();
        let too_small = CursorError::BufferTooSmall {
            needed: offset.saturating_add(length),
            available,
        };
        let end = offset.checked_add(length).ok_or(too_small)?;
        self.buffer.get_mut(offset..end).ok_or(too_small)
    }

    pub fn write_u32_at(&mut self, offset: usize, value: u32) -> Result<(), CursorError> {
        self.reserve(offset, 4)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<(), CursorError> {
        self.write_u32_at(self.position, value)?;
        self.position += 4;
        Ok(())
    }

    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        self.reserve(self.position, bytes.len())?
            .copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }
}
