use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};

use crate::errors::{CryptoError, Result};
use crate::operation::{point_from_bytes, scalar_from_bytes, POINT_SIZE, SCALAR_SIZE};

/// Forward-only cursor over a byte slice. Every read is bounds-checked and
/// names the field being decoded in its error.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek_u8(&self, field: &str) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| CryptoError::parse(format!("{}: unexpected end of input", field)))
    }

    pub fn read_u8(&mut self, field: &str) -> Result<u8> {
        let b = self.peek_u8(field)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CryptoError::parse(format!(
                "{}: need {} bytes, {} left",
                field,
                len,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_u16_be(&mut self, field: &str) -> Result<u16> {
        let b = self.read_bytes(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self, field: &str) -> Result<u32> {
        let b = self.read_bytes(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_point(&mut self, field: &str) -> Result<RistrettoPoint> {
        let b = self.read_bytes(POINT_SIZE, field)?;
        point_from_bytes(b).map_err(|e| annotate(e, field))
    }

    pub fn read_scalar(&mut self, field: &str) -> Result<Scalar> {
        let b = self.read_bytes(SCALAR_SIZE, field)?;
        scalar_from_bytes(b).map_err(|e| annotate(e, field))
    }

    /// `[len][bytes]` where `len == 0` means absent.
    pub fn read_optional_point(&mut self, field: &str) -> Result<Option<RistrettoPoint>> {
        match self.read_u8(field)? {
            0 => Ok(None),
            len if len as usize == POINT_SIZE => self.read_point(field).map(Some),
            len => Err(CryptoError::parse(format!(
                "{}: point length {} is not {}",
                field, len, POINT_SIZE
            ))),
        }
    }

    pub fn read_optional_scalar(&mut self, field: &str) -> Result<Option<Scalar>> {
        match self.read_u8(field)? {
            0 => Ok(None),
            len if len as usize == SCALAR_SIZE => self.read_scalar(field).map(Some),
            len => Err(CryptoError::parse(format!(
                "{}: scalar length {} is not {}",
                field, len, SCALAR_SIZE
            ))),
        }
    }

    pub fn finish(&self, what: &str) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CryptoError::parse(format!(
                "{}: {} trailing bytes",
                what,
                self.remaining()
            )))
        }
    }
}

fn annotate(err: CryptoError, field: &str) -> CryptoError {
    match err {
        CryptoError::Parse(msg) => CryptoError::Parse(format!("{}: {}", field, msg)),
        CryptoError::GroupValidation(msg) => {
            CryptoError::GroupValidation(format!("{}: {}", field, msg))
        }
        other => other,
    }
}
