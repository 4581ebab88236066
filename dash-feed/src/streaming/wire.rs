//! QDataStream-compatible wire codec
//!
//! # TCP Protocol
//!
//! The dashboard reads the socket with a `QDataStream` (version Qt_5_15).
//! Every field travels as a name frame followed by a value frame:
//!
//! ```text
//! ┌──────────────────┬────────────────────────┬─────────────────────┐
//! │ Length (4 bytes) │ Name (UTF-16BE)        │ Value               │
//! │ Big-endian u32   │ `length` bytes         │ width set by name   │
//! └──────────────────┴────────────────────────┴─────────────────────┘
//! ```
//!
//! ## Value encodings
//!
//! | Type   | Encoding                                             |
//! |--------|------------------------------------------------------|
//! | string | u32 BE byte length + UTF-16BE code units (empty = 0) |
//! | int32  | 4 bytes, big-endian two's complement                 |
//! | bool   | 1 byte, 0 or 1                                       |
//! | double | 8 bytes, big-endian IEEE-754                         |
//!
//! There is no outer length and no type tag: the receiver knows each value's
//! width from the field name. Writing fields in the wrong order or with the
//! wrong type desynchronises the reader for the rest of the connection.

use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};

/// Length marker Qt uses for a null `QString`
pub const NULL_STRING_LEN: u32 = 0xFFFF_FFFF;

/// Maximum accepted string payload (bytes)
pub const MAX_STRING_BYTES: usize = 1024 * 1024;

/// Value type carried after a field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int32,
    Bool,
    Double,
    String,
}

/// Field catalogue shared by the feed and the dashboard
pub const FIELD_CATALOGUE: &[(&str, FieldType)] = &[
    ("speed", FieldType::Int32),
    ("speedLimit", FieldType::Int32),
    ("batteryLevel", FieldType::Int32),
    ("batteryVoltage", FieldType::Int32),
    ("batteryRange", FieldType::Int32),
    ("motorActive", FieldType::Bool),
    ("motorPower", FieldType::Int32),
    ("temperature", FieldType::Double),
    ("totalDistance", FieldType::Double),
    ("showError", FieldType::Bool),
    ("errorMessage", FieldType::String),
];

/// Look up the value type for a field name
pub fn field_type(name: &str) -> Option<FieldType> {
    FIELD_CATALOGUE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| *t)
}

/// Decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    Bool(bool),
    Double(f64),
    String(String),
}

/// Typed writer over an owned byte buffer
///
/// Fields are accumulated with `write_*` and handed out as one block with
/// [`FrameWriter::take`], so a logical message reaches the socket in a single
/// `write_all`.
#[derive(Debug, Default)]
pub struct FrameWriter {
    buffer: Vec<u8>,
}

impl FrameWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Write a string as u32 byte length + UTF-16BE code units
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        let start = self.buffer.len();
        self.buffer.extend_from_slice(&[0; 4]);
        for unit in s.encode_utf16() {
            self.buffer.extend_from_slice(&unit.to_be_bytes());
        }
        let byte_len = (self.buffer.len() - start - 4) as u32;
        self.buffer[start..start + 4].copy_from_slice(&byte_len.to_be_bytes());
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.buffer.push(u8::from(value));
        self
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_bits().to_be_bytes());
        self
    }

    /// Write a name frame followed by its value frame
    pub fn write_field(&mut self, name: &str, value: &FieldValue) -> &mut Self {
        self.write_string(name);
        match value {
            FieldValue::Int32(v) => self.write_i32(*v),
            FieldValue::Bool(v) => self.write_bool(*v),
            FieldValue::Double(v) => self.write_f64(*v),
            FieldValue::String(v) => self.write_string(v),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Take the accumulated message, leaving the writer empty
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Clear the buffer but keep its allocation
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Inverse of [`FrameWriter`] over any byte source
pub struct FrameReader<R> {
    inner: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = u32::from_be_bytes(self.read_array()?);
        self.read_string_body(len)
    }

    fn read_string_body(&mut self, len: u32) -> Result<String> {
        if len == NULL_STRING_LEN {
            return Ok(String::new());
        }
        let len = len as usize;
        if len > MAX_STRING_BYTES {
            return Err(Error::Protocol(format!(
                "string of {} bytes exceeds limit of {}",
                len, MAX_STRING_BYTES
            )));
        }
        if len % 2 != 0 {
            return Err(Error::Protocol(format!(
                "odd UTF-16 byte length: {}",
                len
            )));
        }

        let mut bytes = vec![0u8; len];
        self.inner.read_exact(&mut bytes)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).map_err(|e| Error::Protocol(format!("invalid UTF-16: {}", e)))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let [byte] = self.read_array()?;
        Ok(byte != 0)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_be_bytes(self.read_array()?)))
    }

    pub fn read_value(&mut self, field_type: FieldType) -> Result<FieldValue> {
        Ok(match field_type {
            FieldType::Int32 => FieldValue::Int32(self.read_i32()?),
            FieldType::Bool => FieldValue::Bool(self.read_bool()?),
            FieldType::Double => FieldValue::Double(self.read_f64()?),
            FieldType::String => FieldValue::String(self.read_string()?),
        })
    }

    /// Read one name/value pair, dispatching the value width on the name
    ///
    /// Returns `Ok(None)` when the stream ends cleanly before a field starts.
    /// A stream that ends partway through the name frame is a protocol error.
    pub fn read_field(&mut self) -> Result<Option<(String, FieldValue)>> {
        let mut len = [0u8; 4];
        loop {
            match self.inner.read(&mut len[..1]) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let name = self
            .inner
            .read_exact(&mut len[1..])
            .map_err(Error::from)
            .and_then(|()| self.read_string_body(u32::from_be_bytes(len)))
            .map_err(|e| match e {
                Error::Io(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    Error::Protocol("stream ended inside a field name".to_string())
                }
                e => e,
            })?;
        let field_type = field_type(&name)
            .ok_or_else(|| Error::Protocol(format!("unknown field: {:?}", name)))?;
        let value = self.read_value(field_type)?;
        Ok(Some((name, value)))
    }
}

/// Decode every field in a complete byte block
pub fn decode_fields(bytes: &[u8]) -> Result<Vec<(String, FieldValue)>> {
    let mut reader = FrameReader::new(bytes);
    let mut fields = Vec::new();
    while let Some(field) = reader.read_field()? {
        fields.push(field);
    }
    Ok(fields)
}
