// Copyright @yucwang 2026

//! Framed binary reader/writer shared by the introspection server and the
//! remotely triggered probe plugins.
//!
//! All multi-byte fields are little-endian. Strings are an i32 byte length
//! followed by UTF-8 data. Decoders fail with an explicit error on short
//! reads instead of truncating.

use byteorder::{ LittleEndian, ReadBytesExt, WriteBytesExt };

use std::io::{ Read, Write };

// A length prefix above this is treated as stream corruption.
const MAX_STRING_BYTES: i32 = 1 << 16;

#[derive(Debug)]
pub enum WireError {
    Io(std::io::Error),
    Utf8(std::string::FromUtf8Error),
    BadLength(i32),
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        WireError::Io(err)
    }
}

impl From<std::string::FromUtf8Error> for WireError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        WireError::Utf8(err)
    }
}

pub struct WireReader<'a> {
    src: &'a mut dyn Read,
}

impl<'a> WireReader<'a> {
    pub fn new(src: &'a mut dyn Read) -> Self {
        Self { src }
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.src.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, WireError> {
        Ok(self.src.read_i16::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(self.src.read_i32::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(self.src.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        Ok(self.src.read_f32::<LittleEndian>()?)
    }

    pub fn read_string(&mut self) -> Result<String, WireError> {
        let length = self.read_i32()?;
        if length < 0 || length > MAX_STRING_BYTES {
            return Err(WireError::BadLength(length));
        }

        let mut buffer = vec![0u8; length as usize];
        self.src.read_exact(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>, WireError> {
        let mut buffer = vec![0u8; length];
        self.src.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

pub struct WireWriter<'a> {
    dst: &'a mut dyn Write,
}

impl<'a> WireWriter<'a> {
    pub fn new(dst: &'a mut dyn Write) -> Self {
        Self { dst }
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        Ok(self.dst.write_u8(value as u8)?)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), WireError> {
        Ok(self.dst.write_i16::<LittleEndian>(value)?)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), WireError> {
        Ok(self.dst.write_i32::<LittleEndian>(value)?)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), WireError> {
        Ok(self.dst.write_u32::<LittleEndian>(value)?)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), WireError> {
        Ok(self.dst.write_f32::<LittleEndian>(value)?)
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_BYTES as usize {
            return Err(WireError::BadLength(bytes.len() as i32));
        }
        self.write_i32(bytes.len() as i32)?;
        Ok(self.dst.write_all(bytes)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        Ok(self.dst.write_all(bytes)?)
    }

    pub fn flush(&mut self) -> Result<(), WireError> {
        Ok(self.dst.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_primitive_round_trip() {
        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            writer.write_bool(true).unwrap();
            writer.write_i16(-77).unwrap();
            writer.write_i32(123456).unwrap();
            writer.write_f32(0.25).unwrap();
            writer.write_string("independent").unwrap();
        }

        let mut cursor = Cursor::new(buffer);
        let mut reader = WireReader::new(&mut cursor);
        assert_eq!(reader.read_bool().unwrap(), true);
        assert_eq!(reader.read_i16().unwrap(), -77);
        assert_eq!(reader.read_i32().unwrap(), 123456);
        assert_eq!(reader.read_f32().unwrap(), 0.25);
        assert_eq!(reader.read_string().unwrap(), "independent");
    }

    #[test]
    fn test_short_read_fails() {
        let mut cursor = Cursor::new(vec![0x01, 0x02]);
        let mut reader = WireReader::new(&mut cursor);
        match reader.read_i32() {
            Err(WireError::Io(_)) => {}
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_string_fails() {
        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            writer.write_i32(32).unwrap();
            writer.write_bytes(b"short").unwrap();
        }

        let mut cursor = Cursor::new(buffer);
        let mut reader = WireReader::new(&mut cursor);
        match reader.read_string() {
            Err(WireError::Io(_)) => {}
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_string_length_rejected() {
        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            writer.write_i32(-5).unwrap();
        }

        let mut cursor = Cursor::new(buffer);
        let mut reader = WireReader::new(&mut cursor);
        match reader.read_string() {
            Err(WireError::BadLength(-5)) => {}
            other => panic!("expected bad length, got {:?}", other),
        }
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            writer.write_i32(0x0A0B0C0D).unwrap();
        }
        assert_eq!(buffer, vec![0x0D, 0x0C, 0x0B, 0x0A]);
    }
}
