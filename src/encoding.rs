//! Little-endian primitives shared by the pass and variant record codecs.
//!
//! Strings carry a u16 byte length followed by UTF-8 data. Shader payloads
//! carry a u32 byte length.

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

fn decode_error(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::decode("unexpected end of stream")
    } else {
        Error::from(err)
    }
}

pub fn read_bool<R: Read>(reader: &mut R) -> Result<bool> {
    Ok(read_u8(reader)? != 0)
}

pub fn write_bool<W: Write>(writer: &mut W, value: bool) -> Result<()> {
    write_u8(writer, value as u8)
}

pub fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    reader.read_u8().map_err(decode_error)
}

pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> Result<()> {
    Ok(writer.write_u8(value)?)
}

pub fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    reader.read_u16::<LittleEndian>().map_err(decode_error)
}

pub fn write_u16<W: Write>(writer: &mut W, value: u16) -> Result<()> {
    Ok(writer.write_u16::<LittleEndian>(value)?)
}

pub fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    reader.read_u32::<LittleEndian>().map_err(decode_error)
}

pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    Ok(writer.write_u32::<LittleEndian>(value)?)
}

/// Write a collection length as a u16 count.
pub fn write_count<W: Write>(writer: &mut W, count: usize, what: &str) -> Result<()> {
    if count > u16::max_value() as usize {
        return Err(Error::encode(format!(
            "{} count {} does not fit in a u16",
            what, count
        )));
    }
    write_u16(writer, count as u16)
}

pub fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let length = read_u16(reader)? as usize;
    let mut data = vec![0; length];
    reader.read_exact(&mut data).map_err(decode_error)?;
    String::from_utf8(data)
        .map_err(|err| Error::decode(format!("string is not valid UTF-8: {}", err)))
}

pub fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let data = value.as_bytes();
    if data.len() > u16::max_value() as usize {
        return Err(Error::encode(format!(
            "string of {} bytes does not fit in a u16 length prefix",
            data.len()
        )));
    }
    write_u16(writer, data.len() as u16)?;
    Ok(writer.write_all(data)?)
}

pub fn read_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let length = read_u32(reader)? as usize;
    let mut data = Vec::new();
    reader
        .by_ref()
        .take(length as u64)
        .read_to_end(&mut data)
        .map_err(decode_error)?;
    if data.len() != length {
        return Err(Error::decode(format!(
            "expected {} payload bytes, found {}",
            length,
            data.len()
        )));
    }
    Ok(data)
}

pub fn write_bytes<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    if data.len() > u32::max_value() as usize {
        return Err(Error::encode(format!(
            "payload of {} bytes does not fit in a u32 length prefix",
            data.len()
        )));
    }
    write_u32(writer, data.len() as u32)?;
    Ok(writer.write_all(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    #[test]
    fn string_layout() {
        let mut data = Vec::new();
        write_string(&mut data, "Opaque").unwrap();
        assert_eq!(&data[..2], &[6, 0]);
        assert_eq!(&data[2..], b"Opaque");

        let mut cursor = Cursor::new(data);
        assert_eq!(read_string(&mut cursor).unwrap(), "Opaque");
    }

    #[test]
    fn truncated_string_is_decode_error() {
        let mut cursor = Cursor::new(vec![10u8, 0, b'a', b'b']);
        let err = read_string(&mut cursor).unwrap_err();
        match err.kind() {
            ErrorKind::Decode(_) => {}
            kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn missing_length_prefix_is_decode_error() {
        let mut cursor = Cursor::new(vec![1u8]);
        assert!(match read_u16(&mut cursor).unwrap_err().kind() {
            ErrorKind::Decode(_) => true,
            _ => false,
        });
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let mut cursor = Cursor::new(vec![2u8, 0, 0xff, 0xfe]);
        assert!(match read_string(&mut cursor).unwrap_err().kind() {
            ErrorKind::Decode(_) => true,
            _ => false,
        });
    }

    #[test]
    fn short_payload_is_decode_error() {
        let mut cursor = Cursor::new(vec![8u8, 0, 0, 0, 1, 2, 3]);
        assert!(match read_bytes(&mut cursor).unwrap_err().kind() {
            ErrorKind::Decode(_) => true,
            _ => false,
        });
    }

    #[test]
    fn oversized_string_is_encode_error() {
        let long = "x".repeat(u16::max_value() as usize + 1);
        let mut data = Vec::new();
        assert!(match write_string(&mut data, &long).unwrap_err().kind() {
            ErrorKind::Encode(_) => true,
            _ => false,
        });
    }
}
