//! Stateless get/set pairs for the primitive field types.
//!
//! Every codec reads or writes exactly `len` bytes at `offset`. Numbers are
//! little-endian.

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    bits::{from_twos_complement, to_twos_complement},
    errors::{CompileError, ReadError, WriteError},
    value::Value,
};

/// Largest integer width, in bytes.
pub const MAX_INT_BYTES: usize = 8;

/// The primitive types a schema can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Signed,
    Unsigned,
    /// IEEE-754 single (4 bytes) or double (8 bytes).
    Floating,
    /// True iff any byte of the field is nonzero.
    Boolean,
    /// Fixed-width text; neither null-terminated nor padded on read.
    Character,
}

impl Primitive {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "signed" => Some(Primitive::Signed),
            "unsigned" => Some(Primitive::Unsigned),
            "floating" => Some(Primitive::Floating),
            "boolean" => Some(Primitive::Boolean),
            "character" => Some(Primitive::Character),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Signed => "signed",
            Primitive::Unsigned => "unsigned",
            Primitive::Floating => "floating",
            Primitive::Boolean => "boolean",
            Primitive::Character => "character",
        }
    }

    /// Rejects widths the codec can never handle.
    pub fn check_len(self, field: &str, len: usize) -> Result<(), CompileError> {
        match self {
            Primitive::Floating if len != 4 && len != 8 => Err(CompileError::InvalidFloatWidth {
                field: field.to_string(),
                len,
            }),
            Primitive::Signed | Primitive::Unsigned if len > MAX_INT_BYTES => {
                Err(CompileError::IntegerTooWide {
                    field: field.to_string(),
                    len,
                })
            }
            _ => Ok(()),
        }
    }

    /// Decodes `len` bytes at `offset`.
    pub fn decode(
        self,
        field: &str,
        data: &[u8],
        offset: usize,
        len: usize,
        encoding: TextEncoding,
    ) -> Result<Value, ReadError> {
        let bytes = data
            .get(offset..)
            .and_then(|rest| rest.get(..len))
            .ok_or_else(|| ReadError::OutOfBounds {
                field: field.to_string(),
                offset,
                len,
                available: data.len(),
            })?;

        let invalid_len = || ReadError::InvalidLength {
            field: field.to_string(),
            len,
        };

        match self {
            Primitive::Unsigned => read_uint(bytes).map(Value::U64).ok_or_else(invalid_len),
            Primitive::Signed => read_uint(bytes)
                .map(|raw| Value::I64(from_twos_complement(raw, (len * 8) as u32)))
                .ok_or_else(invalid_len),
            Primitive::Floating => match len {
                4 => Ok(Value::F32(LittleEndian::read_f32(bytes))),
                8 => Ok(Value::F64(LittleEndian::read_f64(bytes))),
                _ => Err(invalid_len()),
            },
            Primitive::Boolean => Ok(Value::Bool(bytes.iter().any(|b| *b != 0))),
            Primitive::Character => {
                encoding
                    .decode(bytes)
                    .map(Value::Text)
                    .ok_or_else(|| ReadError::InvalidText {
                        field: field.to_string(),
                        encoding: encoding.name(),
                    })
            }
        }
    }

    /// Encodes `value` into the `len` bytes at `offset`.
    pub fn encode(
        self,
        field: &str,
        buf: &mut [u8],
        offset: usize,
        len: usize,
        value: &Value,
        encoding: TextEncoding,
    ) -> Result<(), WriteError> {
        let available = buf.len();
        let bytes = buf
            .get_mut(offset..)
            .and_then(|rest| rest.get_mut(..len))
            .ok_or_else(|| WriteError::OutOfBounds {
                field: field.to_string(),
                offset,
                len,
                available,
            })?;

        let invalid = |expected| WriteError::InvalidValue {
            field: field.to_string(),
            expected,
            found: value.kind().to_string(),
        };
        let out_of_range = || WriteError::ValueOutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            len,
        };

        match self {
            Primitive::Unsigned | Primitive::Signed => {
                if len > MAX_INT_BYTES {
                    return Err(WriteError::InvalidLength {
                        field: field.to_string(),
                        len,
                    });
                }

                let v = value.as_i128().ok_or_else(|| invalid("integer"))?;
                let bits = (len * 8) as u32;
                let (min, max) = if self == Primitive::Signed {
                    match bits {
                        0 => (0, 0),
                        _ => (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1),
                    }
                } else {
                    (0, (1i128 << bits) - 1)
                };

                if v < min || v > max {
                    return Err(out_of_range());
                }

                write_uint(bytes, to_twos_complement(v as i64, bits));
                Ok(())
            }
            Primitive::Floating => {
                let v = value.as_f64().ok_or_else(|| invalid("float"))?;
                match (len, value) {
                    (4, Value::F32(f)) => LittleEndian::write_f32(bytes, *f),
                    (4, _) => LittleEndian::write_f32(bytes, v as f32),
                    (8, _) => LittleEndian::write_f64(bytes, v),
                    _ => {
                        return Err(WriteError::InvalidLength {
                            field: field.to_string(),
                            len,
                        });
                    }
                }
                Ok(())
            }
            Primitive::Boolean => {
                let v = match value {
                    Value::Bool(b) => *b,
                    other => other.as_i128().ok_or_else(|| invalid("boolean"))? != 0,
                };

                bytes.fill(0);
                if let Some(first) = bytes.first_mut() {
                    *first = v as u8;
                }
                Ok(())
            }
            Primitive::Character => {
                let text = value.as_str().ok_or_else(|| invalid("text"))?;
                let encoded = encoding.encode(text).ok_or_else(|| WriteError::InvalidText {
                    field: field.to_string(),
                    encoding: encoding.name(),
                })?;

                if encoded.len() > len {
                    return Err(out_of_range());
                }

                bytes[..encoded.len()].copy_from_slice(&encoded);
                bytes[encoded.len()..].fill(0);
                Ok(())
            }
        }
    }
}

/// Little-endian unsigned read of up to 8 bytes. Zero bytes read as 0.
fn read_uint(bytes: &[u8]) -> Option<u64> {
    match bytes.len() {
        0 => Some(0),
        n if n <= MAX_INT_BYTES => Some(LittleEndian::read_uint(bytes, n)),
        _ => None,
    }
}

fn write_uint(bytes: &mut [u8], value: u64) {
    if !bytes.is_empty() {
        LittleEndian::write_uint(bytes, value, bytes.len());
    }
}

/// Text encodings accepted by `character` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// 7-bit ASCII; bytes above 0x7F are rejected.
    Ascii,
    /// ISO-8859-1: one byte per code point.
    Latin1,
    Utf16Le,
}

impl TextEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Some(TextEncoding::Utf8),
            "ascii" => Some(TextEncoding::Ascii),
            "latin1" | "binary" => Some(TextEncoding::Latin1),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Some(TextEncoding::Utf16Le),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Utf16Le => "utf16le",
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            TextEncoding::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|b| *b as char).collect()),
            TextEncoding::Latin1 => Some(bytes.iter().map(|b| *b as char).collect()),
            TextEncoding::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return None;
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(LittleEndian::read_u16)
                    .collect();
                String::from_utf16(&units).ok()
            }
        }
    }

    pub fn encode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Some(text.as_bytes().to_vec()),
            TextEncoding::Ascii => text.is_ascii().then(|| text.as_bytes().to_vec()),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect(),
            TextEncoding::Utf16Le => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                Some(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn decode(p: Primitive, data: &[u8]) -> Value {
        p.decode("f", data, 0, data.len(), TextEncoding::Utf8).unwrap()
    }

    fn encode(p: Primitive, len: usize, value: &Value) -> Result<Vec<u8>, WriteError> {
        let mut buf = vec![0u8; len];
        p.encode("f", &mut buf, 0, len, value, TextEncoding::Utf8)?;
        Ok(buf)
    }

    #[test]
    fn test_check_len() {
        assert!(matches!(
            Primitive::Signed.check_len("f", 9),
            Err(CompileError::IntegerTooWide { len: 9, .. })
        ));
        assert!(Primitive::Unsigned.check_len("f", 8).is_ok());
        assert!(Primitive::Boolean.check_len("f", 16).is_ok());
        assert!(Primitive::Character.check_len("f", 64).is_ok());
        assert!(Primitive::Floating.check_len("f", 3).is_err());
    }

    #[test]
    fn test_single_byte_signedness() {
        assert_eq!(decode(Primitive::Unsigned, &[0xFF]), Value::U64(255));
        assert_eq!(decode(Primitive::Signed, &[0xFF]), Value::I64(-1));
    }

    #[test]
    fn test_little_endian_integers() {
        assert_eq!(decode(Primitive::Unsigned, &[0x03, 0, 0, 0]), Value::U64(3));
        assert_eq!(decode(Primitive::Signed, &[0xFE, 0xFF]), Value::I64(-2));
        assert_eq!(
            encode(Primitive::Unsigned, 2, &Value::U64(0x1234)).unwrap(),
            vec![0x34, 0x12]
        );
        assert_eq!(
            encode(Primitive::Signed, 2, &Value::I64(-2)).unwrap(),
            vec![0xFE, 0xFF]
        );
    }

    #[test]
    fn test_zero_width_integer() {
        assert_eq!(decode(Primitive::Unsigned, &[]), Value::U64(0));
        assert!(encode(Primitive::Unsigned, 0, &Value::U64(0)).unwrap().is_empty());
    }

    #[test]
    fn test_integer_range_checks() {
        assert!(matches!(
            encode(Primitive::Unsigned, 1, &Value::U64(256)),
            Err(WriteError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            encode(Primitive::Unsigned, 1, &Value::I64(-1)),
            Err(WriteError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            encode(Primitive::Signed, 1, &Value::I64(128)),
            Err(WriteError::ValueOutOfRange { .. })
        ));
        assert!(encode(Primitive::Signed, 1, &Value::I64(-128)).is_ok());
        assert!(encode(Primitive::Unsigned, 8, &Value::U64(u64::MAX)).is_ok());
    }

    #[test]
    fn test_floating_widths() {
        assert!(Primitive::Floating.check_len("f", 4).is_ok());
        assert!(Primitive::Floating.check_len("f", 8).is_ok());
        assert_eq!(
            Primitive::Floating.check_len("f", 3),
            Err(CompileError::InvalidFloatWidth {
                field: "f".to_string(),
                len: 3
            })
        );
        assert!(matches!(
            Primitive::Floating.decode("f", &[0; 2], 0, 2, TextEncoding::Utf8),
            Err(ReadError::InvalidLength { len: 2, .. })
        ));
        assert_eq!(
            decode(Primitive::Floating, &1.5f32.to_le_bytes()),
            Value::F32(1.5)
        );
    }

    #[test]
    fn test_boolean() {
        assert_eq!(decode(Primitive::Boolean, &[0, 0]), Value::Bool(false));
        assert_eq!(decode(Primitive::Boolean, &[0, 2]), Value::Bool(true));
        assert_eq!(
            encode(Primitive::Boolean, 2, &Value::Bool(true)).unwrap(),
            vec![1, 0]
        );
    }

    #[test]
    fn test_character() {
        assert_eq!(
            decode(Primitive::Character, b"STB1"),
            Value::Text("STB1".to_string())
        );
        assert_eq!(
            encode(Primitive::Character, 4, &Value::from("ab")).unwrap(),
            vec![b'a', b'b', 0, 0]
        );
        assert!(matches!(
            encode(Primitive::Character, 1, &Value::from("ab")),
            Err(WriteError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            Primitive::Character.decode("f", &[0xFF], 0, 1, TextEncoding::Utf8),
            Err(ReadError::InvalidText { .. })
        ));
    }

    #[test]
    fn test_text_encodings() {
        assert_eq!(TextEncoding::from_name("UTF-8"), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::from_name("binary"), Some(TextEncoding::Latin1));
        assert_eq!(TextEncoding::from_name("hex"), None);

        assert_eq!(TextEncoding::Latin1.decode(&[0xE9]), Some("é".to_string()));
        assert_eq!(TextEncoding::Latin1.encode("é"), Some(vec![0xE9]));
        assert_eq!(TextEncoding::Latin1.encode("€"), None);
        assert_eq!(TextEncoding::Ascii.decode(&[0xE9]), None);
        assert_eq!(TextEncoding::Utf16Le.encode("A"), Some(vec![0x41, 0]));
        assert_eq!(TextEncoding::Utf16Le.decode(&[0x41, 0]), Some("A".to_string()));
        assert_eq!(TextEncoding::Utf16Le.decode(&[0x41]), None);
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(matches!(
            Primitive::Unsigned.decode("f", &[1, 2], 1, 4, TextEncoding::Utf8),
            Err(ReadError::OutOfBounds {
                offset: 1,
                len: 4,
                available: 2,
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn unsigned_round_trips(value: u64, len in 1usize..=8) {
            let value = value & crate::bits::bit_mask((len * 8) as u32);
            let buf = encode(Primitive::Unsigned, len, &Value::U64(value)).unwrap();
            prop_assert_eq!(decode(Primitive::Unsigned, &buf), Value::U64(value));
        }

        #[test]
        fn signed_round_trips(value: i64, len in 1usize..=8) {
            let bits = (len * 8) as u32;
            let value = from_twos_complement(value as u64, bits);
            let buf = encode(Primitive::Signed, len, &Value::I64(value)).unwrap();
            prop_assert_eq!(decode(Primitive::Signed, &buf), Value::I64(value));
        }

        #[test]
        fn floats_round_trip_bit_exact(single: u32, double: u64) {
            let buf = encode(Primitive::Floating, 4, &Value::F32(f32::from_bits(single))).unwrap();
            prop_assert_eq!(&buf, &single.to_le_bytes().to_vec());
            match decode(Primitive::Floating, &buf) {
                Value::F32(f) => prop_assert_eq!(f.to_bits(), single),
                other => prop_assert!(false, "expected f32, got {:?}", other),
            }

            let buf = encode(Primitive::Floating, 8, &Value::F64(f64::from_bits(double))).unwrap();
            prop_assert_eq!(&buf, &double.to_le_bytes().to_vec());
            match decode(Primitive::Floating, &buf) {
                Value::F64(f) => prop_assert_eq!(f.to_bits(), double),
                other => prop_assert!(false, "expected f64, got {:?}", other),
            }
        }

        #[test]
        fn nan_payloads_survive(payload in 1u32..(1 << 22), sign: bool) {
            let bits = (sign as u32) << 31 | 0x7F80_0000 | payload;
            let buf = encode(Primitive::Floating, 4, &Value::F32(f32::from_bits(bits))).unwrap();
            match decode(Primitive::Floating, &buf) {
                Value::F32(f) => prop_assert_eq!(f.to_bits(), bits),
                other => prop_assert!(false, "expected f32, got {:?}", other),
            }
        }

        #[test]
        fn booleans_round_trip(value: bool, len in 1usize..=8) {
            let buf = encode(Primitive::Boolean, len, &Value::Bool(value)).unwrap();
            prop_assert_eq!(buf.len(), len);
            prop_assert_eq!(decode(Primitive::Boolean, &buf), Value::Bool(value));
        }

        #[test]
        fn text_round_trips(text in "[a-zA-Z0-9 ]{0,16}") {
            let value = Value::from(text.as_str());
            let buf = encode(Primitive::Character, text.len(), &value).unwrap();
            prop_assert_eq!(decode(Primitive::Character, &buf), Value::Text(text));
        }
    }
}
