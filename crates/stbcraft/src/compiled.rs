//! Compiled format entries and the decode/encode traversal.
//!
//! A [FormatEntry] is built once from a [FormatNode] and never mutated. The
//! byte cursor is threaded through each call as a value, so one compiled
//! entry can decode many buffers at the same time.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    errors::{CompileError, ReadError, WriteError},
    node::{Content, FormatNode, Length},
    primitive::{Primitive, TextEncoding},
    value::{Record, Value},
};

/// Names visible to a node while it compiles.
pub type EntryTable = BTreeMap<String, Arc<FormatEntry>>;

/// How an entry's length is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthSpec {
    Fixed(usize),
    /// Value of an earlier field in the same or an enclosing record.
    Field(String),
}

/// What an entry decodes to.
#[derive(Debug, Clone)]
pub enum Codec {
    Primitive(Primitive),
    /// A literal that must be present in the data and is always written back.
    Constant { primitive: Primitive, literal: Value },
    /// Fields decoded in order, once per repetition.
    Composite(Vec<Arc<FormatEntry>>),
}

/// A compiled, reusable decode/encode unit.
#[derive(Debug, Clone)]
pub struct FormatEntry {
    pub name: String,
    pub length: LengthSpec,
    pub encoding: TextEncoding,
    pub codec: Codec,
}

/// Records under construction, innermost first, used to resolve length references.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'a> {
    record: &'a Record,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<&'a Value> {
        match self.record.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|parent| parent.lookup(name)),
        }
    }
}

/// Why a length reference could not be resolved.
enum Unresolved {
    Missing,
    NotACount(String),
}

impl FormatEntry {
    /// Compiles `node` against the names already in `table`.
    ///
    /// The table is not modified; records compile their fields against a copy
    /// so names defined inside them stay local.
    pub fn compile(node: &FormatNode, table: &EntryTable) -> Result<Self, CompileError> {
        if node.name.is_empty() {
            return Err(CompileError::InvalidFieldName);
        }

        let alias = match (&node.content, Primitive::from_type_name(&node.ty)) {
            (Content::Empty, None) => table.get(&node.ty),
            _ => None,
        };

        let encoding = match &node.encoding {
            Some(name) => {
                TextEncoding::from_name(name).ok_or_else(|| CompileError::UnknownEncoding {
                    field: node.name.clone(),
                    encoding: name.clone(),
                })?
            }
            None => alias.map(|entry| entry.encoding).unwrap_or_default(),
        };

        let length = match &node.len {
            None => alias
                .map(|entry| entry.length.clone())
                .unwrap_or(LengthSpec::Fixed(1)),
            Some(Length::Fixed(len)) => LengthSpec::Fixed(*len),
            Some(Length::Field(reference)) => {
                if !table.contains_key(reference) {
                    return Err(CompileError::UnknownLengthRef {
                        field: node.name.clone(),
                        reference: reference.clone(),
                    });
                }
                LengthSpec::Field(reference.clone())
            }
        };

        let codec = match &node.content {
            Content::Literal(text) => compile_constant(node, text, &length, encoding)?,
            _ => match (Primitive::from_type_name(&node.ty), alias, &node.content) {
                (Some(primitive), _, _) => {
                    if let LengthSpec::Fixed(len) = length {
                        primitive.check_len(&node.name, len)?;
                    }
                    Codec::Primitive(primitive)
                }
                (None, Some(entry), _) => {
                    log::trace!("field `{}` reuses format `{}`", node.name, node.ty);
                    entry.codec.clone()
                }
                (None, None, Content::Fields(fields)) => compile_fields(fields, table)?,
                (None, None, _) => {
                    log::warn!(
                        "field `{}` has unknown type `{}` and no fields; it decodes as an empty record",
                        node.name,
                        node.ty
                    );
                    Codec::Composite(Vec::new())
                }
            },
        };

        Ok(FormatEntry {
            name: node.name.clone(),
            length,
            encoding,
            codec,
        })
    }

    /// True when the entry decodes to one record rather than a list of them.
    pub fn is_single_record(&self) -> bool {
        matches!(self.codec, Codec::Composite(_)) && self.length == LengthSpec::Fixed(1)
    }

    /// Decodes the entry from the start of `data`.
    ///
    /// Returns the value and the number of bytes consumed.
    pub fn parse(&self, data: &[u8]) -> Result<(Value, usize), ReadError> {
        self.decode(data, 0, None)
    }

    /// Encodes `value` into a buffer sized by [FormatEntry::encoded_len].
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>, WriteError> {
        let len = self.encoded_len(value)?;
        let mut buf = vec![0u8; len];
        let written = self.encode(Some(&mut buf), 0, Some(value), None)?;
        debug_assert_eq!(written, len);
        Ok(buf)
    }

    /// Exact number of bytes `value` encodes to.
    pub fn encoded_len(&self, value: &Value) -> Result<usize, WriteError> {
        self.encode(None, 0, Some(value), None)
    }

    fn resolve_len(&self, scope: Option<&Scope<'_>>) -> Result<usize, Unresolved> {
        match &self.length {
            LengthSpec::Fixed(len) => Ok(*len),
            LengthSpec::Field(reference) => {
                let value = scope
                    .and_then(|scope| scope.lookup(reference))
                    .ok_or(Unresolved::Missing)?;
                value
                    .as_count()
                    .ok_or_else(|| Unresolved::NotACount(value.to_string()))
            }
        }
    }

    fn reference(&self) -> String {
        match &self.length {
            LengthSpec::Field(reference) => reference.clone(),
            LengthSpec::Fixed(_) => String::new(),
        }
    }

    fn read_len(&self, scope: Option<&Scope<'_>>) -> Result<usize, ReadError> {
        self.resolve_len(scope).map_err(|err| match err {
            Unresolved::Missing => ReadError::UnresolvedLength {
                field: self.name.clone(),
                reference: self.reference(),
            },
            Unresolved::NotACount(value) => ReadError::InvalidLengthValue {
                field: self.name.clone(),
                reference: self.reference(),
                value,
            },
        })
    }

    fn write_len(&self, scope: Option<&Scope<'_>>) -> Result<usize, WriteError> {
        self.resolve_len(scope).map_err(|err| match err {
            Unresolved::Missing => WriteError::UnresolvedLength {
                field: self.name.clone(),
                reference: self.reference(),
            },
            Unresolved::NotACount(value) => WriteError::InvalidLengthValue {
                field: self.name.clone(),
                reference: self.reference(),
                value,
            },
        })
    }

    /// Decodes at `offset`; returns the value and the cursor after it.
    pub(crate) fn decode(
        &self,
        data: &[u8],
        offset: usize,
        scope: Option<&Scope<'_>>,
    ) -> Result<(Value, usize), ReadError> {
        let len = self.read_len(scope)?;

        match &self.codec {
            Codec::Primitive(primitive) => {
                let value = primitive.decode(&self.name, data, offset, len, self.encoding)?;
                Ok((value, offset + len))
            }
            Codec::Constant { primitive, literal } => {
                // zero-width constants are markers with no bytes behind them
                if len == 0 {
                    return Ok((literal.clone(), offset));
                }

                let found = primitive.decode(&self.name, data, offset, len, self.encoding)?;
                if !found.same_scalar(literal) {
                    return Err(ReadError::ConstantMismatch {
                        field: self.name.clone(),
                        expected: literal.to_string(),
                        found: found.to_string(),
                    });
                }
                Ok((literal.clone(), offset + len))
            }
            Codec::Composite(fields) => {
                if self.is_single_record() {
                    let (record, cursor) = decode_record(fields, data, offset, scope)?;
                    return Ok((Value::Record(record), cursor));
                }

                let remaining = data.len().saturating_sub(offset);
                let mut cursor = offset;
                let mut records = Vec::with_capacity(len.min(remaining));
                for _ in 0..len {
                    let (record, next) = decode_record(fields, data, cursor, scope)?;
                    // zero-width records cannot be counted against the data
                    if next == cursor && len > remaining {
                        return Err(ReadError::InvalidLength {
                            field: self.name.clone(),
                            len,
                        });
                    }
                    records.push(Value::Record(record));
                    cursor = next;
                }
                Ok((Value::List(records), cursor))
            }
        }
    }

    /// Encodes at `offset`; returns the cursor after the entry.
    ///
    /// With no buffer this only measures, which keeps the length pass and the
    /// write pass in lockstep.
    pub(crate) fn encode(
        &self,
        mut buf: Option<&mut [u8]>,
        offset: usize,
        value: Option<&Value>,
        scope: Option<&Scope<'_>>,
    ) -> Result<usize, WriteError> {
        let len = self.write_len(scope)?;

        match &self.codec {
            Codec::Primitive(primitive) => {
                let value = value.ok_or_else(|| WriteError::MissingField(self.name.clone()))?;
                if let Some(buf) = buf {
                    primitive.encode(&self.name, buf, offset, len, value, self.encoding)?;
                }
                Ok(offset + len)
            }
            Codec::Constant { primitive, literal } => {
                if let Some(buf) = buf {
                    primitive.encode(&self.name, buf, offset, len, literal, self.encoding)?;
                }
                Ok(offset + len)
            }
            Codec::Composite(fields) => {
                let value = value.ok_or_else(|| WriteError::MissingField(self.name.clone()))?;
                let invalid = |expected| WriteError::InvalidValue {
                    field: self.name.clone(),
                    expected,
                    found: value.kind().to_string(),
                };

                if self.is_single_record() {
                    let record = value.as_record().ok_or_else(|| invalid("record"))?;
                    return encode_record(fields, buf, offset, record, scope);
                }

                let items = value.as_list().ok_or_else(|| invalid("list of records"))?;
                if items.len() != len {
                    return Err(WriteError::CountMismatch {
                        field: self.name.clone(),
                        expected: len,
                        found: items.len(),
                    });
                }

                let mut cursor = offset;
                for item in items {
                    let record = item.as_record().ok_or_else(|| invalid("record"))?;
                    cursor = encode_record(fields, buf.as_deref_mut(), cursor, record, scope)?;
                }
                Ok(cursor)
            }
        }
    }
}

fn compile_constant(
    node: &FormatNode,
    text: &str,
    length: &LengthSpec,
    encoding: TextEncoding,
) -> Result<Codec, CompileError> {
    let primitive =
        Primitive::from_type_name(&node.ty).ok_or_else(|| CompileError::InvalidConstantType {
            field: node.name.clone(),
            ty: node.ty.clone(),
        })?;

    let literal = match primitive {
        Primitive::Character => Value::Text(text.to_string()),
        _ => Value::from_literal(text),
    };

    if let LengthSpec::Fixed(len) = *length {
        primitive.check_len(&node.name, len)?;
    }

    if let LengthSpec::Fixed(len @ 1..) = *length {
        let invalid = || CompileError::InvalidConstant {
            field: node.name.clone(),
            ty: node.ty.clone(),
            literal: text.to_string(),
        };

        // literal must fit its own width
        let mut scratch = vec![0u8; len];
        primitive
            .encode(&node.name, &mut scratch, 0, len, &literal, encoding)
            .map_err(|_| invalid())?;

        // padded text would never read back as the literal
        let encoded_len = encoding.encode(text).map(|bytes| bytes.len());
        if primitive == Primitive::Character && encoded_len != Some(len) {
            return Err(invalid());
        }
    }

    Ok(Codec::Constant { primitive, literal })
}

fn compile_fields(fields: &[FormatNode], table: &EntryTable) -> Result<Codec, CompileError> {
    let mut scope = table.clone();
    let mut compiled = Vec::with_capacity(fields.len());

    for field in fields {
        let entry = Arc::new(FormatEntry::compile(field, &scope)?);
        scope.insert(entry.name.clone(), Arc::clone(&entry));
        compiled.push(entry);
    }

    Ok(Codec::Composite(compiled))
}

fn decode_record(
    fields: &[Arc<FormatEntry>],
    data: &[u8],
    offset: usize,
    parent: Option<&Scope<'_>>,
) -> Result<(Record, usize), ReadError> {
    let mut record = Record::new();
    let mut cursor = offset;

    for field in fields {
        let (value, next) = {
            let scope = Scope {
                record: &record,
                parent,
            };
            field.decode(data, cursor, Some(&scope))?
        };
        record.insert(field.name.clone(), value);
        cursor = next;
    }

    Ok((record, cursor))
}

fn encode_record(
    fields: &[Arc<FormatEntry>],
    mut buf: Option<&mut [u8]>,
    offset: usize,
    record: &Record,
    parent: Option<&Scope<'_>>,
) -> Result<usize, WriteError> {
    // values as they land in the output, so length lookups see what a decoder would
    let mut written = Record::new();
    let mut cursor = offset;

    for field in fields {
        let value = record.get(&field.name);
        cursor = {
            let scope = Scope {
                record: &written,
                parent,
            };
            field.encode(buf.as_deref_mut(), cursor, value, Some(&scope))?
        };

        let landed = match &field.codec {
            Codec::Constant { literal, .. } => Some(literal),
            Codec::Primitive(_) => value,
            Codec::Composite(_) => None,
        };
        if let Some(landed) = landed {
            written.insert(field.name.clone(), landed.clone());
        }
    }

    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(node: &FormatNode) -> Result<FormatEntry, CompileError> {
        FormatEntry::compile(node, &EntryTable::new())
    }

    fn header() -> FormatNode {
        FormatNode::record(
            "Header",
            vec![
                FormatNode::new("Magic", "character")
                    .with_len(4)
                    .with_constant("STB1"),
                FormatNode::new("RoomCount", "unsigned").with_len(4),
            ],
        )
    }

    #[test]
    fn test_header_round_trip() {
        let entry = compile(&header()).unwrap();
        let data = [b'S', b'T', b'B', b'1', 3, 0, 0, 0];

        let (value, consumed) = entry.parse(&data).unwrap();
        assert_eq!(consumed, 8);
        assert_eq!(
            value,
            Value::Record(Record::from([
                ("Magic".to_string(), Value::from("STB1")),
                ("RoomCount".to_string(), Value::U64(3)),
            ]))
        );

        assert_eq!(entry.serialize(&value).unwrap(), data.to_vec());
    }

    #[test]
    fn test_constant_mismatch() {
        let entry = compile(&header()).unwrap();
        let err = entry.parse(b"STB2\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, ReadError::ConstantMismatch { ref field, .. } if field == "Magic"));
    }

    #[test]
    fn test_constant_written_regardless_of_value() {
        let entry = compile(&header()).unwrap();
        let value = Value::Record(Record::from([
            ("Magic".to_string(), Value::from("XXXX")),
            ("RoomCount".to_string(), Value::U64(1)),
        ]));
        assert_eq!(entry.serialize(&value).unwrap(), b"STB1\x01\x00\x00\x00".to_vec());

        let without = Value::Record(Record::from([("RoomCount".to_string(), Value::U64(1))]));
        assert_eq!(entry.serialize(&without).unwrap(), b"STB1\x01\x00\x00\x00".to_vec());
    }

    #[test]
    fn test_zero_width_constant() {
        let node = FormatNode::record(
            "Marker",
            vec![
                FormatNode::new("Version", "unsigned").with_len(0).with_constant("2"),
                FormatNode::new("Value", "unsigned").with_len(1),
            ],
        );
        let entry = compile(&node).unwrap();
        let (value, consumed) = entry.parse(&[7]).unwrap();

        assert_eq!(consumed, 1);
        assert_eq!(value.as_record().unwrap()["Version"], Value::I64(2));
        assert_eq!(entry.serialize(&value).unwrap(), vec![7]);
    }

    #[test]
    fn test_length_from_sibling() {
        let node = FormatNode::record(
            "Room",
            vec![
                FormatNode::new("NameLen", "unsigned").with_len(2),
                FormatNode::new("Name", "character").with_len_of("NameLen"),
                FormatNode::new("Weight", "floating").with_len(4),
            ],
        );
        let entry = compile(&node).unwrap();

        let mut data = vec![5, 0];
        data.extend_from_slice(b"Hello");
        data.extend_from_slice(&2.5f32.to_le_bytes());

        let (value, consumed) = entry.parse(&data).unwrap();
        assert_eq!(consumed, data.len());
        let record = value.as_record().unwrap();
        assert_eq!(record["Name"], Value::from("Hello"));
        assert_eq!(record["Weight"], Value::F32(2.5));

        assert_eq!(entry.encoded_len(&value).unwrap(), data.len());
        assert_eq!(entry.serialize(&value).unwrap(), data);
    }

    #[test]
    fn test_repeated_records_use_their_own_counts() {
        let node = FormatNode::record(
            "File",
            vec![
                FormatNode::new("Count", "unsigned").with_len(1),
                FormatNode::record(
                    "Item",
                    vec![
                        FormatNode::new("Len", "unsigned").with_len(1),
                        FormatNode::new("Bytes", "character").with_len_of("Len"),
                    ],
                )
                .with_len_of("Count"),
            ],
        );
        let entry = compile(&node).unwrap();
        let data = [2, 1, b'a', 3, b'x', b'y', b'z'];

        let (value, consumed) = entry.parse(&data).unwrap();
        assert_eq!(consumed, data.len());

        let items = value.as_record().unwrap()["Item"].as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_record().unwrap()["Bytes"], Value::from("xyz"));

        assert_eq!(entry.serialize(&value).unwrap(), data.to_vec());
    }

    #[test]
    fn test_nested_records_see_enclosing_fields() {
        let node = FormatNode::record(
            "Outer",
            vec![
                FormatNode::new("Width", "unsigned").with_len(1),
                FormatNode::record(
                    "Inner",
                    vec![FormatNode::new("Row", "character").with_len_of("Width")],
                ),
            ],
        );
        let entry = compile(&node).unwrap();
        let (value, _) = entry.parse(&[2, b'o', b'k']).unwrap();
        let inner = value.as_record().unwrap()["Inner"].as_record().unwrap();
        assert_eq!(inner["Row"], Value::from("ok"));
    }

    #[test]
    fn test_child_names_do_not_leak_to_parent_scope() {
        let node = FormatNode::record(
            "Outer",
            vec![
                FormatNode::record(
                    "Inner",
                    vec![FormatNode::new("Len", "unsigned").with_len(1)],
                ),
                FormatNode::new("Tail", "character").with_len_of("Len"),
            ],
        );
        assert_eq!(
            compile(&node).unwrap_err(),
            CompileError::UnknownLengthRef {
                field: "Tail".to_string(),
                reference: "Len".to_string()
            }
        );
    }

    #[test]
    fn test_float_width_is_checked_at_compile_time() {
        let node = FormatNode::new("Weight", "floating").with_len(2);
        assert!(matches!(
            compile(&node),
            Err(CompileError::InvalidFloatWidth { len: 2, .. })
        ));
    }

    #[test]
    fn test_dynamic_float_width_fails_at_decode() {
        let node = FormatNode::record(
            "R",
            vec![
                FormatNode::new("W", "unsigned").with_len(1),
                FormatNode::new("F", "floating").with_len_of("W"),
            ],
        );
        let entry = compile(&node).unwrap();
        assert!(matches!(
            entry.parse(&[3, 0, 0, 0]),
            Err(ReadError::InvalidLength { len: 3, .. })
        ));
    }

    #[test]
    fn test_unresolved_reference_names_both_fields() {
        let mut table = EntryTable::new();
        let count = FormatEntry::compile(&FormatNode::new("Count", "unsigned"), &table).unwrap();
        table.insert("Count".to_string(), Arc::new(count));

        let rooms = FormatNode::new("Rooms", "unsigned").with_len_of("Count");
        let entry = FormatEntry::compile(&rooms, &table).unwrap();
        assert_eq!(
            entry.parse(&[0; 4]).unwrap_err(),
            ReadError::UnresolvedLength {
                field: "Rooms".to_string(),
                reference: "Count".to_string()
            }
        );
    }

    #[test]
    fn test_zero_width_repeat_is_bounded_by_data() {
        let node = FormatNode::record(
            "Wrap",
            vec![
                FormatNode::new("count", "unsigned").with_len(4),
                FormatNode::new("items", "Placeholder").with_len_of("count"),
            ],
        );
        let entry = compile(&node).unwrap();

        assert!(matches!(
            entry.parse(&[0xFF, 0xFF, 0xFF, 0xFF]),
            Err(ReadError::InvalidLength { ref field, len: 0xFFFF_FFFF }) if field == "items"
        ));

        let (value, consumed) = entry.parse(&[2, 0, 0, 0, 9, 9]).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(
            value.as_record().unwrap()["items"],
            Value::List(vec![Value::Record(Record::new()); 2])
        );
    }

    #[test]
    fn test_count_mismatch_on_encode() {
        let node = FormatNode::record(
            "File",
            vec![
                FormatNode::new("Count", "unsigned").with_len(1),
                FormatNode::record("Item", vec![FormatNode::new("V", "unsigned").with_len(1)])
                    .with_len_of("Count"),
            ],
        );
        let entry = compile(&node).unwrap();
        let item = Value::Record(Record::from([("V".to_string(), Value::U64(1))]));
        let value = Value::Record(Record::from([
            ("Count".to_string(), Value::U64(2)),
            ("Item".to_string(), Value::List(vec![item])),
        ]));

        assert_eq!(
            entry.serialize(&value).unwrap_err(),
            WriteError::CountMismatch {
                field: "Item".to_string(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_missing_field_on_encode() {
        let entry = compile(&header()).unwrap();
        let value = Value::Record(Record::new());
        assert_eq!(
            entry.serialize(&value).unwrap_err(),
            WriteError::MissingField("RoomCount".to_string())
        );
    }

    #[test]
    fn test_invalid_constant_literal() {
        let node = FormatNode::new("Version", "unsigned").with_len(1).with_constant("300");
        assert!(matches!(
            compile(&node),
            Err(CompileError::InvalidConstant { .. })
        ));

        let node = FormatNode::new("Version", "Header").with_constant("1");
        assert!(matches!(
            compile(&node),
            Err(CompileError::InvalidConstantType { .. })
        ));
    }

    #[test]
    fn test_text_constant_must_fill_its_width() {
        let node = FormatNode::new("Magic", "character")
            .with_len(4)
            .with_constant("AB");
        assert!(matches!(
            compile(&node),
            Err(CompileError::InvalidConstant { ref field, .. }) if field == "Magic"
        ));

        let node = FormatNode::new("Magic", "character")
            .with_len(4)
            .with_encoding("utf16le")
            .with_constant("AB");
        let entry = compile(&node).unwrap();
        let data = entry.serialize(&Value::from("AB")).unwrap();
        assert_eq!(data, vec![b'A', 0, b'B', 0]);
        assert_eq!(entry.parse(&data).unwrap(), (Value::from("AB"), 4));
    }
}
