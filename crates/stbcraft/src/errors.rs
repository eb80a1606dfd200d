//! Error types for schema compilation, decoding and encoding.

use thiserror::Error;

/// Errors produced when compiling a [crate::node::FormatNode] into a [crate::compiled::FormatEntry].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// `floating` fields must be exactly 4 or 8 bytes wide.
    #[error("field `{field}`: floating values must be 4 or 8 bytes, got {len}")]
    InvalidFloatWidth { field: String, len: usize },
    /// Signed and unsigned fields are limited to 8 bytes.
    #[error("field `{field}`: {len} bytes is too wide for an integer")]
    IntegerTooWide { field: String, len: usize },
    /// A string `len` names a field that is not visible from this node.
    #[error("field `{field}`: length refers to `{reference}`, which is not defined earlier in scope")]
    UnknownLengthRef { field: String, reference: String },
    /// A constant node has no primitive type to encode its literal with.
    #[error("field `{field}`: constant needs a primitive type, got `{ty}`")]
    InvalidConstantType { field: String, ty: String },
    /// A constant literal cannot be represented by its primitive type.
    #[error("field `{field}`: literal `{literal}` does not fit type `{ty}`")]
    InvalidConstant {
        field: String,
        ty: String,
        literal: String,
    },
    /// The `encoding` attribute names an unsupported text encoding.
    #[error("field `{field}`: unsupported text encoding `{encoding}`")]
    UnknownEncoding { field: String, encoding: String },
    /// Node tag is empty.
    #[error("format node has an empty name")]
    InvalidFieldName,
    /// A definition document does not have the expected node shape.
    #[error("malformed node: {0}")]
    MalformedNode(String),
}

/// Errors produced while decoding a buffer (e.g. during [crate::schema::FormatTable::parse]).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    /// No format with this name exists in the table.
    #[error("unknown format `{0}`")]
    UnknownFormat(String),
    /// Requested byte range is beyond the end of the data.
    #[error("field `{field}`: {len} bytes at offset {offset} exceed buffer of {available} bytes")]
    OutOfBounds {
        field: String,
        offset: usize,
        len: usize,
        available: usize,
    },
    /// A length is not usable for this field kind (e.g. a 3-byte float).
    #[error("field `{field}`: invalid length {len}")]
    InvalidLength { field: String, len: usize },
    /// A referenced length field has not been decoded in the current scope.
    #[error("field `{field}`: length field `{reference}` has not been decoded before it")]
    UnresolvedLength { field: String, reference: String },
    /// A referenced length field holds something other than a non-negative integer.
    #[error("field `{field}`: length field `{reference}` holds {value}, not a count")]
    InvalidLengthValue {
        field: String,
        reference: String,
        value: String,
    },
    /// A constant field decoded to something other than its literal.
    #[error("field `{field}`: expected constant {expected}, found {found}")]
    ConstantMismatch {
        field: String,
        expected: String,
        found: String,
    },
    /// Bytes are not valid for the field's text encoding.
    #[error("field `{field}`: bytes are not valid {encoding}")]
    InvalidText { field: String, encoding: &'static str },
}

/// Errors produced while encoding a value tree (e.g. during [crate::schema::FormatTable::serialize]).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    /// No format with this name exists in the table.
    #[error("unknown format `{0}`")]
    UnknownFormat(String),
    /// Buffer is too short to write the value.
    #[error("field `{field}`: {len} bytes at offset {offset} exceed buffer of {available} bytes")]
    OutOfBounds {
        field: String,
        offset: usize,
        len: usize,
        available: usize,
    },
    /// A record is missing a non-constant field.
    #[error("missing field `{0}`")]
    MissingField(String),
    /// The value has the wrong shape for the field.
    #[error("field `{field}`: expected {expected}, found {found}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        found: String,
    },
    /// The value does not fit in the field's width.
    #[error("field `{field}`: value {value} does not fit in {len} bytes")]
    ValueOutOfRange {
        field: String,
        value: String,
        len: usize,
    },
    /// A length is not usable for this field kind.
    #[error("field `{field}`: invalid length {len}")]
    InvalidLength { field: String, len: usize },
    /// A referenced length field has not been written in the current scope.
    #[error("field `{field}`: length field `{reference}` has not been written before it")]
    UnresolvedLength { field: String, reference: String },
    /// A referenced length field holds something other than a non-negative integer.
    #[error("field `{field}`: length field `{reference}` holds {value}, not a count")]
    InvalidLengthValue {
        field: String,
        reference: String,
        value: String,
    },
    /// A repeated record's element count disagrees with its resolved length.
    #[error("field `{field}`: {found} records given, length resolves to {expected}")]
    CountMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    /// The text cannot be represented in the field's encoding.
    #[error("field `{field}`: text cannot be encoded as {encoding}")]
    InvalidText { field: String, encoding: &'static str },
}
