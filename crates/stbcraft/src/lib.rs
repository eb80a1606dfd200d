//! # stbcraft
//!
//! Declarative binary formats for room files, plus the packed integer
//! layouts the editor exposes as widgets.
//!
//! A format is a tree of [node::FormatNode]s: primitive leaves (`signed`,
//! `unsigned`, `floating`, `boolean`, `character`), constants that must
//! match on read and are always written, and composite records whose
//! repetition count may come from an earlier field. [schema::FormatTable]
//! compiles the tree once and then decodes and encodes buffers with it.
//!
//! [bitfield::Bitfield] splits one integer field into named bit ranges and
//! converts between the stored bits and the values a widget shows.
//!
//! ## Example
//!
//! ```
//! use stbcraft::node::FormatNode;
//! use stbcraft::schema::FormatTable;
//! use stbcraft::value::Value;
//!
//! let table = FormatTable::compile(&[FormatNode::record(
//!     "header",
//!     vec![
//!         FormatNode::new("magic", "character").with_len(4).with_constant("STB1"),
//!         FormatNode::new("count", "unsigned").with_len(4),
//!     ],
//! )])
//! .unwrap();
//!
//! let value = table.parse("header", b"STB1\x02\x00\x00\x00").unwrap();
//! assert_eq!(value.as_record().unwrap()["count"], Value::U64(2));
//! assert_eq!(table.serialize("header", &value).unwrap(), b"STB1\x02\x00\x00\x00");
//! ```

pub mod bitfield;
pub mod bits;
pub mod compiled;
pub mod element;
pub mod errors;
pub mod node;
pub mod primitive;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;
