//! Input trees handed in by the schema loader.
//!
//! These mirror the XML resource files after they have been parsed into
//! tag/attribute form. Nothing here is validated; [crate::schema::FormatTable]
//! and [crate::bitfield::Bitfield] do that when they consume the nodes.

/// Length attribute of a format node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Length {
    /// A literal byte width (primitives) or repetition count (records).
    Fixed(usize),
    /// Named field whose decoded value supplies the length.
    Field(String),
}

/// Body of a format node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    /// A leaf: primitive or alias of an earlier entry.
    #[default]
    Empty,
    /// A constant whose text must appear in the data.
    Literal(String),
    /// A record made of the listed fields, in byte order.
    Fields(Vec<FormatNode>),
}

/// One tag of a format document.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatNode {
    /// Tag name; becomes the key in decoded records.
    pub name: String,
    /// Primitive name (`signed`, `unsigned`, `floating`, `boolean`,
    /// `character`), the name of an earlier entry, or anything else for records.
    pub ty: String,
    /// Defaults to 1, or to the aliased entry's length.
    pub len: Option<Length>,
    /// Text encoding for `character` fields.
    pub encoding: Option<String>,
    pub content: Content,
}

impl FormatNode {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        FormatNode {
            name: name.into(),
            ty: ty.into(),
            len: None,
            encoding: None,
            content: Content::Empty,
        }
    }

    /// A record node made of `fields`.
    pub fn record(name: impl Into<String>, fields: Vec<FormatNode>) -> Self {
        let name = name.into();
        FormatNode {
            ty: name.clone(),
            content: Content::Fields(fields),
            ..FormatNode::new(name, String::new())
        }
    }

    pub fn with_len(mut self, len: usize) -> Self {
        self.len = Some(Length::Fixed(len));
        self
    }

    pub fn with_len_of(mut self, field: impl Into<String>) -> Self {
        self.len = Some(Length::Field(field.into()));
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_constant(mut self, literal: impl Into<String>) -> Self {
        self.content = Content::Literal(literal.into());
        self
    }
}

/// Editing affordance of a bitfield element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Spinner,
    Dropdown,
    Slider,
    Dial,
    Checkbox,
    Bitmap,
}

impl WidgetKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "spinner" => Some(WidgetKind::Spinner),
            "dropdown" => Some(WidgetKind::Dropdown),
            "slider" => Some(WidgetKind::Slider),
            "dial" => Some(WidgetKind::Dial),
            "checkbox" => Some(WidgetKind::Checkbox),
            "bitmap" => Some(WidgetKind::Bitmap),
            _ => None,
        }
    }
}

/// One `<choice>` of a dropdown widget.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceNode {
    pub label: String,
    /// Raw value; defaults to the choice's position.
    pub value: Option<i64>,
}

/// One widget child of a `<bitfield>`.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetNode {
    pub kind: WidgetKind,
    pub name: Option<String>,
    pub unit: Option<String>,
    /// Bit width; defaults to 1.
    pub length: Option<u32>,
    /// Explicit bit offset; when absent the next free bit is used.
    pub offset: Option<u32>,
    pub value_offset: Option<f64>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub scalar_range: Option<f64>,
    pub tooltip: Option<String>,
    pub choices: Vec<ChoiceNode>,
}

impl WidgetNode {
    pub fn new(kind: WidgetKind, name: impl Into<String>) -> Self {
        WidgetNode {
            kind,
            name: Some(name.into()),
            unit: None,
            length: None,
            offset: None,
            value_offset: None,
            minimum: None,
            maximum: None,
            scalar_range: None,
            tooltip: None,
            choices: Vec::new(),
        }
    }
}

/// A `<bitfield>` node: the packed layout of one integer field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BitfieldNode {
    /// Name of the record field being subdivided; defaults to `Subtype`.
    pub key: Option<String>,
    pub widgets: Vec<WidgetNode>,
}
