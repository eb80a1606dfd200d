//! JSON-deserializable schema documents.
//!
//! These are the shapes an XML-to-JSON conversion of the editor's
//! configuration produces: every element is an object holding its
//! attributes under `attrib`, its text under `innerText`, and its children
//! under the child tag. They convert into the plain node types in
//! [crate::node], which is what the compilers consume.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    errors::CompileError,
    node::{BitfieldNode, ChoiceNode, Content, FormatNode, Length, WidgetKind, WidgetNode},
};

/// A `<format>` document: the ordered top-level format nodes.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FormatDocumentDef {
    pub format: Vec<FormatNodeDef>,
}

/// One format element: `{ "<tag>": [children], "attrib": { ... } }`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FormatNodeDef {
    #[serde(default)]
    pub attrib: FormatAttribDef,
    /// Exactly one entry: the node's tag and its content.
    #[serde(flatten)]
    pub tag: BTreeMap<String, Vec<FormatContentDef>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FormatAttribDef {
    #[serde(rename = "type", default)]
    pub ty: String,
    #[serde(default)]
    pub len: Option<LengthDef>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// A `len` attribute: a literal count or the name of an earlier field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum LengthDef {
    Count(usize),
    Field(String),
}

/// Element text or an attribute value.
///
/// XML-to-JSON converters turn numeric text into numbers and yes/no text
/// into booleans; all of them read back as the text they came from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TextDef {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Default for TextDef {
    fn default() -> Self {
        TextDef::Text(String::new())
    }
}

impl fmt::Display for TextDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextDef::Text(text) => f.write_str(text),
            TextDef::Integer(v) => write!(f, "{v}"),
            TextDef::Float(v) => write!(f, "{v}"),
            TextDef::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<TextDef> for String {
    fn from(value: TextDef) -> Self {
        match value {
            TextDef::Text(text) => text,
            other => other.to_string(),
        }
    }
}

/// Content of a format element: constant text or a nested element.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum FormatContentDef {
    Text {
        #[serde(rename = "innerText")]
        inner_text: TextDef,
    },
    Node(FormatNodeDef),
}

/// One `<bitfield>` element with its widgets in document order.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BitfieldDef {
    #[serde(default)]
    pub attrib: BitfieldAttribDef,
    /// Each entry has a single key naming the widget kind.
    #[serde(default)]
    pub bitfield: Vec<BTreeMap<String, WidgetDef>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BitfieldAttribDef {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct WidgetDef {
    #[serde(default)]
    pub attrib: WidgetAttribDef,
    #[serde(default)]
    pub tooltip: Option<TooltipDef>,
    #[serde(default)]
    pub choice: Vec<ChoiceDef>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct WidgetAttribDef {
    pub name: Option<TextDef>,
    pub unit: Option<TextDef>,
    pub length: Option<u32>,
    pub offset: Option<u32>,
    pub value_offset: Option<f64>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub scalar_range: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum TooltipDef {
    Text(TextDef),
    Node {
        #[serde(rename = "innerText")]
        inner_text: TextDef,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ChoiceDef {
    #[serde(default)]
    pub attrib: ChoiceAttribDef,
    #[serde(rename = "innerText", default)]
    pub inner_text: TextDef,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceAttribDef {
    #[serde(default)]
    pub value: Option<i64>,
}

impl FormatDocumentDef {
    pub fn into_nodes(self) -> Result<Vec<FormatNode>, CompileError> {
        self.format.into_iter().map(FormatNode::try_from).collect()
    }
}

/// Returns the single `(key, value)` of a tag map.
fn single_tag<T>(map: BTreeMap<String, T>, what: &str) -> Result<(String, T), CompileError> {
    if map.len() != 1 {
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        return Err(CompileError::MalformedNode(format!(
            "{what} must have exactly one tag, found [{}]",
            keys.join(", ")
        )));
    }
    map.into_iter()
        .next()
        .ok_or_else(|| CompileError::MalformedNode(format!("{what} has no tag")))
}

impl TryFrom<FormatNodeDef> for FormatNode {
    type Error = CompileError;

    fn try_from(value: FormatNodeDef) -> Result<Self, Self::Error> {
        let (name, children) = single_tag(value.tag, "format node")?;

        let content = match children.as_slice() {
            [] => Content::Empty,
            [FormatContentDef::Text { inner_text }] => Content::Literal(inner_text.to_string()),
            _ => Content::Fields(
                children
                    .into_iter()
                    .map(|child| match child {
                        FormatContentDef::Node(node) => FormatNode::try_from(node),
                        FormatContentDef::Text { .. } => Err(CompileError::MalformedNode(format!(
                            "`{name}` mixes text with child fields"
                        ))),
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };

        let len = value.attrib.len.map(|len| match len {
            LengthDef::Count(n) => Length::Fixed(n),
            LengthDef::Field(field) => match field.trim().parse() {
                Ok(n) => Length::Fixed(n),
                Err(_) => Length::Field(field),
            },
        });

        Ok(FormatNode {
            name,
            ty: value.attrib.ty,
            len,
            encoding: value.attrib.encoding,
            content,
        })
    }
}

impl From<TooltipDef> for String {
    fn from(value: TooltipDef) -> Self {
        match value {
            TooltipDef::Text(text) | TooltipDef::Node { inner_text: text } => text.into(),
        }
    }
}

impl TryFrom<BitfieldDef> for BitfieldNode {
    type Error = CompileError;

    fn try_from(value: BitfieldDef) -> Result<Self, Self::Error> {
        let widgets = value
            .bitfield
            .into_iter()
            .map(|entry| -> Result<WidgetNode, CompileError> {
                let (tag, def) = single_tag(entry, "bitfield widget")?;
                let kind = WidgetKind::from_tag(&tag).ok_or_else(|| {
                    CompileError::MalformedNode(format!("unknown widget `{tag}`"))
                })?;
                Ok(widget_node(kind, def))
            })
            .collect::<Result<_, _>>()?;

        Ok(BitfieldNode {
            key: value.attrib.key,
            widgets,
        })
    }
}

fn widget_node(kind: WidgetKind, def: WidgetDef) -> WidgetNode {
    let WidgetAttribDef {
        name,
        unit,
        length,
        offset,
        value_offset,
        minimum,
        maximum,
        scalar_range,
    } = def.attrib;

    WidgetNode {
        kind,
        name: name.map(String::from),
        unit: unit.map(String::from),
        length,
        offset,
        value_offset,
        minimum,
        maximum,
        scalar_range,
        tooltip: def.tooltip.map(String::from),
        choices: def
            .choice
            .into_iter()
            .map(|choice| ChoiceNode {
                label: choice.inner_text.into(),
                value: choice.attrib.value,
            })
            .collect(),
    }
}
