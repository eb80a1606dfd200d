//! Packed integer layouts: element placement, validation and clamping.

use std::fmt;

use crate::{
    element::{BitfieldElement, Raw},
    node::BitfieldNode,
};

/// Record field subdivided when a bitfield names no key.
pub const DEFAULT_KEY: &str = "Subtype";

/// Shown when a set of bitfields cannot be edited.
pub const INVALID_WARNING: &str = "Has incorrectly defined bitfield properties, cannot be configured";

/// A layout problem found by [Bitfield::validate].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitfieldIssue {
    /// Two elements claim the same bit.
    Overlap { first: String, second: String },
    /// An element touches no other element's boundary.
    NotAdjacent(String),
    /// No element starts at bit 0.
    MissingAnchor,
}

impl BitfieldIssue {
    /// Only overlaps make a bitfield unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BitfieldIssue::Overlap { .. })
    }
}

impl fmt::Display for BitfieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitfieldIssue::Overlap { first, second } => {
                write!(f, "Element {first} conflicts with {second}")
            }
            BitfieldIssue::NotAdjacent(element) => {
                write!(f, "Element {element} is not adjacent to any other elements")
            }
            BitfieldIssue::MissingAnchor => {
                f.write_str("Bitfield does not have an element with an offset of 0")
            }
        }
    }
}

/// The ordered elements that subdivide one integer record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitfield {
    pub key: String,
    pub elements: Vec<BitfieldElement>,
}

impl Bitfield {
    /// Places each widget in the integer.
    ///
    /// Widgets without an explicit offset are packed one after another from
    /// bit 0; an explicit offset is used as-is and does not move that cursor.
    pub fn new(node: &BitfieldNode) -> Self {
        let mut cursor: u32 = 0;
        let elements = node
            .widgets
            .iter()
            .map(|widget| {
                let length = widget.length.unwrap_or(1);
                let offset = widget.offset.unwrap_or_else(|| {
                    let offset = cursor;
                    cursor = cursor.saturating_add(length);
                    offset
                });
                BitfieldElement::from_node(widget, offset, length)
            })
            .collect();

        Bitfield {
            key: node.key.clone().unwrap_or_else(|| DEFAULT_KEY.to_string()),
            elements,
        }
    }

    pub fn element(&self, name: &str) -> Option<&BitfieldElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn validate(&self) -> Vec<BitfieldIssue> {
        let mut issues = Vec::new();

        for (i, first) in self.elements.iter().enumerate() {
            for second in &self.elements[i + 1..] {
                if first.overlaps(second) {
                    issues.push(BitfieldIssue::Overlap {
                        first: first.to_string(),
                        second: second.to_string(),
                    });
                }
            }
        }

        let lone = self.elements.len() == 1;
        for (i, element) in self.elements.iter().enumerate() {
            let adjacent = (lone && element.offset == 0)
                || self
                    .elements
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && element.is_adjacent_to(other));
            if !adjacent {
                issues.push(BitfieldIssue::NotAdjacent(element.to_string()));
            }
        }

        if !self.elements.iter().any(|e| e.offset == 0) {
            issues.push(BitfieldIssue::MissingAnchor);
        }

        issues
    }

    /// Logs every issue and reports whether any of them is fatal.
    pub fn is_invalid(&self) -> bool {
        let mut invalid = false;
        for issue in self.validate() {
            if issue.is_fatal() {
                log::error!("Bitfield {}: {issue}", self.key);
                invalid = true;
            } else {
                log::warn!("Bitfield {}: {issue}", self.key);
            }
        }
        invalid
    }

    /// Clamps every element in order.
    pub fn clamp_values(&self, raw: Raw) -> Raw {
        self.elements.iter().fold(raw, |raw, element| {
            let clamped = element.clamp_value(raw);
            if clamped != raw {
                log::debug!(
                    "Clamped {} of {}: {raw:#x} -> {clamped:#x}",
                    element.name,
                    self.key
                );
            }
            clamped
        })
    }
}

/// The bitfields of one entity type.
///
/// A set that contained an invalid bitfield is disabled: it keeps a warning
/// and refuses raw access to every bitfield, including the valid ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BitfieldSet {
    bitfields: Vec<Bitfield>,
    invalid: bool,
}

impl BitfieldSet {
    /// Builds bitfields in order and stops at the first invalid one.
    pub fn load(nodes: &[BitfieldNode]) -> Self {
        let mut set = BitfieldSet::default();
        for node in nodes {
            let bitfield = Bitfield::new(node);
            if bitfield.is_invalid() {
                log::warn!("Bitfield {}: {INVALID_WARNING}", bitfield.key);
                set.invalid = true;
                break;
            }
            set.bitfields.push(bitfield);
        }
        set
    }

    pub fn is_editable(&self) -> bool {
        !self.invalid
    }

    pub fn warning(&self) -> Option<&'static str> {
        self.invalid.then_some(INVALID_WARNING)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.bitfields.iter().any(|b| b.key == key)
    }

    pub fn bitfield(&self, key: &str) -> Option<&Bitfield> {
        if self.invalid {
            return None;
        }
        self.bitfields.iter().find(|b| b.key == key)
    }

    /// Every element of every bitfield; empty while disabled.
    pub fn elements(&self) -> impl Iterator<Item = &BitfieldElement> {
        let bitfields: &[Bitfield] = if self.invalid { &[] } else { &self.bitfields };
        bitfields.iter().flat_map(|b| b.elements.iter())
    }

    /// Clamps `raw` with the bitfield for `key`.
    pub fn clamp(&self, key: &str, raw: Raw) -> Option<Raw> {
        self.bitfield(key).map(|b| b.clamp_values(raw))
    }
}
