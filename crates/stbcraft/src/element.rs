//! A single editable bit range and its raw ↔ widget value mapping.
//!
//! Raw values are the bits as stored in the containing integer. Widget values
//! are what the editor shows in its control: a dropdown index, a biased
//! spinner number, a wrapped dial position, or a checkbox state.

use std::fmt;

use crate::{
    bits::{bit_get, bit_mask, bit_set},
    node::{WidgetKind, WidgetNode},
};

/// The containing integer an element reads and writes.
pub type Raw = u32;

/// Unit name that switches the display to in-game degrees.
pub const DEGREES: &str = "Degrees";

/// Widget kind plus its kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Spinner,
    /// Choices in document order: label and raw value.
    Dropdown(Vec<(String, i64)>),
    Slider,
    Dial,
    Checkbox,
    Bitmap,
}

/// One named sub-range of a [crate::bitfield::Bitfield].
#[derive(Debug, Clone, PartialEq)]
pub struct BitfieldElement {
    pub name: String,
    pub unit: String,
    /// First bit, counted from the least significant bit.
    pub offset: u32,
    /// Width in bits.
    pub length: u32,
    /// Bias added to raw values before they are shown.
    pub value_offset: i64,
    /// Fractional part of the configured value offset. Kept for inspection;
    /// no conversion uses it.
    pub value_offset_fraction: f64,
    pub minimum: i64,
    pub maximum: i64,
    pub scalar_range: Option<f64>,
    pub widget: Widget,
    pub tooltip: Option<String>,
}

impl BitfieldElement {
    pub fn from_node(node: &WidgetNode, offset: u32, length: u32) -> Self {
        let configured = node.value_offset.unwrap_or(0.0);
        let value_offset_fraction = configured % 1.0;
        let value_offset = (configured - value_offset_fraction).floor() as i64;

        let widget = match node.kind {
            WidgetKind::Spinner => Widget::Spinner,
            WidgetKind::Dropdown => Widget::Dropdown(
                node.choices
                    .iter()
                    .enumerate()
                    .map(|(i, choice)| (choice.label.clone(), choice.value.unwrap_or(i as i64)))
                    .collect(),
            ),
            WidgetKind::Slider => Widget::Slider,
            WidgetKind::Dial => Widget::Dial,
            WidgetKind::Checkbox => Widget::Checkbox,
            WidgetKind::Bitmap => Widget::Bitmap,
        };

        BitfieldElement {
            name: node.name.clone().unwrap_or_default(),
            unit: node.unit.clone().unwrap_or_default(),
            offset,
            length,
            value_offset,
            value_offset_fraction,
            minimum: node.minimum.unwrap_or(0),
            maximum: node.maximum.unwrap_or(bit_mask(length) as i64),
            scalar_range: node.scalar_range,
            widget,
            tooltip: node.tooltip.clone(),
        }
    }

    /// One past the last bit, saturating at `u32::MAX`.
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.length)
    }

    pub fn overlaps(&self, other: &BitfieldElement) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }

    pub fn is_adjacent_to(&self, other: &BitfieldElement) -> bool {
        self.end() == other.offset || other.end() == self.offset
    }

    /// Dropdown choices, if this is a dropdown.
    pub fn choices(&self) -> Option<&[(String, i64)]> {
        match &self.widget {
            Widget::Dropdown(choices) => Some(choices),
            _ => None,
        }
    }

    pub fn raw_value(&self, raw: Raw) -> i64 {
        bit_get(raw as u64, self.offset, self.length) as i64
    }

    /// Writes the low `length` bits of `value`; every other bit of `raw` is kept.
    pub fn set_raw_value(&self, raw: Raw, value: i64) -> Raw {
        bit_set(raw as u64, value as u64, self.offset, self.length) as Raw
    }

    /// Raw bits for a widget value. `None` for a dropdown index with no choice.
    pub fn raw_value_from_widget_value(&self, widget_value: i64) -> Option<i64> {
        match &self.widget {
            Widget::Dropdown(choices) => usize::try_from(widget_value)
                .ok()
                .and_then(|i| choices.get(i))
                .map(|(_, value)| *value),
            Widget::Dial => (widget_value - self.value_offset).checked_rem_euclid(self.maximum + 1),
            Widget::Checkbox => Some((widget_value != 0) as i64),
            _ => Some(widget_value - self.value_offset),
        }
    }

    pub fn widget_value(&self, raw: Raw) -> Option<i64> {
        self.widget_value_from_raw_value(self.raw_value(raw))
    }

    /// Widget value for already extracted bits. `None` for a dropdown value
    /// that matches no choice.
    pub fn widget_value_from_raw_value(&self, value: i64) -> Option<i64> {
        match &self.widget {
            Widget::Dropdown(choices) => choices
                .iter()
                .position(|(_, raw)| *raw == value)
                .map(|i| i as i64),
            Widget::Dial => (value + self.value_offset).checked_rem_euclid(self.maximum + 1),
            Widget::Checkbox => Some((value != 0) as i64),
            _ => Some(value + self.value_offset),
        }
    }

    /// Bounds for the widget control.
    ///
    /// Dropdowns are `[0, choices)`, dials `[minimum, maximum + 1]`, and every
    /// other widget `[minimum, maximum]` shifted by the value offset.
    pub fn widget_range(&self) -> (i64, i64) {
        match &self.widget {
            Widget::Dropdown(choices) => (0, choices.len() as i64),
            Widget::Dial => (self.minimum, self.maximum + 1),
            _ => (
                self.minimum + self.value_offset,
                self.maximum + self.value_offset,
            ),
        }
    }

    /// Value shown next to the widget.
    ///
    /// `Degrees` map widget 0 to the in-game "right" direction (90 on the dial
    /// face) and turn clockwise. A scalar range shows `scalar_range / value`
    /// rounded to three places, and nothing at all for a value of 0.
    pub fn display_value(&self, raw: Raw) -> Option<f64> {
        let value = self.widget_value(raw)?;

        if self.unit == DEGREES {
            let steps = self.maximum + 1;
            if steps == 0 {
                return None;
            }
            let degrees = value as f64 * (360.0 / steps as f64);
            return Some((degrees + 90.0).rem_euclid(360.0));
        }

        if let Some(range) = self.scalar_range.filter(|range| *range != 0.0) {
            if value == 0 {
                return None;
            }
            return Some((range / value as f64 * 1000.0).round() / 1000.0);
        }

        Some(value as f64)
    }

    /// Snaps this element's bits back into its valid set.
    ///
    /// Unknown dropdown values become the first choice; everything else is
    /// clamped into `[minimum, maximum]`.
    pub fn clamp_value(&self, raw: Raw) -> Raw {
        let bits = self.raw_value(raw);

        match &self.widget {
            Widget::Dropdown(choices) => {
                if choices.iter().any(|(_, value)| *value == bits) {
                    return raw;
                }
                choices
                    .first()
                    .map_or(raw, |(_, value)| self.set_raw_value(raw, *value))
            }
            _ => {
                if bits < self.minimum {
                    self.set_raw_value(raw, self.minimum)
                } else if bits > self.maximum {
                    self.set_raw_value(raw, self.maximum)
                } else {
                    raw
                }
            }
        }
    }
}

impl fmt::Display for BitfieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Length: {}, Offset: {})",
            self.name, self.length, self.offset
        )
    }
}
