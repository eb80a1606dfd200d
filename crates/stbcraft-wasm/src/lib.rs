//! WASM bindings for the `stbcraft` room-file codec.
//!
//! The JavaScript editor owns the UI and the file workflow; this crate gives
//! it two handles:
//!
//! - [`WasmFormatTable`] compiles a format document once and then decodes
//!   and encodes room files with it.
//! - [`WasmBitfield`] wraps one bitfield layout and converts between the
//!   stored integer and the values its widgets show.
//!
//! ```text
//! // Pseudo TypeScript example
//! //
//! // const table = new WasmFormatTable(JSON.stringify(formatXmlAsJson));
//! // const room = table.parse("stb1", bytes);      // undefined on failure
//! // const out = table.serialize("stb1", room);    // Uint8Array | undefined
//! //
//! // const field = new WasmBitfield(JSON.stringify(bitfieldNode));
//! // if (!field.isInvalid()) {
//! //   const dir = field.getWidgetValue(0, entity.subtype);
//! // }
//! ```
//!
//! Construction errors are returned to JavaScript as strings. Decode and
//! encode failures are logged and surface as `undefined`.

mod convert;

use stbcraft::{
    bitfield::Bitfield,
    element::BitfieldElement,
    node::BitfieldNode,
    schema::FormatTable,
    serde::{BitfieldDef, FormatDocumentDef},
};
use wasm_bindgen::prelude::*;

fn compile_document(schema_json: &str) -> Result<Vec<stbcraft::node::FormatNode>, JsValue> {
    let def: FormatDocumentDef = serde_json::from_str(schema_json).map_err(convert::error_to_js)?;
    def.into_nodes().map_err(convert::error_to_js)
}

/// A compiled format table usable from JavaScript.
#[wasm_bindgen]
pub struct WasmFormatTable {
    table: FormatTable,
}

#[wasm_bindgen]
impl WasmFormatTable {
    /// Compiles a `{ "format": [...] }` document.
    #[wasm_bindgen(constructor)]
    pub fn new(schema_json: &str) -> Result<WasmFormatTable, JsValue> {
        let nodes = compile_document(schema_json)?;
        let table = FormatTable::compile(&nodes).map_err(convert::error_to_js)?;
        Ok(WasmFormatTable { table })
    }

    /// Adds another document; on error the table is left as it was.
    pub fn load(&mut self, schema_json: &str) -> Result<(), JsValue> {
        let nodes = compile_document(schema_json)?;
        self.table.load(&nodes).map_err(convert::error_to_js)
    }

    /// Decodes `data` with the named format, or returns `undefined`.
    pub fn parse(&self, name: &str, data: &[u8]) -> JsValue {
        self.table
            .try_parse(name, data)
            .and_then(|value| {
                convert::value_to_js(&value)
                    .inspect_err(|err| log::error!("Failed to convert format {name}: {err:?}"))
                    .ok()
            })
            .unwrap_or(JsValue::UNDEFINED)
    }

    /// Encodes `value` with the named format, or returns `undefined`.
    pub fn serialize(&self, name: &str, value: JsValue) -> Option<Vec<u8>> {
        let value = convert::value_from_js(value)
            .inspect_err(|err| log::error!("Failed to serialize format {name}: {err:?}"))
            .ok()?;
        self.table.try_serialize(name, &value)
    }

    pub fn names(&self) -> Vec<String> {
        self.table.names().map(str::to_string).collect()
    }
}

/// One bitfield layout usable from JavaScript.
///
/// Elements are addressed by their index in document order. Widget values
/// cross the boundary as JS numbers.
#[wasm_bindgen]
pub struct WasmBitfield {
    bitfield: Bitfield,
}

#[wasm_bindgen]
impl WasmBitfield {
    #[wasm_bindgen(constructor)]
    pub fn new(node_json: &str) -> Result<WasmBitfield, JsValue> {
        let def: BitfieldDef = serde_json::from_str(node_json).map_err(convert::error_to_js)?;
        let node = BitfieldNode::try_from(def).map_err(convert::error_to_js)?;
        Ok(WasmBitfield {
            bitfield: Bitfield::new(&node),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn key(&self) -> String {
        self.bitfield.key.clone()
    }

    #[wasm_bindgen(getter, js_name = elementCount)]
    pub fn element_count(&self) -> usize {
        self.bitfield.elements.len()
    }

    #[wasm_bindgen(js_name = elementName)]
    pub fn element_name(&self, index: usize) -> Option<String> {
        self.bitfield.elements.get(index).map(|e| e.name.clone())
    }

    #[wasm_bindgen(js_name = isInvalid)]
    pub fn is_invalid(&self) -> bool {
        self.bitfield.is_invalid()
    }

    #[wasm_bindgen(js_name = clampValues)]
    pub fn clamp_values(&self, raw: u32) -> u32 {
        self.bitfield.clamp_values(raw)
    }

    #[wasm_bindgen(js_name = getRawValue)]
    pub fn get_raw_value(&self, index: usize, raw: u32) -> Result<f64, JsValue> {
        Ok(self.element(index)?.raw_value(raw) as f64)
    }

    #[wasm_bindgen(js_name = setRawValue)]
    pub fn set_raw_value(&self, index: usize, raw: u32, value: f64) -> Result<u32, JsValue> {
        Ok(self.element(index)?.set_raw_value(raw, value as i64))
    }

    #[wasm_bindgen(js_name = getWidgetValue)]
    pub fn get_widget_value(&self, index: usize, raw: u32) -> Result<Option<f64>, JsValue> {
        Ok(self.element(index)?.widget_value(raw).map(|v| v as f64))
    }

    #[wasm_bindgen(js_name = getRawValueFromWidgetValue)]
    pub fn get_raw_value_from_widget_value(
        &self,
        index: usize,
        widget_value: f64,
    ) -> Result<Option<f64>, JsValue> {
        Ok(self
            .element(index)?
            .raw_value_from_widget_value(widget_value as i64)
            .map(|v| v as f64))
    }

    /// `[min, max]` for the element's widget control.
    #[wasm_bindgen(js_name = getWidgetRange)]
    pub fn get_widget_range(&self, index: usize) -> Result<Vec<f64>, JsValue> {
        let (min, max) = self.element(index)?.widget_range();
        Ok(vec![min as f64, max as f64])
    }

    #[wasm_bindgen(js_name = getDisplayValue)]
    pub fn get_display_value(&self, index: usize, raw: u32) -> Result<Option<f64>, JsValue> {
        Ok(self.element(index)?.display_value(raw))
    }

    #[wasm_bindgen(js_name = clampValue)]
    pub fn clamp_value(&self, index: usize, raw: u32) -> Result<u32, JsValue> {
        Ok(self.element(index)?.clamp_value(raw))
    }
}

impl WasmBitfield {
    fn element(&self, index: usize) -> Result<&BitfieldElement, JsValue> {
        self.bitfield.elements.get(index).ok_or_else(|| {
            convert::error_to_js(format!(
                "bitfield {} has no element at index {index}",
                self.bitfield.key
            ))
        })
    }
}
