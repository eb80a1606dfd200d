use serde::Serialize;
use stbcraft::value::{Record, Value};
use wasm_bindgen::JsValue;

pub fn error_to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Converts a decoded value into a plain JS object tree.
///
/// Integers become JS numbers rather than `BigInt`s.
pub fn value_to_js(value: &Value) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(error_to_js)
}

pub fn value_from_js(obj: JsValue) -> Result<Value, JsValue> {
    let raw: serde_json::Value = serde_wasm_bindgen::from_value(obj).map_err(error_to_js)?;
    convert_json_value(raw).map_err(|e| JsValue::from_str(&e))
}

pub fn convert_json_value(value: serde_json::Value) -> Result<Value, String> {
    Ok(match value {
        serde_json::Value::Null => return Err("null is not a field value".to_string()),
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Value::U64(v)
            } else if let Some(v) = n.as_i64() {
                Value::I64(v)
            } else {
                n.as_f64()
                    .map(Value::F64)
                    .ok_or_else(|| format!("unsupported number {n}"))?
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => Value::List(
            items
                .into_iter()
                .map(convert_json_value)
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(fields) => Value::Record(
            fields
                .into_iter()
                .map(|(k, v)| convert_json_value(v).map(|v| (k, v)))
                .collect::<Result<Record, _>>()?,
        ),
    })
}
