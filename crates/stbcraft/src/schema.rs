//! Format table: every compiled entry of a schema document, by name.

use std::sync::Arc;

use crate::{
    compiled::{EntryTable, FormatEntry},
    errors::{CompileError, ReadError, WriteError},
    node::FormatNode,
    value::Value,
};

/// Compiled formats of one or more schema documents. Use [FormatTable::compile]
/// to build from [FormatNode]s, then [FormatTable::parse] / [FormatTable::serialize]
/// (or their `try_` forms) to move between bytes and [Value]s.
#[derive(Debug, Clone, Default)]
pub struct FormatTable {
    entries: EntryTable,
}

impl FormatTable {
    /// Compiles top-level nodes in order. Later nodes may refer to earlier ones by name.
    pub fn compile(nodes: &[FormatNode]) -> Result<Self, CompileError> {
        let mut table = FormatTable::default();
        table.load(nodes)?;
        Ok(table)
    }

    /// Adds another document to the table.
    ///
    /// Entries with an existing name replace the old definition. Either the
    /// whole document loads or the table is left unchanged.
    pub fn load(&mut self, nodes: &[FormatNode]) -> Result<(), CompileError> {
        let mut entries = self.entries.clone();

        for node in nodes {
            let entry = FormatEntry::compile(node, &entries)?;
            if entries.contains_key(&entry.name) {
                log::debug!("format `{}` redefined", entry.name);
            }
            entries.insert(entry.name.clone(), Arc::new(entry));
        }

        log::debug!(
            "compiled {} formats ({} total)",
            nodes.len(),
            entries.len()
        );
        self.entries = entries;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FormatEntry> {
        self.entries.get(name).map(Arc::as_ref)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes `data` with the named format.
    pub fn parse(&self, name: &str, data: &[u8]) -> Result<Value, ReadError> {
        let (value, consumed) = self.parse_with_extent(name, data)?;
        if consumed < data.len() {
            log::debug!(
                "format `{name}` left {} trailing bytes unread",
                data.len() - consumed
            );
        }
        Ok(value)
    }

    /// Decodes `data` with the named format; also returns the bytes consumed.
    pub fn parse_with_extent(&self, name: &str, data: &[u8]) -> Result<(Value, usize), ReadError> {
        self.get(name)
            .ok_or_else(|| ReadError::UnknownFormat(name.to_string()))?
            .parse(data)
    }

    /// Encodes `value` with the named format into an exactly sized buffer.
    pub fn serialize(&self, name: &str, value: &Value) -> Result<Vec<u8>, WriteError> {
        self.get(name)
            .ok_or_else(|| WriteError::UnknownFormat(name.to_string()))?
            .serialize(value)
    }

    /// Like [FormatTable::parse], but logs the failure and returns `None`.
    pub fn try_parse(&self, name: &str, data: &[u8]) -> Option<Value> {
        self.parse(name, data)
            .inspect_err(|err| log::error!("Failed to parse format {name}: {err}"))
            .ok()
    }

    /// Like [FormatTable::serialize], but logs the failure and returns `None`.
    pub fn try_serialize(&self, name: &str, value: &Value) -> Option<Vec<u8>> {
        self.serialize(name, value)
            .inspect_err(|err| log::error!("Failed to serialize format {name}: {err}"))
            .ok()
    }
}

impl TryFrom<&[FormatNode]> for FormatTable {
    type Error = CompileError;

    fn try_from(nodes: &[FormatNode]) -> Result<Self, Self::Error> {
        FormatTable::compile(nodes)
    }
}
