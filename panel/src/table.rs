//! Property table
//!
//! Module name -> ordered mapping of property key -> record. The table is
//! owned by the panel controller; display order is insertion order.

use crate::error::{PanelError, PanelResult};
use crate::property::{DataRange, DataType, Style, Value};
use indexmap::map::Entry;
use indexmap::IndexMap;
use maps_indi::IndiPermission;
use std::collections::BTreeSet;

/// Metadata and current value of one device property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub label: String,
    pub unit: String,
    pub tooltip: String,
    pub datatype: DataType,
    pub datarange: Option<DataRange>,
    pub actval: Value,
    pub permission: IndiPermission,
}

impl Default for PropertyRecord {
    fn default() -> Self {
        Self {
            label: String::new(),
            unit: String::new(),
            tooltip: String::new(),
            datatype: DataType::Text,
            datarange: None,
            actval: Value::default(),
            permission: IndiPermission::ReadOnly,
        }
    }
}

impl PropertyRecord {
    /// Label text shown next to the value: `label [unit]`, or the key when unlabelled
    pub fn display_label(&self, key: &str) -> String {
        match (self.label.trim(), self.unit.trim()) {
            ("", _) => key.to_string(),
            (label, "") => label.to_string(),
            (label, unit) => format!("{} [{}]", label, unit),
        }
    }

    /// Style of the current value, or `None` when the record has no range
    pub fn range_style(&self) -> Option<Style> {
        self.datarange.as_ref().map(|r| r.classify(&self.actval))
    }

    pub fn is_writable(&self) -> bool {
        self.permission.is_writable()
    }
}

/// Ordered `key -> record` map with unique keys
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    records: IndexMap<String, PropertyRecord>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; keys must be unique
    pub fn insert(&mut self, key: &str, record: PropertyRecord) -> Result<(), String> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(_) => Err(key.to_string()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyRecord> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyRecord> {
        self.records.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyRecord)> {
        self.records.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PropertyRecord)> {
        self.records.iter_mut().map(|(k, r)| (k.as_str(), r))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Owned `(key, record)` pairs in display order, optionally writable only
    pub fn entries(&self, writable_only: bool) -> Vec<(String, PropertyRecord)> {
        self.records
            .iter()
            .filter(|(_, r)| !writable_only || r.is_writable())
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }
}

/// Named, coloured collection of records
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub title: String,
    pub color: String,
    pub records: PropertyMap,
}

impl Module {
    pub fn new(name: &str, title: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            color: color.to_string(),
            records: PropertyMap::new(),
        }
    }

    pub fn insert(&mut self, key: &str, record: PropertyRecord) -> PanelResult<()> {
        self.records
            .insert(key, record)
            .map_err(|key| PanelError::DuplicateKey {
                module: self.name.clone(),
                key,
            })
    }
}

/// Unique `(device, property)` streams of the given keys, sorted
pub fn streams<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
    keys.into_iter()
        .filter_map(|key| maps_indi::split_key(key).ok())
        .map(|(device, property, _)| (device.to_string(), property.to_string()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// All modules known to a panel, in catalog order
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    modules: Vec<Module>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: Module) -> PanelResult<()> {
        if self.module(&module.name).is_some() {
            return Err(PanelError::Catalog(format!(
                "module '{}' defined twice",
                module.name
            )));
        }
        self.modules.push(module);
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// The last module in catalog order
    pub fn default_module(&self) -> Option<&str> {
        self.modules.last().map(|m| m.name.as_str())
    }

    /// Take ownership of one module, leaving the rest of the table behind
    pub fn into_module(self, name: &str) -> PanelResult<Module> {
        self.modules
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| PanelError::UnknownModule(name.to_string()))
    }
}
