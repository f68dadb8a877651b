//! Module catalog
//!
//! Modules and their records are described in JSON. The built-in MAPS
//! catalog is compiled in; `--catalog` swaps in a file with the same layout.
//! A synthetic `all` module holding every record is appended last.

use crate::error::{PanelError, PanelResult};
use crate::property::{DataRange, DataType, Value};
use crate::table::{Module, PropertyRecord, PropertyTable};
use maps_indi::IndiPermission;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::path::Path;

/// Name of the synthetic module holding every record
pub const ALL_MODULE: &str = "all";

const BUILTIN_CATALOG: &str = include_str!("../catalog/maps.json");

/// Named colours drawn at random for `all` module pages
pub const PALETTE: &[(&str, &str)] = &[
    ("aliceblue", "#F0F8FF"),
    ("azure", "#F0FFFF"),
    ("beige", "#F5F5DC"),
    ("honeydew", "#F0FFF0"),
    ("lavender", "#E6E6FA"),
    ("lemonchiffon", "#FFFACD"),
    ("lightcyan", "#E0FFFF"),
    ("mintcream", "#F5FFFA"),
    ("mistyrose", "#FFE4E1"),
    ("papayawhip", "#FFEFD5"),
    ("seashell", "#FFF5EE"),
    ("wheat", "#F5DEB3"),
];

/// Pick a random `(name, code)` pair from [`PALETTE`]
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static str) {
    PALETTE.choose(rng).copied().unwrap_or(("white", "#FFFFFF"))
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    modules: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default = "default_color")]
    color: String,
    #[serde(default)]
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    key: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    tooltip: String,
    #[serde(default)]
    datatype: String,
    #[serde(default)]
    datarange: Option<RangeEntry>,
    #[serde(default)]
    actval: serde_json::Value,
    #[serde(default = "default_permission")]
    permission: String,
}

/// `{"min": .., "max": ..}` for an interval, a JSON array for a choice set
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RangeEntry {
    Interval { min: f64, max: f64 },
    Choices(Vec<serde_json::Value>),
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

fn default_permission() -> String {
    "ro".to_string()
}

fn json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::default(),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn initial_value(datatype: DataType, actval: &serde_json::Value) -> PanelResult<Value> {
    if actval.is_null() {
        return Ok(match datatype {
            DataType::Float => Value::Float(0.0),
            DataType::Int => Value::Int(0),
            DataType::Bool => Value::Bool(false),
            DataType::Binary => Value::Binary(Vec::new()),
            DataType::Text => Value::Text(String::new()),
        });
    }
    json_value(actval).coerce(datatype)
}

impl RecordEntry {
    fn into_record(self) -> PanelResult<(String, PropertyRecord)> {
        if maps_indi::split_key(&self.key).is_err() {
            return Err(PanelError::Catalog(format!(
                "key '{}' is not of the form device.property[.element]",
                self.key
            )));
        }
        let datatype = DataType::parse(&self.datatype);
        let datarange = match self.datarange {
            None => None,
            Some(RangeEntry::Interval { min, max }) => {
                if min > max {
                    return Err(PanelError::Catalog(format!(
                        "key '{}' has an empty range [{}, {}]",
                        self.key, min, max
                    )));
                }
                Some(DataRange::Interval { min, max })
            }
            Some(RangeEntry::Choices(choices)) => Some(DataRange::Choices(
                choices
                    .iter()
                    .map(|c| json_value(c).coerce(datatype))
                    .collect::<PanelResult<Vec<_>>>()?,
            )),
        };
        let actval = initial_value(datatype, &self.actval)?;
        Ok((
            self.key,
            PropertyRecord {
                label: self.label,
                unit: self.unit,
                tooltip: self.tooltip,
                datatype,
                datarange,
                actval,
                permission: IndiPermission::parse(&self.permission),
            },
        ))
    }
}

/// Build a property table from catalog JSON
pub fn from_json_str(json: &str) -> PanelResult<PropertyTable> {
    let file: CatalogFile = serde_json::from_str(json)?;
    let mut table = PropertyTable::new();
    let mut explicit_all = None;
    let mut all = Module::new(ALL_MODULE, "All", &default_color());

    for entry in file.modules {
        let title = if entry.title.is_empty() {
            entry.name.clone()
        } else {
            entry.title
        };
        let mut module = Module::new(&entry.name, &title, &entry.color);
        for record in entry.records {
            let (key, record) = record.into_record()?;
            module.insert(&key, record)?;
        }
        if entry.name == ALL_MODULE {
            explicit_all = Some(module);
            continue;
        }
        for (key, record) in module.records.iter() {
            all.insert(key, record.clone())?;
        }
        table.add_module(module)?;
    }

    table.add_module(explicit_all.unwrap_or(all))?;
    tracing::debug!("Loaded catalog with modules {:?}", table.names());
    Ok(table)
}

/// Load a catalog file
pub fn load(path: &Path) -> PanelResult<PropertyTable> {
    tracing::info!("Loading catalog from {}", path.display());
    let json = std::fs::read_to_string(path)?;
    from_json_str(&json)
}

/// The compiled-in MAPS catalog
pub fn builtin() -> PanelResult<PropertyTable> {
    from_json_str(BUILTIN_CATALOG)
}
