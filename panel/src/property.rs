//! Property values, datatypes and range policy
//!
//! Catalogs spell datatypes as free strings; they are parsed once into
//! [`DataType`] and every value is carried as a typed [`Value`].

use crate::error::{PanelError, PanelResult};
use maps_indi::ElementValue;
use std::fmt;

/// Strings accepted as boolean true
pub const TRUE_VALUES: &[&str] = &["1", "true", "t", "on"];

/// Strings accepted as boolean false
pub const FALSE_VALUES: &[&str] = &["0", "false", "f", "off"];

/// Datatype of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    Float,
    Int,
    Bool,
    Binary,
    #[default]
    Text,
}

impl DataType {
    /// Parse a datatype name by case-insensitive substring match,
    /// checked in the order float, int, bool, binary
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        if s.contains("float") {
            DataType::Float
        } else if s.contains("int") {
            DataType::Int
        } else if s.contains("bool") {
            DataType::Bool
        } else if s.contains("binary") {
            DataType::Binary
        } else {
            DataType::Text
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Float | DataType::Int)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Float => "float",
            DataType::Int => "int",
            DataType::Bool => "bool",
            DataType::Binary => "binary",
            DataType::Text => "string",
        };
        f.write_str(name)
    }
}

/// A typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    Binary(Vec<u8>),
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl Value {
    /// Numeric view of the value; text is never parsed here
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Binary(_) | Value::Text(_) => None,
        }
    }

    /// Display text for a value widget
    pub fn display(&self) -> String {
        match self {
            Value::Float(v) => format!("{:?}", v),
            Value::Int(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Binary(data) => String::from_utf8_lossy(data).into_owned(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Coerce into the given datatype
    pub fn coerce(&self, datatype: DataType) -> PanelResult<Value> {
        let fail = || PanelError::Coercion {
            datatype,
            value: self.display(),
        };
        let coerced = match datatype {
            DataType::Float => match self {
                Value::Text(s) => Value::Float(s.trim().parse().map_err(|_| fail())?),
                other => Value::Float(other.as_f64().ok_or_else(fail)?),
            },
            DataType::Int => match self {
                Value::Int(v) => Value::Int(*v),
                Value::Float(v) if v.is_finite() => Value::Int(v.trunc() as i64),
                Value::Bool(v) => Value::Int(i64::from(*v)),
                Value::Text(s) => Value::Int(s.trim().parse().map_err(|_| fail())?),
                _ => return Err(fail()),
            },
            DataType::Bool => match self {
                Value::Bool(v) => Value::Bool(*v),
                Value::Int(v) => Value::Bool(*v != 0),
                Value::Float(v) => Value::Bool(*v != 0.0),
                Value::Text(s) => Value::Bool(parse_bool(s).ok_or_else(fail)?),
                Value::Binary(_) => return Err(fail()),
            },
            DataType::Binary => match self {
                Value::Binary(data) => Value::Binary(data.clone()),
                other => Value::Binary(other.display().into_bytes()),
            },
            DataType::Text => Value::Text(self.display()),
        };
        Ok(coerced)
    }

    /// Coerce a value received from the device client
    pub fn from_element(datatype: DataType, element: &ElementValue) -> PanelResult<Value> {
        match element {
            ElementValue::Blob(data) => Value::Binary(data.clone()).coerce(datatype),
            ElementValue::Text(s) => Value::Text(s.clone()).coerce(datatype),
        }
    }

    /// Set-membership test used for discrete ranges; numbers compare numerically
    pub fn matches(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim().to_lowercase();
    if TRUE_VALUES.contains(&s.as_str()) {
        Some(true)
    } else if FALSE_VALUES.contains(&s.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Allowed values of a property
#[derive(Debug, Clone, PartialEq)]
pub enum DataRange {
    /// Closed numeric interval
    Interval { min: f64, max: f64 },
    /// Finite set of allowed values
    Choices(Vec<Value>),
}

/// Display style of a value widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Neutral,
    Cold,
    Hot,
    Invalid,
}

impl Style {
    /// Style sheet for the host toolkit
    pub fn stylesheet(self, module_color: &str) -> String {
        match self {
            Style::Neutral => format!("background-color: {}; color: #000000;", module_color),
            Style::Cold => "background-color: #0000FF; color: #FFFFFF;".to_string(),
            Style::Hot => "background-color: #FF0000; color: #FFFFFF;".to_string(),
            Style::Invalid => "background-color: #FFFF00; color: #00FF00;".to_string(),
        }
    }

    /// Short marker used by the text renderer
    pub fn marker(self) -> &'static str {
        match self {
            Style::Neutral => "",
            Style::Cold => "COLD",
            Style::Hot => "HOT",
            Style::Invalid => "INVALID",
        }
    }
}

impl DataRange {
    /// Classify a value against the range.
    ///
    /// A non-numeric value against an interval is reported as invalid.
    pub fn classify(&self, value: &Value) -> Style {
        match self {
            DataRange::Interval { min, max } => match value.as_f64() {
                Some(v) if v < *min => Style::Cold,
                Some(v) if v > *max => Style::Hot,
                Some(_) => Style::Neutral,
                None => Style::Invalid,
            },
            DataRange::Choices(choices) => {
                if choices.iter().any(|c| c.matches(value)) {
                    Style::Neutral
                } else {
                    Style::Invalid
                }
            }
        }
    }

    /// Classify a raw slider position (integer ticks) against the range
    pub fn classify_position(&self, position: i64) -> Style {
        self.classify(&Value::Int(position))
    }
}
