//! Panel error types

use crate::property::DataType;
use maps_indi::IndiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Duplicate property key '{key}' in module '{module}'")]
    DuplicateKey { module: String, key: String },

    #[error("Unknown property key: {0}")]
    UnknownKey(String),

    #[error("Property {key} has no {control} control")]
    NoControl { key: String, control: &'static str },

    #[error("Cannot coerce '{value}' to {datatype}")]
    Coercion { datatype: DataType, value: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Indi(#[from] IndiError),
}

pub type PanelResult<T> = Result<T, PanelError>;
