use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::models::{chart::ChartConfig, dashboard::DashboardConfig, table::TableConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Table,
    Chart,
    Dashboard,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Table => "table",
            Self::Chart => "chart",
            Self::Dashboard => "dashboard",
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("{shape} configuration must be a JSON object")]
    NotAnObject { shape: ShapeKind },
    #[error("{shape} configuration is missing {}", keys.join(", "))]
    MissingKeys {
        shape: ShapeKind,
        keys: Vec<&'static str>,
    },
    #[error("{shape} configuration is malformed: {message}")]
    InvalidShape { shape: ShapeKind, message: String },
}

impl ValidationError {
    pub fn shape(&self) -> ShapeKind {
        match self {
            Self::NotAnObject { shape }
            | Self::MissingKeys { shape, .. }
            | Self::InvalidShape { shape, .. } => *shape,
        }
    }

    /// What is wrong, without naming the shape.
    pub fn reason(&self) -> String {
        match self {
            Self::NotAnObject { .. } => "expected a JSON object".to_string(),
            Self::MissingKeys { keys, .. } => format!("missing {}", keys.join(", ")),
            Self::InvalidShape { message, .. } => message.clone(),
        }
    }
}

/// A front-end configuration object the model is asked to produce.
///
/// Validation only checks that the required top-level keys exist before
/// deserializing; nested payloads are passed through as the model wrote
/// them.
pub trait ConfigShape: DeserializeOwned + Serialize {
    const SHAPE: ShapeKind;
    const REQUIRED_KEYS: &'static [&'static str];

    /// Repairs applied after a successful validation.
    fn normalized(self) -> Self {
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TypedConfig {
    Table(TableConfig),
    Chart(ChartConfig),
    Dashboard(DashboardConfig),
}

pub fn validate_as<T: ConfigShape>(value: Value) -> Result<T, ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(ValidationError::NotAnObject { shape: T::SHAPE });
    };
    let keys: Vec<&'static str> = T::REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !keys.is_empty() {
        return Err(ValidationError::MissingKeys {
            shape: T::SHAPE,
            keys,
        });
    }
    serde_json::from_value::<T>(value)
        .map(ConfigShape::normalized)
        .map_err(|err| ValidationError::InvalidShape {
            shape: T::SHAPE,
            message: err.to_string(),
        })
}

pub fn validate(value: Value, shape: ShapeKind) -> Result<TypedConfig, ValidationError> {
    match shape {
        ShapeKind::Table => validate_as::<TableConfig>(value).map(TypedConfig::Table),
        ShapeKind::Chart => validate_as::<ChartConfig>(value).map(TypedConfig::Chart),
        ShapeKind::Dashboard => validate_as::<DashboardConfig>(value).map(TypedConfig::Dashboard),
    }
}
