use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::validate::{ConfigShape, ShapeKind};

pub const MAX_GRID_SIZE: u8 = 12;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Chart,
    Table,
    Stat,
    List,
    Filter,
    Text,
}

fn default_grid_size() -> u8 {
    MAX_GRID_SIZE
}

/// Models write grid sizes as integers, floats, numeric strings, null, or
/// out-of-range values. Round and clamp numbers into `1..=12` and fall back
/// to the full width for anything else.
fn deserialize_grid_size<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let size = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(size
        .filter(|size| size.is_finite())
        .map_or(MAX_GRID_SIZE, |size| {
            size.round().clamp(1.0, f64::from(MAX_GRID_SIZE)) as u8
        }))
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DashboardComponent {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    /// Columns out of twelve this component spans.
    #[serde(
        rename = "gridSize",
        default = "default_grid_size",
        deserialize_with = "deserialize_grid_size"
    )]
    pub grid_size: u8,
    /// Type-specific settings, such as a table or chart configuration.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DashboardConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub components: Vec<DashboardComponent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigShape for DashboardConfig {
    const SHAPE: ShapeKind = ShapeKind::Dashboard;
    const REQUIRED_KEYS: &'static [&'static str] = &["components"];

    fn normalized(mut self) -> Self {
        self.layout.get_or_insert_with(|| "grid".to_string());
        self
    }
}

#[derive(Builder, Debug, Deserialize, Serialize, ToSchema)]
pub struct DashboardRequest {
    /// Description of the dashboard to build.
    #[serde(default)]
    pub prompt: String,
    /// Optional rows the dashboard should visualize.
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub data: Option<Value>,
    #[serde(rename = "dashboardConfig")]
    pub dashboard_config: DashboardConfig,
    pub prompt: String,
}
