use bon::Builder;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::validate::{ConfigShape, ShapeKind};

/// Chart configuration. `series` is a flat number array for pie-like charts
/// and an array of `{name, data}` for everything else.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChartConfig {
    pub options: Value,
    pub series: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigShape for ChartConfig {
    const SHAPE: ShapeKind = ShapeKind::Chart;
    const REQUIRED_KEYS: &'static [&'static str] = &["options", "series"];

    fn normalized(mut self) -> Self {
        // Series always sits beside options.
        if let Some(options) = self.options.as_object_mut() {
            options.remove("series");
        }
        self
    }
}

/// Schema handed to the model when requesting structured chart output.
#[allow(dead_code)]
#[derive(JsonSchema)]
pub struct ChartConfigSchema {
    /// Display, axis, and chart type settings.
    pub options: Map<String, Value>,
    /// Data series. Never nested inside `options`.
    pub series: Vec<Value>,
}

impl ChartConfigSchema {
    pub fn response_format() -> Value {
        json!(
            {
                "type": "json_schema",
                "json_schema": {
                    "name": "chart_config",
                    "schema": schema_for!(ChartConfigSchema)
                }
            }
        )
    }
}

#[derive(Builder, Debug, Deserialize, Serialize, ToSchema)]
pub struct ChartRequest {
    /// Rows to chart.
    #[schema(value_type = Object)]
    #[serde(default)]
    pub data: Value,
    /// What chart to make or how to change it.
    #[serde(default)]
    pub prompt: String,
    /// Current chart configuration, if one exists.
    #[schema(value_type = Option<Object>)]
    pub config: Option<Value>,
}

#[derive(Serialize)]
pub struct UpdatedChartResponse {
    #[serde(rename = "updatedChartConfig")]
    pub updated_chart_config: ChartConfig,
}
