/// Типы запросов и ответов API

use serde::{Deserialize, Serialize};

use crate::config::ExperimentConfig;
use crate::preprocessing::SupervisedFrame;

fn default_drop_incomplete() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisedRequest {
    pub values: Vec<Vec<f64>>,
    pub n_in: usize,
    pub n_out: usize,
    #[serde(default = "default_drop_incomplete")]
    pub drop_incomplete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisedResponse {
    pub columns: Vec<String>,
    /// Отсутствующие значения - null
    pub rows: Vec<Vec<Option<f64>>>,
    pub anchors: Vec<usize>,
}

impl From<&SupervisedFrame> for SupervisedResponse {
    fn from(frame: &SupervisedFrame) -> Self {
        Self {
            columns: frame.column_names(),
            rows: frame.to_rows(),
            anchors: frame.anchors.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRequest {
    #[serde(default)]
    pub config: ExperimentConfig,
    pub values: Vec<Vec<f64>>,
}
