//! Конфигурация эксперимента

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SettlementError};
use crate::preprocessing::TrainSplit;

/// Гиперпараметры сети и обучения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Размеры LSTM слоёв, снизу вверх
    pub lstm_units: Vec<usize>,
    pub dropout: f64,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            lstm_units: vec![128, 128],
            dropout: 0.2,
            learning_rate: 0.001,
            batch_size: 32,
            epochs: 50,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lstm_units.is_empty() || self.lstm_units.contains(&0) {
            return Err(SettlementError::Config(format!(
                "lstm_units must be non-empty and positive, got {:?}",
                self.lstm_units
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(SettlementError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(SettlementError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 || self.epochs == 0 {
            return Err(SettlementError::Config(
                "batch_size and epochs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Полное описание одного прогона
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: String,
    /// CSV с измерениями; не нужен, если данные переданы напрямую
    pub dataset: Option<PathBuf>,
    /// Длина окна лагов (n_in)
    pub window: usize,
    /// Горизонт прогноза (n_out)
    pub horizon: usize,
    /// Индекс прогнозируемого признака (с 0)
    pub target_variable: usize,
    pub split: TrainSplit,
    pub feature_range: (f64, f64),
    pub model: ModelConfig,
    pub seed: u64,
    /// Куда сохранять model.json и weights.json
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::settlement()
    }
}

impl ExperimentConfig {
    /// Базовый вариант: один лаг, два слоя по 128
    pub fn settlement() -> Self {
        Self {
            name: "settlement".to_string(),
            dataset: Some(PathBuf::from("data/ML_test.csv")),
            window: 1,
            horizon: 1,
            target_variable: 0,
            split: TrainSplit::Rows(686),
            feature_range: (0.0, 1.0),
            model: ModelConfig::default(),
            seed: 7,
            artifact_dir: Some(PathBuf::from("artifacts/settlement")),
        }
    }

    /// Вариант с третьим LSTM слоем и более длинным обучением
    pub fn settlement_deep() -> Self {
        Self {
            name: "settlement-deep".to_string(),
            dataset: Some(PathBuf::from("data/ML_test_full.csv")),
            model: ModelConfig {
                lstm_units: vec![128, 128, 128],
                epochs: 100,
                ..ModelConfig::default()
            },
            artifact_dir: Some(PathBuf::from("artifacts/settlement-deep")),
            ..Self::settlement()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window < 1 || self.horizon < 1 {
            return Err(SettlementError::Config(format!(
                "window and horizon must be positive, got {} and {}",
                self.window, self.horizon
            )));
        }
        if !(self.feature_range.0 < self.feature_range.1) {
            return Err(SettlementError::Config(format!(
                "invalid feature_range {:?}",
                self.feature_range
            )));
        }
        match self.split {
            TrainSplit::Rows(0) => {
                return Err(SettlementError::Config("split rows must be positive".to_string()))
            }
            TrainSplit::Fraction(f) if !(f > 0.0 && f < 1.0) => {
                return Err(SettlementError::Config(format!(
                    "split fraction must be in (0, 1), got {}",
                    f
                )))
            }
            _ => {}
        }
        self.model.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        assert!(ExperimentConfig::settlement().validate().is_ok());
        let deep = ExperimentConfig::settlement_deep();
        assert!(deep.validate().is_ok());
        assert_eq!(deep.model.lstm_units.len(), 3);
        assert_eq!(deep.window, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"window": 3, "model": {"epochs": 5}, "split": {"fraction": 0.7}}"#)
                .unwrap();

        assert_eq!(config.window, 3);
        assert_eq!(config.model.epochs, 5);
        assert_eq!(config.model.lstm_units, vec![128, 128]);
        assert_eq!(config.split, TrainSplit::Fraction(0.7));
    }

    #[test]
    fn test_invalid_dropout() {
        let mut config = ExperimentConfig::settlement();
        config.model.dropout = 1.0;
        assert!(matches!(config.validate(), Err(SettlementError::Config(_))));
    }
}
