//! Полный прогон: масштабирование, окно лагов, обучение, оценка

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ExperimentConfig;
use crate::data::DataLoader;
use crate::error::{Result, SettlementError};
use crate::models::forecasting::{ForecastingModel, ModelArtifacts, TrainingHistory};
use crate::models::metrics;
use crate::preprocessing::{series_to_supervised, FeatureEngineer, MinMaxScaler};

/// Итог эксперимента
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub name: String,
    /// (строки, столбцы) таблицы лагов
    pub frame_shape: (usize, usize),
    pub n_train: usize,
    pub n_test: usize,
    pub history: TrainingHistory,
    /// RMSE на тесте в исходных единицах
    pub rmse: f64,
    pub mae: f64,
    pub predictions: Vec<f64>,
    pub actual: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ModelArtifacts>,
}

pub struct Experiment {
    config: ExperimentConfig,
    scaler: MinMaxScaler,
    model: Option<ForecastingModel>,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let scaler = MinMaxScaler::new(config.feature_range)?;
        Ok(Self {
            config,
            scaler,
            model: None,
        })
    }

    pub fn model(&self) -> Option<&ForecastingModel> {
        self.model.as_ref()
    }

    /// Читает CSV из `config.dataset`
    pub fn run_from_dataset(&mut self) -> Result<ExperimentReport> {
        let path = self.config.dataset.clone().ok_or_else(|| {
            SettlementError::Config("dataset path is not set".to_string())
        })?;
        let data = DataLoader::from_csv(&path)?;
        self.run(&data.values)
    }

    pub fn run(&mut self, values: &Array2<f64>) -> Result<ExperimentReport> {
        let cfg = &self.config;
        tracing::info!(
            "Experiment '{}': {} rows x {} features, window {}, horizon {}",
            cfg.name,
            values.nrows(),
            values.ncols(),
            cfg.window,
            cfg.horizon
        );

        let scaled = self.scaler.fit_transform(values)?;
        let frame = series_to_supervised(scaled.view(), cfg.window, cfg.horizon, true)?.non_empty()?;
        tracing::info!("Supervised frame: {} x {}", frame.nrows(), frame.ncols());

        let expected_rows = values.nrows() + 1 - cfg.window - cfg.horizon;
        if frame.nrows() < expected_rows {
            tracing::warn!(
                "Dropped {} rows with missing values",
                expected_rows - frame.nrows()
            );
        }

        let split = FeatureEngineer::split(&frame, cfg.target_variable, cfg.split)?;
        tracing::info!("Train: {} samples, test: {} samples", split.n_train(), split.n_test());

        let mut model =
            ForecastingModel::new(cfg.model.clone(), cfg.window, frame.n_vars, cfg.seed)?;
        let history = model
            .train(&split.train_x, &split.train_y, Some((&split.test_x, &split.test_y)))?
            .clone();

        let yhat = model.predict(&split.test_x)?;
        let inv_yhat = self
            .scaler
            .inverse_transform_column(yhat.view(), cfg.target_variable)?;
        let inv_y = self
            .scaler
            .inverse_transform_column(split.test_y.view(), cfg.target_variable)?;

        let rmse = metrics::rmse(inv_y.view(), inv_yhat.view())?;
        let mae = metrics::mae(inv_y.view(), inv_yhat.view())?;
        tracing::info!("Test RMSE: {:.8}", rmse);

        let artifacts = match &cfg.artifact_dir {
            Some(dir) => Some(model.save(dir)?),
            None => None,
        };

        let report = ExperimentReport {
            name: cfg.name.clone(),
            frame_shape: (frame.nrows(), frame.ncols()),
            n_train: split.n_train(),
            n_test: split.n_test(),
            history,
            rmse,
            mae,
            predictions: inv_yhat.to_vec(),
            actual: inv_y.to_vec(),
            artifacts,
        };

        self.model = Some(model);
        Ok(report)
    }

    /// Сохраняет обученную модель в произвольный каталог
    pub fn save_artifacts<P: AsRef<Path>>(&self, dir: P) -> Result<ModelArtifacts> {
        self.model
            .as_ref()
            .ok_or(SettlementError::NotFitted("Experiment"))?
            .save(dir)
    }
}
