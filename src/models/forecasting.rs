//! Модель прогнозирования осадок

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::lstm::LstmNetwork;
use super::metrics;
use crate::config::ModelConfig;
use crate::error::{Result, SettlementError};

pub const ARCHITECTURE_FILE: &str = "model.json";
pub const WEIGHTS_FILE: &str = "weights.json";

/// Потери (MAE) по эпохам
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub val_loss: Vec<f64>,
}

/// Описание сети, сохраняемое рядом с весами
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArchitecture {
    pub n_steps: usize,
    pub n_features: usize,
    pub lstm_units: Vec<usize>,
    pub dropout: f64,
    pub output_size: usize,
    pub loss: String,
    pub optimizer: String,
    pub seed: u64,
    pub trained_at: Option<DateTime<Utc>>,
}

/// Пути к сохранённым файлам модели
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub architecture: PathBuf,
    pub weights: PathBuf,
}

/// Adam для параметров выходного слоя
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Array1<f64>,
    v: Array1<f64>,
    t: i32,
}

impl Adam {
    fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            m: Array1::zeros(size),
            v: Array1::zeros(size),
            t: 0,
        }
    }

    fn step(&mut self, params: &mut Array1<f64>, grads: &Array1<f64>) {
        self.t += 1;
        let (b1, b2) = (self.beta1, self.beta2);
        self.m = &self.m * b1 + grads * (1.0 - b1);
        self.v = &self.v * b2 + &grads.mapv(|g| g * g) * (1.0 - b2);

        let m_hat_scale = 1.0 / (1.0 - b1.powi(self.t));
        let v_hat_scale = 1.0 / (1.0 - b2.powi(self.t));
        for ((p, m), v) in params.iter_mut().zip(self.m.iter()).zip(self.v.iter()) {
            let m_hat = m * m_hat_scale;
            let v_hat = v * v_hat_scale;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

pub struct ForecastingModel {
    config: ModelConfig,
    network: LstmNetwork,
    n_steps: usize,
    seed: u64,
    history: TrainingHistory,
    trained_at: Option<DateTime<Utc>>,
}

impl ForecastingModel {
    /// Сеть для входа [n_steps, n_features]; все случайные величины от `seed`
    pub fn new(config: ModelConfig, n_steps: usize, n_features: usize, seed: u64) -> Result<Self> {
        config.validate()?;
        if n_steps == 0 {
            return Err(SettlementError::InvalidInput(
                "sequence length must be positive".to_string(),
            ));
        }

        let network = LstmNetwork::new(n_features, &config.lstm_units, seed)?;
        Ok(Self {
            config,
            network,
            n_steps,
            seed,
            history: TrainingHistory::default(),
            trained_at: None,
        })
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn is_trained(&self) -> bool {
        self.trained_at.is_some()
    }

    pub fn architecture(&self) -> ModelArchitecture {
        ModelArchitecture {
            n_steps: self.n_steps,
            n_features: self.network.n_features,
            lstm_units: self.network.units(),
            dropout: self.config.dropout,
            output_size: 1,
            loss: "mae".to_string(),
            optimizer: "adam".to_string(),
            seed: self.seed,
            trained_at: self.trained_at,
        }
    }

    fn check_samples(&self, x: &Array3<f64>, y: &Array1<f64>) -> Result<()> {
        if x.shape()[0] != y.len() {
            return Err(SettlementError::ShapeMismatch {
                expected: format!("{} targets", x.shape()[0]),
                actual: format!("{} targets", y.len()),
            });
        }
        if x.shape()[1] != self.n_steps {
            return Err(SettlementError::ShapeMismatch {
                expected: format!("{} time steps", self.n_steps),
                actual: format!("{} time steps", x.shape()[1]),
            });
        }
        Ok(())
    }

    /// Обучение выходного слоя по MAE; рекуррентные веса фиксированы после инициализации
    pub fn train(
        &mut self,
        train_x: &Array3<f64>,
        train_y: &Array1<f64>,
        validation: Option<(&Array3<f64>, &Array1<f64>)>,
    ) -> Result<&TrainingHistory> {
        self.check_samples(train_x, train_y)?;
        let n_samples = train_y.len();
        if n_samples == 0 {
            return Err(SettlementError::InvalidInput("Empty dataset".to_string()));
        }

        let encoded = self.network.encode(train_x)?;
        let val_encoded = match validation {
            Some((x, y)) => {
                self.check_samples(x, y)?;
                Some((self.network.encode(x)?, y))
            }
            None => None,
        };

        // Отдельный поток случайных чисел для перемешивания и dropout
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let mut adam = Adam::new(self.network.head.params.len(), self.config.learning_rate);
        let batch_size = self.config.batch_size.min(n_samples);
        let keep = 1.0 - self.config.dropout;
        let hidden = self.network.head.input_size();

        self.history = TrainingHistory::default();
        let mut order: Vec<usize> = (0..n_samples).collect();

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let mut grads: Array1<f64> = Array1::zeros(hidden + 1);

                for &i in batch {
                    let mut h = encoded.row(i).to_owned();
                    if self.config.dropout > 0.0 {
                        h.mapv_inplace(|v| if rng.gen::<f64>() < keep { v / keep } else { 0.0 });
                    }

                    let err = self.network.head.forward(h.view()) - train_y[i];
                    epoch_loss += err.abs();

                    let sign = if err > 0.0 {
                        1.0
                    } else if err < 0.0 {
                        -1.0
                    } else {
                        0.0
                    };
                    for j in 0..hidden {
                        grads[j] += sign * h[j];
                    }
                    grads[hidden] += sign;
                }

                grads /= batch.len() as f64;
                adam.step(&mut self.network.head.params, &grads);
            }

            let loss = epoch_loss / n_samples as f64;
            self.history.loss.push(loss);

            if let Some((ref x, y)) = val_encoded {
                let val_pred = self.network.readout(x);
                let val_loss = metrics::mae(y.view(), val_pred.view())?;
                self.history.val_loss.push(val_loss);
                tracing::debug!("epoch {}: loss {:.6}, val_loss {:.6}", epoch + 1, loss, val_loss);
            } else {
                tracing::debug!("epoch {}: loss {:.6}", epoch + 1, loss);
            }
        }

        self.trained_at = Some(Utc::now());
        tracing::info!(
            "Forecasting model trained. Final MAE: {:.6}",
            self.history.loss.last().copied().unwrap_or(0.0)
        );

        Ok(&self.history)
    }

    pub fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>> {
        if !self.is_trained() {
            return Err(SettlementError::NotFitted("ForecastingModel"));
        }
        if x.shape()[1] != self.n_steps {
            return Err(SettlementError::ShapeMismatch {
                expected: format!("{} time steps", self.n_steps),
                actual: format!("{} time steps", x.shape()[1]),
            });
        }
        self.network.predict(x)
    }

    /// Сохраняет `model.json` (архитектура) и `weights.json` (параметры)
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<ModelArtifacts> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let architecture = dir.join(ARCHITECTURE_FILE);
        let weights = dir.join(WEIGHTS_FILE);

        let saved = SavedModel {
            architecture: self.architecture(),
            config: self.config.clone(),
        };
        fs::write(&architecture, serde_json::to_vec_pretty(&saved)?)?;
        fs::write(&weights, serde_json::to_vec(&self.network)?)?;

        tracing::info!("Saved model to {}", dir.display());
        Ok(ModelArtifacts {
            architecture,
            weights,
        })
    }

    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let saved: SavedModel = serde_json::from_slice(&fs::read(dir.join(ARCHITECTURE_FILE))?)?;
        let network: LstmNetwork = serde_json::from_slice(&fs::read(dir.join(WEIGHTS_FILE))?)?;

        if network.units() != saved.architecture.lstm_units
            || network.n_features != saved.architecture.n_features
        {
            return Err(SettlementError::ShapeMismatch {
                expected: format!(
                    "units {:?}, {} features",
                    saved.architecture.lstm_units, saved.architecture.n_features
                ),
                actual: format!("units {:?}, {} features", network.units(), network.n_features),
            });
        }

        Ok(Self {
            config: saved.config,
            network,
            n_steps: saved.architecture.n_steps,
            seed: saved.architecture.seed,
            history: TrainingHistory::default(),
            trained_at: saved.architecture.trained_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedModel {
    architecture: ModelArchitecture,
    config: ModelConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ModelConfig {
        ModelConfig {
            lstm_units: vec![8],
            dropout: 0.0,
            learning_rate: 0.05,
            batch_size: 4,
            epochs: 30,
        }
    }

    fn toy_data() -> (Array3<f64>, Array1<f64>) {
        let x = Array3::from_shape_fn((20, 1, 1), |(i, _, _)| i as f64 / 20.0);
        let y = Array1::from_shape_fn(20, |i| 2.0 + 0.5 * (i as f64 / 20.0));
        (x, y)
    }

    #[test]
    fn test_train_reduces_loss() {
        let (x, y) = toy_data();
        let mut model = ForecastingModel::new(small_config(), 1, 1, 3).unwrap();
        let history = model.train(&x, &y, Some((&x, &y))).unwrap().clone();

        assert_eq!(history.loss.len(), 30);
        assert_eq!(history.val_loss.len(), 30);
        assert!(history.loss.last().unwrap() < history.loss.first().unwrap());
    }

    #[test]
    fn test_predict_requires_training() {
        let (x, _) = toy_data();
        let model = ForecastingModel::new(small_config(), 1, 1, 3).unwrap();
        assert!(matches!(
            model.predict(&x),
            Err(SettlementError::NotFitted(_))
        ));
    }

    #[test]
    fn test_target_count_mismatch() {
        let (x, _) = toy_data();
        let mut model = ForecastingModel::new(small_config(), 1, 1, 3).unwrap();
        let y = Array1::zeros(3);
        assert!(model.train(&x, &y, None).is_err());
    }
}
