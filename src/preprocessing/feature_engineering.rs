//! Подготовка выборок для рекуррентной сети

use ndarray::{s, Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use super::supervised::{ColumnLabel, SupervisedFrame};
use crate::error::{Result, SettlementError};

/// Граница train/test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainSplit {
    /// Первые n строк - обучение
    Rows(usize),
    /// Доля строк для обучения
    Fraction(f64),
}

impl TrainSplit {
    pub fn train_rows(&self, total: usize) -> usize {
        match *self {
            TrainSplit::Rows(n) => n,
            TrainSplit::Fraction(f) => (total as f64 * f) as usize,
        }
    }
}

impl Default for TrainSplit {
    fn default() -> Self {
        TrainSplit::Fraction(0.8)
    }
}

/// Обучающая и тестовая выборки
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    /// [samples, n_in, n_features]
    pub train_x: Array3<f64>,
    pub train_y: Array1<f64>,
    pub test_x: Array3<f64>,
    pub test_y: Array1<f64>,
}

impl DatasetSplit {
    pub fn n_train(&self) -> usize {
        self.train_y.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_y.len()
    }
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Делит таблицу лагов на вход (все лаги) и цель `var{target+1}(t)`
    pub fn split(
        frame: &SupervisedFrame,
        target_variable: usize,
        split: TrainSplit,
    ) -> Result<DatasetSplit> {
        if target_variable >= frame.n_vars {
            return Err(SettlementError::InvalidInput(format!(
                "target variable {} out of range for {} variables",
                target_variable, frame.n_vars
            )));
        }

        let target_col = frame
            .column_index(ColumnLabel::new(target_variable + 1, 0))
            .ok_or_else(|| SettlementError::InvalidInput("target column missing".to_string()))?;

        let n_rows = frame.nrows();
        let n_train = split.train_rows(n_rows);
        if n_train == 0 || n_train >= n_rows {
            return Err(SettlementError::InvalidInput(format!(
                "train split of {} rows leaves no data on one side ({} rows total)",
                n_train, n_rows
            )));
        }

        let n_obs = frame.n_lag_columns();
        let inputs = frame.values.slice(s![.., ..n_obs]).to_owned();
        let target = frame.values.column(target_col).to_owned();

        let train_x = Self::to_sequences(
            &inputs.slice(s![..n_train, ..]).to_owned(),
            frame.n_in,
            frame.n_vars,
        )?;
        let test_x = Self::to_sequences(
            &inputs.slice(s![n_train.., ..]).to_owned(),
            frame.n_in,
            frame.n_vars,
        )?;

        Ok(DatasetSplit {
            train_x,
            train_y: target.slice(s![..n_train]).to_owned(),
            test_x,
            test_y: target.slice(s![n_train..]).to_owned(),
        })
    }

    /// [samples, n_in*n_features] -> [samples, n_in, n_features]
    pub fn to_sequences(
        inputs: &Array2<f64>,
        n_steps: usize,
        n_features: usize,
    ) -> Result<Array3<f64>> {
        let expected = n_steps * n_features;
        if inputs.ncols() != expected {
            return Err(SettlementError::ShapeMismatch {
                expected: format!("{} columns", expected),
                actual: format!("{} columns", inputs.ncols()),
            });
        }

        let samples = inputs.nrows();
        let flat: Vec<f64> = inputs.iter().copied().collect();
        Array3::from_shape_vec((samples, n_steps, n_features), flat).map_err(|e| {
            SettlementError::ShapeMismatch {
                expected: format!("[{}, {}, {}]", samples, n_steps, n_features),
                actual: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::supervised::series_to_supervised;
    use ndarray::{array, Array2};

    #[test]
    fn test_split_shapes() {
        let series = Array2::from_shape_fn((10, 2), |(i, j)| (i * 10 + j) as f64);
        let frame = series_to_supervised(series.view(), 2, 1, true).unwrap();
        let split = FeatureEngineer::split(&frame, 0, TrainSplit::Rows(6)).unwrap();

        assert_eq!(split.train_x.shape(), &[6, 2, 2]);
        assert_eq!(split.test_x.shape(), &[2, 2, 2]);
        // первая строка: t=2, лаги t-2 и t-1
        assert_eq!(split.train_x[[0, 0, 0]], 0.0);
        assert_eq!(split.train_x[[0, 1, 1]], 11.0);
        assert_eq!(split.train_y[0], 20.0);
        assert_eq!(split.test_y, array![80.0, 90.0]);
    }

    #[test]
    fn test_split_fraction() {
        assert_eq!(TrainSplit::Fraction(0.75).train_rows(8), 6);
    }

    #[test]
    fn test_split_rejects_everything_in_train() {
        let series = Array2::from_shape_fn((5, 1), |(i, _)| i as f64);
        let frame = series_to_supervised(series.view(), 1, 1, true).unwrap();
        assert!(FeatureEngineer::split(&frame, 0, TrainSplit::Rows(4)).is_err());
        assert!(FeatureEngineer::split(&frame, 1, TrainSplit::Rows(2)).is_err());
    }
}
