//! Нормализация данных

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SettlementError};

/// Min-max масштабирование признаков в заданный диапазон
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    feature_range: (f64, f64),
    data_min: Option<Array1<f64>>,
    data_range: Option<Array1<f64>>,
}

impl MinMaxScaler {
    pub fn new(feature_range: (f64, f64)) -> Result<Self> {
        if !(feature_range.0 < feature_range.1) {
            return Err(SettlementError::InvalidInput(format!(
                "invalid feature range ({}, {})",
                feature_range.0, feature_range.1
            )));
        }

        Ok(Self {
            feature_range,
            data_min: None,
            data_range: None,
        })
    }

    pub fn is_fitted(&self) -> bool {
        self.data_min.is_some()
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 || X.ncols() == 0 {
            return Err(SettlementError::InvalidInput("Empty dataset".to_string()));
        }

        let min = X.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let max = X.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));

        // Постоянные столбцы переводятся в нижнюю границу диапазона
        let range = (&max - &min).mapv(|r| if r < 1e-12 { 1.0 } else { r });

        self.data_min = Some(min);
        self.data_range = Some(range);
        Ok(())
    }

    fn params(&self) -> Result<(&Array1<f64>, &Array1<f64>)> {
        match (&self.data_min, &self.data_range) {
            (Some(min), Some(range)) => Ok((min, range)),
            _ => Err(SettlementError::NotFitted("MinMaxScaler")),
        }
    }

    fn check_width(&self, ncols: usize, n_features: usize) -> Result<()> {
        if ncols != n_features {
            return Err(SettlementError::ShapeMismatch {
                expected: format!("{} columns", n_features),
                actual: format!("{} columns", ncols),
            });
        }
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (min, range) = self.params()?;
        self.check_width(X.ncols(), min.len())?;

        let (lo, hi) = self.feature_range;
        let mut scaled = X.clone();
        for mut row in scaled.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - min[i]) / range[i] * (hi - lo) + lo;
            }
        }

        Ok(scaled)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    pub fn inverse_transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (min, range) = self.params()?;
        self.check_width(X.ncols(), min.len())?;

        let mut restored = X.clone();
        for mut row in restored.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = self.unscale(*val, min[i], range[i]);
            }
        }

        Ok(restored)
    }

    /// Обратное преобразование одного признака
    pub fn inverse_transform_column(
        &self,
        values: ArrayView1<f64>,
        column: usize,
    ) -> Result<Array1<f64>> {
        let (min, range) = self.params()?;
        if column >= min.len() {
            return Err(SettlementError::InvalidInput(format!(
                "column {} out of range for {} features",
                column,
                min.len()
            )));
        }

        Ok(values.mapv(|v| self.unscale(v, min[column], range[column])))
    }

    fn unscale(&self, v: f64, min: f64, range: f64) -> f64 {
        let (lo, hi) = self.feature_range;
        (v - lo) / (hi - lo) * range + min
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self {
            feature_range: (0.0, 1.0),
            data_min: None,
            data_range: None,
        }
    }
}
