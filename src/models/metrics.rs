//! Метрики качества прогноза

use ndarray::ArrayView1;

use crate::error::{Result, SettlementError};

fn check(actual: &ArrayView1<f64>, predicted: &ArrayView1<f64>) -> Result<()> {
    if actual.is_empty() {
        return Err(SettlementError::InvalidInput("no values to score".to_string()));
    }
    if actual.len() != predicted.len() {
        return Err(SettlementError::ShapeMismatch {
            expected: format!("{} predictions", actual.len()),
            actual: format!("{} predictions", predicted.len()),
        });
    }
    Ok(())
}

pub fn mae(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> Result<f64> {
    check(&actual, &predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

pub fn mse(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> Result<f64> {
    check(&actual, &predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

pub fn rmse(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> Result<f64> {
    Ok(mse(actual, predicted)?.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_metrics() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let p = array![1.0, 2.0, 3.0, 8.0];

        assert_eq!(mae(y.view(), p.view()).unwrap(), 1.0);
        assert_eq!(mse(y.view(), p.view()).unwrap(), 4.0);
        assert_eq!(rmse(y.view(), p.view()).unwrap(), 2.0);
    }

    #[test]
    fn test_length_mismatch() {
        let y = array![1.0, 2.0];
        let p = array![1.0];
        assert!(mae(y.view(), p.view()).is_err());
    }
}
