//! Загрузка измерений осадок из CSV

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, SettlementError};
use crate::preprocessing::rows_to_matrix;

/// Временной ряд: индекс (дата) и матрица признаков
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesData {
    pub index: Vec<String>,
    pub feature_names: Vec<String>,
    pub values: Array2<f64>,
}

impl TimeSeriesData {
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }
}

pub struct DataLoader;

impl DataLoader {
    /// Первый столбец - индекс, остальные - числовые признаки
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesData> {
        let file = File::open(path.as_ref())?;
        let data = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            "Loaded {} rows x {} features from {}",
            data.len(),
            data.n_features(),
            path.as_ref().display()
        );
        Ok(data)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<TimeSeriesData> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(SettlementError::InvalidInput(
                "CSV needs an index column and at least one feature".to_string(),
            ));
        }
        let feature_names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut index = Vec::new();
        let mut rows = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            index.push(record.get(0).unwrap_or_default().to_string());

            let row = record
                .iter()
                .skip(1)
                .map(|field| parse_value(field, line))
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }

        let values = rows_to_matrix(&rows)?;
        Ok(TimeSeriesData {
            index,
            feature_names,
            values,
        })
    }
}

/// Пустое поле считается пропуском
fn parse_value(field: &str, line: usize) -> Result<f64> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field.parse::<f64>().map_err(|e| {
        SettlementError::InvalidInput(format!("record {}: '{}' is not a number: {}", line + 1, field, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reader() {
        let csv = "date,settlement,temp\n2019-01-01,1.5,-3\n2019-01-02,1.75,\n";
        let data = DataLoader::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.feature_names, vec!["settlement", "temp"]);
        assert_eq!(data.index[1], "2019-01-02");
        assert_eq!(data.values[[1, 0]], 1.75);
        assert!(data.values[[1, 1]].is_nan());
    }

    #[test]
    fn test_bad_number() {
        let csv = "date,a\n2019-01-01,abc\n";
        assert!(matches!(
            DataLoader::from_reader(csv.as_bytes()),
            Err(SettlementError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_no_rows() {
        let csv = "date,a\n";
        assert!(DataLoader::from_reader(csv.as_bytes()).is_err());
    }
}
