//! Преобразование временного ряда в задачу обучения с учителем
//!
//! Каждая строка результата для момента t содержит векторы признаков
//! t-n_in..t-1 (вход) и t..t+n_out-1 (цель). Столбцы идут блоками по
//! смещениям: сначала самый дальний лаг, затем текущий шаг и прогноз.

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, SettlementError};

/// Метка столбца: номер переменной и смещение относительно t
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnLabel {
    /// Номер переменной, начиная с 1
    pub variable: usize,
    /// Отрицательное - лаг, 0 - текущий шаг, положительное - горизонт прогноза
    pub offset: isize,
}

impl ColumnLabel {
    pub fn new(variable: usize, offset: isize) -> Self {
        Self { variable, offset }
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset.cmp(&0) {
            Ordering::Less => write!(f, "var{}(t-{})", self.variable, -self.offset),
            Ordering::Equal => write!(f, "var{}(t)", self.variable),
            Ordering::Greater => write!(f, "var{}(t+{})", self.variable, self.offset),
        }
    }
}

/// Параметры окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisedOptions {
    pub n_in: usize,
    pub n_out: usize,
    pub drop_incomplete: bool,
}

impl Default for SupervisedOptions {
    fn default() -> Self {
        Self {
            n_in: 1,
            n_out: 1,
            drop_incomplete: true,
        }
    }
}

/// Таблица лагов и целей
///
/// Метки столбцов не хранятся, а вычисляются из `n_in`, `n_out` и `n_vars`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisedFrame {
    /// Значения; отсутствующие помечены NaN
    pub values: Array2<f64>,
    /// Индекс t исходного ряда для каждой строки
    pub anchors: Vec<usize>,
    pub n_vars: usize,
    pub n_in: usize,
    pub n_out: usize,
}

impl SupervisedFrame {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Количество входных (лаговых) столбцов
    pub fn n_lag_columns(&self) -> usize {
        self.n_in * self.n_vars
    }

    /// Метка столбца `idx`
    pub fn column(&self, idx: usize) -> Option<ColumnLabel> {
        if idx >= self.ncols() || self.n_vars == 0 {
            return None;
        }
        let block = isize::try_from(idx / self.n_vars).ok()?;
        let n_in = isize::try_from(self.n_in).ok()?;
        Some(ColumnLabel::new(idx % self.n_vars + 1, block - n_in))
    }

    pub fn columns(&self) -> impl Iterator<Item = ColumnLabel> + '_ {
        (0..self.ncols()).filter_map(move |idx| self.column(idx))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns().map(|c| c.to_string()).collect()
    }

    pub fn column_index(&self, label: ColumnLabel) -> Option<usize> {
        if label.variable == 0 || label.variable > self.n_vars {
            return None;
        }
        let n_in = isize::try_from(self.n_in).ok()?;
        let block = usize::try_from(label.offset.checked_add(n_in)?).ok()?;
        let idx = block
            .checked_mul(self.n_vars)?
            .checked_add(label.variable - 1)?;
        (idx < self.ncols()).then_some(idx)
    }

    /// Строки с `None` вместо отсутствующих значений
    pub fn to_rows(&self) -> Vec<Vec<Option<f64>>> {
        self.values
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|&v| if v.is_nan() { None } else { Some(v) })
                    .collect()
            })
            .collect()
    }

    /// Пустая таблица превращается в `EmptyResult`
    pub fn non_empty(self) -> Result<Self> {
        if self.is_empty() {
            return Err(SettlementError::EmptyResult(format!(
                "no complete rows for n_in={}, n_out={}",
                self.n_in, self.n_out
            )));
        }
        Ok(self)
    }
}

/// Проверяет прямоугольность и собирает матрицу (T, V)
pub fn rows_to_matrix(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let first = rows
        .first()
        .ok_or_else(|| SettlementError::InvalidInput("time series has no rows".to_string()))?;
    let n_vars = first.len();
    if n_vars == 0 {
        return Err(SettlementError::InvalidInput(
            "time series has no columns".to_string(),
        ));
    }

    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_vars) {
        return Err(SettlementError::InvalidInput(format!(
            "row {} has {} values, expected {}",
            idx,
            row.len(),
            n_vars
        )));
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), n_vars), flat)
        .map_err(|e| SettlementError::InvalidInput(e.to_string()))
}

/// Строит таблицу лагов из матрицы (T, V)
pub fn series_to_supervised(
    values: ArrayView2<f64>,
    n_in: usize,
    n_out: usize,
    drop_incomplete: bool,
) -> Result<SupervisedFrame> {
    if n_in < 1 || n_out < 1 {
        return Err(SettlementError::InvalidInput(format!(
            "window sizes must be positive, got n_in={}, n_out={}",
            n_in, n_out
        )));
    }

    let (n_steps, n_vars) = values.dim();
    if n_steps == 0 {
        return Err(SettlementError::InvalidInput(
            "time series has no rows".to_string(),
        ));
    }
    if n_vars == 0 {
        return Err(SettlementError::InvalidInput(
            "time series has no columns".to_string(),
        ));
    }

    let too_large = || {
        SettlementError::InvalidInput(format!(
            "window n_in={}, n_out={} is too large for {} variables",
            n_in, n_out, n_vars
        ))
    };

    // Число блоков и ширина таблицы должны помещаться в isize
    let n_blocks = n_in.checked_add(n_out).ok_or_else(too_large)?;
    let width = n_blocks.checked_mul(n_vars).ok_or_else(too_large)?;
    let lags = isize::try_from(n_in).map_err(|_| too_large())?;
    isize::try_from(width).map_err(|_| too_large())?;

    // Ни одна строка не может быть полной
    if drop_incomplete && n_blocks > n_steps {
        return Ok(SupervisedFrame {
            values: Array2::zeros((0, width)),
            anchors: Vec::new(),
            n_vars,
            n_in,
            n_out,
        });
    }

    let cells = n_steps.checked_mul(width).ok_or_else(too_large)?;
    let mut data: Vec<f64> = Vec::new();
    data.try_reserve_exact(cells).map_err(|_| too_large())?;
    data.resize(cells, f64::NAN);
    let mut full = Array2::from_shape_vec((n_steps, width), data)
        .map_err(|e| SettlementError::InvalidInput(e.to_string()))?;

    // Блок b соответствует смещению b - n_in: t-n_in, ..., t-1, t, ..., t+n_out-1
    let n_steps_signed = n_steps as isize;
    for block in 0..n_blocks {
        let offset = block as isize - lags;
        let start = block * n_vars;
        for t in 0..n_steps {
            let source = t as isize + offset;
            if source < 0 || source >= n_steps_signed {
                continue;
            }
            full.slice_mut(s![t, start..start + n_vars])
                .assign(&values.row(source as usize));
        }
    }

    if !drop_incomplete {
        return Ok(SupervisedFrame {
            values: full,
            anchors: (0..n_steps).collect(),
            n_vars,
            n_in,
            n_out,
        });
    }

    let anchors: Vec<usize> = (0..n_steps)
        .filter(|&t| full.row(t).iter().all(|v| !v.is_nan()))
        .collect();
    let flat: Vec<f64> = anchors
        .iter()
        .flat_map(|&t| full.row(t).to_vec())
        .collect();
    let values = Array2::from_shape_vec((anchors.len(), width), flat)
        .map_err(|e| SettlementError::InvalidInput(e.to_string()))?;

    tracing::debug!(
        "Reframed {}x{} series into {}x{} frame",
        n_steps,
        n_vars,
        values.nrows(),
        width
    );

    Ok(SupervisedFrame {
        values,
        anchors,
        n_vars,
        n_in,
        n_out,
    })
}

/// То же для построчного представления
pub fn series_to_supervised_rows(
    rows: &[Vec<f64>],
    options: SupervisedOptions,
) -> Result<SupervisedFrame> {
    let matrix = rows_to_matrix(rows)?;
    series_to_supervised(
        matrix.view(),
        options.n_in,
        options.n_out,
        options.drop_incomplete,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_labels_order() {
        let m = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let frame = series_to_supervised(m.view(), 2, 2, true).unwrap();

        assert_eq!(
            frame.column_names(),
            vec![
                "var1(t-2)", "var2(t-2)", "var1(t-1)", "var2(t-1)", "var1(t)", "var2(t)",
                "var1(t+1)", "var2(t+1)",
            ]
        );
        assert_eq!(frame.nrows(), 1);
        assert_eq!(
            frame.values.row(0).to_vec(),
            vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0]
        );
        assert_eq!(frame.anchors, vec![2]);
    }

    #[test]
    fn test_keep_incomplete_marks_missing() {
        let m = array![[1.0], [2.0], [3.0]];
        let frame = series_to_supervised(m.view(), 1, 1, false).unwrap();

        assert_eq!(frame.values.dim(), (3, 2));
        assert!(frame.values[[0, 0]].is_nan());
        assert_eq!(frame.values[[0, 1]], 1.0);
        assert_eq!(frame.values[[2, 0]], 2.0);

        let rows = frame.to_rows();
        assert_eq!(rows[0], vec![None, Some(1.0)]);
    }

    #[test]
    fn test_forecast_tail_missing() {
        let m = array![[1.0], [2.0], [3.0]];
        let frame = series_to_supervised(m.view(), 1, 2, false).unwrap();

        assert!(frame.values[[2, 2]].is_nan());
        assert_eq!(frame.values[[1, 2]], 3.0);
    }

    #[test]
    fn test_missing_input_rows_dropped() {
        let m = array![[1.0], [f64::NAN], [3.0], [4.0], [5.0]];
        let frame = series_to_supervised(m.view(), 1, 1, true).unwrap();

        assert_eq!(frame.anchors, vec![3, 4]);
    }

    #[test]
    fn test_zero_window_rejected() {
        let m = array![[1.0], [2.0]];
        assert!(matches!(
            series_to_supervised(m.view(), 0, 1, true),
            Err(SettlementError::InvalidInput(_))
        ));
        assert!(matches!(
            series_to_supervised(m.view(), 1, 0, true),
            Err(SettlementError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_empty() {
        let m = array![[1.0]];
        let frame = series_to_supervised(m.view(), 1, 1, true).unwrap();
        assert!(matches!(
            frame.non_empty(),
            Err(SettlementError::EmptyResult(_))
        ));
    }
}
