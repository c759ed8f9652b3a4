/// Модуль предобработки данных

pub mod feature_engineering;
pub mod normalization;
pub mod supervised;

pub use feature_engineering::{DatasetSplit, FeatureEngineer, TrainSplit};
pub use normalization::MinMaxScaler;
pub use supervised::{
    rows_to_matrix, series_to_supervised, series_to_supervised_rows, ColumnLabel,
    SupervisedFrame, SupervisedOptions,
};
