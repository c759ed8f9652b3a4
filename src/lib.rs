//! Settlement ML - прогнозирование осадок грунта LSTM сетью

pub mod config;
pub mod data;
pub mod error;
pub mod experiment;
pub mod types;
pub mod models;
pub mod preprocessing;
pub mod server;

pub use config::{ExperimentConfig, ModelConfig};
pub use data::{DataLoader, TimeSeriesData};
pub use error::{Result, SettlementError};
pub use experiment::{Experiment, ExperimentReport};
pub use models::*;
pub use preprocessing::*;
