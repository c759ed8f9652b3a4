/// ML модели

pub mod forecasting;
pub mod lstm;
pub mod metrics;

pub use forecasting::{ForecastingModel, ModelArchitecture, ModelArtifacts, TrainingHistory};
pub use lstm::LstmNetwork;
