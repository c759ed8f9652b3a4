//! Ошибки библиотеки

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    /// Некорректные входные данные (непрямоугольная матрица, пустой ряд, нулевое окно)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// После удаления неполных строк не осталось данных
    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("{0} not fitted")]
    NotFitted(&'static str),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SettlementError {
    /// Ошибка на стороне вызывающего (400 для API)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SettlementError::InvalidInput(_)
                | SettlementError::EmptyResult(_)
                | SettlementError::ShapeMismatch { .. }
                | SettlementError::Config(_)
                | SettlementError::Csv(_)
                | SettlementError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(SettlementError::InvalidInput("ragged".into()).is_client_error());
        assert!(SettlementError::EmptyResult("no rows".into()).is_client_error());
        assert!(SettlementError::Config("bad split".into()).is_client_error());
        assert!(SettlementError::ShapeMismatch {
            expected: "2 columns".into(),
            actual: "3 columns".into(),
        }
        .is_client_error());

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(SettlementError::from(json).is_client_error());
    }

    #[test]
    fn test_server_errors() {
        assert!(!SettlementError::NotFitted("model").is_client_error());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!SettlementError::from(io).is_client_error());
    }
}
