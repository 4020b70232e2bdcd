use thiserror::Error;

/// Failures surfaced by the prediction pipeline and its storage backends.
#[derive(Error, Debug)]
pub enum EtaError {
    #[error("model not trained yet")]
    ModelNotTrained,
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("missing required fields: {0}")]
    MissingField(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("training failed: {0}")]
    Training(String),
}

pub type EtaResult<T> = Result<T, EtaError>;

impl From<redis::RedisError> for EtaError {
    fn from(err: redis::RedisError) -> Self {
        EtaError::Storage(format!("redis: {}", err))
    }
}

impl From<deadpool_redis::PoolError> for EtaError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        EtaError::Storage(format!("redis pool: {}", err))
    }
}

impl From<serde_json::Error> for EtaError {
    fn from(err: serde_json::Error) -> Self {
        EtaError::Storage(format!("json: {}", err))
    }
}

impl From<bincode::Error> for EtaError {
    fn from(err: bincode::Error) -> Self {
        EtaError::Storage(format!("model encoding: {}", err))
    }
}

impl From<std::io::Error> for EtaError {
    fn from(err: std::io::Error) -> Self {
        EtaError::Storage(format!("io: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_trained_message() {
        assert_eq!(EtaError::ModelNotTrained.to_string(), "model not trained yet");
    }

    #[test]
    fn test_io_maps_to_storage() {
        let err: EtaError = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(matches!(err, EtaError::Storage(ref msg) if msg.contains("disk gone")));
    }
}
