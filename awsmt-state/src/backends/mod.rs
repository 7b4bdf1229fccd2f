//! Backend implementations for state storage

mod local;

pub use local::LocalBackend;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};

/// Create the backend named by `config.backend_type`
pub fn create_backend(config: &BackendConfig) -> BackendResult<Box<dyn StateBackend>> {
    match config.backend_type.as_str() {
        "local" => Ok(Box::new(LocalBackend::from_config(config))),
        other => Err(BackendError::unsupported_backend(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_backend() {
        let config = BackendConfig {
            backend_type: "s3".to_string(),
            path: None,
        };

        match create_backend(&config) {
            Err(BackendError::UnsupportedBackend(name)) => assert_eq!(name, "s3"),
            _ => panic!("Expected UnsupportedBackend error"),
        }
    }

    #[test]
    fn test_local_backend_is_default() {
        assert!(create_backend(&BackendConfig::default()).is_ok());
    }
}
