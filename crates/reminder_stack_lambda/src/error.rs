#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0} must be configured")]
    Configuration(&'static str),

    #[error("invalid event: {0}")]
    Validation(String),

    #[error("{operation} failed: {message}")]
    Downstream {
        operation: &'static str,
        message: String,
    },
}

impl HandlerError {
    pub fn downstream(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Downstream {
            operation,
            message: message.into(),
        }
    }
}
