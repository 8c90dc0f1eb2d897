use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum HandlerError {
    #[error("Missing required fields")]
    Validation,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    MalformedInput(&'static str),

    #[error("storage failure: {0}")]
    Storage(#[from] tokio_postgres::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl HandlerError {
    /// Status code for errors that are answered to the client. Anything else
    /// is handed back to the runtime as a failed invocation.
    pub(crate) fn status_code(&self) -> Option<u16> {
        match self {
            HandlerError::Validation | HandlerError::MalformedInput(..) => Some(400),
            HandlerError::MethodNotAllowed => Some(405),
            HandlerError::Storage(..) | HandlerError::Encode(..) => None,
        }
    }
}
