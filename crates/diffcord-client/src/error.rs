use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or unusable configuration. Raised at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The API answered with a non-2xx status.
    #[error("Request failed with code {code}, message: {message} and http status {status}")]
    Request {
        code: String,
        message: String,
        status: u16,
    },

    /// A 2xx response whose body does not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Error code reported by the API, for request failures.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            ClientError::Request { code, .. } => Some(code),
            _ => None,
        }
    }

    /// HTTP status of a request failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}
