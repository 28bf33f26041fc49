mod storage_error;

pub use storage_error::StorageError;

/// The system-wide error kinds. Names follow the "error kinds, not type
/// names" vocabulary from the adapter boundary so that HTTP/tool surfaces
/// can map each variant to a status code without inspecting its payload.
#[derive(Debug, thiserror::Error)]
pub enum CortexError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("feature not enabled: {0}")]
    FeatureNotEnabled(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("storage fault: {0}")]
    StorageFault(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CortexResult<T> = Result<T, CortexError>;
