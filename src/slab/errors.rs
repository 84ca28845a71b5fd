//! Slab resolution errors
//!
//! Recoverable by construction: the driver logs and skips the value. Only
//! stored data that is missing, malformed or unsupported is reported here;
//! store failures are carried separately so they are not mistaken for bad
//! data.

use thiserror::Error;

use crate::store::StoreError;

use super::id::SlabId;

/// Result type for slab resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Slab resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Register not found: {0}")]
    NotFound(String),

    #[error("Slab not found: {0}")]
    SlabNotFound(SlabId),

    #[error("Malformed stored value: {0}")]
    Malformed(String),

    #[error("Unsupported stored value: {0}")]
    Unsupported(String),

    #[error("Slab {0} reached twice while resolving one value")]
    CycleDetected(SlabId),

    #[error("Slab graph deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("Cannot encode value: {0}")]
    Encode(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ResolveError {
    /// Stable code for log lines
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::NotFound(_) => "MIGRATE_RESOLVE_NOT_FOUND",
            ResolveError::SlabNotFound(_) => "MIGRATE_RESOLVE_SLAB_NOT_FOUND",
            ResolveError::Malformed(_) => "MIGRATE_RESOLVE_MALFORMED",
            ResolveError::Unsupported(_) => "MIGRATE_RESOLVE_UNSUPPORTED",
            ResolveError::CycleDetected(_) => "MIGRATE_RESOLVE_CYCLE",
            ResolveError::DepthExceeded(_) => "MIGRATE_RESOLVE_DEPTH_EXCEEDED",
            ResolveError::Encode(_) => "MIGRATE_RESOLVE_ENCODE_FAILED",
            ResolveError::Store(_) => "MIGRATE_RESOLVE_STORE_FAILED",
        }
    }

    /// Not-found outcomes are expected during a migration
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_) | ResolveError::SlabNotFound(_))
    }

    pub(crate) fn malformed(context: &str, err: impl std::fmt::Debug) -> Self {
        ResolveError::Malformed(format!("{}: {:?}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_data_is_not_found() {
        assert!(ResolveError::NotFound("storage/vault".into()).is_not_found());
        assert!(!ResolveError::Malformed("trailing bytes".into()).is_not_found());
        assert!(!ResolveError::Encode("io".into()).is_not_found());
    }

    #[test]
    fn test_encode_failure_code() {
        let err = ResolveError::Encode("writer closed".into());
        assert_eq!(err.code(), "MIGRATE_RESOLVE_ENCODE_FAILED");
        assert!(err.to_string().contains("writer closed"));
    }
}
