use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Invalid rule document: {0}")]
    InvalidRules(String),

    #[error("Failed to read rule document {path}: {source}")]
    RulesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Faults raised by the property, audit and entity collaborators.
///
/// Per-item faults during repair and revert are folded into result records;
/// only batch-level calls (`start_run`, `get_repair_events`, entity loading)
/// surface these to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_into_core_error() {
        let err: CoreError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(err.to_string(), "Store unavailable: connection refused");
    }
}
