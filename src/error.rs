use thiserror::Error;

/// Recoverable query-boundary errors. Each variant maps to a stable
/// machine-readable code surfaced in RPC error payloads.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("symbol not found: {fqn}")]
    SymbolNotFound { fqn: String },

    #[error("module not found: {path}")]
    ModuleNotFound { path: String },

    #[error("method '{name}' not found in {module}; available: {}", available.join(", "))]
    MethodNotFound {
        module: String,
        name: String,
        available: Vec<String>,
    },

    #[error("symbol store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("corpus unavailable: {0}")]
    CorpusUnavailable(String),

    #[error("read transaction failed: {0}")]
    TransactionFailure(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::SymbolNotFound { .. } => "symbol_not_found",
            QueryError::ModuleNotFound { .. } => "module_not_found",
            QueryError::MethodNotFound { .. } => "method_not_found",
            QueryError::StoreUnavailable(_) => "store_unavailable",
            QueryError::CorpusUnavailable(_) => "corpus_unavailable",
            QueryError::TransactionFailure(_) => "transaction_failure",
            QueryError::InvalidRequest(_) => "invalid_request",
        }
    }
}
