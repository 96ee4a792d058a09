/// Error type returned by this crate.
///
/// Every failure surfaces as exactly one of these variants so callers can
/// branch on the kind (transient connectivity vs. bad SQL) without parsing
/// message strings. Nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum HranaError {
    /// Malformed or unsupported endpoint configuration; raised before any
    /// network I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// DNS/TCP/TLS failure, connection refused, or timeout from `reqwest`.
    #[error("connectivity error: {0}")]
    Connectivity(#[from] reqwest::Error),

    /// HTTP 5xx from the endpoint; treated as connectivity, not protocol.
    #[error("server unavailable (http {status}): {body}")]
    ServerUnavailable { status: u16, body: String },

    /// HTTP 401/403.
    #[error("authentication failed (http {status}): {body}")]
    Authentication { status: u16, body: String },

    /// A parameter value that has no wire representation (NaN/Infinity).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Server response does not match the expected envelope shape. The raw
    /// response body is attached for diagnosis.
    #[error("protocol violation: {detail}")]
    ProtocolViolation { detail: String, body: String },

    /// Server-reported statement error (syntax error, missing table, ...).
    /// The server message is preserved verbatim.
    #[error("execution error for `{sql}`: {message}")]
    Execution {
        message: String,
        code: Option<String>,
        sql: String,
    },

    /// Refined [`HranaError::Execution`] for recognizable constraint
    /// violations; `target` is the best-effort `table.column` involved.
    #[error("constraint violation for `{sql}`: {message}")]
    Constraint {
        message: String,
        code: Option<String>,
        sql: String,
        target: Option<String>,
    },

    /// Caller cancelled before the round trip completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl HranaError {
    pub(crate) fn protocol_violation(detail: impl Into<String>, body: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            detail: detail.into(),
            body: body.into(),
        }
    }
}
