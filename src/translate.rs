//! Maps HTTP failures and server-reported protocol errors onto the typed
//! error taxonomy. Messages are preserved verbatim; only the classification
//! is added.

use crate::{wire, HranaError};

const CONSTRAINT_MARKERS: [&str; 5] = [
    "UNIQUE constraint failed",
    "NOT NULL constraint failed",
    "CHECK constraint failed",
    "FOREIGN KEY constraint failed",
    "PRIMARY KEY constraint failed",
];

/// Classifies a non-2xx HTTP response.
///
/// 401/403 are authentication failures, 5xx counts as connectivity (the
/// endpoint exists but cannot serve), and anything else means one side broke
/// the contract, so the raw body is attached for diagnosis.
pub(crate) fn classify_http_failure(status: u16, body: String) -> HranaError {
    match status {
        401 | 403 => HranaError::Authentication { status, body },
        500..=599 => HranaError::ServerUnavailable { status, body },
        _ => HranaError::ProtocolViolation {
            detail: format!("unexpected http status {status}"),
            body,
        },
    }
}

/// Translates a server-reported statement error, refining recognizable
/// constraint violations into [`HranaError::Constraint`].
pub(crate) fn translate_stmt_error(error: wire::ProtocolError, sql: &str) -> HranaError {
    let wire::ProtocolError { message, code } = error;
    match constraint_target(&message) {
        Some(target) => HranaError::Constraint {
            message,
            code,
            sql: sql.to_owned(),
            target,
        },
        None if is_constraint_message(&message) => HranaError::Constraint {
            message,
            code,
            sql: sql.to_owned(),
            target: None,
        },
        None => HranaError::Execution {
            message,
            code,
            sql: sql.to_owned(),
        },
    }
}

fn is_constraint_message(message: &str) -> bool {
    CONSTRAINT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Best-effort extraction of the `table.column` (or constraint name) that a
/// SQLite-style message reports after `constraint failed: `.
fn constraint_target(message: &str) -> Option<Option<String>> {
    let marker = CONSTRAINT_MARKERS
        .iter()
        .find_map(|marker| message.find(marker).map(|at| (at, marker.len())))?;
    let after = &message[marker.0 + marker.1..];
    let target = after
        .strip_prefix(": ")
        .map(|rest| rest.trim_end_matches(['.', ' ']).to_owned())
        .filter(|rest| !rest.is_empty());
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::{classify_http_failure, translate_stmt_error};
    use crate::{wire, HranaError};

    fn protocol_error(message: &str) -> wire::ProtocolError {
        wire::ProtocolError {
            message: message.to_owned(),
            code: None,
        }
    }

    #[test]
    fn unauthorized_maps_to_authentication() {
        for status in [401, 403] {
            let err = classify_http_failure(status, "denied".to_owned());
            assert!(matches!(err, HranaError::Authentication { .. }));
        }
    }

    #[test]
    fn server_errors_map_to_connectivity_class() {
        let err = classify_http_failure(503, "overloaded".to_owned());
        assert!(matches!(
            err,
            HranaError::ServerUnavailable { status: 503, .. }
        ));
    }

    #[test]
    fn other_statuses_are_protocol_violations_with_body() {
        let err = classify_http_failure(400, "bad request".to_owned());
        match err {
            HranaError::ProtocolViolation { body, .. } => assert_eq!(body, "bad request"),
            other => panic!("expected protocol violation, got {other:?}"),
        }
    }

    #[test]
    fn unique_violation_refines_to_constraint_with_target() {
        let err = translate_stmt_error(
            protocol_error("UNIQUE constraint failed: users.email"),
            "INSERT INTO users(email) VALUES (?)",
        );
        match err {
            HranaError::Constraint { target, .. } => {
                assert_eq!(target.as_deref(), Some("users.email"));
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn foreign_key_violation_without_target_is_still_constraint() {
        let err = translate_stmt_error(
            protocol_error("FOREIGN KEY constraint failed"),
            "DELETE FROM parents",
        );
        assert!(matches!(err, HranaError::Constraint { target: None, .. }));
    }

    #[test]
    fn other_sql_errors_stay_execution_with_verbatim_message() {
        let err = translate_stmt_error(
            protocol_error("near \"INSER\": syntax error"),
            "INSER INTO t VALUES (1)",
        );
        match err {
            HranaError::Execution { message, sql, .. } => {
                assert_eq!(message, "near \"INSER\": syntax error");
                assert_eq!(sql, "INSER INTO t VALUES (1)");
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }
}
