use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    batch::{build_batch, BatchStep, StepCondition},
    codec,
    transport::HttpTransport,
    translate,
    wire::{self, PipelineRequest, Request},
    HranaError, Result, ResultSet, Statement, StepOutcome,
};

/// Client for a remote SQL endpoint speaking the Hrana-style pipeline
/// protocol.
///
/// Stateless between calls: every operation is a single self-contained HTTP
/// round trip and no server-side session survives it. One client per logical
/// connection; clone-free concurrent use is safe because the underlying
/// transport holds no per-request mutable state.
#[derive(Debug)]
pub struct HranaClient {
    transport: HttpTransport,
}

impl HranaClient {
    /// Opens a logical connection.
    ///
    /// Validates the URL scheme (`libsql://` is rewritten to `https://`)
    /// before any request is sent. A missing auth token is legal; servers
    /// may run without authentication.
    pub fn open(base_url: impl AsRef<str>, auth_token: Option<&str>) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::open(base_url.as_ref(), auth_token)?,
        })
    }

    /// Executes a single statement and returns its decoded result.
    pub async fn execute(
        &self,
        statement: Statement,
        cancel: &CancellationToken,
    ) -> Result<ResultSet> {
        let sql = statement.sql.clone();
        let payload = PipelineRequest {
            requests: vec![
                Request::Execute {
                    stmt: codec::build_stmt(statement)?,
                },
                Request::Close {},
            ],
        };
        let (response, body) = self.transport.send(&payload, cancel).await?;
        let [execute, close] = expect_results::<2>(response, &body)?;

        let result = into_stream_result(execute, "execute", &sql, &body)?
            .ok_or_else(|| missing_result("execute", &body))?;
        ensure_close(close, &body)?;
        codec::decode_result_set(result.into_stmt_result(), &body)
    }

    /// Executes ordered statements in one round trip with no atomicity
    /// guarantee; each statement is applied independently.
    ///
    /// Only the last statement's affected-row count is surfaced, matching
    /// the fire-and-forget semantics of a multi-statement script. A failure
    /// in any statement is raised after the server has already applied the
    /// preceding ones.
    pub async fn execute_sequence(
        &self,
        statements: impl IntoIterator<Item = Statement>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let statements: Vec<Statement> = statements.into_iter().collect();
        if statements.is_empty() {
            return Ok(0);
        }
        let sqls: Vec<String> = statements.iter().map(|s| s.sql.clone()).collect();

        let mut requests = Vec::with_capacity(statements.len() + 1);
        for statement in statements {
            requests.push(Request::Execute {
                stmt: codec::build_stmt(statement)?,
            });
        }
        requests.push(Request::Close {});

        let payload = PipelineRequest { requests };
        let (response, body) = self.transport.send(&payload, cancel).await?;

        let expected = sqls.len() + 1;
        if response.results.len() != expected {
            return Err(count_mismatch(expected, response.results.len(), &body));
        }

        let mut surfaced = 0;
        for (index, result) in response.results.into_iter().enumerate() {
            match sqls.get(index) {
                Some(sql) => {
                    let result = into_stream_result(result, "execute", sql, &body)?
                        .ok_or_else(|| missing_result("execute", &body))?;
                    surfaced = result.affected_row_count;
                }
                None => ensure_close(result, &body)?,
            }
        }
        Ok(surfaced)
    }

    /// Submits conditional batch steps as one request and returns per-step
    /// outcomes.
    ///
    /// A step whose condition evaluates false is reported as
    /// [`StepOutcome::Skipped`]; a step-level SQL failure is reported as
    /// [`StepOutcome::Error`] rather than failing the call. Steps are not
    /// mutually atomic unless the caller brackets them with explicit
    /// transaction control.
    pub async fn execute_batch(
        &self,
        steps: Vec<BatchStep>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StepOutcome>> {
        let step_count = steps.len();
        let payload = PipelineRequest {
            requests: vec![
                Request::Batch {
                    batch: build_batch(steps)?,
                },
                Request::Close {},
            ],
        };
        let (response, body) = self.transport.send(&payload, cancel).await?;
        let [batch, close] = expect_results::<2>(response, &body)?;

        let result = into_stream_result(batch, "batch", "", &body)?
            .ok_or_else(|| missing_result("batch", &body))?;
        ensure_close(close, &body)?;
        step_outcomes(result, step_count, &body)
    }

    /// Executes the given statements with all-or-nothing semantics in a
    /// single round trip.
    ///
    /// The statements are bracketed with an implicit `BEGIN` and a `COMMIT`
    /// conditioned on every statement succeeding; a `ROLLBACK` step guarded
    /// by the commit's failure undoes partial work server-side. On failure
    /// the first failing statement's error is raised; after return the
    /// statements' effects are either all committed or all rolled back.
    pub async fn execute_transactional_batch(
        &self,
        statements: impl IntoIterator<Item = Statement>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let statements: Vec<Statement> = statements.into_iter().collect();
        if statements.is_empty() {
            return Ok(0);
        }
        let sqls: Vec<String> = statements.iter().map(|s| s.sql.clone()).collect();

        debug!(statements = sqls.len(), "submitting transactional batch");
        let payload = PipelineRequest {
            requests: vec![
                Request::Batch {
                    batch: build_batch(transactional_steps(statements))?,
                },
                Request::Close {},
            ],
        };
        let (response, body) = self.transport.send(&payload, cancel).await?;
        let [batch, close] = expect_results::<2>(response, &body)?;

        let result = into_stream_result(batch, "batch", "", &body)?
            .ok_or_else(|| missing_result("batch", &body))?;
        ensure_close(close, &body)?;
        aggregate_transactional(result, &sqls, &body)
    }

    /// Releases the underlying HTTP transport.
    pub fn close(self) {}
}

/// Brackets `statements` for atomic execution: `BEGIN`, each statement
/// conditioned on its predecessor, `COMMIT` conditioned on the last
/// statement, and a `ROLLBACK` that runs only when the commit did not.
fn transactional_steps(statements: Vec<Statement>) -> Vec<BatchStep> {
    let count = statements.len() as u32;
    let mut steps = Vec::with_capacity(statements.len() + 3);
    steps.push(BatchStep::unconditional(Statement::execute("BEGIN", ())));
    for (index, statement) in statements.into_iter().enumerate() {
        steps.push(BatchStep::when(statement, StepCondition::ok(index as u32)));
    }
    steps.push(BatchStep::when(
        Statement::execute("COMMIT", ()),
        StepCondition::ok(count),
    ));
    steps.push(BatchStep::when(
        Statement::execute("ROLLBACK", ()),
        StepCondition::not(StepCondition::ok(count + 1)),
    ));
    steps
}

/// Interprets the batch result of a transactional batch built by
/// [`transactional_steps`]: indices `1..=n` are the caller's statements,
/// `n + 1` is the commit step.
fn aggregate_transactional(result: wire::StreamResult, sqls: &[String], body: &str) -> Result<u64> {
    let expected = sqls.len() + 3;
    if result.step_results.len() != expected || result.step_errors.len() != expected {
        return Err(HranaError::protocol_violation(
            format!(
                "transactional batch step count mismatch: expected {expected}, got {} results / {} errors",
                result.step_results.len(),
                result.step_errors.len()
            ),
            body,
        ));
    }

    let commit_index = sqls.len() + 1;
    if result.step_results[commit_index].is_some() {
        let mut affected = 0;
        for (index, step) in result.step_results[1..=sqls.len()].iter().enumerate() {
            let step = step.as_ref().ok_or_else(|| {
                HranaError::protocol_violation(
                    format!("commit succeeded but statement step {index} has no result"),
                    body,
                )
            })?;
            affected += step.affected_row_count;
        }
        return Ok(affected);
    }

    // Commit did not run; surface the step that broke the chain.
    for (index, error) in result.step_errors.iter().enumerate() {
        if let Some(error) = error {
            let sql = if index == 0 {
                "BEGIN"
            } else if index <= sqls.len() {
                sqls[index - 1].as_str()
            } else if index == commit_index {
                "COMMIT"
            } else {
                "ROLLBACK"
            };
            return Err(translate::translate_stmt_error(error.clone(), sql));
        }
    }
    Err(HranaError::protocol_violation(
        "commit step produced neither a result nor a step error",
        body,
    ))
}

fn step_outcomes(
    result: wire::StreamResult,
    step_count: usize,
    body: &str,
) -> Result<Vec<StepOutcome>> {
    if result.step_results.len() != step_count || result.step_errors.len() != step_count {
        return Err(HranaError::protocol_violation(
            format!(
                "batch step count mismatch: expected {step_count}, got {} results / {} errors",
                result.step_results.len(),
                result.step_errors.len()
            ),
            body,
        ));
    }

    result
        .step_results
        .into_iter()
        .zip(result.step_errors)
        .enumerate()
        .map(|(index, pair)| match pair {
            (Some(result), None) => Ok(StepOutcome::Ok(codec::decode_result_set(result, body)?)),
            (None, Some(error)) => Ok(StepOutcome::from(error)),
            (None, None) => Ok(StepOutcome::Skipped),
            (Some(_), Some(_)) => Err(HranaError::protocol_violation(
                format!("step {index} reports both a result and an error"),
                body,
            )),
        })
        .collect()
}

/// Pulls exactly `N` results out of the response; any other count is a
/// protocol violation.
fn expect_results<const N: usize>(
    response: wire::PipelineResponse,
    body: &str,
) -> Result<[wire::PipelineResult; N]> {
    let got = response.results.len();
    response
        .results
        .try_into()
        .map_err(|_| count_mismatch(N, got, body))
}

fn count_mismatch(expected: usize, got: usize, body: &str) -> HranaError {
    HranaError::protocol_violation(
        format!("result count mismatch: expected {expected}, got {got}"),
        body,
    )
}

fn missing_result(kind: &str, body: &str) -> HranaError {
    HranaError::protocol_violation(format!("missing {kind} result payload"), body)
}

/// Unwraps an `ok` pipeline result of the expected kind, or translates the
/// server-intended error attached to it.
fn into_stream_result(
    result: wire::PipelineResult,
    expected_kind: &str,
    sql: &str,
    body: &str,
) -> Result<Option<wire::StreamResult>> {
    match result.kind.as_str() {
        "ok" => {
            let response = result.response.ok_or_else(|| {
                HranaError::protocol_violation("ok result carries no response payload", body)
            })?;
            if response.kind != expected_kind {
                return Err(HranaError::protocol_violation(
                    format!(
                        "expected {expected_kind} response, got '{}'",
                        response.kind
                    ),
                    body,
                ));
            }
            Ok(response.result)
        }
        "error" => {
            let error = result.error.ok_or_else(|| {
                HranaError::protocol_violation("error result carries no error payload", body)
            })?;
            Err(translate::translate_stmt_error(error, sql))
        }
        other => Err(HranaError::protocol_violation(
            format!("unknown pipeline result type '{other}'"),
            body,
        )),
    }
}

fn ensure_close(result: wire::PipelineResult, body: &str) -> Result<()> {
    into_stream_result(result, "close", "", body).map(|_| ())
}
