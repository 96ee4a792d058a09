use crate::{wire, Value};

/// Result column descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Col {
    pub name: String,
    pub decltype: Option<String>,
}

/// Decoded result of one statement.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultSet {
    pub cols: Vec<Col>,
    pub rows: Vec<Vec<Value>>,
    pub affected_row_count: u64,
    pub last_insert_rowid: Option<i64>,
}

impl ResultSet {
    /// Names of the result columns, in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cols.iter().map(|col| col.name.as_str())
    }
}

/// Outcome of one batch step.
///
/// Step failures and skipped steps are data, not errors: a batch call only
/// fails as a whole on transport or protocol problems.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// The step ran and succeeded.
    Ok(ResultSet),
    /// The step ran and the server reported a statement error.
    Error { message: String, code: Option<String> },
    /// The step's condition evaluated false and it was not executed.
    Skipped,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl From<wire::ProtocolError> for StepOutcome {
    fn from(error: wire::ProtocolError) -> Self {
        Self::Error {
            message: error.message,
            code: error.code,
        }
    }
}
