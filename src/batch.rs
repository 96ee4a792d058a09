//! Conditional batch steps.
//!
//! A batch is submitted as one request; each step may carry a condition over
//! the outcomes of earlier steps. A step whose condition evaluates false is
//! skipped by the server without error.

use crate::{codec, wire, HranaError, Statement};

/// One statement inside a batch, optionally guarded by a [`StepCondition`].
#[derive(Clone, Debug, PartialEq)]
pub struct BatchStep {
    pub statement: Statement,
    pub condition: Option<StepCondition>,
}

impl BatchStep {
    /// A step that always runs.
    pub fn unconditional(statement: Statement) -> Self {
        Self {
            statement,
            condition: None,
        }
    }

    /// A step guarded by `condition`.
    pub fn when(statement: Statement, condition: StepCondition) -> Self {
        Self {
            statement,
            condition: Some(condition),
        }
    }
}

/// Boolean expression over the success or failure of earlier batch steps.
///
/// Step indices are zero-based positions within the submitted batch.
#[derive(Clone, Debug, PartialEq)]
pub enum StepCondition {
    /// Step `.0` executed and succeeded.
    Ok(u32),
    /// Step `.0` executed and failed.
    Error(u32),
    Not(Box<StepCondition>),
    And(Vec<StepCondition>),
    Or(Vec<StepCondition>),
}

impl StepCondition {
    pub fn ok(step: u32) -> Self {
        Self::Ok(step)
    }

    pub fn error(step: u32) -> Self {
        Self::Error(step)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: StepCondition) -> Self {
        Self::Not(Box::new(condition))
    }

    pub fn and(conditions: impl Into<Vec<StepCondition>>) -> Self {
        Self::And(conditions.into())
    }

    pub fn or(conditions: impl Into<Vec<StepCondition>>) -> Self {
        Self::Or(conditions.into())
    }

    fn lower(self) -> wire::BatchCond {
        match self {
            Self::Ok(step) => wire::BatchCond::Ok { step },
            Self::Error(step) => wire::BatchCond::Error { step },
            Self::Not(cond) => wire::BatchCond::Not {
                cond: Box::new(cond.lower()),
            },
            Self::And(conds) => wire::BatchCond::And {
                conds: conds.into_iter().map(Self::lower).collect(),
            },
            Self::Or(conds) => wire::BatchCond::Or {
                conds: conds.into_iter().map(Self::lower).collect(),
            },
        }
    }
}

pub(crate) fn build_batch(steps: Vec<BatchStep>) -> Result<wire::Batch, HranaError> {
    let steps = steps
        .into_iter()
        .map(|step| {
            Ok(wire::BatchStep {
                condition: step.condition.map(StepCondition::lower),
                stmt: codec::build_stmt(step.statement)?,
            })
        })
        .collect::<Result<Vec<_>, HranaError>>()?;
    Ok(wire::Batch { steps })
}
