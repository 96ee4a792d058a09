use crate::Value;

/// One SQL statement, immutable once built for a request.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Ordered or named parameters bound to the statement's placeholders.
    pub params: Params,
    /// Whether the server should return rows for this statement.
    pub want_rows: bool,
}

impl Statement {
    /// Creates a row-returning statement.
    pub fn query<P: Into<Params>>(sql: impl Into<String>, params: P) -> Self {
        Self {
            sql: sql.into(),
            params: params.into(),
            want_rows: true,
        }
    }

    /// Creates an execution-only statement (no rows requested).
    pub fn execute<P: Into<Params>>(sql: impl Into<String>, params: P) -> Self {
        Self {
            sql: sql.into(),
            params: params.into(),
            want_rows: false,
        }
    }
}

/// SQL parameter container.
#[derive(Clone, Debug, PartialEq)]
pub enum Params {
    /// Positional values mapped to `?` placeholders, in order.
    Positional(Vec<Value>),
    /// Named values mapped to `:name` / `@name` / `$name` placeholders.
    Named(Vec<(String, Value)>),
}

impl Params {
    /// Builds positional parameters.
    pub fn positional(values: impl Into<Vec<Value>>) -> Self {
        Self::Positional(values.into())
    }

    /// Builds named parameters.
    ///
    /// Names can be given with or without their placeholder prefix; the
    /// prefix is stripped when the request is encoded.
    pub fn named<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Positional(values) => values.is_empty(),
            Self::Named(values) => values.is_empty(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Self::Positional(values.into())
    }
}

impl From<Vec<(String, Value)>> for Params {
    fn from(values: Vec<(String, Value)>) -> Self {
        Self::Named(values)
    }
}

impl FromIterator<Value> for Params {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::Positional(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Params, Statement, Value};

    #[test]
    fn positional_from_array_keeps_order() {
        let params: Params = [Value::integer(1), Value::text("kit")].into();
        match params {
            Params::Positional(values) => {
                assert_eq!(values, vec![Value::Integer(1), Value::Text("kit".into())]);
            }
            Params::Named(_) => panic!("expected positional"),
        }
    }

    #[test]
    fn named_builder_accepts_str_keys() {
        let params = Params::named([("name", Value::text("kit"))]);
        match params {
            Params::Named(values) => {
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].0, "name");
            }
            Params::Positional(_) => panic!("expected named"),
        }
    }

    #[test]
    fn unit_params_are_empty() {
        let params: Params = ().into();
        assert!(params.is_empty());
    }

    #[test]
    fn statement_constructors_set_want_rows() {
        assert!(Statement::query("SELECT 1", ()).want_rows);
        assert!(!Statement::execute("DELETE FROM t", ()).want_rows);
    }
}
