//! Conversion between native values and the wire representation.
//!
//! Integers cross the wire as decimal strings for round-trip fidelity beyond
//! the double-safe range; blobs as standard base64. The server may emit
//! base64 without trailing `=` padding, so the decoder right-pads to a
//! multiple of four before decoding.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{
    wire::{self, NamedArg, Stmt},
    HranaError, Params, ResultSet, Statement, Value,
};

pub(crate) fn build_stmt(statement: Statement) -> Result<Stmt, HranaError> {
    let Statement {
        sql,
        params,
        want_rows,
    } = statement;
    match params {
        Params::Positional(values) => {
            let args = values
                .into_iter()
                .map(encode_value)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Stmt {
                sql,
                args: (!args.is_empty()).then_some(args),
                named_args: None,
                want_rows,
            })
        }
        Params::Named(values) => {
            let named_args = values
                .into_iter()
                .map(|(name, value)| {
                    let name = normalize_named_parameter_name(&name)?;
                    let value = encode_value(value)?;
                    Ok(NamedArg { name, value })
                })
                .collect::<Result<Vec<_>, HranaError>>()?;

            Ok(Stmt {
                sql,
                args: None,
                named_args: (!named_args.is_empty()).then_some(named_args),
                want_rows,
            })
        }
    }
}

pub(crate) fn encode_value(value: Value) -> Result<wire::Value, HranaError> {
    match value {
        Value::Null => Ok(wire::Value::Null {}),
        Value::Integer(value) => Ok(wire::Value::Integer {
            value: value.to_string(),
        }),
        Value::Float(value) => {
            if !value.is_finite() {
                return Err(HranaError::Encoding(format!(
                    "float value '{value}' has no JSON representation"
                )));
            }
            Ok(wire::Value::Float { value })
        }
        Value::Text(value) => Ok(wire::Value::Text { value }),
        Value::Blob(bytes) => Ok(wire::Value::Blob {
            base64: BASE64.encode(bytes),
        }),
    }
}

pub(crate) fn decode_value(value: wire::Value, body: &str) -> Result<Value, HranaError> {
    match value {
        wire::Value::Null {} => Ok(Value::Null),
        wire::Value::Integer { value } => value.parse::<i64>().map(Value::Integer).map_err(|err| {
            HranaError::protocol_violation(format!("invalid integer value '{value}': {err}"), body)
        }),
        wire::Value::Float { value } => {
            if value.is_finite() {
                Ok(Value::Float(value))
            } else {
                Err(HranaError::protocol_violation(
                    format!("non-finite float value '{value}' is unsupported"),
                    body,
                ))
            }
        }
        wire::Value::Text { value } => Ok(Value::Text(value)),
        wire::Value::Blob { base64 } => decode_blob(&base64)
            .map(Value::Blob)
            .map_err(|detail| HranaError::protocol_violation(detail, body)),
    }
}

/// Decodes a base64 blob, tolerating missing trailing `=` padding.
fn decode_blob(encoded: &str) -> Result<Vec<u8>, String> {
    let remainder = encoded.len() % 4;
    let padded;
    let input = if remainder == 0 {
        encoded
    } else {
        padded = format!("{encoded}{}", "=".repeat(4 - remainder));
        &padded
    };
    BASE64
        .decode(input)
        .map_err(|err| format!("invalid base64 blob '{encoded}': {err}"))
}

pub(crate) fn decode_result_set(
    result: wire::StmtResult,
    body: &str,
) -> Result<ResultSet, HranaError> {
    let cols = result
        .cols
        .into_iter()
        .map(|col| crate::Col {
            name: col.name,
            decltype: col.decltype,
        })
        .collect();

    let rows = result
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| decode_value(cell, body))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let last_insert_rowid = result
        .last_insert_rowid
        .map(|value| {
            value.parse::<i64>().map_err(|err| {
                HranaError::protocol_violation(
                    format!("invalid last_insert_rowid '{value}': {err}"),
                    body,
                )
            })
        })
        .transpose()?;

    Ok(ResultSet {
        cols,
        rows,
        affected_row_count: result.affected_row_count,
        last_insert_rowid,
    })
}

fn normalize_named_parameter_name(name: &str) -> Result<String, HranaError> {
    let normalized = name.trim_start_matches([':', '@', '$']);
    if normalized.is_empty() {
        return Err(HranaError::Encoding(
            "named parameter name cannot be empty".to_owned(),
        ));
    }
    Ok(normalized.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{build_stmt, decode_value, encode_value};
    use crate::{wire, HranaError, Params, Statement, Value};

    fn round_trip(value: Value) -> Value {
        let encoded = encode_value(value).expect("must encode");
        decode_value(encoded, "").expect("must decode")
    }

    #[test]
    fn round_trips_every_kind() {
        for value in [
            Value::Null,
            Value::Integer(0),
            Value::Integer(i64::MAX),
            Value::Integer(i64::MIN),
            Value::Float(1.25),
            Value::Text("héllo".to_owned()),
            Value::Blob(Vec::new()),
            Value::Blob(vec![0xff]),
            Value::Blob((0u8..=63).collect()),
        ] {
            assert_eq!(round_trip(value.clone()), value);
        }
    }

    #[test]
    fn integer_crosses_wire_as_decimal_string() {
        let encoded = encode_value(Value::Integer(i64::MAX)).expect("must encode");
        assert_eq!(
            encoded,
            wire::Value::Integer {
                value: "9223372036854775807".to_owned()
            }
        );
    }

    #[test]
    fn non_finite_floats_are_rejected_at_encode() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = encode_value(Value::Float(value)).expect_err("must fail");
            assert!(matches!(err, HranaError::Encoding(_)));
        }
    }

    #[test]
    fn blob_decode_tolerates_missing_padding() {
        // "AQIDBA==" is [1, 2, 3, 4]; the server may drop one or both '='.
        for encoded in ["AQIDBA==", "AQIDBA=", "AQIDBA"] {
            let decoded = decode_value(
                wire::Value::Blob {
                    base64: encoded.to_owned(),
                },
                "",
            )
            .expect("must decode");
            assert_eq!(decoded, Value::Blob(vec![1, 2, 3, 4]));
        }
    }

    #[test]
    fn malformed_base64_is_a_protocol_violation() {
        let err = decode_value(
            wire::Value::Blob {
                base64: "**not-base64**".to_owned(),
            },
            "{}",
        )
        .expect_err("must fail");
        assert!(matches!(err, HranaError::ProtocolViolation { .. }));
    }

    #[test]
    fn non_numeric_integer_text_is_a_protocol_violation() {
        let err = decode_value(
            wire::Value::Integer {
                value: "nope".to_owned(),
            },
            "{}",
        )
        .expect_err("must fail");
        assert!(matches!(err, HranaError::ProtocolViolation { .. }));
    }

    #[test]
    fn build_positional_stmt() {
        let stmt = build_stmt(Statement::query(
            "SELECT ?",
            Params::positional([Value::integer(1)]),
        ))
        .expect("must build statement");
        assert!(stmt.args.is_some());
        assert!(stmt.named_args.is_none());
        assert!(stmt.want_rows);
    }

    #[test]
    fn build_named_stmt_strips_prefix() {
        let stmt = build_stmt(Statement::query(
            "SELECT :name",
            Params::named([(":name", Value::text("kit"))]),
        ))
        .expect("must build statement");

        let args = stmt.named_args.expect("must contain named args");
        assert_eq!(args[0].name, "name");
    }

    #[test]
    fn build_rejects_non_finite_float() {
        let err = build_stmt(Statement::query(
            "SELECT ?",
            Params::positional([Value::float(f64::NAN)]),
        ))
        .expect_err("must fail");
        assert!(matches!(err, HranaError::Encoding(_)));
    }
}
