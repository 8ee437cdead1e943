//! Output envelopes and exit codes.
//!
//! Machine consumers get one of three stable shapes: the success envelope
//! `{success: true, data}`, the error envelope `{success: false, error}`,
//! and the validation envelope (the validation result verbatim). `--save`
//! writes the full envelope to a file regardless of what stdout shows.

use serde_json::{json, Value};

use n8nctl_core::validate::ValidationResult;
use n8nctl_core::ErrorClass;

/// A finished command: the envelope plus the process exit code.
#[derive(Debug)]
pub struct Outcome {
    pub envelope: Value,
    pub exit_code: i32,
}

impl Outcome {
    pub fn success(data: Value) -> Self {
        Self {
            envelope: json!({ "success": true, "data": data }),
            exit_code: 0,
        }
    }

    pub fn error(class: ErrorClass, code: &str, message: &str, details: Option<Value>) -> Self {
        let mut error = json!({ "code": code, "message": message });
        if let Some(details) = details {
            error["details"] = details;
        }
        Self {
            envelope: json!({ "success": false, "error": error }),
            exit_code: class.exit_code(),
        }
    }

    /// Validation results are their own envelope; the exit code follows the
    /// most severe finding.
    pub fn validation(result: &ValidationResult) -> Self {
        let exit_code = if result.valid {
            0
        } else {
            ErrorClass::Data.exit_code()
        };
        Self {
            envelope: serde_json::to_value(result).unwrap_or(Value::Null),
            exit_code,
        }
    }

    /// Truncated envelope emitted when a signal interrupts the command.
    pub fn cancelled() -> Self {
        Self {
            envelope: json!({
                "success": false,
                "error": { "code": "CANCELLED", "message": "operation cancelled by signal" }
            }),
            exit_code: ErrorClass::Cancelled.exit_code(),
        }
    }

    /// Exit code for a set of per-item outcomes: the most severe wins.
    pub fn worst_exit_code(codes: impl IntoIterator<Item = i32>) -> i32 {
        codes.into_iter().max().unwrap_or(0)
    }
}

/// Print the envelope and persist it when `--save` was given.
pub fn emit(outcome: &Outcome, json_mode: bool, save: Option<&str>) -> std::io::Result<()> {
    if let Some(path) = save {
        let mut bytes = serde_json::to_vec_pretty(&outcome.envelope)?;
        bytes.push(b'\n');
        std::fs::write(path, bytes)?;
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&outcome.envelope)?);
        return Ok(());
    }

    // Plain rendering for humans; rich tables live outside this crate.
    match (
        outcome.envelope.get("success").and_then(Value::as_bool),
        outcome.envelope.get("valid").and_then(Value::as_bool),
    ) {
        (Some(true), _) => {
            let data = &outcome.envelope["data"];
            match data {
                Value::String(s) => println!("{s}"),
                Value::Null => println!("ok"),
                other => println!("{}", serde_json::to_string_pretty(other)?),
            }
        }
        (Some(false), _) => {
            let error = &outcome.envelope["error"];
            eprintln!(
                "error[{}]: {}",
                error["code"].as_str().unwrap_or("UNKNOWN"),
                error["message"].as_str().unwrap_or("")
            );
        }
        (None, Some(valid)) => {
            let errors = outcome.envelope["errors"].as_array().map(Vec::len).unwrap_or(0);
            let warnings = outcome.envelope["warnings"]
                .as_array()
                .map(Vec::len)
                .unwrap_or(0);
            println!(
                "{}: {errors} error(s), {warnings} warning(s)",
                if valid { "valid" } else { "invalid" }
            );
            println!("{}", serde_json::to_string_pretty(&outcome.envelope)?);
        }
        _ => println!("{}", serde_json::to_string_pretty(&outcome.envelope)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let outcome = Outcome::success(json!({"id": "w1"}));
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.envelope["success"], json!(true));
        assert_eq!(outcome.envelope["data"]["id"], json!("w1"));
    }

    #[test]
    fn error_envelope_carries_code_and_details() {
        let outcome = Outcome::error(
            ErrorClass::NoInput,
            "ENOENT",
            "no such file: wf.json",
            Some(json!({"path": "wf.json"})),
        );
        assert_eq!(outcome.exit_code, 66);
        assert_eq!(outcome.envelope["success"], json!(false));
        assert_eq!(outcome.envelope["error"]["code"], json!("ENOENT"));
        assert_eq!(outcome.envelope["error"]["details"]["path"], json!("wf.json"));
    }

    #[test]
    fn cancelled_envelope_is_stable() {
        let outcome = Outcome::cancelled();
        assert_eq!(outcome.envelope["error"]["code"], json!("CANCELLED"));
    }

    #[test]
    fn worst_exit_code_picks_maximum() {
        assert_eq!(Outcome::worst_exit_code([0, 0, 0]), 0);
        assert_eq!(Outcome::worst_exit_code([0, 65, 71]), 71);
        assert_eq!(Outcome::worst_exit_code([]), 0);
    }
}
