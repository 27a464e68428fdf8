//! Response checks.

use conduit_types::{RequestId, ResponseResult};
use serde::Deserialize;

use crate::error::{ValidationError, ValidationResult};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResult {
    code: u16,
    #[serde(default)]
    message: String,
}

/// Parse a result header `{"code": 200, "message": "..."}`.
pub fn parse_result(raw: &str) -> ValidationResult<ResponseResult> {
    let parsed: RawResult = serde_json::from_str(raw)
        .map_err(|e| ValidationError::InvalidResult(format!("malformed result: {}", e)))?;
    Ok(ResponseResult {
        code: parsed.code,
        message: parsed.message,
    })
}

/// Parse a request id from its hex form.
pub fn parse_request_id(raw: &str) -> ValidationResult<RequestId> {
    RequestId::from_hex(raw).map_err(|e| ValidationError::InvalidRequestId(e.to_string()))
}

/// Check a result/output pair: a success code requires output, any other
/// code forbids it, and output must be JSON within the size limit.
///
/// # Example
/// ```
/// use conduit_types::ResponseResult;
/// use conduit_valid::validate_response;
///
/// let ok = ResponseResult::ok("done");
/// assert!(validate_response(&ok, Some(r#"{"rate":1}"#), 4000).is_ok());
/// assert!(validate_response(&ok, None, 4000).is_err());
/// ```
pub fn validate_response(result: &ResponseResult, output: Option<&str>, size_limit: usize) -> ValidationResult<()> {
    match (result.is_success(), output) {
        (true, None) => Err(ValidationError::InvalidResult(
            "output must be specified when the result code is 200".into(),
        )),
        (false, Some(_)) => Err(ValidationError::InvalidResult(
            "output should not be specified when the result code is not 200".into(),
        )),
        (false, None) => Ok(()),
        (true, Some(out)) => {
            if out.len() > size_limit {
                return Err(ValidationError::PayloadTooLarge {
                    field: "output",
                    size: out.len(),
                    max: size_limit,
                });
            }
            serde_json::from_str::<serde_json::Value>(out).map_err(|e| {
                ValidationError::InvalidResult(format!("output is not valid JSON: {}", e))
            })?;
            Ok(())
        }
    }
}
