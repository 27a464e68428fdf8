//! Service schemas: one JSON Schema each for input, output and error.

use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};

/// Which member of a schemas document to check against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Input,
    Output,
    Error,
}

impl SchemaKind {
    fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceSchemas {
    input: Value,
    output: Value,
    error: Value,
}

impl ServiceSchemas {
    fn get(&self, kind: SchemaKind) -> &Value {
        match kind {
            SchemaKind::Input => &self.input,
            SchemaKind::Output => &self.output,
            SchemaKind::Error => &self.error,
        }
    }
}

fn parse_schemas(raw: &str) -> ValidationResult<ServiceSchemas> {
    serde_json::from_str(raw).map_err(|e| {
        ValidationError::InvalidSchemas(format!("failed to unmarshal the schemas: {}", e))
    })
}

fn compile(kind: SchemaKind, schema: &Value) -> ValidationResult<JSONSchema> {
    if !schema.is_object() {
        return Err(ValidationError::InvalidSchemas(format!(
            "{} schema must be an object",
            kind.name()
        )));
    }
    JSONSchema::compile(schema).map_err(|e| {
        ValidationError::InvalidSchemas(format!("invalid {} schema: {}", kind.name(), e))
    })
}

/// Check a schemas document: `input`, `output` and `error` must all be
/// present and compile as JSON Schema.
///
/// # Example
/// ```
/// use conduit_valid::validate_service_schemas;
///
/// let ok = r#"{"input":{"type":"object"},"output":{"type":"object"},"error":{"type":"object"}}"#;
/// assert!(validate_service_schemas(ok).is_ok());
/// assert!(validate_service_schemas(r#"{"input":{}}"#).is_err());
/// ```
pub fn validate_service_schemas(raw: &str) -> ValidationResult<()> {
    let schemas = parse_schemas(raw)?;
    for kind in [SchemaKind::Input, SchemaKind::Output, SchemaKind::Error] {
        compile(kind, schemas.get(kind))?;
    }
    Ok(())
}

/// Validate a JSON document against one member of a schemas document.
///
/// Returns `false` if the document is not JSON or does not conform. A
/// schemas document that no longer compiles is reported as an error.
pub fn document_matches(raw_schemas: &str, kind: SchemaKind, document: &str) -> ValidationResult<bool> {
    let schemas = parse_schemas(raw_schemas)?;
    let compiled = compile(kind, schemas.get(kind))?;
    let Ok(doc) = serde_json::from_str::<Value>(document) else {
        return Ok(false);
    };
    Ok(compiled.is_valid(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMAS: &str = r#"{
        "input": {"type":"object","properties":{"pair":{"type":"string"}},"required":["pair"]},
        "output": {"type":"object","properties":{"rate":{"type":"number"}},"required":["rate"]},
        "error": {"type":"object"}
    }"#;

    #[test]
    fn test_valid_schemas() {
        assert!(validate_service_schemas(SCHEMAS).is_ok());
    }

    #[test]
    fn test_missing_member() {
        let raw = r#"{"input":{"type":"object"},"output":{"type":"object"}}"#;
        assert!(matches!(
            validate_service_schemas(raw),
            Err(ValidationError::InvalidSchemas(_))
        ));
    }

    #[test]
    fn test_non_object_schema() {
        let raw = r#"{"input":1,"output":{},"error":{}}"#;
        assert!(matches!(
            validate_service_schemas(raw),
            Err(ValidationError::InvalidSchemas(_))
        ));
    }

    #[test]
    fn test_uncompilable_schema() {
        let raw = r#"{"input":{"type":"no-such-type"},"output":{},"error":{}}"#;
        assert!(matches!(
            validate_service_schemas(raw),
            Err(ValidationError::InvalidSchemas(_))
        ));
    }

    #[test]
    fn test_document_matches() {
        assert!(document_matches(SCHEMAS, SchemaKind::Input, r#"{"pair":"cdt-usdt"}"#).unwrap());
        assert!(!document_matches(SCHEMAS, SchemaKind::Input, r#"{"other":1}"#).unwrap());
        assert!(!document_matches(SCHEMAS, SchemaKind::Input, "not json").unwrap());
        assert!(document_matches(SCHEMAS, SchemaKind::Output, r#"{"rate":1.5}"#).unwrap());
        assert!(!document_matches(SCHEMAS, SchemaKind::Output, r#"{"rate":"high"}"#).unwrap());
    }
}
