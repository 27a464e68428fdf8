//! Command validation for the Conduit service module.
//!
//! These are the stateless checks every command passes before the keeper
//! touches the store:
//!
//! - **Definitions**: name pattern, description and tag limits, schemas
//! - **Bindings**: name, deposit and pricing presence
//! - **Request contexts**: providers, input, timeout, repetition, threshold
//! - **Responses**: result header, result/output pairing, request ids
//! - **Schemas**: input/output/error documents checked with JSON Schema
//!
//! # Example
//!
//! ```
//! use conduit_valid::{document_matches, validate_service_name, SchemaKind};
//!
//! assert!(validate_service_name("price-feed", 70).is_ok());
//!
//! let schemas = r#"{"input":{"type":"object","required":["pair"]},"output":{"type":"object"},"error":{"type":"object"}}"#;
//! assert!(document_matches(schemas, SchemaKind::Input, r#"{"pair":"cdt-usdt"}"#).unwrap());
//! assert!(!document_matches(schemas, SchemaKind::Input, "{}").unwrap());
//! ```

pub mod definition;
pub mod error;
pub mod request;
pub mod response;
pub mod schema;

pub use definition::{validate_binding, validate_definition, validate_service_name, validate_tags};
pub use error::{ValidationError, ValidationResult};
pub use request::{validate_context, validate_input, validate_providers};
pub use response::{parse_request_id, parse_result, validate_response};
pub use schema::{document_matches, validate_service_schemas, SchemaKind};
