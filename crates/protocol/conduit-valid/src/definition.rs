//! Definition and binding checks.

use std::collections::HashSet;
use std::sync::OnceLock;

use conduit_types::constants::{MAX_DESCRIPTION_LENGTH, MAX_TAGS_NUM, MAX_TAG_LENGTH};
use conduit_types::{Coins, ServiceDefinition, ServiceParams};
use regex::Regex;

use crate::error::{ValidationError, ValidationResult};
use crate::schema::validate_service_schemas;

fn service_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("static pattern"))
}

/// Validate a service name against the allowed pattern and length.
///
/// # Example
/// ```
/// use conduit_valid::validate_service_name;
///
/// assert!(validate_service_name("price-feed_v2", 70).is_ok());
/// assert!(validate_service_name("2fast", 70).is_err());
/// ```
pub fn validate_service_name(name: &str, max_len: usize) -> ValidationResult<()> {
    if !service_name_pattern().is_match(name) {
        return Err(ValidationError::InvalidServiceName(name.to_string()));
    }
    let length = name.chars().count();
    if length > max_len {
        return Err(ValidationError::ServiceNameTooLong {
            length,
            max: max_len,
        });
    }
    Ok(())
}

fn validate_description(field: &'static str, text: &str) -> ValidationResult<()> {
    let length = text.chars().count();
    if length > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong {
            field,
            length,
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(())
}

/// Validate tags: at most 10, each 1-70 chars, no duplicates.
pub fn validate_tags(tags: &[String]) -> ValidationResult<()> {
    if tags.len() > MAX_TAGS_NUM {
        return Err(ValidationError::TooManyTags {
            count: tags.len(),
            max: MAX_TAGS_NUM,
        });
    }
    let mut seen = HashSet::new();
    for tag in tags {
        let length = tag.chars().count();
        if length == 0 || length > MAX_TAG_LENGTH {
            return Err(ValidationError::InvalidTag(tag.clone()));
        }
        if !seen.insert(tag.as_str()) {
            return Err(ValidationError::DuplicateTag(tag.clone()));
        }
    }
    Ok(())
}

/// Validate a service definition before it is stored.
///
/// Checks, in order: name, description, tags, author description, schemas.
pub fn validate_definition(definition: &ServiceDefinition, params: &ServiceParams) -> ValidationResult<()> {
    validate_service_name(&definition.name, params.max_service_name_length)?;
    validate_description("description", &definition.description)?;
    validate_tags(&definition.tags)?;
    validate_description("author_description", &definition.author_description)?;
    validate_service_schemas(&definition.schemas)?;
    Ok(())
}

/// Basic checks for a new binding: name, a non-zero deposit, and a
/// non-empty pricing document. Pricing semantics are checked by the
/// pricing engine.
pub fn validate_binding(
    service_name: &str,
    deposit: &Coins,
    pricing: &str,
    params: &ServiceParams,
) -> ValidationResult<()> {
    validate_service_name(service_name, params.max_service_name_length)?;
    if deposit.is_zero() {
        return Err(ValidationError::InvalidCoins {
            field: "deposit",
            reason: "must be positive".into(),
        });
    }
    if pricing.trim().is_empty() {
        return Err(ValidationError::InvalidCoins {
            field: "pricing",
            reason: "missing".into(),
        });
    }
    Ok(())
}
