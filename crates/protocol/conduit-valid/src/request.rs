//! Request context checks, shared by creation and update.

use std::collections::HashSet;

use conduit_crypto::Address;
use conduit_types::constants::{MAX_MODULE_NAME_LENGTH, UNLIMITED_REPEATS};
use conduit_types::{RequestContext, ServiceParams};

use crate::error::{ValidationError, ValidationResult};

/// Validate a provider list: 1..=max entries, no duplicates.
pub fn validate_providers(providers: &[Address], max: usize) -> ValidationResult<()> {
    if providers.is_empty() {
        return Err(ValidationError::NoProviders);
    }
    if providers.len() > max {
        return Err(ValidationError::TooManyProviders {
            count: providers.len(),
            max,
        });
    }
    let mut seen = HashSet::new();
    for provider in providers {
        if !seen.insert(provider) {
            return Err(ValidationError::DuplicateProvider(provider.to_string()));
        }
    }
    Ok(())
}

/// Validate request input: non-empty, within the size limit, valid JSON.
pub fn validate_input(input: &str, size_limit: usize) -> ValidationResult<()> {
    if input.trim().is_empty() {
        return Err(ValidationError::InvalidInput("input missing".into()));
    }
    if input.len() > size_limit {
        return Err(ValidationError::PayloadTooLarge {
            field: "input",
            size: input.len(),
            max: size_limit,
        });
    }
    serde_json::from_str::<serde_json::Value>(input)
        .map_err(|e| ValidationError::InvalidInput(format!("input is not valid JSON: {}", e)))?;
    Ok(())
}

/// Validate the consumer-controlled fields of a request context.
///
/// Used on creation and, after merging the changes, on update:
/// - providers: 1..=max, distinct
/// - input: non-empty JSON within the size limit
/// - `0 < timeout <= max_request_timeout`
/// - repeated: `frequency == 0 || frequency >= timeout`,
///   `total == -1 || total > 0`
/// - `response_threshold <= len(providers)`
/// - module name, when present, 1..=70 chars
pub fn validate_context(ctx: &RequestContext, params: &ServiceParams) -> ValidationResult<()> {
    validate_providers(&ctx.providers, params.max_providers_per_request)?;
    validate_input(&ctx.input, params.tx_size_limit)?;

    if ctx.timeout == 0 || ctx.timeout > params.max_request_timeout {
        return Err(ValidationError::InvalidTimeout {
            timeout: ctx.timeout,
            max: params.max_request_timeout,
        });
    }

    if ctx.repeated {
        if ctx.repeated_frequency != 0 && ctx.repeated_frequency < ctx.timeout {
            return Err(ValidationError::InvalidRepeatedFrequency {
                frequency: ctx.repeated_frequency,
                timeout: ctx.timeout,
            });
        }
        if ctx.repeated_total != UNLIMITED_REPEATS && ctx.repeated_total <= 0 {
            return Err(ValidationError::InvalidRepeatedTotal(ctx.repeated_total));
        }
    }

    if ctx.response_threshold as usize > ctx.providers.len() {
        return Err(ValidationError::InvalidThreshold {
            threshold: ctx.response_threshold,
            providers: ctx.providers.len(),
        });
    }

    if let Some(name) = &ctx.module_name {
        if name.is_empty() || name.chars().count() > MAX_MODULE_NAME_LENGTH {
            return Err(ValidationError::InvalidModuleName(name.clone()));
        }
    }

    Ok(())
}
