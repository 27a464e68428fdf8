//! Governance parameter files.
//!
//! Parameters are read from a TOML document whose keys mirror
//! [`ServiceParams`]. Missing keys keep their defaults; a missing file
//! yields the defaults.
//!
//! ```toml
//! max_request_timeout = 50
//! min_deposit_multiple = 200
//! min_deposit = "1000acdt"
//! service_fee_tax_ppm = 50000
//! ```

use std::path::Path;

use conduit_types::ServiceParams;

use crate::error::{ServiceError, ServiceResult};

/// Parse and validate parameters from TOML text.
pub fn params_from_toml(contents: &str) -> ServiceResult<ServiceParams> {
    let params: ServiceParams = toml::from_str(contents)
        .map_err(|e| ServiceError::config(format!("malformed params: {}", e)))?;
    params.validate()?;
    Ok(params)
}

/// Load parameters from a file, falling back to defaults when it is absent.
pub fn load_params(path: &Path) -> ServiceResult<ServiceParams> {
    if !path.exists() {
        return Ok(ServiceParams::default());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ServiceError::config(format!("cannot read {}: {}", path.display(), e)))?;
    params_from_toml(&contents)
}

/// Write parameters as TOML, creating parent directories.
pub fn save_params(params: &ServiceParams, path: &Path) -> ServiceResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ServiceError::config(format!("cannot create {}: {}", parent.display(), e)))?;
    }
    let contents = toml::to_string_pretty(params)
        .map_err(|e| ServiceError::config(format!("failed to serialize params: {}", e)))?;
    std::fs::write(path, contents)
        .map_err(|e| ServiceError::config(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::{Coins, ParamsError};
    use tempfile::TempDir;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let params = params_from_toml(
            r#"
            min_deposit_multiple = 2
            min_deposit = "0acdt"
            "#,
        )
        .unwrap();
        assert_eq!(params.min_deposit_multiple, 2);
        assert!(params.min_deposit.is_zero());
        assert_eq!(
            params.max_request_timeout,
            ServiceParams::default().max_request_timeout
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = params_from_toml("max_request_timeout = 0").unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidParams(ParamsError::NotPositive("max_request_timeout"))
        ));
        let err = params_from_toml("service_fee_tax_ppm = 1000000").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParams(ParamsError::TaxTooHigh(_))));
        assert!(params_from_toml("max_request_timeout = \"ten\"").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("params.toml");
        assert_eq!(load_params(&path).unwrap(), ServiceParams::default());

        let params = ServiceParams::default()
            .with_min_deposit(Coins::single("acdt", 7))
            .with_service_fee_tax_ppm(0);
        save_params(&params, &path).unwrap();
        assert_eq!(load_params(&path).unwrap(), params);
    }
}
