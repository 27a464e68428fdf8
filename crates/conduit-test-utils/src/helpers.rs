//! Helper functions for creating test fixtures.

use conduit_crypto::{module_address, Address};
use conduit_store::SqliteKvStore;
use conduit_types::constants::NATIVE_BASE_DENOM;
use conduit_types::{Amount, Coins, ServiceDefinition, ServiceParams};
use tempfile::TempDir;

/// Schemas accepting `{"pair": string}` in and `{"rate": number}` out.
pub const TEST_SCHEMAS: &str = r#"{
    "input": {"type":"object","properties":{"pair":{"type":"string"}},"required":["pair"]},
    "output": {"type":"object","properties":{"rate":{"type":"number"}},"required":["rate"]},
    "error": {"type":"object","required":["code"]}
}"#;

/// An input matching [`TEST_SCHEMAS`].
pub const TEST_INPUT: &str = r#"{"pair":"cdt-usdt"}"#;

/// An output matching [`TEST_SCHEMAS`].
pub const TEST_OUTPUT: &str = r#"{"rate":1.25}"#;

/// A successful result header.
pub const RESULT_OK: &str = r#"{"code":200,"message":"ok"}"#;

/// A failed result header.
pub const RESULT_ERROR: &str = r#"{"code":500,"message":"upstream down"}"#;

/// Deterministic address for a test actor.
pub fn test_address(label: &str) -> Address {
    module_address(label)
}

/// Native base-denom coins.
pub fn native(amount: Amount) -> Coins {
    Coins::single(NATIVE_BASE_DENOM, amount)
}

/// Parse a coins literal such as `"100acdt,5uusdt"`.
pub fn coins(s: &str) -> Coins {
    s.parse().unwrap()
}

/// A pricing document with a flat price.
pub fn flat_pricing(price: &str) -> String {
    format!(r#"{{"price":"{}"}}"#, price)
}

/// A pricing document with a volume discount from `volume` requests on.
pub fn volume_pricing(price: &str, volume: u64, discount: &str) -> String {
    format!(
        r#"{{"price":"{}","promotions_by_volume":[{{"volume":{},"discount":"{}"}}]}}"#,
        price, volume, discount
    )
}

pub fn test_definition(name: &str, author: Address) -> ServiceDefinition {
    ServiceDefinition {
        name: name.to_string(),
        description: format!("{} test service", name),
        tags: vec!["test".to_string()],
        author,
        author_description: String::new(),
        schemas: TEST_SCHEMAS.to_string(),
    }
}

/// Small deposits and a 10% tax, so tests can use round numbers.
///
/// Minimum deposit is `max(10 × price, 1000acdt)`; the refund delay is one
/// minute.
pub fn test_params() -> ServiceParams {
    ServiceParams::default()
        .with_min_deposit_multiple(10)
        .with_min_deposit_amount(1_000)
        .with_service_fee_tax_ppm(100_000)
        .with_refund_delays(30_000, 30_000)
}

/// A SQLite store in a temporary directory.
///
/// Returns the temp directory as well; keep it alive for the duration of
/// the test.
pub fn temp_sqlite_store() -> (SqliteKvStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteKvStore::open(temp_dir.path().join(conduit_store::DATABASE_FILE)).unwrap();
    (store, temp_dir)
}
