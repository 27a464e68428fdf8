//! Service records persisted through a command branch.
//!
//! ```text
//! SqliteKvStore (file)
//!     └── KvBranch  ── set definition / binding / context
//!             commit ─> visible after reopen
//!             drop   ─> nothing written
//! ```

use conduit_crypto::{module_address, tagged_hash, DOMAIN_REQUEST_CONTEXT};
use conduit_store::{KvBranch, KvStore, ServiceStore, SqliteKvStore};
use conduit_types::{
    Coins, RequestContext, RequestContextState, ServiceBinding, ServiceDefinition,
};
use tempfile::TempDir;

fn definition() -> ServiceDefinition {
    ServiceDefinition {
        name: "price-feed".into(),
        description: "spot prices".into(),
        tags: vec!["oracle".into()],
        author: module_address("author"),
        author_description: String::new(),
        schemas: r#"{"input":{"type":"object"},"output":{"type":"object"}}"#.into(),
    }
}

fn binding(provider: &str) -> ServiceBinding {
    ServiceBinding {
        service_name: "price-feed".into(),
        provider: module_address(provider),
        deposit: Coins::single("acdt", 10_000),
        pricing: r#"{"price":"1cdt"}"#.into(),
        available: true,
        disabled_time: 0,
    }
}

fn context() -> RequestContext {
    RequestContext {
        id: tagged_hash(DOMAIN_REQUEST_CONTEXT, &[b"ctx"]),
        service_name: "price-feed".into(),
        providers: vec![module_address("p1"), module_address("p2")],
        consumer: module_address("consumer"),
        input: r#"{"pair":"cdt/usd"}"#.into(),
        service_fee_cap: Coins::single("acdt", 100),
        module_name: None,
        timeout: 10,
        super_mode: false,
        repeated: true,
        repeated_frequency: 20,
        repeated_total: 3,
        response_threshold: 1,
        state: RequestContextState::Running,
        batch_counter: 0,
        batch_height: 0,
        batch_request_count: 0,
        responded_count: 0,
        expired_count: 0,
        round_open: false,
        scheduled_height: Some(1),
    }
}

#[test]
fn test_committed_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conduit.db");

    {
        let mut store = SqliteKvStore::open(&path).unwrap();
        let mut branch = KvBranch::new(&mut store);
        branch.set_definition(&definition()).unwrap();
        branch.set_binding(&binding("p2")).unwrap();
        branch.set_binding(&binding("p1")).unwrap();
        branch.set_request_context(&context()).unwrap();
        branch.schedule_new_batch(1, &context().id).unwrap();
        branch.commit().unwrap();
    }

    let store = SqliteKvStore::open(&path).unwrap();
    assert_eq!(store.get_definition("price-feed").unwrap(), Some(definition()));

    let bindings = store.bindings_of("price-feed").unwrap();
    assert_eq!(bindings.len(), 2);
    assert!(bindings[0].provider < bindings[1].provider);

    assert_eq!(store.all_request_contexts().unwrap(), vec![context()]);
    assert_eq!(store.new_batches_at(1).unwrap(), vec![context().id]);
}

#[test]
fn test_dropped_branch_writes_nothing() {
    let mut store = SqliteKvStore::open_in_memory().unwrap();
    {
        let mut branch = KvBranch::new(&mut store);
        branch.set_definition(&definition()).unwrap();
        branch
            .set_earned_fees(&module_address("p1"), &Coins::single("acdt", 9))
            .unwrap();
    }
    assert_eq!(store.get_definition("price-feed").unwrap(), None);
    assert!(store.prefix(b"").unwrap().is_empty());
}
