//! Request context lifecycle: rounds, thresholds, pause/start/kill/update.

use conduit_ops::{created_context_id, issued_requests, Command, ContextUpdate, Role, ServiceError, ServiceEvent};
use conduit_test_utils::chain::CALLBACK_MODULE;
use conduit_test_utils::*;
use conduit_types::RequestContextState;
use conduit_valid::ValidationError;

fn count<F: Fn(&ServiceEvent) -> bool>(events: &[ServiceEvent], f: F) -> usize {
    events.iter().filter(|e| f(e)).count()
}

fn rounds_started(events: &[ServiceEvent]) -> usize {
    count(events, |e| matches!(e, ServiceEvent::RoundStarted { .. }))
}

fn respond_ok(chain: &mut TestChain, request_id: conduit_types::RequestId, provider: conduit_crypto::Address) {
    chain
        .exec(Command::RespondService {
            request_id,
            provider,
            result: RESULT_OK.into(),
            output: Some(TEST_OUTPUT.into()),
        })
        .unwrap();
}

// =========================================================================
// Rounds
// =========================================================================

#[test]
fn test_repeated_context_runs_exactly_n_rounds() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain
        .call_builder("s1", vec![provider], consumer, 2)
        .repeated(0, 3);
    let mut events = chain.exec(Command::CallService(call)).unwrap();
    let context_id = created_context_id(&events).unwrap();

    events.extend(chain.advance_through(30));
    assert_eq!(rounds_started(&events), 3);

    let ctx = chain.keeper.query_request_context(chain.store(), &context_id).unwrap();
    assert_eq!(ctx.state, RequestContextState::Completed);
    assert_eq!(ctx.batch_counter, 3);
    assert!(chain.keeper.query_requests(chain.store(), &context_id).unwrap().is_empty());
    // Every round expired, so every fee came back
    assert_eq!(chain.balance(&consumer), 1_000);
}

#[test]
fn test_rounds_follow_frequency() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let start = chain.height;
    let call = chain
        .call_builder("s1", vec![provider], consumer, 2)
        .repeated(5, -1);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let context_id = created_context_id(&events).unwrap();
    respond_ok(&mut chain, issued_requests(&events)[0], provider);

    let ctx = chain.keeper.query_request_context(chain.store(), &context_id).unwrap();
    assert_eq!(ctx.state, RequestContextState::BatchCompleted);
    assert_eq!(ctx.scheduled_height, Some(start + 5));
    assert_eq!(
        chain.keeper.query_scheduled_rounds(chain.store(), start + 5).unwrap(),
        vec![context_id]
    );

    assert_eq!(rounds_started(&chain.advance_through(start + 4)), 0);
    let events = chain.next_block();
    assert_eq!(rounds_started(&events), 1);
    let ctx = chain.keeper.query_request_context(chain.store(), &context_id).unwrap();
    assert_eq!(ctx.state, RequestContextState::BatchRunning);
    assert_eq!(ctx.batch_counter, 2);
    assert_eq!(ctx.batch_height, start + 5);
}

#[test]
fn test_threshold_completes_round_early() {
    let mut chain = TestChain::new();
    let providers = [test_address("p1"), test_address("p2"), test_address("p3")];
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(providers[0], 10), (providers[1], 10), (providers[2], 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain
        .call_builder("s1", providers.to_vec(), consumer, 10)
        .with_threshold(2)
        .with_callback(CALLBACK_MODULE);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let context_id = created_context_id(&events).unwrap();
    let requests = issued_requests(&events);
    assert_eq!(requests.len(), 3);
    assert_eq!(chain.balance(&consumer), 970);

    respond_ok(&mut chain, requests[0], providers[0]);
    assert_eq!(chain.callback.round_count(), 0);
    respond_ok(&mut chain, requests[1], providers[1]);

    // Third request abandoned and refunded
    assert_eq!(chain.balance(&consumer), 980);
    assert!(chain.keeper.query_request(chain.store(), &requests[2]).is_err());
    let err = chain
        .exec(Command::RespondService {
            request_id: requests[2],
            provider: providers[2],
            result: RESULT_OK.into(),
            output: Some(TEST_OUTPUT.into()),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownRequest(_)));

    let rounds = chain.callback.rounds();
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].context_id, context_id);
    assert_eq!(rounds[0].responses.len(), 2);
    assert!(rounds[0].threshold_met);
    assert_eq!(chain.callback.last_state(&context_id), Some(RequestContextState::Completed));
    assert!(chain.keeper.query_responses(chain.store(), &context_id).unwrap().is_empty());
}

#[test]
fn test_error_result_refunds_consumer() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain
        .call_builder("s1", vec![provider], consumer, 10)
        .with_callback(CALLBACK_MODULE);
    let events = chain.exec(Command::CallService(call)).unwrap();
    chain
        .exec(Command::RespondService {
            request_id: issued_requests(&events)[0],
            provider,
            result: RESULT_ERROR.into(),
            output: None,
        })
        .unwrap();

    assert_eq!(chain.balance(&consumer), 1_000);
    assert!(chain.keeper.query_earned_fees(chain.store(), &provider).unwrap().is_zero());
    let rounds = chain.callback.rounds();
    assert_eq!(rounds[0].responses[0].result.code, 500);
    assert!(!rounds[0].threshold_met);
}

#[test]
fn test_unavailable_providers_are_skipped() {
    let mut chain = TestChain::new();
    let (p1, p2) = (test_address("p1"), test_address("p2"));
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(p1, 10), (p2, 10)]);
    chain.fund(&consumer, 1_000);
    chain
        .exec(Command::DisableServiceBinding {
            service_name: "s1".into(),
            provider: p2,
        })
        .unwrap();

    let call = chain.call_builder("s1", vec![p1, p2], consumer, 10);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let requests = issued_requests(&events);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].index, 0);

    // Nobody available: the round closes immediately
    chain
        .exec(Command::DisableServiceBinding {
            service_name: "s1".into(),
            provider: p1,
        })
        .unwrap();
    let call = chain.call_builder("s1", vec![p1, p2], consumer, 10);
    let events = chain.exec(Command::CallService(call)).unwrap();
    assert!(issued_requests(&events).is_empty());
    let ctx = chain
        .keeper
        .query_request_context(chain.store(), &created_context_id(&events).unwrap())
        .unwrap();
    assert_eq!(ctx.state, RequestContextState::Completed);
}

#[test]
fn test_fee_cap_filters_expensive_providers() {
    let mut chain = TestChain::new();
    let (cheap, pricey) = (test_address("cheap"), test_address("pricey"));
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(cheap, 10), (pricey, 50)]);
    chain.fund(&consumer, 1_000);

    // 60 over two providers leaves 30 each
    let call = chain
        .call_builder("s1", vec![cheap, pricey], consumer, 10)
        .with_fee_cap(native(60));
    let events = chain.exec(Command::CallService(call)).unwrap();
    let requests = issued_requests(&events);
    assert_eq!(requests.len(), 1);
    let request = chain.keeper.query_request(chain.store(), &requests[0]).unwrap();
    assert_eq!(request.provider, cheap);
    assert_eq!(chain.balance(&consumer), 990);
}

#[test]
fn test_volume_discount_applies_after_threshold() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain
        .exec(Command::DefineService {
            definition: test_definition("s1", test_address("author")),
        })
        .unwrap();
    chain.fund(&provider, 1_000);
    chain
        .exec(Command::BindService {
            service_name: "s1".into(),
            provider,
            deposit: native(1_000),
            pricing: volume_pricing("100acdt", 1, "0.5"),
        })
        .unwrap();
    chain.fund(&consumer, 1_000);

    let call = chain.call_builder("s1", vec![provider], consumer, 10);
    chain.exec(Command::CallService(call.clone())).unwrap();
    assert_eq!(chain.balance(&consumer), 900);
    assert_eq!(
        chain
            .keeper
            .query_request_volume(chain.store(), &consumer, "s1", &provider)
            .unwrap(),
        1
    );

    chain.exec(Command::CallService(call)).unwrap();
    assert_eq!(chain.balance(&consumer), 850);
}

// =========================================================================
// Pause / start / kill
// =========================================================================

#[test]
fn test_paused_context_issues_no_requests() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain
        .call_builder("s1", vec![provider], consumer, 2)
        .repeated(2, -1);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let context_id = created_context_id(&events).unwrap();

    chain
        .exec(Command::PauseRequestContext { context_id, consumer })
        .unwrap();
    let events = chain.advance_through(20);
    assert_eq!(rounds_started(&events), 0);
    // The in-flight round still expired normally
    assert_eq!(count(&events, |e| matches!(e, ServiceEvent::RequestExpired { .. })), 1);
    let ctx = chain.keeper.query_request_context(chain.store(), &context_id).unwrap();
    assert_eq!(ctx.state, RequestContextState::Paused);

    // Pausing twice is not a transition
    let err = chain
        .exec(Command::PauseRequestContext { context_id, consumer })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStateTransition { .. }));

    chain
        .exec(Command::StartRequestContext { context_id, consumer })
        .unwrap();
    let ctx = chain.keeper.query_request_context(chain.store(), &context_id).unwrap();
    assert_eq!(ctx.state, RequestContextState::BatchCompleted);
    let events = chain.next_block();
    assert_eq!(rounds_started(&events), 1);
}

#[test]
fn test_only_consumer_controls_context() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    let stranger = test_address("stranger");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain.call_builder("s1", vec![provider], consumer, 10);
    let context_id = chain.call(call).unwrap();

    let err = chain
        .exec(Command::PauseRequestContext {
            context_id,
            consumer: stranger,
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::WrongConsumer(a) if a == stranger));

    let err = chain
        .exec(Command::KillRequestContext {
            context_id,
            consumer: stranger,
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::WrongConsumer(_)));
}

#[test]
fn test_kill_refunds_and_is_terminal() {
    let mut chain = TestChain::new();
    let (p1, p2) = (test_address("p1"), test_address("p2"));
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(p1, 10), (p2, 20)]);
    chain.fund(&consumer, 1_000);

    let call = chain
        .call_builder("s1", vec![p1, p2], consumer, 10)
        .repeated(10, 5)
        .with_callback(CALLBACK_MODULE);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let context_id = created_context_id(&events).unwrap();
    let requests = issued_requests(&events);
    respond_ok(&mut chain, requests[0], p1);
    assert_eq!(chain.balance(&consumer), 970);

    let events = chain
        .exec(Command::KillRequestContext { context_id, consumer })
        .unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, ServiceEvent::RequestContextCompleted { killed: true, .. })));
    assert_eq!(chain.balance(&consumer), 990);
    assert!(chain.keeper.query_requests(chain.store(), &context_id).unwrap().is_empty());
    assert!(chain.keeper.query_responses(chain.store(), &context_id).unwrap().is_empty());
    assert_eq!(chain.callback.last_state(&context_id), Some(RequestContextState::Completed));
    // Killed rounds are not delivered
    assert_eq!(chain.callback.round_count(), 0);

    for command in [
        Command::KillRequestContext { context_id, consumer },
        Command::PauseRequestContext { context_id, consumer },
        Command::StartRequestContext { context_id, consumer },
    ] {
        let err = chain.exec(command).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStateTransition { .. }));
    }
    assert_eq!(rounds_started(&chain.advance_through(50)), 0);
}

#[test]
fn test_insufficient_balance_pauses_repeated_context() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 10);

    let call = chain
        .call_builder("s1", vec![provider], consumer, 2)
        .repeated(2, 5)
        .with_callback(CALLBACK_MODULE);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let context_id = created_context_id(&events).unwrap();
    respond_ok(&mut chain, issued_requests(&events)[0], provider);
    assert_eq!(chain.balance(&consumer), 0);

    let events = chain.advance_through(chain.height + 2);
    assert!(events.iter().any(|e| matches!(
        e,
        ServiceEvent::RequestContextPaused { insufficient_balance: true, .. }
    )));
    let ctx = chain.keeper.query_request_context(chain.store(), &context_id).unwrap();
    assert_eq!(ctx.state, RequestContextState::Paused);
    assert_eq!(ctx.batch_counter, 1);
    assert_eq!(chain.callback.last_state(&context_id), Some(RequestContextState::Paused));

    // Topping up and restarting resumes the rounds
    chain.fund(&consumer, 10);
    chain
        .exec(Command::StartRequestContext { context_id, consumer })
        .unwrap();
    let events = chain.next_block();
    assert_eq!(rounds_started(&events), 1);
}

#[test]
fn test_first_round_needs_funds() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 5);

    let call = chain.call_builder("s1", vec![provider], consumer, 10);
    let err = chain.exec(Command::CallService(call)).unwrap_err();
    assert!(matches!(err, ServiceError::Bank(_)));
    assert_eq!(err.error_code(), conduit_types::ErrorCode::InsufficientBalance);
    assert_eq!(chain.balance(&consumer), 5);
    assert!(chain
        .keeper
        .query_requests_by_height(chain.store(), chain.height + 10)
        .unwrap()
        .is_empty());
}

// =========================================================================
// Update
// =========================================================================

#[test]
fn test_update_reschedules_and_validates() {
    let mut chain = TestChain::new();
    let (p1, p2) = (test_address("p1"), test_address("p2"));
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(p1, 10), (p2, 10)]);
    chain.fund(&consumer, 1_000);

    let start = chain.height;
    let call = chain
        .call_builder("s1", vec![p1], consumer, 2)
        .repeated(4, 10);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let context_id = created_context_id(&events).unwrap();
    respond_ok(&mut chain, issued_requests(&events)[0], p1);

    chain
        .exec(Command::UpdateRequestContext {
            context_id,
            consumer,
            update: ContextUpdate {
                providers: vec![p1, p2],
                repeated_frequency: 8,
                ..Default::default()
            },
        })
        .unwrap();
    let ctx = chain.keeper.query_request_context(chain.store(), &context_id).unwrap();
    assert_eq!(ctx.providers, vec![p1, p2]);
    assert_eq!(ctx.scheduled_height, Some(start + 8));
    assert!(chain
        .keeper
        .query_scheduled_rounds(chain.store(), start + 4)
        .unwrap()
        .is_empty());

    // Frequency below timeout
    let err = chain
        .exec(Command::UpdateRequestContext {
            context_id,
            consumer,
            update: ContextUpdate {
                timeout: 20,
                ..Default::default()
            },
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidRepeatedFrequency { .. })
    ));

    let events = chain.advance_through(start + 8);
    assert_eq!(issued_requests(&events).len(), 2);
}

#[test]
fn test_update_total_below_rounds_done_rejected() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain
        .call_builder("s1", vec![provider], consumer, 2)
        .repeated(2, 10);
    let context_id = chain.call(call).unwrap();
    chain.advance_through(chain.height + 4);
    let done = chain
        .keeper
        .query_request_context(chain.store(), &context_id)
        .unwrap()
        .batch_counter;
    assert!(done >= 2);

    let err = chain
        .exec(Command::UpdateRequestContext {
            context_id,
            consumer,
            update: ContextUpdate {
                repeated_total: done as i64 - 1,
                ..Default::default()
            },
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidRepeatedTotal(_))
    ));
}

#[test]
fn test_update_repetition_of_single_call_rejected() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain.call_builder("s1", vec![provider], consumer, 10);
    let context_id = chain.call(call).unwrap();
    let err = chain
        .exec(Command::UpdateRequestContext {
            context_id,
            consumer,
            update: ContextUpdate {
                repeated_total: 3,
                ..Default::default()
            },
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStateTransition { .. }));
}

// =========================================================================
// Call admission
// =========================================================================

#[test]
fn test_super_mode_requires_profiler_and_is_free() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let profiler = test_address("profiler");
    chain.setup_service("s1", &[(provider, 10)]);

    let call = chain
        .call_builder("s1", vec![provider], profiler, 10)
        .super_mode();
    let err = chain.exec(Command::CallService(call.clone())).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Unauthorized {
            role: Role::Profiler,
            ..
        }
    ));

    chain.guardian.grant(profiler, Role::Profiler);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let request = chain
        .keeper
        .query_request(chain.store(), &issued_requests(&events)[0])
        .unwrap();
    assert!(request.super_mode);
    assert!(request.service_fee.is_zero());
    assert_eq!(
        chain
            .keeper
            .query_request_volume(chain.store(), &profiler, "s1", &provider)
            .unwrap(),
        0
    );
}

#[test]
fn test_call_admission_errors() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let err = chain
        .exec(Command::CallService(chain.call_builder("nope", vec![provider], consumer, 10)))
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownDefinition(_)));

    let call = chain
        .call_builder("s1", vec![provider], consumer, 10)
        .with_callback("nobody");
    let err = chain.exec(Command::CallService(call)).unwrap_err();
    assert!(matches!(err, ServiceError::UnknownCallback(_)));

    let mut call = chain.call_builder("s1", vec![provider], consumer, 10);
    call.input = r#"{"symbol":"cdt"}"#.into();
    let err = chain.exec(Command::CallService(call)).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidInput(_))));

    let err = chain
        .exec(Command::CallService(chain.call_builder("s1", vec![provider, provider], consumer, 10)))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::DuplicateProvider(_))));

    let err = chain
        .exec(Command::CallService(chain.call_builder("s1", vec![provider], consumer, 1_000)))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidTimeout { .. })));
    assert_eq!(chain.balance(&consumer), 1_000);
}

#[test]
fn test_response_checks() {
    let mut chain = TestChain::new();
    let provider = test_address("provider");
    let consumer = test_address("consumer");
    chain.setup_service("s1", &[(provider, 10)]);
    chain.fund(&consumer, 1_000);

    let call = chain.call_builder("s1", vec![provider], consumer, 10);
    let events = chain.exec(Command::CallService(call)).unwrap();
    let request_id = issued_requests(&events)[0];

    let err = chain
        .exec(Command::RespondService {
            request_id,
            provider: test_address("impostor"),
            result: RESULT_OK.into(),
            output: Some(TEST_OUTPUT.into()),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::WrongProvider { .. }));

    let err = chain
        .exec(Command::RespondService {
            request_id,
            provider,
            result: RESULT_OK.into(),
            output: Some(r#"{"price":"high"}"#.into()),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidResult(_))));

    let err = chain
        .exec(Command::RespondService {
            request_id,
            provider,
            result: RESULT_OK.into(),
            output: None,
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidResult(_))));

    // Rejections left the request in place
    assert!(chain.keeper.query_request(chain.store(), &request_id).is_ok());
    respond_ok(&mut chain, request_id, provider);
    let err = chain
        .exec(Command::RespondService {
            request_id,
            provider,
            result: RESULT_OK.into(),
            output: Some(TEST_OUTPUT.into()),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownRequest(_)));
}
