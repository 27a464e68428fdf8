//! Closed set of service commands.
//!
//! Every state change a transaction can request is one [`Command`] variant.
//! [`Command::validate_basic`] runs the stateless checks; the keeper then
//! routes each variant to its operation with an exhaustive match.

use conduit_crypto::{Address, Hash};
use conduit_types::{
    Coins, RequestContext, RequestContextId, RequestContextState, RequestId, ServiceDefinition,
    ServiceParams,
};
use conduit_valid::{
    parse_result, validate_binding, validate_context, validate_definition, validate_providers,
    validate_response, validate_service_name, ValidationError, ValidationResult,
};

use crate::error::ServiceResult;
use crate::keeper::{ServiceKeeper, TxContext};

/// A consumer's request to invoke a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallService {
    pub service_name: String,
    pub providers: Vec<Address>,
    pub consumer: Address,
    pub input: String,
    /// Total fee the consumer accepts per round; empty means no cap.
    pub service_fee_cap: Coins,
    pub timeout: u64,
    pub super_mode: bool,
    pub repeated: bool,
    pub repeated_frequency: u64,
    pub repeated_total: i64,
    pub response_threshold: u32,
    /// Callback receiving round results.
    pub module_name: Option<String>,
}

impl CallService {
    /// Single-shot call with no fee cap, waiting for every provider.
    pub fn new(
        service_name: impl Into<String>,
        providers: Vec<Address>,
        consumer: Address,
        input: impl Into<String>,
        timeout: u64,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            providers,
            consumer,
            input: input.into(),
            service_fee_cap: Coins::new(),
            timeout,
            super_mode: false,
            repeated: false,
            repeated_frequency: 0,
            repeated_total: 0,
            response_threshold: 0,
            module_name: None,
        }
    }

    pub fn with_fee_cap(mut self, cap: Coins) -> Self {
        self.service_fee_cap = cap;
        self
    }

    /// Repeat every `frequency` blocks for `total` rounds (`-1` = forever).
    pub fn repeated(mut self, frequency: u64, total: i64) -> Self {
        self.repeated = true;
        self.repeated_frequency = frequency;
        self.repeated_total = total;
        self
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.response_threshold = threshold;
        self
    }

    pub fn with_callback(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    pub fn super_mode(mut self) -> Self {
        self.super_mode = true;
        self
    }

    /// The context this call creates, before any round has run.
    pub(crate) fn to_context(&self, id: RequestContextId) -> RequestContext {
        RequestContext {
            id,
            service_name: self.service_name.clone(),
            providers: self.providers.clone(),
            consumer: self.consumer,
            input: self.input.clone(),
            service_fee_cap: self.service_fee_cap.clone(),
            module_name: self.module_name.clone(),
            timeout: self.timeout,
            super_mode: self.super_mode,
            repeated: self.repeated,
            repeated_frequency: self.repeated_frequency,
            repeated_total: self.repeated_total,
            response_threshold: self.response_threshold,
            state: if self.repeated {
                RequestContextState::BatchRunning
            } else {
                RequestContextState::Running
            },
            batch_counter: 0,
            batch_height: 0,
            batch_request_count: 0,
            responded_count: 0,
            expired_count: 0,
            round_open: false,
            scheduled_height: None,
        }
    }
}

/// Changes to a running context. Zero and empty fields mean "no change".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextUpdate {
    pub providers: Vec<Address>,
    pub service_fee_cap: Coins,
    pub timeout: u64,
    pub repeated_frequency: u64,
    pub repeated_total: i64,
}

/// Every command the service module accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DefineService {
        definition: ServiceDefinition,
    },
    BindService {
        service_name: String,
        provider: Address,
        deposit: Coins,
        pricing: String,
    },
    UpdateServiceBinding {
        service_name: String,
        provider: Address,
        /// Added to the current deposit
        deposit: Coins,
        /// Replacement pricing document; empty keeps the current one
        pricing: String,
    },
    SetWithdrawAddress {
        provider: Address,
        withdraw_address: Address,
    },
    DisableServiceBinding {
        service_name: String,
        provider: Address,
    },
    EnableServiceBinding {
        service_name: String,
        provider: Address,
        /// Added to the current deposit
        deposit: Coins,
    },
    RefundServiceDeposit {
        service_name: String,
        provider: Address,
    },
    CallService(CallService),
    RespondService {
        request_id: RequestId,
        provider: Address,
        /// Raw result header `{"code": .., "message": ..}`
        result: String,
        output: Option<String>,
    },
    PauseRequestContext {
        context_id: RequestContextId,
        consumer: Address,
    },
    StartRequestContext {
        context_id: RequestContextId,
        consumer: Address,
    },
    KillRequestContext {
        context_id: RequestContextId,
        consumer: Address,
    },
    UpdateRequestContext {
        context_id: RequestContextId,
        consumer: Address,
        update: ContextUpdate,
    },
    WithdrawEarnedFees {
        provider: Address,
    },
    WithdrawTax {
        trustee: Address,
        destination: Address,
        amount: Coins,
    },
}

impl Command {
    /// Command name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DefineService { .. } => "define_service",
            Self::BindService { .. } => "bind_service",
            Self::UpdateServiceBinding { .. } => "update_service_binding",
            Self::SetWithdrawAddress { .. } => "set_withdraw_address",
            Self::DisableServiceBinding { .. } => "disable_service_binding",
            Self::EnableServiceBinding { .. } => "enable_service_binding",
            Self::RefundServiceDeposit { .. } => "refund_service_deposit",
            Self::CallService(_) => "call_service",
            Self::RespondService { .. } => "respond_service",
            Self::PauseRequestContext { .. } => "pause_request_context",
            Self::StartRequestContext { .. } => "start_request_context",
            Self::KillRequestContext { .. } => "kill_request_context",
            Self::UpdateRequestContext { .. } => "update_request_context",
            Self::WithdrawEarnedFees { .. } => "withdraw_earned_fees",
            Self::WithdrawTax { .. } => "withdraw_tax",
        }
    }

    /// Stateless checks, run before the command touches the store.
    pub fn validate_basic(&self, params: &ServiceParams) -> ValidationResult<()> {
        match self {
            Self::DefineService { definition } => validate_definition(definition, params),
            Self::BindService {
                service_name,
                deposit,
                pricing,
                ..
            } => validate_binding(service_name, deposit, pricing, params),
            Self::UpdateServiceBinding { service_name, .. }
            | Self::DisableServiceBinding { service_name, .. }
            | Self::EnableServiceBinding { service_name, .. }
            | Self::RefundServiceDeposit { service_name, .. } => {
                validate_service_name(service_name, params.max_service_name_length)
            }
            Self::CallService(call) => {
                validate_service_name(&call.service_name, params.max_service_name_length)?;
                validate_context(&call.to_context(Hash([0u8; 32])), params)
            }
            Self::RespondService { result, output, .. } => {
                let result = parse_result(result)?;
                validate_response(&result, output.as_deref(), params.tx_size_limit)
            }
            Self::UpdateRequestContext { update, .. } => {
                if !update.providers.is_empty() {
                    validate_providers(&update.providers, params.max_providers_per_request)?;
                }
                if update.timeout > params.max_request_timeout {
                    return Err(ValidationError::InvalidTimeout {
                        timeout: update.timeout,
                        max: params.max_request_timeout,
                    });
                }
                if update.repeated_total < -1 {
                    return Err(ValidationError::InvalidRepeatedTotal(update.repeated_total));
                }
                Ok(())
            }
            Self::WithdrawTax { amount, .. } => {
                if amount.is_zero() {
                    return Err(ValidationError::InvalidCoins {
                        field: "amount",
                        reason: "must be positive".into(),
                    });
                }
                Ok(())
            }
            Self::SetWithdrawAddress { .. }
            | Self::PauseRequestContext { .. }
            | Self::StartRequestContext { .. }
            | Self::KillRequestContext { .. }
            | Self::WithdrawEarnedFees { .. } => Ok(()),
        }
    }
}

impl ServiceKeeper {
    /// Route a command to its operation.
    pub(crate) fn dispatch(&self, tx: &mut TxContext<'_>, command: Command) -> ServiceResult<()> {
        command.validate_basic(&tx.params)?;
        match command {
            Command::DefineService { definition } => self.define_service(tx, definition),
            Command::BindService {
                service_name,
                provider,
                deposit,
                pricing,
            } => self.bind_service(tx, &service_name, provider, deposit, &pricing),
            Command::UpdateServiceBinding {
                service_name,
                provider,
                deposit,
                pricing,
            } => self.update_service_binding(tx, &service_name, provider, deposit, &pricing),
            Command::SetWithdrawAddress {
                provider,
                withdraw_address,
            } => self.set_withdraw_address(tx, provider, withdraw_address),
            Command::DisableServiceBinding {
                service_name,
                provider,
            } => self.disable_service_binding(tx, &service_name, provider),
            Command::EnableServiceBinding {
                service_name,
                provider,
                deposit,
            } => self.enable_service_binding(tx, &service_name, provider, deposit),
            Command::RefundServiceDeposit {
                service_name,
                provider,
            } => self.refund_service_deposit(tx, &service_name, provider),
            Command::CallService(call) => self.call_service(tx, call).map(|_| ()),
            Command::RespondService {
                request_id,
                provider,
                result,
                output,
            } => self.respond_service(tx, request_id, provider, &result, output),
            Command::PauseRequestContext {
                context_id,
                consumer,
            } => self.pause_request_context(tx, context_id, consumer),
            Command::StartRequestContext {
                context_id,
                consumer,
            } => self.start_request_context(tx, context_id, consumer),
            Command::KillRequestContext {
                context_id,
                consumer,
            } => self.kill_request_context(tx, context_id, consumer),
            Command::UpdateRequestContext {
                context_id,
                consumer,
                update,
            } => self.update_request_context(tx, context_id, consumer, update),
            Command::WithdrawEarnedFees { provider } => self.withdraw_earned_fees(tx, provider),
            Command::WithdrawTax {
                trustee,
                destination,
                amount,
            } => self.withdraw_tax(tx, trustee, destination, amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_crypto::module_address;
    use conduit_types::ResponseResult;

    fn params() -> ServiceParams {
        ServiceParams::default()
    }

    #[test]
    fn test_call_builder_sets_initial_state() {
        let call = CallService::new("s1", vec![module_address("p")], module_address("c"), "{}", 5);
        let ctx = call.to_context(Hash([1u8; 32]));
        assert_eq!(ctx.state, RequestContextState::Running);
        assert!(!ctx.repeated);

        let repeated = call.repeated(10, 3).with_threshold(1);
        let ctx = repeated.to_context(Hash([1u8; 32]));
        assert_eq!(ctx.state, RequestContextState::BatchRunning);
        assert_eq!(ctx.repeated_total, 3);
        assert_eq!(ctx.response_threshold, 1);
    }

    #[test]
    fn test_call_basic_validation() {
        let p = module_address("p");
        let ok = CallService::new("s1", vec![p], module_address("c"), "{}", 5);
        assert!(Command::CallService(ok.clone()).validate_basic(&params()).is_ok());

        let dup = CallService {
            providers: vec![p, p],
            ..ok.clone()
        };
        assert!(matches!(
            Command::CallService(dup).validate_basic(&params()),
            Err(ValidationError::DuplicateProvider(_))
        ));

        let short_frequency = ok.clone().repeated(2, 3);
        assert!(Command::CallService(short_frequency)
            .validate_basic(&params())
            .is_err());

        let zero_total = ok.repeated(0, 0);
        assert!(matches!(
            Command::CallService(zero_total).validate_basic(&params()),
            Err(ValidationError::InvalidRepeatedTotal(0))
        ));
    }

    #[test]
    fn test_respond_basic_validation() {
        let request_id = RequestId {
            context_id: Hash([2u8; 32]),
            batch_counter: 1,
            request_height: 1,
            index: 0,
        };
        let respond = |result: &str, output: Option<&str>| Command::RespondService {
            request_id,
            provider: module_address("p"),
            result: result.into(),
            output: output.map(str::to_string),
        };
        let ok = serde_json::to_string(&ResponseResult::ok("done")).unwrap();

        assert!(respond(&ok, Some("{}")).validate_basic(&params()).is_ok());
        assert!(respond(&ok, None).validate_basic(&params()).is_err());
        assert!(respond(r#"{"code":500,"message":"boom"}"#, Some("{}"))
            .validate_basic(&params())
            .is_err());
        assert!(respond("not json", None).validate_basic(&params()).is_err());
    }

    #[test]
    fn test_withdraw_tax_needs_amount() {
        let cmd = Command::WithdrawTax {
            trustee: module_address("t"),
            destination: module_address("d"),
            amount: Coins::new(),
        };
        assert!(cmd.validate_basic(&params()).is_err());
        assert_eq!(cmd.name(), "withdraw_tax");
    }
}
