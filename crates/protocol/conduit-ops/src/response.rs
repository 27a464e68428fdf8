//! Response processing.

use conduit_crypto::Address;
use conduit_store::ServiceStore;
use conduit_types::{RequestId, Response};
use conduit_valid::{document_matches, parse_result, SchemaKind, ValidationError};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::events::ServiceEvent;
use crate::keeper::{ServiceKeeper, TxContext};

impl ServiceKeeper {
    /// Accept a provider's answer to an active request.
    ///
    /// A success pays the provider (minus tax); any other result code
    /// refunds the consumer. Either way the response counts towards the
    /// round and is kept until the round completes.
    pub(crate) fn respond_service(
        &self,
        tx: &mut TxContext<'_>,
        request_id: RequestId,
        provider: Address,
        raw_result: &str,
        output: Option<String>,
    ) -> ServiceResult<()> {
        // 1. Only the addressed provider may answer an active request
        let result = parse_result(raw_result)?;
        let request = tx
            .store
            .get_active_request(&request_id)?
            .ok_or_else(|| ServiceError::UnknownRequest(request_id.to_string()))?;
        if request.provider != provider {
            return Err(ServiceError::WrongProvider {
                expected: request.provider,
                actual: provider,
            });
        }

        // 2. Check the payload against the service's schemas
        let mut ctx = self.load_context(tx, &request.request_context_id)?;
        let definition = tx
            .store
            .get_definition(&request.service_name)?
            .ok_or_else(|| ServiceError::UnknownDefinition(request.service_name.clone()))?;
        let (kind, document) = match output.as_deref() {
            Some(out) => (SchemaKind::Output, out),
            None => (SchemaKind::Error, raw_result),
        };
        if !document_matches(&definition.schemas, kind, document)? {
            let what = match kind {
                SchemaKind::Output => "output does not conform to the service output schema",
                _ => "result does not conform to the service error schema",
            };
            return Err(ValidationError::InvalidResult(what.into()).into());
        }

        // 3. Settle the fee
        tx.store.delete_request(&request)?;
        if result.is_success() {
            self.settle_request_fee(tx, &request)?;
        } else {
            self.refund_request_fee(tx, &request)?;
        }

        // 4. Record the response and see whether the round is done
        let code = result.code;
        tx.store.set_response(&Response {
            request_id,
            request_context_id: ctx.id,
            batch_counter: request.batch_counter,
            provider,
            consumer: request.consumer,
            result,
            output,
        })?;
        ctx.responded_count += 1;

        info!(request = %request_id, provider = %provider, code, "response received");
        tx.emit(ServiceEvent::ResponseReceived {
            request_id,
            provider,
            code,
        });

        self.check_round(tx, &mut ctx)?;
        tx.store.set_request_context(&ctx)?;
        Ok(())
    }
}
