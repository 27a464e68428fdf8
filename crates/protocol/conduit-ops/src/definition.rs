//! Service definition operations.

use conduit_store::ServiceStore;
use conduit_types::ServiceDefinition;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::events::ServiceEvent;
use crate::keeper::{ServiceKeeper, TxContext};

impl ServiceKeeper {
    /// Register a new, immutable service definition.
    pub(crate) fn define_service(&self, tx: &mut TxContext<'_>, definition: ServiceDefinition) -> ServiceResult<()> {
        if tx.store.get_definition(&definition.name)?.is_some() {
            return Err(ServiceError::DefinitionExists(definition.name));
        }

        tx.store.set_definition(&definition)?;
        info!(service = %definition.name, author = %definition.author, "service defined");

        tx.emit(ServiceEvent::ServiceDefined {
            service_name: definition.name,
            author: definition.author,
        });
        Ok(())
    }
}
