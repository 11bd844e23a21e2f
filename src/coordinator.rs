use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::binding::NetworkBinding;
use crate::container::{Container, ContainerState};
use crate::gateway::{NetworkGateway, RuntimeGateway};
use crate::lifecycle_error::{LifecycleError, Operation};
use crate::status::StatusRecord;

/// Sequences container lifecycle operations against the runtime and network
/// gateways and tracks the resulting state of every container by name.
///
/// Operations on the same name are serialized; operations on different names
/// may run concurrently. A container's recorded state only changes after the
/// gateways confirm the operation.
pub struct LifecycleCoordinator {
    runtime: Arc<dyn RuntimeGateway>,
    network: Arc<dyn NetworkGateway>,
    containers: Mutex<HashMap<String, Container>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LifecycleCoordinator {
    pub fn new(runtime: Arc<dyn RuntimeGateway>, network: Arc<dyn NetworkGateway>) -> Self {
        Self {
            runtime,
            network,
            containers: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, name: &str) -> Result<Container, LifecycleError> {
        if name.is_empty() {
            return Err(LifecycleError::InvalidName);
        }

        let lock = self.name_lock(name);
        let _guard = lock.lock();

        // A deleted container's name may be reused.
        if let Some(existing) = self.containers.lock().get(name) {
            if existing.state().is_live() {
                return Err(LifecycleError::DuplicateName {
                    name: name.to_owned(),
                    state: existing.state(),
                });
            }
        }

        debug!(name, "creating container");
        self.runtime
            .create(name)
            .map_err(|source| LifecycleError::gateway(name, Operation::Create, source))?;

        let container = Container::created(name);
        self.containers
            .lock()
            .insert(name.to_owned(), container.clone());
        info!(name, "container created");

        Ok(container)
    }

    pub fn attach_network(&self, name: &str, network: &str) -> Result<Container, LifecycleError> {
        self.transition(name, Operation::Attach, |container| {
            NetworkBinding::bind(container, network, &*self.runtime, &*self.network)
        })
    }

    pub fn detach_network(&self, name: &str) -> Result<Container, LifecycleError> {
        self.transition(name, Operation::Detach, |container| {
            NetworkBinding::unbind(container, &*self.network)
        })
    }

    /// Deletes a created or detached container. Attached containers must be
    /// detached first.
    pub fn delete(&self, name: &str) -> Result<(), LifecycleError> {
        self.transition(name, Operation::Delete, |container| {
            if !matches!(
                container.state(),
                ContainerState::Created | ContainerState::Detached
            ) {
                return Err(LifecycleError::rejected(container, Operation::Delete));
            }

            debug!(name, "deleting container");
            self.runtime
                .delete(name)
                .map_err(|source| LifecycleError::gateway(name, Operation::Delete, source))?;

            info!(name, "container deleted");
            container.deleted();

            Ok(())
        })?;

        Ok(())
    }

    pub fn query_status(&self, name: &str) -> Result<StatusRecord, LifecycleError> {
        let lock = self.name_lock(name);
        let _guard = lock.lock();

        self.lookup(name, Operation::Query)?;
        query_status(name, &*self.runtime)
    }

    /// Returns a snapshot of the container recorded under `name`, deleted
    /// containers included.
    pub fn get(&self, name: &str) -> Option<Container> {
        self.containers.lock().get(name).cloned()
    }

    /// Applies `apply` to a copy of the live container and records the copy
    /// only if `apply` succeeds.
    fn transition<F>(
        &self,
        name: &str,
        operation: Operation,
        apply: F,
    ) -> Result<Container, LifecycleError>
    where
        F: FnOnce(&mut Container) -> Result<(), LifecycleError>,
    {
        let lock = self.name_lock(name);
        let _guard = lock.lock();

        let mut container = self.lookup(name, operation)?;
        apply(&mut container)?;
        self.containers
            .lock()
            .insert(name.to_owned(), container.clone());

        Ok(container)
    }

    fn lookup(&self, name: &str, operation: Operation) -> Result<Container, LifecycleError> {
        match self.containers.lock().get(name) {
            Some(container) if container.state() == ContainerState::Deleted => {
                Err(LifecycleError::rejected(container, operation))
            }
            Some(container) => Ok(container.clone()),
            None => Err(LifecycleError::InvalidState {
                name: name.to_owned(),
                operation,
                state: ContainerState::Unprovisioned,
            }),
        }
    }

    fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks.lock().entry(name.to_owned()).or_default().clone()
    }
}

/// Runs a container-info query and parses its output.
pub(crate) fn query_status(
    name: &str,
    runtime: &dyn RuntimeGateway,
) -> Result<StatusRecord, LifecycleError> {
    debug!(name, "querying container status");
    let text = runtime
        .info(name)
        .map_err(|source| LifecycleError::gateway(name, Operation::Query, source))?;

    StatusRecord::parse(&text).map_err(|source| LifecycleError::MalformedStatusLine {
        name: name.to_owned(),
        source,
    })
}
