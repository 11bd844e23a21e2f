use scopeguard::ScopeGuard;
use tracing::{debug, info, warn};

use crate::container::{Container, ContainerState};
use crate::coordinator;
use crate::gateway::{NetworkGateway, RuntimeGateway};
use crate::lifecycle_error::{LifecycleError, Operation};

/// Status field carrying the address assigned by the network.
pub const IP_FIELD: &str = "IP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Bound,
    Unbound,
}

/// The association between a container and the logical network it was
/// last attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBinding {
    network: String,
    state: BindingState,
}

impl NetworkBinding {
    pub(crate) fn bound(network: &str) -> Self {
        Self {
            network: network.to_owned(),
            state: BindingState::Bound,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: BindingState) {
        self.state = state;
    }

    /// Attaches `container` to `network` and records the address it was given.
    ///
    /// `container` is only modified once both the attach and the address
    /// lookup have succeeded. A lookup failure detaches the network again.
    pub fn bind(
        container: &mut Container,
        network: &str,
        runtime: &dyn RuntimeGateway,
        gateway: &dyn NetworkGateway,
    ) -> Result<(), LifecycleError> {
        if !matches!(
            container.state(),
            ContainerState::Created | ContainerState::Detached
        ) {
            return Err(LifecycleError::rejected(container, Operation::Attach));
        }
        let name = container.name().to_owned();

        debug!(name = %name, network, "attaching container");
        gateway
            .attach(&name, network)
            .map_err(|source| LifecycleError::gateway(&name, Operation::Attach, source))?;

        // Undo the attach unless the address resolves.
        let rollback = scopeguard::guard((), |()| {
            if let Err(e) = gateway.detach(&name, network) {
                warn!(name = %name, network, error = %e, "failed to roll back attach");
            }
        });
        let ip = resolve_address(&name, runtime)?;
        ScopeGuard::into_inner(rollback);

        info!(name = %name, network, ip = %ip, "container attached");
        container.attached(Self::bound(network), ip);

        Ok(())
    }

    /// Detaches `container` from the network it is bound to.
    pub fn unbind(
        container: &mut Container,
        gateway: &dyn NetworkGateway,
    ) -> Result<(), LifecycleError> {
        let network = match container.binding() {
            Some(binding) if binding.state == BindingState::Bound => binding.network.clone(),
            _ => return Err(LifecycleError::rejected(container, Operation::Detach)),
        };
        let name = container.name().to_owned();

        debug!(name = %name, network = %network, "detaching container");
        gateway
            .detach(&name, &network)
            .map_err(|source| LifecycleError::gateway(&name, Operation::Detach, source))?;

        info!(name = %name, network = %network, "container detached");
        container.detached();

        Ok(())
    }
}

fn resolve_address(name: &str, runtime: &dyn RuntimeGateway) -> Result<String, LifecycleError> {
    let record = coordinator::query_status(name, runtime)?;

    // An empty value means no address has been assigned yet.
    record
        .get(IP_FIELD)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| LifecycleError::MissingField {
            name: name.to_owned(),
            field: IP_FIELD.to_owned(),
        })
}
