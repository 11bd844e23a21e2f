use std::fmt;

use uuid::fmt::Simple;
use uuid::Uuid;

use crate::binding::{BindingState, NetworkBinding};

const CONTAINER_NAME_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    Unprovisioned,
    Created,
    Attached,
    Detached,
    Deleted,
}

impl ContainerState {
    /// Whether a container in this state exists on the host.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Created | Self::Attached | Self::Detached)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unprovisioned => "unprovisioned",
            Self::Created => "created",
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Deleted => "deleted",
        };

        f.write_str(name)
    }
}

/// A container tracked by the coordinator.
///
/// Values handed out by the coordinator are snapshots; they are not updated
/// by later operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: String,
    state: ContainerState,
    ip: Option<String>,
    binding: Option<NetworkBinding>,
}

impl Container {
    pub(crate) fn created(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            state: ContainerState::Created,
            ip: None,
            binding: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    /// The assigned address, present only while attached.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn binding(&self) -> Option<&NetworkBinding> {
        self.binding.as_ref()
    }

    pub(crate) fn attached(&mut self, binding: NetworkBinding, ip: String) {
        self.state = ContainerState::Attached;
        self.binding = Some(binding);
        self.ip = Some(ip);
    }

    pub(crate) fn detached(&mut self) {
        self.state = ContainerState::Detached;
        self.ip = None;
        if let Some(binding) = &mut self.binding {
            binding.set_state(BindingState::Unbound);
        }
    }

    pub(crate) fn deleted(&mut self) {
        self.state = ContainerState::Deleted;
        self.ip = None;
        self.binding = None;
    }
}

/// Generates a short random container name.
pub fn generate_name() -> String {
    // Generate a UUID.
    let mut buf = [0; Simple::LENGTH];
    let uuid = Uuid::new_v4().simple().encode_lower(&mut buf);

    // Select the first 12 characters of the generated UUID.
    uuid[..CONTAINER_NAME_SIZE].to_owned()
}
