use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::container::{Container, ContainerState};
use crate::gateway::GatewayError;
use crate::status::MalformedStatusLine;

/// Operations the coordinator performs on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Attach,
    Detach,
    Delete,
    Query,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::Delete => "delete",
            Self::Query => "query",
        };

        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("container name must not be empty")]
    InvalidName,

    #[error("container `{name}` already exists ({state})")]
    DuplicateName { name: String, state: ContainerState },

    #[error("cannot {operation} container `{name}` while it is {state}")]
    InvalidState {
        name: String,
        operation: Operation,
        state: ContainerState,
    },

    #[error("container `{name}` has been deleted")]
    AlreadyDeleted { name: String },

    #[error("failed to create container `{name}`")]
    CreateFailed {
        name: String,
        #[source]
        source: GatewayError,
    },

    #[error("failed to attach container `{name}` to its network")]
    AttachFailed {
        name: String,
        #[source]
        source: GatewayError,
    },

    #[error("failed to detach container `{name}` from its network")]
    DetachFailed {
        name: String,
        #[source]
        source: GatewayError,
    },

    #[error("{operation} of container `{name}` failed")]
    Runtime {
        name: String,
        operation: Operation,
        #[source]
        source: GatewayError,
    },

    #[error("{operation} of container `{name}` timed out after {after:?}")]
    CollaboratorTimeout {
        name: String,
        operation: Operation,
        after: Duration,
        #[source]
        source: GatewayError,
    },

    #[error("status of container `{name}` is malformed")]
    MalformedStatusLine {
        name: String,
        #[source]
        source: MalformedStatusLine,
    },

    #[error("status of container `{name}` has no `{field}` field")]
    MissingField { name: String, field: String },
}

impl LifecycleError {
    /// Maps a failed gateway call made during `operation` on `name`.
    pub(crate) fn gateway(name: &str, operation: Operation, source: GatewayError) -> Self {
        let name = name.to_owned();
        if let GatewayError::Timeout { after, .. } = source {
            return Self::CollaboratorTimeout {
                name,
                operation,
                after,
                source,
            };
        }

        match (operation, source) {
            (Operation::Create, source) => Self::CreateFailed { name, source },
            (Operation::Attach, source) => Self::AttachFailed { name, source },
            (Operation::Detach, source) => Self::DetachFailed { name, source },
            (operation, source) => Self::Runtime {
                name,
                operation,
                source,
            },
        }
    }

    /// Rejects `operation` on a container whose state does not allow it.
    pub(crate) fn rejected(container: &Container, operation: Operation) -> Self {
        match container.state() {
            ContainerState::Deleted => Self::AlreadyDeleted {
                name: container.name().to_owned(),
            },
            state => Self::InvalidState {
                name: container.name().to_owned(),
                operation,
                state,
            },
        }
    }

    /// Whether the failure came from a collaborator rather than from the
    /// caller's request, so that trying again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed { .. }
                | Self::AttachFailed { .. }
                | Self::DetachFailed { .. }
                | Self::Runtime { .. }
                | Self::CollaboratorTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection() -> GatewayError {
        GatewayError::Failed {
            command: "sh lxc-attach-calico.sh t frontend".to_owned(),
            code: Some(1),
            output: String::new(),
        }
    }

    #[test]
    fn timeouts_map_to_collaborator_timeout_for_every_operation() {
        for operation in [
            Operation::Create,
            Operation::Attach,
            Operation::Detach,
            Operation::Delete,
            Operation::Query,
        ] {
            let source = GatewayError::Timeout {
                command: "sh script.sh t".to_owned(),
                after: Duration::from_secs(3),
            };
            let err = LifecycleError::gateway("t", operation, source);

            assert!(matches!(
                err,
                LifecycleError::CollaboratorTimeout { operation: op, after, .. }
                    if op == operation && after == Duration::from_secs(3)
            ));
            assert!(err.is_retryable());
            let source = std::error::Error::source(&err).map(ToString::to_string);
            assert_eq!(
                source.as_deref(),
                Some("`sh script.sh t` did not finish within 3s")
            );
        }
    }

    #[test]
    fn rejections_map_per_operation() {
        assert!(matches!(
            LifecycleError::gateway("t", Operation::Create, rejection()),
            LifecycleError::CreateFailed { .. }
        ));
        assert!(matches!(
            LifecycleError::gateway("t", Operation::Attach, rejection()),
            LifecycleError::AttachFailed { .. }
        ));
        assert!(matches!(
            LifecycleError::gateway("t", Operation::Detach, rejection()),
            LifecycleError::DetachFailed { .. }
        ));
        assert!(matches!(
            LifecycleError::gateway("t", Operation::Delete, rejection()),
            LifecycleError::Runtime { operation: Operation::Delete, .. }
        ));
    }

    #[test]
    fn state_errors_are_not_retryable() {
        let err = LifecycleError::InvalidState {
            name: "t".to_owned(),
            operation: Operation::Delete,
            state: ContainerState::Attached,
        };

        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "cannot delete container `t` while it is attached");
    }

    #[test]
    fn source_chain_reaches_gateway_error() {
        let err = LifecycleError::gateway("t", Operation::Attach, rejection());
        let source = std::error::Error::source(&err).map(ToString::to_string);

        assert_eq!(
            source.as_deref(),
            Some("`sh lxc-attach-calico.sh t frontend` exited with status 1: ")
        );
    }
}
