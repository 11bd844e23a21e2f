use std::io;
use std::time::Duration;

use thiserror::Error;

/// Creates, deletes and inspects containers.
pub trait RuntimeGateway: Send + Sync {
    fn create(&self, name: &str) -> Result<(), GatewayError>;

    fn delete(&self, name: &str) -> Result<(), GatewayError>;

    /// Returns the raw `key: value` status text of the container.
    fn info(&self, name: &str) -> Result<String, GatewayError>;
}

/// Connects containers to, and disconnects them from, logical networks.
pub trait NetworkGateway: Send + Sync {
    fn attach(&self, name: &str, network: &str) -> Result<(), GatewayError>;

    fn detach(&self, name: &str, network: &str) -> Result<(), GatewayError>;
}

/// Failure reported by a gateway call.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The collaborator could not be started at all.
    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for `{command}`")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The collaborator ran and rejected the request.
    #[error("`{command}` {}: {}", describe_exit(.code), .output.trim_end())]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("`{command}` did not finish within {after:?}")]
    Timeout { command: String, after: Duration },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_message_includes_exit_status_and_output() {
        let err = GatewayError::Failed {
            command: "sh lxc-create.sh t".to_owned(),
            code: Some(2),
            output: "lxc-create: t: already exists\n".to_owned(),
        };

        assert_eq!(
            err.to_string(),
            "`sh lxc-create.sh t` exited with status 2: lxc-create: t: already exists"
        );
    }

    #[test]
    fn failed_message_without_exit_code() {
        let err = GatewayError::Failed {
            command: "lxc-info -n t".to_owned(),
            code: None,
            output: String::new(),
        };

        assert_eq!(err.to_string(), "`lxc-info -n t` was terminated by a signal: ");
    }
}
