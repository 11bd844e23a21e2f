use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;

mod binding;
mod container;
mod coordinator;
mod executor;
mod gateway;
mod lifecycle_error;
mod opts;
mod script_gateway;
mod settings;
mod status;

pub use binding::{BindingState, NetworkBinding, IP_FIELD};
pub use container::{generate_name, Container, ContainerState};
pub use coordinator::LifecycleCoordinator;
pub use executor::Executor;
pub use gateway::{GatewayError, NetworkGateway, RuntimeGateway};
pub use lifecycle_error::{LifecycleError, Operation};
pub use opts::{Action, Opts};
pub use script_gateway::ScriptGateway;
pub use settings::{Info, Scripts, Settings, Timeouts};
pub use status::{MalformedStatusLine, StatusRecord};

pub fn run(opts: Opts) -> anyhow::Result<()> {
    // Load the settings and build the gateways they describe.
    let settings = Settings::new(&opts.config)
        .with_context(|| format!("failed to load settings from {}", opts.config.display()))?;
    let gateway = Arc::new(ScriptGateway::new(&settings)?);
    let coordinator = LifecycleCoordinator::new(gateway.clone(), gateway.clone());

    match opts.action {
        Action::Up { name, network } => {
            let name = name.unwrap_or_else(generate_name);
            let container = up(&coordinator, &name, &network)?;
            println!("{}", container.ip().unwrap_or_default());
        }
        Action::Cycle { name, network } => {
            let name = name.unwrap_or_else(generate_name);
            up(&coordinator, &name, &network)?;

            let record = step(format!("querying `{}`", name), || {
                coordinator.query_status(&name)
            })?;
            print!("{}", record);

            step(format!("detaching `{}` from `{}`", name, network), || {
                coordinator.detach_network(&name)
            })?;
            step(format!("deleting container `{}`", name), || {
                coordinator.delete(&name)
            })?;
        }
        Action::Status { name } => {
            let text = gateway.info(&name)?;
            let record = StatusRecord::parse(&text)
                .with_context(|| format!("malformed status for container `{}`", name))?;
            print!("{}", record);
        }
    }

    Ok(())
}

fn up(coordinator: &LifecycleCoordinator, name: &str, network: &str) -> anyhow::Result<Container> {
    step(format!("creating container `{}`", name), || {
        coordinator.create(name)
    })?;

    step(format!("attaching `{}` to `{}`", name, network), || {
        coordinator.attach_network(name, network)
    })
}

/// Runs one coordinator operation, reporting progress on stdout.
fn step<T, F>(label: impl Display, operation: F) -> anyhow::Result<T>
where
    F: FnOnce() -> Result<T, LifecycleError>,
{
    print!("=> {}... ", label);
    io::stdout().flush()?;

    match operation() {
        Ok(value) => {
            println!("done.");
            Ok(value)
        }
        Err(e) => {
            println!("failed.");
            Err(e.into())
        }
    }
}
