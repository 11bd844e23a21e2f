use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::executor::Executor;
use crate::gateway::{GatewayError, NetworkGateway, RuntimeGateway};
use crate::settings::Settings;

/// Gateway backed by the container lifecycle shell scripts and the
/// container-info command.
#[derive(Debug, Clone)]
pub struct ScriptGateway {
    shell: String,
    create: PathBuf,
    delete: PathBuf,
    attach: PathBuf,
    detach: PathBuf,
    info_program: String,
    info_args: Vec<String>,
    scripts: Executor,
    info: Executor,
}

impl ScriptGateway {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let scripts = &settings.scripts;
        let (info_program, info_args) = settings
            .info
            .command
            .split_first()
            .context("the container-info command is empty")?;

        Ok(Self {
            shell: scripts.shell.clone(),
            create: scripts.path(&scripts.create),
            delete: scripts.path(&scripts.delete),
            attach: scripts.path(&scripts.attach),
            detach: scripts.path(&scripts.detach),
            info_program: info_program.clone(),
            info_args: info_args.to_vec(),
            scripts: Executor::new(settings.timeouts.script()),
            info: Executor::new(settings.timeouts.info()),
        })
    }

    fn run_script(&self, script: &Path, args: &[&str]) -> Result<(), GatewayError> {
        let mut argv = vec![script.as_os_str()];
        argv.extend(args.iter().map(OsStr::new));

        self.scripts.run(&self.shell, &argv)?;

        Ok(())
    }
}

impl RuntimeGateway for ScriptGateway {
    fn create(&self, name: &str) -> Result<(), GatewayError> {
        self.run_script(&self.create, &[name])
    }

    fn delete(&self, name: &str) -> Result<(), GatewayError> {
        self.run_script(&self.delete, &[name])
    }

    fn info(&self, name: &str) -> Result<String, GatewayError> {
        let mut argv: Vec<&str> = self.info_args.iter().map(String::as_str).collect();
        argv.push(name);

        self.info.run(&self.info_program, &argv)
    }
}

impl NetworkGateway for ScriptGateway {
    fn attach(&self, name: &str, network: &str) -> Result<(), GatewayError> {
        self.run_script(&self.attach, &[name, network])
    }

    fn detach(&self, name: &str, network: &str) -> Result<(), GatewayError> {
        self.run_script(&self.detach, &[name, network])
    }
}
