use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde_derive::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Scripts {
    pub shell: String,
    pub dir: PathBuf,
    pub create: String,
    pub delete: String,
    pub attach: String,
    pub detach: String,
}

impl Scripts {
    pub fn path(&self, script: &str) -> PathBuf {
        self.dir.join(script)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    /// Container-info command; the container name is appended to it.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    pub script_secs: u64,
    pub info_secs: u64,
}

impl Timeouts {
    pub fn script(&self) -> Duration {
        Duration::from_secs(self.script_secs)
    }

    pub fn info(&self) -> Duration {
        Duration::from_secs(self.info_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub scripts: Scripts,
    pub info: Info,
    pub timeouts: Timeouts,
}

impl Settings {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Start off with the built-in defaults.
            .set_default("scripts.shell", "sh")?
            .set_default("scripts.dir", "/opt/calico-for-lxc")?
            .set_default("scripts.create", "lxc-create.sh")?
            .set_default("scripts.delete", "lxc-delete.sh")?
            .set_default("scripts.attach", "lxc-attach-calico.sh")?
            .set_default("scripts.detach", "lxc-detach-calico.sh")?
            .set_default("info.command", vec!["sudo", "lxc-info", "-n"])?
            .set_default("timeouts.script_secs", 120_i64)?
            .set_default("timeouts.info_secs", 10_i64)?
            // Merge in the configuration file, if there is one.
            .add_source(File::from(path).required(false))
            // Add in settings from the environment (with a prefix of NETCTL).
            // Eg.. `NETCTL_TIMEOUTS__SCRIPT_SECS=30` sets `timeouts.script_secs`.
            .add_source(
                Environment::with_prefix("NETCTL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        // Deserialize (and thus freeze) the entire configuration.
        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new(&dir.path().join("missing.toml")).unwrap();

        assert_eq!(settings.scripts.shell, "sh");
        assert_eq!(
            settings.scripts.path(&settings.scripts.attach),
            PathBuf::from("/opt/calico-for-lxc/lxc-attach-calico.sh")
        );
        assert_eq!(settings.info.command, ["sudo", "lxc-info", "-n"]);
        assert_eq!(settings.timeouts.script(), Duration::from_secs(120));
        assert_eq!(settings.timeouts.info(), Duration::from_secs(10));
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netctl.toml");
        fs::write(
            &path,
            "[scripts]\ndir = \"/srv/scripts\"\n\n[info]\ncommand = [\"lxc-info\", \"-n\"]\n\n[timeouts]\ninfo_secs = 3\n",
        )
        .unwrap();

        let settings = Settings::new(&path).unwrap();

        assert_eq!(settings.scripts.dir, PathBuf::from("/srv/scripts"));
        assert_eq!(settings.scripts.create, "lxc-create.sh");
        assert_eq!(settings.info.command, ["lxc-info", "-n"]);
        assert_eq!(settings.timeouts.info_secs, 3);
        assert_eq!(settings.timeouts.script_secs, 120);
    }
}
