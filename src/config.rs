//! Configuration.
//!
//! ```toml
//! period_secs = 60
//! devices = ["gpfs1", "gpfs2"]   # or ["all"] to enumerate with mmlsfs
//! timeout_secs = 30
//!
//! [commands]
//! mmrepquota = "/usr/lpp/mmfs/bin/mmrepquota"
//!
//! [polls]
//! fileset = false
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::parse::Command;

/// Device list entry that stands for every device of the cluster.
pub const ALL_DEVICES: &str = "all";

/// Poller configuration.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Poll interval in seconds.
    pub period_secs: u64,

    /// Devices to poll, see [`ALL_DEVICES`].
    pub devices: Vec<String>,

    /// Per-command timeout in seconds.
    pub timeout_secs: u64,

    /// Executables.
    pub commands: Commands,

    /// Enabled polls.
    pub polls: Polls,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period_secs: 60,
            devices: vec![ALL_DEVICES.into()],
            timeout_secs: 30,
            commands: Commands::default(),
            polls: Polls::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or parsing the file fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;

        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config file: {}", path.display()))?;

        Ok(config)
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Returns the per-command timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns `true` if devices need to be enumerated.
    #[must_use]
    pub fn all_devices(&self) -> bool {
        self.devices.iter().any(|device| device == ALL_DEVICES)
    }
}

/// Executables of the `mm*` commands.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Commands {
    /// `mmrepquota`
    pub mmrepquota: String,

    /// `mmlsfs`
    pub mmlsfs: String,

    /// `mmdf`
    pub mmdf: String,

    /// `mmlsfileset`
    pub mmlsfileset: String,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            mmrepquota: Command::RepQuota.tag().into(),
            mmlsfs: Command::LsFs.tag().into(),
            mmdf: Command::Df.tag().into(),
            mmlsfileset: Command::LsFileset.tag().into(),
        }
    }
}

impl Commands {
    /// Returns the executable of `command`.
    #[must_use]
    pub fn program(&self, command: Command) -> &str {
        match command {
            Command::RepQuota => &self.mmrepquota,
            Command::LsFs => &self.mmlsfs,
            Command::Df => &self.mmdf,
            Command::LsFileset => &self.mmlsfileset,
        }
    }
}

/// Which per-device polls run every cycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Polls {
    /// Poll `mmrepquota`.
    pub quota: bool,

    /// Poll `mmdf`.
    pub df: bool,

    /// Poll `mmlsfileset`.
    pub fileset: bool,
}

impl Default for Polls {
    fn default() -> Self {
        Self {
            quota: true,
            df: true,
            fileset: true,
        }
    }
}

impl Polls {
    /// Returns the enabled per-device commands.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        [
            (self.quota, Command::RepQuota),
            (self.df, Command::Df),
            (self.fileset, Command::LsFileset),
        ]
        .into_iter()
        .filter_map(|(enabled, command)| enabled.then_some(command))
        .collect()
    }
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------
