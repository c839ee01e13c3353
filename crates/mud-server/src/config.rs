//! `ServerConfig`: the env/file-driven settings surface named in §6,
//! loaded with the `config` crate layered over sane defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

fn default_bind() -> SocketAddr {
    "0.0.0.0:4242".parse().unwrap()
}

fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Global RNG seed — every entity's per-tick RNG derives from this via
    /// `EntityRng::new`, so a fixed seed makes a whole run replayable.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Unix epoch seconds the in-game night clock starts counting from.
    #[serde(default)]
    pub epoch_start_secs: f64,

    /// Permits the first line of a connection to stand in as an owner id
    /// instead of a real OAuth handshake (§10 escape hatch) — local/dev
    /// only, never set in a real deployment.
    #[serde(default)]
    pub allow_local_auth: bool,

    /// Path to a SQLite database file. Present only when built with the
    /// `sqlite` feature; absent, persistence falls back to in-memory.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ServerConfig {
    /// Layer environment variables (prefix `MUD_`, e.g. `MUD_BIND`,
    /// `MUD_SEED`) over an optional config file, then over the struct's
    /// own `serde(default)`s.
    pub fn load(config_path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MUD").try_parsing(true).separator("__"),
        );
        let raw = builder.build()?;
        Ok(raw.try_deserialize::<PartialServerConfig>()?.into_full())
    }
}

/// Every field optional so an empty environment and no file still parses;
/// `into_full` then applies the same defaults `ServerConfig`'s own derive
/// would, since `config`'s layering happens before serde defaults apply.
#[derive(Debug, Default, Deserialize)]
struct PartialServerConfig {
    bind: Option<SocketAddr>,
    seed: Option<u64>,
    epoch_start_secs: Option<f64>,
    allow_local_auth: Option<bool>,
    sqlite_path: Option<PathBuf>,
    log_level: Option<String>,
}

impl PartialServerConfig {
    fn into_full(self) -> ServerConfig {
        ServerConfig {
            bind: self.bind.unwrap_or_else(default_bind),
            seed: self.seed.unwrap_or_else(default_seed),
            epoch_start_secs: self.epoch_start_secs.unwrap_or(0.0),
            allow_local_auth: self.allow_local_auth.unwrap_or(false),
            sqlite_path: self.sqlite_path,
            log_level: self.log_level.unwrap_or_else(default_log_level),
        }
    }
}
