//! `fastkv` operator command line.
//!
//! Settings come from, in increasing priority: the `kv` section of the
//! `--config` yaml file, `FASTLY_API_TOKEN` / `FASTLY_KV_STORE_ID` from the
//! environment (or `.env`), and command line flags.
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use fastkv_cache::{CacheBackend, CacheError, FastlyKvCache, KvStoreConfig, TtlPolicy};
use fastkv_config::Configurable;
use serde_yaml::{Mapping, Value};
use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::error;

pub const EXIT_MISS: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "fastkv", version, about = "Talk to a Fastly KV store as a cache")]
pub struct Cli {
    /// Yaml file with a `kv` section
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "FASTLY_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    #[arg(long, env = "FASTLY_KV_STORE_ID")]
    pub store_id: Option<String>,

    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds, 0 disables it
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, value_enum)]
    pub ttl_policy: Option<TtlPolicyArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the raw value of a key
    Get { key: String },
    /// Store a value, `-` reads it from stdin
    Set {
        key: String,
        value: String,
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Store a value only if the key is not set yet
    Add {
        key: String,
        value: String,
        #[arg(long)]
        ttl: Option<u64>,
    },
    Delete { key: String },
    /// Always fails, the store cannot be cleared in one call
    Flush,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlPolicyArg {
    Ignore,
    Forward,
}

impl From<TtlPolicyArg> for TtlPolicy {
    fn from(arg: TtlPolicyArg) -> Self {
        match arg {
            TtlPolicyArg::Ignore => TtlPolicy::Ignore,
            TtlPolicyArg::Forward => TtlPolicy::Forward,
        }
    }
}

struct FileConfig {
    config: Value,
}

impl Configurable for FileConfig {
    fn config(&self) -> &Value {
        &self.config
    }
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, CacheError> {
        Ok(Self {
            config: Self::load_config(path)?,
        })
    }
}

impl Cli {
    /// Merge file, environment and flags into one validated store config.
    pub fn store_config(&self) -> Result<KvStoreConfig, CacheError> {
        let mut section = match &self.config {
            Some(path) => FileConfig::load(path)?
                .get_config_value("kv")
                .cloned()
                .unwrap_or_else(|| Value::Mapping(Mapping::new())),
            None => Value::Mapping(Mapping::new()),
        };

        let Value::Mapping(map) = &mut section else {
            return Err(CacheError::Configuration(
                "`kv` section must be a mapping".to_string(),
            ));
        };
        if let Some(api_token) = &self.api_token {
            map.insert("api_token".into(), api_token.as_str().into());
        }
        if let Some(store_id) = &self.store_id {
            map.insert("store_id".into(), store_id.as_str().into());
        }
        if let Some(base_url) = &self.base_url {
            map.insert("base_url".into(), base_url.as_str().into());
        }
        if let Some(timeout) = self.timeout {
            map.insert("timeout".into(), timeout.into());
        }

        let mut config = KvStoreConfig::from_yaml(&section)?;
        if let Some(policy) = self.ttl_policy {
            config.ttl_policy = policy.into();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run one command against `backend`, writing a fetched value to `out`.
///
/// Returns whether the operation hit / succeeded.
pub async fn execute(
    backend: &dyn CacheBackend,
    command: Command,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let ok = match command {
        Command::Get { key } => match backend.get(&key).await {
            Some(value) => {
                out.write_all(&value)?;
                out.flush()?;
                true
            }
            None => false,
        },
        Command::Set { key, value, ttl } => {
            backend.set(&key, read_value(value)?, ttl).await
        }
        Command::Add { key, value, ttl } => {
            backend.add_if_absent(&key, read_value(value)?, ttl).await
        }
        Command::Delete { key } => backend.delete(&key).await,
        Command::Flush => backend.flush().await,
    };
    Ok(ok)
}

fn read_value(value: String) -> io::Result<Bytes> {
    if value == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    } else {
        Ok(Bytes::from(value))
    }
}

pub async fn run(cli: Cli) -> ExitCode {
    let cache = match cli.store_config().and_then(FastlyKvCache::new) {
        Ok(cache) => cache,
        Err(err) => {
            error!("{err}");
            eprintln!("fastkv: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match execute(&cache, cli.command, &mut io::stdout()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_MISS),
        Err(err) => {
            eprintln!("fastkv: {err}");
            ExitCode::from(EXIT_MISS)
        }
    }
}
