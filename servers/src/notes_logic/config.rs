use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use lib_notes::StoreConfig;
use lib_notes::connections::redis_url_from_parts;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "server_notes.conf";
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Where the buffer and durable tiers live.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Redis buffer and PostgreSQL archive.
    External,
    /// Both tiers in process memory; nothing survives a restart.
    Memory,
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Tiered note ingest server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "PORT", help = "Port to listen on for HTTP and WebSocket clients.")]
    pub port: Option<u16>,

    #[clap(long, env = "CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "FIRST_NAME", help = "Owner name; the namespace defaults to FULLSTACK_TASK_<name>.")]
    pub first_name: Option<String>,

    #[clap(long, env = "NAMESPACE", help = "Explicit namespace, overriding the one derived from FIRST_NAME.")]
    pub namespace: Option<String>,

    #[clap(long, env = "COMPACTION_THRESHOLD", help = "Buffer length above which the buffer is compacted.")]
    pub compaction_threshold: Option<usize>,

    #[clap(long, env = "BACKEND", value_enum, help = "Tier backend: external (Redis + PostgreSQL) or memory.")]
    pub backend: Option<Backend>,

    #[clap(long, env = "REDIS_URL", help = "Redis connection URL. Takes precedence over REDIS_HOST and friends.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "REDIS_HOST", help = "Redis host, used when REDIS_URL is not set.")]
    pub redis_host: Option<String>,

    #[clap(long, env = "REDIS_PORT", help = "Redis port.")]
    pub redis_port: Option<u16>,

    #[clap(long, env = "REDIS_USER", help = "Redis ACL user.")]
    pub redis_user: Option<String>,

    #[clap(long, env = "REDIS_PASS", help = "Redis password.")]
    pub redis_pass: Option<String>,

    #[clap(long, env = "DATABASE_URL", help = "PostgreSQL connection URL for the archive.")]
    pub database_url: Option<String>,

    #[clap(long, env = "DURABLE_TABLE", help = "Archive table name.")]
    pub durable_table: Option<String>,

    #[clap(long, env = "DB_POOL_SIZE", help = "Maximum pooled PostgreSQL connections.")]
    pub db_pool_size: Option<usize>,

    #[clap(long, env = "BROADCAST_CAPACITY", help = "Events buffered per live subscriber before it lags.")]
    pub broadcast_capacity: Option<usize>,

    #[clap(long, env = "LOG_DIR", help = "Directory for rolled log files. Console only when unset.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "LOG_LEVEL", help = "Default log filter when RUST_LOG is unset.")]
    pub log_level: Option<String>,

    #[clap(long, env = "FLUSH_ON_SHUTDOWN", help = "Compact the buffer into the archive before exiting.")]
    pub flush_on_shutdown: Option<bool>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            first_name: other.first_name.or(self.first_name),
            namespace: other.namespace.or(self.namespace),
            compaction_threshold: other.compaction_threshold.or(self.compaction_threshold),
            backend: other.backend.or(self.backend),
            redis_url: other.redis_url.or(self.redis_url),
            redis_host: other.redis_host.or(self.redis_host),
            redis_port: other.redis_port.or(self.redis_port),
            redis_user: other.redis_user.or(self.redis_user),
            redis_pass: other.redis_pass.or(self.redis_pass),
            database_url: other.database_url.or(self.database_url),
            durable_table: other.durable_table.or(self.durable_table),
            db_pool_size: other.db_pool_size.or(self.db_pool_size),
            broadcast_capacity: other.broadcast_capacity.or(self.broadcast_capacity),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            flush_on_shutdown: other.flush_on_shutdown.or(self.flush_on_shutdown),
        }
    }

    fn defaults() -> Config {
        Config {
            port: Some(4000),
            first_name: Some("User".to_string()),
            compaction_threshold: Some(lib_notes::DEFAULT_THRESHOLD),
            backend: Some(Backend::External),
            redis_port: Some(DEFAULT_REDIS_PORT),
            durable_table: Some("records".to_string()),
            db_pool_size: Some(8),
            broadcast_capacity: Some(lib_notes::fanout::DEFAULT_CAPACITY),
            log_level: Some("info".to_string()),
            flush_on_shutdown: Some(false),
            ..Default::default()
        }
    }
}

/// Layers configuration: built-in defaults, then the JSON config file (if
/// present), then `cli` (which already carries environment variables).
pub fn load_config(cli: Config) -> Result<Config> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path)? {
        current_config = current_config.merge(file_config);
    }
    Ok(current_config.merge(cli))
}

fn read_config_file(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file_config = serde_json::from_str::<Config>(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(Some(file_config))
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub store: StoreConfig,
    pub backend: Backend,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    pub durable_table: String,
    pub db_pool_size: usize,
    pub broadcast_capacity: usize,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub flush_on_shutdown: bool,
}

impl Settings {
    /// Fills gaps from the defaults and rejects unusable combinations.
    pub fn resolve(config: Config) -> Result<Settings> {
        let config = Config::defaults().merge(config);

        let namespace = match (&config.namespace, &config.first_name) {
            (Some(namespace), _) => namespace.clone(),
            (None, Some(first_name)) => StoreConfig::namespace_for(first_name),
            (None, None) => StoreConfig::namespace_for("User"),
        };
        let threshold = config
            .compaction_threshold
            .unwrap_or(lib_notes::DEFAULT_THRESHOLD);
        let store = StoreConfig::new(namespace, threshold).context("Invalid store configuration")?;

        let redis_url = match (&config.redis_url, &config.redis_host) {
            (Some(url), _) => Some(url.clone()),
            (None, Some(host)) => Some(
                redis_url_from_parts(
                    host,
                    config.redis_port.unwrap_or(DEFAULT_REDIS_PORT),
                    config.redis_user.as_deref(),
                    config.redis_pass.as_deref(),
                )
                .context("Invalid Redis host settings")?,
            ),
            (None, None) => None,
        };

        let backend = config.backend.unwrap_or(Backend::External);
        if backend == Backend::External {
            if redis_url.is_none() {
                bail!("External backend needs REDIS_URL or REDIS_HOST");
            }
            if config.database_url.is_none() {
                bail!("External backend needs DATABASE_URL");
            }
        }

        Ok(Settings {
            port: config.port.unwrap_or(4000),
            store,
            backend,
            redis_url,
            database_url: config.database_url,
            durable_table: config.durable_table.unwrap_or_else(|| "records".to_string()),
            db_pool_size: config.db_pool_size.unwrap_or(8),
            broadcast_capacity: config
                .broadcast_capacity
                .unwrap_or(lib_notes::fanout::DEFAULT_CAPACITY),
            log_dir: config.log_dir,
            log_level: config.log_level.unwrap_or_else(|| "info".to_string()),
            flush_on_shutdown: config.flush_on_shutdown.unwrap_or(false),
        })
    }
}
