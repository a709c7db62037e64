//! Layered server configuration: CLI flags override environment variables
//! override an optional TOML file override [`DbConfig::default`].

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use emberdb_core::{DbConfig, EvictionPolicy, FlushPolicy};
use serde::Deserialize;

/// Command-line arguments. Every field is optional so that "not passed on
/// the command line" is distinguishable from "passed with a default value" --
/// the env/file/default layers below only apply where the CLI left a gap.
#[derive(Parser, Debug, Default)]
#[command(name = "emberdb-server", about = "emberdb keyspace server")]
pub struct Cli {
    /// Path to an optional TOML config file.
    #[arg(long, env = "EMBERDB_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "EMBERDB_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "EMBERDB_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "EMBERDB_AOF_PATH")]
    pub aof_path: Option<PathBuf>,

    #[arg(long, env = "EMBERDB_MAX_SEG_SIZE")]
    pub max_seg_size: Option<u64>,

    #[arg(long, env = "EMBERDB_MAX_ZIPLIST_SIZE")]
    pub max_ziplist_size: Option<u64>,

    #[arg(long, env = "EMBERDB_MAX_INTSET_LENGTH")]
    pub max_intset_length: Option<usize>,

    #[arg(long, env = "EMBERDB_EVICTER_POLICY")]
    pub evicter_policy: Option<String>,
}

/// Mirror of [`DbConfig`] with every field optional, for TOML file overlay.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    aof_path: Option<PathBuf>,
    max_seg_size: Option<u64>,
    max_ziplist_size: Option<u64>,
    max_intset_length: Option<usize>,
    evicter_policy: Option<String>,
}

fn parse_eviction_policy(name: &str) -> anyhow::Result<EvictionPolicy> {
    match name {
        "noeviction" => Ok(EvictionPolicy::NoEviction),
        "allkeys-random" => Ok(EvictionPolicy::AllKeysRandom),
        "allkeys-lru" => Ok(EvictionPolicy::AllKeysLru),
        "volatile-random" => Ok(EvictionPolicy::VolatileRandom),
        "volatile-lru" => Ok(EvictionPolicy::VolatileLru),
        other => anyhow::bail!("unknown eviction policy: {other}"),
    }
}

/// Server-level configuration: a resolved [`DbConfig`] plus whatever the
/// HTTP layer itself needs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
}

impl ServerConfig {
    /// Resolves layered configuration: struct defaults, then an optional
    /// TOML file, then environment variables, then explicit CLI flags --
    /// each layer only fills in fields the previous layer left unset.
    pub fn resolve(cli: Cli) -> anyhow::Result<Self> {
        let mut db = DbConfig { flush_policy: FlushPolicy::EveryWrite, ..DbConfig::default() };

        if let Some(path) = &cli.config {
            apply_file(&mut db, path)?;
        }

        if let Some(host) = cli.host {
            db.host = host;
        }
        if let Some(port) = cli.port {
            db.port = port;
        }
        if let Some(aof_path) = cli.aof_path {
            db.aof_path = aof_path;
        }
        if let Some(max_seg_size) = cli.max_seg_size {
            db.max_seg_size = max_seg_size;
        }
        if let Some(max_ziplist_size) = cli.max_ziplist_size {
            db.max_ziplist_size = max_ziplist_size;
        }
        if let Some(max_intset_length) = cli.max_intset_length {
            db.max_intset_length = max_intset_length;
        }
        if let Some(policy) = &cli.evicter_policy {
            db.evicter_policy = parse_eviction_policy(policy)?;
        }

        Ok(ServerConfig { db })
    }
}

fn apply_file(db: &mut DbConfig, path: &Path) -> anyhow::Result<()> {
    let contents = fs::read_to_string(path)?;
    let file: FileConfig = toml::from_str(&contents)?;
    if let Some(host) = file.host {
        db.host = host;
    }
    if let Some(port) = file.port {
        db.port = port;
    }
    if let Some(aof_path) = file.aof_path {
        db.aof_path = aof_path;
    }
    if let Some(max_seg_size) = file.max_seg_size {
        db.max_seg_size = max_seg_size;
    }
    if let Some(max_ziplist_size) = file.max_ziplist_size {
        db.max_ziplist_size = max_ziplist_size;
    }
    if let Some(max_intset_length) = file.max_intset_length {
        db.max_intset_length = max_intset_length;
    }
    if let Some(policy) = &file.evicter_policy {
        db.evicter_policy = parse_eviction_policy(policy)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_no_overrides_matches_db_defaults() {
        let resolved = ServerConfig::resolve(Cli::default()).unwrap();
        assert_eq!(resolved.db.host, DbConfig::default().host);
        assert_eq!(resolved.db.port, DbConfig::default().port);
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli { port: Some(9999), ..Cli::default() };
        let resolved = ServerConfig::resolve(cli).unwrap();
        assert_eq!(resolved.db.port, 9999);
    }

    #[test]
    fn file_overlay_applies_then_cli_overrides_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emberdb.toml");
        fs::write(&path, "port = 7000\nhost = \"file-host\"\n").unwrap();

        let cli = Cli { config: Some(path), port: Some(8123), ..Cli::default() };
        let resolved = ServerConfig::resolve(cli).unwrap();
        assert_eq!(resolved.db.host, "file-host");
        assert_eq!(resolved.db.port, 8123);
    }

    #[test]
    fn unknown_eviction_policy_name_errors() {
        let cli = Cli { evicter_policy: Some("bogus".to_string()), ..Cli::default() };
        assert!(ServerConfig::resolve(cli).is_err());
    }
}
