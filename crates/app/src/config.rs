//! Command-line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

/// Learning record service.
#[derive(Debug, Parser)]
#[command(name = "app", version, about = "Learning record HTTP service", long_about = None)]
pub struct Cli {
    /// SQLite database URL or file path
    #[arg(long = "db", env = "LEARN_DB_URL", global = true, default_value = "sqlite://dev.sqlite3")]
    pub db_url: String,

    /// Subcommand (serves HTTP when omitted)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Load catalog reference rows from a JSON file
    Seed(SeedArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "LEARN_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "LEARN_PORT", default_value_t = 3000)]
    pub port: u16,
}

impl Default for ServeArgs {
    /// Bare invocation still honours `LEARN_HOST` and `LEARN_PORT`.
    fn default() -> Self {
        Self {
            host: std::env::var("LEARN_HOST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(IpAddr::from([127, 0, 0, 1])),
            port: std::env::var("LEARN_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl ServeArgs {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Args)]
pub struct SeedArgs {
    /// Catalog JSON document
    #[arg(long, env = "LEARN_CATALOG")]
    pub catalog: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid --db value: {0}")]
    InvalidDbUrl(String),
    #[error("failed to prepare database file: {0}")]
    Io(#[from] std::io::Error),
}

impl Cli {
    /// The command to run, `serve` with defaults when none was given.
    #[must_use]
    pub fn resolved_command(&self) -> Command {
        match &self.command {
            Some(Command::Serve(args)) => Command::Serve(args.clone()),
            Some(Command::Seed(args)) => Command::Seed(args.clone()),
            None => Command::Serve(ServeArgs::default()),
        }
    }

    /// The database URL as an absolute `sqlite://` URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDbUrl` for blank input.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if self.db_url.trim().is_empty() {
            return Err(ConfigError::InvalidDbUrl(self.db_url.clone()));
        }
        Ok(normalize_sqlite_url(&self.db_url))
    }
}

/// Turn `sqlite:relative.db` or a bare path into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite:file:")
        || trimmed.starts_with("sqlite:///")
    {
        return trimmed.to_string();
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories on first use.
///
/// # Errors
///
/// Returns `ConfigError` if the URL has no path or the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ConfigError> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl(db_url.to_string()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl(db_url.to_string()));
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/dev.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/dev.sqlite3"));

        let bare = normalize_sqlite_url("dev.sqlite3");
        assert!(bare.starts_with("sqlite:///"));
    }

    #[test]
    fn memory_and_absolute_urls_pass_through() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/learn.db"),
            "sqlite:///tmp/learn.db"
        );
    }

    #[test]
    fn missing_subcommand_serves_on_defaults() {
        let cli = Cli::parse_from(["app", "--db", "sqlite::memory:"]);
        match cli.resolved_command() {
            Command::Serve(args) => assert_eq!(args.addr().port(), 3000),
            Command::Seed(_) => panic!("expected serve"),
        }
    }

    #[test]
    fn seed_takes_a_catalog_path() {
        let cli = Cli::parse_from(["app", "seed", "--catalog", "demos/catalog.json"]);
        match cli.resolved_command() {
            Command::Seed(args) => assert_eq!(args.catalog, PathBuf::from("demos/catalog.json")),
            Command::Serve(_) => panic!("expected seed"),
        }
    }

    #[test]
    fn prepare_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested/learn.sqlite3");
        let url = format!("sqlite://{}", file.display());
        prepare_sqlite_file(&url).unwrap();
        assert!(file.exists());
    }
}
