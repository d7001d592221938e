//! Server configuration for `CredVault`.
//!
//! Loaded once at startup from `CREDVAULT_*` environment variables. Only the
//! server secret is mandatory; everything else has a default.

use std::net::SocketAddr;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `CREDVAULT_SECRET_KEY` is unset or blank.
    #[error("CREDVAULT_SECRET_KEY must be set to a non-empty value")]
    MissingSecret,

    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Secret the field encryption key is derived from.
    pub secret_key: String,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// How long a login session lasts.
    pub session_ttl_hours: i64,
    /// Seconds between expired-session sweeps.
    pub session_sweep_interval_secs: u64,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
    /// Mirror activity entries to this JSON-lines file.
    pub activity_file_path: Option<String>,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// `RocksDB` persistent storage.
    RocksDb { path: String },
}

const DEFAULT_PORT: u16 = 8000;

/// Ten years.
const MAX_SESSION_TTL_HOURS: i64 = 87_600;

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `CREDVAULT_BIND_ADDR`: full bind address (default: `127.0.0.1:8000`)
    /// - `PORT`: port to bind on `0.0.0.0`, used when `CREDVAULT_BIND_ADDR` is unset
    /// - `CREDVAULT_SECRET_KEY`: server secret (required)
    /// - `CREDVAULT_STORAGE`: `memory` or `rocksdb` (default: `memory`)
    /// - `CREDVAULT_STORAGE_PATH`: path for `RocksDB` (default: `./data`)
    /// - `CREDVAULT_LOG_LEVEL`: log filter (default: `info`)
    /// - `CREDVAULT_SESSION_TTL_HOURS`: session lifetime (default: `336`)
    /// - `CREDVAULT_SESSION_SWEEP_INTERVAL`: seconds between sweeps (default: `300`)
    /// - `CREDVAULT_SECURE_COOKIES`: `true`/`1` to set `Secure` (default: `false`)
    /// - `CREDVAULT_ACTIVITY_FILE`: activity mirror file (optional)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is missing or a value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Priority: CREDVAULT_BIND_ADDR > PORT > default.
        let bind_addr = if let Some(addr) = lookup("CREDVAULT_BIND_ADDR") {
            addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "CREDVAULT_BIND_ADDR",
                reason: e.to_string(),
            })?
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: "PORT",
                    reason: e.to_string(),
                }
            })?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        };

        let secret_key = lookup("CREDVAULT_SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let storage_path = lookup("CREDVAULT_STORAGE_PATH").unwrap_or_else(|| "./data".to_owned());
        let storage_backend = match lookup("CREDVAULT_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendType::Memory,
            "rocksdb" => StorageBackendType::RocksDb { path: storage_path },
            other => {
                return Err(ConfigError::Invalid {
                    name: "CREDVAULT_STORAGE",
                    reason: format!("unknown backend '{other}'"),
                });
            }
        };

        let session_ttl_hours = parse_or(&lookup, "CREDVAULT_SESSION_TTL_HOURS", 336_i64)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(ConfigError::Invalid {
                name: "CREDVAULT_SESSION_TTL_HOURS",
                reason: format!("must be between 1 and {MAX_SESSION_TTL_HOURS}"),
            });
        }

        Ok(Self {
            bind_addr,
            secret_key,
            storage_backend,
            log_level: lookup("CREDVAULT_LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            session_ttl_hours,
            session_sweep_interval_secs: parse_or(&lookup, "CREDVAULT_SESSION_SWEEP_INTERVAL", 300_u64)?
                .max(1),
            secure_cookies: lookup("CREDVAULT_SECURE_COOKIES")
                .is_some_and(|v| v == "true" || v == "1"),
            activity_file_path: lookup("CREDVAULT_ACTIVITY_FILE").filter(|p| !p.is_empty()),
        })
    }

    /// Session lifetime as a duration.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("secret_key", &"[REDACTED]")
            .field("storage_backend", &self.storage_backend)
            .field("log_level", &self.log_level)
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("secure_cookies", &self.secure_cookies)
            .field("activity_file_path", &self.activity_file_path)
            .finish_non_exhaustive()
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
