//! Configuration loading.
//!
//! Chatterd reads a single TOML file (default `config.toml`, overridable via
//! the first CLI argument). Everything has a default so an empty file is a
//! valid configuration.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server identity and listeners.
    #[serde(default)]
    pub server: ServerConfig,
    /// Seed data loaded into the stores at startup.
    #[serde(default)]
    pub seed: SeedConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error: defaults apply, matching the seeded
    /// in-memory nature of the server.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name reported by the status endpoint.
    pub name: String,
    /// WebSocket listener address.
    pub listen: SocketAddr,
    /// Health/status HTTP port. 0 disables the endpoint (used by tests).
    pub health_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "chatterd".to_string(),
            listen: "0.0.0.0:5000".parse().expect("static addr"),
            health_port: 5001,
        }
    }
}

/// Seed data: users and the default room, created before the first
/// connection is accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Users that exist at startup.
    pub users: Vec<SeedUser>,
    /// Name of the default public room. Its id is always "general".
    pub general_room_name: String,
}

/// A user record seeded at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        let demo = |id: &str, name: &str, email: &str, img: u32| SeedUser {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            avatar: format!("https://i.pravatar.cc/150?img={img}"),
        };
        Self {
            users: vec![
                demo("1", "Alice Silva", "alice@example.com", 1),
                demo("2", "Bob Santos", "bob@example.com", 2),
                demo("3", "Carol Costa", "carol@example.com", 3),
                demo("4", "David Oliveira", "david@example.com", 4),
                demo("5", "Eva Pereira", "eva@example.com", 5),
            ],
            general_room_name: "General".to_string(),
        }
    }
}
