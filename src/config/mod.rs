use crate::registry::{Entity, EntityKind, ServerAddress};
use crate::status::DEFAULT_HISTORY_LEN;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Complete Minetrack configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MinetrackConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default = "default_servers")]
    pub servers: Vec<ServerConfig>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Probe and cache timing
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Data older than this is refreshed before a status query answers
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
    /// Time budget for a single server probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Player-count history points kept per server
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    /// Background refresh interval; 0 refreshes on demand only
    #[serde(default)]
    pub background_interval_seconds: u64,
}

fn default_max_age_ms() -> u64 {
    10_000
}

fn default_probe_timeout_ms() -> u64 {
    2_500
}

fn default_history_len() -> usize {
    DEFAULT_HISTORY_LEN
}

impl RefreshConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_interval_seconds)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_age_ms: default_max_age_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            history_len: default_history_len(),
            background_interval_seconds: 0,
        }
    }
}

/// One tracked server as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub id: String,
    pub name: String,
    pub ip: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: EntityKind,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_kind() -> EntityKind {
    EntityKind::Java
}

impl From<&ServerConfig> for Entity {
    fn from(server: &ServerConfig) -> Self {
        Entity {
            id: server.id.clone(),
            name: server.name.clone(),
            address: ServerAddress {
                host: server.ip.clone(),
                port: server.port,
            },
            kind: server.kind,
            color: server.color.clone(),
        }
    }
}

fn default_servers() -> Vec<ServerConfig> {
    [
        ("server-1", "Hypixel", "mc.hypixel.net", "#4CAF50"),
        ("server-2", "CubeCraft", "play.cubecraft.net", "#2196F3"),
        ("server-3", "Mineplex", "us.mineplex.com", "#FFC107"),
    ]
    .into_iter()
    .map(|(id, name, ip, color)| ServerConfig {
        id: id.to_string(),
        name: name.to_string(),
        ip: ip.to_string(),
        port: None,
        kind: EntityKind::Java,
        color: Some(color.to_string()),
    })
    .collect()
}

impl Default for MinetrackConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            refresh: RefreshConfig::default(),
            servers: default_servers(),
        }
    }
}

impl MinetrackConfig {
    /// Build from `MINETRACK_CONFIG` (if set) plus env overrides.
    ///
    /// Override values that fail to parse are ignored.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match std::env::var("MINETRACK_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(v) = std::env::var("MINETRACK_BIND") {
            cfg.http.bind = v;
        }
        if let Ok(v) = std::env::var("MINETRACK_MAX_AGE_MS") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.refresh.max_age_ms = n;
            }
        }
        if let Ok(v) = std::env::var("MINETRACK_PROBE_TIMEOUT_MS") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.refresh.probe_timeout_ms = n;
            }
        }

        Ok(cfg)
    }

    /// Tracked servers as registry entities, in file order
    pub fn entities(&self) -> Vec<Entity> {
        self.servers.iter().map(Entity::from).collect()
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<MinetrackConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: MinetrackConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MinetrackConfig::default();
        assert_eq!(config.http.bind, "0.0.0.0:5000");
        assert_eq!(config.refresh.max_age_ms, 10_000);
        assert_eq!(config.refresh.probe_timeout_ms, 2_500);
        assert_eq!(config.refresh.history_len, 60);
        assert_eq!(config.refresh.background_interval_seconds, 0);
        assert_eq!(config.servers.len(), 3);
        assert_eq!(config.servers[0].name, "Hypixel");
        assert_eq!(config.servers[2].ip, "us.mineplex.com");
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r##"
            [http]
            bind = "127.0.0.1:8080"

            [refresh]
            max_age_ms = 5000
            probe_timeout_ms = 1000
            history_len = 120
            background_interval_seconds = 5

            [[servers]]
            id = "hub"
            name = "Hub"
            ip = "hub.example.net"
            port = 25570
            type = "PC"
            color = "#123456"

            [[servers]]
            id = "pocket"
            name = "Pocket"
            ip = "pe.example.net"
            type = "PE"
        "##;

        let config: MinetrackConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.http.bind, "127.0.0.1:8080");
        assert_eq!(config.refresh.max_age(), Duration::from_secs(5));
        assert_eq!(config.refresh.probe_timeout(), Duration::from_secs(1));
        assert_eq!(config.refresh.history_len, 120);
        assert_eq!(config.refresh.background_interval(), Duration::from_secs(5));

        let entities = config.entities();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].address.port, Some(25570));
        assert_eq!(entities[0].color.as_deref(), Some("#123456"));
        assert_eq!(entities[1].kind, EntityKind::Bedrock);
        assert!(entities[1].address.port.is_none());
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [refresh]
            max_age_ms = 3000
        "#;

        let config: MinetrackConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.refresh.max_age_ms, 3000);
        assert_eq!(config.refresh.probe_timeout_ms, 2_500); // Default
        assert_eq!(config.http.bind, "0.0.0.0:5000"); // Default
        assert_eq!(config.servers.len(), 3); // Default
    }

    #[test]
    fn test_server_kind_defaults_to_java() {
        let toml = r#"
            [[servers]]
            id = "x"
            name = "X"
            ip = "x.example"
        "#;

        let config: MinetrackConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].kind, EntityKind::Java);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nbind = \"127.0.0.1:9999\"").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.http.bind, "127.0.0.1:9999");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/minetrack.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
