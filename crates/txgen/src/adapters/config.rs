//! # Generator Configuration
//!
//! Two formats are accepted:
//!
//! - **TOML** (`*.toml`): peers plus tuning sections.
//! - **Line format** (anything else): one peer per line,
//!   `ip port role shard_id`. Blank lines and `#` comments are skipped and
//!   every tuning value takes its default.
//!
//! # Config File Format
//!
//! ```toml
//! [[peers]]
//! ip = "127.0.0.1"
//! port = 9000
//! role = "leader"
//! shard_id = 0
//!
//! [generator]
//! run_duration_secs = 300
//! tick_interval_ms = 500
//! startup_delay_secs = 10
//! cross_shard_ratio = 0.1
//! seed = 42
//!
//! [dispatch]
//! queue_capacity = 64
//! send_timeout_ms = 2000
//!
//! [ledger]
//! blocks_dir = "./blocks"
//! network = "bitcoin"
//! ```

use serde::Deserialize;
use shared_types::{Peer, PeerRole, ShardId};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::bitcoin_ledger::LedgerNetwork;
use super::dispatcher::DispatchSettings;
use crate::domain::ConfigError;

/// Full generator configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeneratorConfig {
    /// Every peer in the topology, in file order.
    #[serde(default)]
    pub peers: Vec<Peer>,
    /// Run timing and cross-shard policy.
    #[serde(default)]
    pub generator: GeneratorSection,
    /// Delivery tuning.
    #[serde(default)]
    pub dispatch: DispatchSection,
    /// Reference ledger location.
    #[serde(default)]
    pub ledger: LedgerSection,
}

/// `[generator]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    /// Total run time before the stop broadcast.
    pub run_duration_secs: u64,
    /// Period of the distribution loop.
    pub tick_interval_ms: u64,
    /// Wait before the first tick.
    pub startup_delay_secs: u64,
    /// Probability that a batch slot attempts cross-shard selection.
    pub cross_shard_ratio: f64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            run_duration_secs: 300,
            tick_interval_ms: 500,
            startup_delay_secs: 10,
            cross_shard_ratio: 0.1,
            seed: None,
        }
    }
}

/// `[dispatch]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Per-peer queue depth.
    pub queue_capacity: usize,
    /// Deadline for one send.
    pub send_timeout_ms: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            send_timeout_ms: 2000,
        }
    }
}

/// `[ledger]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Directory holding `blk*.dat` files.
    pub blocks_dir: PathBuf,
    /// Network the block files belong to.
    pub network: LedgerNetwork,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            blocks_dir: PathBuf::from("./blocks"),
            network: LedgerNetwork::Bitcoin,
        }
    }
}

impl GeneratorConfig {
    /// Leaders in configured order.
    pub fn leaders(&self) -> Vec<Peer> {
        self.peers_with_role(PeerRole::Leader)
    }

    /// Validators in configured order.
    pub fn validators(&self) -> Vec<Peer> {
        self.peers_with_role(PeerRole::Validator)
    }

    /// Shard ids of the leaders, in leader order.
    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.leaders().iter().map(|p| p.shard_id).collect()
    }

    /// Port of the first client peer, if the client role is configured.
    pub fn client_port(&self) -> Option<u16> {
        self.peers
            .iter()
            .find(|p| p.role == PeerRole::Client)
            .map(|p| p.port)
    }

    /// Run duration.
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.generator.run_duration_secs)
    }

    /// Tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.generator.tick_interval_ms)
    }

    /// Delay before the first tick.
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.generator.startup_delay_secs)
    }

    /// Dispatcher settings.
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            queue_capacity: self.dispatch.queue_capacity,
            send_timeout: Duration::from_millis(self.dispatch.send_timeout_ms),
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let leaders = self.leaders();
        if leaders.is_empty() {
            return Err(ConfigError::Invalid("no leader peers configured".to_string()));
        }

        let mut seen = HashSet::new();
        for leader in &leaders {
            if !seen.insert(leader.shard_id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate leader for shard {}",
                    leader.shard_id
                )));
            }
        }

        if self.generator.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".to_string()));
        }

        let ratio = self.generator.cross_shard_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::Invalid(format!(
                "cross_shard_ratio {ratio} outside [0, 1]"
            )));
        }

        if self.dispatch.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be positive".to_string()));
        }

        Ok(())
    }

    fn peers_with_role(&self, role: PeerRole) -> Vec<Peer> {
        self.peers.iter().filter(|p| p.role == role).cloned().collect()
    }
}

/// Load and validate the configuration at `path`.
///
/// # Errors
///
/// Returns error if the file cannot be read, parsed or fails validation.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GeneratorConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let config = if is_toml {
        parse_toml(&content)?
    } else {
        parse_lines(&content)?
    };
    config.validate()?;
    Ok(config)
}

/// Parse TOML content (no validation).
pub fn parse_toml(content: &str) -> Result<GeneratorConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Parse `ip port role shard_id` lines (no validation).
pub fn parse_lines(content: &str) -> Result<GeneratorConfig, ConfigError> {
    let mut peers = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [ip, port, role, shard_id] = fields.as_slice() else {
            return Err(ConfigError::Parse(format!(
                "line {}: expected 4 fields, found {}",
                number + 1,
                fields.len()
            )));
        };
        let parse_err = |what: &str, e: String| ConfigError::Parse(format!("line {}: {what}: {e}", number + 1));
        peers.push(Peer {
            ip: (*ip).to_string(),
            port: port.parse().map_err(|e: std::num::ParseIntError| parse_err("port", e.to_string()))?,
            role: role.parse().map_err(|e: String| parse_err("role", e))?,
            shard_id: shard_id
                .parse()
                .map_err(|e: std::num::ParseIntError| parse_err("shard id", e.to_string()))?,
        });
    }
    Ok(GeneratorConfig {
        peers,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINES: &str = "\
# harness topology
127.0.0.1 9000 leader 0
127.0.0.1 9001 validator 0

127.0.0.1 9010 leader 1
127.0.0.1 9999 client 0
";

    #[test]
    fn test_parse_lines() {
        let config = parse_lines(LINES).unwrap();
        assert_eq!(config.peers.len(), 4);
        assert_eq!(config.shard_ids(), vec![0, 1]);
        assert_eq!(config.validators().len(), 1);
        assert_eq!(config.client_port(), Some(9999));
        assert_eq!(config.run_duration(), Duration::from_secs(300));
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_lines_rejects_bad_role() {
        let err = parse_lines("127.0.0.1 9000 observer 0").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_lines_rejects_short_line() {
        assert!(matches!(parse_lines("127.0.0.1 9000"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_toml_with_defaults() {
        let config = parse_toml(
            r#"
            [[peers]]
            ip = "10.0.0.1"
            port = 7000
            role = "leader"
            shard_id = 3

            [generator]
            tick_interval_ms = 250
            seed = 9

            [ledger]
            network = "regtest"
            "#,
        )
        .unwrap();

        assert_eq!(config.shard_ids(), vec![3]);
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.generator.run_duration_secs, 300);
        assert_eq!(config.generator.seed, Some(9));
        assert_eq!(config.ledger.network, LedgerNetwork::Regtest);
        assert_eq!(config.dispatch_settings(), DispatchSettings::default());
        assert_eq!(config.client_port(), None);
    }

    #[test]
    fn test_validate_rejects_duplicate_leaders() {
        let config = parse_lines("a 1 leader 0\nb 2 leader 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_no_leaders() {
        let config = parse_lines("a 1 validator 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ratio_and_interval() {
        let mut config = parse_lines("a 1 leader 0").unwrap();
        config.generator.cross_shard_ratio = 1.5;
        assert!(config.validate().is_err());

        config.generator.cross_shard_ratio = 0.5;
        config.generator.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_by_extension() {
        let mut lines = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        lines.write_all(LINES.as_bytes()).unwrap();
        assert_eq!(load_config(lines.path()).unwrap().leaders().len(), 2);

        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        toml_file
            .write_all(b"[[peers]]\nip = \"h\"\nport = 1\nrole = \"leader\"\nshard_id = 0\n")
            .unwrap();
        assert_eq!(load_config(toml_file.path()).unwrap().shard_ids(), vec![0]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/txgen.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
