use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: Option<MqttConf>,
    pub poll: PollConf,
    pub publish: PublishConf,
    pub command: CommandConf,
    pub devices: DevicesConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

impl Default for MqttConf {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
        }
    }
}

/// Poll cadence plus the inter-operation pacing the shared hardware bus
/// needs. The gaps are not a correctness requirement but skipping them
/// provokes device-side bus errors.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PollConf {
    pub cycle_secs: u64,
    pub charger_gap_ms: u64,
    pub channel_gap_ms: u64,
}

impl Default for PollConf {
    fn default() -> Self {
        Self {
            cycle_secs: 5,
            charger_gap_ms: 100,
            channel_gap_ms: 200,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PublishConf {
    /// Minimum spacing between batched flushes to the bus.
    pub flush_secs: u64,
}

impl Default for PublishConf {
    fn default() -> Self {
        Self { flush_secs: 5 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CommandConf {
    /// Lifetime of a deferred "next channel" command.
    pub next_ttl_secs: u64,
    /// Depth of the bus-callback to poll-loop command queue.
    pub queue_depth: usize,
}

impl Default for CommandConf {
    fn default() -> Self {
        Self {
            next_ttl_secs: 60,
            queue_depth: 32,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DevicesConf {
    /// Backend selector: currently `simulated` is the only in-tree one.
    pub backend: String,
    pub count: usize,
}

impl Default for DevicesConf {
    fn default() -> Self {
        Self {
            backend: "simulated".into(),
            count: 1,
        }
    }
}

impl BridgeConfig {
    pub fn cycle(&self) -> Duration {
        Duration::from_secs(self.poll.cycle_secs)
    }

    pub fn charger_gap(&self) -> Duration {
        Duration::from_millis(self.poll.charger_gap_ms)
    }

    pub fn channel_gap(&self) -> Duration {
        Duration::from_millis(self.poll.channel_gap_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.publish.flush_secs)
    }

    pub fn next_ttl(&self) -> Duration {
        Duration::from_secs(self.command.next_ttl_secs)
    }
}

pub async fn load_config() -> BridgeConfig {
    let path = std::env::var("CHARGER_BRIDGE_CONFIG").unwrap_or_else(|_| "bridge.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return BridgeConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            tracing::warn!("config invalide ({path}): {e}");
            BridgeConfig::default()
        })
    } else {
        tracing::warn!("pas de {path}, usage config par défaut");
        BridgeConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_wire_contract() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.cycle(), Duration::from_secs(5));
        assert_eq!(cfg.flush_interval(), Duration::from_secs(5));
        assert_eq!(cfg.next_ttl(), Duration::from_secs(60));
        assert_eq!(cfg.charger_gap(), Duration::from_millis(100));
        assert_eq!(cfg.channel_gap(), Duration::from_millis(200));
    }

    #[test]
    fn partial_yaml_keeps_defaults_elsewhere() {
        let cfg: BridgeConfig = serde_yaml::from_str("poll:\n  cycle_secs: 1\n").unwrap();
        assert_eq!(cfg.poll.cycle_secs, 1);
        assert_eq!(cfg.poll.channel_gap_ms, 200);
        assert_eq!(cfg.command.queue_depth, 32);
    }
}
