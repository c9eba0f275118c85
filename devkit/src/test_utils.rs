/*!
Harness de test pour le bridge

Câble un Bridge complet sur des chargeurs mockés et un bus enregistré,
avec pacing à zéro et flush immédiat pour des cycles instantanés.
Les commandes passent par le vrai parseur de topics/payloads, comme si
elles arrivaient du broker.
*/

use std::time::Instant;

use anyhow::Result;
use charger_bridge::bridge::{Bridge, CommandSender};
use charger_bridge::commands;
use charger_bridge::config::BridgeConfig;
use charger_bridge::controller::ChargerController;
use tokio::sync::mpsc;

use crate::bus::BusRecorder;
use crate::charger_stub::MockCharger;

pub struct BridgeHarness {
    pub bridge: Bridge,
    pub bus: BusRecorder,
    commands: CommandSender,
}

impl BridgeHarness {
    /// Config de test: pas de pacing, flush à chaque cycle.
    pub fn test_config() -> BridgeConfig {
        let mut cfg = BridgeConfig::default();
        cfg.poll.charger_gap_ms = 0;
        cfg.poll.channel_gap_ms = 0;
        cfg.publish.flush_secs = 0;
        cfg
    }

    pub fn new(chargers: Vec<MockCharger>) -> Self {
        Self::with_config(Self::test_config(), chargers)
    }

    pub fn with_config(cfg: BridgeConfig, chargers: Vec<MockCharger>) -> Self {
        env_logger::try_init().ok();
        let (command_tx, command_rx) = mpsc::channel(cfg.command.queue_depth);
        let (bus_tx, bus_rx) = mpsc::unbounded_channel();
        let controllers = chargers
            .into_iter()
            .map(|c| Box::new(c) as Box<dyn ChargerController>)
            .collect();
        Self {
            bridge: Bridge::new(cfg, controllers, command_rx, bus_tx),
            bus: BusRecorder::new(bus_rx),
            commands: command_tx,
        }
    }

    /// Injecte une commande comme si elle arrivait du broker: même
    /// parsing de topic et de payload que le listener MQTT.
    pub async fn publish_command(&self, topic: &str, payload: &str) -> Result<()> {
        let cmd = commands::parse_message(topic, payload.as_bytes())?;
        self.commands.send(cmd).await?;
        Ok(())
    }

    /// Un cycle complet: drain des commandes, passe de poll, collecte
    /// de tout ce qui est parti vers le bus.
    pub async fn run_cycle(&mut self) {
        self.run_cycle_at(Instant::now()).await;
    }

    /// Variante à horloge contrôlée pour les contrats temporels.
    pub async fn run_cycle_at(&mut self, now: Instant) {
        self.bridge.drain_commands(now);
        self.bridge.poll_cycle(now).await;
        self.bus.drain();
    }
}
