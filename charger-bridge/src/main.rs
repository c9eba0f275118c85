//! Charger Bridge - MQTT state sync for multi-channel battery chargers
//!
//! Polls every charger channel, publishes field-level deltas as retained
//! MQTT topics and accepts remote start/stop commands, addressed or
//! deferred to the next channel that sees a battery:
//! - Subscribe: chargers/+/channels/+ and chargers/next
//! - Publish: chargers/{id}/state, chargers/{id}/channels/{ch}/{field},
//!   chargers/{id}/channels/{ch}/cells/{n}

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use charger_bridge::bridge::Bridge;
use charger_bridge::config::{load_config, MqttConf};
use charger_bridge::controller::ChargerController;
use charger_bridge::mqtt;
use charger_bridge::sim::SimulatedCharger;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    info!("charger-bridge starting");
    let cfg = load_config().await;

    let controllers = enumerate_chargers(&cfg.devices)?;
    info!("found {} chargers", controllers.len());

    let mqtt_cfg = cfg.mqtt.clone().unwrap_or_else(MqttConf::default);
    let (client, mut eventloop) = mqtt::create_mqtt_client(&mqtt_cfg);

    // retained-topic semantics are useless until the broker answers, so
    // block here with the fixed backoff before starting the poll loop
    mqtt::wait_for_broker(&mut eventloop).await;
    mqtt::subscribe_command_topics(&client)
        .await
        .context("failed to subscribe to command topics")?;

    let (command_tx, command_rx) = mpsc::channel(cfg.command.queue_depth);
    let (bus_tx, bus_rx) = mpsc::unbounded_channel();

    mqtt::spawn_command_listener(eventloop, command_tx);
    mqtt::spawn_publisher(client, bus_rx);

    Bridge::new(cfg, controllers, command_rx, bus_tx).run().await;
    Ok(())
}

/// Opens every configured charger. An empty bench is fatal: running the
/// poll loop with nothing to poll only hides a wiring problem.
fn enumerate_chargers(
    devices: &charger_bridge::config::DevicesConf,
) -> Result<Vec<Box<dyn ChargerController>>> {
    let controllers: Vec<Box<dyn ChargerController>> = match devices.backend.as_str() {
        "simulated" => (0..devices.count)
            .map(|i| Box::new(SimulatedCharger::new(i as u64)) as Box<dyn ChargerController>)
            .collect(),
        other => bail!("unknown device backend {other:?}"),
    };
    if controllers.is_empty() {
        bail!("no chargers found");
    }
    Ok(controllers)
}
