//! MQTT plumbing: client setup, inbound command listener, outbound
//! publisher. The listener never touches bridge state directly; parsed
//! commands go through the bounded queue and are applied on the poll
//! loop, preserving arrival order.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::task;
use tracing::{debug, info, warn};

use crate::bridge::{BusReceiver, CommandSender};
use crate::commands;
use crate::config::MqttConf;

pub fn create_mqtt_client(cfg: &MqttConf) -> (AsyncClient, EventLoop) {
    let mut opts = MqttOptions::new("charger-bridge", &cfg.host, cfg.port);
    opts.set_keep_alive(Duration::from_secs(15));
    AsyncClient::new(opts, 10)
}

/// Blocks until the broker accepts us, retrying with a fixed 5 s backoff.
/// Retries are unbounded; only external termination stops them.
pub async fn wait_for_broker(eventloop: &mut EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("mqtt connected");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("mqtt connect failed ({e}), retrying in 5s");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

pub async fn subscribe_command_topics(client: &AsyncClient) -> anyhow::Result<()> {
    client
        .subscribe("chargers/+/channels/+", QoS::AtLeastOnce)
        .await?;
    client.subscribe("chargers/next", QoS::AtLeastOnce).await?;
    Ok(())
}

/// Drives the MQTT event loop forever, forwarding parsed commands to the
/// poll loop. Malformed payloads and unexpected topics are logged and
/// dropped here, before they can touch any state.
pub fn spawn_command_listener(mut eventloop: EventLoop, commands: CommandSender) {
    task::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    debug!("command message on {}", p.topic);
                    match commands::parse_message(&p.topic, &p.payload) {
                        Ok(cmd) => {
                            if commands.try_send(cmd).is_err() {
                                warn!("command queue full, dropping message on {}", p.topic);
                            }
                        }
                        Err(e) => warn!("discarding command: {e}"),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("mqtt error: {e}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

/// Forwards everything the bridge wants published to the broker.
/// Publishes are fire-and-forget; a failure is logged and the message is
/// lost, per the retained-topic best-effort contract.
pub fn spawn_publisher(client: AsyncClient, mut outbound: BusReceiver) {
    task::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = client
                .publish(msg.topic.clone(), QoS::AtLeastOnce, msg.retained, msg.payload)
                .await
            {
                warn!("publish to {} failed: {e}", msg.topic);
            }
        }
    });
}
