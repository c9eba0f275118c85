//! Bridge orchestrator.
//!
//! Single-threaded poll loop over every charger and channel, wired to the
//! bus through two queues: a bounded command queue fed by the MQTT
//! listener task, and an unbounded outbound queue drained by the MQTT
//! publisher task. All shared mutable state (channel snapshots, the one
//! pending deferred command) is owned here and touched only on this
//! loop, so an inbound stop/start can never race a concurrent read.

use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::batcher::PublishBatcher;
use crate::commands::{BridgeCommand, CommandPayload, CommandTarget};
use crate::config::BridgeConfig;
use crate::controller::{ChargerController, CHANNELS_PER_CHARGER};
use crate::differ::ChannelState;
use crate::health::{LinkState, LinkStateTracker};
use crate::presence::{self, PresenceEdge};
use crate::scheduler::CommandScheduler;

/// One message headed for the bus. Everything the bridge publishes is
/// retained so late subscribers see the last known value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPublish {
    pub topic: String,
    pub payload: String,
    pub retained: bool,
}

pub type BusSender = mpsc::UnboundedSender<OutboundPublish>;
pub type BusReceiver = mpsc::UnboundedReceiver<OutboundPublish>;
pub type CommandSender = mpsc::Sender<BridgeCommand>;
pub type CommandReceiver = mpsc::Receiver<BridgeCommand>;

struct Charger {
    id: usize,
    controller: Box<dyn ChargerController>,
    link: LinkStateTracker,
    channels: [ChannelState; CHANNELS_PER_CHARGER],
}

pub struct Bridge {
    chargers: Vec<Charger>,
    scheduler: CommandScheduler,
    batcher: PublishBatcher,
    commands: CommandReceiver,
    bus: BusSender,
    cfg: BridgeConfig,
}

impl Bridge {
    pub fn new(
        cfg: BridgeConfig,
        controllers: Vec<Box<dyn ChargerController>>,
        commands: CommandReceiver,
        bus: BusSender,
    ) -> Self {
        let chargers = controllers
            .into_iter()
            .enumerate()
            .map(|(id, controller)| Charger {
                id,
                controller,
                link: LinkStateTracker::new(),
                channels: std::array::from_fn(|_| ChannelState::new()),
            })
            .collect();
        let batcher = PublishBatcher::new(cfg.flush_interval(), Instant::now());
        let scheduler = CommandScheduler::new(cfg.next_ttl());
        Self {
            chargers,
            scheduler,
            batcher,
            commands,
            bus,
            cfg,
        }
    }

    /// Runs forever: one full pass per cycle, commands drained first.
    pub async fn run(mut self) {
        info!("bridge loop started ({} chargers)", self.chargers.len());
        loop {
            tokio::time::sleep(self.cfg.cycle()).await;
            let now = Instant::now();
            self.drain_commands(now);
            self.poll_cycle(now).await;
        }
    }

    /// Processes every queued inbound command in arrival order.
    pub fn drain_commands(&mut self, now: Instant) {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd.target {
                CommandTarget::Addressed { charger, channel } => {
                    self.apply_addressed(charger, channel, cmd.payload);
                }
                CommandTarget::NextAvailable => match cmd.payload.charge_program() {
                    Some((mode, cell_count, current_ma)) => {
                        info!(
                            "deferred {} command queued ({cell_count} cells, {current_ma} mA)",
                            mode.as_str()
                        );
                        self.scheduler.schedule(mode, cell_count, current_ma, now);
                    }
                    None => warn!("stop on chargers/next has no target, dropped"),
                },
            }
        }
    }

    fn apply_addressed(&mut self, charger: usize, channel: usize, payload: CommandPayload) {
        if channel >= CHANNELS_PER_CHARGER {
            warn!("command addressed to channel {channel} out of range, dropped");
            return;
        }
        let Some(charger) = self.chargers.get_mut(charger) else {
            warn!("command addressed to unknown charger {charger}, dropped");
            return;
        };
        let result = match payload.charge_program() {
            None => {
                info!("stopping charger {} channel {channel}", charger.id);
                charger.controller.stop_charge(channel)
            }
            Some((mode, cell_count, current_ma)) => {
                info!(
                    "starting {} on charger {} channel {channel} ({cell_count} cells, {current_ma} mA)",
                    mode.as_str(),
                    charger.id
                );
                charger
                    .controller
                    .start_charge(channel, cell_count, current_ma, mode)
            }
        };
        if let Err(e) = result {
            warn!("command on charger {} failed: {e}", charger.id);
        }
    }

    /// One full pass over all chargers and channels, then a batcher tick.
    pub async fn poll_cycle(&mut self, now: Instant) {
        let Bridge {
            chargers,
            scheduler,
            batcher,
            bus,
            cfg,
            ..
        } = self;

        for charger in chargers.iter_mut() {
            tokio::time::sleep(cfg.charger_gap()).await;
            for channel in 0..CHANNELS_PER_CHARGER {
                tokio::time::sleep(cfg.channel_gap()).await;
                let reading = match charger.controller.get_channel_info(channel) {
                    Ok(reading) => reading,
                    Err(e) => {
                        if let Some(state) = charger.link.observe(LinkState::from(&e)) {
                            warn!("charger {}: {e}", charger.id);
                            send_state(bus, charger.id, state);
                        }
                        // remaining channels of this unit would fail the
                        // same way; move on to the next charger
                        break;
                    }
                };

                if let Some(state) = charger.link.observe(LinkState::Connected) {
                    info!("charger {} regained connection", charger.id);
                    send_state(bus, charger.id, state);
                }

                for delta in charger.channels[channel].diff(&reading) {
                    let topic =
                        format!("chargers/{}/channels/{channel}/{}", charger.id, delta.suffix);
                    debug!("queueing {topic}");
                    batcher.enqueue(topic, delta.value);
                }

                let sample = presence::sample(&reading.cells, reading.pack_voltage_mv());
                let stored = &mut charger.channels[channel].battery_connected;
                match presence::update(stored, sample.connected) {
                    Some(PresenceEdge::Connected) => {
                        info!(
                            "battery connected on charger {} channel {channel} (cell sum {} mV)",
                            charger.id, sample.cell_sum_mv
                        );
                        if let Some(cmd) = scheduler.take_pending(now) {
                            info!(
                                "applying deferred {} to charger {} channel {channel}",
                                cmd.mode.as_str(),
                                charger.id
                            );
                            if let Err(e) = charger.controller.start_charge(
                                channel,
                                cmd.cell_count,
                                cmd.current_ma,
                                cmd.mode,
                            ) {
                                warn!("deferred command on charger {} failed: {e}", charger.id);
                            }
                        }
                    }
                    Some(PresenceEdge::Disconnected) => {
                        info!("battery removed from charger {} channel {channel}", charger.id);
                    }
                    None => {}
                }
            }
        }

        for (topic, value) in batcher.tick(now) {
            send(bus, topic, payload_for(&value));
        }
    }
}

fn send_state(bus: &BusSender, charger: usize, state: LinkState) {
    send(bus, format!("chargers/{charger}/state"), state.as_str().to_string());
}

fn send(bus: &BusSender, topic: String, payload: String) {
    let msg = OutboundPublish {
        topic,
        payload,
        retained: true,
    };
    if bus.send(msg).is_err() {
        warn!("outbound bus queue closed, dropping publish");
    }
}

/// Bare strings go on the wire unquoted; everything else as JSON.
fn payload_for(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
