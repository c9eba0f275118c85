//! Driver seam for charger hardware.
//!
//! The bridge never talks USB directly: every backend (real hardware or
//! the simulator) sits behind [`ChargerController`]. The trait is
//! deliberately synchronous - the underlying transport serializes all
//! traffic, so one blocking call per channel read is the natural shape.

use serde_json::{Map, Value};

/// Charge slots per charger unit.
pub const CHANNELS_PER_CHARGER: usize = 4;
/// Per-cell voltage taps reported by every channel.
pub const CELLS_PER_CHANNEL: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The device is unplugged or otherwise unreachable.
    #[error("device not connected")]
    NotConnected,
    /// The device answered garbage or the transfer failed mid-flight.
    #[error("communication error: {0}")]
    Communication(String),
}

/// Charge program selector for `start_charge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeMode {
    Charge,
    Storage,
}

impl ChargeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeMode::Charge => "charge",
            ChargeMode::Storage => "storage",
        }
    }
}

/// One snapshot of a channel, as reported by the device.
///
/// Scalar telemetry lives in `fields` keyed by name (voltage, current,
/// capacity, ...). Backends may include array-valued entries there; the
/// differ skips them. Per-cell millivolts always travel separately in
/// `cells`, fixed at [`CELLS_PER_CHANNEL`] entries.
#[derive(Debug, Clone, Default)]
pub struct ChannelReading {
    pub fields: Map<String, Value>,
    pub cells: [i64; CELLS_PER_CHANNEL],
}

impl ChannelReading {
    /// Total pack voltage in millivolts, if the backend reported one.
    pub fn pack_voltage_mv(&self) -> Option<f64> {
        self.fields.get("voltage").and_then(Value::as_f64)
    }
}

/// Driver interface for one physical charger.
///
/// `channel` is always in `0..CHANNELS_PER_CHARGER`; callers validate
/// before dispatching, implementations may assume it.
pub trait ChargerController: Send {
    fn get_channel_info(&mut self, channel: usize) -> Result<ChannelReading, ControllerError>;

    fn start_charge(
        &mut self,
        channel: usize,
        cell_count: u8,
        current_ma: u32,
        mode: ChargeMode,
    ) -> Result<(), ControllerError>;

    fn stop_charge(&mut self, channel: usize) -> Result<(), ControllerError>;
}
