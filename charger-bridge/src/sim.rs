//! Simulated charger backend.
//!
//! Lets the daemon run end-to-end without hardware: every channel cycles
//! through empty -> battery plugged -> charging -> removed, with the
//! channels phase-shifted so the bus traffic looks like a real bench.

use serde_json::json;

use crate::controller::{
    ChannelReading, ChargeMode, ChargerController, ControllerError, CELLS_PER_CHANNEL,
    CHANNELS_PER_CHARGER,
};

const PHASE_LEN: u64 = 24;
const PLUG_AT: u64 = 4;
const UNPLUG_AT: u64 = 20;

#[derive(Debug, Default)]
struct SimChannel {
    tick: u64,
    active: bool,
    current_ma: u32,
}

pub struct SimulatedCharger {
    channels: [SimChannel; CHANNELS_PER_CHARGER],
}

impl SimulatedCharger {
    /// `offset` desynchronizes units so a multi-charger bench does not
    /// plug every battery at the same instant.
    pub fn new(offset: u64) -> Self {
        let mut channels: [SimChannel; CHANNELS_PER_CHARGER] = Default::default();
        for (i, ch) in channels.iter_mut().enumerate() {
            ch.tick = offset * 7 + i as u64 * 5;
        }
        Self { channels }
    }
}

impl ChargerController for SimulatedCharger {
    fn get_channel_info(&mut self, channel: usize) -> Result<ChannelReading, ControllerError> {
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| ControllerError::Communication("channel out of range".into()))?;
        ch.tick += 1;
        let phase = ch.tick % PHASE_LEN;
        let present = (PLUG_AT..UNPLUG_AT).contains(&phase);

        let mut reading = ChannelReading::default();
        if present {
            // cells creep up as the (pretend) charge progresses
            let mv = 3600 + (phase - PLUG_AT) as i64 * 30;
            reading.cells = [mv; CELLS_PER_CHANNEL];
        }
        let voltage: i64 = reading.cells.iter().sum();
        let current = if present && ch.active { ch.current_ma } else { 0 };
        reading.fields.insert("voltage".into(), json!(voltage));
        reading.fields.insert("current".into(), json!(current));
        reading
            .fields
            .insert("capacity".into(), json!(if present { phase * 90 } else { 0 }));
        Ok(reading)
    }

    fn start_charge(
        &mut self,
        channel: usize,
        _cell_count: u8,
        current_ma: u32,
        _mode: ChargeMode,
    ) -> Result<(), ControllerError> {
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| ControllerError::Communication("channel out of range".into()))?;
        ch.active = true;
        ch.current_ma = current_ma;
        Ok(())
    }

    fn stop_charge(&mut self, channel: usize) -> Result<(), ControllerError> {
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| ControllerError::Communication("channel out of range".into()))?;
        ch.active = false;
        ch.current_ma = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_eventually_plug_and_unplug() {
        let mut sim = SimulatedCharger::new(0);
        let mut seen_present = false;
        let mut seen_empty = false;
        for _ in 0..PHASE_LEN {
            let r = sim.get_channel_info(0).unwrap();
            if r.cells[0] > 0 {
                seen_present = true;
            } else {
                seen_empty = true;
            }
        }
        assert!(seen_present && seen_empty);
    }

    #[test]
    fn start_charge_drives_the_current_field() {
        let mut sim = SimulatedCharger::new(0);
        sim.start_charge(1, 4, 2000, ChargeMode::Charge).unwrap();
        // advance until the battery phase
        let current = loop {
            let r = sim.get_channel_info(1).unwrap();
            if r.cells[0] > 0 {
                break r.fields["current"].as_u64().unwrap();
            }
        };
        assert_eq!(current, 2000);
        sim.stop_charge(1).unwrap();
    }

    #[test]
    fn out_of_range_channel_errors() {
        let mut sim = SimulatedCharger::new(0);
        assert!(sim.get_channel_info(CHANNELS_PER_CHARGER).is_err());
    }
}
