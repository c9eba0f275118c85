//! Battery presence detection.
//!
//! A channel is considered occupied when the first cell tap reads above a
//! fixed millivolt floor. The pack-voltage-vs-cell-sum comparison is also
//! computed and carried along for observability, but it does not gate the
//! decision - the original firmware check only ever looked at the cell
//! tap, and we reproduce that behavior as-is.

use crate::controller::CELLS_PER_CHANNEL;

/// Minimum first-cell reading (mV) for a battery to count as present.
pub const CELL_TAP_FLOOR_MV: i64 = 1000;

/// Pack voltage must exceed this fraction of the cell sum for the
/// derived `pack_above_threshold` signal.
const PACK_THRESHOLD_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceSample {
    pub connected: bool,
    pub cell_sum_mv: i64,
    /// Derived only; never part of the presence decision.
    pub pack_above_threshold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEdge {
    Connected,
    Disconnected,
}

/// Evaluates one reading. `pack_voltage_mv` may be absent when the
/// backend did not report a total voltage; the threshold signal is then
/// false, which cannot affect `connected`.
pub fn sample(cells: &[i64; CELLS_PER_CHANNEL], pack_voltage_mv: Option<f64>) -> PresenceSample {
    let cell_sum_mv: i64 = cells.iter().sum();
    let threshold = PACK_THRESHOLD_RATIO * cell_sum_mv as f64;
    let pack_above_threshold = pack_voltage_mv.map(|v| v > threshold).unwrap_or(false);
    PresenceSample {
        connected: cells[0] > CELL_TAP_FLOOR_MV,
        cell_sum_mv,
        pack_above_threshold,
    }
}

/// Edge-triggers against the stored tri-state. Returns the transition if
/// the observation differs from the stored value (a first observation
/// always transitions), updating the store; `None` on identical repeats.
pub fn update(stored: &mut Option<bool>, connected: bool) -> Option<PresenceEdge> {
    if *stored == Some(connected) {
        return None;
    }
    *stored = Some(connected);
    Some(if connected {
        PresenceEdge::Connected
    } else {
        PresenceEdge::Disconnected
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_tap_gates_regardless_of_pack_voltage() {
        // pack voltage way below the 0.8 * sum threshold
        let s = sample(&[1200, 4000, 4000, 4000, 4000, 4000], Some(100.0));
        assert!(s.connected);
        assert!(!s.pack_above_threshold);
    }

    #[test]
    fn low_first_cell_reads_as_empty() {
        let s = sample(&[900, 4000, 4000, 4000, 4000, 4000], Some(25000.0));
        assert!(!s.connected);
        // the threshold signal still tracks the voltages on its own
        assert!(s.pack_above_threshold);
    }

    #[test]
    fn floor_is_exclusive() {
        assert!(!sample(&[CELL_TAP_FLOOR_MV, 0, 0, 0, 0, 0], None).connected);
        assert!(sample(&[CELL_TAP_FLOOR_MV + 1, 0, 0, 0, 0, 0], None).connected);
    }

    #[test]
    fn first_observation_always_edges() {
        let mut stored = None;
        assert_eq!(update(&mut stored, false), Some(PresenceEdge::Disconnected));
        assert_eq!(stored, Some(false));
    }

    #[test]
    fn repeats_do_not_edge() {
        let mut stored = None;
        update(&mut stored, true);
        assert_eq!(update(&mut stored, true), None);
        assert_eq!(update(&mut stored, false), Some(PresenceEdge::Disconnected));
        assert_eq!(update(&mut stored, false), None);
    }
}
