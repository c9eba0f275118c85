//! Per-channel change detection.
//!
//! Each channel keeps the last value it published per field plus the last
//! published cell array. A fresh reading is compared against that snapshot
//! and only the differing entries come back out, as topic suffixes ready
//! to be appended under `chargers/{id}/channels/{ch}/`.

use crate::controller::{ChannelReading, CELLS_PER_CHANNEL};
use serde_json::Value;
use std::collections::HashMap;

/// One changed field: `suffix` is the topic tail (`voltage`, `cells/3`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDelta {
    pub suffix: String,
    pub value: Value,
}

/// Mutable per-channel state owned by the poll loop.
#[derive(Debug)]
pub struct ChannelState {
    last_fields: HashMap<String, Value>,
    last_cells: [i64; CELLS_PER_CHANNEL],
    /// Tri-state battery presence: `None` until the first sample.
    pub battery_connected: Option<bool>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            last_fields: HashMap::new(),
            // sentinel: any real cell reading differs from -1
            last_cells: [-1; CELLS_PER_CHANNEL],
            battery_connected: None,
        }
    }

    /// Compares `reading` against the stored snapshot and returns the
    /// changed entries. The snapshot is refreshed for every field the
    /// reading carries, changed or not.
    ///
    /// Scalar fields compare by value; a field never seen before always
    /// counts as changed. Array-valued fields other than the cell taps
    /// are ignored entirely. Cells compare element-wise and each changed
    /// index emits its own `cells/{n}` suffix.
    pub fn diff(&mut self, reading: &ChannelReading) -> Vec<ChannelDelta> {
        let mut deltas = Vec::new();

        for (name, value) in &reading.fields {
            if value.is_array() {
                continue;
            }
            let changed = self.last_fields.get(name) != Some(value);
            self.last_fields.insert(name.clone(), value.clone());
            if changed {
                deltas.push(ChannelDelta {
                    suffix: name.clone(),
                    value: value.clone(),
                });
            }
        }

        for (n, &cell) in reading.cells.iter().enumerate() {
            if cell != self.last_cells[n] {
                deltas.push(ChannelDelta {
                    suffix: format!("cells/{n}"),
                    value: Value::from(cell),
                });
            }
        }
        self.last_cells = reading.cells;

        deltas
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(voltage: i64, cells: [i64; CELLS_PER_CHANNEL]) -> ChannelReading {
        let mut r = ChannelReading::default();
        r.fields.insert("voltage".into(), json!(voltage));
        r.fields.insert("current".into(), json!(1500));
        r.cells = cells;
        r
    }

    #[test]
    fn first_reading_emits_everything() {
        let mut state = ChannelState::new();
        let deltas = state.diff(&reading(12600, [2100; 6]));
        // 2 scalar fields + 6 cells (all differ from the -1 sentinel)
        assert_eq!(deltas.len(), 8);
    }

    #[test]
    fn identical_consecutive_readings_emit_nothing() {
        let mut state = ChannelState::new();
        let r = reading(12600, [2100; 6]);
        state.diff(&r);
        assert!(state.diff(&r).is_empty());
    }

    #[test]
    fn single_cell_change_emits_exactly_one_delta() {
        let mut state = ChannelState::new();
        let mut r = reading(12600, [2100; 6]);
        state.diff(&r);
        r.cells[3] = 2150;
        let deltas = state.diff(&r);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].suffix, "cells/3");
        assert_eq!(deltas[0].value, json!(2150));
    }

    #[test]
    fn scalar_change_emits_field_suffix() {
        let mut state = ChannelState::new();
        state.diff(&reading(12600, [2100; 6]));
        let deltas = state.diff(&reading(12650, [2100; 6]));
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].suffix, "voltage");
    }

    #[test]
    fn array_fields_other_than_cells_are_skipped() {
        let mut state = ChannelState::new();
        let mut r = reading(12600, [2100; 6]);
        r.fields.insert("ir_per_cell".into(), json!([5, 5, 5, 6, 5, 5]));
        let deltas = state.diff(&r);
        assert!(deltas.iter().all(|d| d.suffix != "ir_per_cell"));
    }

    #[test]
    fn snapshot_refreshes_even_without_change() {
        let mut state = ChannelState::new();
        let r = reading(12600, [2100; 6]);
        state.diff(&r);
        state.diff(&r);
        // a third, different reading still produces a minimal delta set
        let deltas = state.diff(&reading(12601, [2100; 6]));
        assert_eq!(deltas.len(), 1);
    }
}
