//! Circuit nodes and their recorded histories.

use super::types::{History, NodeId};

/// A circuit node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    voltage: f64,
    is_ground: bool,
    /// Voltage vs. time (transient)
    pub voltage_history: History,
    /// Voltage vs. swept source value (DC sweep)
    pub dc_sweep_history: History,
    /// Voltage magnitude vs. frequency (AC sweep)
    pub ac_sweep_history: History,
    /// Voltage magnitude vs. source phase (phase sweep)
    pub phase_sweep_history: History,
}

impl Node {
    /// Create a new, non-ground node at 0 V.
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            voltage: 0.0,
            is_ground: false,
            voltage_history: History::new(),
            dc_sweep_history: History::new(),
            ac_sweep_history: History::new(),
            phase_sweep_history: History::new(),
        }
    }

    /// Node voltage. Always 0 for ground.
    pub fn voltage(&self) -> f64 {
        if self.is_ground {
            0.0
        } else {
            self.voltage
        }
    }

    /// Set the node voltage. Ignored for ground.
    pub fn set_voltage(&mut self, v: f64) {
        self.voltage = if self.is_ground { 0.0 } else { v };
    }

    pub fn is_ground(&self) -> bool {
        self.is_ground
    }

    /// Mark or unmark this node as ground. Grounding pins the voltage to 0.
    pub fn set_ground(&mut self, ground: bool) {
        self.is_ground = ground;
        if ground {
            self.voltage = 0.0;
        }
    }

    /// Clear every recorded history series.
    pub fn clear_history(&mut self) {
        self.voltage_history.clear();
        self.dc_sweep_history.clear();
        self.ac_sweep_history.clear();
        self.phase_sweep_history.clear();
    }
}
