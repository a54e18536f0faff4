//! Voltage and current sources.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::circuit::{History, NodeId};

/// An independent DC voltage source.
///
/// Voltage sources require an extra row/column in the MNA matrix for the
/// branch current. The source enforces: V+ - V- = value
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    pub value: f64,
    /// Branch index among the extra unknowns, assigned before each assembly
    pub branch: Option<usize>,
    /// Solved branch current (flowing from + to - through the source)
    pub current: f64,
    /// Current vs. time (transient)
    pub current_history: History,
    /// Current vs. swept source value (DC sweep)
    pub dc_sweep_current_history: History,
}

impl VoltageSource {
    /// Create a new voltage source.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], value: f64) -> Self {
        Self {
            name: name.into(),
            nodes,
            value,
            branch: None,
            current: 0.0,
            current_history: History::new(),
            dc_sweep_current_history: History::new(),
        }
    }

    /// Clear every recorded history series.
    pub fn clear_history(&mut self) {
        self.current_history.clear();
        self.dc_sweep_current_history.clear();
    }
}

/// An independent current source.
///
/// Current sources add directly to the RHS vector of the MNA equations.
/// The current flows through the source from `nodes[0]` to `nodes[1]`.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub name: String,
    pub nodes: [NodeId; 2], // [from, to]
    pub value: f64,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], value: f64) -> Self {
        Self {
            name: name.into(),
            nodes,
            value,
        }
    }
}

/// A sinusoidal small-signal voltage source.
///
/// Only the AC analyses drive it; DC and transient analyses leave it
/// unstamped. The angular frequency is supplied by the sweep at solve time.
#[derive(Debug, Clone)]
pub struct AcVoltageSource {
    pub name: String,
    pub nodes: [NodeId; 2], // [positive, negative]
    pub magnitude: f64,
    /// Phase in radians
    pub phase: f64,
    /// Angular frequency of the most recent solve (rad/s)
    pub omega: f64,
}

impl AcVoltageSource {
    /// Create a new AC voltage source.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], magnitude: f64, phase: f64) -> Self {
        Self {
            name: name.into(),
            nodes,
            magnitude,
            phase,
            omega: 0.0,
        }
    }

    /// The source phasor `magnitude∠phase`.
    pub fn phasor(&self) -> Complex64 {
        Complex64::from_polar(self.magnitude, self.phase)
    }

    /// Instantaneous value of the sinusoid at `time` for a frequency in Hz.
    pub fn value_at(&self, time: f64, frequency: f64) -> f64 {
        self.magnitude * (2.0 * PI * frequency * time + self.phase).sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_phasor() {
        let src = AcVoltageSource::new("VAC", [NodeId(1), NodeId(0)], 2.0, FRAC_PI_2);
        let p = src.phasor();
        assert_relative_eq!(p.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.im, 2.0);
        assert_relative_eq!(p.norm(), 2.0);
    }

    #[test]
    fn test_value_at() {
        let src = AcVoltageSource::new("VAC", [NodeId(1), NodeId(0)], 1.0, 0.0);
        assert_relative_eq!(src.value_at(0.0, 50.0), 0.0);
        assert_relative_eq!(src.value_at(0.005, 50.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_voltage_source_history_clear() {
        let mut v = VoltageSource::new("V1", [NodeId(1), NodeId(0)], 5.0);
        v.current_history.push(0.0, 1e-3);
        v.dc_sweep_current_history.push(1.0, 1e-3);
        v.clear_history();
        assert!(v.current_history.is_empty());
        assert!(v.dc_sweep_current_history.is_empty());
    }
}
