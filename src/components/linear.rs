//! Linear passive components: Resistor, Capacitor, Inductor.

use num_complex::Complex64;

use crate::circuit::NodeId;

/// A resistor component.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub name: String,
    pub nodes: [NodeId; 2],
    pub resistance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], resistance: f64) -> Self {
        Self {
            name: name.into(),
            nodes,
            resistance,
        }
    }

    /// Get the conductance (1/R), or `None` when the resistance cannot be stamped.
    pub fn conductance(&self) -> Option<f64> {
        (self.resistance > 0.0 && self.resistance.is_finite()).then(|| 1.0 / self.resistance)
    }
}

/// A capacitor component.
///
/// With backward Euler the capacitor is replaced, for one time step, by a
/// conductance `G_eq = C/dt` in parallel with a history current source
/// `I_eq = G_eq * v(n-1)` pushing current into the positive terminal:
///
/// ```text
///   i(n) = C * (v(n) - v(n-1)) / dt = G_eq * v(n) - I_eq
/// ```
///
/// In DC mode (no finite time step) the capacitor is an open circuit.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub name: String,
    pub nodes: [NodeId; 2],
    pub capacitance: f64,
    /// Terminal voltage difference at the end of the previous time step
    pub v_prev: f64,
    /// Current through the capacitor at the last solve
    pub current: f64,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], capacitance: f64) -> Self {
        Self {
            name: name.into(),
            nodes,
            capacitance,
            v_prev: 0.0,
            current: 0.0,
        }
    }

    /// Companion model `(G_eq, I_eq)` for a time step, or `None` in DC mode.
    pub fn companion(&self, dt: Option<f64>) -> Option<(f64, f64)> {
        let dt = dt?;
        let g = self.capacitance / dt;
        Some((g, g * self.v_prev))
    }

    /// Small-signal admittance `jωC`.
    pub fn admittance(&self, omega: f64) -> Complex64 {
        Complex64::new(0.0, omega * self.capacitance)
    }

    /// Current implied by a solved terminal voltage, before the state update.
    pub fn current_for(&self, v: f64, dt: Option<f64>) -> f64 {
        match self.companion(dt) {
            Some((g, i_eq)) => g * v - i_eq,
            None => 0.0,
        }
    }

    /// Commit the end-of-step terminal voltage.
    pub fn update_state(&mut self, v: f64) {
        self.v_prev = v;
    }

    /// Forget the stored history.
    pub fn reset_state(&mut self) {
        self.v_prev = 0.0;
        self.current = 0.0;
    }
}

/// An inductor component.
///
/// The inductor always owns a branch current unknown. With backward Euler
/// its branch equation reads
///
/// ```text
///   v1 - v2 - (L/dt) * i(n) = -(L/dt) * i(n-1)
/// ```
///
/// and in DC mode it collapses to `v1 - v2 = 0`, an ideal short.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub name: String,
    pub nodes: [NodeId; 2],
    pub inductance: f64,
    /// Branch index among the extra unknowns, assigned before each assembly
    pub branch: Option<usize>,
    /// Solved branch current
    pub current: f64,
    /// Branch current at the end of the previous time step
    pub i_prev: f64,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], inductance: f64) -> Self {
        Self {
            name: name.into(),
            nodes,
            inductance,
            branch: None,
            current: 0.0,
            i_prev: 0.0,
        }
    }

    /// Branch-equation entries `(D[k,k], E[k])` for a time step.
    pub fn companion(&self, dt: Option<f64>) -> (f64, f64) {
        match dt {
            Some(dt) => {
                let r = self.inductance / dt;
                (-r, -r * self.i_prev)
            }
            None => (0.0, 0.0),
        }
    }

    /// Small-signal admittance `1/(jωL)`.
    pub fn admittance(&self, omega: f64) -> Complex64 {
        Complex64::new(0.0, omega * self.inductance).inv()
    }

    /// Commit the solved current as the previous-step current.
    pub fn update_state(&mut self) {
        self.i_prev = self.current;
    }

    /// Forget the stored history.
    pub fn reset_state(&mut self) {
        self.i_prev = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new("R1", [NodeId(1), NodeId(0)], 1000.0);
        assert_relative_eq!(r.conductance().unwrap(), 0.001);

        let bad = Resistor::new("R2", [NodeId(1), NodeId(0)], 0.0);
        assert!(bad.conductance().is_none());
    }

    #[test]
    fn test_capacitor_companion_model() {
        let mut c = Capacitor::new("C1", [NodeId(1), NodeId(0)], 1e-6);
        let dt = 1e-5;

        let (g, i_eq) = c.companion(Some(dt)).unwrap();
        assert_relative_eq!(g, 0.1);
        assert_eq!(i_eq, 0.0);

        c.update_state(2.0);
        let (_, i_eq) = c.companion(Some(dt)).unwrap();
        assert_relative_eq!(i_eq, 0.2);

        // Holding the voltage means no current
        assert_relative_eq!(c.current_for(2.0, Some(dt)), 0.0);
        assert!(c.companion(None).is_none());
    }

    #[test]
    fn test_inductor_companion_model() {
        let mut l = Inductor::new("L1", [NodeId(1), NodeId(2)], 1e-3);
        l.current = 0.5;
        l.update_state();

        let (d, e) = l.companion(Some(1e-4));
        assert_relative_eq!(d, -10.0);
        assert_relative_eq!(e, -5.0);
        assert_eq!(l.companion(None), (0.0, 0.0));
    }

    #[test]
    fn test_reactive_admittances() {
        let c = Capacitor::new("C1", [NodeId(1), NodeId(0)], 1e-6);
        let l = Inductor::new("L1", [NodeId(1), NodeId(0)], 1e-3);
        let omega = 1000.0;

        assert_relative_eq!(c.admittance(omega).im, 1e-3);
        // 1/(j * 1) = -j
        assert_relative_eq!(l.admittance(omega).im, -1.0);
        assert_relative_eq!(l.admittance(omega).re, 0.0);
    }
}
