//! Piecewise-linear diode model.
//!
//! The diode is an open circuit while `Off` and an ideal voltage source while
//! conducting: `V(anode) - V(cathode) = Vf` in forward conduction, and
//! `= -Vz` in reverse (Zener) breakdown. The state is chosen by repeated
//! solve-and-reclassify passes rather than by linearizing an exponential.

use std::fmt;

use crate::circuit::NodeId;

/// Diode flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiodeKind {
    #[default]
    Normal,
    /// Conducts in reverse once the reverse voltage reaches the Zener voltage
    Zener,
}

/// Conduction state of the piecewise-linear model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiodeState {
    #[default]
    Off,
    ForwardOn,
    ReverseOn,
}

impl DiodeState {
    /// Whether the diode owns a branch unknown in this state.
    pub fn is_conducting(self) -> bool {
        !matches!(self, DiodeState::Off)
    }
}

impl fmt::Display for DiodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiodeState::Off => write!(f, "OFF"),
            DiodeState::ForwardOn => write!(f, "FORWARD_ON"),
            DiodeState::ReverseOn => write!(f, "REVERSE_ON"),
        }
    }
}

/// A diode component.
#[derive(Debug, Clone)]
pub struct Diode {
    pub name: String,
    pub nodes: [NodeId; 2], // [anode, cathode]
    pub kind: DiodeKind,
    pub forward_voltage: f64,
    /// Breakdown voltage, only meaningful for [`DiodeKind::Zener`]
    pub zener_voltage: f64,
    pub state: DiodeState,
    /// Branch index among the extra unknowns; `None` while not conducting
    pub branch: Option<usize>,
    /// Solved branch current (anode to cathode)
    pub current: f64,
}

impl Diode {
    /// Create a new diode in the `Off` state.
    pub fn new(
        name: impl Into<String>,
        nodes: [NodeId; 2],
        kind: DiodeKind,
        forward_voltage: f64,
        zener_voltage: f64,
    ) -> Self {
        Self {
            name: name.into(),
            nodes,
            kind,
            forward_voltage,
            zener_voltage,
            state: DiodeState::Off,
            branch: None,
            current: 0.0,
        }
    }

    pub fn is_conducting(&self) -> bool {
        self.state.is_conducting()
    }

    /// Right-hand side of the branch equation, `None` while off.
    pub fn branch_voltage(&self) -> Option<f64> {
        match self.state {
            DiodeState::Off => None,
            DiodeState::ForwardOn => Some(self.forward_voltage),
            DiodeState::ReverseOn => Some(-self.zener_voltage),
        }
    }

    /// State for the next iteration given the present solve.
    ///
    /// `v_ak` is the anode-to-cathode voltage and `i` the branch current of
    /// the present iterate.
    pub fn next_state(&self, v_ak: f64, i: f64, eps: f64) -> DiodeState {
        match self.state {
            DiodeState::Off => {
                if v_ak >= self.forward_voltage - eps {
                    DiodeState::ForwardOn
                } else if self.kind == DiodeKind::Zener && v_ak <= -self.zener_voltage + eps {
                    DiodeState::ReverseOn
                } else {
                    DiodeState::Off
                }
            }
            DiodeState::ForwardOn if i < -eps => DiodeState::Off,
            DiodeState::ReverseOn if i > eps => DiodeState::Off,
            state => state,
        }
    }

    /// Return to the initial `Off` state.
    pub fn reset(&mut self) {
        self.state = DiodeState::Off;
        self.branch = None;
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn diode(kind: DiodeKind) -> Diode {
        Diode::new("D1", [NodeId(1), NodeId(0)], kind, 0.7, 5.1)
    }

    #[test]
    fn test_off_turns_forward_on() {
        let d = diode(DiodeKind::Normal);
        assert_eq!(d.next_state(0.5, 0.0, EPS), DiodeState::Off);
        assert_eq!(d.next_state(0.7, 0.0, EPS), DiodeState::ForwardOn);
        assert_eq!(d.next_state(5.0, 0.0, EPS), DiodeState::ForwardOn);
    }

    #[test]
    fn test_reverse_breakdown_only_for_zener() {
        let normal = diode(DiodeKind::Normal);
        assert_eq!(normal.next_state(-10.0, 0.0, EPS), DiodeState::Off);

        let zener = diode(DiodeKind::Zener);
        assert_eq!(zener.next_state(-5.0, 0.0, EPS), DiodeState::Off);
        assert_eq!(zener.next_state(-5.1, 0.0, EPS), DiodeState::ReverseOn);
    }

    #[test]
    fn test_conducting_states_turn_off_on_wrong_current() {
        let mut d = diode(DiodeKind::Zener);
        d.state = DiodeState::ForwardOn;
        assert_eq!(d.next_state(0.7, 1e-3, EPS), DiodeState::ForwardOn);
        assert_eq!(d.next_state(0.7, -1e-3, EPS), DiodeState::Off);

        d.state = DiodeState::ReverseOn;
        assert_eq!(d.next_state(-5.1, -1e-3, EPS), DiodeState::ReverseOn);
        assert_eq!(d.next_state(-5.1, 1e-3, EPS), DiodeState::Off);
    }

    #[test]
    fn test_branch_voltage() {
        let mut d = diode(DiodeKind::Zener);
        assert_eq!(d.branch_voltage(), None);
        d.state = DiodeState::ForwardOn;
        assert_eq!(d.branch_voltage(), Some(0.7));
        d.state = DiodeState::ReverseOn;
        assert_eq!(d.branch_voltage(), Some(-5.1));

        d.branch = Some(2);
        d.reset();
        assert_eq!(d.state, DiodeState::Off);
        assert_eq!(d.branch, None);
    }
}
