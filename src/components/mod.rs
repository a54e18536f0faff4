//! Component models for circuit analysis.
//!
//! This module provides models for all supported circuit components:
//! - Linear: Resistor, Capacitor, Inductor
//! - Sources: Voltage Source, Current Source, AC Voltage Source
//! - Nonlinear: piecewise-linear Diode
//!
//! The set of component kinds is closed; the assembler dispatches on
//! [`Component`] to stamp each one into the MNA system.

mod diode;
mod linear;
mod sources;

pub use diode::{Diode, DiodeKind, DiodeState};
pub use linear::{Capacitor, Inductor, Resistor};
pub use sources::{AcVoltageSource, CurrentSource, VoltageSource};

use crate::circuit::{Node, NodeId};

/// A circuit component.
#[derive(Debug, Clone)]
pub enum Component {
    Resistor(Resistor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    AcVoltageSource(AcVoltageSource),
    Diode(Diode),
}

impl Component {
    /// Get the component name.
    pub fn name(&self) -> &str {
        match self {
            Component::Resistor(r) => &r.name,
            Component::Capacitor(c) => &c.name,
            Component::Inductor(l) => &l.name,
            Component::VoltageSource(v) => &v.name,
            Component::CurrentSource(i) => &i.name,
            Component::AcVoltageSource(v) => &v.name,
            Component::Diode(d) => &d.name,
        }
    }

    /// Get the two terminals, in the component's polarity order.
    pub fn nodes(&self) -> [NodeId; 2] {
        match self {
            Component::Resistor(r) => r.nodes,
            Component::Capacitor(c) => c.nodes,
            Component::Inductor(l) => l.nodes,
            Component::VoltageSource(v) => v.nodes,
            Component::CurrentSource(i) => i.nodes,
            Component::AcVoltageSource(v) => v.nodes,
            Component::Diode(d) => d.nodes,
        }
    }

    /// Short type label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Resistor(_) => "resistor",
            Component::Capacitor(_) => "capacitor",
            Component::Inductor(_) => "inductor",
            Component::VoltageSource(_) => "voltage source",
            Component::CurrentSource(_) => "current source",
            Component::AcVoltageSource(_) => "AC voltage source",
            Component::Diode(_) => "diode",
        }
    }

    /// Whether the component owns a branch unknown in the real-valued system.
    pub fn has_branch(&self) -> bool {
        match self {
            Component::VoltageSource(_) | Component::Inductor(_) => true,
            Component::Diode(d) => d.is_conducting(),
            _ => false,
        }
    }

    /// Voltage across the terminals, `V(nodes[0]) - V(nodes[1])`.
    pub fn voltage(&self, nodes: &[Node]) -> f64 {
        let [a, b] = self.nodes();
        let v = |id: NodeId| nodes.get(id.0).map(Node::voltage).unwrap_or(0.0);
        v(a) - v(b)
    }

    /// Current through the component from `nodes[0]` to `nodes[1]` at the
    /// last solve.
    pub fn current(&self, nodes: &[Node]) -> f64 {
        match self {
            Component::Resistor(r) => match r.conductance() {
                Some(g) => g * self.voltage(nodes),
                None => 0.0,
            },
            Component::Capacitor(c) => c.current,
            Component::Inductor(l) => l.current,
            Component::VoltageSource(v) => v.current,
            Component::CurrentSource(i) => i.value,
            Component::AcVoltageSource(_) => 0.0,
            Component::Diode(d) => d.current,
        }
    }
}
