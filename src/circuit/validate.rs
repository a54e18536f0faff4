//! Circuit validation.

use crate::components::{Component, DiodeKind};
use crate::error::{NodalError, Result};

use super::Circuit;

/// Validate a circuit before analysis.
///
/// Checks:
/// - The circuit has components and at least one ground node
/// - Every terminal refers to a node of this circuit
/// - Component parameters are positive where a stamp needs them
/// - No voltage source is shorted onto a single node
///
/// Analyses do not call this themselves; a malformed element that slips
/// through is skipped by the assembler instead of stamped.
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.components.is_empty() {
        return Err(NodalError::invalid_topology("circuit has no components"));
    }

    if !circuit.has_ground() {
        return Err(NodalError::invalid_topology("circuit has no ground node"));
    }

    for component in &circuit.components {
        for node in component.nodes() {
            if circuit.node(node).is_none() {
                return Err(NodalError::NodeNotFound {
                    node: node.to_string(),
                });
            }
        }

        if let Component::VoltageSource(v) = component {
            if v.nodes[0] == v.nodes[1] {
                return Err(NodalError::invalid_topology(format!(
                    "voltage source '{}' has both terminals on one node",
                    v.name
                )));
            }
        }

        let (param, value) = match component {
            Component::Resistor(r) => ("resistance", r.resistance),
            Component::Capacitor(c) => ("capacitance", c.capacitance),
            Component::Inductor(l) => ("inductance", l.inductance),
            Component::AcVoltageSource(v) => ("magnitude", v.magnitude),
            Component::Diode(d) if d.kind == DiodeKind::Zener && d.zener_voltage <= 0.0 => {
                ("zener_voltage", d.zener_voltage)
            }
            Component::Diode(d) => ("forward_voltage", d.forward_voltage),
            Component::VoltageSource(_) | Component::CurrentSource(_) => continue,
        };
        if !(value > 0.0 && value.is_finite()) {
            return Err(NodalError::invalid_parameter(
                component.name(),
                param,
                format!("must be positive, got {value}"),
            ));
        }
    }

    Ok(())
}
