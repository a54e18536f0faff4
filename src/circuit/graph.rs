//! Circuit topology store.

use std::collections::{HashMap, HashSet};

use num_complex::Complex64;

use super::node::Node;
use super::types::NodeId;
use crate::components::{
    AcVoltageSource, Capacitor, Component, CurrentSource, Diode, DiodeKind, Inductor, Resistor,
    VoltageSource,
};
use crate::error::{NodalError, Result};
use crate::solver::{MnaSystem, DC_TIME_STEP};

/// A circuit ready for analysis.
///
/// Nodes live in an arena indexed by [`NodeId`]; components refer to nodes
/// by id only. Analyses mutate node voltages, solved currents, diode states,
/// reactive state and histories in place.
#[derive(Debug, Clone)]
pub struct Circuit {
    /// All nodes, in declaration order
    pub nodes: Vec<Node>,

    /// All components, in declaration order
    pub components: Vec<Component>,

    /// Mapping from node names to node IDs
    node_map: HashMap<String, NodeId>,

    /// Names declared as ground, including ones not yet used by a component
    ground_names: HashSet<String>,

    /// Time step for companion models. Zero or at least [`DC_TIME_STEP`]
    /// means DC: capacitors open, inductors short.
    pub delta_t: f64,

    /// Most recently assembled real system (DC / transient)
    pub mna: Option<MnaSystem<f64>>,

    /// Most recently assembled complex system (AC)
    pub mna_ac: Option<MnaSystem<Complex64>>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            components: Vec::new(),
            node_map: HashMap::new(),
            ground_names: HashSet::new(),
            delta_t: 0.0,
            mna: None,
            mna_ac: None,
        }
    }

    // ============ Nodes ============

    /// Add a node by name, returning the existing id if it is already present.
    pub fn add_node(&mut self, name: &str) -> NodeId {
        self.find_or_create_node(name)
    }

    /// Look up a node by name, creating it if needed.
    pub fn find_or_create_node(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.node_map.get(name) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        let mut node = Node::new(id, name);
        if self.ground_names.contains(name) {
            node.set_ground(true);
        }
        self.nodes.push(node);
        self.node_map.insert(name.to_string(), id);
        id
    }

    /// Find a node ID by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_map.get(name).copied()
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a node by name.
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.find_node(name).and_then(|id| self.node(id))
    }

    /// Declare a node name as ground, creating the node if needed.
    pub fn mark_ground(&mut self, name: &str) -> NodeId {
        self.ground_names.insert(name.to_string());
        let id = self.find_or_create_node(name);
        self.nodes[id.0].set_ground(true);
        id
    }

    /// Whether a name has been declared as ground.
    pub fn is_ground_name(&self, name: &str) -> bool {
        self.ground_names.contains(name)
    }

    /// Whether any node is grounded.
    pub fn has_ground(&self) -> bool {
        self.nodes.iter().any(Node::is_ground)
    }

    /// Names of all nodes in declaration order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Present voltage of a node by name.
    pub fn node_voltage(&self, name: &str) -> Option<f64> {
        self.node_by_name(name).map(Node::voltage)
    }

    // ============ Components ============

    /// Add a resistor between two named nodes.
    pub fn add_resistor(&mut self, name: &str, n1: &str, n2: &str, resistance: f64) -> Result<()> {
        require_positive(name, "resistance", resistance)?;
        let nodes = self.prepare(name, n1, n2)?;
        self.components
            .push(Component::Resistor(Resistor::new(name, nodes, resistance)));
        Ok(())
    }

    /// Add a capacitor between two named nodes.
    pub fn add_capacitor(&mut self, name: &str, n1: &str, n2: &str, capacitance: f64) -> Result<()> {
        require_positive(name, "capacitance", capacitance)?;
        let nodes = self.prepare(name, n1, n2)?;
        self.components
            .push(Component::Capacitor(Capacitor::new(name, nodes, capacitance)));
        Ok(())
    }

    /// Add an inductor between two named nodes.
    pub fn add_inductor(&mut self, name: &str, n1: &str, n2: &str, inductance: f64) -> Result<()> {
        require_positive(name, "inductance", inductance)?;
        let nodes = self.prepare(name, n1, n2)?;
        self.components
            .push(Component::Inductor(Inductor::new(name, nodes, inductance)));
        Ok(())
    }

    /// Add a DC voltage source, `V(pos) - V(neg) = value`.
    pub fn add_voltage_source(&mut self, name: &str, pos: &str, neg: &str, value: f64) -> Result<()> {
        require_finite(name, "voltage", value)?;
        let nodes = self.prepare(name, pos, neg)?;
        self.components
            .push(Component::VoltageSource(VoltageSource::new(name, nodes, value)));
        Ok(())
    }

    /// Add a DC current source driving `value` amps through itself from
    /// `from` to `to`.
    pub fn add_current_source(&mut self, name: &str, from: &str, to: &str, value: f64) -> Result<()> {
        require_finite(name, "current", value)?;
        let nodes = self.prepare(name, from, to)?;
        self.components
            .push(Component::CurrentSource(CurrentSource::new(name, nodes, value)));
        Ok(())
    }

    /// Add an AC voltage source with a magnitude and a phase in radians.
    pub fn add_ac_voltage_source(
        &mut self,
        name: &str,
        pos: &str,
        neg: &str,
        magnitude: f64,
        phase: f64,
    ) -> Result<()> {
        require_positive(name, "magnitude", magnitude)?;
        require_finite(name, "phase", phase)?;
        let nodes = self.prepare(name, pos, neg)?;
        self.components.push(Component::AcVoltageSource(AcVoltageSource::new(
            name, nodes, magnitude, phase,
        )));
        Ok(())
    }

    /// Add a diode from `anode` to `cathode`.
    ///
    /// `zener_voltage` is only checked and used for [`DiodeKind::Zener`].
    pub fn add_diode(
        &mut self,
        name: &str,
        anode: &str,
        cathode: &str,
        kind: DiodeKind,
        forward_voltage: f64,
        zener_voltage: f64,
    ) -> Result<()> {
        require_positive(name, "forward_voltage", forward_voltage)?;
        if kind == DiodeKind::Zener {
            require_positive(name, "zener_voltage", zener_voltage)?;
        }
        let nodes = self.prepare(name, anode, cathode)?;
        self.components.push(Component::Diode(Diode::new(
            name,
            nodes,
            kind,
            forward_voltage,
            zener_voltage,
        )));
        Ok(())
    }

    /// Reject duplicate names and resolve both terminals.
    fn prepare(&mut self, name: &str, n1: &str, n2: &str) -> Result<[NodeId; 2]> {
        if self.find_component(name).is_some() {
            return Err(NodalError::DuplicateComponent {
                name: name.to_string(),
            });
        }
        Ok([self.find_or_create_node(n1), self.find_or_create_node(n2)])
    }

    /// Find a component by name.
    pub fn find_component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// Find a component by name, mutably.
    pub fn find_component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name() == name)
    }

    /// Remove a component by name. Its nodes stay in the circuit.
    pub fn remove_component(&mut self, name: &str) -> Result<Component> {
        let idx = self
            .components
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| NodalError::ComponentNotFound {
                name: name.to_string(),
            })?;
        Ok(self.components.remove(idx))
    }

    /// Find a DC voltage source by name.
    pub fn voltage_source(&self, name: &str) -> Option<&VoltageSource> {
        self.voltage_sources().find(|v| v.name == name)
    }

    /// Find an AC voltage source by name.
    pub fn ac_source(&self, name: &str) -> Option<&AcVoltageSource> {
        self.ac_sources().find(|v| v.name == name)
    }

    /// Find a diode by name.
    pub fn diode(&self, name: &str) -> Option<&Diode> {
        self.diodes().find(|d| d.name == name)
    }

    /// Solved current of a DC voltage source by name.
    pub fn voltage_source_current(&self, name: &str) -> Option<f64> {
        self.voltage_source(name).map(|v| v.current)
    }

    pub fn voltage_sources(&self) -> impl Iterator<Item = &VoltageSource> {
        self.components.iter().filter_map(|c| match c {
            Component::VoltageSource(v) => Some(v),
            _ => None,
        })
    }

    pub fn ac_sources(&self) -> impl Iterator<Item = &AcVoltageSource> {
        self.components.iter().filter_map(|c| match c {
            Component::AcVoltageSource(v) => Some(v),
            _ => None,
        })
    }

    pub fn inductors(&self) -> impl Iterator<Item = &Inductor> {
        self.components.iter().filter_map(|c| match c {
            Component::Inductor(l) => Some(l),
            _ => None,
        })
    }

    pub fn capacitors(&self) -> impl Iterator<Item = &Capacitor> {
        self.components.iter().filter_map(|c| match c {
            Component::Capacitor(cap) => Some(cap),
            _ => None,
        })
    }

    pub fn diodes(&self) -> impl Iterator<Item = &Diode> {
        self.components.iter().filter_map(|c| match c {
            Component::Diode(d) => Some(d),
            _ => None,
        })
    }

    // ============ Matrix indexing ============

    /// Number of nodes that carry a voltage unknown.
    pub fn count_non_ground_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_ground()).count()
    }

    /// Matrix row of a node voltage. Returns None for ground or unknown ids.
    pub fn node_matrix_index(&self, node: NodeId) -> Option<usize> {
        let target = self.nodes.get(node.0)?;
        if target.is_ground() {
            return None;
        }
        Some(self.nodes[..node.0].iter().filter(|n| !n.is_ground()).count())
    }

    /// Matrix row of every node, indexed by [`NodeId`].
    pub fn node_index_map(&self) -> Vec<Option<usize>> {
        let mut next = 0;
        self.nodes
            .iter()
            .map(|n| {
                if n.is_ground() {
                    None
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect()
    }

    /// Branch unknowns of the real system: voltage sources, inductors and
    /// conducting diodes.
    pub fn count_extra_variables(&self) -> usize {
        self.components.iter().filter(|c| c.has_branch()).count()
    }

    /// Real system dimension `N + M`.
    pub fn matrix_size(&self) -> usize {
        self.count_non_ground_nodes() + self.count_extra_variables()
    }

    /// Assign branch indices: voltage sources first, then inductors, then
    /// conducting diodes, each group in declaration order. Non-conducting
    /// diodes lose their index.
    pub fn assign_branch_indices(&mut self) {
        let mut next = 0usize;
        for component in &mut self.components {
            if let Component::VoltageSource(v) = component {
                v.branch = Some(next);
                next += 1;
            }
        }
        for component in &mut self.components {
            if let Component::Inductor(l) = component {
                l.branch = Some(next);
                next += 1;
            }
        }
        for component in &mut self.components {
            if let Component::Diode(d) = component {
                d.branch = if d.is_conducting() {
                    next += 1;
                    Some(next - 1)
                } else {
                    None
                };
            }
        }
    }

    // ============ Time step and state ============

    /// Set the companion-model time step.
    pub fn set_delta_t(&mut self, dt: f64) {
        self.delta_t = dt;
    }

    /// The finite time step, or `None` when the circuit is in DC mode.
    pub fn time_step(&self) -> Option<f64> {
        (self.delta_t > 0.0 && self.delta_t < DC_TIME_STEP).then_some(self.delta_t)
    }

    /// Write a real solution vector back into nodes and components.
    ///
    /// `x` must be laid out as assembled after [`Circuit::assign_branch_indices`].
    pub fn apply_solution(&mut self, x: &[f64]) {
        let index = self.node_index_map();
        let n = self.count_non_ground_nodes();
        for (node, idx) in self.nodes.iter_mut().zip(&index) {
            let v = idx.and_then(|i| x.get(i).copied()).unwrap_or(0.0);
            node.set_voltage(v);
        }

        let dt = self.time_step();
        let branch = |b: Option<usize>| b.and_then(|k| x.get(n + k).copied()).unwrap_or(0.0);
        for component in &mut self.components {
            let v_across = {
                let [a, b] = component.nodes();
                let v = |id: NodeId| {
                    index
                        .get(id.0)
                        .copied()
                        .flatten()
                        .and_then(|i| x.get(i).copied())
                        .unwrap_or(0.0)
                };
                v(a) - v(b)
            };
            match component {
                Component::VoltageSource(v) => v.current = branch(v.branch),
                Component::Inductor(l) => l.current = branch(l.branch),
                Component::Diode(d) => d.current = branch(d.branch),
                Component::Capacitor(c) => c.current = c.current_for(v_across, dt),
                _ => {}
            }
        }
    }

    /// Commit the present solve as the previous-step state of capacitors and
    /// inductors.
    pub fn update_component_states(&mut self) {
        let voltages: Vec<f64> = self.nodes.iter().map(Node::voltage).collect();
        for component in &mut self.components {
            match component {
                Component::Capacitor(c) => {
                    let [a, b] = c.nodes;
                    let v = |id: NodeId| voltages.get(id.0).copied().unwrap_or(0.0);
                    c.update_state(v(a) - v(b));
                }
                Component::Inductor(l) => l.update_state(),
                _ => {}
            }
        }
    }

    /// Zero the previous-step state of capacitors and inductors.
    pub fn reset_component_states(&mut self) {
        for component in &mut self.components {
            match component {
                Component::Capacitor(c) => c.reset_state(),
                Component::Inductor(l) => l.reset_state(),
                _ => {}
            }
        }
    }

    /// Put every diode back in the `Off` state.
    pub fn reset_diodes(&mut self) {
        for component in &mut self.components {
            if let Component::Diode(d) = component {
                d.reset();
            }
        }
    }

    // ============ Histories ============

    /// Clear every recorded history.
    pub fn clear_history(&mut self) {
        for node in &mut self.nodes {
            node.clear_history();
        }
        for component in &mut self.components {
            if let Component::VoltageSource(v) = component {
                v.clear_history();
            }
        }
    }

    /// Clear time-domain histories only.
    pub fn clear_transient_history(&mut self) {
        for node in &mut self.nodes {
            node.voltage_history.clear();
        }
        for component in &mut self.components {
            if let Component::VoltageSource(v) = component {
                v.current_history.clear();
            }
        }
    }

    /// Clear DC sweep histories only.
    pub fn clear_dc_sweep_history(&mut self) {
        for node in &mut self.nodes {
            node.dc_sweep_history.clear();
        }
        for component in &mut self.components {
            if let Component::VoltageSource(v) = component {
                v.dc_sweep_current_history.clear();
            }
        }
    }

    /// Clear AC frequency sweep histories only.
    pub fn clear_ac_sweep_history(&mut self) {
        for node in &mut self.nodes {
            node.ac_sweep_history.clear();
        }
    }

    /// Clear phase sweep histories only.
    pub fn clear_phase_sweep_history(&mut self) {
        for node in &mut self.nodes {
            node.phase_sweep_history.clear();
        }
    }

    /// Record present node voltages and source currents at time `t`.
    pub fn record_transient_point(&mut self, t: f64) {
        for node in self.nodes.iter_mut().filter(|n| !n.is_ground()) {
            let v = node.voltage();
            node.voltage_history.push(t, v);
        }
        for component in &mut self.components {
            if let Component::VoltageSource(v) = component {
                v.current_history.push(t, v.current);
            }
        }
    }

    /// Record present node voltages and source currents against a swept value.
    pub fn record_dc_sweep_point(&mut self, value: f64) {
        for node in self.nodes.iter_mut().filter(|n| !n.is_ground()) {
            let v = node.voltage();
            node.dc_sweep_history.push(value, v);
        }
        for component in &mut self.components {
            if let Component::VoltageSource(v) = component {
                v.dc_sweep_current_history.push(value, v.current);
            }
        }
    }

    /// Record node voltage magnitudes of a complex solution at `frequency`.
    pub fn record_ac_sweep_point(&mut self, frequency: f64, x: &[Complex64]) {
        let magnitudes = self.phasor_magnitudes(x);
        for (node, m) in self.nodes.iter_mut().zip(magnitudes) {
            if let Some(m) = m {
                node.ac_sweep_history.push(frequency, m);
            }
        }
    }

    /// Record node voltage magnitudes of a complex solution at `phase`.
    pub fn record_phase_sweep_point(&mut self, phase: f64, x: &[Complex64]) {
        let magnitudes = self.phasor_magnitudes(x);
        for (node, m) in self.nodes.iter_mut().zip(magnitudes) {
            if let Some(m) = m {
                node.phase_sweep_history.push(phase, m);
            }
        }
    }

    /// `|V|` of every non-ground node, indexed by [`NodeId`].
    fn phasor_magnitudes(&self, x: &[Complex64]) -> Vec<Option<f64>> {
        self.node_index_map()
            .into_iter()
            .map(|idx| idx.and_then(|i| x.get(i)).map(|v| v.norm()))
            .collect()
    }
}

fn require_positive(component: &str, param: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NodalError::invalid_parameter(
            component,
            param,
            format!("must be positive, got {value}"),
        ))
    }
}

fn require_finite(component: &str, param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NodalError::invalid_parameter(
            component,
            param,
            format!("must be finite, got {value}"),
        ))
    }
}
