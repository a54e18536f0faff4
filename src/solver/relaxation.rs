//! Fixed-point relaxation for piecewise-linear diodes.
//!
//! Each pass assigns branch indices for the conducting diodes, assembles and
//! solves the real system, writes the solution back, and then reclassifies
//! every diode from the new terminal voltages and branch currents. The loop
//! stops once a pass changes no diode state.

use log::{debug, warn};

use super::mna::assemble_real;
use super::{DEFAULT_MAX_ITERATIONS, DEFAULT_PIVOT_TOLERANCE, DEFAULT_TOLERANCE};
use crate::circuit::{Circuit, Node, NodeId};
use crate::components::Component;
use crate::error::Result;

/// Outcome of one relaxation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelaxationOutcome {
    /// Number of assemble/solve passes performed
    pub iterations: usize,
    /// Whether the diode states reached a fixed point
    pub converged: bool,
}

/// Diode relaxation solver.
#[derive(Debug, Clone)]
pub struct DiodeRelaxation {
    /// Maximum assemble/solve passes
    pub max_iterations: usize,
    /// Switching tolerance for voltages and currents
    pub tolerance: f64,
    /// Smallest usable pivot in elimination
    pub pivot_tolerance: f64,
    /// Series resistance of a conducting diode
    pub on_resistance: f64,
}

impl Default for DiodeRelaxation {
    fn default() -> Self {
        Self::new()
    }
}

impl DiodeRelaxation {
    /// Create a new relaxation solver with default settings.
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            on_resistance: 0.0,
        }
    }

    /// Run passes until no diode changes state or the cap is reached.
    ///
    /// A linear circuit finishes after one pass. Hitting the cap is not an
    /// error: a warning is logged and the last iterate stays in the circuit.
    /// A singular system aborts immediately.
    pub fn solve(&self, circuit: &mut Circuit) -> Result<RelaxationOutcome> {
        let max_iterations = self.max_iterations.max(1);

        for iter in 0..max_iterations {
            circuit.assign_branch_indices();
            let system = assemble_real(circuit, self.on_resistance).into_system();
            let x = system.solve(self.pivot_tolerance)?;
            circuit.apply_solution(&x);
            circuit.mna = Some(system);

            let changed = self.reclassify(circuit);
            debug!(
                "relaxation pass {}: size {}, {} diode(s) switched",
                iter + 1,
                x.len(),
                changed
            );

            if changed == 0 {
                return Ok(RelaxationOutcome {
                    iterations: iter + 1,
                    converged: true,
                });
            }
        }

        warn!(
            "diode states did not settle after {} iterations; keeping last iterate",
            max_iterations
        );
        Ok(RelaxationOutcome {
            iterations: max_iterations,
            converged: false,
        })
    }

    /// Move every diode to its next state. Returns how many switched.
    fn reclassify(&self, circuit: &mut Circuit) -> usize {
        let voltages: Vec<f64> = circuit.nodes.iter().map(Node::voltage).collect();
        let mut changed = 0;

        for component in &mut circuit.components {
            if let Component::Diode(d) = component {
                let [anode, cathode] = d.nodes;
                let v = |id: NodeId| voltages.get(id.0).copied().unwrap_or(0.0);
                let v_ak = v(anode) - v(cathode);
                let next = d.next_state(v_ak, d.current, self.tolerance);
                if next != d.state {
                    debug!("diode {}: {} -> {}", d.name, d.state, next);
                    d.state = next;
                    changed += 1;
                }
            }
        }

        changed
    }
}
