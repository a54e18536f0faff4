//! MNA matrix assembly.
//!
//! Every assembly rebuilds the system from scratch. Components stamp into
//! separate blocks, which are then concatenated:
//!
//! ```text
//!   A = [ G  B ]     z = [ J ]
//!       [ C  D ]         [ E ]
//! ```
//!
//! with `C = Bᵗ`. The real system serves DC and transient analysis; the
//! complex system serves AC analysis.

use num_complex::Complex64;

use super::linear::{gaussian_elimination, DenseMatrix, Scalar};
use crate::circuit::{Circuit, NodeId};
use crate::components::Component;
use crate::error::Result;

/// The separate MNA blocks before concatenation.
#[derive(Debug, Clone)]
pub struct MnaBlocks<T> {
    /// Node admittances (N×N)
    pub g: DenseMatrix<T>,
    /// Node-to-branch incidence (N×M)
    pub b: DenseMatrix<T>,
    /// Branch-equation coupling (M×M)
    pub d: DenseMatrix<T>,
    /// Injected node currents (N)
    pub j: Vec<T>,
    /// Branch-equation sources (M)
    pub e: Vec<T>,
}

impl<T: Scalar> MnaBlocks<T> {
    /// Create zeroed blocks for `n` node and `m` branch unknowns.
    pub fn new(n: usize, m: usize) -> Self {
        Self {
            g: DenseMatrix::zeros(n, n),
            b: DenseMatrix::zeros(n, m),
            d: DenseMatrix::zeros(m, m),
            j: vec![T::ZERO; n],
            e: vec![T::ZERO; m],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.j.len()
    }

    pub fn num_branches(&self) -> usize {
        self.e.len()
    }

    /// Stamp an admittance between two nodes.
    /// For an admittance y between rows i1 and i2:
    ///   G[i1,i1] += y
    ///   G[i2,i2] += y
    ///   G[i1,i2] -= y
    ///   G[i2,i1] -= y
    pub fn stamp_admittance(&mut self, i1: Option<usize>, i2: Option<usize>, y: T) {
        if let Some(i) = i1 {
            self.g.add(i, i, y);
        }
        if let Some(j) = i2 {
            self.g.add(j, j, y);
        }
        if let (Some(i), Some(j)) = (i1, i2) {
            self.g.add(i, j, -y);
            self.g.add(j, i, -y);
        }
    }

    /// Connect branch `k` between two nodes: +1 at the positive terminal,
    /// -1 at the negative one.
    pub fn stamp_branch(&mut self, i1: Option<usize>, i2: Option<usize>, k: usize) {
        if let Some(i) = i1 {
            self.b.add(i, k, T::ONE);
        }
        if let Some(j) = i2 {
            self.b.add(j, k, -T::ONE);
        }
    }

    /// Add to the branch-equation diagonal.
    pub fn add_d(&mut self, k: usize, value: T) {
        self.d.add(k, k, value);
    }

    /// Inject current into a node row. Ground is skipped.
    pub fn add_j(&mut self, i: Option<usize>, value: T) {
        if let Some(i) = i {
            self.j[i] += value;
        }
    }

    /// Set the branch-equation source.
    pub fn set_e(&mut self, k: usize, value: T) {
        self.e[k] = value;
    }

    /// `C = Bᵗ`.
    pub fn c(&self) -> DenseMatrix<T> {
        self.b.transpose()
    }

    /// Concatenate into the square `(N+M)×(N+M)` matrix.
    pub fn matrix(&self) -> DenseMatrix<T> {
        let n = self.num_nodes();
        let size = n + self.num_branches();
        let mut a = DenseMatrix::zeros(size, size);
        a.place(0, 0, &self.g);
        a.place(0, n, &self.b);
        a.place(n, 0, &self.c());
        a.place(n, n, &self.d);
        a
    }

    /// Concatenate `[J; E]`.
    pub fn rhs(&self) -> Vec<T> {
        self.j.iter().chain(&self.e).copied().collect()
    }

    /// Concatenate into a solvable system.
    pub fn into_system(self) -> MnaSystem<T> {
        MnaSystem {
            a: self.matrix(),
            z: self.rhs(),
            num_nodes: self.num_nodes(),
        }
    }
}

/// MNA matrix system Ax = z.
#[derive(Debug, Clone, PartialEq)]
pub struct MnaSystem<T> {
    /// System matrix A
    pub a: DenseMatrix<T>,
    /// Source vector z
    pub z: Vec<T>,
    /// Number of node-voltage unknowns leading the solution vector
    pub num_nodes: usize,
}

impl<T: Scalar> MnaSystem<T> {
    /// Matrix dimension `N + M`.
    pub fn size(&self) -> usize {
        self.z.len()
    }

    /// Solve the system. The solution has exactly [`MnaSystem::size`] entries.
    pub fn solve(&self, pivot_tolerance: f64) -> Result<Vec<T>> {
        gaussian_elimination(&self.a, &self.z, pivot_tolerance)
    }
}

fn terminals(index: &[Option<usize>], nodes: [NodeId; 2]) -> (Option<usize>, Option<usize>) {
    let at = |id: NodeId| index.get(id.0).copied().flatten();
    (at(nodes[0]), at(nodes[1]))
}

/// Assemble the real system for DC or transient analysis.
///
/// Branch indices must already be assigned with
/// [`Circuit::assign_branch_indices`]. `diode_on_resistance` is the series
/// resistance of a conducting diode; zero gives the ideal source.
///
/// A conducting diode's D entry is `-diode_on_resistance`, not 1, so the
/// branch reads `v_a - v_k - R_on * i = E` and an ideal diode holds
/// `v_ak` exactly at its companion voltage.
pub fn assemble_real(circuit: &Circuit, diode_on_resistance: f64) -> MnaBlocks<f64> {
    let index = circuit.node_index_map();
    let n = circuit.count_non_ground_nodes();
    let m = circuit.count_extra_variables();
    let dt = circuit.time_step();
    let mut blocks = MnaBlocks::new(n, m);
    let in_range = |k: Option<usize>| k.filter(|&k| k < m);

    for component in &circuit.components {
        let (i1, i2) = terminals(&index, component.nodes());
        match component {
            Component::Resistor(r) => {
                if let Some(g) = r.conductance() {
                    blocks.stamp_admittance(i1, i2, g);
                }
            }

            Component::Capacitor(c) => {
                // Open in DC; conductance plus history current when stepping
                if let Some((g, i_eq)) = c.companion(dt) {
                    blocks.stamp_admittance(i1, i2, g);
                    blocks.add_j(i1, i_eq);
                    blocks.add_j(i2, -i_eq);
                }
            }

            Component::Inductor(l) => {
                if let Some(k) = in_range(l.branch) {
                    let (d, e) = l.companion(dt);
                    blocks.stamp_branch(i1, i2, k);
                    blocks.add_d(k, d);
                    blocks.set_e(k, e);
                }
            }

            Component::VoltageSource(v) => {
                if let Some(k) = in_range(v.branch) {
                    blocks.stamp_branch(i1, i2, k);
                    blocks.set_e(k, v.value);
                }
            }

            Component::CurrentSource(i) => {
                // Current enters `to` and leaves `from`
                blocks.add_j(i2, i.value);
                blocks.add_j(i1, -i.value);
            }

            Component::Diode(d) => {
                if let (Some(k), Some(v)) = (in_range(d.branch), d.branch_voltage()) {
                    blocks.stamp_branch(i1, i2, k);
                    blocks.add_d(k, -diode_on_resistance);
                    blocks.set_e(k, v);
                }
            }

            // Small-signal only
            Component::AcVoltageSource(_) => {}
        }
    }

    blocks
}

/// Branch layout of the complex system.
///
/// Branch unknowns are voltage sources, then AC voltage sources, then
/// conducting diodes. Inductors are stamped as admittances and own no
/// branch here.
#[derive(Debug, Clone)]
pub struct AcLayout {
    index: Vec<Option<usize>>,
    /// Branch of each component, by position in `circuit.components`
    branches: Vec<Option<usize>>,
    num_nodes: usize,
    num_branches: usize,
}

impl AcLayout {
    pub fn new(circuit: &Circuit) -> Self {
        let mut branches = vec![None; circuit.components.len()];
        let mut next = 0usize;
        let groups: [fn(&Component) -> bool; 3] = [
            |c| matches!(c, Component::VoltageSource(_)),
            |c| matches!(c, Component::AcVoltageSource(_)),
            |c| matches!(c, Component::Diode(d) if d.is_conducting()),
        ];
        for in_group in groups {
            for (slot, component) in branches.iter_mut().zip(&circuit.components) {
                if in_group(component) {
                    *slot = Some(next);
                    next += 1;
                }
            }
        }
        Self {
            index: circuit.node_index_map(),
            branches,
            num_nodes: circuit.count_non_ground_nodes(),
            num_branches: next,
        }
    }

    pub fn size(&self) -> usize {
        self.num_nodes + self.num_branches
    }

    /// Branch index of the component at `position`, if it owns one.
    pub fn branch(&self, position: usize) -> Option<usize> {
        self.branches.get(position).copied().flatten()
    }

    /// Matrix row of a node voltage.
    pub fn node_index(&self, node: NodeId) -> Option<usize> {
        self.index.get(node.0).copied().flatten()
    }
}

/// Assemble the complex admittance blocks at angular frequency `omega`.
///
/// Only the matrix blocks are filled; the sources are added by
/// [`stamp_ac_sources`], so a phase sweep can keep the matrix and rebuild
/// just the right-hand side.
pub fn assemble_ac(
    circuit: &Circuit,
    layout: &AcLayout,
    omega: f64,
    diode_on_resistance: f64,
) -> MnaBlocks<Complex64> {
    let mut blocks = MnaBlocks::new(layout.num_nodes, layout.num_branches);

    for (position, component) in circuit.components.iter().enumerate() {
        let (i1, i2) = terminals(&layout.index, component.nodes());
        match component {
            Component::Resistor(r) => {
                if let Some(g) = r.conductance() {
                    blocks.stamp_admittance(i1, i2, Complex64::new(g, 0.0));
                }
            }
            Component::Capacitor(c) => blocks.stamp_admittance(i1, i2, c.admittance(omega)),
            Component::Inductor(l) => blocks.stamp_admittance(i1, i2, l.admittance(omega)),
            Component::VoltageSource(_) | Component::AcVoltageSource(_) => {
                if let Some(k) = layout.branch(position) {
                    blocks.stamp_branch(i1, i2, k);
                }
            }
            Component::Diode(_) => {
                if let Some(k) = layout.branch(position) {
                    blocks.stamp_branch(i1, i2, k);
                    blocks.add_d(k, Complex64::new(-diode_on_resistance, 0.0));
                }
            }
            // Open for small signals
            Component::CurrentSource(_) => {}
        }
    }

    blocks
}

/// Fill the complex source vector.
///
/// Every AC source drives its branch with its own phasor, except the source
/// at position `driven`, which uses the given phase. DC voltage sources are
/// small-signal shorts and current sources opens.
pub fn stamp_ac_sources(
    circuit: &Circuit,
    layout: &AcLayout,
    blocks: &mut MnaBlocks<Complex64>,
    driven: usize,
    phase: f64,
) {
    blocks.j.fill(Complex64::ZERO);
    blocks.e.fill(Complex64::ZERO);
    for (position, component) in circuit.components.iter().enumerate() {
        if let (Component::AcVoltageSource(src), Some(k)) = (component, layout.branch(position)) {
            let phasor = if position == driven {
                Complex64::from_polar(src.magnitude, phase)
            } else {
                src.phasor()
            };
            blocks.set_e(k, phasor);
        }
    }
}
