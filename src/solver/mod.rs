//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for circuit analysis.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ j ]
//! [ C   D ] [ i ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C = Bᵗ connect branch currents to nodes
//! - D couples branch currents into their own equations (inductors,
//!   conducting diodes)
//! - v is the vector of node voltages
//! - i is the vector of branch currents
//! - j is the sum of current sources into each node
//! - e is the vector of branch-equation sources
//!
//! Branch unknowns belong to voltage sources, inductors and conducting
//! diodes, in that order. The AC system replaces inductor branches by
//! admittances and adds AC sources after the voltage sources.

mod linear;
mod mna;
mod relaxation;
mod simulator;

pub use linear::{gaussian_elimination, DenseMatrix, Scalar};
pub use mna::{assemble_ac, assemble_real, stamp_ac_sources, AcLayout, MnaBlocks, MnaSystem};
pub use relaxation::{DiodeRelaxation, RelaxationOutcome};
pub use simulator::{
    run_ac_sweep, run_dc, run_dc_sweep, run_phase_sweep, run_transient, sweep_points,
    InitialCondition, Simulator, SimulatorConfig, SweepKind, SweepReport, TransientReport,
};

/// Default cap on diode relaxation passes.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default diode switching tolerance (volts / amperes).
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Default smallest usable pivot magnitude.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-9;

/// Time step used for DC analysis. Any step at least this large is
/// treated as DC: capacitors open, inductors short.
pub const DC_TIME_STEP: f64 = 1e12;
