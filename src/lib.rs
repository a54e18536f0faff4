//! # Nodal Core
//!
//! A circuit analysis engine built on Modified Nodal Analysis.
//!
//! This library provides:
//! - An in-memory circuit model (nodes, ground, components)
//! - Linear components (R, C, L), DC and AC voltage sources, current sources
//! - Piecewise-linear diodes, including Zener breakdown
//! - DC operating point, DC sweep, transient, AC frequency and phase sweeps
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Circuit graph representation and validation
//! - [`components`] - Component models (resistors, capacitors, diodes, etc.)
//! - [`solver`] - MNA matrix assembly, dense solving and analysis drivers
//! - [`error`] - The crate error type
//!
//! ## Usage
//!
//! ```
//! use nodal_core::{run_dc, Circuit};
//!
//! let mut circuit = Circuit::new();
//! circuit.mark_ground("0");
//! circuit.add_voltage_source("V1", "in", "0", 10.0)?;
//! circuit.add_resistor("R1", "in", "mid", 10.0)?;
//! circuit.add_resistor("R2", "mid", "0", 10.0)?;
//!
//! run_dc(&mut circuit)?;
//! assert!((circuit.node_voltage("mid").unwrap() - 5.0).abs() < 1e-9);
//! # Ok::<(), nodal_core::NodalError>(())
//! ```
//!
//! ## Circuit Simulation Method
//!
//! Every solve assembles the system matrix A and source vector z from
//! scratch and solves Ax = z by Gaussian elimination:
//!
//! 1. DC: capacitors open, inductors short
//! 2. Transient: capacitors and inductors replaced by backward-Euler
//!    companion models at step dt
//! 3. AC: complex admittances at angular frequency ω, driven by the AC sources
//!
//! Diodes switch between off, forward-conducting and reverse-conducting
//! states. Each solve repeats until no diode changes state.

pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{validate_circuit, Circuit, History, Node, NodeId};
pub use components::{Component, DiodeKind, DiodeState};
pub use error::{NodalError, Result};
pub use solver::{
    run_ac_sweep, run_dc, run_dc_sweep, run_phase_sweep, run_transient, InitialCondition,
    RelaxationOutcome, Simulator, SimulatorConfig, SweepKind, SweepReport, TransientReport,
};
