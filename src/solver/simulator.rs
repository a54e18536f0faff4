//! Analysis drivers.

use std::f64::consts::PI;
use std::str::FromStr;

use log::{debug, info, warn};

use super::linear::gaussian_elimination;
use super::mna::{assemble_ac, stamp_ac_sources, AcLayout, MnaSystem};
use super::relaxation::{DiodeRelaxation, RelaxationOutcome};
use super::{DC_TIME_STEP, DEFAULT_MAX_ITERATIONS, DEFAULT_PIVOT_TOLERANCE, DEFAULT_TOLERANCE};
use crate::circuit::Circuit;
use crate::components::Component;
use crate::error::{NodalError, Result};

/// Slack for float grids so `stop` itself is reached despite rounding.
const GRID_EPSILON: f64 = 1e-9;

/// How capacitors and inductors start a transient run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InitialCondition {
    /// Uncharged capacitors and currentless inductors
    #[default]
    Zero,
    /// Reactive state taken from the DC operating point
    OperatingPoint,
}

/// Frequency spacing of an AC sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SweepKind {
    #[default]
    Linear,
    Logarithmic,
}

impl FromStr for SweepKind {
    type Err = NodalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lin" | "linear" => Ok(SweepKind::Linear),
            "log" | "logarithmic" => Ok(SweepKind::Logarithmic),
            other => Err(NodalError::invalid_analysis(format!(
                "unknown sweep kind '{other}'"
            ))),
        }
    }
}

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Maximum diode relaxation passes per solve.
    pub max_iterations: usize,
    /// Diode switching tolerance (volts / amperes).
    pub tolerance: f64,
    /// Smallest usable pivot magnitude.
    pub pivot_tolerance: f64,
    /// Reactive state at the start of a transient run.
    pub initial_condition: InitialCondition,
    /// Transient time before which samples are not recorded.
    pub save_start: f64,
    /// Series resistance of a conducting diode (ohms).
    pub diode_on_resistance: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            initial_condition: InitialCondition::Zero,
            save_start: 0.0,
            diode_on_resistance: 0.0,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum diode relaxation passes.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the diode switching tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the smallest usable pivot magnitude.
    pub fn with_pivot_tolerance(mut self, pivot_tolerance: f64) -> Self {
        self.pivot_tolerance = pivot_tolerance;
        self
    }

    pub fn with_initial_condition(mut self, initial_condition: InitialCondition) -> Self {
        self.initial_condition = initial_condition;
        self
    }

    pub fn with_save_start(mut self, save_start: f64) -> Self {
        self.save_start = save_start;
        self
    }

    /// Set the conducting-diode series resistance. Zero gives an ideal
    /// voltage-source companion.
    pub fn with_diode_on_resistance(mut self, resistance: f64) -> Self {
        self.diode_on_resistance = resistance;
        self
    }
}

/// Summary of a transient run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransientReport {
    /// Relaxation outcome of the initial DC solve
    pub operating_point: RelaxationOutcome,
    /// Time steps solved after the operating point
    pub steps: usize,
    /// Time points written to the histories
    pub recorded: usize,
    /// Time points whose relaxation hit the iteration cap
    pub non_converged: usize,
}

/// Summary of a DC, AC or phase sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepReport {
    /// Points solved and recorded
    pub solved: usize,
    /// Points skipped (non-positive frequency or failed solve)
    pub skipped: usize,
}

/// Points of a sweep from `start` to `stop`.
///
/// One point yields just `start`. Logarithmic spacing follows
/// `start * (stop / start)^(i / (n - 1))`.
pub fn sweep_points(kind: SweepKind, start: f64, stop: f64, num_points: usize) -> Vec<f64> {
    match num_points {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let t = i as f64 / last;
                    match kind {
                        SweepKind::Linear => start + t * (stop - start),
                        SweepKind::Logarithmic => start * (stop / start).powf(t),
                    }
                })
                .collect()
        }
    }
}

/// Runs analyses on a circuit.
///
/// Analyses mutate the circuit in place: node voltages, solved currents,
/// diode states and the histories of the analysis kind are left readable
/// afterwards. Each analysis clears only the histories it fills.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    /// Create a new simulator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new simulator with custom configuration.
    pub fn with_config(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn relaxation(&self) -> DiodeRelaxation {
        DiodeRelaxation {
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
            pivot_tolerance: self.config.pivot_tolerance,
            on_resistance: self.config.diode_on_resistance,
        }
    }

    /// DC operating point.
    ///
    /// Capacitors are open and inductors short. Every diode restarts from
    /// `Off` before relaxation.
    pub fn run_dc(&self, circuit: &mut Circuit) -> Result<RelaxationOutcome> {
        debug!(
            "DC analysis: {} nodes, {} components",
            circuit.nodes.len(),
            circuit.components.len()
        );
        circuit.set_delta_t(DC_TIME_STEP);
        circuit.reset_diodes();
        let outcome = self.relaxation().solve(circuit)?;
        info!(
            "DC analysis finished after {} iteration(s)",
            outcome.iterations
        );
        Ok(outcome)
    }

    /// Backward-Euler transient analysis on the grid `t_k = k * step`,
    /// `k ≤ floor(stop / step)`.
    ///
    /// Each time point is solved and then recorded, so the circuit is left
    /// at `t = stop`. With [`InitialCondition::OperatingPoint`] the grid
    /// starts at `t = 0`, whose sample is the DC operating point. With
    /// [`InitialCondition::Zero`] it starts at the first step, since the DC
    /// node voltages do not describe discharged capacitors. A failed solve
    /// aborts the run; samples recorded so far are kept.
    pub fn run_transient(
        &self,
        circuit: &mut Circuit,
        step: f64,
        stop: f64,
    ) -> Result<TransientReport> {
        if !(step > 0.0 && step.is_finite()) {
            return Err(NodalError::invalid_analysis(format!(
                "transient step must be positive, got {step}"
            )));
        }
        if !(stop >= 0.0 && stop.is_finite()) {
            return Err(NodalError::invalid_analysis(format!(
                "transient stop time must be non-negative, got {stop}"
            )));
        }

        circuit.clear_transient_history();
        let operating_point = self.run_dc(circuit)?;

        match self.config.initial_condition {
            InitialCondition::Zero => circuit.reset_component_states(),
            InitialCondition::OperatingPoint => circuit.update_component_states(),
        }
        circuit.set_delta_t(step);

        let last = (stop / step + GRID_EPSILON).floor() as usize;
        let save_from = self.config.save_start - step * GRID_EPSILON;
        let relaxation = self.relaxation();
        let mut report = TransientReport {
            operating_point,
            steps: 0,
            recorded: 0,
            non_converged: 0,
        };
        let first = match self.config.initial_condition {
            InitialCondition::Zero => 1,
            InitialCondition::OperatingPoint => 0,
        };
        debug!("transient analysis: step {step}, stop {stop}, {last} steps");

        for k in first..=last {
            let t = k as f64 * step;
            if k > 0 {
                let outcome = relaxation.solve(circuit)?;
                if !outcome.converged {
                    report.non_converged += 1;
                }
                circuit.update_component_states();
                report.steps += 1;
            }

            if t >= save_from {
                circuit.record_transient_point(t);
                report.recorded += 1;
            }
        }

        info!(
            "transient analysis finished: {} steps, {} recorded",
            report.steps, report.recorded
        );
        Ok(report)
    }

    /// Sweep a DC voltage source from `start` to `stop` in increments of
    /// `step`, solving the operating point at each value.
    ///
    /// The source value is restored afterwards. Points whose solve fails
    /// are skipped.
    pub fn run_dc_sweep(
        &self,
        circuit: &mut Circuit,
        source: &str,
        start: f64,
        stop: f64,
        step: f64,
    ) -> Result<SweepReport> {
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) || step == 0.0 {
            return Err(NodalError::invalid_analysis(format!(
                "DC sweep needs finite bounds and a non-zero step, got {start}..{stop} by {step}"
            )));
        }
        let span = (stop - start) / step;
        if span < -GRID_EPSILON {
            return Err(NodalError::invalid_analysis(format!(
                "DC sweep step {step} moves away from {stop}"
            )));
        }

        let position = find_voltage_source(circuit, source)?;
        let original = match &circuit.components[position] {
            Component::VoltageSource(v) => v.value,
            _ => 0.0,
        };

        circuit.clear_dc_sweep_history();
        let last = (span + GRID_EPSILON).floor() as usize;
        let mut report = SweepReport::default();

        for k in 0..=last {
            let value = start + k as f64 * step;
            set_source_value(circuit, position, value);
            match self.run_dc(circuit) {
                Ok(_) => {
                    circuit.record_dc_sweep_point(value);
                    report.solved += 1;
                }
                Err(e) => {
                    warn!("DC sweep: skipping {source} = {value}: {e}");
                    report.skipped += 1;
                }
            }
        }

        set_source_value(circuit, position, original);
        info!(
            "DC sweep of {source} finished: {} solved, {} skipped",
            report.solved, report.skipped
        );
        Ok(report)
    }

    /// Small-signal frequency sweep. `source` names the AC source whose
    /// frequency is swept; every AC source drives its own phasor.
    ///
    /// Diode states are taken as they are; run a DC analysis first to
    /// linearize around an operating point. Non-positive frequencies and
    /// points whose solve fails are skipped. `|V|` of every non-ground node
    /// is recorded against frequency.
    pub fn run_ac_sweep(
        &self,
        circuit: &mut Circuit,
        source: &str,
        f_start: f64,
        f_stop: f64,
        num_points: usize,
        kind: SweepKind,
    ) -> Result<SweepReport> {
        if num_points == 0 {
            return Err(NodalError::invalid_analysis("AC sweep needs at least one point"));
        }
        if !(f_start.is_finite() && f_stop.is_finite()) {
            return Err(NodalError::invalid_analysis(format!(
                "AC sweep bounds must be finite, got {f_start}..{f_stop}"
            )));
        }
        if kind == SweepKind::Logarithmic && !(f_start > 0.0 && f_stop > 0.0) {
            return Err(NodalError::invalid_analysis(format!(
                "logarithmic sweep needs positive bounds, got {f_start}..{f_stop}"
            )));
        }

        let position = find_ac_source(circuit, source)?;
        let phase = source_phase(circuit, position);
        let layout = AcLayout::new(circuit);
        circuit.clear_ac_sweep_history();
        debug!(
            "AC sweep of {source}: {num_points} points, {kind:?}, system size {}",
            layout.size()
        );

        let mut report = SweepReport::default();
        for frequency in sweep_points(kind, f_start, f_stop, num_points) {
            if frequency <= 0.0 {
                warn!("AC sweep: skipping non-positive frequency {frequency}");
                report.skipped += 1;
                continue;
            }

            let omega = 2.0 * PI * frequency;
            set_source_omega(circuit, position, omega);
            let mut blocks = assemble_ac(circuit, &layout, omega, self.config.diode_on_resistance);
            stamp_ac_sources(circuit, &layout, &mut blocks, position, phase);
            let system = blocks.into_system();

            match system.solve(self.config.pivot_tolerance) {
                Ok(x) => {
                    circuit.record_ac_sweep_point(frequency, &x);
                    circuit.mna_ac = Some(system);
                    report.solved += 1;
                }
                Err(e) => {
                    warn!("AC sweep: skipping {frequency} Hz: {e}");
                    report.skipped += 1;
                }
            }
        }

        info!(
            "AC sweep of {source} finished: {} solved, {} skipped",
            report.solved, report.skipped
        );
        Ok(report)
    }

    /// Sweep the phase of one AC source at a fixed frequency.
    ///
    /// The admittance matrix is built once; only the source vector changes
    /// between points. `|V|` of every non-ground node is recorded against
    /// phase in radians.
    pub fn run_phase_sweep(
        &self,
        circuit: &mut Circuit,
        source: &str,
        base_freq: f64,
        start_phase: f64,
        stop_phase: f64,
        num_points: usize,
    ) -> Result<SweepReport> {
        if num_points == 0 {
            return Err(NodalError::invalid_analysis("phase sweep needs at least one point"));
        }
        if !(base_freq > 0.0 && base_freq.is_finite()) {
            return Err(NodalError::invalid_analysis(format!(
                "phase sweep frequency must be positive, got {base_freq}"
            )));
        }
        if !(start_phase.is_finite() && stop_phase.is_finite()) {
            return Err(NodalError::invalid_analysis(format!(
                "phase sweep bounds must be finite, got {start_phase}..{stop_phase}"
            )));
        }

        let position = find_ac_source(circuit, source)?;
        let omega = 2.0 * PI * base_freq;
        set_source_omega(circuit, position, omega);

        let layout = AcLayout::new(circuit);
        let mut blocks = assemble_ac(circuit, &layout, omega, self.config.diode_on_resistance);
        let matrix = blocks.matrix();
        circuit.clear_phase_sweep_history();
        debug!("phase sweep of {source} at {base_freq} Hz: {num_points} points");

        let mut report = SweepReport::default();
        let mut last_rhs = None;
        for phase in sweep_points(SweepKind::Linear, start_phase, stop_phase, num_points) {
            stamp_ac_sources(circuit, &layout, &mut blocks, position, phase);
            let rhs = blocks.rhs();
            match gaussian_elimination(&matrix, &rhs, self.config.pivot_tolerance) {
                Ok(x) => {
                    circuit.record_phase_sweep_point(phase, &x);
                    last_rhs = Some(rhs);
                    report.solved += 1;
                }
                Err(e) => {
                    warn!("phase sweep: skipping phase {phase}: {e}");
                    report.skipped += 1;
                }
            }
        }

        if let Some(z) = last_rhs {
            circuit.mna_ac = Some(MnaSystem {
                a: matrix,
                z,
                num_nodes: blocks.num_nodes(),
            });
        }

        info!(
            "phase sweep of {source} finished: {} solved, {} skipped",
            report.solved, report.skipped
        );
        Ok(report)
    }
}

fn find_voltage_source(circuit: &Circuit, name: &str) -> Result<usize> {
    match circuit.components.iter().position(|c| c.name() == name) {
        Some(pos) if matches!(circuit.components[pos], Component::VoltageSource(_)) => Ok(pos),
        Some(_) => Err(NodalError::invalid_analysis(format!(
            "'{name}' is not a DC voltage source"
        ))),
        None => Err(NodalError::ComponentNotFound {
            name: name.to_string(),
        }),
    }
}

fn find_ac_source(circuit: &Circuit, name: &str) -> Result<usize> {
    match circuit.components.iter().position(|c| c.name() == name) {
        Some(pos) if matches!(circuit.components[pos], Component::AcVoltageSource(_)) => Ok(pos),
        Some(_) => Err(NodalError::invalid_analysis(format!(
            "'{name}' is not an AC voltage source"
        ))),
        None => Err(NodalError::ComponentNotFound {
            name: name.to_string(),
        }),
    }
}

fn set_source_value(circuit: &mut Circuit, position: usize, value: f64) {
    if let Some(Component::VoltageSource(v)) = circuit.components.get_mut(position) {
        v.value = value;
    }
}

fn set_source_omega(circuit: &mut Circuit, position: usize, omega: f64) {
    if let Some(Component::AcVoltageSource(src)) = circuit.components.get_mut(position) {
        src.omega = omega;
    }
}

fn source_phase(circuit: &Circuit, position: usize) -> f64 {
    match circuit.components.get(position) {
        Some(Component::AcVoltageSource(src)) => src.phase,
        _ => 0.0,
    }
}

/// DC operating point with the default configuration.
pub fn run_dc(circuit: &mut Circuit) -> Result<RelaxationOutcome> {
    Simulator::new().run_dc(circuit)
}

/// Transient analysis with the default configuration.
pub fn run_transient(circuit: &mut Circuit, step: f64, stop: f64) -> Result<TransientReport> {
    Simulator::new().run_transient(circuit, step, stop)
}

/// AC frequency sweep with the default configuration.
pub fn run_ac_sweep(
    circuit: &mut Circuit,
    source: &str,
    f_start: f64,
    f_stop: f64,
    num_points: usize,
    kind: SweepKind,
) -> Result<SweepReport> {
    Simulator::new().run_ac_sweep(circuit, source, f_start, f_stop, num_points, kind)
}

/// Phase sweep with the default configuration.
pub fn run_phase_sweep(
    circuit: &mut Circuit,
    source: &str,
    base_freq: f64,
    start_phase: f64,
    stop_phase: f64,
    num_points: usize,
) -> Result<SweepReport> {
    Simulator::new().run_phase_sweep(circuit, source, base_freq, start_phase, stop_phase, num_points)
}

/// DC sweep with the default configuration.
pub fn run_dc_sweep(
    circuit: &mut Circuit,
    source: &str,
    start: f64,
    stop: f64,
    step: f64,
) -> Result<SweepReport> {
    Simulator::new().run_dc_sweep(circuit, source, start, stop, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rc_circuit() -> Circuit {
        let mut c = Circuit::new();
        c.mark_ground("0");
        c.add_voltage_source("V1", "in", "0", 1.0).unwrap();
        c.add_resistor("R1", "in", "c", 1e3).unwrap();
        c.add_capacitor("C1", "c", "0", 1e-6).unwrap();
        c
    }

    fn ac_divider() -> Circuit {
        let mut c = Circuit::new();
        c.mark_ground("0");
        c.add_ac_voltage_source("VAC", "in", "0", 1.0, 0.0).unwrap();
        c.add_resistor("R1", "in", "out", 1e3).unwrap();
        c.add_resistor("R2", "out", "0", 1e3).unwrap();
        c
    }

    #[test]
    fn test_config_builder() {
        let config = SimulatorConfig::new()
            .with_max_iterations(10)
            .with_tolerance(1e-6)
            .with_pivot_tolerance(1e-12)
            .with_initial_condition(InitialCondition::OperatingPoint)
            .with_save_start(1e-3)
            .with_diode_on_resistance(0.1);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.initial_condition, InitialCondition::OperatingPoint);
        assert_eq!(config.save_start, 1e-3);
        assert_eq!(SimulatorConfig::default().max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_sweep_kind_from_str() {
        assert_eq!("LOG".parse::<SweepKind>().unwrap(), SweepKind::Logarithmic);
        assert_eq!("linear".parse::<SweepKind>().unwrap(), SweepKind::Linear);
        assert!("octave".parse::<SweepKind>().is_err());
    }

    #[test]
    fn test_sweep_points() {
        assert!(sweep_points(SweepKind::Linear, 0.0, 1.0, 0).is_empty());
        assert_eq!(sweep_points(SweepKind::Logarithmic, 10.0, 1e3, 1), vec![10.0]);

        let lin = sweep_points(SweepKind::Linear, 0.0, 100.0, 5);
        assert_eq!(lin, vec![0.0, 25.0, 50.0, 75.0, 100.0]);

        let log = sweep_points(SweepKind::Logarithmic, 10.0, 1e4, 4);
        assert_relative_eq!(log[1], 100.0, max_relative = 1e-12);
        assert_relative_eq!(log[3], 1e4, max_relative = 1e-12);
    }

    #[test]
    fn test_rc_transient_from_zero() {
        let mut c = rc_circuit();
        let report = Simulator::new().run_transient(&mut c, 1e-5, 1e-3).unwrap();
        assert_eq!(report.steps, 100);
        assert_eq!(report.recorded, 100);
        assert_eq!(report.non_converged, 0);

        let history = &c.node_by_name("c").unwrap().voltage_history;
        assert_eq!(history.len(), 100);
        // Discharged start: the first sample is one step into charging
        let (t0, v0) = history.points()[0];
        assert_relative_eq!(t0, 1e-5, epsilon = 1e-15);
        assert_relative_eq!(v0, 1.0 / 101.0, epsilon = 1e-12);
        assert!(v0 < 0.01);
        // Backward Euler: v_k = 1 - (RC / (RC + dt))^k
        let (t, v) = history.points()[99];
        assert_relative_eq!(t, 1e-3, epsilon = 1e-12);
        assert_relative_eq!(v, 1.0 - (100.0_f64 / 101.0).powi(100), epsilon = 1e-9);
        assert_relative_eq!(v, 1.0 - (-1.0_f64).exp(), epsilon = 5e-3);
    }

    #[test]
    fn test_transient_leaves_circuit_at_stop() {
        let mut c = rc_circuit();
        Simulator::new().run_transient(&mut c, 1e-5, 3e-5).unwrap();

        let (t, v) = c.node_by_name("c").unwrap().voltage_history.last().unwrap();
        assert_relative_eq!(t, 3e-5, epsilon = 1e-15);
        assert_eq!(c.node_voltage("c"), Some(v));
        assert_eq!(c.capacitors().next().unwrap().v_prev, v);
    }

    #[test]
    fn test_rc_transient_from_operating_point() {
        let mut c = rc_circuit();
        let sim = Simulator::with_config(
            SimulatorConfig::new().with_initial_condition(InitialCondition::OperatingPoint),
        );
        let report = sim.run_transient(&mut c, 1e-5, 5e-4).unwrap();
        assert_eq!(report.steps, 50);
        assert_eq!(report.recorded, 51);

        let history = &c.node_by_name("c").unwrap().voltage_history;
        assert_eq!(history.points()[0].0, 0.0);
        for &(_, v) in history.points() {
            assert_relative_eq!(v, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_transient_save_start() {
        let mut c = rc_circuit();
        let sim = Simulator::with_config(SimulatorConfig::new().with_save_start(5e-4));
        let report = sim.run_transient(&mut c, 1e-4, 1e-3).unwrap();
        assert_eq!(report.steps, 10);
        assert_eq!(report.recorded, 6);

        let history = &c.voltage_source("V1").unwrap().current_history;
        assert_eq!(history.len(), 6);
        assert_relative_eq!(history.points()[0].0, 5e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_transient_clears_previous_run() {
        let mut c = rc_circuit();
        let sim = Simulator::new();
        sim.run_transient(&mut c, 1e-4, 1e-3).unwrap();
        sim.run_transient(&mut c, 1e-4, 2e-4).unwrap();
        assert_eq!(c.node_by_name("c").unwrap().voltage_history.len(), 2);
    }

    #[test]
    fn test_transient_rejects_bad_parameters() {
        let mut c = rc_circuit();
        let sim = Simulator::new();
        assert!(matches!(
            sim.run_transient(&mut c, 0.0, 1e-3),
            Err(NodalError::InvalidAnalysisParam { .. })
        ));
        assert!(sim.run_transient(&mut c, 1e-5, -1.0).is_err());
    }

    #[test]
    fn test_transient_aborts_when_dc_fails() {
        let mut c = Circuit::new();
        c.mark_ground("0");
        c.add_voltage_source("V1", "a", "0", 1.0).unwrap();
        // Node b only touches capacitors and floats in DC
        c.add_capacitor("C1", "a", "b", 1e-6).unwrap();
        c.add_capacitor("C2", "b", "0", 1e-6).unwrap();

        let err = Simulator::new().run_transient(&mut c, 1e-5, 1e-4).unwrap_err();
        assert!(err.is_solver_failure());
        assert!(c.node_by_name("b").unwrap().voltage_history.is_empty());
    }

    #[test]
    fn test_rl_transient_current_rises() {
        let mut c = Circuit::new();
        c.mark_ground("0");
        c.add_voltage_source("V1", "in", "0", 1.0).unwrap();
        c.add_resistor("R1", "in", "a", 10.0).unwrap();
        c.add_inductor("L1", "a", "0", 1e-3).unwrap();

        // L/R = 100 us; from zero the current approaches 100 mA
        Simulator::new().run_transient(&mut c, 1e-6, 1e-3).unwrap();
        let l = c.inductors().next().unwrap();
        assert_relative_eq!(l.current, 0.1, epsilon = 1e-4);
    }

    #[test]
    fn test_unresolved_node_ids_are_skipped() {
        use crate::circuit::NodeId;
        use crate::components::{Capacitor, Diode, DiodeKind, Resistor};

        let mut c = Circuit::new();
        let gnd = c.mark_ground("0");
        c.add_voltage_source("V1", "a", "0", 1.0).unwrap();
        c.add_resistor("R1", "a", "0", 1e3).unwrap();
        let stray = NodeId(40);
        c.components.push(Component::Resistor(Resistor::new(
            "RX",
            [stray, NodeId(41)],
            1e3,
        )));
        c.components
            .push(Component::Capacitor(Capacitor::new("CX", [stray, gnd], 1e-6)));
        c.components.push(Component::Diode(Diode::new(
            "DX",
            [stray, gnd],
            DiodeKind::Normal,
            0.7,
            0.0,
        )));

        let sim = Simulator::new();
        sim.run_dc(&mut c).unwrap();
        assert_relative_eq!(c.node_voltage("a").unwrap(), 1.0, epsilon = 1e-12);
        sim.run_transient(&mut c, 1e-5, 3e-5).unwrap();
        assert_eq!(c.node_by_name("a").unwrap().voltage_history.len(), 3);
    }

    #[test]
    fn test_dc_sweep_records_and_restores() {
        let mut c = Circuit::new();
        c.mark_ground("0");
        c.add_voltage_source("V1", "in", "0", 1.0).unwrap();
        c.add_resistor("R1", "in", "out", 1e3).unwrap();
        c.add_resistor("R2", "out", "0", 1e3).unwrap();

        let report = Simulator::new()
            .run_dc_sweep(&mut c, "V1", 0.0, 10.0, 5.0)
            .unwrap();
        assert_eq!(report, SweepReport { solved: 3, skipped: 0 });

        let out: Vec<f64> = c.node_by_name("out").unwrap().dc_sweep_history.ys().collect();
        assert_eq!(out.len(), 3);
        assert_relative_eq!(out[1], 2.5, epsilon = 1e-9);
        assert_relative_eq!(out[2], 5.0, epsilon = 1e-9);

        let v1 = c.voltage_source("V1").unwrap();
        assert_eq!(v1.value, 1.0);
        assert_relative_eq!(v1.dc_sweep_current_history.points()[2].1, -5e-3, epsilon = 1e-12);
    }

    #[test]
    fn test_dc_sweep_descending_and_errors() {
        let mut c = Circuit::new();
        c.mark_ground("0");
        c.add_voltage_source("V1", "a", "0", 1.0).unwrap();
        c.add_resistor("R1", "a", "0", 1.0).unwrap();
        let sim = Simulator::new();

        let report = sim.run_dc_sweep(&mut c, "V1", 1.0, 0.0, -0.25).unwrap();
        assert_eq!(report.solved, 5);

        assert!(matches!(
            sim.run_dc_sweep(&mut c, "V9", 0.0, 1.0, 0.1),
            Err(NodalError::ComponentNotFound { .. })
        ));
        assert!(matches!(
            sim.run_dc_sweep(&mut c, "R1", 0.0, 1.0, 0.1),
            Err(NodalError::InvalidAnalysisParam { .. })
        ));
        assert!(sim.run_dc_sweep(&mut c, "V1", 0.0, 1.0, -0.1).is_err());
        assert!(sim.run_dc_sweep(&mut c, "V1", 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_ac_sweep_skips_non_positive_frequencies() {
        let mut c = ac_divider();
        let report = Simulator::new()
            .run_ac_sweep(&mut c, "VAC", 0.0, 100.0, 3, SweepKind::Linear)
            .unwrap();
        assert_eq!(report, SweepReport { solved: 2, skipped: 1 });

        let history = &c.node_by_name("out").unwrap().ac_sweep_history;
        assert_eq!(history.xs().collect::<Vec<_>>(), vec![50.0, 100.0]);
        for v in history.ys() {
            assert_relative_eq!(v, 0.5, epsilon = 1e-12);
        }
        assert!(c.mna_ac.is_some());
    }

    #[test]
    fn test_rc_lowpass_corner() {
        let mut c = Circuit::new();
        c.mark_ground("0");
        c.add_ac_voltage_source("VAC", "in", "0", 1.0, 0.0).unwrap();
        c.add_resistor("R1", "in", "out", 1e3).unwrap();
        c.add_capacitor("C1", "out", "0", 1e-6).unwrap();

        let corner = 1.0 / (2.0 * PI * 1e3 * 1e-6);
        Simulator::new()
            .run_ac_sweep(&mut c, "VAC", corner, corner, 1, SweepKind::Logarithmic)
            .unwrap();
        let v = c.node_by_name("out").unwrap().ac_sweep_history.points()[0].1;
        assert_relative_eq!(v, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_relative_eq!(c.ac_source("VAC").unwrap().omega, 2.0 * PI * corner);
    }

    #[test]
    fn test_ac_sweep_rejects_bad_parameters() {
        let mut c = ac_divider();
        let sim = Simulator::new();
        assert!(matches!(
            sim.run_ac_sweep(&mut c, "VAC", 0.0, 1e3, 10, SweepKind::Logarithmic),
            Err(NodalError::InvalidAnalysisParam { .. })
        ));
        assert!(sim
            .run_ac_sweep(&mut c, "VAC", 1.0, 1e3, 0, SweepKind::Linear)
            .is_err());
        assert!(matches!(
            sim.run_ac_sweep(&mut c, "V9", 1.0, 1e3, 3, SweepKind::Linear),
            Err(NodalError::ComponentNotFound { .. })
        ));
        assert!(matches!(
            sim.run_ac_sweep(&mut c, "R1", 1.0, 1e3, 3, SweepKind::Linear),
            Err(NodalError::InvalidAnalysisParam { .. })
        ));
    }

    #[test]
    fn test_phase_sweep_on_resistive_divider() {
        let mut c = ac_divider();
        let report = Simulator::new()
            .run_phase_sweep(&mut c, "VAC", 1e3, 0.0, PI, 4)
            .unwrap();
        assert_eq!(report.solved, 4);

        let history = &c.node_by_name("out").unwrap().phase_sweep_history;
        assert_eq!(history.len(), 4);
        assert_relative_eq!(history.points()[3].0, PI);
        for v in history.ys() {
            assert_relative_eq!(v, 0.5, epsilon = 1e-12);
        }
        // Ground carries no history
        assert!(c.node_by_name("0").unwrap().phase_sweep_history.is_empty());
        assert!(c.node_by_name("out").unwrap().ac_sweep_history.is_empty());
    }

    #[test]
    fn test_phase_sweep_rejects_bad_frequency() {
        let mut c = ac_divider();
        assert!(matches!(
            Simulator::new().run_phase_sweep(&mut c, "VAC", 0.0, 0.0, 1.0, 3),
            Err(NodalError::InvalidAnalysisParam { .. })
        ));
    }
}
