//! The simulation driver: builds a checkpoint schedule from the final
//! time and each reporter's sampling frequency, then alternates
//! between propagating the chosen backend across a segment and firing
//! every reporter that is due at the segment's end.
//!
//! Grounded on `examples/original_source/src/openrxn/systems/system.py`
//! (checkpoint scheduling) and `ODESystem.py`/`GillespieSystem.py` (the
//! two backends).

use ode_solvers::{DVector, Dopri5, System as OdeSolverSystem};
use rand::Rng;

use crate::deriv::DerivTerms;
use crate::error::{Result, RxnError};
use crate::gillespie::{Engine, Process, ReservoirProcess};
use crate::reporters::Reporter;

/// Checkpoints within this distance of an exact multiple of a
/// reporter's frequency are considered due; matches the original's
/// tolerance for comparing simulation-time floats.
const CHECKPOINT_EPS: f64 = 1e-8;

/// The union of `{0, t_end}` with every `{k * freq : k*freq <= t_end}`
/// for `freq` in `frequencies`, sorted and deduplicated within
/// `CHECKPOINT_EPS`.
fn checkpoint_schedule(t_end: f64, frequencies: &[f64]) -> Vec<f64> {
    let mut checkpoints = vec![0.0, t_end];
    for &freq in frequencies {
        if freq <= 0.0 {
            continue;
        }
        let mut k = 1u64;
        while k as f64 * freq <= t_end + CHECKPOINT_EPS {
            checkpoints.push(k as f64 * freq);
            k += 1;
        }
    }
    checkpoints.sort_by(|a, b| a.partial_cmp(b).expect("checkpoint times are never NaN"));
    checkpoints.dedup_by(|a, b| (*a - *b).abs() < CHECKPOINT_EPS);
    checkpoints
}

/// True if `freq` divides `t` within `CHECKPOINT_EPS`.
fn is_due(t: f64, freq: f64) -> bool {
    if freq <= 0.0 {
        return false;
    }
    let k = (t / freq).round();
    (t - k * freq).abs() < CHECKPOINT_EPS
}

fn fire_due(reporters: &mut [Box<dyn Reporter>], t: f64, q: &[f64]) {
    for r in reporters.iter_mut() {
        if is_due(t, r.frequency()) {
            r.report(t, q);
        }
    }
}

/// Adapts a fixed derivative-term table to `ode_solvers`' `System`
/// trait over a dynamically-sized state vector.
struct OdeAdapter<'a> {
    terms: &'a [DerivTerms],
}

impl OdeSolverSystem<DVector<f64>> for OdeAdapter<'_> {
    fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        for (i, term) in self.terms.iter().enumerate() {
            dy[i] = term.eval(y.as_slice(), t);
        }
    }
}

/// Number of internal Dopri5 steps requested per checkpoint segment.
/// Adaptive step control still governs accuracy; this only bounds how
/// finely `solout` could sample if it were used.
const ODE_STEPS_PER_SEGMENT: f64 = 100.0;
const ODE_REL_TOL: f64 = 1e-6;
const ODE_ABS_TOL: f64 = 1e-6;

/// Drives an ODE system (Dormand-Prince 5th order, via `ode_solvers`)
/// through a checkpoint schedule, firing reporters between segments.
pub struct OdeSimulation {
    reporters: Vec<Box<dyn Reporter>>,
}

impl OdeSimulation {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        OdeSimulation { reporters }
    }

    pub fn into_reporters(self) -> Vec<Box<dyn Reporter>> {
        self.reporters
    }

    /// Integrates `terms` from `y0` to `t_end`, firing reporters at
    /// each checkpoint. Returns the final state vector.
    pub fn run(&mut self, terms: &[DerivTerms], y0: Vec<f64>, t_end: f64) -> Result<Vec<f64>> {
        let frequencies: Vec<f64> = self.reporters.iter().map(|r| r.frequency()).collect();
        let checkpoints = checkpoint_schedule(t_end, &frequencies);

        let mut y = DVector::from_vec(y0);
        fire_due(&mut self.reporters, 0.0, y.as_slice());

        for window in checkpoints.windows(2) {
            let (t0, t1) = (window[0], window[1]);
            if t1 - t0 > CHECKPOINT_EPS {
                let adapter = OdeAdapter { terms };
                let dx = ((t1 - t0) / ODE_STEPS_PER_SEGMENT).max(1e-9);
                let mut solver = Dopri5::new(adapter, t0, t1, dx, y.clone(), ODE_REL_TOL, ODE_ABS_TOL);
                solver.integrate().map_err(RxnError::IntegratorFailure)?;
                y = solver.y_out().last().cloned().ok_or_else(|| {
                    RxnError::IntegratorFailure("integrator produced no output".to_string())
                })?;
            }
            fire_due(&mut self.reporters, t1, y.as_slice());
        }

        Ok(y.as_slice().to_vec())
    }
}

/// Drives an exact Gillespie simulation through a checkpoint schedule.
/// Reservoir-sourced transport rates are recomputed at the start of
/// each segment from the reservoir's concentration at that time, and
/// held fixed for the duration of the segment (an exact-SSA interval
/// requires constant propensities; see `gillespie::ReservoirProcess`).
pub struct GillespieSimulation {
    reporters: Vec<Box<dyn Reporter>>,
}

impl GillespieSimulation {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        GillespieSimulation { reporters }
    }

    pub fn into_reporters(self) -> Vec<Box<dyn Reporter>> {
        self.reporters
    }

    pub fn run(
        &mut self,
        base_processes: &[Process],
        reservoir_processes: &[ReservoirProcess],
        q0: Vec<i64>,
        t_end: f64,
        rng: &mut impl Rng,
    ) -> Vec<i64> {
        let frequencies: Vec<f64> = self.reporters.iter().map(|r| r.frequency()).collect();
        let checkpoints = checkpoint_schedule(t_end, &frequencies);

        let mut state = q0;
        let to_f64 = |s: &[i64]| s.iter().map(|&x| x as f64).collect::<Vec<_>>();
        fire_due(&mut self.reporters, 0.0, &to_f64(&state));

        for window in checkpoints.windows(2) {
            let (t0, t1) = (window[0], window[1]);
            if t1 - t0 > CHECKPOINT_EPS {
                let mut processes = base_processes.to_vec();
                for rp in reservoir_processes {
                    let rate = rp.prefactor * rp.source.conc(t0);
                    processes.push(Process { rate, multiplicities: Vec::new(), deltas: rp.deltas.clone() });
                }
                let mut engine = Engine::new(processes, state);
                engine.advance(t1 - t0, rng);
                state = engine.state().to_vec();
            }
            fire_due(&mut self.reporters, t1, &to_f64(&state));
        }

        state
    }
}
