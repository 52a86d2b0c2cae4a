//! Synthesis Routines - Chapter SB
//!
//! This module is the boundary to an external H-infinity synthesis routine.
//! The mathematics (Riccati solves, gamma iteration) lives in the backend;
//! this crate only defines the contract and checks both sides of it.
//!
//! A backend implements [`HinfSynthesizer`]. Callers go through [`hinfsyn`],
//! which validates the partition before the backend runs and validates the
//! returned [`HinfSolution`] afterwards. Backend failures are propagated
//! unchanged, never retried: synthesis is deterministic for fixed inputs.

use ndarray::Array1;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ss::{Partition, StateSpace};

/// Failure modes a synthesis backend may report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// A Riccati equation or another step could not be solved reliably
    #[error("numerically singular problem during {stage}")]
    Singular { stage: String },

    /// No stabilizing controller exists for the requested partition
    #[error("no stabilizing controller exists{}", gamma_note(.gamma))]
    Infeasible { gamma: Option<f64> },

    /// The backend rejected the partition (e.g. rank conditions on D12/D21)
    #[error("backend rejected the partition: {0}")]
    InvalidPartition(String),

    #[error("{0}")]
    Backend(String),
}

fn gamma_note(gamma: &Option<f64>) -> String {
    match gamma {
        Some(g) => format!(" (gamma search stopped at {g})"),
        None => String::new(),
    }
}

/// Output of one synthesis call.
#[derive(Clone, Debug)]
pub struct HinfSolution {
    /// Controller: nmeas inputs, ncon outputs
    pub controller: StateSpace,
    /// Closed loop from the remaining plant inputs to the remaining outputs
    pub closed_loop: StateSpace,
    /// Achieved bound on the closed-loop infinity norm
    pub gamma: f64,
    /// Reciprocal condition numbers of the underlying solves
    pub rcond: Array1<f64>,
}

/// An H-infinity synthesis routine.
pub trait HinfSynthesizer {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Compute a controller for `plant` with the given partition.
    ///
    /// The partition has already been checked against the plant.
    fn synthesize(
        &self,
        plant: &StateSpace,
        partition: Partition,
    ) -> std::result::Result<HinfSolution, SynthesisError>;
}

impl<S: HinfSynthesizer + ?Sized> HinfSynthesizer for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn synthesize(
        &self,
        plant: &StateSpace,
        partition: Partition,
    ) -> std::result::Result<HinfSolution, SynthesisError> {
        (**self).synthesize(plant, partition)
    }
}

/// Run H-infinity synthesis for `plant` through `synthesizer`.
///
/// # Arguments
///
/// * `synthesizer` - Backend performing the actual synthesis
/// * `plant` - Generalized plant
/// * `nmeas` - Number of measured outputs (last `nmeas` rows of C), in [1, ny]
/// * `ncon` - Number of control inputs (last `ncon` columns of B), in [1, nu]
///
/// # Errors
///
/// * [`Error::InvalidPartition`] - `nmeas` or `ncon` out of range; the
///   backend is not called
/// * [`Error::Synthesis`] - the backend reported a failure
/// * [`Error::ContractViolation`] - the backend returned a result of the
///   wrong shape, a negative or non-finite gamma, or an invalid
///   conditioning indicator
pub fn hinfsyn<S: HinfSynthesizer + ?Sized>(
    synthesizer: &S,
    plant: &StateSpace,
    nmeas: usize,
    ncon: usize,
) -> Result<HinfSolution> {
    let partition = Partition::new(plant, nmeas, ncon)?;
    debug!(
        backend = synthesizer.name(),
        nmeas,
        ncon,
        states = plant.n_states(),
        "invoking synthesis"
    );

    let solution = synthesizer
        .synthesize(plant, partition)
        .map_err(|source| Error::Synthesis {
            backend: synthesizer.name().to_string(),
            source,
        })?;

    check_solution(plant, partition, &solution)?;
    info!(
        backend = synthesizer.name(),
        gamma = solution.gamma,
        controller_states = solution.controller.n_states(),
        "synthesis finished"
    );
    Ok(solution)
}

fn check_solution(plant: &StateSpace, partition: Partition, solution: &HinfSolution) -> Result<()> {
    let (nmeas, ncon) = (partition.nmeas(), partition.ncon());
    let k = &solution.controller;
    if k.n_inputs() != nmeas || k.n_outputs() != ncon {
        return Err(Error::ContractViolation(format!(
            "controller has {} inputs and {} outputs, expected {} and {}",
            k.n_inputs(),
            k.n_outputs(),
            nmeas,
            ncon
        )));
    }

    let cl = &solution.closed_loop;
    let (nw, nz) = (plant.n_inputs() - ncon, plant.n_outputs() - nmeas);
    if cl.n_inputs() != nw || cl.n_outputs() != nz {
        return Err(Error::ContractViolation(format!(
            "closed loop has {} inputs and {} outputs, expected {} and {}",
            cl.n_inputs(),
            cl.n_outputs(),
            nw,
            nz
        )));
    }

    if !solution.gamma.is_finite() || solution.gamma < 0.0 {
        return Err(Error::ContractViolation(format!(
            "gamma = {} is not a finite non-negative number",
            solution.gamma
        )));
    }

    if solution.rcond.is_empty() || solution.rcond.iter().any(|r| !r.is_finite() || *r < 0.0) {
        return Err(Error::ContractViolation(format!(
            "conditioning indicator {} is not a non-empty set of finite non-negative numbers",
            solution.rcond
        )));
    }

    Ok(())
}
