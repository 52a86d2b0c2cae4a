//! Validation Run
//!
//! The straight-line check of one synthesis backend against a reference:
//!
//! 1. load the plant `A.csv` .. `D.csv` and report its dimensions
//! 2. synthesize a controller with the configured partition
//! 3. load the reference controller (`K1_A.csv` .. by default)
//! 4. compare controller and reference by frequency response
//! 5. compare the returned closed loop with one rebuilt from plant and controller
//!
//! Any error aborts the run. There is no retry: every step is deterministic
//! for fixed inputs.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::compare::{compare_frequency_response, ComparisonReport, FrequencyGrid, Tolerance};
use crate::error::{Error, Result};
use crate::io::{load_reference, load_system};
use crate::sb::{hinfsyn, HinfSolution, HinfSynthesizer};
use crate::ss::{Partition, StateSpace};

/// Fixed parameters of a validation run.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationCase {
    /// Directory holding the plant and reference CSV files
    pub data_dir: PathBuf,
    /// Label of the reference controller files (`<label>_A.csv` ..)
    pub reference: String,
    pub nmeas: usize,
    pub ncon: usize,
    pub grid: FrequencyGrid,
    pub tolerance: Tolerance,
}

impl Default for ValidationCase {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            reference: "K1".to_string(),
            nmeas: 2,
            ncon: 1,
            grid: FrequencyGrid::default(),
            tolerance: Tolerance::default(),
        }
    }
}

impl ValidationCase {
    /// Default case reading from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

/// Dimensions of a loaded plant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlantSummary {
    pub inputs: usize,
    pub outputs: usize,
    pub states: usize,
}

impl From<&StateSpace> for PlantSummary {
    fn from(plant: &StateSpace) -> Self {
        Self {
            inputs: plant.n_inputs(),
            outputs: plant.n_outputs(),
            states: plant.n_states(),
        }
    }
}

impl fmt::Display for PlantSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of inputs: {}", self.inputs)?;
        writeln!(f, "Number of outputs: {}", self.outputs)?;
        write!(f, "Number of states: {}", self.states)
    }
}

/// Everything a successful run produced.
#[derive(Clone, Debug)]
pub struct ValidationReport {
    pub summary: PlantSummary,
    pub solution: HinfSolution,
    pub reference: StateSpace,
    /// Synthesized controller against the reference controller
    pub controller: ComparisonReport,
    /// Returned closed loop against lower_lft(plant, controller)
    pub closed_loop: ComparisonReport,
    pub closed_loop_stable: bool,
}

/// Run one validation case against `synthesizer`, writing the console
/// report to `out`.
///
/// # Errors
///
/// Loading, dimension, synthesis and comparison failures are returned as
/// they occur; see [`Error`].
pub fn run<S, W>(case: &ValidationCase, synthesizer: &S, out: &mut W) -> Result<ValidationReport>
where
    S: HinfSynthesizer + ?Sized,
    W: Write,
{
    let plant = load_system(&case.data_dir, "")?;
    let summary = PlantSummary::from(&plant);
    writeln!(out, "{summary}").map_err(Error::Output)?;
    info!(
        inputs = summary.inputs,
        outputs = summary.outputs,
        states = summary.states,
        "plant loaded"
    );

    let solution = hinfsyn(synthesizer, &plant, case.nmeas, case.ncon)?;
    let reference = load_reference(&case.data_dir, &case.reference)?;

    let controller = compare_frequency_response(
        "controller",
        &solution.controller,
        &reference,
        &case.grid,
        &case.tolerance,
    )?
    .ensure()?;

    let partition = Partition::new(&plant, case.nmeas, case.ncon)?;
    let rebuilt = plant.lower_lft(&solution.controller, partition)?;
    let closed_loop = compare_frequency_response(
        "closed loop",
        &solution.closed_loop,
        &rebuilt,
        &case.grid,
        &case.tolerance,
    )?
    .ensure()?;

    let closed_loop_stable = solution.closed_loop.is_stable()?;
    if !closed_loop_stable {
        warn!(gamma = solution.gamma, "closed loop returned by synthesis is unstable");
    }

    writeln!(
        out,
        "gamma = {:.6}, controller matches {} (max abs error {:.3e})",
        solution.gamma, case.reference, controller.max_abs_error
    )
    .map_err(Error::Output)?;

    Ok(ValidationReport {
        summary,
        solution,
        reference,
        controller,
        closed_loop,
        closed_loop_stable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_default_case() {
        let case = ValidationCase::default();
        assert_eq!(case.data_dir, PathBuf::from("data"));
        assert_eq!(case.reference, "K1");
        assert_eq!(case.nmeas, 2);
        assert_eq!(case.ncon, 1);
    }

    #[test]
    fn test_summary_lines() {
        let plant = StateSpace::new(
            ndarray::Array2::eye(4),
            ndarray::Array2::zeros((4, 2)),
            ndarray::Array2::zeros((3, 4)),
            ndarray::Array2::zeros((3, 2)),
        )
        .unwrap();
        let summary = PlantSummary::from(&plant);
        assert_eq!(
            summary.to_string(),
            "Number of inputs: 2\nNumber of outputs: 3\nNumber of states: 4"
        );
    }

    #[test]
    fn test_summary_matches_matrix_shapes() {
        let plant = StateSpace::new(
            arr2(&[[-1.0]]),
            arr2(&[[1.0, 0.0, 2.0]]),
            arr2(&[[1.0], [0.0]]),
            ndarray::Array2::zeros((2, 3)),
        )
        .unwrap();
        let summary = PlantSummary::from(&plant);
        assert_eq!(summary.inputs, plant.b().ncols());
        assert_eq!(summary.outputs, plant.c().nrows());
        assert_eq!(summary.states, plant.a().nrows());
    }

    #[test]
    fn test_missing_data_dir_reports_plant_file() {
        struct Unused;

        impl HinfSynthesizer for Unused {
            fn name(&self) -> &str {
                "unused"
            }

            fn synthesize(
                &self,
                _plant: &StateSpace,
                _partition: Partition,
            ) -> std::result::Result<HinfSolution, crate::sb::SynthesisError> {
                unreachable!("plant never loads")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let case = ValidationCase::new(dir.path());
        let mut out = Vec::new();
        match run(&case, &Unused, &mut out) {
            Err(Error::NotFound { path }) => assert!(path.ends_with("A.csv")),
            other => panic!("expected not found, got {:?}", other.map(|r| r.summary)),
        }
        assert!(out.is_empty());
    }
}
