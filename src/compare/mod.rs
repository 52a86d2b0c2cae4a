//! Controller Comparison
//!
//! Two state-space realizations of the same transfer matrix need not share
//! (A, B, C, D): realizations are unique only up to a similarity
//! transformation. Tools computing the same controller therefore agree on
//! its frequency response, not on its matrices.
//!
//! [`compare_frequency_response`] samples both transfer matrices on a grid
//! of frequencies and is the default comparison. [`compare_realization`]
//! compares raw matrix entries and is only meaningful when both tools are
//! known to produce the same realization.
//!
//! Entries are checked the way `numpy.isclose` does:
//!
//! ```text
//!     |x - x_ref| <= atol + rtol * |x_ref|
//! ```

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ss::StateSpace;

/// Absolute and relative tolerance for entrywise comparison.
///
/// The default (`rtol = 1e-4`, `atol = 1e-6`) suits references that differ
/// from the computed controller only by rounding, such as a change of state
/// coordinates. Independent synthesis tools end their gamma search at
/// different points: MATLAB's `hinfsyn` stops within 1% of the optimal gamma
/// by default. Against such a reference, widen `rtol` to the tool's gamma
/// tolerance, e.g. `Tolerance::new(1e-2, 1e-6)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerance {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    /// Largest deviation allowed from `reference`.
    pub fn bound(&self, reference: f64) -> f64 {
        self.atol + self.rtol * reference.abs()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-4,
            atol: 1e-6,
        }
    }
}

/// Angular frequencies (rad/s) at which responses are sampled.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyGrid {
    omegas: Vec<f64>,
}

impl FrequencyGrid {
    /// `points` frequencies spaced evenly in log10 between `10^lo_decade`
    /// and `10^hi_decade`, both included.
    pub fn logspace(lo_decade: f64, hi_decade: f64, points: usize) -> Self {
        let omegas = match points {
            0 => Vec::new(),
            1 => vec![10f64.powf(lo_decade)],
            _ => {
                let step = (hi_decade - lo_decade) / (points - 1) as f64;
                (0..points)
                    .map(|i| 10f64.powf(lo_decade + step * i as f64))
                    .collect()
            }
        };
        Self { omegas }
    }

    /// Grid over explicitly chosen frequencies, e.g. around a known resonance.
    pub fn from_points(omegas: Vec<f64>) -> Self {
        Self { omegas }
    }

    pub fn omegas(&self) -> &[f64] {
        &self.omegas
    }

    pub fn len(&self) -> usize {
        self.omegas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.omegas.is_empty()
    }
}

impl Default for FrequencyGrid {
    /// 200 points over [1e-3, 1e3] rad/s.
    fn default() -> Self {
        Self::logspace(-3.0, 3.0, 200)
    }
}

/// Outcome of comparing a system against a reference.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonReport {
    /// What was compared, used in mismatch errors
    pub subject: String,
    /// Number of scalar entries checked
    pub samples: usize,
    /// Number of entries outside the tolerance
    pub violations: usize,
    pub max_abs_error: f64,
    pub max_rel_error: f64,
    /// Frequency of the worst absolute error (None for realization comparisons)
    pub worst_omega: Option<f64>,
    /// Matrix entry (row, col) of the worst absolute error
    pub worst_entry: Option<(usize, usize)>,
}

impl ComparisonReport {
    fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            samples: 0,
            violations: 0,
            max_abs_error: 0.0,
            max_rel_error: 0.0,
            worst_omega: None,
            worst_entry: None,
        }
    }

    fn record(
        &mut self,
        abs_error: f64,
        reference: f64,
        tolerance: &Tolerance,
        at: (Option<f64>, (usize, usize)),
    ) {
        self.samples += 1;
        // NaN compares false, so it must be caught explicitly
        if abs_error.is_nan() || abs_error > tolerance.bound(reference) {
            self.violations += 1;
        }
        if abs_error.is_nan() || abs_error > self.max_abs_error {
            self.max_abs_error = abs_error;
            self.worst_omega = at.0;
            self.worst_entry = Some(at.1);
        }
        if reference.abs() > 0.0 {
            self.max_rel_error = self.max_rel_error.max(abs_error / reference.abs());
        }
    }

    /// True when every sample is within tolerance.
    pub fn is_match(&self) -> bool {
        self.violations == 0
    }

    /// Turn a failing report into [`Error::ResponseMismatch`].
    pub fn ensure(self) -> Result<Self> {
        if self.is_match() {
            Ok(self)
        } else {
            Err(Error::ResponseMismatch {
                subject: self.subject,
                max_abs_error: self.max_abs_error,
                max_rel_error: self.max_rel_error,
                omega: self.worst_omega,
                entry: self.worst_entry,
                violations: self.violations,
                samples: self.samples,
            })
        }
    }
}

fn require_same_io(system: &StateSpace, reference: &StateSpace) -> Result<()> {
    if system.n_inputs() != reference.n_inputs() {
        return Err(Error::DimensionMismatch {
            left: "inputs(system)",
            left_dim: system.n_inputs(),
            right: "inputs(reference)",
            right_dim: reference.n_inputs(),
        });
    }
    if system.n_outputs() != reference.n_outputs() {
        return Err(Error::DimensionMismatch {
            left: "outputs(system)",
            left_dim: system.n_outputs(),
            right: "outputs(reference)",
            right_dim: reference.n_outputs(),
        });
    }
    Ok(())
}

/// Compare the frequency responses of `system` and `reference` on `grid`.
///
/// State counts may differ; input and output counts must agree.
///
/// # Examples
///
/// ```
/// use hinfsyn_check::compare::{compare_frequency_response, FrequencyGrid, Tolerance};
/// use hinfsyn_check::ss::StateSpace;
/// use ndarray::arr2;
///
/// let sys = StateSpace::new(arr2(&[[-2.0]]), arr2(&[[1.0]]), arr2(&[[3.0]]), arr2(&[[0.0]])).unwrap();
/// // Same transfer function 3 / (s + 2) with the gain moved into B
/// let other = StateSpace::new(arr2(&[[-2.0]]), arr2(&[[3.0]]), arr2(&[[1.0]]), arr2(&[[0.0]])).unwrap();
///
/// let report = compare_frequency_response(
///     "controller",
///     &sys,
///     &other,
///     &FrequencyGrid::default(),
///     &Tolerance::default(),
/// )
/// .unwrap();
/// assert!(report.is_match());
/// ```
pub fn compare_frequency_response(
    subject: &str,
    system: &StateSpace,
    reference: &StateSpace,
    grid: &FrequencyGrid,
    tolerance: &Tolerance,
) -> Result<ComparisonReport> {
    require_same_io(system, reference)?;

    let mut report = ComparisonReport::new(subject);
    for &omega in grid.omegas() {
        let g = system.frequency_response(omega)?;
        let g_ref = reference.frequency_response(omega)?;
        record_complex(&mut report, &g, &g_ref, tolerance, omega);
    }

    debug!(
        subject,
        samples = report.samples,
        violations = report.violations,
        max_abs_error = report.max_abs_error,
        "frequency response comparison"
    );
    Ok(report)
}

fn record_complex(
    report: &mut ComparisonReport,
    g: &Array2<Complex64>,
    g_ref: &Array2<Complex64>,
    tolerance: &Tolerance,
    omega: f64,
) {
    for ((idx, x), y) in g.indexed_iter().zip(g_ref.iter()) {
        report.record((x - y).norm(), y.norm(), tolerance, (Some(omega), idx));
    }
}

/// Compare the matrices (A, B, C, D) of `system` and `reference` entrywise.
///
/// Only meaningful when both were produced with the same realization
/// convention. State, input and output counts must agree.
pub fn compare_realization(
    subject: &str,
    system: &StateSpace,
    reference: &StateSpace,
    tolerance: &Tolerance,
) -> Result<ComparisonReport> {
    require_same_io(system, reference)?;
    if system.n_states() != reference.n_states() {
        return Err(Error::DimensionMismatch {
            left: "states(system)",
            left_dim: system.n_states(),
            right: "states(reference)",
            right_dim: reference.n_states(),
        });
    }

    let mut report = ComparisonReport::new(subject);
    let pairs = [
        (system.a(), reference.a()),
        (system.b(), reference.b()),
        (system.c(), reference.c()),
        (system.d(), reference.d()),
    ];
    for (m, m_ref) in pairs {
        for ((idx, x), y) in m.indexed_iter().zip(m_ref.iter()) {
            report.record((x - y).abs(), *y, tolerance, (None, idx));
        }
    }

    debug!(
        subject,
        samples = report.samples,
        violations = report.violations,
        max_abs_error = report.max_abs_error,
        "realization comparison"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn controller() -> StateSpace {
        StateSpace::new(
            arr2(&[[-5.0, 0.0], [1.0, -6.0]]),
            arr2(&[[1.0, 0.0], [0.0, 1.0]]),
            arr2(&[[0.5, -0.25]]),
            arr2(&[[0.0, 0.0]]),
        )
        .unwrap()
    }

    #[test]
    fn test_logspace_endpoints() {
        let grid = FrequencyGrid::logspace(-2.0, 2.0, 5);
        assert_eq!(grid.len(), 5);
        assert_relative_eq!(grid.omegas()[0], 0.01, max_relative = 1e-12);
        assert_relative_eq!(grid.omegas()[2], 1.0, max_relative = 1e-12);
        assert_relative_eq!(grid.omegas()[4], 100.0, max_relative = 1e-12);
        assert!(FrequencyGrid::logspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_default_grid() {
        let grid = FrequencyGrid::default();
        assert_eq!(grid.len(), 200);
        assert_relative_eq!(grid.omegas()[199], 1e3, max_relative = 1e-12);
    }

    #[test]
    fn test_identical_systems_match_exactly() {
        let k = controller();
        let report =
            compare_frequency_response("k", &k, &k, &FrequencyGrid::default(), &Tolerance::default())
                .unwrap();
        assert!(report.is_match());
        assert_eq!(report.samples, 200 * 2);
        assert_eq!(report.max_abs_error, 0.0);
    }

    #[test]
    fn test_similar_realizations_match_by_response_only() {
        let k = controller();
        let t = arr2(&[[2.0, 1.0], [0.0, 1.0]]);
        let k2 = k.similarity_transform(&t).unwrap();
        let tol = Tolerance::default();

        let by_response =
            compare_frequency_response("k", &k2, &k, &FrequencyGrid::default(), &tol).unwrap();
        assert!(by_response.is_match());

        let by_matrices = compare_realization("k", &k2, &k, &tol).unwrap();
        assert!(!by_matrices.is_match());
        assert!(by_matrices.worst_omega.is_none());
    }

    #[test]
    fn test_gain_change_is_detected() {
        let k = controller();
        let scaled = StateSpace::new(
            k.a().clone(),
            k.b().clone(),
            k.c() * 1.01,
            k.d().clone(),
        )
        .unwrap();

        let report = compare_frequency_response(
            "k",
            &scaled,
            &k,
            &FrequencyGrid::default(),
            &Tolerance::default(),
        )
        .unwrap();
        assert!(!report.is_match());
        assert_relative_eq!(report.max_rel_error, 0.01, max_relative = 1e-6);

        match report.ensure() {
            Err(Error::ResponseMismatch { subject, omega, .. }) => {
                assert_eq!(subject, "k");
                assert!(omega.is_some());
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatch_reports_worst_entry() {
        let k = controller();
        // Second input channel perturbed through B
        let detuned = StateSpace::new(
            k.a().clone(),
            arr2(&[[1.0, 0.0], [0.0, 1.5]]),
            k.c().clone(),
            k.d().clone(),
        )
        .unwrap();
        let grid = FrequencyGrid::from_points(vec![0.1, 1.0, 10.0]);

        let report =
            compare_frequency_response("k", &detuned, &k, &grid, &Tolerance::default()).unwrap();
        assert_eq!(report.samples, 3 * 2);
        assert_eq!(report.worst_entry, Some((0, 1)));

        match report.ensure() {
            Err(Error::ResponseMismatch { entry, omega, .. }) => {
                assert_eq!(entry, Some((0, 1)));
                assert!(grid.omegas().contains(&omega.unwrap()));
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_io_mismatch_rejected() {
        let k = controller();
        let siso = StateSpace::new(arr2(&[[-1.0]]), arr2(&[[1.0]]), arr2(&[[1.0]]), arr2(&[[0.0]]))
            .unwrap();
        assert!(matches!(
            compare_frequency_response("k", &k, &siso, &FrequencyGrid::default(), &Tolerance::default()),
            Err(Error::DimensionMismatch {
                left: "inputs(system)",
                ..
            })
        ));
    }

    #[test]
    fn test_realization_requires_equal_state_count() {
        let k = controller();
        let static_k = StateSpace::new(
            Array2::zeros((0, 0)),
            Array2::zeros((0, 2)),
            Array2::zeros((1, 0)),
            arr2(&[[0.0, 0.0]]),
        )
        .unwrap();
        assert!(matches!(
            compare_realization("k", &k, &static_k, &Tolerance::default()),
            Err(Error::DimensionMismatch {
                left: "states(system)",
                ..
            })
        ));
    }

    #[test]
    fn test_tolerance_bound() {
        let tol = Tolerance::new(1e-3, 1e-8);
        assert_relative_eq!(tol.bound(-2.0), 1e-8 + 2e-3);
    }
}
