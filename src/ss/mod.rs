//! State-Space Models
//!
//! This module holds the linear time-invariant model
//!
//! ```text
//!     dx/dt = A*x + B*u
//!         y = C*x + D*u
//! ```
//!
//! together with the few operations a validation run needs on it:
//! transfer-matrix evaluation, poles, similarity transformation and the
//! lower linear fractional transformation that closes a feedback loop.
//!
//! Shape checks are explicit. A model that exists is dimensionally
//! consistent, so no later operation relies on the array library to
//! complain about shapes at use time.

use ndarray::{s, Array1, Array2};
use ndarray_linalg::{Eig, FactorizeInto, Inverse, Solve};
use num_complex::Complex64;

use crate::error::{Error, Result};

/// Continuous-time state-space model (A, B, C, D).
#[derive(Clone, Debug, PartialEq)]
pub struct StateSpace {
    a: Array2<f64>,
    b: Array2<f64>,
    c: Array2<f64>,
    d: Array2<f64>,
}

/// Return `DimensionMismatch` unless both sides agree.
fn require(left: &'static str, left_dim: usize, right: &'static str, right_dim: usize) -> Result<()> {
    if left_dim == right_dim {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            left,
            left_dim,
            right,
            right_dim,
        })
    }
}

impl StateSpace {
    /// Build a model from its four matrices.
    ///
    /// # Arguments
    ///
    /// * `a` - N×N state matrix
    /// * `b` - N×M input matrix
    /// * `c` - P×N output matrix
    /// * `d` - P×M feedthrough matrix
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] naming the first pair of dimensions that
    /// disagree. Checks run in the order: A square, rows(B), cols(C),
    /// rows(D), cols(D).
    ///
    /// # Examples
    ///
    /// ```
    /// use hinfsyn_check::ss::StateSpace;
    /// use ndarray::arr2;
    ///
    /// let sys = StateSpace::new(
    ///     arr2(&[[0.0, 1.0], [-2.0, -3.0]]),
    ///     arr2(&[[0.0], [1.0]]),
    ///     arr2(&[[1.0, 0.0]]),
    ///     arr2(&[[0.0]]),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(sys.n_states(), 2);
    /// assert_eq!(sys.n_inputs(), 1);
    /// assert_eq!(sys.n_outputs(), 1);
    /// ```
    pub fn new(a: Array2<f64>, b: Array2<f64>, c: Array2<f64>, d: Array2<f64>) -> Result<Self> {
        let n = a.nrows();
        require("cols(A)", a.ncols(), "rows(A)", n)?;
        require("rows(B)", b.nrows(), "rows(A)", n)?;
        require("cols(C)", c.ncols(), "rows(A)", n)?;
        require("rows(D)", d.nrows(), "rows(C)", c.nrows())?;
        require("cols(D)", d.ncols(), "cols(B)", b.ncols())?;
        Ok(Self { a, b, c, d })
    }

    /// Number of states n = rows(A).
    pub fn n_states(&self) -> usize {
        self.a.nrows()
    }

    /// Number of inputs nu = cols(B).
    pub fn n_inputs(&self) -> usize {
        self.b.ncols()
    }

    /// Number of outputs ny = rows(C).
    pub fn n_outputs(&self) -> usize {
        self.c.nrows()
    }

    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    pub fn b(&self) -> &Array2<f64> {
        &self.b
    }

    pub fn c(&self) -> &Array2<f64> {
        &self.c
    }

    pub fn d(&self) -> &Array2<f64> {
        &self.d
    }

    /// Evaluate the transfer matrix G(s) = C*(sI - A)^(-1)*B + D at a complex point.
    ///
    /// (sI - A) is LU-factorized once and solved against each column of B.
    /// Fails if `s` is an eigenvalue of A.
    pub fn evaluate(&self, s: Complex64) -> Result<Array2<Complex64>> {
        let n = self.n_states();
        let mut g = self.d.mapv(Complex64::from);
        if n == 0 {
            return Ok(g);
        }

        let mut resolvent = self.a.mapv(|v| Complex64::from(-v));
        for i in 0..n {
            resolvent[(i, i)] += s;
        }
        let lu = resolvent
            .factorize_into()
            .map_err(Error::linalg(format!("factorizing sI - A at s = {s}")))?;

        let c = self.c.mapv(Complex64::from);
        for (j, column) in self.b.columns().into_iter().enumerate() {
            let x = lu
                .solve(&column.mapv(Complex64::from))
                .map_err(Error::linalg(format!("solving (sI - A) x = b at s = {s}")))?;
            let mut g_col = g.column_mut(j);
            g_col += &c.dot(&x);
        }
        Ok(g)
    }

    /// Frequency response G(jω).
    pub fn frequency_response(&self, omega: f64) -> Result<Array2<Complex64>> {
        self.evaluate(Complex64::new(0.0, omega))
    }

    /// Eigenvalues of A.
    pub fn poles(&self) -> Result<Array1<Complex64>> {
        if self.n_states() == 0 {
            return Ok(Array1::zeros(0));
        }
        let (poles, _) = self
            .a
            .eig()
            .map_err(Error::linalg("computing eigenvalues of A"))?;
        Ok(poles)
    }

    /// True when every pole lies in the open left half-plane.
    pub fn is_stable(&self) -> Result<bool> {
        Ok(self.poles()?.iter().all(|p| p.re < 0.0))
    }

    /// Change of state coordinates x' = T*x.
    ///
    /// Returns (T*A*T^(-1), T*B, C*T^(-1), D), which realizes the same
    /// transfer matrix.
    pub fn similarity_transform(&self, t: &Array2<f64>) -> Result<Self> {
        let n = self.n_states();
        require("rows(T)", t.nrows(), "rows(A)", n)?;
        require("cols(T)", t.ncols(), "rows(A)", n)?;
        if n == 0 {
            return Ok(self.clone());
        }

        let t_inv = t
            .inv()
            .map_err(Error::linalg("inverting the transformation T"))?;
        Ok(Self {
            a: t.dot(&self.a).dot(&t_inv),
            b: t.dot(&self.b),
            c: self.c.dot(&t_inv),
            d: self.d.clone(),
        })
    }

    /// Close the lower loop of this plant with controller `k`.
    ///
    /// The plant is partitioned as
    ///
    /// ```text
    ///     [ z  ]   [ D11  D12 ] [ w  ]          inputs  = [w; u]  (u: last ncon)
    ///     [ y  ] = [ D21  D22 ] [ u  ] + C*x    outputs = [z; y]  (y: last nmeas)
    /// ```
    ///
    /// and `k` maps the measurements y to the controls u. The result maps
    /// w to z with state `[x; xk]`.
    ///
    /// # Errors
    ///
    /// * [`Error::DimensionMismatch`] - `k` does not have nmeas inputs and ncon outputs
    /// * [`Error::IllPosedLoop`] - I - Dk*D22 is singular
    ///
    /// # Algorithm
    ///
    /// With S = (I - Dk*D22)^(-1) the control signal is
    ///
    /// ```text
    ///     u = S*Dk*C2 * x  +  S*Ck * xk  +  S*Dk*D21 * w
    /// ```
    ///
    /// which is substituted into the plant and controller state equations.
    pub fn lower_lft(&self, k: &StateSpace, partition: Partition) -> Result<StateSpace> {
        // The partition may have been built against another plant
        let Partition { nmeas, ncon } = Partition::new(self, partition.nmeas, partition.ncon)?;
        require("inputs(K)", k.n_inputs(), "nmeas", nmeas)?;
        require("outputs(K)", k.n_outputs(), "ncon", ncon)?;

        let n = self.n_states();
        let nk = k.n_states();
        let nz = self.n_outputs() - nmeas;
        let nw = self.n_inputs() - ncon;

        let b1 = self.b.slice(s![.., ..nw]);
        let b2 = self.b.slice(s![.., nw..]);
        let c1 = self.c.slice(s![..nz, ..]);
        let c2 = self.c.slice(s![nz.., ..]);
        let d11 = self.d.slice(s![..nz, ..nw]);
        let d12 = self.d.slice(s![..nz, nw..]);
        let d21 = self.d.slice(s![nz.., ..nw]);
        let d22 = self.d.slice(s![nz.., nw..]);

        let r = Array2::<f64>::eye(ncon) - k.d.dot(&d22);
        let s_inv = r.inv().map_err(|_| Error::IllPosedLoop)?;

        let ux = s_inv.dot(&k.d.dot(&c2));
        let uk = s_inv.dot(&k.c);
        let uw = s_inv.dot(&k.d.dot(&d21));

        // Measurement y expressed in (x, xk, w)
        let yx = &c2 + &d22.dot(&ux);
        let yk = d22.dot(&uk);
        let yw = &d21 + &d22.dot(&uw);

        let mut a = Array2::zeros((n + nk, n + nk));
        a.slice_mut(s![..n, ..n]).assign(&(&self.a + &b2.dot(&ux)));
        a.slice_mut(s![..n, n..]).assign(&b2.dot(&uk));
        a.slice_mut(s![n.., ..n]).assign(&k.b.dot(&yx));
        a.slice_mut(s![n.., n..]).assign(&(&k.a + &k.b.dot(&yk)));

        let mut b = Array2::zeros((n + nk, nw));
        b.slice_mut(s![..n, ..]).assign(&(&b1 + &b2.dot(&uw)));
        b.slice_mut(s![n.., ..]).assign(&k.b.dot(&yw));

        let mut c = Array2::zeros((nz, n + nk));
        c.slice_mut(s![.., ..n]).assign(&(&c1 + &d12.dot(&ux)));
        c.slice_mut(s![.., n..]).assign(&d12.dot(&uk));

        let d = &d11 + &d12.dot(&uw);

        StateSpace::new(a, b, c, d)
    }
}

/// Split of a plant's outputs and inputs between performance channels and
/// the feedback loop.
///
/// The last `nmeas` outputs are measurements fed to the controller and the
/// last `ncon` inputs are control actions produced by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    nmeas: usize,
    ncon: usize,
}

impl Partition {
    /// Validate `1 <= nmeas <= ny` and `1 <= ncon <= nu` for `plant`.
    pub fn new(plant: &StateSpace, nmeas: usize, ncon: usize) -> Result<Self> {
        let ny = plant.n_outputs();
        if nmeas == 0 || nmeas > ny {
            return Err(Error::InvalidPartition {
                name: "nmeas",
                value: nmeas,
                max: ny,
            });
        }
        let nu = plant.n_inputs();
        if ncon == 0 || ncon > nu {
            return Err(Error::InvalidPartition {
                name: "ncon",
                value: ncon,
                max: nu,
            });
        }
        Ok(Self { nmeas, ncon })
    }

    /// Number of measured outputs.
    pub fn nmeas(&self) -> usize {
        self.nmeas
    }

    /// Number of control inputs.
    pub fn ncon(&self) -> usize {
        self.ncon
    }
}
