//! Error type shared by every stage of a validation run.

use std::path::PathBuf;

use ndarray_linalg::error::LinalgError;
use thiserror::Error;

use crate::sb::SynthesisError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited text in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: row {row}, column {column}: '{field}' is not a number", path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        column: usize,
        field: String,
    },

    #[error("{}: row {row} has {found} fields, expected {expected}", path.display())]
    Shape {
        path: PathBuf,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("dimension mismatch: {left} = {left_dim} but {right} = {right_dim}")]
    DimensionMismatch {
        left: &'static str,
        left_dim: usize,
        right: &'static str,
        right_dim: usize,
    },

    #[error("invalid partition: {name} = {value} must lie in [1, {max}]")]
    InvalidPartition {
        name: &'static str,
        value: usize,
        max: usize,
    },

    #[error("synthesis backend '{backend}' failed: {source}")]
    Synthesis {
        backend: String,
        #[source]
        source: SynthesisError,
    },

    #[error("synthesis result violates its contract: {0}")]
    ContractViolation(String),

    #[error("interconnection is ill-posed: I - Dk*D22 is singular")]
    IllPosedLoop,

    #[error("linear algebra failure while {context}: {source}")]
    Linalg {
        context: String,
        #[source]
        source: LinalgError,
    },

    #[error(
        "{subject} differs from reference: max abs error {max_abs_error:.3e} \
         (rel {max_rel_error:.3e}) at entry {entry:?}, omega = {omega:?}; \
         {violations} of {samples} samples out of tolerance"
    )]
    ResponseMismatch {
        subject: String,
        max_abs_error: f64,
        max_rel_error: f64,
        omega: Option<f64>,
        entry: Option<(usize, usize)>,
        violations: usize,
        samples: usize,
    },

    #[error("failed to write report: {0}")]
    Output(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn linalg(context: impl Into<String>) -> impl FnOnce(LinalgError) -> Error {
        let context = context.into();
        move |source| Error::Linalg { context, source }
    }
}
