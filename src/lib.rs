//! hinfsyn-check: validation of H-infinity synthesis routines
//!
//! Loads a generalized plant from CSV-encoded state-space matrices, runs an
//! H-infinity synthesis backend on it, and checks the resulting controller
//! against a reference controller computed by an independent tool.
//!
//! The synthesis itself is not implemented here. Backends plug in through
//! the [`sb::HinfSynthesizer`] trait.
//!
//! # Organization
//!
//! - `io`: Loading of comma-delimited matrices and state-space systems
//! - `ss`: State-space models, partitions, frequency response, closed loops
//! - `sb`: Synthesis boundary (`hinfsyn` and the backend contract)
//! - `compare`: Realization-invariant comparison against a reference
//! - `validate`: The end-to-end validation run
//!
//! # Example
//!
//! ```
//! use hinfsyn_check::io::parse_matrix;
//! use std::path::Path;
//!
//! let a = parse_matrix("0,1\n-2,-3\n".as_bytes(), Path::new("A.csv")).unwrap();
//! assert_eq!(a.shape(), &[2, 2]);
//! ```

pub mod compare;
pub mod error;
pub mod io;
pub mod sb;
pub mod ss;
pub mod validate;

pub use error::{Error, Result};
