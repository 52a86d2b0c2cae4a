//! Matrix Loading
//!
//! Reads the comma-delimited coefficient files that describe a plant and a
//! reference controller. Files have no header row; each line is one matrix
//! row. Surrounding whitespace is trimmed. Blank lines are skipped, and so
//! are comment lines whose first non-blank character is `#`.
//!
//! Row and column order is preserved exactly: these are coefficient
//! matrices, so any transposition silently corrupts the model.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use ndarray::Array2;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ss::StateSpace;

/// Load a numeric matrix from a comma-delimited text file.
///
/// # Errors
///
/// * [`Error::NotFound`] - the file does not exist
/// * [`Error::Parse`] - a field is empty, not valid UTF-8, or not a
///   floating-point number
/// * [`Error::Shape`] - a row has a different field count than the first row
///
/// # Examples
///
/// ```no_run
/// use hinfsyn_check::io::load_matrix;
///
/// let a = load_matrix("data/A.csv").unwrap();
/// assert_eq!(a.nrows(), a.ncols());
/// ```
pub fn load_matrix(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let matrix = parse_matrix(BufReader::new(file), path)?;
    debug!(
        path = %path.display(),
        rows = matrix.nrows(),
        cols = matrix.ncols(),
        "loaded matrix"
    );
    Ok(matrix)
}

/// Parse a matrix from any reader. `origin` is only used in error messages.
///
/// An input without data rows yields a 0×0 matrix.
pub fn parse_matrix<R: Read>(input: R, origin: &Path) -> Result<Array2<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(input);

    let mut data = Vec::new();
    let mut ncols = None;
    let mut nrows = 0;

    for record in reader.byte_records() {
        let record = record.map_err(|source| Error::Csv {
            path: origin.to_path_buf(),
            source,
        })?;

        // A blank line is one empty field; `,` is two and must not vanish
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        // The reader only recognizes `#` in column 1
        if record.get(0).and_then(<[u8]>::first) == Some(&b'#') {
            continue;
        }

        let row = nrows + 1;
        let expected = *ncols.get_or_insert(record.len());
        if record.len() != expected {
            return Err(Error::Shape {
                path: origin.to_path_buf(),
                row,
                expected,
                found: record.len(),
            });
        }

        for (j, field) in record.iter().enumerate() {
            let value = std::str::from_utf8(field)
                .ok()
                .and_then(|text| text.parse::<f64>().ok())
                .ok_or_else(|| Error::Parse {
                    path: origin.to_path_buf(),
                    row,
                    column: j + 1,
                    field: String::from_utf8_lossy(field).into_owned(),
                })?;
            data.push(value);
        }
        nrows += 1;
    }

    let ncols = ncols.unwrap_or(0);
    let found = data.len();
    Array2::from_shape_vec((nrows, ncols), data).map_err(|_| Error::Shape {
        path: origin.to_path_buf(),
        row: nrows,
        expected: nrows * ncols,
        found,
    })
}

/// File names of the four matrices of a system stored under `prefix`.
fn system_paths(dir: &Path, prefix: &str) -> [PathBuf; 4] {
    ["A", "B", "C", "D"].map(|m| dir.join(format!("{prefix}{m}.csv")))
}

/// Load `<prefix>A.csv` .. `<prefix>D.csv` from `dir` and build a state-space model.
///
/// A system without states is stored as an empty `A` file. Empty `B` and `C`
/// files cannot carry a column count, so they are reshaped to `0×cols(D)` and
/// `rows(D)×0` before the model is validated.
pub fn load_system(dir: impl AsRef<Path>, prefix: &str) -> Result<StateSpace> {
    let [pa, pb, pc, pd] = system_paths(dir.as_ref(), prefix);
    let a = load_matrix(&pa)?;
    let mut b = load_matrix(&pb)?;
    let mut c = load_matrix(&pc)?;
    let d = load_matrix(&pd)?;

    if a.is_empty() {
        if b.is_empty() {
            b = Array2::zeros((0, d.ncols()));
        }
        if c.is_empty() {
            c = Array2::zeros((d.nrows(), 0));
        }
    }

    StateSpace::new(a, b, c, d)
}

/// Load the reference controller labelled `label` (files `<label>_A.csv` ..).
///
/// The reference is kept apart from the plant: it is only ever compared
/// against, never fed back into synthesis.
pub fn load_reference(dir: impl AsRef<Path>, label: &str) -> Result<StateSpace> {
    let reference = load_system(dir, &format!("{label}_"))?;
    debug!(
        label,
        states = reference.n_states(),
        inputs = reference.n_inputs(),
        outputs = reference.n_outputs(),
        "loaded reference controller"
    );
    Ok(reference)
}
