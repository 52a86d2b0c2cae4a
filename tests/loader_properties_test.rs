//! Property-based tests for matrix loading (proptest)
//! Covers: shape round trip, value preservation, idempotent loading.

use std::io::Write;

use hinfsyn_check::io::load_matrix;
use proptest::prelude::*;

fn write_csv(values: &[Vec<f64>]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for row in values {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(file, "{}", line.join(",")).unwrap();
    }
    file.flush().unwrap();
    file
}

fn matrix(max_dim: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1..=max_dim, 1..=max_dim).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(prop::collection::vec(-1e6f64..1e6, cols), rows)
    })
}

proptest! {
    /// An n×m file loads as an n×m matrix with the same values in the same order.
    #[test]
    fn load_preserves_shape_and_order(values in matrix(8)) {
        let file = write_csv(&values);
        let m = load_matrix(file.path()).unwrap();

        prop_assert_eq!(m.nrows(), values.len());
        prop_assert_eq!(m.ncols(), values[0].len());
        for (i, row) in values.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                prop_assert_eq!(m[(i, j)].to_bits(), v.to_bits());
            }
        }
    }

    /// Loading the same file twice gives bit-identical matrices.
    #[test]
    fn load_is_idempotent(values in matrix(6)) {
        let file = write_csv(&values);
        let first = load_matrix(file.path()).unwrap();
        let second = load_matrix(file.path()).unwrap();

        prop_assert_eq!(first.shape(), second.shape());
        prop_assert!(first.iter().zip(second.iter()).all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    /// Dropping a field from any row but the first is reported as a shape error.
    #[test]
    fn ragged_rows_rejected(values in matrix(6), victim in any::<prop::sample::Index>()) {
        prop_assume!(values.len() > 1 && values[0].len() > 1);
        let mut ragged = values.clone();
        let row = 1 + victim.index(values.len() - 1);
        ragged[row].pop();

        let file = write_csv(&ragged);
        let is_shape_error = matches!(
            load_matrix(file.path()),
            Err(hinfsyn_check::Error::Shape { .. })
        );
        prop_assert!(is_shape_error);
    }
}
