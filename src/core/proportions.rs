//! Conditional proportions of expected counts.
//!
//! Every multinomial draw in the simulator is parameterized by proportions
//! computed here. Units without any expected expression are frequent, so a
//! zero total is not an error: such units get a uniform distribution over
//! their children.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Normalize `values` to sum to one, uniform if their sum is exactly zero.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total == 0. {
        let uniform = 1. / values.len() as f64;
        return vec![uniform; values.len()];
    }
    values.iter().map(|value| value / total).collect()
}

/// Normalize each row of `counts` by the matching entry of `totals`.
///
/// Rows whose total is exactly zero are replaced by `1 / ncols`.
pub fn normalize_rows(counts: ArrayView2<f64>, totals: ArrayView1<f64>) -> Array2<f64> {
    assert_eq!(
        counts.nrows(),
        totals.len(),
        "Row totals do not match number of rows"
    );
    let uniform = 1. / counts.ncols() as f64;
    let mut proportions = counts.to_owned();
    for (mut row, &total) in proportions.axis_iter_mut(Axis(0)).zip(totals.iter()) {
        if total == 0. {
            row.fill(uniform);
        } else {
            row.mapv_inplace(|value| value / total);
        }
    }
    proportions
}

/// Row sums of `counts`.
pub fn row_totals(counts: ArrayView2<f64>) -> ndarray::Array1<f64> {
    counts.sum_axis(Axis(1))
}
