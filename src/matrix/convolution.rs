//! 2D convolution primitives
//!
//! All three functions compute a correlation (the kernel is not flipped) with
//! an odd-dimensioned kernel. Callers that need a true convolution rotate the
//! kernel by 180 degrees first.

use super::Matrix;

fn assert_odd_kernel(kernel: &Matrix) {
    assert!(
        kernel.rows() % 2 == 1 && kernel.columns() % 2 == 1,
        "Kernel must have odd dimensions (got {}x{})",
        kernel.rows(),
        kernel.columns()
    );
}

/// Applies `kernel` only where it lies entirely inside `signal`.
///
/// The result has `signal.rows() - kernel.rows() + 1` rows and
/// `signal.columns() - kernel.columns() + 1` columns.
///
/// # Panics
///
/// Panics if a kernel dimension is even or larger than the signal.
pub fn convolute_valid_only(signal: &Matrix, kernel: &Matrix) -> Matrix {
    assert_odd_kernel(kernel);
    assert!(
        kernel.rows() <= signal.rows() && kernel.columns() <= signal.columns(),
        "Kernel ({}x{}) larger than signal ({}x{})",
        kernel.rows(),
        kernel.columns(),
        signal.rows(),
        signal.columns()
    );
    let rows = signal.rows() - kernel.rows() + 1;
    let columns = signal.columns() - kernel.columns() + 1;
    let signal_columns = signal.columns();
    let signal_elements = signal.elements();
    let kernel_elements = kernel.elements();

    let mut elements = Vec::with_capacity(rows * columns);
    for row in 0..rows {
        for column in 0..columns {
            let mut sum = 0.0;
            for kernel_row in 0..kernel.rows() {
                let signal_start = (row + kernel_row) * signal_columns + column;
                let kernel_start = kernel_row * kernel.columns();
                let signal_slice = &signal_elements[signal_start..signal_start + kernel.columns()];
                let kernel_slice = &kernel_elements[kernel_start..kernel_start + kernel.columns()];
                sum += signal_slice
                    .iter()
                    .zip(kernel_slice)
                    .map(|(s, k)| s * k)
                    .sum::<f64>();
            }
            elements.push(sum);
        }
    }
    Matrix::from_vec(rows, columns, elements)
}

/// Zero-pads `signal` by half the kernel size and applies the valid convolution,
/// so the result has the same shape as `signal`.
pub fn convolute_full_kernel(signal: &Matrix, kernel: &Matrix) -> Matrix {
    assert_odd_kernel(kernel);
    let padded = signal.zero_padded((kernel.rows() - 1) / 2, (kernel.columns() - 1) / 2);
    convolute_valid_only(&padded, kernel)
}

/// Zero-pads `signal` by `kernel - 1` on every side, so every partial overlap
/// counts. The result has `signal.rows() + kernel.rows() - 1` rows and
/// `signal.columns() + kernel.columns() - 1` columns.
pub fn convolute_full_overlap(signal: &Matrix, kernel: &Matrix) -> Matrix {
    assert_odd_kernel(kernel);
    let padded = signal.zero_padded(kernel.rows() - 1, kernel.columns() - 1);
    convolute_valid_only(&padded, kernel)
}
