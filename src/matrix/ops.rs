//! Arithmetic operators for [`Matrix`]
//!
//! Every operator returns a new matrix. Operators are implemented on borrowed
//! operands and forwarded for owned ones, so `&a + &b`, `a + &b` and `a + b`
//! all work.

use super::Matrix;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

fn zip_with(left: &Matrix, right: &Matrix, action: &str, f: impl Fn(f64, f64) -> f64) -> Matrix {
    left.assert_same_shape(right, action);
    let elements = left
        .elements
        .iter()
        .zip(&right.elements)
        .map(|(&a, &b)| f(a, b))
        .collect();
    Matrix::from_vec(left.rows, left.columns, elements)
}

/// Standard matrix product.
///
/// # Panics
///
/// Panics if `left.columns() != right.rows()`.
pub fn multiply(left: &Matrix, right: &Matrix) -> Matrix {
    assert_eq!(
        left.columns, right.rows,
        "The left matrix' number of columns ({}) does not match \
         the right matrix' number of rows ({})",
        left.columns, right.rows
    );
    let mut result = Matrix::zeros(left.rows, right.columns);
    for i in 0..left.rows {
        let out_row = &mut result.elements[i * right.columns..(i + 1) * right.columns];
        for k in 0..left.columns {
            let a = left.elements[i * left.columns + k];
            let right_row = &right.elements[k * right.columns..(k + 1) * right.columns];
            for (out, &b) in out_row.iter_mut().zip(right_row) {
                *out += a * b;
            }
        }
    }
    result
}

impl Add<&Matrix> for &Matrix {
    type Output = Matrix;

    fn add(self, rhs: &Matrix) -> Matrix {
        zip_with(self, rhs, "add", |a, b| a + b)
    }
}

impl Sub<&Matrix> for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: &Matrix) -> Matrix {
        zip_with(self, rhs, "subtract", |a, b| a - b)
    }
}

impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        multiply(self, rhs)
    }
}

macro_rules! forward_owned_binop {
    ($trait:ident, $method:ident) => {
        impl $trait<Matrix> for Matrix {
            type Output = Matrix;

            fn $method(self, rhs: Matrix) -> Matrix {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&Matrix> for Matrix {
            type Output = Matrix;

            fn $method(self, rhs: &Matrix) -> Matrix {
                (&self).$method(rhs)
            }
        }

        impl $trait<Matrix> for &Matrix {
            type Output = Matrix;

            fn $method(self, rhs: Matrix) -> Matrix {
                self.$method(&rhs)
            }
        }
    };
}

forward_owned_binop!(Add, add);
forward_owned_binop!(Sub, sub);
forward_owned_binop!(Mul, mul);

impl Neg for &Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        self.map(|x| -x)
    }
}

impl Neg for Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        -&self
    }
}

impl Mul<f64> for &Matrix {
    type Output = Matrix;

    fn mul(self, scalar: f64) -> Matrix {
        self.map(|x| x * scalar)
    }
}

impl Mul<f64> for Matrix {
    type Output = Matrix;

    fn mul(self, scalar: f64) -> Matrix {
        &self * scalar
    }
}

impl Div<f64> for &Matrix {
    type Output = Matrix;

    fn div(self, scalar: f64) -> Matrix {
        self.map(|x| x / scalar)
    }
}

impl Div<f64> for Matrix {
    type Output = Matrix;

    fn div(self, scalar: f64) -> Matrix {
        &self / scalar
    }
}

impl AddAssign<&Matrix> for Matrix {
    fn add_assign(&mut self, rhs: &Matrix) {
        self.assert_same_shape(rhs, "add");
        for (a, b) in self.elements.iter_mut().zip(&rhs.elements) {
            *a += b;
        }
    }
}
