//! Rank-2 view over a tensor, backed by a dense `f64` store.
//!
//! Values are kept as `f64` internally and converted to `E` whenever they are
//! read or handed to a caller-supplied function. Mutating operations return
//! `&mut Self` for chaining; [`Matrix::pad`] is the only one that allocates.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::Range;

use ndarray::{s, Array2};

use super::convert::{f64_to_number, number_to_f64, Number};
use super::{Tensor, TensorError, TypedTensor};

/// Dense `rows x cols` matrix viewed as element kind `E`.
#[derive(Debug, Clone)]
pub struct Matrix<E: Number> {
    m: Array2<f64>,
    _kind: PhantomData<E>,
}

impl<E: Number> Matrix<E> {
    /// Build from row-major `data`, which must hold exactly `rows * cols` values.
    pub fn new(rows: usize, cols: usize, data: &[E]) -> Result<Self, TensorError> {
        let m = Array2::from_shape_vec((rows, cols), number_to_f64(data)).map_err(|_| {
            TensorError::LengthMismatch {
                shape: vec![rows, cols],
                expected: rows.checked_mul(cols).unwrap_or(usize::MAX),
                actual: data.len(),
            }
        })?;
        Ok(Self::from_array(m))
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Matrix with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: E) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value.to_f64()))
    }

    pub fn from_typed(t: &TypedTensor<E>) -> Result<Self, TensorError> {
        match *t.shape() {
            [rows, cols] => Self::new(rows, cols, t.data()),
            _ => Err(TensorError::NotAMatrix(t.shape().len())),
        }
    }

    /// Narrow a rank-2 tensor to `E` and wrap it.
    pub fn from_tensor(t: &Tensor) -> Result<Self, TensorError> {
        Self::from_typed(&t.to_typed())
    }

    fn from_array(m: Array2<f64>) -> Self {
        Self {
            m,
            _kind: PhantomData,
        }
    }

    /// `(rows, cols)`.
    pub fn dims(&self) -> (usize, usize) {
        self.m.dim()
    }

    /// Copy of row `i`.
    ///
    /// # Panics
    /// If `i` is not a valid row index.
    pub fn row(&self, i: usize) -> Vec<E> {
        self.m.row(i).iter().map(|&v| E::from_f64(v)).collect()
    }

    /// Copy of column `j`.
    ///
    /// # Panics
    /// If `j` is not a valid column index.
    pub fn col(&self, j: usize) -> Vec<E> {
        self.m.column(j).iter().map(|&v| E::from_f64(v)).collect()
    }

    pub fn rows(&self) -> Vec<Vec<E>> {
        (0..self.m.nrows()).map(|i| self.row(i)).collect()
    }

    pub fn cols(&self) -> Vec<Vec<E>> {
        (0..self.m.ncols()).map(|j| self.col(j)).collect()
    }

    /// Set every cell of `rows x cols` to `value`.
    pub fn set(
        &mut self,
        rows: Range<usize>,
        cols: Range<usize>,
        value: E,
    ) -> Result<&mut Self, TensorError> {
        self.set_func(rows, cols, |_| value)
    }

    /// Apply `f` in place to each cell of the half-open rectangle `rows x cols`.
    pub fn set_func<F>(
        &mut self,
        rows: Range<usize>,
        cols: Range<usize>,
        mut f: F,
    ) -> Result<&mut Self, TensorError>
    where
        F: FnMut(E) -> E,
    {
        let (nrows, ncols) = self.dims();
        let valid = rows.start <= rows.end
            && rows.end <= nrows
            && cols.start <= cols.end
            && cols.end <= ncols;
        if !valid {
            return Err(TensorError::OutOfBounds {
                rows: (rows.start, rows.end),
                cols: (cols.start, cols.end),
                dims: (nrows, ncols),
            });
        }

        self.m
            .slice_mut(s![rows, cols])
            .mapv_inplace(|v| f(E::from_f64(v)).to_f64());
        Ok(self)
    }

    pub fn set_all(&mut self, value: E) -> &mut Self {
        self.m.fill(value.to_f64());
        self
    }

    pub fn set_all_func<F>(&mut self, mut f: F) -> &mut Self
    where
        F: FnMut(E) -> E,
    {
        self.m.mapv_inplace(|v| f(E::from_f64(v)).to_f64());
        self
    }

    /// Euclidean norm over all elements (square root of the sum of squares).
    pub fn l2_norm(&self) -> f64 {
        self.m.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Divide every element by the global L2 norm of the whole matrix.
    ///
    /// This is one scalar for the entire matrix, not a per-row norm. An
    /// all-zero matrix is left as is.
    pub fn norm(&mut self) -> &mut Self {
        let norm = self.l2_norm();
        if norm != 0.0 {
            self.m.mapv_inplace(|v| v / norm);
        }
        self
    }

    /// Grow by `rows` rows and `cols` columns, filling new cells with `value`.
    ///
    /// The original occupies the top-left corner of the result. Padding by
    /// zero in both directions borrows `self` instead of allocating.
    pub fn pad(&self, rows: usize, cols: usize, value: E) -> Cow<'_, Self> {
        if rows == 0 && cols == 0 {
            return Cow::Borrowed(self);
        }

        let (old_rows, old_cols) = self.dims();
        let mut padded = Array2::from_elem((old_rows + rows, old_cols + cols), value.to_f64());
        padded
            .slice_mut(s![..old_rows, ..old_cols])
            .assign(&self.m);
        Cow::Owned(Self::from_array(padded))
    }

    /// Row-major copy of all elements as `E`.
    pub fn raw_data(&self) -> Vec<E> {
        let flat: Vec<f64> = self.m.iter().copied().collect();
        f64_to_number(&flat)
    }

    pub fn to_typed_tensor(&self) -> TypedTensor<E> {
        let (rows, cols) = self.dims();
        TypedTensor {
            shape: vec![rows, cols],
            data: self.raw_data(),
        }
    }
}

/// Equal when dimensions match and the element sequences, read as `E`, match.
impl<E: Number> PartialEq for Matrix<E> {
    fn eq(&self, other: &Self) -> bool {
        self.dims() == other.dims() && self.raw_data() == other.raw_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    fn five_by_five() -> Matrix<i32> {
        let row = [1, 2, 3, 4, 5];
        let data: Vec<i32> = (0..5).flat_map(|_| row).collect();
        Matrix::new(5, 5, &data).unwrap()
    }

    #[test]
    fn norm_divides_by_global_l2() {
        let t = Tensor::from_2d(&[vec![1.0f32], vec![2.0], vec![3.0], vec![4.0], vec![5.0]])
            .unwrap();
        let mut m = Matrix::<f32>::from_tensor(&t).unwrap();
        assert!((m.l2_norm() - 55f64.sqrt()).abs() < 1e-12);

        let got = m.norm().raw_data();
        let want = [0.13483997, 0.26967994, 0.40451991, 0.53935989, 0.67419986];
        assert!(approx_eq(&got, &want), "got {:?}", got);
    }

    #[test]
    fn norm_is_not_per_row() {
        let mut m = Matrix::<f64>::new(2, 2, &[3.0, 0.0, 0.0, 4.0]).unwrap();
        m.norm();
        assert_eq!(m.raw_data(), vec![0.6, 0.0, 0.0, 0.8]);
    }

    #[test]
    fn norm_of_zero_matrix_is_unchanged() {
        let mut m = Matrix::<f32>::zeros(2, 3);
        m.norm();
        assert_eq!(m.raw_data(), vec![0.0; 6]);
    }

    #[test]
    fn set_func_only_touches_inner_block() {
        let mut m = five_by_five();
        m.set_func(1..4, 1..4, |x| x * x).unwrap();

        let border = vec![1, 2, 3, 4, 5];
        let inner = vec![1, 4, 9, 16, 5];
        assert_eq!(m.rows(), vec![border.clone(), inner.clone(), inner.clone(), inner, border]);
    }

    #[test]
    fn set_func_rejects_out_of_range() {
        let mut m = five_by_five();
        let before = m.clone();

        let err = m.set_func(0..6, 0..5, |x| x + 1).unwrap_err();
        assert_eq!(
            err,
            TensorError::OutOfBounds { rows: (0, 6), cols: (0, 5), dims: (5, 5) }
        );
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = m.set(3..1, 0..1, 0);
        assert!(inverted.is_err());
        assert_eq!(m, before);
    }

    #[test]
    fn new_rejects_overflowing_dims() {
        let err = Matrix::<f32>::new(usize::MAX, 2, &[]).unwrap_err();
        assert_eq!(
            err,
            TensorError::LengthMismatch {
                shape: vec![usize::MAX, 2],
                expected: usize::MAX,
                actual: 0,
            }
        );
    }

    #[test]
    fn empty_rectangle_is_a_no_op() {
        let mut m = five_by_five();
        let before = m.clone();
        m.set(2..2, 0..5, 99).unwrap();
        assert_eq!(m, before);
    }

    #[test]
    fn set_all_and_chaining() {
        let mut m = Matrix::<u8>::zeros(2, 2);
        m.set_all(3).set_all_func(|x| x * 2);
        assert_eq!(m.raw_data(), vec![6; 4]);

        m.set(0..1, 0..2, 1).unwrap().set_all_func(|x| x + 1);
        assert_eq!(m.rows(), vec![vec![2, 2], vec![7, 7]]);
    }

    #[test]
    fn set_all_func_identity_keeps_data() {
        let mut m = five_by_five();
        let before = m.clone();
        m.set_all_func(|x| x);
        assert_eq!(m, before);
    }

    #[test]
    fn row_and_col_are_copies() {
        let m = Matrix::<i64>::new(2, 3, &[1, 2, 3, 4, 5, 6]).unwrap();
        let mut row = m.row(1);
        row[0] = 100;
        assert_eq!(m.row(1), vec![4, 5, 6]);
        assert_eq!(m.col(2), vec![3, 6]);
        assert_eq!(m.cols(), vec![vec![1, 4], vec![2, 5], vec![3, 6]]);
    }

    #[test]
    fn pad_places_original_top_left() {
        let m = Matrix::<i32>::new(2, 2, &[1, 2, 3, 4]).unwrap();
        let padded = m.pad(1, 2, 0);
        assert_eq!(padded.dims(), (3, 4));
        assert_eq!(
            padded.rows(),
            vec![vec![1, 2, 0, 0], vec![3, 4, 0, 0], vec![0, 0, 0, 0]]
        );
    }

    #[test]
    fn pad_by_zero_borrows() {
        let m = five_by_five();
        let padded = m.pad(0, 0, 7);
        assert!(matches!(padded, Cow::Borrowed(_)));
        assert_eq!(*padded, m);
    }

    #[test]
    fn equality_requires_same_dims() {
        let a = Matrix::<f32>::new(1, 4, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::<f32>::new(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn equality_compares_as_element_kind() {
        let mut a = Matrix::<i32>::new(1, 2, &[1, 2]).unwrap();
        let b = a.clone();
        // 1/sqrt(5) and 2/sqrt(5) both truncate to zero when read as i32.
        a.norm();
        assert_ne!(a, b);
        assert_eq!(a.raw_data(), vec![0, 0]);
    }

    #[test]
    fn construction_errors() {
        assert!(matches!(
            Matrix::<f32>::new(2, 2, &[1.0]),
            Err(TensorError::LengthMismatch { expected: 4, actual: 1, .. })
        ));

        let t = Tensor::from_1d(&[1.0f32, 2.0]);
        assert_eq!(Matrix::<f32>::from_tensor(&t).unwrap_err(), TensorError::NotAMatrix(1));
    }

    #[test]
    fn round_trips_through_typed_tensor() {
        let rows = vec![vec![1i8, -2, 3], vec![4, 5, -6]];
        let t = Tensor::from_2d(&rows).unwrap();
        let m = Matrix::<i8>::from_tensor(&t).unwrap();
        assert_eq!(m.rows(), rows);
        assert_eq!(m.to_typed_tensor().into_tensor(), t);
    }
}
