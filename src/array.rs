use num_traits::ToPrimitive;

use crate::error::{Error, Result};
use crate::print::ExpressionPrinter;
use crate::Expression;

/// Upper bound on the number of elements a range literal may expand to.
pub const MAX_RANGE_LEN: usize = 1 << 24;

/// Dense N-dimensional array of expressions.
///
/// Cells are stored flat in column-major order: the first index varies
/// fastest, so `[i0, i1]` lives at `i0 + dims[0] * i1`. Every dimension is at
/// least one wide and the number of cells is the product of the dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayExpression {
    cells: Vec<Expression>,
    dims: Vec<usize>,
}

impl ArrayExpression {
    /// Shape `cells` (already in column-major order) into `dims`.
    pub fn new(cells: Vec<Expression>, dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() {
            return Err(Error::InvalidArray("at least one dimension is required".into()));
        }
        if let Some(d) = dims.iter().position(|&width| width == 0) {
            return Err(Error::InvalidArray(format!(
                "dimension {d} has width 0; every dimension must be at least 1 wide"
            )));
        }
        let expected = dims
            .iter()
            .try_fold(1usize, |acc, &width| acc.checked_mul(width))
            .ok_or_else(|| {
                Error::InvalidArray(format!("dimensions {dims:?} hold more cells than fit in memory"))
            })?;
        if cells.len() != expected {
            return Err(Error::InvalidArray(format!(
                "{} cells cannot fill dimensions {dims:?} ({expected} cells)",
                cells.len()
            )));
        }
        Ok(Self { cells, dims })
    }

    /// One-dimensional array.
    pub fn from_cells(cells: Vec<Expression>) -> Result<Self> {
        let len = cells.len();
        Self::new(cells, vec![len])
    }

    /// One-dimensional array of numeric constants.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        Self::from_cells(values.iter().map(|&v| Expression::constant(v)).collect())
    }

    /// Two-dimensional array from row-major input, so `rows[r][c]` ends up at
    /// index `[r, c]`.
    pub fn from_rows(rows: Vec<Vec<Expression>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some(r) = rows.iter().position(|row| row.len() != width) {
            return Err(Error::InvalidArray(format!(
                "row {r} has {} elements but row 0 has {width}",
                rows[r].len()
            )));
        }

        let mut columns: Vec<Vec<Expression>> = (0..width).map(|_| Vec::with_capacity(height)).collect();
        for row in rows {
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }
        Self::new(columns.into_iter().flatten().collect(), vec![height, width])
    }

    /// The inclusive range `start, start + step, ..., stop`.
    ///
    /// The stopping test allows for half a step (at least `1e-9`) of
    /// floating-point drift so the last element is not lost, e.g.
    /// `range(0.0, 0.1, 1.0)` has 11 elements.
    pub fn range(start: f64, step: f64, stop: f64) -> Result<Self> {
        if !(start.is_finite() && step.is_finite() && stop.is_finite()) {
            return Err(Error::InvalidRange(format!(
                "{start}:{step}:{stop} has a non-finite bound"
            )));
        }
        if stop < start {
            return Err(Error::InvalidRange(format!(
                "stop ({stop}) must not be less than start ({start})"
            )));
        }
        if step <= 0.0 {
            return Err(Error::InvalidRange(format!("step ({step}) must be positive")));
        }

        let tolerance = (step / 2.0).max(1e-9);
        let steps = ((stop + tolerance - start) / step).floor();
        let len = steps
            .to_usize()
            .and_then(|steps| steps.checked_add(1))
            .filter(|&len| len <= MAX_RANGE_LEN)
            .ok_or_else(|| {
                Error::InvalidRange(format!(
                    "{start}:{step}:{stop} has more than {MAX_RANGE_LEN} elements"
                ))
            })?;

        let mut values = Vec::with_capacity(len);
        for i in 0..len {
            let value = start + i as f64 * step;
            if value > stop + tolerance {
                break;
            }
            values.push(value);
        }
        Self::from_values(&values)
    }

    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    /// Width along dimension `d`, `None` if the array has fewer dimensions.
    pub fn dim_width(&self, d: usize) -> Option<usize> {
        self.dims.get(d).copied()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`; arrays have at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in column-major order.
    pub fn cells(&self) -> &[Expression] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Expression> {
        self.cells
    }

    pub fn get(&self, index: &[usize]) -> Result<&Expression> {
        let i = self.flat_index(index)?;
        Ok(&self.cells[i])
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Result<&mut Expression> {
        let i = self.flat_index(index)?;
        Ok(&mut self.cells[i])
    }

    pub fn set(&mut self, index: &[usize], value: Expression) -> Result<()> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Visit `(index, cell)` pairs in storage order.
    pub fn iter(&self) -> ArrayIter<'_> {
        ArrayIter {
            array: self,
            index: Some(vec![0; self.dims.len()]),
            position: 0,
        }
    }

    fn flat_index(&self, index: &[usize]) -> Result<usize> {
        let out_of_bounds = || Error::IndexOutOfBounds {
            index: index.to_vec(),
            dims: self.dims.clone(),
        };
        if index.len() != self.dims.len() {
            return Err(out_of_bounds());
        }

        let mut flat = 0;
        let mut stride = 1;
        for (&i, &width) in index.iter().zip(&self.dims) {
            if i >= width {
                return Err(out_of_bounds());
            }
            flat += i * stride;
            stride *= width;
        }
        Ok(flat)
    }

    /// Render with `printer`: `[a, b]` for 1-D, `[a, b ; c, d]` (rows
    /// separated by `;`) for 2-D with several rows, and the `reshape(...)`
    /// form otherwise.
    pub fn render<P>(&self, printer: &P) -> Result<String>
    where
        P: ExpressionPrinter + ?Sized,
    {
        match self.dims.as_slice() {
            [_] => Ok(format!("[{}]", print_list(printer, &self.cells)?)),
            // A single row would read back as a 1-D array.
            &[height, width] if height > 1 => {
                let mut rows = Vec::with_capacity(height);
                for r in 0..height {
                    let row: Vec<&Expression> =
                        (0..width).map(|c| &self.cells[r + height * c]).collect();
                    rows.push(print_list(printer, row)?);
                }
                Ok(format!("[{}]", rows.join(" ; ")))
            }
            _ => self.render_reshape(printer),
        }
    }

    /// `reshape([cells...], d0, d1, ...)`, valid for any dimensionality.
    pub fn render_reshape<P>(&self, printer: &P) -> Result<String>
    where
        P: ExpressionPrinter + ?Sized,
    {
        let dims: Vec<String> = self.dims.iter().map(usize::to_string).collect();
        Ok(format!(
            "reshape([{}], {})",
            print_list(printer, &self.cells)?,
            dims.join(", ")
        ))
    }
}

fn print_list<'a, P>(printer: &P, cells: impl IntoIterator<Item = &'a Expression>) -> Result<String>
where
    P: ExpressionPrinter + ?Sized,
{
    let printed = cells
        .into_iter()
        .map(|cell| printer.print(cell))
        .collect::<Result<Vec<_>>>()?;
    Ok(printed.join(", "))
}

/// Single pass over an [`ArrayExpression`] in column-major order.
pub struct ArrayIter<'a> {
    array: &'a ArrayExpression,
    index: Option<Vec<usize>>,
    position: usize,
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = (Vec<usize>, &'a Expression);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.index.take()?;
        let cell = &self.array.cells[self.position];
        self.position += 1;

        // Advance the leading index and carry into higher dimensions. A carry
        // out of the last dimension leaves `self.index` empty.
        let mut next = index.clone();
        for (d, &width) in self.array.dims.iter().enumerate() {
            next[d] += 1;
            if next[d] < width {
                self.index = Some(next);
                break;
            }
            next[d] = 0;
        }

        Some((index, cell))
    }
}

impl<'a> IntoIterator for &'a ArrayExpression {
    type Item = (Vec<usize>, &'a Expression);
    type IntoIter = ArrayIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(array: &ArrayExpression) -> Vec<f64> {
        array.cells().iter().filter_map(Expression::as_number).collect()
    }

    #[test]
    fn reshape_is_column_major() {
        let a = ArrayExpression::new(
            (1..=6).map(|v| Expression::constant(v as f64)).collect(),
            vec![2, 3],
        )
        .unwrap();
        assert_eq!(a.num_dims(), 2);
        assert_eq!(a.dim_width(0), Some(2));
        assert_eq!(a.dim_width(1), Some(3));
        assert_eq!(a.dim_width(2), None);
        assert_eq!(a.get(&[1, 2]).unwrap(), &Expression::constant(6.0));
        assert_eq!(a.get(&[1, 0]).unwrap(), &Expression::constant(2.0));
        assert_eq!(a.get(&[0, 1]).unwrap(), &Expression::constant(3.0));
    }

    #[test]
    fn shape_must_match_cells() {
        let cells: Vec<_> = (0..6).map(|v| Expression::constant(v as f64)).collect();
        assert!(ArrayExpression::new(cells.clone(), vec![4, 2]).is_err());
        assert!(ArrayExpression::new(cells.clone(), vec![6, 0]).is_err());
        assert!(ArrayExpression::new(cells, vec![]).is_err());
        assert!(ArrayExpression::from_cells(Vec::new()).is_err());
    }

    #[test]
    fn oversized_dimensions_fail() {
        let cells = vec![Expression::constant(1.0)];
        assert!(matches!(
            ArrayExpression::new(cells.clone(), vec![usize::MAX, 2]),
            Err(Error::InvalidArray(_))
        ));
        assert!(matches!(
            ArrayExpression::new(cells, vec![2, usize::MAX / 2 + 1]),
            Err(Error::InvalidArray(_))
        ));
    }

    #[test]
    fn rows_are_transposed_to_column_major() {
        let rows = vec![
            vec![Expression::constant(1.0), Expression::constant(2.0)],
            vec![Expression::constant(10.0), Expression::constant(20.0)],
            vec![Expression::constant(100.0), Expression::constant(200.0)],
        ];
        let a = ArrayExpression::from_rows(rows).unwrap();
        assert_eq!(a.dims(), &[3, 2]);
        assert_eq!(values(&a), [1.0, 10.0, 100.0, 2.0, 20.0, 200.0]);
        assert_eq!(a.get(&[2, 1]).unwrap(), &Expression::constant(200.0));
        assert_eq!(Expression::from(a).to_string(), "[1, 2 ; 10, 20 ; 100, 200]");
    }

    #[test]
    fn ragged_rows_fail() {
        let rows = vec![
            vec![Expression::constant(1.0), Expression::constant(2.0)],
            vec![Expression::constant(3.0)],
        ];
        assert!(matches!(
            ArrayExpression::from_rows(rows),
            Err(Error::InvalidArray(_))
        ));
    }

    #[test]
    fn get_and_set_check_bounds() {
        let mut a = ArrayExpression::from_values(&[1.0, 2.0, 3.0]).unwrap();
        a.set(&[1], Expression::variable("x")).unwrap();
        assert_eq!(a.get(&[1]).unwrap(), &Expression::variable("x"));
        assert!(matches!(
            a.get(&[3]),
            Err(Error::IndexOutOfBounds { .. })
        ));
        assert!(a.get(&[0, 0]).is_err());
        assert!(a.set(&[5], Expression::TRUE).is_err());
    }

    #[test]
    fn iteration_carries_into_higher_dimensions() {
        let a = ArrayExpression::new(
            (0..12).map(|v| Expression::constant(v as f64)).collect(),
            vec![3, 2, 2],
        )
        .unwrap();
        let visited: Vec<_> = a.iter().map(|(index, cell)| (index, cell.clone())).collect();
        assert_eq!(visited.len(), 12);
        assert_eq!(visited[0].0, [0, 0, 0]);
        assert_eq!(visited[1].0, [1, 0, 0]);
        assert_eq!(visited[3].0, [0, 1, 0]);
        assert_eq!(visited[6].0, [0, 0, 1]);
        assert_eq!(visited[11].0, [2, 1, 1]);
        for (index, cell) in &visited {
            assert_eq!(a.get(index).unwrap(), cell);
        }
    }

    #[test]
    fn range_is_inclusive() {
        let a = ArrayExpression::range(0.0, 1.0, 3.0).unwrap();
        assert_eq!(values(&a), [0.0, 1.0, 2.0, 3.0]);

        let a = ArrayExpression::range(0.0, 0.1, 1.0).unwrap();
        assert_eq!(a.len(), 11);
        approx::assert_relative_eq!(values(&a)[10], 1.0, epsilon = 1e-12);

        let a = ArrayExpression::range(2.0, 5.0, 2.0).unwrap();
        assert_eq!(values(&a), [2.0]);
    }

    #[test]
    fn range_rejects_bad_bounds() {
        assert!(ArrayExpression::range(3.0, 1.0, 0.0).is_err());
        assert!(ArrayExpression::range(0.0, 0.0, 1.0).is_err());
        assert!(ArrayExpression::range(0.0, -1.0, 1.0).is_err());
        assert!(ArrayExpression::range(0.0, 1.0, f64::INFINITY).is_err());
        assert!(matches!(
            ArrayExpression::range(0.0, 1e-300, 1.0),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn rendering_by_dimension() {
        let a = ArrayExpression::from_values(&[1.0, 2.0, -5.0, 10.0]).unwrap();
        assert_eq!(Expression::from(a).to_string(), "[1, 2, -5, 10]");

        let a = ArrayExpression::from_rows(vec![vec![
            Expression::constant(1.0),
            Expression::constant(2.0),
            Expression::constant(3.0),
        ]])
        .unwrap();
        assert_eq!(a.dims(), &[1, 3]);
        assert_eq!(Expression::from(a).to_string(), "reshape([1, 2, 3], 1, 3)");

        let a = ArrayExpression::new(
            [1.0, 2.0, 3.0, 11.0, 12.0, 13.0, 101.0, 102.0, 103.0, 111.0, 112.0, 113.0]
                .iter()
                .map(|&v| Expression::constant(v))
                .collect(),
            vec![3, 2, 2],
        )
        .unwrap();
        assert_eq!(
            Expression::from(a).to_string(),
            "reshape([1, 2, 3, 11, 12, 13, 101, 102, 103, 111, 112, 113], 3, 2, 2)"
        );
    }
}
