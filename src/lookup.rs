use crate::error::{Error, Result};
use crate::print::ExpressionPrinter;
use crate::{ArrayExpression, Expression};

/// N-dimensional lookup table: `lut([in0, in1, ...], table, bp0, bp1, ...)`.
///
/// The table has one dimension per input, and breakpoint vector `d` lists the
/// input values at which dimension `d` of the table is sampled.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupExpression {
    inputs: Vec<Expression>,
    table: ArrayExpression,
    breakpoints: Vec<Vec<f64>>,
}

impl LookupExpression {
    /// Build from breakpoint arrays. Each must be one-dimensional and hold
    /// numeric literals.
    pub fn new(
        inputs: Vec<Expression>,
        table: ArrayExpression,
        breakpoints: Vec<ArrayExpression>,
    ) -> Result<Self> {
        let breakpoints = breakpoints
            .iter()
            .enumerate()
            .map(|(d, array)| {
                if array.num_dims() != 1 {
                    return Err(Error::InvalidLookup(format!(
                        "breakpoints {d} must be one-dimensional, found dimensions {:?}",
                        array.dims()
                    )));
                }
                array
                    .cells()
                    .iter()
                    .map(|cell| {
                        cell.as_number().ok_or_else(|| {
                            Error::InvalidLookup(format!(
                                "breakpoints {d} contain a non-numeric entry: {cell}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_breakpoint_values(inputs, table, breakpoints)
    }

    pub fn from_breakpoint_values(
        inputs: Vec<Expression>,
        table: ArrayExpression,
        breakpoints: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::InvalidLookup("at least one input is required".into()));
        }
        if inputs.len() != table.num_dims() {
            return Err(Error::InvalidLookup(format!(
                "{} input(s) but the table has {} dimension(s)",
                inputs.len(),
                table.num_dims()
            )));
        }
        if breakpoints.len() != inputs.len() {
            return Err(Error::InvalidLookup(format!(
                "{} input(s) but {} breakpoint vector(s)",
                inputs.len(),
                breakpoints.len()
            )));
        }

        for (d, (values, &width)) in breakpoints.iter().zip(table.dims()).enumerate() {
            if values.len() < 2 {
                return Err(Error::InvalidLookup(format!(
                    "breakpoints {d} need at least two entries, found {}",
                    values.len()
                )));
            }
            if values.len() != width {
                return Err(Error::InvalidLookup(format!(
                    "breakpoints {d} have {} entries but table dimension {d} is {width} wide",
                    values.len()
                )));
            }
            // Negated so NaN fails too.
            if values.windows(2).any(|pair| !(pair[0] <= pair[1])) {
                return Err(Error::InvalidLookup(format!(
                    "breakpoints {d} must be non-decreasing: {values:?}"
                )));
            }
        }

        Ok(Self {
            inputs,
            table,
            breakpoints,
        })
    }

    pub fn inputs(&self) -> &[Expression] {
        &self.inputs
    }

    pub fn table(&self) -> &ArrayExpression {
        &self.table
    }

    pub fn breakpoints(&self) -> &[Vec<f64>] {
        &self.breakpoints
    }

    pub fn num_dims(&self) -> usize {
        self.inputs.len()
    }

    pub fn render<P>(&self, printer: &P) -> Result<String>
    where
        P: ExpressionPrinter + ?Sized,
    {
        let inputs = self
            .inputs
            .iter()
            .map(|input| printer.print(input))
            .collect::<Result<Vec<_>>>()?;

        let mut args = vec![format!("[{}]", inputs.join(", ")), self.table.render(printer)?];
        for values in &self.breakpoints {
            let values: Vec<String> = values
                .iter()
                .map(|&v| printer.print_constant_value(v))
                .collect();
            args.push(format!("[{}]", values.join(", ")));
        }
        Ok(format!("lut({})", args.join(", ")))
    }
}
