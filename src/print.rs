//! Rendering expressions as text.
//!
//! An [`ExpressionPrinter`] is passed explicitly wherever text is produced.
//! [`DefaultExpressionPrinter`] emits the same infix syntax the parser
//! accepts; target-specific printers override individual hooks.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::expression::{Constant, Operation, Variable};
use crate::{ArrayExpression, Expression, LookupExpression, Operator};

/// Hooks for turning an [`Expression`] into text.
///
/// Only [`print_operator`](Self::print_operator) is required. Every other
/// hook has a default, and [`print`](Self::print) dispatches on the variant.
pub trait ExpressionPrinter {
    /// The text for an operator symbol, e.g. `+` or `sin`.
    fn print_operator(&self, op: Operator) -> Result<String>;

    fn print(&self, expression: &Expression) -> Result<String> {
        match expression {
            Expression::Constant(c) => Ok(self.print_constant(*c)),
            Expression::Variable(v) => Ok(self.print_variable(v)),
            Expression::Operation(o) => self.print_operation(o),
            Expression::Array(a) => self.print_array(a),
            Expression::Lookup(l) => self.print_lookup(l),
        }
    }

    fn print_constant(&self, constant: Constant) -> String {
        match constant {
            Constant::True => self.print_true(),
            Constant::False => self.print_false(),
            Constant::Number(value) => self.print_constant_value(value),
        }
    }

    fn print_true(&self) -> String {
        "true".to_owned()
    }

    fn print_false(&self) -> String {
        "false".to_owned()
    }

    fn print_constant_value(&self, value: f64) -> String {
        NumberFormat::default().format(value)
    }

    fn print_variable(&self, variable: &Variable) -> String {
        variable.name().to_owned()
    }

    fn print_operation(&self, operation: &Operation) -> Result<String> {
        print_prefix(self, operation)
    }

    fn print_array(&self, array: &ArrayExpression) -> Result<String> {
        array.render(self)
    }

    fn print_lookup(&self, lookup: &LookupExpression) -> Result<String> {
        lookup.render(self)
    }
}

/// Fully parenthesized prefix form: `(op child0 child1 ...)`.
pub fn print_prefix<P>(printer: &P, operation: &Operation) -> Result<String>
where
    P: ExpressionPrinter + ?Sized,
{
    let mut out = format!("({}", printer.print_operator(operation.op)?);
    for child in &operation.children {
        out.push(' ');
        out.push_str(&printer.print(child)?);
    }
    out.push(')');
    Ok(out)
}

/// Infix form with the fewest parentheses that preserve the tree shape.
///
/// A compound child (an operation with more than one child) is wrapped when
/// it binds more loosely than its parent. The right child is also wrapped at
/// equal priority when the parent is not commutative, so `a - (b - c)` keeps
/// its parentheses. Operations with more than two children are rejected.
pub fn print_inline<P>(printer: &P, operation: &Operation) -> Result<String>
where
    P: ExpressionPrinter + ?Sized,
{
    let op = operation.op;
    let symbol = printer.print_operator(op)?;

    match operation.children.as_slice() {
        [] => Ok(symbol),
        [child] => {
            let text = printer.print(child)?;
            match op {
                Operator::Negate | Operator::Not if !is_compound(child) => {
                    Ok(format!("{symbol}{text}"))
                }
                _ => Ok(format!("{symbol}({text})")),
            }
        }
        [left, right] => {
            let mut lhs = printer.print(left)?;
            if needs_parens(left, |priority| priority < op.priority()) {
                lhs = format!("({lhs})");
            }

            let mut rhs = printer.print(right)?;
            if needs_parens(right, |priority| {
                priority < op.priority() || (priority == op.priority() && !op.is_commutative())
            }) {
                rhs = format!("({rhs})");
            }

            Ok(format!("{lhs} {symbol} {rhs}"))
        }
        children => Err(Error::UnsupportedArity {
            op,
            children: children.len(),
        }),
    }
}

fn is_compound(expression: &Expression) -> bool {
    matches!(expression, Expression::Operation(o) if o.children.len() > 1)
}

fn needs_parens(child: &Expression, looser: impl Fn(u8) -> bool) -> bool {
    match child {
        Expression::Operation(o) if o.children.len() > 1 => looser(o.op.priority()),
        _ => false,
    }
}

/// How numeric literals are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NumberFormat {
    /// Round to at most this many fractional digits. `None` prints the
    /// shortest text that reads back as the same value.
    pub max_fraction_digits: Option<usize>,
}

impl NumberFormat {
    /// Plain decimal text: no exponent and no trailing `.0`.
    pub fn format(&self, value: f64) -> String {
        let text = match self.max_fraction_digits {
            None => format!("{value}"),
            Some(digits) => {
                let text = format!("{value:.digits$}");
                if text.contains('.') {
                    text.trim_end_matches('0').trim_end_matches('.').to_owned()
                } else {
                    text
                }
            }
        };
        if text == "-0" {
            "0".to_owned()
        } else {
            text
        }
    }
}

/// Infix printer with a configurable symbol table.
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultExpressionPrinter {
    symbols: BTreeMap<Operator, String>,
    number_format: NumberFormat,
}

static SHARED: Lazy<DefaultExpressionPrinter> = Lazy::new(DefaultExpressionPrinter::new);

impl DefaultExpressionPrinter {
    pub fn new() -> Self {
        let symbols = Operator::ALL
            .into_iter()
            .map(|op| (op, default_symbol(op).to_owned()))
            .collect();
        Self {
            symbols,
            number_format: NumberFormat::default(),
        }
    }

    /// Process-wide instance with the default configuration. Backs the
    /// [`Display`](std::fmt::Display) impl of [`Expression`].
    pub fn shared() -> &'static Self {
        &SHARED
    }

    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = number_format;
        self
    }

    pub fn number_format(&self) -> NumberFormat {
        self.number_format
    }

    pub fn symbol(&self, op: Operator) -> Option<&str> {
        self.symbols.get(&op).map(String::as_str)
    }

    /// Replace the text printed for `op`, returning the previous one.
    pub fn set_symbol(&mut self, op: Operator, symbol: impl Into<String>) -> Option<String> {
        self.symbols.insert(op, symbol.into())
    }

    /// Drop `op` from the table; printing it then fails with
    /// [`Error::UnknownOperator`].
    pub fn remove_symbol(&mut self, op: Operator) -> Option<String> {
        self.symbols.remove(&op)
    }

    pub fn symbols_mut(&mut self) -> &mut BTreeMap<Operator, String> {
        &mut self.symbols
    }
}

impl Default for DefaultExpressionPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionPrinter for DefaultExpressionPrinter {
    fn print_operator(&self, op: Operator) -> Result<String> {
        self.symbol(op)
            .map(str::to_owned)
            .ok_or(Error::UnknownOperator(op))
    }

    fn print_constant_value(&self, value: f64) -> String {
        self.number_format.format(value)
    }

    fn print_operation(&self, operation: &Operation) -> Result<String> {
        print_inline(self, operation)
    }
}

fn default_symbol(op: Operator) -> &'static str {
    match op {
        Operator::Add => "+",
        Operator::Subtract => "-",
        Operator::Multiply => "*",
        Operator::Divide => "/",
        Operator::Power => "^",
        Operator::Equal => "=",
        Operator::NotEqual => "!=",
        Operator::Less => "<",
        Operator::LessEqual => "<=",
        Operator::Greater => ">",
        Operator::GreaterEqual => ">=",
        Operator::And => "&",
        Operator::Or => "|",
        Operator::Not => "!",
        Operator::Negate => "-",
        Operator::Sin => "sin",
        Operator::Cos => "cos",
        Operator::Tan => "tan",
        Operator::Exp => "exp",
        Operator::Sqrt => "sqrt",
        Operator::Ln => "ln",
        Operator::Loc => "loc",
    }
}

/// Symbols of [`DefaultExpressionPrinter`] in fully parenthesized prefix form,
/// e.g. `(+ x (* 2 y))`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrefixExpressionPrinter {
    inner: DefaultExpressionPrinter,
}

impl PrefixExpressionPrinter {
    pub fn new(inner: DefaultExpressionPrinter) -> Self {
        Self { inner }
    }
}

impl ExpressionPrinter for PrefixExpressionPrinter {
    fn print_operator(&self, op: Operator) -> Result<String> {
        self.inner.print_operator(op)
    }

    fn print_constant_value(&self, value: f64) -> String {
        self.inner.print_constant_value(value)
    }
}
