use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::print::{DefaultExpressionPrinter, ExpressionPrinter};
use crate::{ArrayExpression, LookupExpression, Operator};

/// Normalized syntax tree of a parsed formula.
///
/// Trees own their children, so [`Clone`] is a deep copy. The boolean literals
/// are tagged variants of [`Constant`] and therefore survive copying as the
/// same literal rather than as a fresh `1` or `0`.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Constant(Constant),
    Variable(Variable),
    Operation(Operation),
    Array(ArrayExpression),
    Lookup(LookupExpression),
}

/// A numeric literal, or one of the two boolean literals.
///
/// `True` and `False` carry the values `1` and `0`. They are what the boolean
/// helpers ([`Expression::and`], [`Expression::or`]) special-case, and their
/// value cannot be changed.
#[derive(Clone, Copy, Debug)]
pub enum Constant {
    True,
    False,
    Number(f64),
}

/// A named reference. Resolving the name is up to the caller.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    name: String,
}

/// An operator applied to an ordered list of children.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub op: Operator,
    pub children: Vec<Expression>,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn value(self) -> f64 {
        match self {
            Self::True => 1.0,
            Self::False => 0.0,
            Self::Number(value) => value,
        }
    }

    /// Replace the value of a numeric literal. Fails on `True` and `False`.
    pub fn set_value(&mut self, value: f64) -> Result<()> {
        match self {
            Self::True => Err(Error::ImmutableConstant(true)),
            Self::False => Err(Error::ImmutableConstant(false)),
            Self::Number(v) => {
                *v = value;
                Ok(())
            }
        }
    }

    /// `Some` only for the two boolean literals.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Number(_) => None,
        }
    }
}

/// Constants compare by numeric value, so `True == Constant::new(1.0)`.
impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl From<f64> for Constant {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified `component.variable` form, only legal in initial/forbidden
    /// predicates.
    pub fn is_dotted(&self) -> bool {
        self.name.contains('.')
    }
}

impl Operation {
    pub fn new(op: Operator, children: Vec<Expression>) -> Self {
        Self { op, children }
    }

    pub fn unary(op: Operator, child: Expression) -> Self {
        Self::new(op, vec![child])
    }

    pub fn binary(op: Operator, lhs: Expression, rhs: Expression) -> Self {
        Self::new(op, vec![lhs, rhs])
    }

    /// `var <op> c`
    pub fn var_const(op: Operator, var: &str, c: f64) -> Self {
        Self::binary(op, Expression::variable(var), Expression::constant(c))
    }

    /// `c <op> var`
    pub fn const_var(op: Operator, c: f64, var: &str) -> Self {
        Self::binary(op, Expression::constant(c), Expression::variable(var))
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    pub fn left(&self) -> Result<&Expression> {
        self.binary_child("left", 0)
    }

    pub fn right(&self) -> Result<&Expression> {
        self.binary_child("right", 1)
    }

    fn binary_child(&self, accessor: &'static str, i: usize) -> Result<&Expression> {
        if self.children.len() != 2 {
            return Err(Error::NotBinary {
                accessor,
                children: self.children.len(),
            });
        }
        Ok(&self.children[i])
    }
}

impl Expression {
    pub const TRUE: Expression = Expression::Constant(Constant::True);
    pub const FALSE: Expression = Expression::Constant(Constant::False);

    pub fn constant(value: f64) -> Self {
        Self::Constant(Constant::Number(value))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(Variable::new(name))
    }

    pub fn unary(op: Operator, child: Expression) -> Self {
        Self::Operation(Operation::unary(op, child))
    }

    pub fn binary(op: Operator, lhs: Expression, rhs: Expression) -> Self {
        Self::Operation(Operation::binary(op, lhs, rhs))
    }

    /// Arithmetic negation in normal form: `-(-x)` collapses to `x` and a
    /// numeric literal absorbs the sign instead of being wrapped.
    pub fn negate(expression: Expression) -> Self {
        match expression {
            Self::Operation(mut o) if o.op == Operator::Negate && o.children.len() == 1 => {
                o.children.remove(0)
            }
            Self::Constant(Constant::Number(value)) => Self::constant(-value),
            other => Self::unary(Operator::Negate, other),
        }
    }

    /// Logical negation; `!!x` collapses to `x`.
    pub fn logical_not(expression: Expression) -> Self {
        match expression {
            Self::Operation(mut o) if o.op == Operator::Not && o.children.len() == 1 => {
                o.children.remove(0)
            }
            other => Self::unary(Operator::Not, other),
        }
    }

    /// Conjunction that short-circuits on the boolean literals.
    pub fn and(lhs: Expression, rhs: Expression) -> Self {
        if lhs.is_false() || rhs.is_false() {
            Self::FALSE
        } else if lhs.is_true() {
            rhs
        } else if rhs.is_true() {
            lhs
        } else {
            Self::binary(Operator::And, lhs, rhs)
        }
    }

    /// Disjunction that short-circuits on the boolean literals.
    pub fn or(lhs: Expression, rhs: Expression) -> Self {
        if lhs.is_true() || rhs.is_true() {
            Self::TRUE
        } else if lhs.is_false() {
            rhs
        } else if rhs.is_false() {
            lhs
        } else {
            Self::binary(Operator::Or, lhs, rhs)
        }
    }

    /// Conjunction of all `terms` as a tree of depth `O(log n)`. An empty list
    /// is `TRUE`.
    pub fn and_all(terms: Vec<Expression>) -> Self {
        balanced(Operator::And, terms).unwrap_or(Self::TRUE)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::Constant(Constant::True))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Self::Constant(Constant::False))
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Self::Operation(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<Constant> {
        match self {
            Self::Constant(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayExpression> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The numeric value of a literal or of a negated literal; `None` for
    /// anything that would need evaluation.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Constant(c) => Some(c.value()),
            Self::Operation(o) if o.op == Operator::Negate && o.children.len() == 1 => {
                o.children[0].as_number().map(|value| -value)
            }
            _ => None,
        }
    }

    /// Pre-order traversal over this expression and everything below it,
    /// including array cells and lookup inputs.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        visit(self);
        match self {
            Self::Operation(o) => {
                for child in &o.children {
                    child.walk(visit);
                }
            }
            Self::Array(a) => {
                for cell in a.cells() {
                    cell.walk(visit);
                }
            }
            Self::Lookup(l) => {
                for input in l.inputs() {
                    input.walk(visit);
                }
                for cell in l.table().cells() {
                    cell.walk(visit);
                }
            }
            Self::Constant(_) | Self::Variable(_) => {}
        }
    }

    /// Every variable name referenced by this expression.
    pub fn variable_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.walk(&mut |e| {
            if let Self::Variable(v) = e {
                names.insert(v.name());
            }
        });
        names
    }

    /// Render with a specific printer.
    ///
    /// ```rust
    /// use hybrid_expr::*;
    ///
    /// let mut printer = DefaultExpressionPrinter::new();
    /// printer.set_symbol(Operator::And, "&&");
    /// let e = parse_guard("x >= 0 & y <= 1").unwrap();
    /// assert_eq!(e.display(&printer).to_string(), "x >= 0 && y <= 1");
    /// ```
    pub fn display<'a, P>(&'a self, printer: &'a P) -> Printed<'a, P>
    where
        P: ExpressionPrinter + ?Sized,
    {
        Printed {
            expression: self,
            printer,
        }
    }
}

/// Balanced fold of `terms` under a binary operator, splitting at the
/// midpoint. `None` if `terms` is empty.
pub(crate) fn balanced(op: Operator, mut terms: Vec<Expression>) -> Option<Expression> {
    match terms.len() {
        0 => None,
        1 => terms.pop(),
        len => {
            let rhs = terms.split_off(len / 2);
            Some(Expression::binary(
                op,
                balanced(op, terms)?,
                balanced(op, rhs)?,
            ))
        }
    }
}

impl From<Constant> for Expression {
    fn from(c: Constant) -> Self {
        Self::Constant(c)
    }
}

impl From<Variable> for Expression {
    fn from(v: Variable) -> Self {
        Self::Variable(v)
    }
}

impl From<Operation> for Expression {
    fn from(o: Operation) -> Self {
        Self::Operation(o)
    }
}

impl From<ArrayExpression> for Expression {
    fn from(a: ArrayExpression) -> Self {
        Self::Array(a)
    }
}

impl From<LookupExpression> for Expression {
    fn from(l: LookupExpression) -> Self {
        Self::Lookup(l)
    }
}

/// [`Display`](fmt::Display) adapter returned by [`Expression::display`].
///
/// A print error is rendered inline as `<error message>`; call
/// [`ExpressionPrinter::print`] directly to handle it.
pub struct Printed<'a, P: ?Sized> {
    expression: &'a Expression,
    printer: &'a P,
}

impl<P> fmt::Display for Printed<'_, P>
where
    P: ExpressionPrinter + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.printer.print(self.expression) {
            Ok(text) => f.write_str(&text),
            Err(err) => write!(f, "<{err}>"),
        }
    }
}

/// Prints with the shared [`DefaultExpressionPrinter`].
///
/// Trees the printer rejects, such as an operation with three children,
/// show up as `<error message>` in the output instead of failing the
/// formatter. Code generators should call [`ExpressionPrinter::print`] and
/// handle the [`Error`].
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display(DefaultExpressionPrinter::shared()), f)
    }
}
