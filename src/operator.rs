use std::fmt;

/// The closed set of operators an [`Operation`](crate::Operation) can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    // Algebraic.
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Relational.
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Boolean.
    And,
    Or,
    Not,
    Negate,

    // Unary transcendental.
    Sin,
    Cos,
    Tan,
    Exp,
    Sqrt,
    Ln,

    /// `loc(automaton)` inside initial/forbidden predicates. Later passes
    /// replace it with concrete mode references.
    Loc,
}

impl Operator {
    pub const ALL: [Operator; 22] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Power,
        Self::Equal,
        Self::NotEqual,
        Self::Less,
        Self::LessEqual,
        Self::Greater,
        Self::GreaterEqual,
        Self::And,
        Self::Or,
        Self::Not,
        Self::Negate,
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Exp,
        Self::Sqrt,
        Self::Ln,
        Self::Loc,
    ];

    /// Binding strength used to decide parenthesization when printing. Higher
    /// binds tighter. Evaluation order is fixed by the shape of the tree, not
    /// by this number.
    pub fn priority(self) -> u8 {
        match self {
            Self::Or => 0,
            Self::And => 1,
            Self::Equal
            | Self::NotEqual
            | Self::Less
            | Self::LessEqual
            | Self::Greater
            | Self::GreaterEqual => 2,
            Self::Add | Self::Subtract => 3,
            Self::Multiply | Self::Divide => 4,
            Self::Power => 5,
            Self::Not
            | Self::Negate
            | Self::Sin
            | Self::Cos
            | Self::Tan
            | Self::Exp
            | Self::Sqrt
            | Self::Ln
            | Self::Loc => 6,
        }
    }

    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Multiply | Self::And | Self::Or | Self::Equal | Self::NotEqual
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
        )
    }

    /// Whether the operator produces a truth value rather than a number.
    pub fn is_boolean(self) -> bool {
        self.is_comparison() || matches!(self, Self::And | Self::Or | Self::Not)
    }

    /// Stable identifier for error messages and debug output. Target syntax
    /// is the business of an [`ExpressionPrinter`](crate::ExpressionPrinter).
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Power => "power",
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::Less => "less",
            Self::LessEqual => "lessEqual",
            Self::Greater => "greater",
            Self::GreaterEqual => "greaterEqual",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Negate => "negate",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Exp => "exp",
            Self::Sqrt => "sqrt",
            Self::Ln => "ln",
            Self::Loc => "loc",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
