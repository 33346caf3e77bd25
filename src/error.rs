use thiserror::Error;

use crate::Operator;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while building, parsing or printing an expression.
///
/// None of these are recoverable: a failure aborts the current parse or print
/// pass and is handed back to the caller as-is.
#[derive(Debug, Error)]
pub enum Error {
    // Construction.
    #[error("cannot change the value of the boolean constant {0}")]
    ImmutableConstant(bool),

    #[error("{accessor}() is only valid on operations with two children, found {children}")]
    NotBinary {
        accessor: &'static str,
        children: usize,
    },

    #[error("invalid array: {0}")]
    InvalidArray(String),

    #[error("index {index:?} is out of bounds for array with dimensions {dims:?}")]
    IndexOutOfBounds { index: Vec<usize>, dims: Vec<usize> },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid lookup table: {0}")]
    InvalidLookup(String),

    // Parsing.
    #[error("Could not parse {category}: '{text}'; sample expected syntax: {example}\n{diagnostic}")]
    Syntax {
        category: &'static str,
        text: String,
        example: &'static str,
        diagnostic: String,
    },

    #[error("Could not parse {category}: '{text}'; sample expected syntax: {example}")]
    Formula {
        category: &'static str,
        text: String,
        example: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("variable names may not contain dots here: {0}")]
    DottedVariable(String),

    #[error("loc() may only appear in initial/forbidden predicates")]
    MisplacedLoc,

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function}() expects {expected} argument(s), found {found}")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },

    #[error("{function}(): {message}")]
    InvalidShape {
        function: &'static str,
        message: String,
    },

    // Printing.
    #[error("no way defined to print operation {op} with {children} children")]
    UnsupportedArity { op: Operator, children: usize },

    #[error("printer has no symbol for operator {0}")]
    UnknownOperator(Operator),
}
