//! Formula parser and printer for hybrid automaton models.
//!
//! Invariants, guards, resets, flows and initial/forbidden predicates are
//! parsed into a normalized [`Expression`] tree, and trees are rendered back
//! to text through an [`ExpressionPrinter`]. Output backends customize the
//! printer (usually just its operator symbols) instead of walking trees
//! themselves.
//!
//! # Normalization
//!
//! - Conjunctions of many terms are built as balanced trees, so depth grows
//!   with the logarithm of the number of terms.
//! - Comparison chains are expanded: `0 <= x <= 1` is `0 <= x & x <= 1`.
//! - `--x` is `x`, and `-5` is the constant `-5`.
//! - Primes are dropped: in the flow `x' == -x` both sides name `x`.
//!
//! # Example
//!
//! ```rust
//! use hybrid_expr::*;
//!
//! let flow = parse_flow("x' == v & v' == -9.81").unwrap();
//! assert_eq!(flow.to_string(), "x = v & v = -9.81");
//!
//! // Target syntax is up to the printer.
//! let mut printer = DefaultExpressionPrinter::new();
//! printer.set_symbol(Operator::Equal, "==");
//! printer.set_symbol(Operator::And, "&&");
//! assert_eq!(flow.display(&printer).to_string(), "x == v && v == -9.81");
//! ```

mod array;
mod error;
mod expression;
mod formula;
mod lookup;
mod operator;
mod parse;
mod print;

/// Uses the [`pest`] parsing expression grammar language.
///
/// ```text
#[doc = include_str!("grammar.pest")]
/// ```
pub mod grammar_doc {}

pub use array::{ArrayExpression, ArrayIter, MAX_RANGE_LEN};
pub use error::{Error, Result};
pub use expression::{Constant, Expression, Operation, Printed, Variable};
pub use formula::{
    parse_flow, parse_formula, parse_guard, parse_invariant, parse_locations, parse_reset,
    parse_value, parse_variable_names, FormulaCategory,
};
pub use lookup::LookupExpression;
pub use operator::Operator;
pub use print::{
    print_inline, print_prefix, DefaultExpressionPrinter, ExpressionPrinter, NumberFormat,
    PrefixExpressionPrinter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_round_trip() {
        let text = "x >= 0 & x <= 1 | y >= x & y <= x + 1";
        let parsed = parse_invariant(text).unwrap();
        assert_eq!(parsed.to_string(), text);
        assert_eq!(parse_invariant(&parsed.to_string()).unwrap(), parsed);
    }

    #[test]
    fn op_precedence() {
        let parsed = parse_value("1 * 2 + 3 * 4").unwrap();
        assert_eq!(parsed.as_operation().unwrap().op, Operator::Add);

        let parsed = parse_value("8 / 4 * 3").unwrap();
        let o = parsed.as_operation().unwrap();
        assert_eq!(o.op, Operator::Multiply);
        assert_eq!(o.left().unwrap().as_operation().unwrap().op, Operator::Divide);

        let parsed = parse_guard("x < 1 | y < 2 & !(z < 3)").unwrap();
        let o = parsed.as_operation().unwrap();
        assert_eq!(o.op, Operator::Or);
        assert_eq!(o.right().unwrap().as_operation().unwrap().op, Operator::And);
    }

    #[test]
    fn orbit_formula() {
        let text = "nu1 = sqrt(mu / p1 ^ 3) * (1 + e1 * cos(nu1)) ^ 2";
        let parsed = parse_guard(text).unwrap();
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn large_conjunction_stays_shallow() {
        let text = (0..1000)
            .map(|i| format!("x{i}' == x{i}"))
            .collect::<Vec<_>>()
            .join(" & ");
        let flow = parse_flow(&text).unwrap();

        fn depth(e: &Expression) -> usize {
            match e {
                Expression::Operation(o) => 1 + o.children.iter().map(depth).max().unwrap_or(0),
                _ => 0,
            }
        }
        // 10 levels of `&` plus the equation itself.
        assert_eq!(depth(&flow), 11);
        assert_eq!(flow.variable_names().len(), 1000);
    }
}
