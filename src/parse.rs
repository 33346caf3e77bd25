use std::collections::HashMap;

use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::error::{Error, Result};
use crate::{ArrayExpression, Expression, LookupExpression, Operator};

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to project `src`
pub(crate) struct FormulaParser;

static PRATT_PARSER: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    use Assoc::*;
    use Rule::*;

    PrattParser::new()
        .op(Op::infix(add, Left) | Op::infix(subtract, Left))
        .op(Op::infix(multiply, Left) | Op::infix(divide, Left))
        .op(Op::infix(power, Left))
});

/// Single-argument functions, by the name they are called with.
static FUNCTIONS: Lazy<HashMap<&'static str, Operator>> = Lazy::new(|| {
    [
        ("sin", Operator::Sin),
        ("cos", Operator::Cos),
        ("tan", Operator::Tan),
        ("exp", Operator::Exp),
        ("sqrt", Operator::Sqrt),
        ("ln", Operator::Ln),
    ]
    .into_iter()
    .collect()
});

/// Lower the pair produced by one of the start rules.
pub(crate) fn lower_formula(pair: Pair<'_, Rule>) -> Result<Expression> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner().filter(|p| p.as_rule() != Rule::EOI);

    match rule {
        Rule::value => match inner.next() {
            Some(arith) => lower_arith(arith),
            None => unreachable!("value without an expression"),
        },
        // A blank guard or invariant does not constrain anything.
        Rule::guard | Rule::invariant | Rule::locations => match inner.next() {
            Some(or_expr) => lower_or(or_expr),
            None => Ok(Expression::TRUE),
        },
        Rule::reset | Rule::flow => {
            let clauses = inner.map(lower_clause).collect::<Result<Vec<_>>>()?;
            Ok(conjunction(clauses))
        }
        x => unreachable!("{x:?} is not a start rule"),
    }
}

/// Human-readable names for the rules that show up in syntax errors.
pub(crate) fn describe_rule(rule: &Rule) -> String {
    let name = match rule {
        Rule::EOI => "end of input",
        Rule::number => "number",
        Rule::identifier | Rule::name | Rule::variable => "variable",
        Rule::prime => "'",
        Rule::true_literal => "true",
        Rule::false_literal => "false",
        Rule::add => "+",
        Rule::subtract | Rule::negation => "-",
        Rule::multiply => "*",
        Rule::divide => "/",
        Rule::power => "^",
        Rule::not_equal => "!=",
        Rule::less_equal => "<=",
        Rule::greater_equal => ">=",
        Rule::equal => "==",
        Rule::less => "<",
        Rule::greater => ">",
        Rule::not => "!",
        Rule::function_call => "function call",
        Rule::array | Rule::array_row | Rule::range => "array",
        Rule::arith => "expression",
        Rule::compare => "comparison",
        Rule::and_expr | Rule::or_expr => "condition",
        Rule::reset_assignment => "assignment",
        Rule::flow_equation => "derivative equation",
        other => return format!("{other:?}"),
    };
    name.to_owned()
}

/// Balanced conjunction of the clauses of a reset, flow or `&` chain.
fn conjunction(terms: Vec<Expression>) -> Expression {
    if terms.len() > 2 {
        log::trace!("balancing conjunction of {} terms", terms.len());
    }
    Expression::and_all(terms)
}

fn lower_clause(pair: Pair<'_, Rule>) -> Result<Expression> {
    match pair.as_rule() {
        Rule::reset_assignment | Rule::flow_equation => {
            let mut target = None;
            let mut rhs = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::variable => target = Some(lower_variable(&inner)),
                    Rule::arith => rhs = Some(lower_arith(inner)?),
                    _ => {}
                }
            }
            match (target, rhs) {
                (Some(target), Some(rhs)) => Ok(Expression::binary(Operator::Equal, target, rhs)),
                _ => unreachable!("equation without both sides"),
            }
        }
        Rule::compare => lower_compare(pair),
        Rule::false_literal => Ok(Expression::FALSE),
        x => unreachable!("unexpected clause {x:?}"),
    }
}

fn lower_or(pair: Pair<'_, Rule>) -> Result<Expression> {
    let mut result: Option<Expression> = None;
    for and_expr in pair.into_inner() {
        let rhs = lower_and(and_expr)?;
        result = Some(match result {
            Some(lhs) => Expression::binary(Operator::Or, lhs, rhs),
            None => rhs,
        });
    }
    Ok(result.unwrap_or(Expression::TRUE))
}

fn lower_and(pair: Pair<'_, Rule>) -> Result<Expression> {
    let terms = pair
        .into_inner()
        .map(lower_condition)
        .collect::<Result<Vec<_>>>()?;
    Ok(conjunction(terms))
}

fn lower_condition(pair: Pair<'_, Rule>) -> Result<Expression> {
    match pair.as_rule() {
        Rule::not => Ok(Expression::logical_not(lower_condition(only_child(pair))?)),
        Rule::compare => lower_compare(pair),
        Rule::true_literal => Ok(Expression::TRUE),
        Rule::false_literal => Ok(Expression::FALSE),
        Rule::or_expr => lower_or(pair),
        x => unreachable!("unexpected condition {x:?}"),
    }
}

/// `a < b <= c` becomes `a < b & b <= c`. Every operand that appears in two
/// comparisons is cloned for the second one.
fn lower_compare(pair: Pair<'_, Rule>) -> Result<Expression> {
    let mut comparisons = Vec::new();
    let mut lhs: Option<Expression> = None;
    let mut op: Option<Operator> = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::arith => {
                let rhs = lower_arith(inner)?;
                if let (Some(lhs), Some(op)) = (lhs.take(), op.take()) {
                    comparisons.push(Expression::binary(op, lhs, rhs.clone()));
                }
                lhs = Some(rhs);
            }
            rule => op = Some(comparison_operator(rule)),
        }
    }
    Ok(conjunction(comparisons))
}

fn comparison_operator(rule: Rule) -> Operator {
    match rule {
        Rule::equal => Operator::Equal,
        Rule::not_equal => Operator::NotEqual,
        Rule::less => Operator::Less,
        Rule::less_equal => Operator::LessEqual,
        Rule::greater => Operator::Greater,
        Rule::greater_equal => Operator::GreaterEqual,
        x => unreachable!("unexpected comparison {x:?}"),
    }
}

fn lower_arith(pair: Pair<'_, Rule>) -> Result<Expression> {
    PRATT_PARSER
        .map_primary(lower_operand)
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::add => Operator::Add,
                Rule::subtract => Operator::Subtract,
                Rule::multiply => Operator::Multiply,
                Rule::divide => Operator::Divide,
                Rule::power => Operator::Power,
                x => unreachable!("unexpected operator {x:?}"),
            };
            Ok(Expression::binary(op, lhs?, rhs?))
        })
        .parse(pair.into_inner())
}

fn lower_operand(pair: Pair<'_, Rule>) -> Result<Expression> {
    match pair.as_rule() {
        Rule::negation => Ok(Expression::negate(lower_operand(only_child(pair))?)),
        Rule::number => {
            let text = pair.as_str();
            match text.parse::<f64>() {
                Ok(value) => Ok(Expression::constant(value)),
                Err(_) => unreachable!("unexpected literal: {text}"),
            }
        }
        Rule::true_literal => Ok(Expression::TRUE),
        Rule::false_literal => Ok(Expression::FALSE),
        Rule::variable => Ok(lower_variable(&pair)),
        Rule::array => lower_array(pair).map(Expression::Array),
        Rule::function_call => lower_call(pair),
        Rule::arith => lower_arith(pair),
        x => unreachable!("unexpected primary rule {x:?}"),
    }
}

/// The prime of a derivative or next-state reference is dropped.
fn lower_variable(pair: &Pair<'_, Rule>) -> Expression {
    let text = pair.as_str();
    Expression::variable(text.strip_suffix('\'').unwrap_or(text))
}

fn only_child(pair: Pair<'_, Rule>) -> Pair<'_, Rule> {
    let rule = pair.as_rule();
    match pair.into_inner().next() {
        Some(child) => child,
        None => unreachable!("{rule:?} without operand"),
    }
}

fn lower_array(pair: Pair<'_, Rule>) -> Result<ArrayExpression> {
    let mut rows = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::range => return lower_range(inner),
            Rule::array_row => rows.push(
                inner
                    .into_inner()
                    .map(lower_arith)
                    .collect::<Result<Vec<_>>>()?,
            ),
            x => unreachable!("unexpected array element {x:?}"),
        }
    }

    if rows.len() == 1 {
        ArrayExpression::from_cells(rows.remove(0))
    } else {
        ArrayExpression::from_rows(rows)
    }
}

fn lower_range(pair: Pair<'_, Rule>) -> Result<ArrayExpression> {
    let bounds = pair
        .into_inner()
        .zip(["start", "step", "stop"])
        .map(|(part, label)| {
            let text = part.as_str();
            lower_arith(part)?.as_number().ok_or_else(|| {
                Error::InvalidRange(format!("{label} must be a numeric constant, found '{text}'"))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    match bounds[..] {
        [start, step, stop] => ArrayExpression::range(start, step, stop),
        _ => unreachable!("range without three parts"),
    }
}

fn lower_call(pair: Pair<'_, Rule>) -> Result<Expression> {
    let mut inner = pair.into_inner();
    let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
    let args = inner.map(lower_arith).collect::<Result<Vec<_>>>()?;
    call(name, args)
}

/// Build the expression for `name(args...)`.
fn call(name: &str, args: Vec<Expression>) -> Result<Expression> {
    if let Some(&op) = FUNCTIONS.get(name) {
        return match <[Expression; 1]>::try_from(args) {
            Ok([arg]) => Ok(Expression::unary(op, arg)),
            Err(args) => Err(Error::Arity {
                function: name.to_owned(),
                expected: "exactly 1",
                found: args.len(),
            }),
        };
    }

    match name {
        "loc" => loc(args),
        "lut" => lut(args),
        "reshape" => reshape(args),
        _ => Err(Error::UnknownFunction(name.to_owned())),
    }
}

/// `loc()` or `loc(automaton)`.
fn loc(mut args: Vec<Expression>) -> Result<Expression> {
    let automaton = match args.len() {
        0 => Expression::variable(""),
        1 => match args.remove(0) {
            automaton @ Expression::Variable(_) => automaton,
            other => {
                return Err(Error::InvalidShape {
                    function: "loc",
                    message: format!("expected an automaton name, found '{other}'"),
                })
            }
        },
        found => {
            return Err(Error::Arity {
                function: "loc".to_owned(),
                expected: "0 or 1",
                found,
            })
        }
    };
    Ok(Expression::unary(Operator::Loc, automaton))
}

/// `lut([inputs...], table, breakpoints0, breakpoints1, ...)`
fn lut(args: Vec<Expression>) -> Result<Expression> {
    if args.len() < 3 {
        return Err(Error::Arity {
            function: "lut".to_owned(),
            expected: "at least 3",
            found: args.len(),
        });
    }

    let mut arrays = args
        .into_iter()
        .enumerate()
        .map(|(i, arg)| match arg {
            Expression::Array(array) => Ok(array),
            other => Err(Error::InvalidShape {
                function: "lut",
                message: format!("argument {} must be an array, found '{other}'", i + 1),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    let breakpoints = arrays.split_off(2);
    let table = arrays.pop();
    let inputs = arrays.pop();
    let (Some(inputs), Some(table)) = (inputs, table) else {
        unreachable!("argument count checked above");
    };
    if inputs.num_dims() != 1 {
        return Err(Error::InvalidShape {
            function: "lut",
            message: format!(
                "the input list must be one-dimensional, found dimensions {:?}",
                inputs.dims()
            ),
        });
    }

    LookupExpression::new(inputs.into_cells(), table, breakpoints).map(Expression::Lookup)
}

/// `reshape(array, d0, d1, ...)`: reinterpret the column-major cells of
/// `array` with new dimensions.
fn reshape(mut args: Vec<Expression>) -> Result<Expression> {
    if args.len() < 2 {
        return Err(Error::Arity {
            function: "reshape".to_owned(),
            expected: "at least 2",
            found: args.len(),
        });
    }

    let widths = args.split_off(1);
    let array = match args.pop() {
        Some(Expression::Array(array)) => array,
        other => {
            return Err(Error::InvalidShape {
                function: "reshape",
                message: format!(
                    "first argument must be an array, found '{}'",
                    other.map(|e| e.to_string()).unwrap_or_default()
                ),
            })
        }
    };

    let dims = widths
        .iter()
        .map(|width| {
            width
                .as_number()
                .filter(|w| w.fract() == 0.0 && *w >= 1.0)
                .and_then(|w| w.to_usize())
                .ok_or_else(|| Error::InvalidShape {
                    function: "reshape",
                    message: format!("dimension widths must be positive integers, found '{width}'"),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    ArrayExpression::new(array.into_cells(), dims).map(Expression::Array)
}
