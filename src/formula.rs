use std::collections::BTreeSet;
use std::fmt;

use pest::Parser;

use crate::error::{Error, Result};
use crate::parse::{describe_rule, lower_formula, FormulaParser, Rule};
use crate::{Expression, Operator};

/// The kind of formula being parsed. Each category has its own start rule in
/// the grammar and its own example in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormulaCategory {
    /// A single arithmetic expression, e.g. a constant's value.
    Value,
    Invariant,
    Reset,
    Guard,
    Flow,
    /// Initial and forbidden state predicates.
    Locations,
}

impl FormulaCategory {
    pub const ALL: [FormulaCategory; 6] = [
        Self::Value,
        Self::Invariant,
        Self::Reset,
        Self::Guard,
        Self::Flow,
        Self::Locations,
    ];

    fn rule(self) -> Rule {
        match self {
            Self::Value => Rule::value,
            Self::Invariant => Rule::invariant,
            Self::Reset => Rule::reset,
            Self::Guard => Rule::guard,
            Self::Flow => Rule::flow,
            Self::Locations => Rule::locations,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Invariant => "invariant",
            Self::Reset => "reset",
            Self::Guard => "guard",
            Self::Flow => "flow",
            Self::Locations => "initial/forbidden",
        }
    }

    /// A short formula that parses in this category.
    pub fn example(self) -> &'static str {
        match self {
            Self::Value => "2 * x - 5",
            Self::Invariant | Self::Guard => "x >= 0 & x <= 1 | y >= x & y <= x + 1",
            Self::Reset => "x' := x + y & y' := 0",
            Self::Flow => "x' == 2 * x + y & y' == y",
            Self::Locations => "loc(automaton) == start & x == 5 & y >= 0 & y <= x",
        }
    }

    /// Only initial/forbidden predicates may name `component.variable` or
    /// use `loc(...)`.
    pub fn allows_dotted_names(self) -> bool {
        self == Self::Locations
    }
}

impl fmt::Display for FormulaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse `text` as a formula of the given category.
///
/// Syntax errors come back as [`Error::Syntax`] with a diagnostic pointing at
/// the offending position. Errors found while building the tree (unknown
/// functions, bad array shapes, ...) are wrapped in [`Error::Formula`].
pub fn parse_formula(text: &str, category: FormulaCategory) -> Result<Expression> {
    let wrap = |source: Error| Error::Formula {
        category: category.label(),
        text: text.to_owned(),
        example: category.example(),
        source: Box::new(source),
    };

    let mut pairs = match FormulaParser::parse(category.rule(), text) {
        Ok(pairs) => pairs,
        Err(err) => {
            log::debug!("{category} '{text}' does not parse, collecting diagnostics");
            return Err(Error::Syntax {
                category: category.label(),
                text: text.to_owned(),
                example: category.example(),
                diagnostic: err.renamed_rules(describe_rule).to_string(),
            });
        }
    };

    let expression = match pairs.next() {
        Some(pair) => lower_formula(pair).map_err(wrap)?,
        None => unreachable!("start rule always produces a pair"),
    };

    if !category.allows_dotted_names() {
        let mut misplaced = None;
        expression.walk(&mut |e| {
            if misplaced.is_some() {
                return;
            }
            match e {
                Expression::Variable(v) if v.is_dotted() => {
                    misplaced = Some(Error::DottedVariable(v.name().to_owned()));
                }
                Expression::Operation(o) if o.op == Operator::Loc => {
                    misplaced = Some(Error::MisplacedLoc);
                }
                _ => {}
            }
        });
        if let Some(err) = misplaced {
            return Err(wrap(err));
        }
    }

    log::trace!("parsed {category} '{text}' as {expression:?}");
    Ok(expression)
}

pub fn parse_value(text: &str) -> Result<Expression> {
    parse_formula(text, FormulaCategory::Value)
}

pub fn parse_invariant(text: &str) -> Result<Expression> {
    parse_formula(text, FormulaCategory::Invariant)
}

pub fn parse_reset(text: &str) -> Result<Expression> {
    parse_formula(text, FormulaCategory::Reset)
}

pub fn parse_guard(text: &str) -> Result<Expression> {
    parse_formula(text, FormulaCategory::Guard)
}

pub fn parse_flow(text: &str) -> Result<Expression> {
    parse_formula(text, FormulaCategory::Flow)
}

/// Parse an initial or forbidden state predicate.
pub fn parse_locations(text: &str) -> Result<Expression> {
    parse_formula(text, FormulaCategory::Locations)
}

/// Names of the variables `text` refers to, primes removed, without building
/// an [`Expression`].
pub fn parse_variable_names(text: &str, category: FormulaCategory) -> Result<BTreeSet<String>> {
    let pairs = FormulaParser::parse(category.rule(), text).map_err(|err| Error::Syntax {
        category: category.label(),
        text: text.to_owned(),
        example: category.example(),
        diagnostic: err.renamed_rules(describe_rule).to_string(),
    })?;

    Ok(pairs
        .flatten()
        .filter(|p| p.as_rule() == Rule::variable)
        .map(|p| {
            let name = p.as_str();
            name.strip_suffix('\'').unwrap_or(name).to_string()
        })
        .collect())
}
