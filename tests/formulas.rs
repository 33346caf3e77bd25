use approx::assert_relative_eq;
use hybrid_expr::*;
use pretty_assertions::assert_eq;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn number(e: &Expression) -> f64 {
    e.as_number().unwrap()
}

#[test]
fn print_parse_round_trip() {
    init_logger();
    let cases = [
        (FormulaCategory::Value, "2 * x - 5"),
        (FormulaCategory::Value, "a - (b - c) / (d * e)"),
        (FormulaCategory::Value, "-(x + y) ^ 2"),
        (FormulaCategory::Value, "exp(-t) * sin(2 * t)"),
        (FormulaCategory::Value, "lut([t], [1, 2, 1, 2], [0, 10, 30, 40])"),
        (FormulaCategory::Guard, "x >= 0 & x <= 1 | y >= x & y <= x + 1"),
        (FormulaCategory::Guard, "!(x < 1 | y < 1) & z != 2"),
        (FormulaCategory::Reset, "x = x + y & y = 0"),
        (FormulaCategory::Flow, "x = 2 * x + y & y = y"),
        (
            FormulaCategory::Locations,
            "loc(automaton) = start & x = 5 & y >= 0 & y <= x",
        ),
    ];

    for (category, text) in cases {
        let parsed = parse_formula(text, category).unwrap();
        let printed = parsed.to_string();
        assert_eq!(printed, text);
        assert_eq!(parse_formula(&printed, category).unwrap(), parsed);
    }
}

#[test]
fn copies_print_identically_and_stay_independent() {
    let original = parse_guard("x + 1 <= y & y <= 10").unwrap();
    let mut copy = original.clone();
    assert_eq!(copy.to_string(), original.to_string());

    if let Expression::Operation(o) = &mut copy {
        o.children[0] = Expression::TRUE;
    }
    assert_eq!(original.to_string(), "x + 1 <= y & y <= 10");
    assert_eq!(copy.to_string(), "true & y <= 10");
}

#[test]
fn parenthesization_matches_priorities() {
    let ops = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::Power,
        Operator::Less,
        Operator::Equal,
        Operator::And,
        Operator::Or,
    ];
    let a = || Expression::variable("a");
    let b = || Expression::variable("b");
    let c = || Expression::variable("c");

    for parent in ops {
        for child in ops {
            let inner = Expression::binary(child, b(), c());
            let inner_text = inner.to_string();

            let left = Expression::binary(parent, inner.clone(), a()).to_string();
            let wrap_left = child.priority() < parent.priority();
            assert_eq!(
                left.starts_with('('),
                wrap_left,
                "{parent} with left {child}: {left}"
            );

            let right = Expression::binary(parent, a(), inner).to_string();
            let wrap_right = child.priority() < parent.priority()
                || (child.priority() == parent.priority() && !parent.is_commutative());
            assert_eq!(
                right.ends_with(&format!("({inner_text})")),
                wrap_right,
                "{parent} with right {child}: {right}"
            );
        }
    }
}

#[test]
fn negation_normal_form() {
    assert_eq!(
        parse_value("--x").unwrap().to_string(),
        parse_value("x").unwrap().to_string()
    );
    let minus_five = parse_value("-5").unwrap();
    assert!(matches!(minus_five, Expression::Constant(_)));
    assert_relative_eq!(number(&minus_five), -5.0);
}

#[test]
fn reshape_is_column_major() {
    let e = parse_value("reshape([1, 2, 3, 4, 5, 6], 2, 3)").unwrap();
    let array = e.as_array().unwrap();
    assert_eq!(array.num_dims(), 2);
    assert_eq!(array.dim_width(0), Some(2));
    assert_eq!(array.dim_width(1), Some(3));
    assert_relative_eq!(number(array.get(&[1, 2]).unwrap()), 6.0);

    let row = parse_value("reshape([1, 2, 3], 1, 3)").unwrap();
    assert_eq!(row.to_string(), "reshape([1, 2, 3], 1, 3)");
    assert_eq!(
        parse_value(&row.to_string()).unwrap().as_array().unwrap().dims(),
        &[1, 3]
    );
}

#[test]
fn higher_dimensional_arrays_print_as_reshape() {
    let text = "reshape([1, 2, 3, 11, 12, 13, 101, 102, 103, 111, 112, 113], 3, 2, 2)";
    let e = parse_value(text).unwrap();
    assert_eq!(e.as_array().unwrap().dims(), &[3, 2, 2]);
    assert_eq!(e.to_string(), text);
}

#[test]
fn lookup_tables_are_validated() {
    let err = parse_value("lut([t], [1, 2, 1, 2], [0, 10, 30])").unwrap_err();
    assert!(err.to_string().starts_with("Could not parse value"), "{err}");

    assert!(parse_value("lut([t], [1, 2, 1, 2], [0, 30, 10, 40])").is_err());

    let table = ArrayExpression::from_values(&[1.0, 2.0, 1.0, 2.0]).unwrap();
    let lut = LookupExpression::from_breakpoint_values(
        vec![Expression::variable("t")],
        table,
        vec![vec![0.0, 10.0, 30.0, 40.0]],
    )
    .unwrap();
    assert_relative_eq!(lut.breakpoints()[0][2], 30.0);
}

#[test]
fn ranges() {
    let e = parse_value("[0:1:3]").unwrap();
    let values: Vec<f64> = e.as_array().unwrap().cells().iter().map(number).collect();
    assert_eq!(values, [0.0, 1.0, 2.0, 3.0]);

    let e = parse_value("[0:0.1:1]").unwrap();
    let array = e.as_array().unwrap();
    assert_eq!(array.len(), 11);
    assert_relative_eq!(number(&array.cells()[10]), 1.0, epsilon = 1e-12);

    assert!(parse_value("[3:1:0]").is_err());
    assert!(parse_value("[0:0:1]").is_err());
}

#[test]
fn invariant_structure() {
    init_logger();
    let e = parse_invariant("x >= 0 & x <= 1 | y >= x & y <= x + 1").unwrap();
    let or = e.as_operation().unwrap();
    assert_eq!(or.op, Operator::Or);
    for side in [or.left().unwrap(), or.right().unwrap()] {
        let and = side.as_operation().unwrap();
        assert_eq!(and.op, Operator::And);
        for comparison in &and.children {
            assert!(comparison.as_operation().unwrap().op.is_comparison());
        }
    }
}

#[test]
fn reset_with_constraints() {
    let e = parse_reset("1 <= z & y := x + 3 & 0 <= x' <= 0.1 & z <= 2").unwrap();
    assert_eq!(
        e.to_string(),
        "1 <= z & y = x + 3 & 0 <= x & x <= 0.1 & z <= 2"
    );
}

#[test]
fn numbers_print_without_exponent() {
    assert_eq!(parse_value("1.5e-5").unwrap().to_string(), "0.000015");
    assert_eq!(
        parse_value("9.1e16").unwrap().to_string(),
        "91000000000000000"
    );
    assert_eq!(parse_value("3.0").unwrap().to_string(), "3");

    let printer = DefaultExpressionPrinter::new().with_number_format(NumberFormat {
        max_fraction_digits: Some(2),
    });
    let e = parse_value("x * 0.333333").unwrap();
    assert_eq!(e.display(&printer).to_string(), "x * 0.33");
}

#[test]
fn urgent_and_blank_formulas() {
    assert!(parse_flow("false").unwrap().is_false());
    assert!(parse_flow("").unwrap().is_true());
    assert!(parse_guard("").unwrap().is_true());
    assert!(parse_reset("  ").unwrap().is_true());
}

#[test]
fn backend_symbol_table() {
    // An S-expression style target.
    let mut symbols = DefaultExpressionPrinter::new();
    symbols.set_symbol(Operator::And, "and");
    symbols.set_symbol(Operator::Power, "pow");
    let printer = PrefixExpressionPrinter::new(symbols);

    let e = parse_guard("x ^ 2 <= 1 & y >= -1").unwrap();
    assert_eq!(
        printer.print(&e).unwrap(),
        "(and (<= (pow x 2) 1) (>= y -1))"
    );
}

#[test]
fn walk_visits_everything() {
    let e = parse_value("lut([t], [a, 2, 1, 2], [0, 10, 30, 40]) + sin(b)").unwrap();
    let names: Vec<_> = e.variable_names().into_iter().collect();
    assert_eq!(names, ["a", "b", "t"]);
}
