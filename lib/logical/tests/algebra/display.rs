use crate::test_utils::{bgp, ex, path, var};
use rdf_algebra_logical::{
    AggregateExpression, AggregateFunction, Algebra, AlgebraBuilder, AlgebraError, Expression,
    Function, OrderCondition, PropertyPath,
};
use rdf_algebra_model::{Literal, NamedNodePattern, Solution};

#[test]
fn test_display_slice_order_by() -> Result<(), AlgebraError> {
    let algebra = AlgebraBuilder::new(bgp(&[("s", "val", "v")]))
        .order_by(vec![OrderCondition::Asc(var("v").into())])?
        .slice(1, Some(2))
        .build();

    insta::assert_snapshot!(algebra, @r"
    Slice: offset=1, limit=2
      OrderBy: ASC(?v)
        Bgp: (?s <http://example.com/val> ?v)
    ");
    Ok(())
}

#[test]
fn test_display_optional_with_filter() -> Result<(), AlgebraError> {
    let algebra = AlgebraBuilder::new(bgp(&[("s", "type", "t")]))
        .left_join(
            bgp(&[("s", "age", "age")]),
            Some(Expression::greater(
                var("age").into(),
                Literal::from(18).into(),
            )),
        )
        .filter(Expression::Bound(var("age")))?
        .project(&[var("s"), var("age")])
        .build();

    insta::assert_snapshot!(algebra, @r#"
    Project: ?s, ?age
      Filter: BOUND(?age)
        LeftJoin: (?age > "18"^^<http://www.w3.org/2001/XMLSchema#integer>)
          Bgp: (?s <http://example.com/type> ?t)
          Bgp: (?s <http://example.com/age> ?age)
    "#);
    Ok(())
}

#[test]
fn test_display_group_and_extend() -> Result<(), AlgebraError> {
    let algebra = AlgebraBuilder::new(bgp(&[("s", "val", "v")]))
        .group(
            vec![var("s")],
            vec![
                (var("count"), AggregateExpression::CountSolutions { distinct: false }),
                (
                    var("names"),
                    AggregateExpression::FunctionCall {
                        function: AggregateFunction::GroupConcat {
                            separator: Some(",".to_owned()),
                        },
                        expression: Expression::call(Function::Str, [var("v").into()]),
                        distinct: true,
                    },
                ),
            ],
        )?
        .extend(var("label"), Expression::call(Function::UCase, [var("names").into()]))?
        .build();

    insta::assert_snapshot!(algebra, @r#"
    Extend: ?label := UCASE(?names)
      Group: [?s] [?count := COUNT(*), ?names := GROUP_CONCAT(DISTINCT STR(?v); SEPARATOR = ",")]
        Bgp: (?s <http://example.com/val> ?v)
    "#);
    Ok(())
}

#[test]
fn test_display_paths_and_graphs() {
    let knows = PropertyPath::Predicate(ex("knows"));
    let algebra = AlgebraBuilder::new(path(
        "x",
        PropertyPath::sequence(
            PropertyPath::zero_or_more(knows.clone()),
            PropertyPath::inverse(knows),
        ),
        "y",
    ))
    .named_graph(NamedNodePattern::Variable(var("g")))
    .union(Algebra::minus(
        bgp(&[("x", "p", "y")]),
        bgp(&[("y", "q", "z")]),
    ))
    .build();

    insta::assert_snapshot!(algebra, @r"
    Union
      NamedGraph: ?g
        Path: (?x ((<http://example.com/knows>)* / ^(<http://example.com/knows>)) ?y)
      Minus
        Bgp: (?x <http://example.com/p> ?y)
        Bgp: (?y <http://example.com/q> ?z)
    ");
}

#[test]
fn test_display_exists_is_written_on_one_line() -> Result<(), AlgebraError> {
    let algebra = AlgebraBuilder::new(bgp(&[("s", "p", "o")]))
        .filter(Expression::not(Expression::exists(bgp(&[("o", "q", "z")]))))?
        .build();

    insta::assert_snapshot!(algebra, @r"
    Filter: !EXISTS { (Bgp: (?o <http://example.com/q> ?z)) }
      Bgp: (?s <http://example.com/p> ?o)
    ");
    Ok(())
}

#[test]
fn test_display_table() -> Result<(), AlgebraError> {
    let row: Solution = [(var("x"), ex("a").into())].into_iter().collect();
    let algebra = Algebra::table(vec![var("x"), var("y")], vec![row, Solution::new()])?;

    insta::assert_snapshot!(algebra, @"Table: (?x ?y) {?x -> <http://example.com/a>} {}");
    Ok(())
}

#[test]
fn test_table_rejects_undeclared_variables() {
    let row: Solution = [(var("z"), ex("a").into())].into_iter().collect();
    assert_eq!(
        Algebra::table(vec![var("x")], vec![row]),
        Err(AlgebraError::UndeclaredTableVariable(var("z")))
    );
}

#[test]
fn test_structural_equality() {
    let lhs = Algebra::join(bgp(&[("a", "p", "b")]), path("b", ex("q").into(), "c"));
    let rhs = Algebra::join(bgp(&[("a", "p", "b")]), path("b", ex("q").into(), "c"));
    let other = Algebra::join(bgp(&[("a", "p", "b")]), path("b", ex("r").into(), "c"));

    assert_eq!(lhs, rhs);
    assert_ne!(lhs, other);
    assert_ne!(Algebra::distinct(lhs.clone()), Algebra::reduced(lhs));
}
