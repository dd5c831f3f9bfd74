use crate::test_utils::{bgp, ex, names, path, var};
use rdf_algebra_logical::{
    AggregateExpression, AggregateFunction, Algebra, AlgebraError, Expression, PropertyPath,
};
use rdf_algebra_model::{NamedNodePattern, Solution};

#[test]
fn bgp_variables_are_fixed() {
    let algebra = bgp(&[("x", "knows", "y"), ("y", "knows", "z")]);
    assert_eq!(names(algebra.fixed_variables()), ["x", "y", "z"]);
    assert!(algebra.floating_variables().is_empty());
}

#[test]
fn join_unions_fixed_variables() {
    let algebra = Algebra::Join {
        left: Box::new(bgp(&[("x", "knows", "y")])),
        right: Box::new(Algebra::left_join(
            bgp(&[("y", "knows", "z")]),
            bgp(&[("z", "name", "n")]),
            None,
        )),
    };
    assert_eq!(names(algebra.fixed_variables()), ["x", "y", "z"]);
    assert_eq!(names(algebra.floating_variables()), ["n"]);
}

#[test]
fn left_join_only_keeps_left_fixed() {
    let algebra = Algebra::left_join(
        bgp(&[("s", "type", "t")]),
        bgp(&[("s", "age", "age")]),
        None,
    );
    assert_eq!(names(algebra.fixed_variables()), ["s", "t"]);
    assert_eq!(names(algebra.floating_variables()), ["age"]);
    assert_eq!(names(algebra.projected_variables()), ["age", "s", "t"]);
}

#[test]
fn union_keeps_variables_fixed_on_both_branches() {
    let algebra = Algebra::union(bgp(&[("s", "p", "a")]), bgp(&[("s", "q", "b")]));
    assert_eq!(names(algebra.fixed_variables()), ["s"]);
    assert_eq!(names(algebra.floating_variables()), ["a", "b"]);
}

#[test]
fn minus_ignores_right_variables() {
    let algebra = Algebra::minus(bgp(&[("s", "p", "o")]), bgp(&[("s", "q", "z")]));
    assert_eq!(names(algebra.fixed_variables()), ["o", "s"]);
    assert!(algebra.floating_variables().is_empty());
}

#[test]
fn project_hides_variables() {
    let algebra = Algebra::project(
        Algebra::left_join(bgp(&[("s", "p", "o")]), bgp(&[("o", "q", "z")]), None),
        vec![var("s"), var("z"), var("unknown")],
    );
    assert_eq!(names(algebra.fixed_variables()), ["s"]);
    assert_eq!(names(algebra.floating_variables()), ["unknown", "z"]);
}

#[test]
fn named_graph_variable_becomes_fixed() {
    let algebra = Algebra::named_graph(
        NamedNodePattern::Variable(var("g")),
        Algebra::left_join(bgp(&[("s", "p", "o")]), bgp(&[("o", "q", "g")]), None),
    );
    assert_eq!(names(algebra.fixed_variables()), ["g", "o", "s"]);
    assert!(algebra.floating_variables().is_empty());
}

#[test]
fn extend_variables_are_floating() -> Result<(), AlgebraError> {
    let algebra = Algebra::extend(
        bgp(&[("s", "p", "o")]),
        vec![(var("doubled"), Expression::Add(
            Box::new(var("o").into()),
            Box::new(var("o").into()),
        ))],
    )?;
    assert_eq!(names(algebra.fixed_variables()), ["o", "s"]);
    assert_eq!(names(algebra.floating_variables()), ["doubled"]);
    Ok(())
}

#[test]
fn group_count_is_fixed() -> Result<(), AlgebraError> {
    let algebra = Algebra::group(
        bgp(&[("s", "p", "o")]),
        vec![var("s")],
        vec![
            (var("c"), AggregateExpression::CountSolutions { distinct: false }),
            (
                var("total"),
                AggregateExpression::FunctionCall {
                    function: AggregateFunction::Sum,
                    expression: var("o").into(),
                    distinct: false,
                },
            ),
        ],
    )?;
    assert_eq!(names(algebra.fixed_variables()), ["c", "s"]);
    assert_eq!(names(algebra.floating_variables()), ["total"]);
    Ok(())
}

#[test]
fn table_variables_missing_in_a_row_are_floating() -> Result<(), AlgebraError> {
    let full: Solution = [(var("x"), ex("a").into()), (var("y"), ex("b").into())]
        .into_iter()
        .collect();
    let partial: Solution = [(var("x"), ex("c").into())].into_iter().collect();
    let algebra = Algebra::table(vec![var("x"), var("y")], vec![full, partial])?;

    assert_eq!(names(algebra.fixed_variables()), ["x"]);
    assert_eq!(names(algebra.floating_variables()), ["y"]);
    Ok(())
}

#[test]
fn path_endpoints_are_fixed() {
    let algebra = path("a", PropertyPath::one_or_more(ex("p").into()), "b");
    assert_eq!(names(algebra.fixed_variables()), ["a", "b"]);
}

#[test]
fn silent_service_variables_are_floating() {
    let algebra = Algebra::service(
        NamedNodePattern::NamedNode(ex("endpoint")),
        bgp(&[("s", "p", "o")]),
        true,
    );
    assert!(algebra.fixed_variables().is_empty());
    assert_eq!(names(algebra.floating_variables()), ["o", "s"]);
}
