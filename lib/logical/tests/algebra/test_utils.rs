use rdf_algebra_logical::{Algebra, PropertyPath};
use rdf_algebra_model::{NamedNode, TermPattern, TriplePattern, Variable};

pub fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

pub fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

/// Creates a triple pattern `?s ex:p ?o`.
pub fn pattern(s: &str, p: &str, o: &str) -> TriplePattern {
    TriplePattern {
        subject: var(s).into(),
        predicate: ex(p).into(),
        object: var(o).into(),
    }
}

pub fn bgp(patterns: &[(&str, &str, &str)]) -> Algebra {
    Algebra::bgp(
        patterns
            .iter()
            .map(|(s, p, o)| pattern(s, p, o))
            .collect(),
    )
}

pub fn path(s: &str, path: PropertyPath, o: &str) -> Algebra {
    Algebra::path(TermPattern::from(var(s)), path, TermPattern::from(var(o)))
}

pub fn names(variables: impl IntoIterator<Item = Variable>) -> Vec<String> {
    variables
        .into_iter()
        .map(|v| v.as_str().to_owned())
        .collect()
}
