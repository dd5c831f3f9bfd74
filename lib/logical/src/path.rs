use rdf_algebra_model::NamedNode;
use std::fmt;

/// A property path expression.
///
/// Paths are regular expressions over predicates that are used in place of a single predicate in
/// a triple pattern.
///
/// # Relevant Resources
/// - [SPARQL 1.1 - Property Paths](https://www.w3.org/TR/sparql11-query/#propertypaths)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// A single predicate (`ex:p`).
    Predicate(NamedNode),
    /// The inverse of a path (`^path`).
    Inverse(Box<Self>),
    /// A sequence of two paths (`path1 / path2`).
    Sequence(Box<Self>, Box<Self>),
    /// The alternative of two paths (`path1 | path2`).
    Alternative(Box<Self>, Box<Self>),
    /// Zero or more occurrences (`path*`).
    ZeroOrMore(Box<Self>),
    /// One or more occurrences (`path+`).
    OneOrMore(Box<Self>),
    /// Zero or one occurrences (`path?`).
    ZeroOrOne(Box<Self>),
    /// Any predicate except the given ones (`!(ex:a|ex:b)`).
    NegatedPropertySet(Vec<NamedNode>),
}

impl PropertyPath {
    pub fn inverse(path: PropertyPath) -> Self {
        Self::Inverse(Box::new(path))
    }

    pub fn sequence(lhs: PropertyPath, rhs: PropertyPath) -> Self {
        Self::Sequence(Box::new(lhs), Box::new(rhs))
    }

    pub fn alternative(lhs: PropertyPath, rhs: PropertyPath) -> Self {
        Self::Alternative(Box::new(lhs), Box::new(rhs))
    }

    pub fn zero_or_more(path: PropertyPath) -> Self {
        Self::ZeroOrMore(Box::new(path))
    }

    pub fn one_or_more(path: PropertyPath) -> Self {
        Self::OneOrMore(Box::new(path))
    }

    pub fn zero_or_one(path: PropertyPath) -> Self {
        Self::ZeroOrOne(Box::new(path))
    }
}

impl From<NamedNode> for PropertyPath {
    fn from(value: NamedNode) -> Self {
        Self::Predicate(value)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(p) => write!(f, "{p}"),
            Self::Inverse(p) => write!(f, "^({p})"),
            Self::Sequence(a, b) => write!(f, "({a} / {b})"),
            Self::Alternative(a, b) => write!(f, "({a} | {b})"),
            Self::ZeroOrMore(p) => write!(f, "({p})*"),
            Self::OneOrMore(p) => write!(f, "({p})+"),
            Self::ZeroOrOne(p) => write!(f, "({p})?"),
            Self::NegatedPropertySet(p) => {
                f.write_str("!(")?;
                for (i, c) in p.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str(")")
            }
        }
    }
}
