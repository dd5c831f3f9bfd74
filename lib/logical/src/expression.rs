use crate::Algebra;
use rdf_algebra_model::{Literal, NamedNode, Variable};
use std::fmt;

/// A built-in or custom function that can be called within an [Expression].
///
/// # Relevant Resources
/// - [SPARQL 1.1 - Function Definitions](https://www.w3.org/TR/sparql11-query/#SparqlOps)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Function {
    Str,
    Lang,
    LangMatches,
    Datatype,
    Iri,
    BNode,
    Abs,
    Ceil,
    Floor,
    Round,
    Concat,
    SubStr,
    StrLen,
    Replace,
    UCase,
    LCase,
    Contains,
    StrStarts,
    StrEnds,
    StrBefore,
    StrAfter,
    StrLang,
    StrDt,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    Regex,
    /// A function identified by an IRI. This includes the XSD cast functions (e.g.,
    /// `xsd:integer(?x)`).
    Custom(NamedNode),
}

impl Function {
    /// Returns the SPARQL name of the function.
    pub fn name(&self) -> &str {
        match self {
            Self::Str => "STR",
            Self::Lang => "LANG",
            Self::LangMatches => "LANGMATCHES",
            Self::Datatype => "DATATYPE",
            Self::Iri => "IRI",
            Self::BNode => "BNODE",
            Self::Abs => "ABS",
            Self::Ceil => "CEIL",
            Self::Floor => "FLOOR",
            Self::Round => "ROUND",
            Self::Concat => "CONCAT",
            Self::SubStr => "SUBSTR",
            Self::StrLen => "STRLEN",
            Self::Replace => "REPLACE",
            Self::UCase => "UCASE",
            Self::LCase => "LCASE",
            Self::Contains => "CONTAINS",
            Self::StrStarts => "STRSTARTS",
            Self::StrEnds => "STRENDS",
            Self::StrBefore => "STRBEFORE",
            Self::StrAfter => "STRAFTER",
            Self::StrLang => "STRLANG",
            Self::StrDt => "STRDT",
            Self::IsIri => "isIRI",
            Self::IsBlank => "isBLANK",
            Self::IsLiteral => "isLITERAL",
            Self::IsNumeric => "isNUMERIC",
            Self::Regex => "REGEX",
            Self::Custom(iri) => iri.as_str(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(iri) => write!(f, "{iri}"),
            _ => f.write_str(self.name()),
        }
    }
}

/// An expression that is evaluated against a single solution.
///
/// Evaluating an expression may fail (e.g., a type error or an unbound variable). Such failures are
/// local: a filter treats them as `false`, an assignment leaves its variable unbound, and a sort
/// key sorts as the lowest value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    NamedNode(NamedNode),
    Literal(Literal),
    Variable(Variable),
    /// Logical-or (`||`).
    Or(Box<Self>, Box<Self>),
    /// Logical-and (`&&`).
    And(Box<Self>, Box<Self>),
    /// RDFterm-equal (`=`).
    Equal(Box<Self>, Box<Self>),
    /// `sameTerm`.
    SameTerm(Box<Self>, Box<Self>),
    Greater(Box<Self>, Box<Self>),
    GreaterOrEqual(Box<Self>, Box<Self>),
    Less(Box<Self>, Box<Self>),
    LessOrEqual(Box<Self>, Box<Self>),
    /// `IN`. `NOT IN` is expressed as `Not(In(..))`.
    In(Box<Self>, Vec<Self>),
    Add(Box<Self>, Box<Self>),
    Subtract(Box<Self>, Box<Self>),
    Multiply(Box<Self>, Box<Self>),
    Divide(Box<Self>, Box<Self>),
    UnaryPlus(Box<Self>),
    UnaryMinus(Box<Self>),
    Not(Box<Self>),
    /// `EXISTS`. The pattern is evaluated with the current solution substituted into it.
    Exists(Box<Algebra>),
    Bound(Variable),
    If(Box<Self>, Box<Self>, Box<Self>),
    Coalesce(Vec<Self>),
    FunctionCall(Function, Vec<Self>),
}

impl Expression {
    pub fn variable(variable: Variable) -> Self {
        Self::Variable(variable)
    }

    pub fn equal(lhs: Expression, rhs: Expression) -> Self {
        Self::Equal(Box::new(lhs), Box::new(rhs))
    }

    pub fn less(lhs: Expression, rhs: Expression) -> Self {
        Self::Less(Box::new(lhs), Box::new(rhs))
    }

    pub fn greater(lhs: Expression, rhs: Expression) -> Self {
        Self::Greater(Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Expression, rhs: Expression) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Expression, rhs: Expression) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn not(inner: Expression) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn exists(pattern: Algebra) -> Self {
        Self::Exists(Box::new(pattern))
    }

    pub fn call(function: Function, args: impl IntoIterator<Item = Expression>) -> Self {
        Self::FunctionCall(function, args.into_iter().collect())
    }

    /// Collects the variables mentioned by the expression, excluding those that only occur within
    /// an `EXISTS` pattern.
    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        match self {
            Self::NamedNode(_) | Self::Literal(_) | Self::Exists(_) => {}
            Self::Variable(v) | Self::Bound(v) => out.push(v),
            Self::Or(a, b)
            | Self::And(a, b)
            | Self::Equal(a, b)
            | Self::SameTerm(a, b)
            | Self::Greater(a, b)
            | Self::GreaterOrEqual(a, b)
            | Self::Less(a, b)
            | Self::LessOrEqual(a, b)
            | Self::Add(a, b)
            | Self::Subtract(a, b)
            | Self::Multiply(a, b)
            | Self::Divide(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Self::UnaryPlus(a) | Self::UnaryMinus(a) | Self::Not(a) => a.collect_variables(out),
            Self::In(a, list) => {
                a.collect_variables(out);
                for e in list {
                    e.collect_variables(out);
                }
            }
            Self::If(a, b, c) => {
                a.collect_variables(out);
                b.collect_variables(out);
                c.collect_variables(out);
            }
            Self::Coalesce(list) | Self::FunctionCall(_, list) => {
                for e in list {
                    e.collect_variables(out);
                }
            }
        }
    }
}

impl From<NamedNode> for Expression {
    fn from(value: NamedNode) -> Self {
        Self::NamedNode(value)
    }
}

impl From<Literal> for Expression {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<Variable> for Expression {
    fn from(value: Variable) -> Self {
        Self::Variable(value)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &[Expression]) -> fmt::Result {
    for (i, e) in list.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => write!(f, "{node}"),
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Variable(variable) => write!(f, "{variable}"),
            Self::Or(a, b) => write!(f, "({a} || {b})"),
            Self::And(a, b) => write!(f, "({a} && {b})"),
            Self::Equal(a, b) => write!(f, "({a} = {b})"),
            Self::SameTerm(a, b) => write!(f, "sameTerm({a}, {b})"),
            Self::Greater(a, b) => write!(f, "({a} > {b})"),
            Self::GreaterOrEqual(a, b) => write!(f, "({a} >= {b})"),
            Self::Less(a, b) => write!(f, "({a} < {b})"),
            Self::LessOrEqual(a, b) => write!(f, "({a} <= {b})"),
            Self::In(a, list) => {
                write!(f, "({a} IN (")?;
                write_list(f, list)?;
                f.write_str("))")
            }
            Self::Add(a, b) => write!(f, "({a} + {b})"),
            Self::Subtract(a, b) => write!(f, "({a} - {b})"),
            Self::Multiply(a, b) => write!(f, "({a} * {b})"),
            Self::Divide(a, b) => write!(f, "({a} / {b})"),
            Self::UnaryPlus(a) => write!(f, "+{a}"),
            Self::UnaryMinus(a) => write!(f, "-{a}"),
            Self::Not(a) => write!(f, "!{a}"),
            Self::Exists(pattern) => write!(f, "EXISTS {{ {pattern:#} }}"),
            Self::Bound(v) => write!(f, "BOUND({v})"),
            Self::If(a, b, c) => write!(f, "IF({a}, {b}, {c})"),
            Self::Coalesce(list) => {
                f.write_str("COALESCE(")?;
                write_list(f, list)?;
                f.write_str(")")
            }
            Self::FunctionCall(function, args) => {
                write!(f, "{function}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

/// A sort key of an `ORDER BY` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderCondition {
    Asc(Expression),
    Desc(Expression),
}

impl OrderCondition {
    pub fn expression(&self) -> &Expression {
        match self {
            Self::Asc(e) | Self::Desc(e) => e,
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, Self::Desc(_))
    }
}

impl fmt::Display for OrderCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc(e) => write!(f, "ASC({e})"),
            Self::Desc(e) => write!(f, "DESC({e})"),
        }
    }
}

/// An aggregate function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    /// `GROUP_CONCAT`. The default separator is a single space.
    GroupConcat { separator: Option<String> },
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => f.write_str("COUNT"),
            Self::Sum => f.write_str("SUM"),
            Self::Avg => f.write_str("AVG"),
            Self::Min => f.write_str("MIN"),
            Self::Max => f.write_str("MAX"),
            Self::Sample => f.write_str("SAMPLE"),
            Self::GroupConcat { .. } => f.write_str("GROUP_CONCAT"),
        }
    }
}

/// An aggregate that is computed over each group of a `GROUP BY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateExpression {
    /// `COUNT(*)` or `COUNT(DISTINCT *)`.
    CountSolutions { distinct: bool },
    /// An aggregate function applied to an expression.
    FunctionCall {
        function: AggregateFunction,
        expression: Expression,
        distinct: bool,
    },
}

impl AggregateExpression {
    /// Returns whether the aggregate produces a value for every group, even if the input
    /// contains unexpected values.
    pub fn is_total(&self) -> bool {
        matches!(
            self,
            Self::CountSolutions { .. }
                | Self::FunctionCall {
                    function: AggregateFunction::Count,
                    ..
                }
        )
    }
}

impl fmt::Display for AggregateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountSolutions { distinct: false } => f.write_str("COUNT(*)"),
            Self::CountSolutions { distinct: true } => f.write_str("COUNT(DISTINCT *)"),
            Self::FunctionCall {
                function,
                expression,
                distinct,
            } => {
                let distinct = if *distinct { "DISTINCT " } else { "" };
                match function {
                    AggregateFunction::GroupConcat {
                        separator: Some(separator),
                    } => write!(
                        f,
                        "{function}({distinct}{expression}; SEPARATOR = {separator:?})"
                    ),
                    _ => write!(f, "{function}({distinct}{expression})"),
                }
            }
        }
    }
}
