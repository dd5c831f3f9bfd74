//! Typed views on RDF terms as used by SPARQL operators: numeric promotion, string arguments,
//! equality, comparison, and the total ordering of `ORDER BY`.

use rdf_algebra_model::vocab::{rdf, xsd};
use rdf_algebra_model::{
    Decimal, Double, Integer, Literal, LiteralRef, NamedNodeRef, Term, ThinError, ThinResult,
};
use std::cmp::Ordering;
use std::str::FromStr;

/// A numeric value after parsing the lexical form of a literal.
///
/// `xsd:float` is evaluated with double precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Numeric {
    Integer(Integer),
    Decimal(Decimal),
    Double(Double),
}

enum NumericPair {
    Integer(Integer, Integer),
    Decimal(Decimal, Decimal),
    Double(Double, Double),
}

impl Numeric {
    pub fn from_literal(literal: LiteralRef<'_>) -> Option<Self> {
        let value = literal.value();
        match LiteralKind::of_datatype(literal.datatype()) {
            LiteralKind::Integer => Integer::from_str(value).ok().map(Self::Integer),
            LiteralKind::Decimal => Decimal::from_str(value).ok().map(Self::Decimal),
            LiteralKind::Double => Double::from_str(value).ok().map(Self::Double),
            _ => None,
        }
    }

    pub fn from_term(term: &Term) -> ThinResult<Self> {
        match term {
            Term::Literal(literal) => Self::from_literal(literal.as_ref()).ok_or(ThinError {}),
            _ => ThinError::expected(),
        }
    }

    pub fn to_double(self) -> Double {
        match self {
            Self::Integer(value) => value.into(),
            Self::Decimal(value) => value.into(),
            Self::Double(value) => value,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.to_double().into()
    }

    pub fn is_zero(self) -> bool {
        let value = self.to_f64();
        value == 0.0 || value.is_nan()
    }

    pub fn into_literal(self) -> Literal {
        match self {
            Self::Integer(value) => Literal::new_typed_literal(value.to_string(), xsd::INTEGER),
            Self::Decimal(value) => Literal::new_typed_literal(value.to_string(), xsd::DECIMAL),
            Self::Double(value) => Literal::new_typed_literal(value.to_string(), xsd::DOUBLE),
        }
    }

    pub fn into_term(self) -> Term {
        self.into_literal().into()
    }

    fn promote(self, other: Self) -> NumericPair {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => NumericPair::Integer(a, b),
            (Self::Integer(a), Self::Decimal(b)) => NumericPair::Decimal(a.into(), b),
            (Self::Decimal(a), Self::Integer(b)) => NumericPair::Decimal(a, b.into()),
            (Self::Decimal(a), Self::Decimal(b)) => NumericPair::Decimal(a, b),
            (a, b) => NumericPair::Double(a.to_double(), b.to_double()),
        }
    }

    pub fn add(self, other: Self) -> ThinResult<Self> {
        Ok(match self.promote(other) {
            NumericPair::Integer(a, b) => Self::Integer(a.checked_add(b).ok_or(ThinError {})?),
            NumericPair::Decimal(a, b) => Self::Decimal(a.checked_add(b).ok_or(ThinError {})?),
            NumericPair::Double(a, b) => Self::Double(a + b),
        })
    }

    pub fn subtract(self, other: Self) -> ThinResult<Self> {
        Ok(match self.promote(other) {
            NumericPair::Integer(a, b) => Self::Integer(a.checked_sub(b).ok_or(ThinError {})?),
            NumericPair::Decimal(a, b) => Self::Decimal(a.checked_sub(b).ok_or(ThinError {})?),
            NumericPair::Double(a, b) => Self::Double(a - b),
        })
    }

    pub fn multiply(self, other: Self) -> ThinResult<Self> {
        Ok(match self.promote(other) {
            NumericPair::Integer(a, b) => Self::Integer(a.checked_mul(b).ok_or(ThinError {})?),
            NumericPair::Decimal(a, b) => Self::Decimal(a.checked_mul(b).ok_or(ThinError {})?),
            NumericPair::Double(a, b) => Self::Double(a * b),
        })
    }

    /// Divides two numbers. The division of two integers is a decimal.
    pub fn divide(self, other: Self) -> ThinResult<Self> {
        Ok(match self.promote(other) {
            NumericPair::Integer(a, b) => Self::Decimal(
                Decimal::from(a)
                    .checked_div(Decimal::from(b))
                    .ok_or(ThinError {})?,
            ),
            NumericPair::Decimal(a, b) => Self::Decimal(a.checked_div(b).ok_or(ThinError {})?),
            NumericPair::Double(a, b) => Self::Double(a / b),
        })
    }

    pub fn negate(self) -> ThinResult<Self> {
        Ok(match self {
            Self::Integer(value) => Self::Integer(value.checked_neg().ok_or(ThinError {})?),
            Self::Decimal(value) => Self::Decimal(value.checked_neg().ok_or(ThinError {})?),
            Self::Double(value) => Self::Double(-value),
        })
    }

    pub fn abs(self) -> ThinResult<Self> {
        Ok(match self {
            Self::Integer(value) => Self::Integer(value.checked_abs().ok_or(ThinError {})?),
            Self::Decimal(value) => Self::Decimal(value.checked_abs().ok_or(ThinError {})?),
            Self::Double(value) => Self::Double(value.abs()),
        })
    }

    pub fn ceil(self) -> ThinResult<Self> {
        Ok(match self {
            Self::Integer(_) => self,
            Self::Decimal(value) => Self::Decimal(value.checked_ceil().ok_or(ThinError {})?),
            Self::Double(value) => Self::Double(value.ceil()),
        })
    }

    pub fn floor(self) -> ThinResult<Self> {
        Ok(match self {
            Self::Integer(_) => self,
            Self::Decimal(value) => Self::Decimal(value.checked_floor().ok_or(ThinError {})?),
            Self::Double(value) => Self::Double(value.floor()),
        })
    }

    pub fn round(self) -> ThinResult<Self> {
        Ok(match self {
            Self::Integer(_) => self,
            Self::Decimal(value) => Self::Decimal(value.checked_round().ok_or(ThinError {})?),
            Self::Double(value) => Self::Double(value.round()),
        })
    }

    /// Compares two numbers after type promotion. Returns [None] if one of them is `NaN`.
    pub fn compare(self, other: Self) -> Option<Ordering> {
        match self.promote(other) {
            NumericPair::Integer(a, b) => Some(a.cmp(&b)),
            NumericPair::Decimal(a, b) => Some(a.cmp(&b)),
            NumericPair::Double(a, b) => a.partial_cmp(&b),
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Integer(_) => 0,
            Self::Decimal(_) => 1,
            Self::Double(_) => 2,
        }
    }

    /// A total order over numbers that agrees with [Numeric::compare] whenever the latter is
    /// defined and the values are representable as doubles.
    fn total_cmp(self, other: Self) -> Ordering {
        self.to_f64()
            .total_cmp(&other.to_f64())
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| match (self, other) {
                (Self::Integer(a), Self::Integer(b)) => a.cmp(&b),
                (Self::Decimal(a), Self::Decimal(b)) => a.cmp(&b),
                _ => Ordering::Equal,
            })
    }
}

/// The categories of literals that SPARQL operators distinguish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum LiteralKind {
    Integer,
    Decimal,
    Double,
    Boolean,
    String,
    LangString,
    DateTime,
    Other,
}

impl LiteralKind {
    pub fn of(literal: LiteralRef<'_>) -> Self {
        Self::of_datatype(literal.datatype())
    }

    fn of_datatype(datatype: NamedNodeRef<'_>) -> Self {
        if datatype == xsd::STRING {
            Self::String
        } else if datatype == rdf::LANG_STRING {
            Self::LangString
        } else if datatype == xsd::BOOLEAN {
            Self::Boolean
        } else if datatype == xsd::DECIMAL {
            Self::Decimal
        } else if datatype == xsd::DOUBLE || datatype == xsd::FLOAT {
            Self::Double
        } else if is_integer_datatype(datatype) {
            Self::Integer
        } else if datatype == xsd::DATE_TIME
            || datatype == xsd::DATE
            || datatype == xsd::TIME
            || datatype == xsd::DATE_TIME_STAMP
        {
            Self::DateTime
        } else {
            Self::Other
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Double)
    }
}

fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    [
        xsd::INTEGER,
        xsd::LONG,
        xsd::INT,
        xsd::SHORT,
        xsd::BYTE,
        xsd::NON_NEGATIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::UNSIGNED_LONG,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_BYTE,
    ]
    .contains(&datatype)
}

/// Parses the lexical form of an `xsd:boolean`.
pub(crate) fn parse_boolean(value: &str) -> ThinResult<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => ThinError::expected(),
    }
}

/// A string argument of a string function: the lexical form and an optional language tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StringArg<'t> {
    pub value: &'t str,
    pub language: Option<&'t str>,
}

impl<'t> StringArg<'t> {
    /// Accepts simple literals, `xsd:string` literals, and language-tagged strings.
    pub fn from_term(term: &'t Term) -> ThinResult<Self> {
        match term {
            Term::Literal(literal)
                if matches!(
                    LiteralKind::of(literal.as_ref()),
                    LiteralKind::String | LiteralKind::LangString
                ) =>
            {
                Ok(Self {
                    value: literal.value(),
                    language: literal.language(),
                })
            }
            _ => ThinError::expected(),
        }
    }

    /// Accepts only literals without a language tag.
    pub fn simple_from_term(term: &'t Term) -> ThinResult<&'t str> {
        let arg = Self::from_term(term)?;
        match arg.language {
            None => Ok(arg.value),
            Some(_) => ThinError::expected(),
        }
    }

    /// Checks whether two arguments are compatible as defined for `CONTAINS` and friends.
    pub fn is_compatible_with(self, other: StringArg<'_>) -> bool {
        match (self.language, other.language) {
            (_, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, Some(_)) => false,
        }
    }

    /// Creates a literal with the language of this argument.
    pub fn derive(self, value: impl Into<String>) -> Term {
        string_literal(value, self.language)
    }
}

pub(crate) fn string_literal(value: impl Into<String>, language: Option<&str>) -> Term {
    match language {
        Some(language) => {
            Literal::new_language_tagged_literal_unchecked(value, language.to_ascii_lowercase())
                .into()
        }
        None => Literal::new_simple_literal(value).into(),
    }
}

/// Computes the effective boolean value of a term.
pub(crate) fn effective_boolean_value(term: &Term) -> ThinResult<bool> {
    let Term::Literal(literal) = term else {
        return ThinError::expected();
    };
    match LiteralKind::of(literal.as_ref()) {
        LiteralKind::Boolean => Ok(parse_boolean(literal.value()).unwrap_or(false)),
        LiteralKind::String => Ok(!literal.value().is_empty()),
        kind if kind.is_numeric() => {
            Ok(Numeric::from_literal(literal.as_ref()).is_some_and(|value| !value.is_zero()))
        }
        _ => ThinError::expected(),
    }
}

/// RDFterm-equal with value comparison for known datatypes.
///
/// Returns an error if two different literals with an unknown datatype are compared.
pub fn terms_equal(a: &Term, b: &Term) -> ThinResult<bool> {
    let (Term::Literal(a), Term::Literal(b)) = (a, b) else {
        return Ok(a == b);
    };
    let (kind_a, kind_b) = (LiteralKind::of(a.as_ref()), LiteralKind::of(b.as_ref()));
    if kind_a.is_numeric() && kind_b.is_numeric() {
        let a = Numeric::from_literal(a.as_ref());
        let b = Numeric::from_literal(b.as_ref());
        return match (a, b) {
            (Some(a), Some(b)) => Ok(a.compare(b) == Some(Ordering::Equal)),
            _ => ThinError::expected(),
        };
    }
    if a == b {
        return Ok(true);
    }
    match (kind_a, kind_b) {
        (LiteralKind::Other, _) | (_, LiteralKind::Other) => ThinError::expected(),
        (LiteralKind::Boolean, LiteralKind::Boolean) => {
            Ok(parse_boolean(a.value())? == parse_boolean(b.value())?)
        }
        _ => Ok(false),
    }
}

/// Compares two terms as done by the SPARQL `<`, `<=`, `>`, and `>=` operators.
///
/// Returns an error for incomparable terms.
pub fn compare_terms(a: &Term, b: &Term) -> ThinResult<Ordering> {
    let (Term::Literal(a), Term::Literal(b)) = (a, b) else {
        return ThinError::expected();
    };
    let (kind_a, kind_b) = (LiteralKind::of(a.as_ref()), LiteralKind::of(b.as_ref()));
    match (kind_a, kind_b) {
        (a_kind, b_kind) if a_kind.is_numeric() && b_kind.is_numeric() => {
            let a = Numeric::from_literal(a.as_ref()).ok_or(ThinError {})?;
            let b = Numeric::from_literal(b.as_ref()).ok_or(ThinError {})?;
            a.compare(b).ok_or(ThinError {})
        }
        (LiteralKind::String, LiteralKind::String) => Ok(a.value().cmp(b.value())),
        (LiteralKind::LangString, LiteralKind::LangString) if a.language() == b.language() => {
            Ok(a.value().cmp(b.value()))
        }
        (LiteralKind::Boolean, LiteralKind::Boolean) => {
            Ok(parse_boolean(a.value())?.cmp(&parse_boolean(b.value())?))
        }
        (LiteralKind::DateTime, LiteralKind::DateTime) if a.datatype() == b.datatype() => {
            Ok(a.value().cmp(b.value()))
        }
        _ => ThinError::expected(),
    }
}

/// The total order used by `ORDER BY`.
///
/// Unbound values come first, followed by blank nodes, IRIs, and literals. Numeric literals are
/// ordered by value.
pub fn order_terms(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Term::BlankNode(a), Term::BlankNode(b)) => a.as_str().cmp(b.as_str()),
            (Term::NamedNode(a), Term::NamedNode(b)) => a.as_str().cmp(b.as_str()),
            (Term::Literal(a), Term::Literal(b)) => order_literals(a, b),
            _ => term_rank(a).cmp(&term_rank(b)),
        },
    }
}

fn term_rank(term: &Term) -> u8 {
    match term {
        Term::BlankNode(_) => 0,
        Term::NamedNode(_) => 1,
        Term::Literal(_) => 2,
    }
}

fn order_literals(a: &Literal, b: &Literal) -> Ordering {
    let numeric_a = Numeric::from_literal(a.as_ref());
    let numeric_b = Numeric::from_literal(b.as_ref());
    let group = |literal: &Literal, numeric: Option<Numeric>| match (
        numeric,
        LiteralKind::of(literal.as_ref()),
    ) {
        (Some(_), _) => 0,
        (None, LiteralKind::Boolean) => 1,
        (None, LiteralKind::String | LiteralKind::LangString) => 2,
        (None, LiteralKind::DateTime) => 3,
        (None, _) => 4,
    };

    group(a, numeric_a)
        .cmp(&group(b, numeric_b))
        .then_with(|| match (numeric_a, numeric_b) {
            (Some(x), Some(y)) => x.total_cmp(y),
            _ => Ordering::Equal,
        })
        .then_with(|| {
            let boolean_a = parse_boolean(a.value()).ok();
            let boolean_b = parse_boolean(b.value()).ok();
            match (LiteralKind::of(a.as_ref()), LiteralKind::of(b.as_ref())) {
                (LiteralKind::Boolean, LiteralKind::Boolean) => boolean_a.cmp(&boolean_b),
                _ => Ordering::Equal,
            }
        })
        .then_with(|| a.datatype().as_str().cmp(b.datatype().as_str()))
        .then_with(|| a.value().cmp(b.value()))
        .then_with(|| a.language().cmp(&b.language()))
}
