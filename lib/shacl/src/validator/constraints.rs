//! The constraint components of [SHACL Core](https://www.w3.org/TR/shacl/#core-components).

use crate::error::ShaclError;
use crate::shape::{Constraint, Shape};
use crate::validator::{instance_of, Failure, ValidationRun};
use crate::shape::ShapeId;
use oxsdatatypes::{Boolean, Date, DateTime, Decimal, Double, Float, Integer};
use rdf_algebra_engine::expression::compare_terms;
use rdf_algebra_logical::PropertyPath;
use rdf_algebra_model::vocab::{rdf, xsd};
use rdf_algebra_model::{Literal, LiteralRef, NamedNode, NamedNodeRef, Term};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

impl ValidationRun<'_> {
    /// Returns the failures of `constraint` for the given focus node and its value nodes.
    pub(super) fn check(
        &mut self,
        shape: &Shape,
        constraint: &Constraint,
        focus: &Term,
        values: &[Term],
    ) -> Result<Vec<Failure>, ShaclError> {
        Ok(match constraint {
            Constraint::Class(class) => {
                let mut failures = Vec::new();
                for value in values {
                    if !self.is_instance(value, class)? {
                        failures.push(Failure::new(Some(value.clone())));
                    }
                }
                failures
            }
            Constraint::Datatype(datatype) => each_value(values, |value| match value {
                Term::Literal(literal) => {
                    literal.datatype() == datatype.as_ref() && is_well_formed(literal.as_ref())
                }
                _ => false,
            }),
            Constraint::NodeKind(kind) => each_value(values, |value| kind.matches(value)),
            Constraint::MinCount(min) => count_failure(count(values) < *min),
            Constraint::MaxCount(max) => count_failure(count(values) > *max),
            Constraint::MinExclusive(bound) => compare_each(values, bound, Ordering::is_gt),
            Constraint::MinInclusive(bound) => compare_each(values, bound, Ordering::is_ge),
            Constraint::MaxExclusive(bound) => compare_each(values, bound, Ordering::is_lt),
            Constraint::MaxInclusive(bound) => compare_each(values, bound, Ordering::is_le),
            Constraint::MinLength(min) => each_value(values, |value| {
                string_form(value).is_some_and(|s| count_chars(s) >= *min)
            }),
            Constraint::MaxLength(max) => each_value(values, |value| {
                string_form(value).is_some_and(|s| count_chars(s) <= *max)
            }),
            Constraint::Pattern { regex, .. } => each_value(values, |value| {
                string_form(value).is_some_and(|s| regex.is_match(s))
            }),
            Constraint::LanguageIn(ranges) => each_value(values, |value| match value {
                Term::Literal(literal) => literal.language().is_some_and(|language| {
                    ranges.iter().any(|range| language_matches(language, range))
                }),
                _ => false,
            }),
            Constraint::UniqueLang => unique_lang(values),
            Constraint::Equals(predicate) => {
                let others = self.reader().objects(focus, predicate.as_ref())?;
                values
                    .iter()
                    .filter(|value| !others.contains(*value))
                    .chain(others.iter().filter(|other| !values.contains(*other)))
                    .map(|value| Failure::new(Some(value.clone())))
                    .collect()
            }
            Constraint::Disjoint(predicate) => {
                let others = self.reader().objects(focus, predicate.as_ref())?;
                each_value(values, |value| !others.contains(value))
            }
            Constraint::LessThan(predicate) => {
                self.compare_with_property(focus, values, predicate, Ordering::is_lt)?
            }
            Constraint::LessThanOrEquals(predicate) => {
                self.compare_with_property(focus, values, predicate, Ordering::is_le)?
            }
            Constraint::Not(inner) => {
                let mut failures = Vec::new();
                for value in values {
                    if self.conforms_to(value, *inner)? {
                        failures.push(Failure::new(Some(value.clone())));
                    }
                }
                failures
            }
            Constraint::And(members) => {
                self.count_conforming(values, members, |count| count == members.len())?
            }
            Constraint::Or(members) => self.count_conforming(values, members, |count| count > 0)?,
            Constraint::Xone(members) => {
                self.count_conforming(values, members, |count| count == 1)?
            }
            Constraint::Node(inner) => {
                let mut failures = Vec::new();
                for value in values {
                    if !self.conforms_to(value, *inner)? {
                        failures.push(Failure::new(Some(value.clone())));
                    }
                }
                failures
            }
            // Property shapes are validated with the value nodes as focus nodes and report their
            // own results.
            Constraint::Property(_) => Vec::new(),
            Constraint::QualifiedValueShape {
                shape: qualified,
                min_count,
                max_count,
                siblings,
            } => {
                let mut conforming = 0;
                for value in values {
                    if self.conforms_to(value, *qualified)?
                        && !self.conforms_to_any(value, siblings.as_deref().unwrap_or_default())?
                    {
                        conforming += 1;
                    }
                }
                count_failure(
                    min_count.is_some_and(|min| conforming < min)
                        || max_count.is_some_and(|max| conforming > max),
                )
            }
            Constraint::Closed { ignored_properties } => {
                let allowed = allowed_properties(self, shape);
                let mut failures = Vec::new();
                for value in values {
                    for triple in self.reader().triples(Some(value), None, None)? {
                        if allowed.contains(&triple.predicate)
                            || ignored_properties.contains(&triple.predicate)
                        {
                            continue;
                        }
                        failures.push(
                            Failure::new(Some(triple.object))
                                .with_path(PropertyPath::Predicate(triple.predicate)),
                        );
                    }
                }
                failures
            }
            Constraint::HasValue(expected) => count_failure(!values.contains(expected)),
            Constraint::In(members) => each_value(values, |value| members.contains(value)),
            Constraint::Sparql(sparql) => sparql.evaluate(
                &self.evaluator,
                shape.node(),
                focus,
                shape.is_property_shape(),
            )?,
            Constraint::Component(component) => component.evaluate(
                &self.evaluator,
                shape.node(),
                focus,
                values,
                shape.is_property_shape(),
            )?,
        })
    }

    fn is_instance(&self, node: &Term, class: &Term) -> Result<bool, ShaclError> {
        Ok(self
            .evaluator
            .path_from(&instance_of(), node)?
            .contains(class))
    }

    fn conforms_to_any(
        &mut self,
        node: &Term,
        shapes: &[ShapeId],
    ) -> Result<bool, ShaclError> {
        for shape in shapes {
            if self.conforms_to(node, *shape)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reports each value node for which the number of conforming `members` is not accepted.
    fn count_conforming(
        &mut self,
        values: &[Term],
        members: &[ShapeId],
        accept: impl Fn(usize) -> bool,
    ) -> Result<Vec<Failure>, ShaclError> {
        let mut failures = Vec::new();
        for value in values {
            let mut conforming = 0;
            for member in members {
                if self.conforms_to(value, *member)? {
                    conforming += 1;
                }
            }
            if !accept(conforming) {
                failures.push(Failure::new(Some(value.clone())));
            }
        }
        Ok(failures)
    }

    /// Compares every value node with every value of `predicate` at the focus node.
    fn compare_with_property(
        &self,
        focus: &Term,
        values: &[Term],
        predicate: &NamedNode,
        accept: impl Fn(Ordering) -> bool,
    ) -> Result<Vec<Failure>, ShaclError> {
        let others = self.reader().objects(focus, predicate.as_ref())?;
        let mut failures = Vec::new();
        for value in values {
            for other in &others {
                if !compare_terms(value, other).is_ok_and(&accept) {
                    failures.push(Failure::new(Some(value.clone())));
                }
            }
        }
        Ok(failures)
    }
}

/// The predicates of the property shapes of `shape`, used by `sh:closed`.
fn allowed_properties(run: &ValidationRun<'_>, shape: &Shape) -> Vec<NamedNode> {
    shape
        .constraints()
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::Property(property) => run.shapes.get(*property)?.path(),
            _ => None,
        })
        .filter_map(|path| match path {
            PropertyPath::Predicate(predicate) => Some(predicate.clone()),
            _ => None,
        })
        .collect()
}

/// Reports each value for which `accept` is false.
fn each_value(values: &[Term], accept: impl Fn(&Term) -> bool) -> Vec<Failure> {
    values
        .iter()
        .filter(|value| !accept(*value))
        .map(|value| Failure::new(Some(value.clone())))
        .collect()
}

fn compare_each(values: &[Term], bound: &Term, accept: impl Fn(Ordering) -> bool) -> Vec<Failure> {
    each_value(values, |value| {
        compare_terms(value, bound).is_ok_and(&accept)
    })
}

/// A failure without a value, as reported by the cardinality constraints.
fn count_failure(failed: bool) -> Vec<Failure> {
    if failed {
        vec![Failure::new(None)]
    } else {
        Vec::new()
    }
}

fn count(values: &[Term]) -> u64 {
    u64::try_from(values.len()).unwrap_or(u64::MAX)
}

fn count_chars(value: &str) -> u64 {
    u64::try_from(value.chars().count()).unwrap_or(u64::MAX)
}

/// One failure for each language tag that is used by more than one value.
fn unique_lang(values: &[Term]) -> Vec<Failure> {
    let mut languages = BTreeMap::<String, usize>::new();
    for value in values {
        if let Term::Literal(literal) = value {
            if let Some(language) = literal.language() {
                *languages.entry(language.to_ascii_lowercase()).or_default() += 1;
            }
        }
    }
    languages
        .into_values()
        .filter(|count| *count > 1)
        .map(|_| Failure::new(None))
        .collect()
}

/// The string that `sh:minLength`, `sh:maxLength`, and `sh:pattern` operate on. Blank nodes have
/// none.
fn string_form(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(node) => Some(node.as_str()),
        Term::Literal(literal) => Some(literal.value()),
        Term::BlankNode(_) => None,
    }
}

/// Basic language range matching as used by `langMatches`.
fn language_matches(language: &str, range: &str) -> bool {
    if range == "*" {
        return !language.is_empty();
    }
    if language.eq_ignore_ascii_case(range) {
        return true;
    }
    language
        .get(..range.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(range))
        && language.as_bytes().get(range.len()) == Some(&b'-')
}

/// Checks that the lexical form of a literal is valid for its datatype.
///
/// Datatypes without a known lexical space are always well-formed.
fn is_well_formed(literal: LiteralRef<'_>) -> bool {
    let value = literal.value();
    let datatype = literal.datatype();
    if datatype == rdf::LANG_STRING {
        literal.language().is_some()
    } else if is_integer_datatype(datatype) {
        Integer::from_str(value).is_ok()
    } else if datatype == xsd::DECIMAL {
        Decimal::from_str(value).is_ok()
    } else if datatype == xsd::DOUBLE {
        Double::from_str(value).is_ok()
    } else if datatype == xsd::FLOAT {
        Float::from_str(value).is_ok()
    } else if datatype == xsd::BOOLEAN {
        Boolean::from_str(value).is_ok()
    } else if datatype == xsd::DATE_TIME {
        DateTime::from_str(value).is_ok()
    } else if datatype == xsd::DATE {
        Date::from_str(value).is_ok()
    } else {
        true
    }
}

fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    [
        xsd::INTEGER,
        xsd::INT,
        xsd::LONG,
        xsd::SHORT,
        xsd::BYTE,
        xsd::NON_NEGATIVE_INTEGER,
        xsd::POSITIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
    ]
    .contains(&datatype)
}

/// The message of a result if neither the shape nor the constraint provide one.
pub(super) fn default_message(constraint: &Constraint) -> Literal {
    let message = match constraint {
        Constraint::Class(class) => format!("Value is not an instance of {class}"),
        Constraint::Datatype(datatype) => format!("Value is not a well-formed {datatype} literal"),
        Constraint::NodeKind(kind) => format!("Value does not have the node kind {}", kind.as_node()),
        Constraint::MinCount(min) => format!("Less than {min} values"),
        Constraint::MaxCount(max) => format!("More than {max} values"),
        Constraint::MinExclusive(bound) => format!("Value is not greater than {bound}"),
        Constraint::MinInclusive(bound) => format!("Value is not greater than or equal to {bound}"),
        Constraint::MaxExclusive(bound) => format!("Value is not less than {bound}"),
        Constraint::MaxInclusive(bound) => format!("Value is not less than or equal to {bound}"),
        Constraint::MinLength(min) => format!("Value has less than {min} characters"),
        Constraint::MaxLength(max) => format!("Value has more than {max} characters"),
        Constraint::Pattern { pattern, .. } => format!("Value does not match the pattern {pattern:?}"),
        Constraint::LanguageIn(languages) => {
            format!("Language tag is not one of {}", languages.join(", "))
        }
        Constraint::UniqueLang => "Language tag is used more than once".to_owned(),
        Constraint::Equals(predicate) => format!("Values are not equal to the values of {predicate}"),
        Constraint::Disjoint(predicate) => format!("Value is also a value of {predicate}"),
        Constraint::LessThan(predicate) => format!("Value is not less than the values of {predicate}"),
        Constraint::LessThanOrEquals(predicate) => {
            format!("Value is not less than or equal to the values of {predicate}")
        }
        Constraint::Not(_) => "Value conforms to a negated shape".to_owned(),
        Constraint::And(_) => "Value does not conform to all shapes".to_owned(),
        Constraint::Or(_) => "Value does not conform to any shape".to_owned(),
        Constraint::Xone(_) => "Value does not conform to exactly one shape".to_owned(),
        Constraint::Node(_) | Constraint::Property(_) => {
            "Value does not conform to the shape".to_owned()
        }
        Constraint::QualifiedValueShape {
            min_count: Some(min),
            ..
        } => format!("Less than {min} values conform to the qualified value shape"),
        Constraint::QualifiedValueShape { max_count, .. } => format!(
            "More than {} values conform to the qualified value shape",
            max_count.unwrap_or_default()
        ),
        Constraint::Closed { .. } => "Predicate is not allowed by the closed shape".to_owned(),
        Constraint::HasValue(value) => format!("Missing expected value {value}"),
        Constraint::In(_) => "Value is not in the list of allowed values".to_owned(),
        Constraint::Sparql(_) | Constraint::Component(_) => {
            format!("Violation of {}", constraint.component())
        }
    };
    Literal::new_simple_literal(message)
}
