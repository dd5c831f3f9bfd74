use crate::eval::SimpleEvaluator;
use crate::expression::value::{
    effective_boolean_value, parse_boolean, string_literal, LiteralKind, Numeric, StringArg,
};
use rdf_algebra_logical::Function;
use rdf_algebra_model::vocab::xsd;
use rdf_algebra_model::{
    BlankNode, Decimal, Double, Integer, Literal, NamedNode, NamedNodeRef, Solution, Term,
    ThinError, ThinResult,
};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const REGEX_SIZE_LIMIT: usize = 1_000_000;

impl SimpleEvaluator {
    /// Calls a built-in or custom function with already evaluated arguments.
    pub(crate) fn call_function(
        &self,
        function: &Function,
        args: &[Term],
        solution: &Solution,
    ) -> ThinResult<Term> {
        match function {
            Function::Str => match unary(args)? {
                Term::NamedNode(node) => Ok(Literal::new_simple_literal(node.as_str()).into()),
                Term::Literal(literal) => Ok(Literal::new_simple_literal(literal.value()).into()),
                Term::BlankNode(_) => ThinError::expected(),
            },
            Function::Lang => match unary(args)? {
                Term::Literal(literal) => {
                    Ok(Literal::new_simple_literal(literal.language().unwrap_or("")).into())
                }
                _ => ThinError::expected(),
            },
            Function::LangMatches => {
                let (tag, range) = binary(args)?;
                let tag = StringArg::simple_from_term(tag)?;
                let range = StringArg::simple_from_term(range)?;
                Ok(bool_term(lang_matches(tag, range)))
            }
            Function::Datatype => match unary(args)? {
                Term::Literal(literal) => Ok(literal.datatype().into_owned().into()),
                _ => ThinError::expected(),
            },
            Function::Iri => match unary(args)? {
                Term::NamedNode(node) => Ok(node.clone().into()),
                term => {
                    let value = StringArg::simple_from_term(term)?;
                    let iri = match self.base_iri() {
                        Some(base) => base.resolve(value)?.into_inner(),
                        None => value.to_owned(),
                    };
                    Ok(NamedNode::new(iri)?.into())
                }
            },
            Function::BNode => match args {
                [] => Ok(BlankNode::default().into()),
                [term] => {
                    let label = StringArg::simple_from_term(term)?;
                    Ok(self.labelled_blank_node(label, solution).into())
                }
                _ => ThinError::expected(),
            },
            Function::Abs => Ok(Numeric::from_term(unary(args)?)?.abs()?.into_term()),
            Function::Ceil => Ok(Numeric::from_term(unary(args)?)?.ceil()?.into_term()),
            Function::Floor => Ok(Numeric::from_term(unary(args)?)?.floor()?.into_term()),
            Function::Round => Ok(Numeric::from_term(unary(args)?)?.round()?.into_term()),
            Function::Concat => concat(args),
            Function::SubStr => substring(args),
            Function::StrLen => {
                let arg = StringArg::from_term(unary(args)?)?;
                Ok(Literal::from(i64::try_from(arg.value.chars().count())?).into())
            }
            Function::Replace => replace(args),
            Function::UCase => {
                let arg = StringArg::from_term(unary(args)?)?;
                Ok(arg.derive(arg.value.to_uppercase()))
            }
            Function::LCase => {
                let arg = StringArg::from_term(unary(args)?)?;
                Ok(arg.derive(arg.value.to_lowercase()))
            }
            Function::Contains => {
                let (haystack, needle) = compatible_strings(args)?;
                Ok(bool_term(haystack.value.contains(needle.value)))
            }
            Function::StrStarts => {
                let (haystack, needle) = compatible_strings(args)?;
                Ok(bool_term(haystack.value.starts_with(needle.value)))
            }
            Function::StrEnds => {
                let (haystack, needle) = compatible_strings(args)?;
                Ok(bool_term(haystack.value.ends_with(needle.value)))
            }
            Function::StrBefore => {
                let (haystack, needle) = compatible_strings(args)?;
                Ok(match haystack.value.find(needle.value) {
                    Some(position) => haystack.derive(&haystack.value[..position]),
                    None => string_literal("", None),
                })
            }
            Function::StrAfter => {
                let (haystack, needle) = compatible_strings(args)?;
                Ok(match haystack.value.find(needle.value) {
                    Some(position) => {
                        haystack.derive(&haystack.value[position + needle.value.len()..])
                    }
                    None => string_literal("", None),
                })
            }
            Function::StrLang => {
                let (value, language) = binary(args)?;
                let value = StringArg::simple_from_term(value)?;
                let language = StringArg::simple_from_term(language)?;
                Literal::new_language_tagged_literal(value, language)
                    .map(Term::from)
                    .map_err(|_| ThinError {})
            }
            Function::StrDt => {
                let (value, datatype) = binary(args)?;
                let value = StringArg::simple_from_term(value)?;
                let Term::NamedNode(datatype) = datatype else {
                    return ThinError::expected();
                };
                Ok(Literal::new_typed_literal(value, datatype.clone()).into())
            }
            Function::IsIri => Ok(bool_term(matches!(unary(args)?, Term::NamedNode(_)))),
            Function::IsBlank => Ok(bool_term(matches!(unary(args)?, Term::BlankNode(_)))),
            Function::IsLiteral => Ok(bool_term(matches!(unary(args)?, Term::Literal(_)))),
            Function::IsNumeric => Ok(bool_term(Numeric::from_term(unary(args)?).is_ok())),
            Function::Regex => {
                let (text, pattern, flags) = match args {
                    [text, pattern] => (text, pattern, None),
                    [text, pattern, flags] => (text, pattern, Some(flags)),
                    _ => return ThinError::expected(),
                };
                let text = StringArg::from_term(text)?;
                let regex = compile_regex(
                    StringArg::simple_from_term(pattern)?,
                    flags.map(StringArg::simple_from_term).transpose()?,
                )?;
                Ok(bool_term(regex.is_match(text.value)))
            }
            Function::Custom(name) => self.call_custom_function(name, args),
        }
    }

    fn call_custom_function(&self, name: &NamedNode, args: &[Term]) -> ThinResult<Term> {
        if let Some(function) = self.custom_function(name) {
            return function(args).ok_or(ThinError {});
        }
        cast(name.as_ref(), unary(args)?)
    }

    /// Creates a blank node that is stable for the same label within one solution of one
    /// evaluation.
    fn labelled_blank_node(&self, label: &str, solution: &Solution) -> BlankNode {
        let mut hasher = FxHasher::default();
        solution.hash(&mut hasher);
        label.hash(&mut hasher);
        let id = self.blank_node_seed() ^ u128::from(hasher.finish());
        BlankNode::new_from_unique_id(id)
    }
}

fn unary(args: &[Term]) -> ThinResult<&Term> {
    match args {
        [arg] => Ok(arg),
        _ => ThinError::expected(),
    }
}

fn binary(args: &[Term]) -> ThinResult<(&Term, &Term)> {
    match args {
        [lhs, rhs] => Ok((lhs, rhs)),
        _ => ThinError::expected(),
    }
}

fn bool_term(value: bool) -> Term {
    Literal::from(value).into()
}

fn compatible_strings(args: &[Term]) -> ThinResult<(StringArg<'_>, StringArg<'_>)> {
    let (lhs, rhs) = binary(args)?;
    let lhs = StringArg::from_term(lhs)?;
    let rhs = StringArg::from_term(rhs)?;
    if lhs.is_compatible_with(rhs) {
        Ok((lhs, rhs))
    } else {
        ThinError::expected()
    }
}

fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    if tag.len() < range.len() || !tag[..range.len()].eq_ignore_ascii_case(range) {
        return false;
    }
    tag.len() == range.len() || tag.as_bytes()[range.len()] == b'-'
}

fn concat(args: &[Term]) -> ThinResult<Term> {
    let mut result = String::new();
    let mut language: Option<Option<&str>> = None;
    for arg in args {
        let arg = StringArg::from_term(arg)?;
        result.push_str(arg.value);
        language = match language {
            None => Some(arg.language),
            Some(previous) if previous == arg.language => Some(previous),
            Some(_) => Some(None),
        };
    }
    Ok(string_literal(result, language.flatten()))
}

fn substring(args: &[Term]) -> ThinResult<Term> {
    let (source, start, length) = match args {
        [source, start] => (source, start, None),
        [source, start, length] => (source, start, Some(length)),
        _ => return ThinError::expected(),
    };
    let source = StringArg::from_term(source)?;
    let start = Numeric::from_term(start)?.round()?.to_f64();
    let end = match length {
        Some(length) => start + Numeric::from_term(length)?.round()?.to_f64(),
        None => f64::INFINITY,
    };

    let result: String = source
        .value
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = f64::from(u32::try_from(index + 1).unwrap_or(u32::MAX));
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(source.derive(result))
}

fn replace(args: &[Term]) -> ThinResult<Term> {
    let (text, pattern, replacement, flags) = match args {
        [text, pattern, replacement] => (text, pattern, replacement, None),
        [text, pattern, replacement, flags] => (text, pattern, replacement, Some(flags)),
        _ => return ThinError::expected(),
    };
    let text = StringArg::from_term(text)?;
    let regex = compile_regex(
        StringArg::simple_from_term(pattern)?,
        flags.map(StringArg::simple_from_term).transpose()?,
    )?;
    let replacement = StringArg::simple_from_term(replacement)?;
    Ok(text.derive(regex.replace_all(text.value, replacement).into_owned()))
}

/// Compiles a regular expression with the XPath flags `i`, `s`, `m`, `x`, and `q`.
pub(crate) fn compile_regex(pattern: &str, flags: Option<&str>) -> ThinResult<Regex> {
    let mut quoted = false;
    let mut builder_flags = Vec::new();
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'q' => quoted = true,
            's' | 'm' | 'i' | 'x' => builder_flags.push(flag),
            _ => return ThinError::expected(),
        }
    }

    let pattern = if quoted {
        regex::escape(pattern)
    } else {
        pattern.to_owned()
    };
    let mut builder = RegexBuilder::new(&pattern);
    builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in builder_flags {
        match flag {
            's' => builder.dot_matches_new_line(true),
            'm' => builder.multi_line(true),
            'i' => builder.case_insensitive(true),
            _ => builder.ignore_whitespace(true),
        };
    }
    builder.build().map_err(|_| ThinError {})
}

/// The XSD constructor functions.
fn cast(datatype: NamedNodeRef<'_>, term: &Term) -> ThinResult<Term> {
    if datatype == xsd::STRING {
        return match term {
            Term::NamedNode(node) => Ok(Literal::new_simple_literal(node.as_str()).into()),
            Term::Literal(literal) => Ok(Literal::new_simple_literal(literal.value()).into()),
            Term::BlankNode(_) => ThinError::expected(),
        };
    }

    let Term::Literal(literal) = term else {
        return ThinError::expected();
    };
    let kind = LiteralKind::of(literal.as_ref());
    let numeric = Numeric::from_literal(literal.as_ref());
    let value = literal.value();

    if datatype == xsd::BOOLEAN {
        let result = match (kind, numeric) {
            (LiteralKind::Boolean | LiteralKind::String, _) => parse_boolean(value)?,
            (_, Some(numeric)) => !numeric.is_zero(),
            _ => return ThinError::expected(),
        };
        return Ok(bool_term(result));
    }

    if datatype == xsd::INTEGER {
        let result = match (kind, numeric) {
            (_, Some(Numeric::Integer(value))) => value,
            (_, Some(Numeric::Decimal(value))) => Integer::try_from(value)?,
            (_, Some(Numeric::Double(value))) => Integer::try_from(Decimal::try_from(value)?)?,
            (LiteralKind::Boolean, _) => Integer::from(i64::from(effective_boolean_value(term)?)),
            (LiteralKind::String, _) => Integer::from_str(value.trim())?,
            _ => return ThinError::expected(),
        };
        return Ok(Numeric::Integer(result).into_term());
    }

    if datatype == xsd::DECIMAL {
        let result = match (kind, numeric) {
            (_, Some(Numeric::Integer(value))) => Decimal::from(value),
            (_, Some(Numeric::Decimal(value))) => value,
            (_, Some(Numeric::Double(value))) => Decimal::try_from(value)?,
            (LiteralKind::Boolean, _) => Decimal::from(i64::from(effective_boolean_value(term)?)),
            (LiteralKind::String, _) => Decimal::from_str(value.trim())?,
            _ => return ThinError::expected(),
        };
        return Ok(Numeric::Decimal(result).into_term());
    }

    if datatype == xsd::DOUBLE || datatype == xsd::FLOAT {
        let result = match (kind, numeric) {
            (_, Some(numeric)) => numeric.to_double(),
            (LiteralKind::Boolean, _) => {
                Double::from(if effective_boolean_value(term)? { 1.0 } else { 0.0 })
            }
            (LiteralKind::String, _) => Double::from_str(value.trim())?,
            _ => return ThinError::expected(),
        };
        return Ok(Literal::new_typed_literal(result.to_string(), datatype).into());
    }

    ThinError::expected()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_algebra_storage::memory::MemoryTripleStore;
    use std::sync::Arc;

    fn call(function: Function, args: &[Term]) -> ThinResult<Term> {
        SimpleEvaluator::new(Arc::new(MemoryTripleStore::new().snapshot().unwrap()))
            .call_function(&function, args, &Solution::new())
    }

    fn lang(value: &str, language: &str) -> Term {
        Literal::new_language_tagged_literal_unchecked(value, language).into()
    }

    fn simple(value: &str) -> Term {
        Literal::new_simple_literal(value).into()
    }

    #[test]
    fn string_functions_keep_language() {
        assert_eq!(
            call(Function::UCase, &[lang("chat", "fr")]),
            Ok(lang("CHAT", "fr"))
        );
        assert_eq!(
            call(Function::StrBefore, &[lang("abc", "en"), simple("b")]),
            Ok(lang("a", "en"))
        );
        assert_eq!(
            call(Function::StrAfter, &[lang("abc", "en"), simple("z")]),
            Ok(simple(""))
        );
        assert!(call(Function::Contains, &[simple("abc"), lang("b", "en")]).is_err());
    }

    #[test]
    fn substring_uses_one_based_positions() {
        let one = Term::from(Literal::from(1));
        let two = Term::from(Literal::from(2));
        assert_eq!(
            call(Function::SubStr, &[simple("motor"), two.clone(), two]),
            Ok(simple("ot"))
        );
        assert_eq!(
            call(Function::SubStr, &[simple("motor"), one]),
            Ok(simple("motor"))
        );
    }

    #[test]
    fn regex_flags() {
        assert_eq!(
            call(Function::Regex, &[simple("Alice"), simple("^ali"), simple("i")]),
            Ok(bool_term(true))
        );
        assert_eq!(
            call(Function::Regex, &[simple("a.c"), simple("."), simple("q")]),
            Ok(bool_term(true))
        );
        assert_eq!(
            call(Function::Regex, &[simple("abc"), simple("."), simple("q")]),
            Ok(bool_term(false))
        );
        assert!(call(Function::Regex, &[simple("abc"), simple("("), simple("")]).is_err());
    }

    #[test]
    fn lang_matches_ranges() {
        assert!(lang_matches("en-US", "en"));
        assert!(lang_matches("EN", "en"));
        assert!(!lang_matches("english", "en"));
        assert!(lang_matches("fr", "*"));
        assert!(!lang_matches("", "*"));
    }

    #[test]
    fn labelled_blank_nodes_are_stable() {
        let evaluator = SimpleEvaluator::new(Arc::new(MemoryTripleStore::new().snapshot().unwrap()));
        let solution = Solution::new();
        let first = evaluator.call_function(&Function::BNode, &[simple("x")], &solution);
        let second = evaluator.call_function(&Function::BNode, &[simple("x")], &solution);
        let other = evaluator.call_function(&Function::BNode, &[simple("y")], &solution);
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn casts() {
        let integer = Function::Custom(xsd::INTEGER.into_owned());
        assert_eq!(
            call(integer.clone(), &[simple(" 42 ")]),
            Ok(Literal::from(42).into())
        );
        assert_eq!(
            call(
                integer.clone(),
                &[Literal::new_typed_literal("3.7", xsd::DECIMAL).into()]
            ),
            Ok(Literal::from(3).into())
        );
        assert!(call(integer, &[simple("abc")]).is_err());
        assert_eq!(
            call(Function::Custom(xsd::BOOLEAN.into_owned()), &[Literal::from(0).into()]),
            Ok(bool_term(false))
        );
        assert!(call(
            Function::Custom(NamedNode::new_unchecked("http://example.com/unknown")),
            &[simple("a")]
        )
        .is_err());
    }
}
