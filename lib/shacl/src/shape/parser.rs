use super::{Constraint, NodeKind, Severity, Shape, ShapeId, Shapes, Target};
use crate::error::ShaclError;
use crate::graph::GraphReader;
use crate::sparql::{boolean_value, literals, string_value, ComponentDefinition, SparqlConstraint};
use rdf_algebra_common::TripleStore;
use rdf_algebra_logical::PropertyPath;
use rdf_algebra_model::vocab::{rdf, rdfs, sh};
use rdf_algebra_model::{subject_to_term, NamedNode, NamedNodeRef, Term};
use regex::RegexBuilder;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Paths nested deeper than this are rejected. Catches cyclic path structures.
const MAX_PATH_DEPTH: usize = 32;

impl Shapes {
    /// Reads all shapes of the default graph of `store`.
    ///
    /// Shapes are nodes that are typed as `sh:NodeShape` or `sh:PropertyShape`, nodes with a
    /// target, and every node that is referenced as a shape by another shape.
    pub fn parse(store: &dyn TripleStore) -> Result<Self, ShaclError> {
        let reader = GraphReader::new(store);
        let mut parser = ShapesParser {
            reader,
            components: ComponentDefinition::parse_all(reader)?,
            ids: FxHashMap::default(),
            entries: Vec::new(),
        };

        for class in [sh::NODE_SHAPE, sh::PROPERTY_SHAPE] {
            for node in reader.subjects(rdf::TYPE, &class.into_owned().into())? {
                parser.shape_id(&node);
            }
        }
        for predicate in [
            sh::TARGET_NODE,
            sh::TARGET_CLASS,
            sh::TARGET_SUBJECTS_OF,
            sh::TARGET_OBJECTS_OF,
        ] {
            for triple in reader.triples(None, Some(predicate), None)? {
                parser.shape_id(&subject_to_term(triple.subject));
            }
        }

        // Parsing a shape may discover further shapes, which are appended to the entries.
        let mut next = 0;
        while let Some(shape) = parser.entries.get(next) {
            let node = shape.node.clone();
            let shape = parser.parse_shape(&node)?;
            parser.entries[next] = shape;
            next += 1;
        }

        let mut entries = parser.entries;
        assign_siblings(&mut entries);
        debug!(
            shapes = entries.len(),
            components = parser.components.len(),
            "Parsed shapes graph"
        );
        Ok(Self { entries })
    }
}

struct ShapesParser<'g> {
    reader: GraphReader<'g>,
    components: Vec<ComponentDefinition>,
    ids: FxHashMap<Term, ShapeId>,
    entries: Vec<Shape>,
}

impl ShapesParser<'_> {
    /// Returns the id of the shape defined by `node`. Unknown shapes are registered and parsed
    /// later.
    fn shape_id(&mut self, node: &Term) -> ShapeId {
        if let Some(id) = self.ids.get(node) {
            return *id;
        }
        let id = ShapeId::new(self.entries.len());
        self.entries.push(Shape::new(node.clone()));
        self.ids.insert(node.clone(), id);
        id
    }

    /// Like [Self::shape_id] for a value of `shape`. Literals cannot be shapes.
    fn shape_reference(&mut self, shape: &Term, value: &Term) -> Result<ShapeId, ShaclError> {
        if let Term::Literal(_) = value {
            return Err(ShaclError::invalid_shape(
                shape,
                format!("{value} cannot be used as a shape"),
            ));
        }
        Ok(self.shape_id(value))
    }

    fn parse_shape(&mut self, node: &Term) -> Result<Shape, ShaclError> {
        let reader = self.reader;
        let mut shape = Shape::new(node.clone());
        shape.path = reader
            .object(node, sh::PATH)?
            .map(|path| self.parse_path(&path, 0))
            .transpose()?;
        shape.targets = self.targets(node)?;
        if let Some(severity) = reader.object(node, sh::SEVERITY)? {
            let Term::NamedNode(severity) = severity else {
                return Err(ShaclError::invalid_shape(node, "sh:severity must be an IRI"));
            };
            shape.severity = Severity::from_node(severity);
        }
        shape.messages = literals(reader, node, sh::MESSAGE)?;
        shape.deactivated = boolean_value(reader, node, sh::DEACTIVATED)?.unwrap_or(false);
        shape.constraints = self.constraints(node, shape.path.as_ref())?;
        Ok(shape)
    }

    fn targets(&self, node: &Term) -> Result<Vec<Target>, ShaclError> {
        let reader = self.reader;
        let mut targets = Vec::new();
        targets.extend(
            reader
                .objects(node, sh::TARGET_NODE)?
                .into_iter()
                .map(Target::Node),
        );
        targets.extend(
            reader
                .objects(node, sh::TARGET_CLASS)?
                .into_iter()
                .map(Target::Class),
        );
        for predicate in reader.objects(node, sh::TARGET_SUBJECTS_OF)? {
            targets.push(Target::SubjectsOf(named_node(node, predicate)?));
        }
        for predicate in reader.objects(node, sh::TARGET_OBJECTS_OF)? {
            targets.push(Target::ObjectsOf(named_node(node, predicate)?));
        }
        if reader.contains(node, rdf::TYPE, &rdfs::CLASS.into_owned().into())? {
            targets.push(Target::Class(node.clone()));
        }
        Ok(targets)
    }

    fn parse_path(&self, node: &Term, depth: usize) -> Result<PropertyPath, ShaclError> {
        if depth > MAX_PATH_DEPTH {
            return Err(ShaclError::InvalidPath(node.clone()));
        }
        let reader = self.reader;
        if reader.object(node, rdf::FIRST)?.is_some() {
            return reader
                .list(node)?
                .iter()
                .map(|member| self.parse_path(member, depth + 1))
                .reduce(|lhs, rhs| Ok(PropertyPath::sequence(lhs?, rhs?)))
                .unwrap_or_else(|| Err(ShaclError::InvalidPath(node.clone())));
        }
        match node {
            Term::NamedNode(predicate) if predicate.as_ref() != rdf::NIL => {
                return Ok(PropertyPath::Predicate(predicate.clone()));
            }
            Term::BlankNode(_) => {}
            _ => return Err(ShaclError::InvalidPath(node.clone())),
        }

        if let Some(inner) = reader.object(node, sh::INVERSE_PATH)? {
            return Ok(PropertyPath::inverse(self.parse_path(&inner, depth + 1)?));
        }
        if let Some(list) = reader.object(node, sh::ALTERNATIVE_PATH)? {
            return reader
                .list(&list)?
                .iter()
                .map(|member| self.parse_path(member, depth + 1))
                .reduce(|lhs, rhs| Ok(PropertyPath::alternative(lhs?, rhs?)))
                .unwrap_or_else(|| Err(ShaclError::InvalidPath(node.clone())));
        }
        let unary: [(NamedNodeRef<'_>, fn(PropertyPath) -> PropertyPath); 3] = [
            (sh::ZERO_OR_MORE_PATH, PropertyPath::zero_or_more),
            (sh::ONE_OR_MORE_PATH, PropertyPath::one_or_more),
            (sh::ZERO_OR_ONE_PATH, PropertyPath::zero_or_one),
        ];
        for (predicate, constructor) in unary {
            if let Some(inner) = reader.object(node, predicate)? {
                return Ok(constructor(self.parse_path(&inner, depth + 1)?));
            }
        }
        Err(ShaclError::InvalidPath(node.clone()))
    }

    fn constraints(
        &mut self,
        node: &Term,
        path: Option<&PropertyPath>,
    ) -> Result<Vec<Constraint>, ShaclError> {
        let reader = self.reader;
        let mut constraints = Vec::new();

        for class in reader.objects(node, sh::CLASS)? {
            constraints.push(Constraint::Class(class));
        }
        for datatype in reader.objects(node, sh::DATATYPE)? {
            constraints.push(Constraint::Datatype(named_node(node, datatype)?));
        }
        for kind in reader.objects(node, sh::NODE_KIND)? {
            let Some(kind) = NodeKind::from_node(&kind) else {
                return Err(ShaclError::invalid_shape(
                    node,
                    format!("{kind} is not a node kind"),
                ));
            };
            constraints.push(Constraint::NodeKind(kind));
        }

        let counts: [(NamedNodeRef<'_>, fn(u64) -> Constraint); 4] = [
            (sh::MIN_COUNT, Constraint::MinCount),
            (sh::MAX_COUNT, Constraint::MaxCount),
            (sh::MIN_LENGTH, Constraint::MinLength),
            (sh::MAX_LENGTH, Constraint::MaxLength),
        ];
        for (predicate, constructor) in counts {
            for value in reader.objects(node, predicate)? {
                constraints.push(constructor(integer(node, predicate, &value)?));
            }
        }

        let ranges: [(NamedNodeRef<'_>, fn(Term) -> Constraint); 5] = [
            (sh::MIN_EXCLUSIVE, Constraint::MinExclusive),
            (sh::MIN_INCLUSIVE, Constraint::MinInclusive),
            (sh::MAX_EXCLUSIVE, Constraint::MaxExclusive),
            (sh::MAX_INCLUSIVE, Constraint::MaxInclusive),
            (sh::HAS_VALUE, Constraint::HasValue),
        ];
        for (predicate, constructor) in ranges {
            constraints.extend(reader.objects(node, predicate)?.into_iter().map(constructor));
        }

        for pattern in reader.objects(node, sh::PATTERN)? {
            let Term::Literal(pattern) = pattern else {
                return Err(ShaclError::invalid_shape(node, "sh:pattern must be a literal"));
            };
            let flags = string_value(reader, node, sh::FLAGS)?;
            constraints.push(pattern_constraint(
                node,
                pattern.value().to_owned(),
                flags,
            )?);
        }

        if let Some(list) = reader.object(node, sh::LANGUAGE_IN)? {
            let languages = reader
                .list(&list)?
                .into_iter()
                .map(|language| match language {
                    Term::Literal(literal) => Ok(literal.value().to_owned()),
                    _ => Err(ShaclError::invalid_shape(
                        node,
                        "sh:languageIn must only contain literals",
                    )),
                })
                .collect::<Result<_, _>>()?;
            constraints.push(Constraint::LanguageIn(languages));
        }
        if boolean_value(reader, node, sh::UNIQUE_LANG)? == Some(true) {
            constraints.push(Constraint::UniqueLang);
        }

        let pairs: [(NamedNodeRef<'_>, fn(NamedNode) -> Constraint); 4] = [
            (sh::EQUALS, Constraint::Equals),
            (sh::DISJOINT, Constraint::Disjoint),
            (sh::LESS_THAN, Constraint::LessThan),
            (sh::LESS_THAN_OR_EQUALS, Constraint::LessThanOrEquals),
        ];
        for (predicate, constructor) in pairs {
            for other in reader.objects(node, predicate)? {
                constraints.push(constructor(named_node(node, other)?));
            }
        }

        for value in reader.objects(node, sh::NOT)? {
            constraints.push(Constraint::Not(self.shape_reference(node, &value)?));
        }
        let lists: [(NamedNodeRef<'_>, fn(Vec<ShapeId>) -> Constraint); 3] = [
            (sh::AND, Constraint::And),
            (sh::OR, Constraint::Or),
            (sh::XONE, Constraint::Xone),
        ];
        for (predicate, constructor) in lists {
            for list in reader.objects(node, predicate)? {
                let members = reader
                    .list(&list)?
                    .iter()
                    .map(|member| self.shape_reference(node, member))
                    .collect::<Result<_, _>>()?;
                constraints.push(constructor(members));
            }
        }
        for value in reader.objects(node, sh::NODE)? {
            constraints.push(Constraint::Node(self.shape_reference(node, &value)?));
        }
        for value in reader.objects(node, sh::PROPERTY)? {
            constraints.push(Constraint::Property(self.shape_reference(node, &value)?));
        }

        if let Some(value) = reader.object(node, sh::QUALIFIED_VALUE_SHAPE)? {
            let shape = self.shape_reference(node, &value)?;
            let siblings = (boolean_value(reader, node, sh::QUALIFIED_VALUE_SHAPES_DISJOINT)?
                == Some(true))
            .then(Vec::new);
            if let Some(min) = reader.object(node, sh::QUALIFIED_MIN_COUNT)? {
                constraints.push(Constraint::QualifiedValueShape {
                    shape,
                    min_count: Some(integer(node, sh::QUALIFIED_MIN_COUNT, &min)?),
                    max_count: None,
                    siblings: siblings.clone(),
                });
            }
            if let Some(max) = reader.object(node, sh::QUALIFIED_MAX_COUNT)? {
                constraints.push(Constraint::QualifiedValueShape {
                    shape,
                    min_count: None,
                    max_count: Some(integer(node, sh::QUALIFIED_MAX_COUNT, &max)?),
                    siblings,
                });
            }
        }

        if boolean_value(reader, node, sh::CLOSED)? == Some(true) {
            let ignored_properties = match reader.object(node, sh::IGNORED_PROPERTIES)? {
                Some(list) => reader
                    .list(&list)?
                    .into_iter()
                    .map(|property| named_node(node, property))
                    .collect::<Result<_, _>>()?,
                None => Vec::new(),
            };
            constraints.push(Constraint::Closed { ignored_properties });
        }

        if let Some(list) = reader.object(node, sh::IN)? {
            constraints.push(Constraint::In(reader.list(&list)?));
        }

        for sparql in reader.objects(node, sh::SPARQL)? {
            if let Some(constraint) = SparqlConstraint::parse(reader, &sparql, path)? {
                constraints.push(Constraint::Sparql(constraint));
            }
        }
        for definition in &self.components {
            if let Some(constraint) = definition.instantiate(reader, node, path)? {
                constraints.push(Constraint::Component(constraint));
            }
        }

        Ok(constraints)
    }
}

fn named_node(shape: &Term, value: Term) -> Result<NamedNode, ShaclError> {
    match value {
        Term::NamedNode(node) => Ok(node),
        value => Err(ShaclError::invalid_shape(
            shape,
            format!("{value} must be an IRI"),
        )),
    }
}

fn integer(shape: &Term, predicate: NamedNodeRef<'_>, value: &Term) -> Result<u64, ShaclError> {
    match value {
        Term::Literal(literal) => literal.value().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        ShaclError::invalid_shape(
            shape,
            format!("{predicate} expects a non-negative integer, found {value}"),
        )
    })
}

/// Compiles `sh:pattern` with the XPath flags `i`, `m`, `s`, `x`, and `q`.
fn pattern_constraint(
    shape: &Term,
    pattern: String,
    flags: Option<String>,
) -> Result<Constraint, ShaclError> {
    let has_flag = |flag: char| flags.as_deref().is_some_and(|flags| flags.contains(flag));
    let source = if has_flag('q') {
        regex::escape(&pattern)
    } else {
        pattern.clone()
    };
    let regex = RegexBuilder::new(&source)
        .case_insensitive(has_flag('i'))
        .multi_line(has_flag('m'))
        .dot_matches_new_line(has_flag('s'))
        .ignore_whitespace(has_flag('x'))
        .build()
        .map_err(|error| {
            ShaclError::invalid_shape(shape, format!("invalid pattern {pattern:?}: {error}"))
        })?;
    Ok(Constraint::Pattern {
        regex,
        pattern,
        flags,
    })
}

/// Fills in the sibling shapes of qualified value shapes with `sh:qualifiedValueShapesDisjoint`.
///
/// The siblings are the qualified value shapes of the other property shapes of the same parent
/// shapes.
fn assign_siblings(entries: &mut [Shape]) {
    let mut updates = Vec::new();
    for parent in entries.iter() {
        let children = parent
            .constraints
            .iter()
            .filter_map(|constraint| match constraint {
                Constraint::Property(child) => Some(*child),
                _ => None,
            })
            .collect::<Vec<_>>();
        for child in &children {
            let siblings = children
                .iter()
                .filter(|other| *other != child)
                .filter_map(|other| entries.get(other.index()))
                .flat_map(qualified_shapes)
                .collect::<Vec<_>>();
            updates.push((*child, siblings));
        }
    }

    for (child, siblings) in updates {
        let Some(entry) = entries.get_mut(child.index()) else {
            continue;
        };
        for constraint in &mut entry.constraints {
            if let Constraint::QualifiedValueShape {
                shape,
                siblings: Some(existing),
                ..
            } = constraint
            {
                let own = *shape;
                existing.extend(siblings.iter().copied().filter(|sibling| *sibling != own));
                existing.sort_unstable();
                existing.dedup();
            }
        }
    }
}

fn qualified_shapes(shape: &Shape) -> impl Iterator<Item = ShapeId> + '_ {
    shape
        .constraints
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::QualifiedValueShape { shape, .. } => Some(*shape),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdfio::{RdfFormat, RdfParser};
    use rdf_algebra_storage::memory::MemoryTripleStore;

    const PREFIXES: &str = "
        @prefix ex: <http://example.com/> .
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
    ";

    fn parse(turtle: &str) -> Result<Shapes, ShaclError> {
        let store = MemoryTripleStore::new();
        let quads = RdfParser::from_format(RdfFormat::Turtle)
            .for_reader(format!("{PREFIXES}{turtle}").as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        store.extend(quads).unwrap();
        Shapes::parse(&store.snapshot().unwrap())
    }

    fn ex(name: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.com/{name}")).into()
    }

    #[test]
    fn property_shapes_are_discovered_through_references() {
        let shapes = parse(
            "ex:Person a sh:NodeShape ;
                sh:targetClass ex:Human ;
                sh:property [ sh:path ex:name ; sh:minCount 1 ; sh:datatype xsd:string ] .",
        )
        .unwrap();

        assert_eq!(shapes.len(), 2);
        let person = shapes.shape(shapes.find(&ex("Person")).unwrap());
        assert_eq!(person.targets(), &[Target::Class(ex("Human"))]);
        let [Constraint::Property(property)] = person.constraints() else {
            unreachable!("expected a single property constraint");
        };
        let property = shapes.shape(*property);
        assert_eq!(
            property.path(),
            Some(&PropertyPath::Predicate(NamedNode::new_unchecked(
                "http://example.com/name"
            )))
        );
        assert_eq!(property.constraints().len(), 2);
    }

    #[test]
    fn complex_paths_are_parsed() {
        let shapes = parse(
            "ex:S sh:targetNode ex:a ;
                sh:property [ sh:path ( ex:knows [ sh:inversePath ex:parent ] [ sh:zeroOrMorePath ex:child ] ) ] .",
        )
        .unwrap();

        let path = shapes
            .iter()
            .find_map(|(_, shape)| shape.path())
            .unwrap()
            .to_string();
        insta::assert_snapshot!(path, @"((<http://example.com/knows> / ^(<http://example.com/parent>)) / (<http://example.com/child>)*)");
    }

    #[test]
    fn classes_that_are_shapes_are_implicit_targets() {
        let shapes = parse("ex:Person a rdfs:Class, sh:NodeShape ; sh:closed true .").unwrap();

        let person = shapes.shape(shapes.find(&ex("Person")).unwrap());
        assert_eq!(person.targets(), &[Target::Class(ex("Person"))]);
    }

    #[test]
    fn pattern_flags_are_applied() {
        let shapes = parse(r#"ex:S sh:targetNode ex:a ; sh:pattern "^abc$" ; sh:flags "i" ."#)
            .unwrap();

        let shape = shapes.shape(shapes.find(&ex("S")).unwrap());
        let [Constraint::Pattern { regex, .. }] = shape.constraints() else {
            unreachable!("expected a pattern constraint");
        };
        assert!(regex.is_match("ABC"));
    }

    #[test]
    fn disjoint_qualified_shapes_know_their_siblings() {
        let shapes = parse(
            "ex:Hand a sh:NodeShape ;
                sh:property ex:Thumb, ex:Finger .
            ex:Thumb sh:path ex:digit ;
                sh:qualifiedValueShape ex:ThumbShape ;
                sh:qualifiedValueShapesDisjoint true ;
                sh:qualifiedMinCount 1 .
            ex:Finger sh:path ex:digit ;
                sh:qualifiedValueShape ex:FingerShape ;
                sh:qualifiedValueShapesDisjoint true ;
                sh:qualifiedMaxCount 4 .",
        )
        .unwrap();

        let thumb = shapes.shape(shapes.find(&ex("Thumb")).unwrap());
        let finger_shape = shapes.find(&ex("FingerShape")).unwrap();
        let [Constraint::QualifiedValueShape { siblings, .. }] = thumb.constraints() else {
            unreachable!("expected a qualified value shape");
        };
        assert_eq!(siblings.as_deref(), Some([finger_shape].as_slice()));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let result = parse("ex:S sh:targetNode ex:a ; sh:path ex:p ; sh:minCount -1 .");
        assert!(matches!(result, Err(ShaclError::InvalidShape { .. })));
    }

    #[test]
    fn literal_paths_are_rejected() {
        let result = parse(r#"ex:S sh:targetNode ex:a ; sh:path "p" ."#);
        assert!(matches!(result, Err(ShaclError::InvalidPath(_))));
    }
}
