//! Structural derivation of the variable sets of an algebra node.
//!
//! Each node knows which variables are guaranteed to be bound in every solution it produces
//! (fixed) and which may be bound in some solutions only (floating). The derivation never touches
//! the store.

use crate::Algebra;
use rdf_algebra_model::{NamedNodePattern, TermPattern, Variable};
use std::collections::BTreeSet;

/// The fixed and floating variables of an algebra node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSets {
    pub fixed: BTreeSet<Variable>,
    pub floating: BTreeSet<Variable>,
}

impl VariableSets {
    fn new(fixed: BTreeSet<Variable>, floating: BTreeSet<Variable>) -> Self {
        let floating = floating.difference(&fixed).cloned().collect();
        Self { fixed, floating }
    }

    /// All variables that the solutions of the node may mention.
    pub fn projected(&self) -> BTreeSet<Variable> {
        self.fixed.union(&self.floating).cloned().collect()
    }
}

impl Algebra {
    /// Computes the fixed and floating variables of this node.
    pub fn variable_sets(&self) -> VariableSets {
        match self {
            Self::Bgp { patterns } => {
                let mut fixed = BTreeSet::new();
                for pattern in patterns {
                    add_term_pattern(&pattern.subject, &mut fixed);
                    if let NamedNodePattern::Variable(v) = &pattern.predicate {
                        fixed.insert(v.clone());
                    }
                    add_term_pattern(&pattern.object, &mut fixed);
                }
                VariableSets::new(fixed, BTreeSet::new())
            }
            Self::Path {
                subject, object, ..
            } => {
                let mut fixed = BTreeSet::new();
                add_term_pattern(subject, &mut fixed);
                add_term_pattern(object, &mut fixed);
                VariableSets::new(fixed, BTreeSet::new())
            }
            Self::Join { left, right } => {
                let left = left.variable_sets();
                let right = right.variable_sets();
                VariableSets::new(
                    left.fixed.union(&right.fixed).cloned().collect(),
                    left.floating.union(&right.floating).cloned().collect(),
                )
            }
            Self::LeftJoin { left, right, .. } => {
                let left = left.variable_sets();
                let right = right.variable_sets().projected();
                VariableSets::new(
                    left.fixed,
                    left.floating.union(&right).cloned().collect(),
                )
            }
            Self::Union { left, right } => {
                let left = left.variable_sets();
                let right = right.variable_sets();
                let fixed = left.fixed.intersection(&right.fixed).cloned().collect();
                let projected = left.projected().union(&right.projected()).cloned().collect();
                VariableSets::new(fixed, projected)
            }
            Self::Minus { left, .. }
            | Self::Filter { inner: left, .. }
            | Self::Distinct { inner: left }
            | Self::Reduced { inner: left }
            | Self::OrderBy { inner: left, .. }
            | Self::Slice { inner: left, .. }
            | Self::TopN { inner: left, .. } => left.variable_sets(),
            Self::Extend { inner, assignments } => {
                let inner = inner.variable_sets();
                let mut floating = inner.floating;
                floating.extend(assignments.iter().map(|(v, _)| v.clone()));
                VariableSets::new(inner.fixed, floating)
            }
            Self::Project { inner, variables } => {
                let inner = inner.variable_sets();
                let fixed = variables
                    .iter()
                    .filter(|v| inner.fixed.contains(*v))
                    .cloned()
                    .collect();
                VariableSets::new(fixed, variables.iter().cloned().collect())
            }
            Self::Group {
                inner,
                variables,
                aggregates,
            } => {
                let inner = inner.variable_sets();
                let mut fixed: BTreeSet<_> = variables
                    .iter()
                    .filter(|v| inner.fixed.contains(*v))
                    .cloned()
                    .collect();
                let mut floating: BTreeSet<_> = variables.iter().cloned().collect();
                for (variable, aggregate) in aggregates {
                    if aggregate.is_total() {
                        fixed.insert(variable.clone());
                    } else {
                        floating.insert(variable.clone());
                    }
                }
                VariableSets::new(fixed, floating)
            }
            Self::NamedGraph { graph, inner } => {
                let mut sets = inner.variable_sets();
                if let NamedNodePattern::Variable(v) = graph {
                    sets.floating.remove(v);
                    sets.fixed.insert(v.clone());
                }
                sets
            }
            Self::Table { variables, rows } => {
                let fixed = variables
                    .iter()
                    .filter(|v| rows.iter().all(|row| row.contains(v)))
                    .cloned()
                    .collect();
                VariableSets::new(fixed, variables.iter().cloned().collect())
            }
            Self::Service { inner, silent, .. } => {
                let sets = inner.variable_sets();
                if *silent {
                    // A failing silent service yields the unit solution.
                    VariableSets::new(BTreeSet::new(), sets.projected())
                } else {
                    sets
                }
            }
        }
    }

    /// Variables that are guaranteed to be bound in every solution of this node.
    pub fn fixed_variables(&self) -> BTreeSet<Variable> {
        self.variable_sets().fixed
    }

    /// Variables that may be bound in some solutions of this node.
    pub fn floating_variables(&self) -> BTreeSet<Variable> {
        self.variable_sets().floating
    }

    /// All variables that the solutions of this node may mention.
    pub fn projected_variables(&self) -> BTreeSet<Variable> {
        self.variable_sets().projected()
    }

    /// Returns every variable that occurs anywhere in the node, including those in expressions
    /// and those that are hidden by a projection.
    pub fn all_variables(&self) -> BTreeSet<Variable> {
        let mut result = self.projected_variables();
        let mut expression_variables = Vec::new();
        match self {
            Self::LeftJoin {
                expression: Some(expression),
                ..
            } => expression.collect_variables(&mut expression_variables),
            Self::Filter { expressions, .. } => {
                for expression in expressions {
                    expression.collect_variables(&mut expression_variables);
                }
            }
            Self::Extend { assignments, .. } => {
                for (_, expression) in assignments {
                    expression.collect_variables(&mut expression_variables);
                }
            }
            Self::OrderBy { conditions, .. } | Self::TopN { conditions, .. } => {
                for condition in conditions {
                    condition
                        .expression()
                        .collect_variables(&mut expression_variables);
                }
            }
            _ => {}
        }
        result.extend(expression_variables.into_iter().cloned());
        for child in self.children() {
            result.extend(child.all_variables());
        }
        result
    }
}

fn add_term_pattern(pattern: &TermPattern, out: &mut BTreeSet<Variable>) {
    if let TermPattern::Variable(v) = pattern {
        out.insert(v.clone());
    }
}

