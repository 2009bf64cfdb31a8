//! Family forest construction.
//!
//! # Responsibility
//! - Convert the flat person list into a forest of render nodes.
//! - Keep sibling order deterministic: birth rank ascending, missing rank
//!   first, creation order on ties.
//!
//! # Invariants
//! - The produced forest is a transient read model, never a write path.
//! - Every input person appears exactly once: under its parent when the
//!   parent id resolves, as a root otherwise.

use crate::model::person::Person;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One person plus its owned subtree, produced by [`build_forest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTreeNode {
    /// The person this node wraps.
    #[serde(flatten)]
    pub person: Person,
    /// Child nodes ordered by ascending birth rank.
    pub children_nodes: Vec<FamilyTreeNode>,
}

impl FamilyTreeNode {
    /// Returns the total number of nodes in this subtree, self included.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children_nodes
            .iter()
            .map(FamilyTreeNode::subtree_size)
            .sum::<usize>()
    }
}

/// Builds the family forest from the complete person list.
///
/// Persons without a `parent_id` become roots, in input order. A
/// `parent_id` that references no person in the list also yields a root
/// rather than dropping the record from the rendered forest. Each parent's
/// children are sorted by birth rank, with a missing rank treated as 0;
/// the sort is stable so equal ranks keep input order.
pub fn build_forest(persons: &[Person]) -> Vec<FamilyTreeNode> {
    let known_ids: HashSet<&str> = persons.iter().map(|person| person.id.as_str()).collect();

    let mut roots: Vec<usize> = Vec::new();
    let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, person) in persons.iter().enumerate() {
        match person.parent_id.as_deref() {
            Some(parent_id) if known_ids.contains(parent_id) => {
                children_of.entry(parent_id).or_default().push(index);
            }
            _ => roots.push(index),
        }
    }

    for indices in children_of.values_mut() {
        indices.sort_by_key(|&index| persons[index].birth_rank.unwrap_or(0));
    }

    roots
        .into_iter()
        .map(|index| build_node(persons, &children_of, index))
        .collect()
}

fn build_node(
    persons: &[Person],
    children_of: &HashMap<&str, Vec<usize>>,
    index: usize,
) -> FamilyTreeNode {
    let person = persons[index].clone();
    let children_nodes = children_of
        .get(person.id.as_str())
        .map(|indices| {
            indices
                .iter()
                .map(|&child_index| build_node(persons, children_of, child_index))
                .collect()
        })
        .unwrap_or_default();
    FamilyTreeNode {
        person,
        children_nodes,
    }
}
