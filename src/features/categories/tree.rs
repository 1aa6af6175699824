//! In-memory category forest
//!
//! Built from every loaded category on each request and never persisted.
//! Nodes live in an arena; `parent` is the back-reference used for the
//! upward walk when validating a parent change.

use std::collections::HashMap;

use crate::features::categories::models::Category;

#[derive(Debug, Clone)]
pub struct CategoryNode {
    pub category: Category,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Outcome of checking a proposed parent for a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentCheck {
    /// No parent proposed; the category becomes a root
    Detached,
    Accepted(String),
    /// The proposed parent is the category itself or one of its descendants
    Cycle,
    UnknownParent,
    DisabledParent,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: Vec<CategoryNode>,
    index: HashMap<String, usize>,
    roots: Vec<usize>,
}

impl CategoryTree {
    pub fn build(mut categories: Vec<Category>) -> Self {
        // Sibling order: explicit order first, then by name
        categories.sort_by(|a, b| {
            (a.order.is_none(), a.order, &a.name).cmp(&(b.order.is_none(), b.order, &b.name))
        });

        let index: HashMap<String, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();

        let mut nodes: Vec<CategoryNode> = categories
            .into_iter()
            .enumerate()
            .map(|(i, category)| {
                // Orphans (parent not loaded) and self-parents become roots
                let parent = category
                    .parent_id
                    .as_deref()
                    .and_then(|p| index.get(p).copied())
                    .filter(|&p| p != i);
                CategoryNode {
                    category,
                    parent,
                    children: Vec::new(),
                }
            })
            .collect();

        break_stored_cycles(&mut nodes);

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let parent = nodes[i].parent;
            match parent {
                Some(p) => nodes[p].children.push(i),
                None => roots.push(i),
            }
        }

        Self {
            nodes,
            index,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.index.get(id).map(|&i| &self.nodes[i].category)
    }

    pub fn parent_of(&self, id: &str) -> Option<&Category> {
        let node = &self.nodes[*self.index.get(id)?];
        node.parent.map(|p| &self.nodes[p].category)
    }

    pub fn roots(&self) -> impl Iterator<Item = &CategoryNode> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    pub fn children<'a>(
        &'a self,
        node: &'a CategoryNode,
    ) -> impl Iterator<Item = &'a CategoryNode> + 'a {
        node.children.iter().map(|&i| &self.nodes[i])
    }

    /// Pre-order depth-first traversal of the whole forest
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let i = stack.pop()?;
            stack.extend(self.nodes[i].children.iter().rev().copied());
            Some(&self.nodes[i].category)
        })
    }

    /// First category in depth-first order matching the predicate
    pub fn find<F>(&self, predicate: F) -> Option<&Category>
    where
        F: Fn(&Category) -> bool,
    {
        self.iter().find(|c| predicate(*c))
    }

    /// Ids from `id` up to its root, starting with `id` itself
    pub fn ancestor_chain(&self, id: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.index.get(id).copied();
        // Bounded by the node count even though build() guarantees a forest
        while let Some(i) = current {
            if chain.len() > self.nodes.len() {
                break;
            }
            chain.push(self.nodes[i].category.id.as_str());
            current = self.nodes[i].parent;
        }
        chain
    }

    /// Whether making `proposed_parent` the parent of `category_id` closes a loop
    pub fn would_create_cycle(&self, category_id: &str, proposed_parent: &str) -> bool {
        self.ancestor_chain(proposed_parent)
            .into_iter()
            .any(|id| id == category_id)
    }

    /// Validate a parent selection for an existing (`Some`) or new (`None`) category
    pub fn check_parent(
        &self,
        category_id: Option<&str>,
        proposed_parent: Option<&str>,
    ) -> ParentCheck {
        let Some(parent_id) = proposed_parent.map(str::trim).filter(|p| !p.is_empty()) else {
            return ParentCheck::Detached;
        };

        let Some(parent) = self.get(parent_id) else {
            return ParentCheck::UnknownParent;
        };

        if let Some(category_id) = category_id {
            if self.would_create_cycle(category_id, parent_id) {
                return ParentCheck::Cycle;
            }
        }

        if !parent.is_active() {
            return ParentCheck::DisabledParent;
        }

        ParentCheck::Accepted(parent_id.to_string())
    }
}

/// Detach one member of every parent loop found in stored data
fn break_stored_cycles(nodes: &mut [CategoryNode]) {
    for start in 0..nodes.len() {
        loop {
            let mut seen = vec![false; nodes.len()];
            let mut current = Some(start);
            let mut repeated = None;
            while let Some(i) = current {
                if seen[i] {
                    repeated = Some(i);
                    break;
                }
                seen[i] = true;
                current = nodes[i].parent;
            }

            match repeated {
                Some(i) => {
                    tracing::warn!(
                        "Category '{}' is part of a parent loop in stored data; treating it as a root",
                        nodes[i].category.id
                    );
                    nodes[i].parent = None;
                }
                None => break,
            }
        }
    }
}
