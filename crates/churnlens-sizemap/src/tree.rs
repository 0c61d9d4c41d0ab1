use std::collections::HashMap;

use churnlens_core::normalize_path;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub path: String,
    pub weight: f64,
}

impl SizeEntry {
    pub fn new(path: impl Into<String>, weight: f64) -> Self {
        Self {
            path: path.into(),
            weight,
        }
    }
}

/// Node of the path hierarchy. `weight` is the node's own weight, which is
/// only ever non-zero on leaves; see [`TreeNode::total_weight`] for the
/// effective weight of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub weight: f64,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.weight
            + self
                .children
                .iter()
                .map(TreeNode::total_weight)
                .sum::<f64>()
    }

    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            return 1;
        }
        self.children.iter().map(TreeNode::leaf_count).sum()
    }

    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut node = self;
        for segment in path_segments(path) {
            node = node.children.iter().find(|child| child.name == segment)?;
        }
        Some(node)
    }
}

#[derive(Default)]
struct NodeBuilder {
    name: String,
    path: String,
    weight: f64,
    children: Vec<NodeBuilder>,
    child_index: HashMap<String, usize>,
}

impl NodeBuilder {
    fn child(&mut self, segment: &str) -> &mut NodeBuilder {
        let index = match self.child_index.get(segment) {
            Some(index) => *index,
            None => {
                let path = if self.path.is_empty() {
                    segment.to_owned()
                } else {
                    format!("{}/{segment}", self.path)
                };
                self.children.push(NodeBuilder {
                    name: segment.to_owned(),
                    path,
                    ..NodeBuilder::default()
                });
                self.child_index
                    .insert(segment.to_owned(), self.children.len() - 1);
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    fn finish(self) -> TreeNode {
        let mut children = self
            .children
            .into_iter()
            .map(NodeBuilder::finish)
            .collect::<Vec<_>>();

        // A path that is also a prefix of other paths keeps its own weight as
        // a leaf alongside its descendants.
        let mut weight = self.weight;
        if !children.is_empty() && weight > 0.0 {
            children.push(TreeNode {
                name: self.name.clone(),
                path: self.path.clone(),
                weight,
                children: Vec::new(),
            });
            weight = 0.0;
        }

        TreeNode {
            name: self.name,
            path: self.path,
            weight,
            children,
        }
    }
}

/// Builds the path hierarchy under an unnamed root. Paths split on `/` (and
/// `\`), empty segments are skipped, duplicate paths sum, and negative or
/// non-finite weights count as zero.
pub fn build_tree<'a>(entries: impl IntoIterator<Item = &'a SizeEntry>) -> TreeNode {
    let mut root = NodeBuilder::default();

    for entry in entries {
        let normalized = normalize_path(entry.path.trim());
        let mut segments = path_segments(&normalized).peekable();
        if segments.peek().is_none() {
            continue;
        }

        let mut node = &mut root;
        for segment in segments {
            node = node.child(segment);
        }
        node.weight += sanitize_weight(entry.weight);
    }

    root.finish()
}

pub(crate) fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}
