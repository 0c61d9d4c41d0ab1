//! Path-weighted treemap: build a hierarchy from `(path, weight)` pairs, lay it
//! out as squarified rectangles, then hit-test and label the leaves.

mod labels;
mod layout;
mod tree;

pub use labels::{LabelOptions, leaf_label};
pub use layout::{LayoutOptions, LayoutRect, SizeMapLayout, hit_test, layout_tree};
pub use tree::{SizeEntry, TreeNode, build_tree};

/// Builds and lays out `entries` in one pass.
pub fn layout_entries<'a>(
    entries: impl IntoIterator<Item = &'a SizeEntry>,
    width: f64,
    height: f64,
    options: &LayoutOptions,
) -> SizeMapLayout {
    layout_tree(&build_tree(entries), width, height, options)
}
