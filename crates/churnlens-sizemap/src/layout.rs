use churnlens_config::SizeMapConfig;
use serde::Serialize;

use crate::tree::{TreeNode, sanitize_weight};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Subtracted from every side of the canvas before the top-level pass.
    pub outer_padding: f64,
    /// Subtracted from every side of a group before laying out its children.
    pub inner_padding: f64,
}

impl LayoutOptions {
    pub fn from_config(config: &SizeMapConfig) -> Self {
        Self {
            outer_padding: config.outer_padding,
            inner_padding: config.inner_padding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutRect {
    pub path: String,
    pub name: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub depth: usize,
    pub weight: f64,
}

impl LayoutRect {
    fn new(node: &TreeNode, bounds: Bounds, depth: usize, weight: f64) -> Self {
        Self {
            path: node.path.clone(),
            name: node.name.clone(),
            x0: bounds.x0,
            y0: bounds.y0,
            x1: bounds.x1,
            y1: bounds.y1,
            depth,
            weight,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Inclusive on every edge.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }
}

/// Group rectangles (directories) and leaf rectangles (files), each in
/// layout order.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SizeMapLayout {
    pub groups: Vec<LayoutRect>,
    pub leaves: Vec<LayoutRect>,
}

impl SizeMapLayout {
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&LayoutRect> {
        hit_test(&self.leaves, x, y)
    }

    pub fn total_leaf_weight(&self) -> f64 {
        self.leaves.iter().map(|leaf| leaf.weight).sum()
    }
}

/// First leaf whose rectangle contains the point. Collapsed leaves with no
/// width or height are never hit.
pub fn hit_test(leaves: &[LayoutRect], x: f64, y: f64) -> Option<&LayoutRect> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    leaves
        .iter()
        .filter(|leaf| leaf.width() > 0.0 && leaf.height() > 0.0)
        .find(|leaf| leaf.contains(x, y))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Bounds {
    fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Shrinks every side by `padding`. An axis narrower than twice the
    /// padding collapses onto its midpoint instead of inverting.
    fn inset(self, padding: f64) -> Self {
        let padding = if padding.is_finite() { padding.max(0.0) } else { 0.0 };
        let (x0, x1) = inset_axis(self.x0, self.x1, padding);
        let (y0, y1) = inset_axis(self.y0, self.y1, padding);
        Self { x0, y0, x1, y1 }
    }
}

fn inset_axis(low: f64, high: f64, padding: f64) -> (f64, f64) {
    if high - low <= 2.0 * padding {
        let mid = (low + high) / 2.0;
        return (mid, mid);
    }
    (low + padding, high - padding)
}

/// Squarified layout of `root`'s subtrees over a `width` x `height` canvas.
/// Subtrees without positive weight are left out. Leaf rectangles report the
/// node's own weight, so their weights sum to the tree's total weight.
pub fn layout_tree(
    root: &TreeNode,
    width: f64,
    height: f64,
    options: &LayoutOptions,
) -> SizeMapLayout {
    let canvas = Bounds {
        x0: 0.0,
        y0: 0.0,
        x1: sanitize_extent(width),
        y1: sanitize_extent(height),
    };

    let mut layout = SizeMapLayout::default();
    if root.is_leaf() {
        let weight = sanitize_weight(root.weight);
        if weight > 0.0 {
            let bounds = canvas.inset(options.outer_padding);
            layout.leaves.push(LayoutRect::new(root, bounds, 0, weight));
        }
        return layout;
    }

    place_children(
        root,
        canvas.inset(options.outer_padding),
        1,
        options,
        &mut layout,
    );
    layout
}

fn place_children(
    node: &TreeNode,
    bounds: Bounds,
    depth: usize,
    options: &LayoutOptions,
    layout: &mut SizeMapLayout,
) {
    let mut weighted = node
        .children
        .iter()
        .map(|child| (child, effective_weight(child)))
        .filter(|(_, weight)| *weight > 0.0)
        .collect::<Vec<_>>();
    weighted.sort_by(|left, right| right.1.total_cmp(&left.1));

    let weights = weighted.iter().map(|(_, weight)| *weight).collect::<Vec<_>>();
    for ((child, weight), cell) in weighted.into_iter().zip(squarify(&weights, bounds)) {
        if child.is_leaf() {
            layout
                .leaves
                .push(LayoutRect::new(child, cell, depth, weight));
        } else {
            layout
                .groups
                .push(LayoutRect::new(child, cell, depth, weight));
            place_children(
                child,
                cell.inset(options.inner_padding),
                depth + 1,
                options,
                layout,
            );
        }
    }
}

fn effective_weight(node: &TreeNode) -> f64 {
    sanitize_weight(node.weight)
        + node
            .children
            .iter()
            .map(effective_weight)
            .sum::<f64>()
}

fn sanitize_extent(extent: f64) -> f64 {
    if extent.is_finite() && extent > 0.0 {
        extent
    } else {
        0.0
    }
}

/// Splits `bounds` into one cell per weight, in order, with cell areas
/// proportional to the weights. `weights` must be positive and sorted
/// descending.
fn squarify(weights: &[f64], bounds: Bounds) -> Vec<Bounds> {
    let total = weights.iter().sum::<f64>();
    if weights.is_empty() || total <= 0.0 || bounds.area() <= 0.0 {
        let corner = Bounds {
            x0: bounds.x0,
            y0: bounds.y0,
            x1: bounds.x0,
            y1: bounds.y0,
        };
        return vec![corner; weights.len()];
    }

    let scale = bounds.area() / total;
    let areas = weights.iter().map(|weight| weight * scale).collect::<Vec<_>>();

    let mut cells = Vec::with_capacity(areas.len());
    let mut remaining = bounds;
    let mut start = 0;
    while start < areas.len() {
        let side = remaining.width().min(remaining.height());
        let mut end = start + 1;
        let mut worst = worst_ratio(&areas[start..end], side);
        while end < areas.len() {
            let candidate = worst_ratio(&areas[start..=end], side);
            if candidate > worst {
                break;
            }
            worst = candidate;
            end += 1;
        }

        let is_last_row = end == areas.len();
        remaining = lay_row(&areas[start..end], remaining, is_last_row, &mut cells);
        start = end;
    }

    cells
}

/// Worst aspect ratio of a row of `areas` laid along a side of length `side`.
fn worst_ratio(areas: &[f64], side: f64) -> f64 {
    let sum = areas.iter().sum::<f64>();
    if sum <= 0.0 || side <= 0.0 {
        return f64::INFINITY;
    }
    let side_sq = side * side;
    let sum_sq = sum * sum;
    areas
        .iter()
        .map(|area| {
            if *area <= 0.0 {
                return f64::INFINITY;
            }
            (side_sq * area / sum_sq).max(sum_sq / (side_sq * area))
        })
        .fold(0.0, f64::max)
}

/// Lays one row against the shorter side of `remaining` and returns what is
/// left. The final row and each row's final cell are snapped to the edges so
/// rounding never leaks outside the parent.
fn lay_row(areas: &[f64], remaining: Bounds, is_last_row: bool, cells: &mut Vec<Bounds>) -> Bounds {
    let sum = areas.iter().sum::<f64>();
    let last = areas.len().saturating_sub(1);

    if remaining.width() >= remaining.height() {
        let thickness = if is_last_row {
            remaining.width()
        } else {
            (sum / remaining.height()).min(remaining.width())
        };
        let x1 = remaining.x0 + thickness;
        let mut y = remaining.y0;
        for (index, area) in areas.iter().enumerate() {
            let y1 = if index == last {
                remaining.y1
            } else {
                (y + area / thickness).min(remaining.y1)
            };
            cells.push(Bounds {
                x0: remaining.x0,
                y0: y,
                x1,
                y1,
            });
            y = y1;
        }
        Bounds {
            x0: x1,
            ..remaining
        }
    } else {
        let thickness = if is_last_row {
            remaining.height()
        } else {
            (sum / remaining.width()).min(remaining.height())
        };
        let y1 = remaining.y0 + thickness;
        let mut x = remaining.x0;
        for (index, area) in areas.iter().enumerate() {
            let x1 = if index == last {
                remaining.x1
            } else {
                (x + area / thickness).min(remaining.x1)
            };
            cells.push(Bounds {
                x0: x,
                y0: remaining.y0,
                x1,
                y1,
            });
            x = x1;
        }
        Bounds {
            y0: y1,
            ..remaining
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(width: f64, height: f64) -> Bounds {
        Bounds {
            x0: 0.0,
            y0: 0.0,
            x1: width,
            y1: height,
        }
    }

    #[test]
    fn squarify_tiles_the_bounds_proportionally() {
        let weights = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let cells = squarify(&weights, bounds(6.0, 4.0));

        assert_eq!(cells.len(), weights.len());
        let total_area = cells.iter().map(Bounds::area).sum::<f64>();
        assert!((total_area - 24.0).abs() < 1e-9);
        for (cell, weight) in cells.iter().zip(weights) {
            assert!((cell.area() - weight).abs() < 1e-9, "{cell:?} vs {weight}");
            assert!(cell.x0 >= 0.0 && cell.x1 <= 6.0);
            assert!(cell.y0 >= 0.0 && cell.y1 <= 4.0);
        }
    }

    #[test]
    fn degenerate_bounds_collapse_cells() {
        let cells = squarify(&[2.0, 1.0], bounds(0.0, 10.0));
        assert!(cells.iter().all(|cell| cell.area() == 0.0));
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn inset_never_inverts() {
        let inset = bounds(4.0, 10.0).inset(3.0);
        assert_eq!((inset.x0, inset.x1), (2.0, 2.0));
        assert_eq!((inset.y0, inset.y1), (3.0, 7.0));

        let unchanged = bounds(4.0, 4.0).inset(f64::NAN);
        assert_eq!(unchanged, bounds(4.0, 4.0));
    }

    #[test]
    fn worst_ratio_prefers_square_cells() {
        assert_eq!(worst_ratio(&[4.0], 2.0), 1.0);
        assert!(worst_ratio(&[4.0, 1.0], 2.0) > worst_ratio(&[4.0], 2.0));
        assert_eq!(worst_ratio(&[], 2.0), f64::INFINITY);
    }
}
