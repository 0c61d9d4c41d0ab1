use churnlens_config::SizeMapConfig;
use churnlens_core::HotspotRow;
use churnlens_sizemap::{
    LabelOptions, LayoutOptions, LayoutRect, SizeEntry, SizeMapLayout, layout_entries,
    leaf_label,
};
use serde::Serialize;

use crate::cli::SizeMetric;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeMapCell {
    pub path: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SizeMapCell {
    fn from_leaf(leaf: &LayoutRect, labels: &LabelOptions) -> Self {
        Self {
            path: leaf.path.clone(),
            x0: leaf.x0,
            y0: leaf.y0,
            x1: leaf.x1,
            y1: leaf.y1,
            weight: leaf.weight,
            label: leaf_label(leaf, labels),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeMapView {
    pub metric: &'static str,
    pub width: f64,
    pub height: f64,
    pub total_weight: f64,
    pub directories: usize,
    pub cells: Vec<SizeMapCell>,
}

pub fn size_entries(rows: &[HotspotRow], metric: SizeMetric) -> Vec<SizeEntry> {
    rows.iter()
        .map(|row| {
            let weight = match metric {
                SizeMetric::Churn => row.churn,
                SizeMetric::Touches => row.touches,
            };
            SizeEntry::new(row.path.clone(), weight as f64)
        })
        .collect()
}

pub fn size_map_layout(
    rows: &[HotspotRow],
    metric: SizeMetric,
    width: f64,
    height: f64,
    config: &SizeMapConfig,
) -> SizeMapLayout {
    let entries = size_entries(rows, metric);
    layout_entries(&entries, width, height, &LayoutOptions::from_config(config))
}

pub fn size_map_view(
    layout: &SizeMapLayout,
    metric: SizeMetric,
    width: f64,
    height: f64,
    config: &SizeMapConfig,
) -> SizeMapView {
    let labels = LabelOptions::from_config(config);
    SizeMapView {
        metric: metric.as_str(),
        width,
        height,
        total_weight: layout.total_leaf_weight(),
        directories: layout.groups.len(),
        cells: layout
            .leaves
            .iter()
            .map(|leaf| SizeMapCell::from_leaf(leaf, &labels))
            .collect(),
    }
}

pub fn cell_at(
    layout: &SizeMapLayout,
    x: f64,
    y: f64,
    config: &SizeMapConfig,
) -> Option<SizeMapCell> {
    let labels = LabelOptions::from_config(config);
    layout
        .hit_test(x, y)
        .map(|leaf| SizeMapCell::from_leaf(leaf, &labels))
}
