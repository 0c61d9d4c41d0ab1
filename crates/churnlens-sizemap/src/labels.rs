use churnlens_config::SizeMapConfig;

use crate::layout::LayoutRect;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelOptions {
    pub min_width: f64,
    pub min_height: f64,
    pub approx_char_width: f64,
}

impl LabelOptions {
    pub fn from_config(config: &SizeMapConfig) -> Self {
        Self {
            min_width: config.label_min_width,
            min_height: config.label_min_height,
            approx_char_width: config.approx_char_width,
        }
    }
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self::from_config(&SizeMapConfig::default())
    }
}

/// Label for a leaf rectangle, or `None` when the rectangle is too small to
/// carry one. Names wider than the rectangle are cut to fit, ending in `…`.
pub fn leaf_label(rect: &LayoutRect, options: &LabelOptions) -> Option<String> {
    if !(rect.width() > options.min_width && rect.height() > options.min_height) {
        return None;
    }
    if rect.name.is_empty() {
        return None;
    }
    if !(options.approx_char_width.is_finite() && options.approx_char_width > 0.0) {
        return Some(rect.name.clone());
    }

    let capacity = (rect.width() / options.approx_char_width).floor();
    let name_len = rect.name.chars().count();
    if name_len as f64 <= capacity {
        return Some(rect.name.clone());
    }
    if capacity < 1.0 {
        return None;
    }

    let kept = capacity as usize - 1;
    let mut label = rect.name.chars().take(kept).collect::<String>();
    label.push(ELLIPSIS);
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(name: &str, width: f64, height: f64) -> LayoutRect {
        LayoutRect {
            path: name.to_owned(),
            name: name.to_owned(),
            x0: 0.0,
            y0: 0.0,
            x1: width,
            y1: height,
            depth: 1,
            weight: 1.0,
        }
    }

    fn options() -> LabelOptions {
        LabelOptions {
            min_width: 30.0,
            min_height: 14.0,
            approx_char_width: 7.0,
        }
    }

    #[test]
    fn short_names_fit_untouched() {
        assert_eq!(
            leaf_label(&rect("lib.rs", 70.0, 20.0), &options()).as_deref(),
            Some("lib.rs")
        );
    }

    #[test]
    fn long_names_are_cut_to_the_width() {
        let label = leaf_label(&rect("configuration.rs", 50.0, 20.0), &options())
            .expect("label");
        assert_eq!(label, "config…");
        assert_eq!(label.chars().count(), 7);
    }

    #[test]
    fn small_rects_get_no_label() {
        assert_eq!(leaf_label(&rect("lib.rs", 30.0, 20.0), &options()), None);
        assert_eq!(leaf_label(&rect("lib.rs", 80.0, 14.0), &options()), None);
        assert_eq!(leaf_label(&rect("", 80.0, 20.0), &options()), None);
    }

    #[test]
    fn multibyte_names_truncate_on_char_boundaries() {
        let label = leaf_label(&rect("ñandú_módulo.rs", 35.0, 20.0), &options())
            .expect("label");
        assert_eq!(label, "ñand…");
    }
}
