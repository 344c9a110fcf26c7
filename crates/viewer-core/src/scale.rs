//! Zoom values and fit-to-container presets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCALE: f64 = 1.0;
pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 10.0;
/// Upper bound for the `auto` preset
pub const MAX_AUTO_SCALE: f64 = 1.25;
/// Horizontal room left for a scrollbar when fitting
pub const SCROLLBAR_PADDING: f64 = 40.0;
pub const VERTICAL_PADDING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalePreset {
    /// 100 %
    PageActual,
    PageWidth,
    PageHeight,
    /// Whole page inside the container
    PageFit,
    /// Page width for portrait pages, page fit otherwise, capped at 125 %
    Auto,
}

impl ScalePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalePreset::PageActual => "page-actual",
            ScalePreset::PageWidth => "page-width",
            ScalePreset::PageHeight => "page-height",
            ScalePreset::PageFit => "page-fit",
            ScalePreset::Auto => "auto",
        }
    }
}

impl fmt::Display for ScalePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested zoom: a preset resolved against the container, or a number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScaleValue {
    Preset(ScalePreset),
    Value(f64),
}

impl Default for ScaleValue {
    fn default() -> Self {
        ScaleValue::Preset(ScalePreset::Auto)
    }
}

impl fmt::Display for ScaleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleValue::Preset(preset) => f.write_str(preset.as_str()),
            ScaleValue::Value(value) => write!(f, "{}", value),
        }
    }
}

impl FromStr for ScaleValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let preset = match s {
            "page-actual" => Some(ScalePreset::PageActual),
            "page-width" => Some(ScalePreset::PageWidth),
            "page-height" => Some(ScalePreset::PageHeight),
            "page-fit" => Some(ScalePreset::PageFit),
            "auto" => Some(ScalePreset::Auto),
            _ => None,
        };
        if let Some(preset) = preset {
            return Ok(ScaleValue::Preset(preset));
        }

        match s.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Ok(ScaleValue::Value(value)),
            _ => Err(format!("invalid scale value '{}'", s)),
        }
    }
}

impl TryFrom<String> for ScaleValue {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScaleValue> for String {
    fn from(value: ScaleValue) -> Self {
        value.to_string()
    }
}

/// What a preset is resolved against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTarget {
    pub container_width: f64,
    pub container_height: f64,
    /// Current page size in CSS pixels at scale 1, after rotation
    pub page_width: f64,
    pub page_height: f64,
    /// Two pages share the width (spreads outside horizontal scrolling)
    pub two_page_width: bool,
    /// Horizontal scrolling swaps the paddings
    pub horizontal: bool,
}

/// Scale for `preset`, or `None` when the target is degenerate
pub fn resolve_preset(preset: ScalePreset, target: &FitTarget) -> Option<f64> {
    if preset == ScalePreset::PageActual {
        return Some(1.0);
    }
    if target.page_width <= 0.0 || target.page_height <= 0.0 {
        return None;
    }

    let (h_padding, v_padding) = if target.horizontal {
        (VERTICAL_PADDING, SCROLLBAR_PADDING)
    } else {
        (SCROLLBAR_PADDING, VERTICAL_PADDING)
    };
    let width_factor = if target.two_page_width { 2.0 } else { 1.0 };

    let page_width_scale = (target.container_width - h_padding) / target.page_width / width_factor;
    let page_height_scale = (target.container_height - v_padding) / target.page_height;

    let scale = match preset {
        ScalePreset::PageActual => 1.0,
        ScalePreset::PageWidth => page_width_scale,
        ScalePreset::PageHeight => page_height_scale,
        ScalePreset::PageFit => page_width_scale.min(page_height_scale),
        ScalePreset::Auto => {
            let portrait = target.page_width <= target.page_height;
            let horizontal_scale = if portrait {
                page_width_scale
            } else {
                page_height_scale.min(page_width_scale)
            };
            MAX_AUTO_SCALE.min(horizontal_scale)
        }
    };

    if scale.is_finite() && scale > 0.0 {
        Some(scale)
    } else {
        None
    }
}

pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

pub fn is_same_scale(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < 1e-15
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(page_width: f64, page_height: f64) -> FitTarget {
        FitTarget {
            container_width: 840.0,
            container_height: 605.0,
            page_width,
            page_height,
            two_page_width: false,
            horizontal: false,
        }
    }

    #[test]
    fn presets_fit_the_container() {
        let portrait = target(400.0, 1200.0);

        assert_eq!(resolve_preset(ScalePreset::PageActual, &portrait), Some(1.0));
        assert_eq!(resolve_preset(ScalePreset::PageWidth, &portrait), Some(2.0));
        assert_eq!(resolve_preset(ScalePreset::PageHeight, &portrait), Some(0.5));
        assert_eq!(resolve_preset(ScalePreset::PageFit, &portrait), Some(0.5));
        assert_eq!(resolve_preset(ScalePreset::Auto, &portrait), Some(MAX_AUTO_SCALE));
    }

    #[test]
    fn auto_uses_page_fit_for_landscape_pages() {
        let landscape = target(1600.0, 1200.0);
        assert_eq!(resolve_preset(ScalePreset::Auto, &landscape), Some(0.5));
    }

    #[test]
    fn spreads_halve_the_page_width_scale() {
        let mut spread = target(400.0, 1200.0);
        spread.two_page_width = true;
        assert_eq!(resolve_preset(ScalePreset::PageWidth, &spread), Some(1.0));
    }

    #[test]
    fn degenerate_targets_do_not_resolve() {
        assert_eq!(resolve_preset(ScalePreset::PageFit, &target(0.0, 100.0)), None);

        let mut tiny = target(400.0, 400.0);
        tiny.container_width = 10.0;
        assert_eq!(resolve_preset(ScalePreset::PageWidth, &tiny), None);
    }

    #[test]
    fn scale_values_parse_and_display() {
        assert_eq!(
            "page-width".parse::<ScaleValue>(),
            Ok(ScaleValue::Preset(ScalePreset::PageWidth))
        );
        assert_eq!("1.5".parse::<ScaleValue>(), Ok(ScaleValue::Value(1.5)));
        assert!("-2".parse::<ScaleValue>().is_err());
        assert!("huge".parse::<ScaleValue>().is_err());
        assert_eq!(ScaleValue::Value(1.5).to_string(), "1.5");
        assert_eq!(ScaleValue::default().to_string(), "auto");
    }

    #[test]
    fn scale_values_serialize_as_strings() {
        let json = serde_json::to_string(&ScaleValue::Preset(ScalePreset::PageFit)).unwrap();
        assert_eq!(json, "\"page-fit\"");

        let value: ScaleValue = serde_json::from_str("\"0.75\"").unwrap();
        assert_eq!(value, ScaleValue::Value(0.75));
        assert!(serde_json::from_str::<ScaleValue>("\"sideways\"").is_err());
    }

    #[test]
    fn same_scale_and_clamping() {
        assert!(is_same_scale(1.0, 1.0 + 1e-16));
        assert!(!is_same_scale(1.0, 1.01));
        assert_eq!(clamp_scale(50.0), MAX_SCALE);
        assert_eq!(clamp_scale(0.0), MIN_SCALE);
    }
}
