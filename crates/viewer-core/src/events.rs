use std::fmt;
use std::time::Duration;

use pageflow_scheduler::{PageId, RenderError};
use serde::{Deserialize, Serialize};

use crate::scale::ScalePreset;

/// Notifications for collaborators, collected until `drain_events`
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    PageRenderStarted {
        page: PageId,
    },
    /// A page finished rendering, failed, or switched to a scaled preview
    PageRendered {
        page: PageId,
        error: Option<RenderError>,
        elapsed: Duration,
        /// The page shows a scaled copy of an older surface
        css_transform: bool,
    },
    ThumbnailRendered {
        page: PageId,
        error: Option<RenderError>,
    },
    LocationChanged(Location),
    CurrentPageChanged {
        page: PageId,
        previous: PageId,
    },
    ScaleChanged {
        scale: f64,
        preset: Option<ScalePreset>,
    },
    RotationChanged {
        rotation: u16,
    },
    /// Nothing was rendered for the cleanup timeout
    Idle,
}

/// Zoom as reported in a location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationScale {
    Preset(ScalePreset),
    /// Percent, rounded to two decimals
    Percent(f64),
}

impl LocationScale {
    pub fn from_scale(scale: f64) -> Self {
        LocationScale::Percent((scale * 10_000.0).round() / 100.0)
    }
}

impl fmt::Display for LocationScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationScale::Preset(preset) => f.write_str(preset.as_str()),
            LocationScale::Percent(percent) => write!(f, "{}", percent),
        }
    }
}

/// Where the viewport is, in terms a history or bookmark store can persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub page_number: PageId,
    pub scale: LocationScale,
    /// Page-space point of the viewport's top-left corner
    pub top: i64,
    pub left: i64,
    pub rotation: u16,
    /// `#page=N&zoom=Z,left,top`
    pub open_params: String,
}

impl Location {
    pub fn new(page_number: PageId, scale: LocationScale, left: i64, top: i64, rotation: u16) -> Self {
        let open_params = format!("#page={}&zoom={},{},{}", page_number, scale, left, top);
        Self {
            page_number,
            scale,
            top,
            left,
            rotation,
            open_params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_params_use_rounded_percent() {
        let location = Location::new(3, LocationScale::from_scale(1.234567), 12, 700, 0);
        assert_eq!(location.open_params, "#page=3&zoom=123.46,12,700");

        let location = Location::new(1, LocationScale::from_scale(1.5), 0, 792, 90);
        assert_eq!(location.open_params, "#page=1&zoom=150,0,792");
    }

    #[test]
    fn open_params_use_preset_names() {
        let location = Location::new(2, LocationScale::Preset(ScalePreset::PageFit), -4, 10, 0);
        assert_eq!(location.open_params, "#page=2&zoom=page-fit,-4,10");
    }

    #[test]
    fn location_serializes_for_history_stores() {
        let location = Location::new(5, LocationScale::from_scale(2.0), 1, 2, 180);
        let json = serde_json::to_value(&location).unwrap();

        assert_eq!(json["pageNumber"], 5);
        assert_eq!(json["scale"], 200.0);
        assert_eq!(json["openParams"], "#page=5&zoom=200,1,2");

        let back: Location = serde_json::from_value(json).unwrap();
        assert_eq!(back, location);

        let preset = Location::new(1, LocationScale::Preset(ScalePreset::Auto), 0, 0, 0);
        let json = serde_json::to_value(&preset).unwrap();
        assert_eq!(json["scale"], "auto");
    }
}
