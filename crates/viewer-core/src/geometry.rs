//! Page viewport geometry
//!
//! Page sizes come from the document in PDF points. A [`PageViewport`] maps
//! them to CSS pixels for a given scale and rotation and converts viewport
//! offsets back to page space.

use pageflow_scheduler::{PageId, RenderParams};
use serde::{Deserialize, Serialize};

/// CSS pixels per PDF point
pub const PDF_TO_CSS_UNITS: f64 = 96.0 / 72.0;

/// Unscaled page size in points, plus the page's own rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: u16,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            rotation: 0,
        }
    }

    pub fn with_rotation(mut self, rotation: u16) -> Self {
        self.rotation = rotation % 360;
        self
    }

    /// The page's own rotation plus a view rotation, reduced to 0..360
    pub fn total_rotation(&self, view_rotation: u16) -> u16 {
        ((u32::from(self.rotation) + u32::from(view_rotation)) % 360) as u16
    }

    /// US Letter, used when the source cannot report a size
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }
}

/// Reduce a rotation to 0/90/180/270, or `None` if it is not a multiple of 90
pub fn normalize_rotation(rotation: i32) -> Option<u16> {
    if rotation % 90 != 0 {
        return None;
    }
    Some(rotation.rem_euclid(360) as u16)
}

/// Geometry of one page at a given scale and rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub page: PageId,
    /// User scale (1.0 = 100 %)
    pub scale: f64,
    /// Total rotation: the page's own rotation plus the view rotation
    pub rotation: u16,
    /// CSS width after rotation
    pub width: f64,
    /// CSS height after rotation
    pub height: f64,
    /// Unrotated page width in points
    pub view_width: f64,
    /// Unrotated page height in points
    pub view_height: f64,
    /// Device pixels per CSS pixel
    pub output_scale: f64,
}

impl PageViewport {
    pub fn new(page: PageId, size: PageSize, scale: f64, rotation: u16) -> Self {
        let rotation = size.total_rotation(rotation);
        let css_scale = scale * PDF_TO_CSS_UNITS;
        let (width, height) = if rotation % 180 == 0 {
            (size.width * css_scale, size.height * css_scale)
        } else {
            (size.height * css_scale, size.width * css_scale)
        };

        Self {
            page,
            scale,
            rotation,
            width,
            height,
            view_width: size.width,
            view_height: size.height,
            output_scale: 1.0,
        }
    }

    pub fn with_output_scale(mut self, output_scale: f64) -> Self {
        self.output_scale = output_scale;
        self
    }

    /// CSS pixels per point
    pub fn css_scale(&self) -> f64 {
        self.scale * PDF_TO_CSS_UNITS
    }

    /// Size of the viewport at scale 1
    pub fn unscaled_size(&self) -> (f64, f64) {
        if self.scale > 0.0 {
            (self.width / self.scale, self.height / self.scale)
        } else {
            (0.0, 0.0)
        }
    }

    /// Device pixel size of a surface rendered for this viewport
    pub fn surface_size(&self) -> (u32, u32) {
        let width = (self.width * self.output_scale).floor().max(0.0) as u32;
        let height = (self.height * self.output_scale).floor().max(0.0) as u32;
        (width, height)
    }

    /// CSS pixel area, using whole pixels as a canvas would
    pub fn css_pixels(&self) -> f64 {
        self.width.floor() * self.height.floor()
    }

    pub fn render_params(&self) -> RenderParams {
        RenderParams::new(self.scale, self.rotation, self.output_scale)
    }

    /// Convert an offset from the page's top-left corner (CSS pixels) to
    /// page space (points, origin bottom-left of the unrotated page)
    pub fn convert_to_page_point(&self, x: f64, y: f64) -> (f64, f64) {
        let s = self.css_scale();
        if s <= 0.0 {
            return (0.0, 0.0);
        }
        let (w, h) = (self.view_width, self.view_height);
        match self.rotation {
            90 => (y / s, x / s),
            180 => (w - x / s, y / s),
            270 => (w - y / s, h - x / s),
            _ => (x / s, h - y / s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn normalize_rotation_accepts_multiples_of_ninety() {
        assert_eq!(normalize_rotation(0), Some(0));
        assert_eq!(normalize_rotation(450), Some(90));
        assert_eq!(normalize_rotation(-90), Some(270));
        assert_eq!(normalize_rotation(45), None);
    }

    #[test]
    fn viewport_swaps_dimensions_when_rotated() {
        let size = PageSize::new(612.0, 792.0);
        let upright = PageViewport::new(1, size, 1.0, 0);
        assert!(approx(upright.width, 816.0));
        assert!(approx(upright.height, 1056.0));

        let turned = PageViewport::new(1, size, 1.0, 90);
        assert!(approx(turned.width, 1056.0));
        assert!(approx(turned.height, 816.0));

        let intrinsic = PageViewport::new(1, size.with_rotation(90), 1.0, 270);
        assert_eq!(intrinsic.rotation, 0);
    }

    #[test]
    fn raw_page_rotation_does_not_overflow() {
        let size = PageSize {
            width: 612.0,
            height: 792.0,
            rotation: u16::MAX - 15,
        };
        // 65520 is a multiple of 360
        assert_eq!(size.total_rotation(270), 270);

        let viewport = PageViewport::new(1, size, 1.0, 90);
        assert_eq!(viewport.rotation, 90);
        assert!(approx(viewport.width, 1056.0));
    }

    #[test]
    fn surface_size_floors_device_pixels() {
        let viewport = PageViewport::new(1, PageSize::new(100.0, 50.0), 1.0, 0);
        // 133.33 x 66.67 CSS pixels
        assert_eq!(viewport.surface_size(), (133, 66));
        assert_eq!(viewport.with_output_scale(2.0).surface_size(), (266, 133));
    }

    #[test]
    fn page_point_conversion_covers_each_rotation() {
        let size = PageSize::new(72.0, 144.0);
        let s = PDF_TO_CSS_UNITS;

        let vp = PageViewport::new(1, size, 1.0, 0);
        let (x, y) = vp.convert_to_page_point(10.0 * s, 20.0 * s);
        assert!(approx(x, 10.0) && approx(y, 124.0));

        let vp = PageViewport::new(1, size, 1.0, 90);
        let (x, y) = vp.convert_to_page_point(10.0 * s, 20.0 * s);
        assert!(approx(x, 20.0) && approx(y, 10.0));

        let vp = PageViewport::new(1, size, 1.0, 180);
        let (x, y) = vp.convert_to_page_point(10.0 * s, 20.0 * s);
        assert!(approx(x, 62.0) && approx(y, 20.0));

        let vp = PageViewport::new(1, size, 1.0, 270);
        let (x, y) = vp.convert_to_page_point(10.0 * s, 20.0 * s);
        assert!(approx(x, 52.0) && approx(y, 134.0));
    }

    #[test]
    fn unscaled_size_divides_out_the_scale() {
        let vp = PageViewport::new(3, PageSize::new(72.0, 72.0), 2.5, 0);
        let (w, h) = vp.unscaled_size();
        assert!(approx(w, 96.0) && approx(h, 96.0));
        assert_eq!(
            vp.with_output_scale(2.0).render_params(),
            RenderParams::new(2.5, 0, 2.0)
        );
    }
}
