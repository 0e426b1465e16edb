//! # Page Layout
//!
//! Placement of the header block and the prescription image on a single page.
//! Units are PDF points (1/72 inch), origin bottom-left.

/// Page geometry and margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    /// Height reserved at the top for the header text.
    pub header_height: f64,
    pub font_size: f64,
    pub line_height: f64,
}

/// Where to draw the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageLayout {
    /// A4 portrait, 595x842 pt.
    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin: 40.0,
            header_height: 80.0,
            font_size: 12.0,
            line_height: 18.0,
        }
    }

    /// Baseline of header line `n` (0-based).
    pub fn header_baseline(&self, n: usize) -> f64 {
        self.height - self.margin - self.font_size - self.line_height * n as f64
    }

    /// Area available for the image, below the header.
    fn image_box(&self) -> (f64, f64) {
        let width = (self.width - 2.0 * self.margin).max(0.0);
        let height = (self.height - 2.0 * self.margin - self.header_height).max(0.0);
        (width, height)
    }

    /// Scale the image uniformly into the image area, center it horizontally
    /// and anchor it on the bottom margin.
    pub fn place_image(&self, pixel_width: u32, pixel_height: u32) -> Placement {
        let (box_w, box_h) = self.image_box();
        if pixel_width == 0 || pixel_height == 0 {
            return Placement {
                x: self.margin,
                y: self.margin,
                width: 0.0,
                height: 0.0,
            };
        }
        let scale = (box_w / pixel_width as f64).min(box_h / pixel_height as f64);
        let width = pixel_width as f64 * scale;
        let height = pixel_height as f64 * scale;
        Placement {
            x: (self.width - width) / 2.0,
            y: self.margin,
            width,
            height,
        }
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4()
    }
}
