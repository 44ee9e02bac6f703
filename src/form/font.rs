//! Font metrics used to position text in regenerated appearances.
//!
//! The measured appearance path needs only two numbers from a font: the advance width of a
//! string and the height of a line. [`FontMetrics`] abstracts over where these come from.
//! [`StandardFont`] supplies them for two of the standard 14 Type1 fonts, which every viewer
//! provides without embedding.

use std::fmt::Debug;

/// Measurements of a font at a given size.
pub trait FontMetrics: Debug + Send + Sync {
    /// The `/BaseFont` name written to the font resource, e.g. `Helvetica`.
    fn base_font(&self) -> &str;

    /// Advance width of `text` in user-space units at `size`.
    fn text_width(&self, text: &str, size: f64) -> f64;

    /// Height of a line of text at `size`, used for vertical centering.
    fn text_height(&self, size: f64) -> f64;
}

/// Helvetica advance widths for character codes 32 through 126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// A standard Type1 font with built-in metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StandardFont {
    /// Helvetica (proportional)
    #[default]
    Helvetica,
    /// Courier (monospaced)
    Courier,
}

impl StandardFont {
    fn glyph_width(self, c: char) -> u16 {
        match self {
            StandardFont::Courier => 600,
            StandardFont::Helvetica => {
                let code = u32::from(c);
                match code {
                    32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
                    _ => 556,
                }
            }
        }
    }

    fn cap_height(self) -> f64 {
        match self {
            StandardFont::Helvetica => 718.0,
            StandardFont::Courier => 562.0,
        }
    }
}

impl FontMetrics for StandardFont {
    fn base_font(&self) -> &str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::Courier => "Courier",
        }
    }

    fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| u32::from(self.glyph_width(c))).sum();
        f64::from(units) * size / 1000.0
    }

    fn text_height(&self, size: f64) -> f64 {
        self.cap_height() * size / 1000.0
    }
}
