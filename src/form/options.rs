//! Fill configuration.

use std::sync::Arc;

use crate::form::font::{FontMetrics, StandardFont};

/// Default resource name of the shared fill font in appearance `/Resources`.
pub const DEFAULT_FONT_RESOURCE: &str = "ACFillFont";

/// Font settings for measured, positioned appearance text.
///
/// Without `TextOptions` appearances fall back to the field's raw `/DA` string and are not
/// positioned.
#[derive(Clone, Debug)]
pub struct TextOptions {
    /// Metrics of the font used for drawing
    pub font: Arc<dyn FontMetrics>,
    /// Font size in points
    pub size: f64,
    /// Fill color as RGB components in `0.0..=1.0`; `None` keeps the graphics state default
    pub color: Option<[f64; 3]>,
    /// Name under which the font is registered in each appearance's `/Resources /Font`
    pub resource_name: String,
}

impl TextOptions {
    /// Text options for `font` at `size`, in the default color.
    #[must_use]
    pub fn new(font: Arc<dyn FontMetrics>, size: f64) -> Self {
        TextOptions {
            font,
            size,
            color: None,
            resource_name: DEFAULT_FONT_RESOURCE.to_string(),
        }
    }

    /// Helvetica at `size`.
    #[must_use]
    pub fn helvetica(size: f64) -> Self {
        TextOptions::new(Arc::new(StandardFont::Helvetica), size)
    }

    /// Set the fill color.
    #[must_use]
    pub fn with_color(mut self, rgb: [f64; 3]) -> Self {
        self.color = Some(rgb);
        self
    }

    /// Set the font resource name.
    #[must_use]
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = name.into();
        self
    }
}

/// Configuration of a fill operation
///
/// The defaults produce a degraded but valid appearance from each field's `/DA` string and
/// allow field trees up to 64 levels deep.
#[derive(Clone, Debug)]
pub struct FillOptions {
    /// Font used for regenerated text and choice appearances; `None` selects the `/DA` fallback
    pub text: Option<TextOptions>,

    /// Maximum depth of the field tree below the AcroForm `/Fields` array (default: 64)
    pub max_depth: usize,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            text: None,
            max_depth: 64,
        }
    }
}

impl FillOptions {
    /// Same as [`FillOptions::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that measure and position text with `text`.
    #[must_use]
    pub fn with_text(text: TextOptions) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    /// Set the maximum field tree depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
