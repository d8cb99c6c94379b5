//! Label capability consumed by the dashboard
//!
//! A retained-mode surface that owns text labels. Callers create a label,
//! style and position it once, then only change its text.

use embedded_graphics::prelude::*;
use thiserror_no_std::Error;

use super::styling::LabelStyle;

/// Reference point on the parent a label is aligned to.
///
/// The offset passed to [`LabelSurface::position_label`] moves the label away
/// from that point, positive values going right and down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    TopLeft,
    TopMid,
    TopRight,
    LeftMid,
    #[default]
    Center,
    RightMid,
    BottomLeft,
    BottomMid,
    BottomRight,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("label capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
    #[error("unknown label")]
    UnknownLabel,
}

pub trait LabelSurface {
    type Handle: Copy;

    /// Create an empty label. `None` as parent means the screen itself.
    fn create_label(&mut self, parent: Option<Self::Handle>) -> Result<Self::Handle, DisplayError>;

    fn style_label(&mut self, handle: Self::Handle, style: LabelStyle);

    /// Replace the text of a label. Writing the text a label already shows
    /// is a no-op.
    fn set_label_text(&mut self, handle: Self::Handle, text: &str);

    fn position_label(&mut self, handle: Self::Handle, anchor: Anchor, offset: Point);

    /// Size the label currently occupies, padding included.
    fn label_size(&self, handle: Self::Handle) -> Size;
}
