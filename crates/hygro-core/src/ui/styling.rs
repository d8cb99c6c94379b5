//! Colors, padding and the two label style presets used on the dashboard
//!
//! RGB565 format: red 5 bits, green 6 bits, blue 5 bits. To convert from
//! 8-bit RGB: R>>3, G>>2, B>>3.

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::pixelcolor::Rgb565;
use profont::PROFONT_24_POINT;

/// Screen background - black
pub const COLOR_BACKGROUND: Rgb565 = Rgb565::new(0, 0, 0);

/// Pure white - maximum brightness in RGB565
pub const WHITE: Rgb565 = Rgb565::new(31, 63, 31);

/// Padding around an element (top, right, bottom, left)
///
/// ```ignore
/// let p = Padding::all(10);
/// let total_height = p.vertical();   // top + bottom
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Padding {
    /// Creates equal padding on all sides
    pub const fn all(value: u32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Returns total horizontal padding (left + right)
    pub const fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    /// Returns total vertical padding (top + bottom)
    pub const fn vertical(&self) -> u32 {
        self.top + self.bottom
    }
}

/// Visual style of a label: font, text color and padding around the text.
#[derive(Clone, Copy)]
pub struct LabelStyle {
    pub font: &'static MonoFont<'static>,
    pub color: Rgb565,
    pub padding: Padding,
}

impl core::fmt::Debug for LabelStyle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LabelStyle")
            .field("character_size", &self.font.character_size)
            .field("color", &self.color)
            .field("padding", &self.padding)
            .finish()
    }
}

impl PartialEq for LabelStyle {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.font, other.font)
            && self.color == other.color
            && self.padding == other.padding
    }
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self::value()
    }
}

impl LabelStyle {
    /// Caption above a value, 20 px tall.
    pub fn title() -> Self {
        Self {
            font: &FONT_10X20,
            color: WHITE,
            padding: Padding::all(24),
        }
    }

    /// Large numeric value.
    pub fn value() -> Self {
        Self {
            font: &PROFONT_24_POINT,
            color: WHITE,
            padding: Padding::all(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_larger_than_titles() {
        let title = LabelStyle::title().font.character_size;
        let value = LabelStyle::value().font.character_size;
        assert!(value.height > title.height);
        assert!(value.width > title.width);
        assert_eq!(LabelStyle::title().color, LabelStyle::value().color);
    }
}
