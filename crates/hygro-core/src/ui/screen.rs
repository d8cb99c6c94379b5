//! Retained label screen
//!
//! [`LabelScreen`] stores up to `N` labels with dirty tracking and renders
//! them onto any `Rgb565` draw target. [`SharedScreen`] puts one behind an
//! `embassy-sync` blocking mutex so a sampling task can write labels while a
//! render task redraws: the lock is only held to copy dirty labels out, never
//! while pixels are pushed to the panel.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};
use embedded_layout::align::{Align, horizontal, vertical};

use super::labels::{Anchor, DisplayError, LabelSurface};
use super::styling::LabelStyle;

/// Maximum text length of a label, in bytes.
pub const LABEL_TEXT_CAPACITY: usize = 32;

pub type LabelText = heapless::String<LABEL_TEXT_CAPACITY>;

/// Labels addressable by a [`LabelId`], whatever the screen capacity.
pub const MAX_LABELS: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelId(u8);

#[derive(Debug, Clone)]
struct Label {
    parent: Option<LabelId>,
    text: LabelText,
    style: LabelStyle,
    anchor: Anchor,
    offset: Point,
    dirty: bool,
    /// Text area covered by the last render.
    drawn: Option<Rectangle>,
}

impl Label {
    fn new(parent: Option<LabelId>) -> Self {
        Self {
            parent,
            text: LabelText::new(),
            style: LabelStyle::default(),
            anchor: Anchor::default(),
            offset: Point::zero(),
            dirty: true,
            drawn: None,
        }
    }

    fn set_text(&mut self, text: &str) {
        if self.text.as_str() == text {
            return;
        }

        // Truncate on a char boundary
        let mut new_text = LabelText::new();
        for c in text.chars() {
            if new_text.push(c).is_err() {
                break;
            }
        }

        if self.text != new_text {
            self.text = new_text;
            self.dirty = true;
        }
    }

    fn text_size(&self) -> Size {
        let font = self.style.font;
        let chars = self.text.chars().count() as u32;
        let width = if chars == 0 {
            0
        } else {
            chars * font.character_size.width + (chars - 1) * font.character_spacing
        };
        Size::new(width, font.character_size.height)
    }

    fn size(&self) -> Size {
        let text = self.text_size();
        let padding = self.style.padding;
        Size::new(
            text.width + padding.horizontal(),
            text.height + padding.vertical(),
        )
    }
}

fn align(area: Rectangle, reference: &Rectangle, anchor: Anchor) -> Rectangle {
    match anchor {
        Anchor::TopLeft => area.align_to(reference, horizontal::Left, vertical::Top),
        Anchor::TopMid => area.align_to(reference, horizontal::Center, vertical::Top),
        Anchor::TopRight => area.align_to(reference, horizontal::Right, vertical::Top),
        Anchor::LeftMid => area.align_to(reference, horizontal::Left, vertical::Center),
        Anchor::Center => area.align_to(reference, horizontal::Center, vertical::Center),
        Anchor::RightMid => area.align_to(reference, horizontal::Right, vertical::Center),
        Anchor::BottomLeft => area.align_to(reference, horizontal::Left, vertical::Bottom),
        Anchor::BottomMid => area.align_to(reference, horizontal::Center, vertical::Bottom),
        Anchor::BottomRight => area.align_to(reference, horizontal::Right, vertical::Bottom),
    }
}

/// One label to draw, copied out of the screen.
#[derive(Debug, Clone)]
pub struct RenderOp {
    /// Text area drawn by the previous render, erased first.
    pub clear: Option<Rectangle>,
    pub text_area: Rectangle,
    pub text: LabelText,
    pub style: LabelStyle,
}

/// Everything that changed since the previous render.
#[derive(Debug, Clone)]
pub struct RenderBatch<const N: usize> {
    /// Set on the first render: fill `bounds` with `background` first.
    pub clear_screen: bool,
    pub bounds: Rectangle,
    pub background: Rgb565,
    pub ops: heapless::Vec<RenderOp, N>,
}

impl<const N: usize> RenderBatch<N> {
    pub fn is_empty(&self) -> bool {
        !self.clear_screen && self.ops.is_empty()
    }

    pub fn draw<D: DrawTarget<Color = Rgb565>>(&self, target: &mut D) -> Result<(), D::Error> {
        if self.clear_screen {
            target.fill_solid(&self.bounds, self.background)?;
        }

        for op in &self.ops {
            if let Some(previous) = op.clear {
                target.fill_solid(&previous, self.background)?;
            }

            let style = MonoTextStyle::new(op.style.font, op.style.color);
            Text::with_baseline(&op.text, op.text_area.top_left, style, Baseline::Top)
                .draw(target)?;
        }

        Ok(())
    }
}

pub struct LabelScreen<const N: usize> {
    bounds: Rectangle,
    background: Rgb565,
    labels: heapless::Vec<Label, N>,
    cleared: bool,
}

impl<const N: usize> LabelScreen<N> {
    pub const fn new(bounds: Rectangle, background: Rgb565) -> Self {
        Self {
            bounds,
            background,
            labels: heapless::Vec::new(),
            cleared: false,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn text(&self, id: LabelId) -> Option<&str> {
        self.labels.get(id.0 as usize).map(|label| label.text.as_str())
    }

    pub fn is_dirty(&self) -> bool {
        !self.cleared || self.labels.iter().any(|label| label.dirty)
    }

    /// Screen area a label occupies, padding included.
    pub fn label_bounds(&self, id: LabelId) -> Option<Rectangle> {
        let index = id.0 as usize;
        (index < self.labels.len()).then(|| self.resolve(index))
    }

    // Parents always have a lower index, so this terminates.
    fn resolve(&self, index: usize) -> Rectangle {
        let label = &self.labels[index];
        let reference = match label.parent {
            Some(parent) => self.resolve(parent.0 as usize),
            None => self.bounds,
        };

        let area = Rectangle::new(Point::zero(), label.size());
        align(area, &reference, label.anchor).translate(label.offset)
    }

    fn text_area(&self, index: usize) -> Rectangle {
        let label = &self.labels[index];
        let area = self.resolve(index);
        let padding = label.style.padding;
        Rectangle::new(
            area.top_left + Point::new(padding.left as i32, padding.top as i32),
            label.text_size(),
        )
    }

    fn label_mut(&mut self, id: LabelId) -> Option<&mut Label> {
        self.labels.get_mut(id.0 as usize)
    }

    /// Collect every label whose text or position changed and mark it clean.
    pub fn take_render_batch(&mut self) -> RenderBatch<N> {
        let clear_screen = !self.cleared;
        self.cleared = true;

        let mut ops = heapless::Vec::new();
        for index in 0..self.labels.len() {
            let text_area = self.text_area(index);
            let label = &mut self.labels[index];

            let moved = label.drawn != Some(text_area);
            if !(clear_screen || label.dirty || moved) {
                continue;
            }

            let op = RenderOp {
                clear: if clear_screen { None } else { label.drawn },
                text_area,
                text: label.text.clone(),
                style: label.style,
            };
            label.drawn = Some(text_area);
            label.dirty = false;

            // Cannot overflow: at most one op per label.
            let _ = ops.push(op);
        }

        RenderBatch {
            clear_screen,
            bounds: self.bounds,
            background: self.background,
            ops,
        }
    }

    /// Force a full redraw on the next render.
    ///
    /// Called after a failed draw, since the panel may hold any mix of old
    /// and new pixels at that point.
    pub fn invalidate(&mut self) {
        self.cleared = false;
    }

    pub fn render<D: DrawTarget<Color = Rgb565>>(&mut self, target: &mut D) -> Result<(), D::Error> {
        let result = self.take_render_batch().draw(target);
        if result.is_err() {
            self.invalidate();
        }
        result
    }
}

impl<const N: usize> LabelSurface for LabelScreen<N> {
    type Handle = LabelId;

    fn create_label(&mut self, parent: Option<LabelId>) -> Result<LabelId, DisplayError> {
        if let Some(parent) = parent
            && parent.0 as usize >= self.labels.len()
        {
            return Err(DisplayError::UnknownLabel);
        }

        let id = u8::try_from(self.labels.len())
            .map(LabelId)
            .map_err(|_| DisplayError::CapacityExceeded {
                capacity: MAX_LABELS,
            })?;
        self.labels
            .push(Label::new(parent))
            .map_err(|_| DisplayError::CapacityExceeded { capacity: N })?;
        Ok(id)
    }

    fn style_label(&mut self, handle: LabelId, style: LabelStyle) {
        if let Some(label) = self.label_mut(handle) {
            if label.style != style {
                label.style = style;
                label.dirty = true;
            }
        }
    }

    fn set_label_text(&mut self, handle: LabelId, text: &str) {
        if let Some(label) = self.label_mut(handle) {
            label.set_text(text);
        }
    }

    fn position_label(&mut self, handle: LabelId, anchor: Anchor, offset: Point) {
        if let Some(label) = self.label_mut(handle) {
            label.anchor = anchor;
            label.offset = offset;
        }
    }

    fn label_size(&self, handle: LabelId) -> Size {
        self.labels
            .get(handle.0 as usize)
            .map(Label::size)
            .unwrap_or_else(Size::zero)
    }
}

/// A [`LabelScreen`] shared between a writer and a render task.
pub struct SharedScreen<M: RawMutex, const N: usize> {
    inner: Mutex<M, RefCell<LabelScreen<N>>>,
}

impl<M: RawMutex, const N: usize> SharedScreen<M, N> {
    pub const fn new(bounds: Rectangle, background: Rgb565) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(LabelScreen::new(bounds, background))),
        }
    }

    pub fn lock<R>(&self, f: impl FnOnce(&mut LabelScreen<N>) -> R) -> R {
        self.inner.lock(|screen| f(&mut screen.borrow_mut()))
    }

    /// Copy of a label's current text.
    pub fn text(&self, id: LabelId) -> Option<LabelText> {
        self.lock(|screen| screen.labels.get(id.0 as usize).map(|label| label.text.clone()))
    }

    /// Draw pending changes. Returns `false` when nothing changed.
    pub fn render<D: DrawTarget<Color = Rgb565>>(&self, target: &mut D) -> Result<bool, D::Error> {
        let batch = self.lock(|screen| screen.take_render_batch());
        if batch.is_empty() {
            return Ok(false);
        }

        if let Err(e) = batch.draw(target) {
            self.lock(|screen| screen.invalidate());
            return Err(e);
        }
        Ok(true)
    }
}

impl<M: RawMutex, const N: usize> LabelSurface for &SharedScreen<M, N> {
    type Handle = LabelId;

    fn create_label(&mut self, parent: Option<LabelId>) -> Result<LabelId, DisplayError> {
        self.lock(|screen| screen.create_label(parent))
    }

    fn style_label(&mut self, handle: LabelId, style: LabelStyle) {
        self.lock(|screen| screen.style_label(handle, style));
    }

    fn set_label_text(&mut self, handle: LabelId, text: &str) {
        self.lock(|screen| screen.set_label_text(handle, text));
    }

    fn position_label(&mut self, handle: LabelId, anchor: Anchor, offset: Point) {
        self.lock(|screen| screen.position_label(handle, anchor, offset));
    }

    fn label_size(&self, handle: LabelId) -> Size {
        self.lock(|screen| screen.label_size(handle))
    }
}
