//! Temperature/humidity dashboard
//!
//! Four labels stacked around the screen center: a title and a value for
//! each quantity. The values show `--` until the first accepted reading.

use core::fmt::Write;

use embedded_graphics::prelude::*;
use log::info;

use super::labels::{Anchor, DisplayError, LabelSurface};
use super::styling::LabelStyle;
use crate::sampling::Presenter;
use crate::sensors::SensorReading;

pub const TEMPERATURE_TITLE: &str = "Temperature";
pub const HUMIDITY_TITLE: &str = "Relative Humidity";
pub const PLACEHOLDER: &str = "--";

/// Handles of the four dashboard labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLabelHandles<H> {
    pub temperature_title: H,
    pub temperature_value: H,
    pub humidity_title: H,
    pub humidity_value: H,
}

type ValueText = heapless::String<16>;

/// `23.4`, no unit.
pub fn format_temperature(temperature: f32) -> ValueText {
    let mut text = ValueText::new();
    // 16 bytes always fit an f32 with one decimal in the sensor range
    let _ = write!(text, "{:.1}", temperature);
    text
}

/// `55.0%`
pub fn format_humidity(relative_humidity: f32) -> ValueText {
    let mut text = ValueText::new();
    let _ = write!(text, "{:.1}%", relative_humidity);
    text
}

pub struct Dashboard<S: LabelSurface> {
    surface: S,
    handles: DisplayLabelHandles<S::Handle>,
}

impl<S: LabelSurface> Dashboard<S> {
    /// Create, style and place the labels, then write titles and
    /// placeholders.
    pub fn build(mut surface: S) -> Result<Self, DisplayError> {
        let handles = DisplayLabelHandles {
            temperature_title: surface.create_label(None)?,
            temperature_value: surface.create_label(None)?,
            humidity_title: surface.create_label(None)?,
            humidity_value: surface.create_label(None)?,
        };

        let title = LabelStyle::title();
        let value = LabelStyle::value();
        surface.style_label(handles.temperature_title, title);
        surface.style_label(handles.humidity_title, title);
        surface.style_label(handles.temperature_value, value);
        surface.style_label(handles.humidity_value, value);

        surface.set_label_text(handles.temperature_title, TEMPERATURE_TITLE);
        surface.set_label_text(handles.humidity_title, HUMIDITY_TITLE);
        surface.set_label_text(handles.temperature_value, PLACEHOLDER);
        surface.set_label_text(handles.humidity_value, PLACEHOLDER);

        // Heights do not depend on the text, so measuring once is enough.
        let title_height = surface.label_size(handles.temperature_title).height as i32;
        let value_height = surface.label_size(handles.temperature_value).height as i32;

        surface.position_label(
            handles.temperature_title,
            Anchor::Center,
            Point::new(0, -value_height / 2 - title_height / 2),
        );
        surface.position_label(
            handles.temperature_value,
            Anchor::Center,
            Point::new(0, -value_height / 2),
        );
        surface.position_label(
            handles.humidity_title,
            Anchor::Center,
            Point::new(0, title_height / 2),
        );
        surface.position_label(
            handles.humidity_value,
            Anchor::Center,
            Point::new(0, title_height / 2 + value_height / 2),
        );

        info!("Dashboard ready");
        Ok(Self { surface, handles })
    }

    pub fn handles(&self) -> &DisplayLabelHandles<S::Handle> {
        &self.handles
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Write a reading into the value labels.
    ///
    /// Writing the same reading twice leaves the labels untouched.
    pub fn update_display(&mut self, reading: &SensorReading) {
        self.surface.set_label_text(
            self.handles.temperature_value,
            &format_temperature(reading.temperature),
        );
        self.surface.set_label_text(
            self.handles.humidity_value,
            &format_humidity(reading.relative_humidity),
        );
    }
}

impl<S: LabelSurface> Presenter for Dashboard<S> {
    fn present(&mut self, reading: &SensorReading) {
        self.update_display(reading);
    }
}
