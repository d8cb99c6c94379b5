//! ESP32-S3 firmware-specific modules for hygro-rs
//!
//! This crate contains the code that cannot compile on desktop targets:
//! peripheral bring-up for the ST7789 panel and the AHT20 bus, and the
//! build-time configuration overrides.

#![no_std]

pub mod config;
pub mod hardware;
