//! Hardware-independent core library for hygro-rs
//!
//! This crate contains all platform-agnostic logic for the hygro display:
//! the AHT20 protocol driver, the periodic sampling loop, the retained label
//! screen and the dashboard that maps readings onto it.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod app;
pub mod config;
pub mod sampling;
pub mod sensors;
pub mod ui;
