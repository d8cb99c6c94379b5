//! Desktop simulator for the hygro-rs temperature/humidity display.
//!
//! Runs the hygro-core bring-up and sampling loop against a synthetic AHT20
//! and renders the dashboard in an SDL2 window via
//! `embedded-graphics-simulator`.
//!
//! Configuration is read from the TOML file given as the first argument, or
//! `hygro.toml` in the working directory when present. Missing keys keep
//! their defaults.
//!
//! # Key bindings
//!
//! | Key       | Action |
//! |-----------|--------|
//! | Q / Esc   | Quit   |

mod synthetic;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{error, info};

use hygro_core::app;
use hygro_core::config::MonitorConfig;
use hygro_core::sensors::Aht20;
use hygro_core::ui::styling::COLOR_BACKGROUND;
use hygro_core::ui::{DASHBOARD_LABELS, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, SharedScreen};

use synthetic::{StdDelay, SyntheticAht20};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Every n-th synthetic frame carries a bad checksum.
const CORRUPT_EVERY: u32 = 7;

const DEFAULT_CONFIG_PATH: &str = "hygro.toml";

static SCREEN: SharedScreen<CriticalSectionRawMutex, DASHBOARD_LABELS> = SharedScreen::new(
    Rectangle::new(
        Point::zero(),
        Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32),
    ),
    COLOR_BACKGROUND,
);

/// Load the monitor configuration, falling back to defaults when no file
/// is given and `hygro.toml` does not exist.
fn load_config() -> Result<MonitorConfig, Box<dyn std::error::Error>> {
    let path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !path.exists() {
                info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                return Ok(MonitorConfig::default());
            }
            path
        }
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let config = toml::from_str(&text)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn main() {
    env_logger::init();
    info!("Starting hygro-rs simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Bring-up runs to completion before the window opens, as on the device
    let sensor = Aht20::new(SyntheticAht20::new(CORRUPT_EVERY), StdDelay);
    let monitor = match block_on(app::bring_up(&config, sensor, &SCREEN, StdDelay)) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let _sampling = std::thread::Builder::new()
        .name("sampling".into())
        .spawn(move || {
            block_on(monitor.run());
        })
        .unwrap_or_else(|e| {
            error!("Cannot start sampling thread: {}", e);
            std::process::exit(1);
        });

    // SDL2 display and window
    let mut display = SimulatorDisplay::<Rgb565>::new(Size::new(
        DISPLAY_WIDTH_PX as u32,
        DISPLAY_HEIGHT_PX as u32,
    ));

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Hygro Simulator", &output_settings);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    let _ = SCREEN.render(&mut display);
    window.update(&display);

    'running: loop {
        let frame_start = Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. }
                    if keycode == Keycode::Q || keycode == Keycode::Escape =>
                {
                    break 'running;
                }
                _ => {}
            }
        }

        if let Err(e) = SCREEN.render(&mut display) {
            error!("Draw error: {:?}", e);
        }

        // Keep pumping SDL even when nothing changed
        window.update(&display);

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!("Simulator exiting");
}
