#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Ticker};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};

use hygro_core::app::{self, Monitor};
use hygro_core::sensors::Aht20;
use hygro_core::ui::styling::COLOR_BACKGROUND;
use hygro_core::ui::{DASHBOARD_LABELS, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, SharedScreen};
use hygro_firmware::config::monitor_config;
use hygro_firmware::hardware::{self, Panel, PanelPins, SensorBus};

/// Render period of the label screen, about 30 frames per second.
const FRAME_PERIOD_MS: u64 = 33;

type Screen = SharedScreen<CriticalSectionRawMutex, DASHBOARD_LABELS>;
type FirmwareMonitor = Monitor<SensorBus, Delay, &'static Screen, Delay>;

static SCREEN: Screen = SharedScreen::new(
    Rectangle::new(
        Point::zero(),
        Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32),
    ),
    COLOR_BACKGROUND,
);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn measurement_task(monitor: FirmwareMonitor) {
    monitor.run().await
}

#[embassy_executor::task]
async fn render_task(mut panel: Panel) {
    let mut ticker = Ticker::every(Duration::from_millis(FRAME_PERIOD_MS));
    loop {
        if let Err(e) = SCREEN.render(&mut panel) {
            error!("Render failed: {:?}", e);
        }
        ticker.next().await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let monitor_config = match monitor_config() {
        Ok(config) => config,
        Err(e) => panic!("Invalid build configuration: {}", e),
    };

    // 1. SPI bus and panel
    let panel = match hardware::init_panel(PanelPins {
        spi: peripherals.SPI2,
        sck: peripherals.GPIO4,
        mosi: peripherals.GPIO6,
        dc: peripherals.GPIO1,
        rst: peripherals.GPIO0,
        dummy_cs: peripherals.GPIO10,
    }) {
        Ok(panel) => panel,
        Err(e) => panic!("Display bring-up failed: {}", e),
    };

    // 2. Sensor bus
    let i2c = match hardware::create_i2c_bus(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9)
    {
        Ok(i2c) => i2c,
        Err(e) => panic!("Sensor bus bring-up failed: {}", e),
    };

    // 3. Sensor calibration, then the dashboard with placeholders
    let monitor = match app::bring_up(&monitor_config, Aht20::new(i2c, Delay), &SCREEN, Delay).await
    {
        Ok(monitor) => monitor,
        Err(e) => panic!("Startup failed: {}", e),
    };

    // 4. Workers
    spawner.spawn(render_task(panel).expect("render task"));
    spawner.spawn(measurement_task(monitor).expect("measurement task"));
    info!("All tasks spawned!");

    loop {
        embassy_time::Timer::after(Duration::from_secs(60)).await;
    }
}
