//! Peripheral bring-up for the hygro board
//!
//! Wiring: ST7789 240x240 panel on SPI2 (SCK GPIO4, MOSI GPIO6, DC GPIO1,
//! RST GPIO0, no CS line) and the AHT20 on I2C0 (SDA GPIO8, SCL GPIO9).

use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::{Async, Blocking};
use hygro_core::ui::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use log::info;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, Orientation};
use mipidsi::{Builder as MipidsiBuilder, Display};
use static_cell::StaticCell;
use thiserror_no_std::Error;

/// The panel's 240x240 window starts 80 rows into the controller's 240x320
/// frame memory.
const PANEL_OFFSET_X: u16 = 0;
const PANEL_OFFSET_Y: u16 = 80;

const SPI_BATCH_BYTES: usize = 512;

pub type SensorBus = I2c<'static, Async>;

pub type PanelSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;

pub type Panel = Display<SpiInterface<'static, PanelSpi, Output<'static>>, ST7789, Output<'static>>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    #[error("SPI bus configuration rejected")]
    SpiConfig,
    #[error("I2C bus configuration rejected")]
    I2cConfig,
    #[error("ST7789 did not initialize")]
    PanelInit,
}

/// Pins and peripherals the panel needs.
pub struct PanelPins {
    pub spi: esp_hal::peripherals::SPI2<'static>,
    pub sck: esp_hal::peripherals::GPIO4<'static>,
    pub mosi: esp_hal::peripherals::GPIO6<'static>,
    pub dc: esp_hal::peripherals::GPIO1<'static>,
    pub rst: esp_hal::peripherals::GPIO0<'static>,
    /// Unconnected, drives the chip select `ExclusiveDevice` requires.
    pub dummy_cs: esp_hal::peripherals::GPIO10<'static>,
}

/// Bring up SPI2 and the ST7789: inverted colors, mirrored on both axes.
pub fn init_panel(pins: PanelPins) -> Result<Panel, HardwareError> {
    // 1. SPI bus, mode 3 at 40 MHz
    let spi_bus = Spi::new(
        pins.spi,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(40))
            .with_mode(Mode::_3),
    )
    .map_err(|_| HardwareError::SpiConfig)?
    .with_sck(pins.sck)
    .with_mosi(pins.mosi);

    // 2. Dummy CS, the panel has no chip select line
    let cs = Output::new(pins.dummy_cs, Level::High, OutputConfig::default());
    let spi_device =
        ExclusiveDevice::new_no_delay(spi_bus, cs).map_err(|_| HardwareError::SpiConfig)?;

    // 3. DC and reset lines
    let dc = Output::new(pins.dc, Level::Low, OutputConfig::default());
    let rst = Output::new(pins.rst, Level::High, OutputConfig::default());

    // 4. Batching buffer, lives as long as the panel
    static SPI_BUFFER: StaticCell<[u8; SPI_BATCH_BYTES]> = StaticCell::new();
    let buffer = SPI_BUFFER.init([0; SPI_BATCH_BYTES]);
    let di = SpiInterface::new(spi_device, dc, buffer);

    // 5. Controller init
    let panel = MipidsiBuilder::new(ST7789, di)
        .display_size(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
        .display_offset(PANEL_OFFSET_X, PANEL_OFFSET_Y)
        .invert_colors(ColorInversion::Inverted)
        .orientation(Orientation::new().flip_horizontal().flip_vertical())
        .reset_pin(rst)
        .init(&mut embassy_time::Delay)
        .map_err(|_| HardwareError::PanelInit)?;

    info!("Display initialized");
    Ok(panel)
}

/// I2C0 at 100 kHz for the AHT20.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO8<'static>,
    scl: esp_hal::peripherals::GPIO9<'static>,
) -> Result<SensorBus, HardwareError> {
    let bus = I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .map_err(|_| HardwareError::I2cConfig)?
    .with_sda(sda)
    .with_scl(scl)
    .into_async();

    info!("I2C bus ready");
    Ok(bus)
}
