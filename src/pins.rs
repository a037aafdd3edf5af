//! GPIO / peripheral pin assignments for the FireNode board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Alarm outputs (active HIGH, driven LOW at boot)
// ---------------------------------------------------------------------------

/// Fire-class alarm indicator.
pub const FIRE_ALARM_GPIO: i32 = 25;
/// Ambient-air-class alarm indicator.
pub const AIR_ALARM_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// Power
// ---------------------------------------------------------------------------

/// Sensor 3V3 rail enable.  HIGH = powered.
pub const SENSOR_RAIL_GPIO: i32 = 32;

// ---------------------------------------------------------------------------
// LoRa transceiver (SX1262 on SPI)
// ---------------------------------------------------------------------------

/// VSPI bus.
pub const RADIO_SCK_GPIO: i32 = 18;
pub const RADIO_MOSI_GPIO: i32 = 23;
pub const RADIO_MISO_GPIO: i32 = 19;
pub const RADIO_NSS_GPIO: i32 = 5;
/// Transmit-complete interrupt line.
pub const RADIO_DIO1_GPIO: i32 = 2;
pub const RADIO_NRST_GPIO: i32 = 14;
pub const RADIO_BUSY_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// I²C bus (gas sensor)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// BME68x secondary address (SDO high).
pub const GAS_SENSOR_I2C_ADDR: u8 = 0x77;
