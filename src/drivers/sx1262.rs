//! SX1262 LoRa transceiver driver.
//!
//! Generic over `embedded-hal` 1.0 traits so the same code drives the chip
//! through `esp-idf-hal`'s `SpiDeviceDriver` / `PinDriver` on hardware and
//! through recording fakes on the host.
//!
//! Transmit completion is not polled over SPI: DIO1 is routed to the
//! TxDone IRQ and its GPIO interrupt raises the [`TxDoneFlag`] handed in at
//! construction (on hardware, [`RADIO_TX_DONE`](crate::telemetry::RADIO_TX_DONE)).
//!
//! ```text
//!   begin            reset ─▶ STDBY_RC ─▶ GetStatus check ─▶ LoRa packet type
//!   set_*            cached; modulation re-sent on every change
//!   start_transmit   ClearIrq ─▶ PacketParams ─▶ WriteBuffer ─▶ SetTx
//!   finish_transmit  ClearIrq ─▶ STDBY_RC
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{Operation, SpiDevice};
use log::{debug, info};

use crate::app::ports::RadioPort;
use crate::error::RadioError;
use crate::telemetry::TxDoneFlag;

// ── Opcodes ───────────────────────────────────────────────────

const OP_SET_STANDBY: u8 = 0x80;
const OP_SET_PACKET_TYPE: u8 = 0x8A;
const OP_SET_RF_FREQUENCY: u8 = 0x86;
const OP_SET_MODULATION_PARAMS: u8 = 0x8B;
const OP_SET_PACKET_PARAMS: u8 = 0x8C;
const OP_SET_PA_CONFIG: u8 = 0x95;
const OP_SET_TX_PARAMS: u8 = 0x8E;
const OP_SET_BUFFER_BASE: u8 = 0x8F;
const OP_SET_DIO_IRQ_PARAMS: u8 = 0x08;
const OP_SET_REGULATOR_MODE: u8 = 0x96;
const OP_CLEAR_IRQ_STATUS: u8 = 0x02;
const OP_WRITE_BUFFER: u8 = 0x0E;
const OP_SET_TX: u8 = 0x83;
const OP_GET_STATUS: u8 = 0xC0;

const STDBY_RC: u8 = 0x00;
const PACKET_TYPE_LORA: u8 = 0x01;
const REGULATOR_DC_DC: u8 = 0x01;
const IRQ_TX_DONE: u16 = 0x0001;
const IRQ_TIMEOUT: u16 = 0x0200;
const IRQ_ALL: u16 = 0x03FF;
/// GetStatus chip-mode field value for STDBY_RC.
const CHIP_MODE_STDBY_RC: u8 = 0x2;
const RAMP_200_US: u8 = 0x04;
/// SX1262 high-power PA: 22 dBm table entry.
const PA_CONFIG_SX1262: [u8; 4] = [0x04, 0x07, 0x00, 0x01];
const XTAL_HZ: u64 = 32_000_000;

/// The data buffer holds one packet of at most this many bytes.
pub const MAX_PACKET_LEN: usize = 255;

/// Driver status codes (RadioLib numbering).
pub const ERR_SPI_CMD_TIMEOUT: i16 = -705;
pub const ERR_SPI_CMD_FAILED: i16 = -706;

/// BUSY is polled every 10 µs for at most this many rounds.
const BUSY_POLLS: u32 = 1_000;

/// LoRa bandwidth register codes, indexed alongside their kHz value.
const BANDWIDTHS: [(f32, u8); 10] = [
    (7.8, 0x00),
    (10.4, 0x08),
    (15.6, 0x01),
    (20.8, 0x09),
    (31.25, 0x02),
    (41.7, 0x0A),
    (62.5, 0x03),
    (125.0, 0x04),
    (250.0, 0x05),
    (500.0, 0x06),
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct Modulation {
    spreading_factor: u8,
    bandwidth_khz: f32,
    bandwidth_code: u8,
    /// 1..=4 for 4/5..4/8
    coding_rate_code: u8,
}

impl Modulation {
    /// Symbol time above 16 ms needs low-data-rate optimisation.
    fn low_data_rate(&self) -> bool {
        f32::from(1u16 << self.spreading_factor) / self.bandwidth_khz >= 16.0
    }

    fn params(&self) -> [u8; 4] {
        [
            self.spreading_factor,
            self.bandwidth_code,
            self.coding_rate_code,
            u8::from(self.low_data_rate()),
        ]
    }
}

impl Default for Modulation {
    fn default() -> Self {
        Self {
            spreading_factor: 7,
            bandwidth_khz: 125.0,
            bandwidth_code: 0x04,
            coding_rate_code: 0x01,
        }
    }
}

pub struct Sx1262<SPI, RST, BUSY, D> {
    spi: SPI,
    reset: RST,
    busy: BUSY,
    delay: D,
    done: &'static TxDoneFlag,
    modulation: Modulation,
    preamble_len: u16,
    started: bool,
}

impl<SPI, RST, BUSY, D> Sx1262<SPI, RST, BUSY, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, reset: RST, busy: BUSY, delay: D, done: &'static TxDoneFlag) -> Self {
        Self {
            spi,
            reset,
            busy,
            delay,
            done,
            modulation: Modulation::default(),
            preamble_len: 8,
            started: false,
        }
    }

    pub fn spi(&self) -> &SPI {
        &self.spi
    }

    fn require_started(&self) -> Result<(), RadioError> {
        if self.started {
            Ok(())
        } else {
            Err(RadioError::ChipNotFound)
        }
    }

    fn wait_busy(&mut self) -> Result<(), RadioError> {
        for _ in 0..BUSY_POLLS {
            let busy = self
                .busy
                .is_high()
                .map_err(|_| RadioError::Driver(ERR_SPI_CMD_FAILED))?;
            if !busy {
                return Ok(());
            }
            self.delay.delay_us(10);
        }
        Err(RadioError::Driver(ERR_SPI_CMD_TIMEOUT))
    }

    fn command(&mut self, opcode: u8, params: &[u8]) -> Result<(), RadioError> {
        self.wait_busy()?;
        self.spi
            .transaction(&mut [Operation::Write(&[opcode]), Operation::Write(params)])
            .map_err(|_| RadioError::Driver(ERR_SPI_CMD_FAILED))
    }

    fn status(&mut self) -> Result<u8, RadioError> {
        self.wait_busy()?;
        let mut buf = [OP_GET_STATUS, 0x00];
        self.spi
            .transaction(&mut [Operation::TransferInPlace(&mut buf)])
            .map_err(|_| RadioError::Driver(ERR_SPI_CMD_FAILED))?;
        Ok(buf[1])
    }

    fn write_modulation(&mut self) -> Result<(), RadioError> {
        let params = self.modulation.params();
        self.command(OP_SET_MODULATION_PARAMS, &params)
    }

    fn clear_irq(&mut self) -> Result<(), RadioError> {
        self.command(OP_CLEAR_IRQ_STATUS, &IRQ_ALL.to_be_bytes())
    }
}

impl<SPI, RST, BUSY, D> RadioPort for Sx1262<SPI, RST, BUSY, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    fn begin(&mut self) -> Result<(), RadioError> {
        self.started = false;
        self.reset
            .set_low()
            .map_err(|_| RadioError::Driver(ERR_SPI_CMD_FAILED))?;
        self.delay.delay_ms(1);
        self.reset
            .set_high()
            .map_err(|_| RadioError::Driver(ERR_SPI_CMD_FAILED))?;
        self.delay.delay_ms(10);

        self.command(OP_SET_STANDBY, &[STDBY_RC])?;
        let status = self.status()?;
        let mode = (status >> 4) & 0x07;
        if mode != CHIP_MODE_STDBY_RC {
            debug!("SX1262: status 0x{:02X} after reset", status);
            return Err(RadioError::ChipNotFound);
        }

        self.command(OP_SET_PACKET_TYPE, &[PACKET_TYPE_LORA])?;
        self.command(OP_SET_REGULATOR_MODE, &[REGULATOR_DC_DC])?;
        self.command(OP_SET_BUFFER_BASE, &[0x00, 0x00])?;

        // Same mask enabled and routed to DIO1; DIO2/DIO3 unused.
        let [hi, lo] = (IRQ_TX_DONE | IRQ_TIMEOUT).to_be_bytes();
        self.command(OP_SET_DIO_IRQ_PARAMS, &[hi, lo, hi, lo, 0, 0, 0, 0])?;
        self.clear_irq()?;
        self.started = true;
        info!("SX1262: found, standby");
        Ok(())
    }

    fn set_frequency(&mut self, mhz: f32) -> Result<(), RadioError> {
        self.require_started()?;
        if !(150.0..=960.0).contains(&mhz) {
            return Err(RadioError::InvalidFrequency);
        }
        let hz = (f64::from(mhz) * 1_000_000.0) as u64;
        let steps = ((hz << 25) / XTAL_HZ) as u32;
        self.command(OP_SET_RF_FREQUENCY, &steps.to_be_bytes())
    }

    fn set_bandwidth(&mut self, khz: f32) -> Result<(), RadioError> {
        self.require_started()?;
        let (bw, code) = BANDWIDTHS
            .iter()
            .copied()
            .find(|(bw, _)| (bw - khz).abs() < 0.01)
            .ok_or(RadioError::InvalidBandwidth)?;
        self.modulation.bandwidth_khz = bw;
        self.modulation.bandwidth_code = code;
        self.write_modulation()
    }

    fn set_spreading_factor(&mut self, sf: u8) -> Result<(), RadioError> {
        self.require_started()?;
        if !(5..=12).contains(&sf) {
            return Err(RadioError::InvalidSpreadingFactor);
        }
        self.modulation.spreading_factor = sf;
        self.write_modulation()
    }

    fn set_coding_rate(&mut self, denominator: u8) -> Result<(), RadioError> {
        self.require_started()?;
        if !(5..=8).contains(&denominator) {
            return Err(RadioError::InvalidCodingRate);
        }
        self.modulation.coding_rate_code = denominator - 4;
        self.write_modulation()
    }

    fn set_output_power(&mut self, dbm: i8) -> Result<(), RadioError> {
        self.require_started()?;
        if !(-9..=22).contains(&dbm) {
            return Err(RadioError::InvalidOutputPower);
        }
        self.command(OP_SET_PA_CONFIG, &PA_CONFIG_SX1262)?;
        self.command(OP_SET_TX_PARAMS, &[dbm as u8, RAMP_200_US])
    }

    fn set_preamble_length(&mut self, symbols: u16) -> Result<(), RadioError> {
        self.require_started()?;
        if symbols == 0 {
            return Err(RadioError::InvalidPreambleLength);
        }
        self.preamble_len = symbols;
        Ok(())
    }

    fn start_transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.require_started()?;
        if payload.len() > MAX_PACKET_LEN {
            return Err(RadioError::PacketTooLong);
        }
        self.clear_irq()?;

        let [pre_hi, pre_lo] = self.preamble_len.to_be_bytes();
        // Explicit header, CRC on, standard IQ.
        self.command(
            OP_SET_PACKET_PARAMS,
            &[pre_hi, pre_lo, 0x00, payload.len() as u8, 0x01, 0x00],
        )?;

        self.wait_busy()?;
        self.spi
            .transaction(&mut [
                Operation::Write(&[OP_WRITE_BUFFER, 0x00]),
                Operation::Write(payload),
            ])
            .map_err(|_| RadioError::Driver(ERR_SPI_CMD_FAILED))?;

        // Timeout 0: stay in TX until the packet is out.
        self.command(OP_SET_TX, &[0x00, 0x00, 0x00])
    }

    fn tx_done(&self) -> &TxDoneFlag {
        self.done
    }

    fn finish_transmit(&mut self) -> Result<(), RadioError> {
        self.clear_irq()?;
        self.command(OP_SET_STANDBY, &[STDBY_RC])
    }
}
