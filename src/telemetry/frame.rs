//! Receiver-side frame decoder.
//!
//! The ground station bridges its LoRa receiver to a serial port.  Frames on
//! that stream look like
//!
//! ```text
//! DATA <temperature> <humidity> <fire-risk%> ENDATA
//! ```
//!
//! and may be preceded by arbitrary noise, including the bridge's own log
//! lines.  The decoder keeps a sliding window over the last
//! [`MAX_FRAME_LEN`] bytes and yields one [`FireReading`] per well-formed
//! frame.  Noise is never counted as a drop: only a window that ends in
//! `ENDATA` but does not parse is.

use log::warn;
use serde::{Deserialize, Serialize};

/// Window size; a frame longer than this can never decode.
pub const MAX_FRAME_LEN: usize = 128;

const START_TOKEN: &str = "DATA";
const END_TOKEN: &str = "ENDATA";

/// How many readings the history keeps.
pub const HISTORY_LEN: usize = 10;

/// One decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireReading {
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub fire_risk_percent: f32,
}

/// Streaming `DATA … ENDATA` decoder.
pub struct FrameDecoder {
    window: heapless::Deque<u8, MAX_FRAME_LEN>,
    dropped: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            window: heapless::Deque::new(),
            dropped: 0,
        }
    }

    /// Feed one byte.  Returns a reading when it completes a valid frame.
    pub fn push_byte(&mut self, byte: u8) -> Option<FireReading> {
        if self.window.is_full() {
            self.window.pop_front();
        }
        // Room was made above
        let _ = self.window.push_back(byte);

        if !self.ends_with_end_token() {
            return None;
        }

        let frame: heapless::Vec<u8, MAX_FRAME_LEN> = self.window.iter().copied().collect();
        self.window.clear();
        let reading = parse_frame(&frame);
        if reading.is_none() {
            warn!("FrameDecoder: malformed frame dropped");
            self.dropped += 1;
        }
        reading
    }

    fn ends_with_end_token(&self) -> bool {
        self.window.len() >= END_TOKEN.len()
            && self
                .window
                .iter()
                .copied()
                .rev()
                .take(END_TOKEN.len())
                .eq(END_TOKEN.bytes().rev())
    }

    /// Feed a chunk, recording every decoded frame into `history`.
    /// Returns the number of frames decoded.
    pub fn feed(&mut self, data: &[u8], history: &mut ReadingHistory) -> usize {
        let mut decoded = 0;
        for &b in data {
            if let Some(reading) = self.push_byte(b) {
                history.push(reading);
                decoded += 1;
            }
        }
        decoded
    }

    /// Frames discarded so far.  Only windows ending in `ENDATA` count.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

/// Parse a buffer ending in `ENDATA`.  The frame starts at the last `DATA`
/// token; anything before it is noise.
fn parse_frame(buf: &[u8]) -> Option<FireReading> {
    let tokens: heapless::Vec<&[u8], 64> = buf
        .split(u8::is_ascii_whitespace)
        .filter(|t| !t.is_empty())
        .take(64)
        .collect();
    let start = tokens.iter().rposition(|t| *t == START_TOKEN.as_bytes())?;
    let frame = &tokens[start..];
    if frame.len() != 5 || frame[4] != END_TOKEN.as_bytes() {
        return None;
    }
    Some(FireReading {
        temperature_c: parse_field(frame[1])?,
        humidity_percent: parse_field(frame[2])?,
        fire_risk_percent: parse_field(frame[3])?,
    })
}

fn parse_field(token: &[u8]) -> Option<f32> {
    core::str::from_utf8(token).ok()?.parse().ok()
}

// ═══════════════════════════════════════════════════════════════
//  History
// ═══════════════════════════════════════════════════════════════

/// The most recent readings, oldest evicted first.
#[derive(Default)]
pub struct ReadingHistory {
    readings: heapless::Deque<FireReading, HISTORY_LEN>,
}

impl ReadingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reading: FireReading) {
        if self.readings.is_full() {
            self.readings.pop_front();
        }
        // Room was made above
        let _ = self.readings.push_back(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn latest(&self) -> Option<&FireReading> {
        self.readings.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FireReading> {
        self.readings.iter()
    }

    /// Oldest-first JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let items: Vec<&FireReading> = self.readings.iter().collect();
        serde_json::to_string(&items)
    }
}
