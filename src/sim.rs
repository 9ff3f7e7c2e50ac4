//! Simulated hardware for tests and the demo binary.
//!
//! Every collaborator the mission core drives has a scriptable stand-in
//! here: a byte channel with queued reads, a packet transceiver with a
//! deliverable mailbox, a power rail that records what was asked of it,
//! and a fixed-voltage battery.

use crate::hal::{BatteryMonitor, PowerControl};
use crate::link::radio::PacketTransceiver;
use crate::modem::{ByteChannel, ChannelError};
use std::collections::VecDeque;

/// Scripted byte channel: reads come from a queue of chunks, writes are
/// recorded verbatim.
#[derive(Default)]
pub struct SimChannel {
    pub incoming: VecDeque<Vec<u8>>,
    pub written: Vec<Vec<u8>>,
    pub closed: bool,
}

impl SimChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one raw chunk for a future read.
    pub fn push(&mut self, chunk: &[u8]) {
        self.incoming.push_back(chunk.to_vec());
    }

    /// Queue one CR-LF terminated line.
    pub fn push_line(&mut self, line: &str) {
        self.push(format!("{line}\r\n").as_bytes());
    }

    /// Everything written so far, as one string.
    pub fn written_text(&self) -> String {
        self.written
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }
}

impl ByteChannel for SimChannel {
    fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        Ok(self.incoming.pop_front().unwrap_or_default())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.written.push(data.to_vec());
        Ok(())
    }
}

/// Scripted packet transceiver with a one-deep receive mailbox.
#[derive(Default)]
pub struct SimTransceiver {
    pub transmitted: Vec<String>,
    pub listening: bool,
    pub asleep: bool,
    pub resets: u32,
    pub alive: bool,
    mailbox: Option<String>,
    rssi: i16,
    wedged: bool,
}

impl SimTransceiver {
    pub fn new() -> Self {
        Self {
            alive: true,
            ..Self::default()
        }
    }

    /// Place a received packet in the mailbox.
    pub fn deliver(&mut self, payload: &str, rssi: i16) {
        self.mailbox = Some(payload.to_string());
        self.rssi = rssi;
    }

    /// Make the next tick see a stuck transmitter.
    pub fn wedge(&mut self) {
        self.wedged = true;
    }
}

impl PacketTransceiver for SimTransceiver {
    fn init(&mut self) -> bool {
        self.asleep = false;
        self.alive
    }

    fn sleep(&mut self) {
        self.asleep = true;
        self.listening = false;
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.wedged = false;
    }

    fn transmit(&mut self, payload: &str) -> bool {
        if self.asleep {
            return false;
        }
        self.transmitted.push(payload.to_string());
        true
    }

    fn listen(&mut self) {
        self.listening = !self.asleep;
    }

    fn new_data(&self) -> bool {
        self.mailbox.is_some()
    }

    fn read_payload(&mut self) -> Option<String> {
        self.mailbox.take()
    }

    fn last_rssi(&self) -> i16 {
        self.rssi
    }

    fn bad_tx(&self) -> bool {
        self.wedged
    }
}

/// Records every sleep and reset; never actually blocks.
#[derive(Default)]
pub struct RecordingPower {
    pub light_sleeps: Vec<u64>,
    pub deep_sleeps: Vec<u64>,
    pub resets: u32,
}

impl RecordingPower {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PowerControl for RecordingPower {
    fn light_sleep(&mut self, ms: u64) {
        self.light_sleeps.push(ms);
    }

    fn deep_sleep(&mut self, ms: u64) {
        self.deep_sleeps.push(ms);
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

/// Always reads the same voltage.
pub struct FixedBattery(pub Option<f32>);

impl BatteryMonitor for FixedBattery {
    fn check(&mut self) -> Option<f32> {
        self.0
    }
}
