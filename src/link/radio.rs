//! Short-range radio beacon link.
//!
//! A thin driver over a packet transceiver: queued beacon sentences go out,
//! received packets are collected for the scheduler, and a wedged
//! transmitter gets a reset. The driver holds no protocol state beyond its
//! queues.

use crate::link::response::signal_level;
use heapless::Deque;
use tracing::{debug, warn};

/// Capacity of the outbound beacon queue. Beacons are disposable, so a full
/// queue drops the oldest entry.
const RADIO_QUEUE_DEPTH: usize = 8;

/// A LoRa-style packet radio: fire-and-forget transmit, polled receive.
pub trait PacketTransceiver {
    /// Bring the radio up. False means the hardware did not respond.
    fn init(&mut self) -> bool;

    /// Enter low-power sleep.
    fn sleep(&mut self);

    /// Hard reset after a wedged transmit.
    fn reset(&mut self);

    /// Transmit one payload. False means the transmit did not start.
    fn transmit(&mut self, payload: &str) -> bool;

    /// Enter continuous receive mode.
    fn listen(&mut self);

    /// A received packet is waiting.
    fn new_data(&self) -> bool;

    /// Take the waiting packet, if any.
    fn read_payload(&mut self) -> Option<String>;

    /// RSSI of the last received packet, in dBm.
    fn last_rssi(&self) -> i16;

    /// The last transmit never completed.
    fn bad_tx(&self) -> bool;
}

/// Beacon link driver over a [`PacketTransceiver`].
pub struct RadioLinkDriver<T: PacketTransceiver> {
    transceiver: T,
    pub enabled: bool,
    outbound: Deque<String, RADIO_QUEUE_DEPTH>,
    inbound: Vec<String>,
    /// Quantized signal level of the last received packet, 0..=5.
    signal: u8,
}

impl<T: PacketTransceiver> RadioLinkDriver<T> {
    pub fn new(transceiver: T) -> Self {
        Self {
            transceiver,
            enabled: false,
            outbound: Deque::new(),
            inbound: Vec::new(),
            signal: 0,
        }
    }

    /// Bring the radio up and start listening. False if the hardware did
    /// not respond; the driver stays disabled.
    pub fn start(&mut self) -> bool {
        if !self.transceiver.init() {
            warn!("radio transceiver did not respond");
            self.enabled = false;
            return false;
        }
        self.transceiver.listen();
        self.enabled = true;
        true
    }

    pub fn stop(&mut self) {
        self.transceiver.sleep();
        self.enabled = false;
        self.outbound.clear();
    }

    /// Queue a payload for transmission. A full queue drops the oldest
    /// beacon, never the newest.
    pub fn enqueue(&mut self, payload: &str) {
        if self.outbound.is_full() {
            warn!("radio queue full, dropping oldest beacon");
            let _ = self.outbound.pop_front();
        }
        let _ = self.outbound.push_back(payload.to_string());
    }

    /// One tick: collect received packets, recover a wedged transmitter,
    /// drain the outbound queue, return to receive.
    pub fn run(&mut self) {
        if !self.enabled {
            return;
        }

        if self.transceiver.new_data() {
            if let Some(payload) = self.transceiver.read_payload() {
                self.signal = signal_level(self.transceiver.last_rssi());
                debug!(payload, signal = self.signal, "radio packet received");
                self.inbound.push(payload);
            }
        }

        if self.transceiver.bad_tx() {
            warn!("radio transmit wedged, resetting");
            self.transceiver.reset();
            self.transceiver.listen();
        }

        let transmitted = !self.outbound.is_empty();
        while let Some(payload) = self.outbound.pop_front() {
            if !self.transceiver.transmit(&payload) {
                warn!("radio transmit refused, payload dropped");
            }
        }
        if transmitted {
            self.transceiver.listen();
        }
    }

    /// Take every packet received since the last call.
    pub fn take_inbound(&mut self) -> Vec<String> {
        std::mem::take(&mut self.inbound)
    }

    /// Quantized signal level of the last received packet, 0..=5.
    pub fn signal(&self) -> u8 {
        self.signal
    }

    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    pub fn transceiver(&self) -> &T {
        &self.transceiver
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }
}
