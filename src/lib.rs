//! # Drift Buoy Mission Core
//!
//! The communication and mission core of an autonomous, battery-powered
//! marine tracking buoy: GPS fix acquisition, short-burst-data (SBD)
//! satellite messaging with bounded retry/backoff, a line-of-sight LoRa
//! beacon, and a cooperative mission state machine.
//!
//! ## Features
//!
//! - **AT modem control**: line-buffered command/response handling over a
//!   half-duplex serial channel, with echo/verbosity auto-detection
//! - **SBD session state machine**: one satellite transaction per session
//!   object, poll-driven, with bounded backoff retries on failure
//! - **Checksum-framed sentences**: NMEA-style parsing and construction,
//!   shared between the GPS dialect and the buoy's own packet dialect
//! - **Mission scheduling**: software-timer driven activity loop with
//!   power-saving sleep between location reports
//! - **Single-threaded**: one cooperative tick loop, no locking, injected
//!   clock for deterministic tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use driftbuoy::MissionScheduler;
//!
//! let mut buoy = MissionScheduler::new(clock, gps, satellite, radio,
//!                                      store, power, None);
//! buoy.start();
//! loop {
//!     buoy.run();
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`mission`] - top-level activity state machine and public API
//! - [`link`] - satellite (SBD) and radio (LoRa) link drivers
//! - [`modem`] - AT command controller over a raw byte channel
//! - [`sentence`] - checksum-framed sentence codec
//! - [`nmea`] - NMEA 0183 field parsers
//! - [`gps`] - GPS receiver driver
//! - [`packet`] - buoy application packet dialect (PK001..PK007)
//! - [`timer`] - software countdown timers
//! - [`clock`] - injected time source
//! - [`storage`] - key/value persistence
//! - [`hal`] - sleep/reset and battery collaborator traits
//! - [`sim`] - simulated hardware for tests and the demo binary

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod clock;
pub mod gps;
pub mod hal;
pub mod link;
pub mod mission;
pub mod modem;
pub mod nmea;
pub mod packet;
pub mod sentence;
pub mod sim;
pub mod storage;
pub mod timer;

// Re-export main public types for convenience
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use link::{RadioLinkDriver, SatelliteLinkDriver};
pub use mission::MissionScheduler;
pub use modem::{ByteChannel, ChannelError, ModemController};
pub use sentence::{Sentence, SentenceSpec};
pub use timer::ActivityTimer;
