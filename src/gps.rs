//! GPS receiver driver.
//!
//! Streams NMEA sentences off a byte channel and folds the parsed fields
//! into one current [`GpsState`]. Values stay in receiver text form
//! (`3745.7876`, `212200.00`); downstream formatting decides how much of
//! them to keep.

use crate::clock::SharedClock;
use crate::modem::{ByteChannel, ChannelError};
use crate::nmea::{self, FieldMap};
use crate::sentence::{Sentence, SentenceSpec, SentenceStream};
use tracing::{debug, warn};

/// Current position, course and fix status, as last reported.
#[derive(Debug, Clone, Default)]
pub struct GpsState {
    pub latitude: String,
    pub ns: String,
    pub longitude: String,
    pub ew: String,
    pub utc: String,
    pub ground_speed: String,
    pub t_course: String,
    /// GGA fix quality was nonzero in the last fix sentence.
    pub fix: bool,
    /// GSA fix mode: "1" no fix, "2" 2D, "3" 3D.
    pub fix_mode: String,
    pub sats_used: u32,
}

impl GpsState {
    /// A complete position has been captured at some point.
    pub fn has_position(&self) -> bool {
        !self.latitude.is_empty() && !self.longitude.is_empty() && !self.utc.is_empty()
    }

    /// Speed over ground and true course have both been reported.
    pub fn has_course(&self) -> bool {
        !self.ground_speed.is_empty() && !self.t_course.is_empty()
    }

    /// Some fix-quality report has arrived, from either GGA or GSA.
    pub fn has_signal(&self) -> bool {
        self.fix || !self.fix_mode.is_empty()
    }
}

/// Driver over the receiver's serial output.
pub struct GpsReceiver<C: ByteChannel> {
    channel: C,
    clock: SharedClock,
    stream: SentenceStream,
    spec: SentenceSpec,
    pub state: GpsState,
    /// No complete fix yet since the last start.
    pub wait_for_firstfix: bool,
    /// Last moment the receiver reported any fix at all.
    pub last_sat_time: u64,
    /// When the current acquisition began; lets the scheduler give up.
    pub start_time: u64,
    running: bool,
}

impl<C: ByteChannel> GpsReceiver<C> {
    pub fn new(channel: C, clock: SharedClock) -> Self {
        Self {
            channel,
            clock,
            stream: SentenceStream::new(),
            spec: SentenceSpec::default(),
            state: GpsState::default(),
            wait_for_firstfix: true,
            last_sat_time: 0,
            start_time: 0,
            running: false,
        }
    }

    /// Begin an acquisition. Stale buffered bytes are discarded so the fix
    /// comes from fresh sentences.
    pub fn start(&mut self) {
        self.stream.clear();
        self.wait_for_firstfix = true;
        self.start_time = self.clock.now();
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// A usable fix is current: position captured and still tracking.
    pub fn has_fix(&self) -> bool {
        !self.wait_for_firstfix && self.state.has_position()
    }

    /// One tick: drain the channel and fold every complete sentence in.
    pub fn run(&mut self) -> Result<(), ChannelError> {
        if !self.running {
            return Ok(());
        }
        let raw = self.channel.read()?;
        self.stream.feed(&raw);

        while let Some(text) = self.stream.next_terminated(&self.spec) {
            let sentence = Sentence::parse(&text, &self.spec);
            if !sentence.valid {
                debug!(text, "dropping invalid sentence");
                continue;
            }
            match nmea::parse_fields(&sentence, &self.spec) {
                Some(map) => self.apply(&map),
                None => warn!(pkt_type = sentence.pkt_type, "unrecognized sentence type"),
            }
        }
        Ok(())
    }

    /// Fold one sentence's fields into the state.
    ///
    /// A position updates only when every part of it arrived together; a
    /// half-empty sentence never tears an older complete fix. Course and
    /// speed always overwrite, stale values being worse than zero ones.
    fn apply(&mut self, map: &FieldMap) {
        let position: Vec<&String> = ["latitude", "NS", "longitude", "EW", "utc"]
            .iter()
            .filter_map(|key| map.get(*key))
            .collect();
        if position.len() == 5 {
            self.state.latitude = position[0].clone();
            self.state.ns = position[1].clone();
            self.state.longitude = position[2].clone();
            self.state.ew = position[3].clone();
            self.state.utc = position[4].clone();
            if self.wait_for_firstfix {
                debug!(lat = %self.state.latitude, lon = %self.state.longitude, "first fix");
            }
            self.wait_for_firstfix = false;
            self.last_sat_time = self.clock.now();
        }

        if let Some(fix) = map.get("fix") {
            self.state.fix = fix != "0";
            if self.state.fix {
                self.last_sat_time = self.clock.now();
            }
        }
        if let Some(mode) = map.get("fix_mode2") {
            self.state.fix_mode = mode.clone();
            if mode != "1" {
                self.last_sat_time = self.clock.now();
            }
        }
        if let Some(sats) = map.get("sats_used") {
            self.state.sats_used = sats.parse().unwrap_or(0);
        }

        if let Some(course) = map.get("t_course") {
            self.state.t_course = course.clone();
        }
        if let Some(speed) = map.get("ground_speed") {
            self.state.ground_speed = speed.clone();
        }
    }
}
