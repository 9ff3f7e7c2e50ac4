//! Mission scheduler: the buoy's top-level activity state machine.
//!
//! One cooperative tick loop drives every driver in a fixed order, then
//! advances the current [`Activity`]. The cycle is: wait out the report
//! interval, acquire a full fix, compose and transmit a location
//! report, shut the receiver down, go back to waiting. A satellite-
//! visibility watchdog cuts across all of it: when neither the GPS nor the
//! modem has seen the sky for a whole window, everything stops and the
//! device sleeps it off.

use crate::clock::SharedClock;
use crate::gps::{GpsReceiver, GpsState};
use crate::hal::{BatteryMonitor, PowerControl};
use crate::link::radio::{PacketTransceiver, RadioLinkDriver};
use crate::link::satellite::SatelliteLinkDriver;
use crate::modem::ByteChannel;
use crate::packet::{self, BuoyCommand};
use crate::sentence::{Sentence, SentenceSpec};
use crate::storage::{self, KvStore};
use crate::timer::ActivityTimer;
use tracing::{debug, info, warn};

/// Seconds between location reports when nothing is stored.
const DEFAULT_REPORT_INTERVAL_S: u64 = 600;
/// Satellite-visibility watchdog window when nothing is stored.
const DEFAULT_SAT_VIEW_S: u64 = 3600;
/// Beacon transmission period.
const BEACON_PERIOD_S: u64 = 7;
/// Give up on a fix after this long and wait for the next interval.
const GPS_GIVEUP_S: u64 = 900;
/// Do not bother sleeping for less than this.
const SLEEP_MIN_S: u64 = 30;
/// Link restarts before the scheduler gives up and reboots the device.
const MAX_LINK_FAULTS: u32 = 3;

/// What the scheduler is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Waiting out the report interval.
    Idle,
    /// GPS running, no usable fix yet.
    AcquireFix,
    /// Fix in hand, waiting for signal and course data to complete it.
    TrackFix,
    /// Building the location report.
    ComposeUpdate,
    /// Report handed to the satellite link.
    Transmit,
    /// Waiting for the satellite link to go quiet.
    AwaitTransmit,
    /// Tearing down the receiver after a cycle.
    StopLink,
    /// Satellite watchdog fired; sleeping it off.
    LostSatellite,
}

/// Sleep policy between reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepMode {
    Off,
    Light,
    Deep,
}

impl SleepMode {
    fn from_store(store: &impl KvStore) -> Self {
        match store.get(storage::KEY_SLEEPMODE).as_deref() {
            Some("off") => Self::Off,
            Some("deep") => Self::Deep,
            _ => Self::Light,
        }
    }
}

/// Top-level scheduler owning every driver.
pub struct MissionScheduler<G, S, T, K, P>
where
    G: ByteChannel,
    S: ByteChannel,
    T: PacketTransceiver,
    K: KvStore,
    P: PowerControl,
{
    clock: SharedClock,
    spec: SentenceSpec,
    pub gps: GpsReceiver<G>,
    pub satellite: SatelliteLinkDriver<S>,
    pub radio: RadioLinkDriver<T>,
    pub store: K,
    pub power: P,
    battery: Option<Box<dyn BatteryMonitor>>,

    pub activity: Activity,
    pub beacon_on: bool,
    sleep_mode: SleepMode,
    loc_send: ActivityTimer,
    sat_view: ActivityTimer,
    beacon: ActivityTimer,
    last_sat_seen: u64,
    link_faults: u32,
}

impl<G, S, T, K, P> MissionScheduler<G, S, T, K, P>
where
    G: ByteChannel,
    S: ByteChannel,
    T: PacketTransceiver,
    K: KvStore,
    P: PowerControl,
{
    pub fn new(
        clock: SharedClock,
        gps: GpsReceiver<G>,
        satellite: SatelliteLinkDriver<S>,
        radio: RadioLinkDriver<T>,
        store: K,
        power: P,
        battery: Option<Box<dyn BatteryMonitor>>,
    ) -> Self {
        Self {
            spec: SentenceSpec::default(),
            gps,
            satellite,
            radio,
            power,
            battery,
            activity: Activity::Idle,
            beacon_on: false,
            sleep_mode: SleepMode::from_store(&store),
            loc_send: ActivityTimer::new("loc_send", clock.clone(), DEFAULT_REPORT_INTERVAL_S),
            sat_view: ActivityTimer::new("sat_view", clock.clone(), DEFAULT_SAT_VIEW_S),
            beacon: ActivityTimer::new("beacon", clock.clone(), BEACON_PERIOD_S),
            last_sat_seen: 0,
            link_faults: 0,
            store,
            clock,
        }
    }

    /// Boot: load stored settings, bring the links up, start the first
    /// acquisition so a report goes out right away.
    pub fn start(&mut self) {
        self.loc_send
            .set_delay(self.store.get_u64(storage::KEY_LOC_SEND, DEFAULT_REPORT_INTERVAL_S));
        self.sat_view
            .set_delay(self.store.get_u64(storage::KEY_SAT_VIEW, DEFAULT_SAT_VIEW_S));
        self.sleep_mode = SleepMode::from_store(&self.store);

        self.start_satellite();
        self.gps.start();
        self.loc_send.start();
        self.sat_view.start();
        self.beacon.start();
        self.activity = Activity::AcquireFix;
        info!(
            interval = self.loc_send.wait_time(),
            sleep = ?self.sleep_mode,
            "mission started"
        );
    }

    /// One cooperative tick.
    pub fn run(&mut self) {
        self.satellite.run();
        self.radio.run();
        if let Err(err) = self.gps.run() {
            warn!(%err, "gps channel failure");
        }

        self.process_commands();
        self.watch_satellite_visibility();
        if self.activity != Activity::LostSatellite && self.sat_view.expired() {
            self.lost_satellite();
            return;
        }

        self.dispatch();
        self.assert_link_state();
        self.run_beacon();
    }

    fn dispatch(&mut self) {
        match self.activity {
            Activity::Idle => {
                if self.loc_send.expired() {
                    self.loc_send.reset();
                    if !self.beacon_on {
                        // Fresh acquisition: stale data must not satisfy it
                        self.gps.state = GpsState::default();
                        self.gps.start();
                    }
                    self.set_activity(Activity::AcquireFix);
                } else {
                    self.maybe_sleep();
                }
            }
            Activity::AcquireFix => {
                if self.gps.has_fix() {
                    self.set_activity(Activity::TrackFix);
                } else {
                    self.check_fix_giveup();
                }
            }
            Activity::TrackFix => {
                if self.gps.state.has_signal() && self.gps.state.has_course() {
                    if !self.beacon_on {
                        self.gps.stop();
                    }
                    self.set_activity(Activity::ComposeUpdate);
                } else {
                    self.check_fix_giveup();
                }
            }
            Activity::ComposeUpdate => {
                if !self.gps.state.has_position() {
                    self.set_activity(Activity::Idle);
                    return;
                }
                let battery = self.battery.as_mut().and_then(|b| b.check());
                let report = packet::location_report(&self.gps.state, self.beacon_on, battery);
                info!(report, "location report queued");
                self.satellite.enqueue(&report);
                self.set_activity(Activity::Transmit);
            }
            Activity::Transmit => {
                if !self.satellite.running() {
                    self.start_satellite();
                }
                self.set_activity(Activity::AwaitTransmit);
            }
            Activity::AwaitTransmit => {
                if !self.satellite.busy() {
                    self.set_activity(Activity::StopLink);
                }
            }
            Activity::StopLink => {
                if let Err(err) = self.satellite.stop() {
                    warn!(%err, "satellite stop failed");
                }
                self.set_activity(Activity::Idle);
            }
            Activity::LostSatellite => {
                // Entry is synchronous in lost_satellite(); nothing lingers.
                self.set_activity(Activity::AcquireFix);
            }
        }
    }

    /// No complete fix inside the acquisition window; wait out the next
    /// interval instead. In beacon mode the GPS stays up indefinitely.
    fn check_fix_giveup(&mut self) {
        if self.beacon_on {
            return;
        }
        if self.clock.now() - self.gps.start_time > GPS_GIVEUP_S {
            warn!("no fix inside the acquisition window");
            self.gps.stop();
            self.loc_send.reset();
            self.set_activity(Activity::Idle);
        }
    }

    fn set_activity(&mut self, next: Activity) {
        if self.activity != next {
            debug!(from = ?self.activity, to = ?next, "activity");
            self.activity = next;
        }
    }

    /// Any fresh evidence of the sky re-arms the watchdog. GPS and modem
    /// visibility merge; either one counts.
    fn watch_satellite_visibility(&mut self) {
        let seen = self.gps.last_sat_time.max(self.satellite.last_sat_time);
        if seen > self.last_sat_seen {
            self.last_sat_seen = seen;
            self.sat_view.reset();
        }
    }

    /// Watchdog fired: shut everything down, sleep a clamped slice of the
    /// report interval, come back acquiring.
    fn lost_satellite(&mut self) {
        self.set_activity(Activity::LostSatellite);
        let sleep_s = self.loc_send.wait_time().clamp(60, 900);
        warn!(sleep_s, "satellite lost, sleeping");
        self.sleep(sleep_s);
        self.sat_view.reset();
        self.start_satellite();
        if self.beacon_on {
            self.radio.start();
        }
        self.gps.start();
        self.set_activity(Activity::AcquireFix);
    }

    /// Collect and apply inbound commands from both links.
    fn process_commands(&mut self) {
        let mut commands = Vec::new();
        for (pkt_type, fields) in self.satellite.take_inbound() {
            if let Some(cmd) = BuoyCommand::parse(&pkt_type, &fields) {
                commands.push(cmd);
            }
        }
        for payload in self.radio.take_inbound() {
            let sentence = Sentence::parse(payload.trim_end(), &self.spec);
            if !sentence.valid {
                debug!(payload, "radio packet failed checksum");
                continue;
            }
            if let Some(cmd) = BuoyCommand::parse(&sentence.pkt_type, &sentence.fields) {
                commands.push(cmd);
            }
        }
        for cmd in commands {
            self.apply_command(cmd);
        }
    }

    fn apply_command(&mut self, cmd: BuoyCommand) {
        info!(?cmd, "command received");
        match cmd {
            BuoyCommand::Beacon(on) => {
                self.beacon_on = on;
                if on {
                    self.radio.start();
                    self.beacon.reset();
                } else {
                    self.radio.stop();
                }
            }
            BuoyCommand::ReportInterval(seconds) => {
                if let Err(err) = self
                    .store
                    .put(storage::KEY_LOC_SEND, &seconds.to_string())
                {
                    warn!(%err, "could not persist report interval");
                }
                self.loc_send.set_delay(seconds);
            }
            BuoyCommand::SleepNow(seconds) => {
                self.sleep(seconds);
            }
            BuoyCommand::Support => {
                if let Err(err) = self.store.put(storage::KEY_APP, "ota") {
                    warn!(%err, "could not persist app handover");
                }
                if let Err(err) = self.store.put(storage::KEY_MODE, "SUPPORT") {
                    warn!(%err, "could not persist mode handover");
                }
                self.power.reset();
            }
        }
    }

    /// Cross-check the satellite link's bookkeeping against what the
    /// scheduler knows, every tick. Inconsistencies are repaired, not fatal.
    fn assert_link_state(&mut self) {
        if self.satellite.bad_session {
            self.satellite.bad_session = false;
            self.reset_satellite();
            self.set_activity(Activity::ComposeUpdate);
            return;
        }
        if self.satellite.wait_for_send && self.satellite.queued() == 0 {
            warn!("send pending with an empty queue, clearing");
            self.satellite.wait_for_send = false;
        }
        if self.satellite.session.is_some()
            && !self.satellite.wait_for_send
            && !self.satellite.wait_for_recv
        {
            warn!("session open with nothing to do, dropping");
            self.satellite.session = None;
        }
        if self.satellite.hardware_fault {
            self.satellite.hardware_fault = false;
            self.reset_satellite();
            self.start_satellite();
        }
        if self.activity == Activity::Idle && self.satellite.busy() {
            if !self.satellite.running() {
                self.start_satellite();
            }
            self.set_activity(Activity::AwaitTransmit);
        }
    }

    /// Count a fault and stop the link; it restarts lazily when the next
    /// transmission needs it. A used-up fault budget restarts the device.
    fn reset_satellite(&mut self) {
        self.link_faults += 1;
        warn!(faults = self.link_faults, "resetting satellite link");
        if self.link_faults > MAX_LINK_FAULTS {
            warn!("link fault budget exhausted, restarting device");
            self.power.reset();
            return;
        }
        if let Err(err) = self.satellite.stop() {
            warn!(%err, "satellite stop failed");
        }
    }

    fn start_satellite(&mut self) {
        match self.satellite.start() {
            Ok(true) => {}
            Ok(false) => warn!("satellite link refused to start"),
            Err(err) => warn!(%err, "satellite start failed"),
        }
    }

    /// Side-activity: while the beacon is on, keep the radio and GPS alive
    /// so every beacon carries a fresh fix, and transmit a framed position
    /// sentence every beacon period.
    fn run_beacon(&mut self) {
        if !self.beacon_on {
            return;
        }
        if !self.radio.enabled {
            self.radio.start();
        }
        if !self.gps.running() {
            self.gps.start();
        }
        if !self.beacon.expired() {
            return;
        }
        self.beacon.reset();
        if self.gps.state.has_position() {
            let sentence = packet::beacon_sentence(&self.gps.state, self.beacon_on, &self.spec);
            self.radio.enqueue(&sentence);
        }
    }

    /// In Idle, with the link quiet and the beacon off, spend the wait
    /// asleep instead of spinning.
    fn maybe_sleep(&mut self) {
        if self.beacon_on || self.satellite.busy() {
            return;
        }
        let wait = self.loc_send.wait_time();
        if wait < SLEEP_MIN_S {
            return;
        }
        self.sleep(wait);
    }

    /// Quiesce every device, then sleep per the stored policy. Devices
    /// restart lazily from whichever activity next needs them. The core
    /// does not resume from deep sleep; it restarts.
    fn sleep(&mut self, seconds: u64) {
        if let Err(err) = self.satellite.stop() {
            warn!(%err, "satellite stop failed");
        }
        self.radio.stop();
        self.gps.stop();
        match self.sleep_mode {
            SleepMode::Off => {}
            SleepMode::Light => self.power.light_sleep(seconds * 1000),
            SleepMode::Deep => self.power.deep_sleep(seconds * 1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::sentence;
    use crate::sim::{FixedBattery, RecordingPower, SimChannel, SimTransceiver};
    use crate::storage::MemoryStore;
    use std::rc::Rc;

    type SimScheduler =
        MissionScheduler<SimChannel, SimChannel, SimTransceiver, MemoryStore, RecordingPower>;

    fn scheduler(clock: &Rc<ManualClock>, store: MemoryStore) -> SimScheduler {
        let gps = GpsReceiver::new(SimChannel::new(), clock.clone());
        let satellite = SatelliteLinkDriver::new(SimChannel::new(), clock.clone());
        let radio = RadioLinkDriver::new(SimTransceiver::new());
        let mut mission = MissionScheduler::new(
            clock.clone(),
            gps,
            satellite,
            radio,
            store,
            RecordingPower::new(),
            Some(Box::new(FixedBattery(Some(3.92)))),
        );
        // The modem probe needs a scripted answer before start()
        mission.satellite.modem.channel_mut().push(b"");
        mission.satellite.modem.channel_mut().push(b"AT\r\nOK\r\n");
        mission.start();
        mission
    }

    fn feed_fix(mission: &mut SimScheduler) {
        let spec = SentenceSpec::default();
        let gga = sentence::create(
            "GP",
            "GGA",
            Some("212200.00,3745.7876,N,12216.6034,W,1,07,1.1,8.6,M,,M,,"),
            &spec,
        );
        let vtg = sentence::create("GP", "VTG", Some("054.7,T,034.4,M,005.5,N,010.2,K"), &spec);
        let mut chunk = gga.into_bytes();
        chunk.extend_from_slice(vtg.as_bytes());
        mission.gps.channel_mut().push(&chunk);
    }

    #[test]
    fn test_boot_acquires_and_composes_report() {
        let clock = ManualClock::shared(1000);
        let mut mission = scheduler(&clock, MemoryStore::new());
        assert_eq!(mission.activity, Activity::AcquireFix);

        feed_fix(&mut mission);
        mission.run();
        assert_eq!(mission.activity, Activity::TrackFix);

        mission.run();
        assert_eq!(mission.activity, Activity::ComposeUpdate);
        assert!(!mission.gps.running());

        mission.run();
        assert_eq!(mission.activity, Activity::Transmit);
        assert_eq!(mission.satellite.queued(), 1);
    }

    #[test]
    fn test_compose_waits_for_course_data() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        let spec = SentenceSpec::default();

        // Position and fix quality only; no course sentence yet
        let gga = sentence::create(
            "GP",
            "GGA",
            Some("212200.00,3745.7876,N,12216.6034,W,1,07,1.1,8.6,M,,M,,"),
            &spec,
        );
        mission.gps.channel_mut().push(gga.as_bytes());
        mission.run();
        mission.run();
        assert_eq!(mission.activity, Activity::TrackFix);

        let vtg = sentence::create("GP", "VTG", Some("054.7,T,034.4,M,005.5,N,010.2,K"), &spec);
        mission.gps.channel_mut().push(vtg.as_bytes());
        mission.run();
        assert_eq!(mission.activity, Activity::ComposeUpdate);

        mission.run();
        assert_eq!(mission.satellite.queued(), 1);
    }

    #[test]
    fn test_transmit_cycle_completes_back_to_idle() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        feed_fix(&mut mission);
        mission.run(); // AcquireFix -> TrackFix
        mission.run(); // TrackFix -> ComposeUpdate
        mission.run(); // report queued, -> Transmit

        // Message loads into the modem, session runs once signal shows up,
        // a clean session result confirms delivery
        mission.satellite.modem.channel_mut().push(b"READY");
        mission.run(); // Transmit -> AwaitTransmit
        assert!(mission.satellite.wait_for_send);
        assert!(mission
            .satellite
            .modem
            .channel()
            .written_text()
            .contains("PK001;lat:3745.7876,NS:N"));

        mission
            .satellite
            .modem
            .channel_mut()
            .push(b"+SBDSX: 1, 6, 0, 0, 0, 0\r\n+CIEV:0,5\r\n");
        mission.run();
        assert_eq!(mission.activity, Activity::AwaitTransmit);

        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+SBDIX: 0, 6, 0, 0, 0, 0");
        mission.run(); // delivery confirmed, AwaitTransmit -> StopLink
        assert_eq!(mission.activity, Activity::StopLink);
        assert_eq!(mission.satellite.queued(), 0);

        mission.run();
        assert_eq!(mission.activity, Activity::Idle);
        assert!(!mission.gps.running());
        assert!(!mission.satellite.running());

        // The link stays down between cycles: no more status polls
        let writes = mission.satellite.modem.channel().written.len();
        clock.advance(31);
        mission.run();
        assert_eq!(mission.satellite.modem.channel().written.len(), writes);
    }

    #[test]
    fn test_second_cycle_restarts_the_link() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        feed_fix(&mut mission);
        mission.run();
        mission.run();
        mission.run(); // Transmit, link still up from boot
        mission.run(); // AwaitTransmit

        mission.satellite.stop().unwrap();
        mission.set_activity(Activity::Transmit);
        mission.run();
        assert!(mission.satellite.running());
    }

    #[test]
    fn test_bad_session_repaired_every_tick() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        feed_fix(&mut mission);
        mission.run();
        mission.run();
        mission.run(); // -> Transmit

        mission.satellite.bad_session = true;
        mission.run();
        assert!(!mission.satellite.bad_session);
        assert!(!mission.satellite.running());
        assert_eq!(mission.activity, Activity::ComposeUpdate);
    }

    #[test]
    fn test_idle_with_busy_link_reenters_await() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        mission.set_activity(Activity::Idle);
        mission.satellite.enqueue("PK001;lat:3745.7876,NS:N");
        mission.run();
        assert_eq!(mission.activity, Activity::AwaitTransmit);
    }

    #[test]
    fn test_report_interval_command_persists() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+DATA:PK006,5");
        mission.run();
        assert_eq!(
            mission.store.get(storage::KEY_LOC_SEND).as_deref(),
            Some("300")
        );
    }

    #[test]
    fn test_beacon_command_starts_radio_and_beacons() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        feed_fix(&mut mission);
        mission.run();

        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+DATA:PK005,1");
        mission.run();
        assert!(mission.beacon_on);
        assert!(mission.radio.enabled);

        clock.advance(BEACON_PERIOD_S + 1);
        mission.run();
        mission.run();
        assert!(mission
            .radio
            .transceiver()
            .transmitted
            .iter()
            .any(|p| p.starts_with("$PK004,3745.7876,N")));
    }

    #[test]
    fn test_beacon_mode_keeps_gps_alive() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        feed_fix(&mut mission);
        mission.run();
        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+DATA:PK005,1");
        mission.run();
        assert!(mission.beacon_on);

        // Whatever stops the GPS, the beacon side-activity restarts it
        mission.gps.stop();
        mission.run();
        assert!(mission.gps.running());

        clock.advance(BEACON_PERIOD_S + 1);
        feed_fix(&mut mission);
        mission.run();
        mission.run();
        assert!(mission
            .radio
            .transceiver()
            .transmitted
            .iter()
            .any(|p| p.starts_with("$PK004,3745.7876,N")));
    }

    #[test]
    fn test_beacon_off_command_stops_radio() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+DATA:PK005,1");
        mission.run();
        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+DATA:PK005,0");
        mission.run();
        assert!(!mission.beacon_on);
        assert!(!mission.radio.enabled);
    }

    #[test]
    fn test_sleep_now_command() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+DATA:PK007,45");
        mission.run();
        assert_eq!(mission.power.light_sleeps, vec![45_000]);
        // Every device is quiesced before the processor goes down
        assert!(!mission.satellite.running());
        assert!(!mission.gps.running());
        assert!(!mission.radio.enabled);
    }

    #[test]
    fn test_support_command_hands_over_and_resets() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        mission
            .satellite
            .modem
            .channel_mut()
            .push_line("+DATA:SUPPORT,1");
        mission.run();
        assert_eq!(mission.store.get(storage::KEY_APP).as_deref(), Some("ota"));
        assert_eq!(
            mission.store.get(storage::KEY_MODE).as_deref(),
            Some("SUPPORT")
        );
        assert_eq!(mission.power.resets, 1);
    }

    #[test]
    fn test_lost_satellite_sleeps_clamped_and_recovers() {
        let clock = ManualClock::shared(0);
        let mut store = MemoryStore::new();
        store.put(storage::KEY_SAT_VIEW, "120").unwrap();
        store.put(storage::KEY_LOC_SEND, "600").unwrap();
        let mut mission = scheduler(&clock, store);

        clock.advance(121);
        mission.run();
        assert_eq!(mission.power.light_sleeps.len(), 1);
        let slept = mission.power.light_sleeps[0] / 1000;
        assert!((60..=900).contains(&slept));
        assert_eq!(mission.activity, Activity::AcquireFix);
        assert!(mission.gps.running());
    }

    #[test]
    fn test_visibility_rearms_watchdog() {
        let clock = ManualClock::shared(0);
        let mut store = MemoryStore::new();
        store.put(storage::KEY_SAT_VIEW, "120").unwrap();
        let mut mission = scheduler(&clock, store);

        clock.advance(100);
        mission.satellite.last_sat_time = clock.now();
        mission.run();
        clock.advance(100);
        mission.run();
        assert!(mission.power.light_sleeps.is_empty());
        assert_ne!(mission.activity, Activity::LostSatellite);
    }

    #[test]
    fn test_link_state_repair() {
        let clock = ManualClock::shared(0);
        let mut mission = scheduler(&clock, MemoryStore::new());
        mission.satellite.wait_for_send = true;
        mission.run();
        assert!(!mission.satellite.wait_for_send);
        assert!(mission.satellite.session.is_none());
    }
}
