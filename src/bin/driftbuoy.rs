use clap::{App, Arg};
use colored::*;
use driftbuoy::clock::{Clock, ManualClock};
use driftbuoy::gps::GpsReceiver;
use driftbuoy::link::{RadioLinkDriver, SatelliteLinkDriver};
use driftbuoy::mission::MissionScheduler;
use driftbuoy::sentence::{self, SentenceSpec};
use driftbuoy::sim::{FixedBattery, RecordingPower, SimChannel, SimTransceiver};
use driftbuoy::storage::{self, KvStore, MemoryStore};

type SimMission =
    MissionScheduler<SimChannel, SimChannel, SimTransceiver, MemoryStore, RecordingPower>;

fn main() {
    tracing_subscriber::fmt::init();

    let matches = App::new("driftbuoy")
        .version("0.1.0")
        .about("Drift buoy mission core, running against simulated hardware")
        .arg(
            Arg::with_name("ticks")
                .short("t")
                .long("ticks")
                .value_name("N")
                .help("Number of one-second scheduler ticks to simulate")
                .takes_value(true)
                .default_value("1800"),
        )
        .arg(
            Arg::with_name("interval")
                .short("i")
                .long("interval")
                .value_name("SECONDS")
                .help("Location report interval")
                .takes_value(true)
                .default_value("300"),
        )
        .arg(
            Arg::with_name("beacon")
                .short("b")
                .long("beacon")
                .help("Deliver a beacon-on command partway through the run"),
        )
        .get_matches();

    let ticks: u64 = matches
        .value_of("ticks")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1800);
    let interval: u64 = matches
        .value_of("interval")
        .and_then(|v| v.parse().ok())
        .unwrap_or(300);
    let beacon = matches.is_present("beacon");

    println!("{}", "Drift Buoy Mission Core".bold());
    println!("=======================");
    println!("ticks: {ticks}, report interval: {interval}s, beacon command: {beacon}");

    let clock = ManualClock::shared(0);
    let mut store = MemoryStore::new();
    store
        .put(storage::KEY_LOC_SEND, &interval.to_string())
        .expect("memory store never fails");
    store
        .put(storage::KEY_SLEEPMODE, "off")
        .expect("memory store never fails");

    let gps = GpsReceiver::new(SimChannel::new(), clock.clone());
    let mut satellite = SatelliteLinkDriver::new(SimChannel::new(), clock.clone());
    let radio = RadioLinkDriver::new(SimTransceiver::new());

    // Script the power-on probe before the scheduler touches the modem
    satellite.modem.channel_mut().push(b"");
    satellite.modem.channel_mut().push(b"AT\r\nOK\r\n");

    let mut mission = MissionScheduler::new(
        clock.clone(),
        gps,
        satellite,
        radio,
        store,
        RecordingPower::new(),
        Some(Box::new(FixedBattery(Some(3.92)))),
    );
    mission.start();

    let mut answered = 0usize;
    let mut reports = 0u32;
    let mut last_activity = mission.activity;
    for tick in 0..ticks {
        feed_gps(&mut mission, tick);
        answer_modem(&mut mission, &mut answered, &mut reports);
        if beacon && tick == ticks / 2 {
            mission
                .satellite
                .modem
                .channel_mut()
                .push_line("+DATA:PK005,1");
            println!("{}", "-> beacon-on command delivered".yellow());
        }

        mission.run();
        if mission.activity != last_activity {
            println!(
                "[{:>6}s] {} -> {}",
                clock.now(),
                format!("{last_activity:?}").dimmed(),
                format!("{:?}", mission.activity).cyan()
            );
            last_activity = mission.activity;
        }
        clock.advance(1);
    }

    println!();
    println!("{}", "Run summary".bold());
    println!("  reports delivered : {}", reports.to_string().green());
    println!("  beacons on air    : {}", mission.radio.transceiver().transmitted.len());
    println!("  link state        : {}", if mission.satellite.bad_session {
        "degraded".red().to_string()
    } else {
        "nominal".green().to_string()
    });
}

/// Synthesize one second of receiver output: a fix sentence plus course
/// and speed, drifting slowly east.
fn feed_gps(mission: &mut SimMission, tick: u64) {
    let spec = SentenceSpec::default();
    let seconds = (tick % 60) as u32;
    let minutes = 22 + (tick / 60) % 38;
    let lon = 12216.6034 + tick as f64 * 0.0002;
    let gga = sentence::create(
        "GP",
        "GGA",
        Some(&format!(
            "21{minutes:02}{seconds:02}.00,3745.7876,N,{lon:.4},W,1,07,1.1,8.6,M,,M,,"
        )),
        &spec,
    );
    let vtg = sentence::create("GP", "VTG", Some("054.7,T,,M,000.3,N,000.6,K"), &spec);
    let mut chunk = gga.into_bytes();
    chunk.extend_from_slice(vtg.as_bytes());
    mission.gps.channel_mut().push(&chunk);
}

/// Play the gateway's half of the conversation: prompt for message text,
/// report signal, answer session initiations with a clean result.
fn answer_modem(mission: &mut SimMission, answered: &mut usize, reports: &mut u32) {
    let written: Vec<String> = mission
        .satellite
        .modem
        .channel()
        .written
        .iter()
        .skip(*answered)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    *answered += written.len();

    for command in written {
        if command.contains("+SBDWT") {
            mission.satellite.modem.channel_mut().push(b"READY");
        } else if command.contains("+SBDSX") {
            let mo = u8::from(mission.satellite.queued() > 0);
            mission
                .satellite
                .modem
                .channel_mut()
                .push(format!("+SBDSX: {mo}, 1, 0, 0, 0, 0\r\n+CIEV:0,5\r\n").as_bytes());
        } else if command.contains("+SBDIX") {
            *reports += 1;
            mission
                .satellite
                .modem
                .channel_mut()
                .push_line(&format!("+SBDIX: 0, {reports}, 0, 0, 0, 0"));
        }
    }
}
