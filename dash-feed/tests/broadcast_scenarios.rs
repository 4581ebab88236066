//! End-to-end broadcaster scenarios over loopback sockets.

use dash_feed::announcer::{ERROR_MESSAGES, ErrorAnnouncer};
use dash_feed::app::FeedApp;
use dash_feed::config::{AppConfig, BroadcastConfig, NetworkConfig};
use dash_feed::console::OperatorCommand;
use dash_feed::streaming::broadcaster::broadcast_tick;
use dash_feed::streaming::{Broadcaster, ErrorState, FeedClient, FieldValue, FrameWriter};
use dash_feed::telemetry::create_source;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

const TELEMETRY_ORDER: [&str; 7] = [
    "speed",
    "speedLimit",
    "batteryLevel",
    "batteryVoltage",
    "batteryRange",
    "motorActive",
    "motorPower",
];

fn loopback() -> NetworkConfig {
    NetworkConfig {
        bind_address: "127.0.0.1:0".to_string(),
        accept_poll_ms: 2,
        ..Default::default()
    }
}

fn seeded(extended: bool) -> BroadcastConfig {
    BroadcastConfig {
        random_seed: 1234,
        extended_fields: extended,
        ..Default::default()
    }
}

fn connect(broadcaster: &Broadcaster) -> FeedClient {
    let mut client = FeedClient::connect_timeout(
        &broadcaster.local_addr().to_string(),
        Duration::from_secs(2),
    )
    .expect("connect to feed");
    client
        .set_timeout(Some(Duration::from_secs(2)))
        .expect("set read timeout");
    client
}

fn wait_for_clients(broadcaster: &Broadcaster, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while broadcaster.client_count() != expected {
        assert!(
            Instant::now() < deadline,
            "expected {} clients, have {}",
            expected,
            broadcaster.client_count()
        );
        thread::sleep(Duration::from_millis(5));
    }
}

fn names(fields: &[(String, FieldValue)]) -> Vec<&str> {
    fields.iter().map(|(n, _)| n.as_str()).collect()
}

#[test]
fn one_client_one_tick_gets_one_frame() {
    let broadcaster = Broadcaster::bind(&loopback()).unwrap();
    let mut client = connect(&broadcaster);
    wait_for_clients(&broadcaster, 1);

    let mut source = create_source(&seeded(false));
    let mut writer = FrameWriter::new();
    let report = broadcast_tick(broadcaster.registry(), source.as_mut(), &mut writer);
    assert_eq!(report.delivered, 1);

    let fields = client.recv_fields(7).unwrap();
    assert_eq!(names(&fields), TELEMETRY_ORDER);
    match &fields[0].1 {
        FieldValue::Int32(speed) => assert!((0..=180).contains(speed)),
        other => panic!("speed decoded as {:?}", other),
    }

    // Nothing else was sent
    client
        .set_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    assert!(client.recv_field().is_err());
}

#[test]
fn extended_tick_has_nine_fields() {
    let broadcaster = Broadcaster::bind(&loopback()).unwrap();
    let mut client = connect(&broadcaster);
    wait_for_clients(&broadcaster, 1);

    let mut source = create_source(&seeded(true));
    let mut writer = FrameWriter::new();
    broadcast_tick(broadcaster.registry(), source.as_mut(), &mut writer);

    let fields = client.recv_fields(9).unwrap();
    assert_eq!(&names(&fields)[..7], TELEMETRY_ORDER);
    assert_eq!(fields[7].0, "temperature");
    assert_eq!(fields[8].0, "totalDistance");
    assert!(matches!(fields[7].1, FieldValue::Double(_)));
}

#[test]
fn survivor_keeps_receiving_after_peer_disconnects() {
    let broadcaster = Broadcaster::bind(&loopback()).unwrap();
    let leaver = connect(&broadcaster);
    let mut stayer = connect(&broadcaster);
    wait_for_clients(&broadcaster, 2);

    let mut source = create_source(&seeded(false));
    let mut writer = FrameWriter::new();
    broadcast_tick(broadcaster.registry(), source.as_mut(), &mut writer);
    drop(leaver);
    // Let the FIN/RST reach the server side of the socket
    thread::sleep(Duration::from_millis(100));

    let report = broadcast_tick(broadcaster.registry(), source.as_mut(), &mut writer);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(broadcaster.client_count(), 1);

    let report = broadcast_tick(broadcaster.registry(), source.as_mut(), &mut writer);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.dropped, 0);

    for _ in 0..3 {
        let fields = stayer.recv_fields(7).unwrap();
        assert_eq!(names(&fields), TELEMETRY_ORDER);
    }
}

#[test]
fn idle_client_closing_is_pruned_on_next_tick() {
    let broadcaster = Broadcaster::bind(&loopback()).unwrap();
    let leaver = connect(&broadcaster);
    let mut stayer = connect(&broadcaster);
    wait_for_clients(&broadcaster, 2);

    // Closed before it ever received anything, so the server sees a clean FIN
    drop(leaver);
    thread::sleep(Duration::from_millis(100));

    let mut source = create_source(&seeded(false));
    let mut writer = FrameWriter::new();
    let report = broadcast_tick(broadcaster.registry(), source.as_mut(), &mut writer);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(broadcaster.client_count(), 1);

    let fields = stayer.recv_fields(7).unwrap();
    assert_eq!(names(&fields), TELEMETRY_ORDER);
}

#[test]
fn error_raise_and_clear_frames() {
    let broadcaster = Broadcaster::bind(&loopback()).unwrap();
    let mut client = connect(&broadcaster);
    wait_for_clients(&broadcaster, 1);

    let mut announcer = ErrorAnnouncer::new(77);
    broadcaster.announce(&announcer.raise());
    let raised = client.recv_fields(2).unwrap();
    assert_eq!(raised[0], ("showError".to_string(), FieldValue::Bool(true)));
    assert_eq!(raised[1].0, "errorMessage");
    match &raised[1].1 {
        FieldValue::String(message) => {
            assert!(!message.is_empty());
            assert!(ERROR_MESSAGES.contains(&message.as_str()));
        }
        other => panic!("errorMessage decoded as {:?}", other),
    }

    broadcaster.announce(&ErrorState::cleared());
    let mut source = create_source(&seeded(false));
    let mut writer = FrameWriter::new();
    broadcast_tick(broadcaster.registry(), source.as_mut(), &mut writer);

    // Clear is a single field, immediately followed by the next telemetry message
    let fields = client.recv_fields(8).unwrap();
    assert_eq!(fields[0], ("showError".to_string(), FieldValue::Bool(false)));
    assert_eq!(names(&fields[1..]), TELEMETRY_ORDER);
}

#[test]
fn tick_loop_streams_periodically() {
    let mut broadcaster = Broadcaster::bind(&loopback()).unwrap();
    let mut client = connect(&broadcaster);
    wait_for_clients(&broadcaster, 1);

    let mut config = seeded(false);
    config.source = dash_feed::config::SourceKind::Ramp;
    broadcaster
        .start_ticks(create_source(&config), Duration::from_millis(20))
        .unwrap();
    assert!(
        broadcaster
            .start_ticks(create_source(&config), Duration::from_millis(20))
            .is_err()
    );

    for _ in 0..3 {
        let fields = client.recv_fields(7).unwrap();
        assert_eq!(names(&fields), TELEMETRY_ORDER);
    }

    broadcaster.stop();
    assert!(!broadcaster.is_running());
}

#[test]
fn app_dispatches_commands_until_quit() {
    let config = AppConfig {
        network: loopback(),
        broadcast: BroadcastConfig {
            tick_ms: 60_000,
            random_seed: 5,
            ..Default::default()
        },
        ..Default::default()
    };
    let running = Arc::new(AtomicBool::new(true));
    let mut app = FeedApp::new(&config, Arc::clone(&running)).unwrap();
    let mut client = connect(app.broadcaster());
    wait_for_clients(app.broadcaster(), 1);

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(OperatorCommand::RaiseError).unwrap();
    tx.send(OperatorCommand::ClearError).unwrap();
    tx.send(OperatorCommand::Quit).unwrap();
    app.run(rx).unwrap();

    assert!(!running.load(std::sync::atomic::Ordering::Relaxed));

    // The first telemetry tick races the connect; skip it if it arrived
    let mut first = client.recv_field().unwrap().unwrap();
    while first.0 != "showError" {
        first = client.recv_field().unwrap().unwrap();
    }
    assert_eq!(first, ("showError".to_string(), FieldValue::Bool(true)));
    let rest = client.recv_fields(2).unwrap();
    assert_eq!(rest[0].0, "errorMessage");
    assert_eq!(rest[1], ("showError".to_string(), FieldValue::Bool(false)));
}
