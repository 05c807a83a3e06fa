use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use skylark_link::sim::{SimConfig, SimLink};
use skylark_link::CommandLink;
use skylark_mission::mock::{MockController, Phase};
use skylark_mission::{AckCallback, HotpointMission, MissionError, MissionManager, Push, PushCallback, WaypointMission};
use skylark_proto::ack::{MissionAck, VelocityAck, WaypointInitAck};
use skylark_proto::cmd::mission;
use skylark_proto::hotpoint::HotpointSettings;
use skylark_proto::waypoint::{WaypointInitSettings, WaypointSettings};
use skylark_proto::telemetry::GlobalPosition;
use skylark_proto::{RecvFrame, Wire};

const T: Duration = Duration::from_secs(1);

fn setup() -> (Arc<SimLink>, MockController) {
    let mock = MockController::new();
    let link = Arc::new(SimLink::new(SimConfig::default(), mock.clone()).unwrap());
    (link, mock)
}

fn as_dyn(link: &Arc<SimLink>) -> Arc<dyn CommandLink> {
    link.clone()
}

fn init(n: u8) -> WaypointInitSettings {
    WaypointInitSettings { index_number: n, ..Default::default() }
}

fn point(index: u8) -> WaypointSettings {
    WaypointSettings {
        index,
        latitude: 0.3 + index as f64 * 1e-5,
        longitude: 2.0,
        altitude: 20.0,
        ..Default::default()
    }
}

/// Caller callback plus the receiving end it reports to.
fn reply<T: Send + 'static>() -> (Option<AckCallback<T>>, mpsc::Receiver<Result<T, MissionError>>) {
    let (tx, rx) = mpsc::channel();
    let cb: AckCallback<T> = Box::new(move |res: Result<T, MissionError>| {
        let _ = tx.send(res);
    });
    (Some(cb), rx)
}

/// Takes the one reply and checks nothing else can follow.
fn only<T>(rx: mpsc::Receiver<Result<T, MissionError>>) -> T {
    let res = rx.recv_timeout(T_ASYNC).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(20)).is_err());
    res.unwrap()
}

const T_ASYNC: Duration = Duration::from_secs(3);

fn eventually(what: &str, f: impl Fn() -> bool) {
    let started = Instant::now();
    while !f() {
        assert!(started.elapsed() < T_ASYNC, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn counter() -> (Arc<AtomicUsize>, PushCallback) {
    let n = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&n);
    let cb: PushCallback = Arc::new(move |_: &RecvFrame| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (n, cb)
}

fn loaded_waypoint(link: &Arc<SimLink>, n: u8) -> WaypointMission {
    let wp = WaypointMission::new(as_dyn(link));
    assert_eq!(wp.init(Some(init(n)), T).unwrap(), MissionAck::SUCCESS);
    for i in 0..n {
        assert!(wp.upload_point(point(i), T).unwrap().code.is_success());
    }
    wp
}

#[test]
fn test_upload_out_of_range_never_transmits() {
    let (link, mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));
    wp.init(Some(init(3)), T).unwrap();
    for i in 0..3 {
        let ack = wp.upload_point(point(i), T).unwrap();
        assert_eq!(ack.code, MissionAck::SUCCESS);
        assert_eq!(ack.index, i);
    }
    let before = link.sent_count();

    let err = wp.upload_point(point(3), T).unwrap_err();
    assert!(matches!(err, MissionError::IndexOutOfRange { index: 3, count: 3 }));
    assert!(wp.upload_point_async(point(7), None).is_err());

    assert_eq!(link.sent_count(), before);
    assert_eq!(mock.count(mission::WAYPOINT_ADD_POINT), 3);
    assert!(wp.point(3).is_none());
}

#[test]
fn test_silent_vehicle_times_out_within_budget() {
    let link: Arc<dyn CommandLink> = Arc::new(SimLink::silent(SimConfig::default()).unwrap());
    let hp = HotpointMission::new(link);
    let started = Instant::now();
    let err = hp.start(T).unwrap_err();
    let elapsed = started.elapsed();
    assert!(err.is_timeout(), "{}", err);
    assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1600), "{:?}", elapsed);
}

#[test]
fn test_hotpoint_version_is_zero_on_the_wire() {
    let (link, mock) = setup();
    let hp = HotpointMission::new(as_dyn(&link));
    hp.set_settings(HotpointSettings { version: 7, radius: 30.0, ..Default::default() });
    assert_eq!(hp.settings().version, 0);

    let ack = hp.start(T).unwrap();
    assert_eq!(ack.code, MissionAck::SUCCESS);
    assert_eq!(ack.max_radius, 500.0);

    let sent = link.sent();
    let start = sent.iter().find(|f| f.cmd == mission::HOTPOINT_START).unwrap();
    assert_eq!(start.payload.len(), HotpointSettings::SIZE);
    assert_eq!(start.payload[0], 0);
    assert_eq!(mock.remote().hotpoint.unwrap().radius, 30.0);
}

#[test]
fn test_hotpoint_lifecycle() {
    let (link, mock) = setup();
    let hp = HotpointMission::new(as_dyn(&link));
    hp.set_radius(50.0);
    hp.start(T).unwrap();

    assert_eq!(hp.pause(T).unwrap(), MissionAck::SUCCESS);
    assert_eq!(mock.remote().hotpoint_phase, Phase::Paused);
    assert_eq!(hp.resume(T).unwrap(), MissionAck::SUCCESS);
    assert_eq!(hp.reset_yaw(T).unwrap(), MissionAck::SUCCESS);

    hp.update_radius(40.0).unwrap();
    hp.update_yaw_rate(20.0, false).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(hp.settings().yaw_rate, 20.0);
    assert_eq!(hp.settings().radius, 50.0);

    let read = hp.download(T).unwrap();
    assert!(read.code.is_success());
    assert_eq!(read.settings.yaw_rate, 20.0);
    assert!(!read.settings.clockwise);
    assert_eq!(read.settings.radius, 40.0);

    assert_eq!(hp.stop(T).unwrap(), MissionAck::SUCCESS);
    assert_eq!(hp.pause(T).unwrap(), MissionAck::NOT_RUNNING);
}

#[test]
fn test_malformed_reply_is_dropped() {
    let (link, mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));
    wp.set_init_settings(init(4));
    mock.configure(|r| r.malformed = true);

    let (tx, rx) = mpsc::channel();
    wp.download_async(Some(Box::new(move |res: Result<WaypointInitAck, MissionError>| {
        let _ = tx.send(res.is_ok());
    })));
    assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());

    let started = Instant::now();
    let err = wp.download(Duration::from_millis(400)).unwrap_err();
    assert!(err.is_timeout(), "{}", err);
    assert!(started.elapsed() >= Duration::from_millis(380), "{:?}", started.elapsed());

    wp.download_async(None);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(wp.init_settings().index_number, 4);
}

#[test]
fn test_concurrent_velocity_updates_last_wins() {
    let (link, _mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));
    wp.init(Some(init(2)), T).unwrap();

    let (tx, rx) = mpsc::channel();
    for v in [3.0f32, 4.0] {
        let tx = tx.clone();
        wp.update_idle_velocity_async(v, Some(Box::new(move |res: Result<VelocityAck, MissionError>| {
            let _ = tx.send(res.map(|a| a.idle_velocity).ok());
        })));
    }
    let a = rx.recv_timeout(T).unwrap();
    let b = rx.recv_timeout(T).unwrap();
    let mut got = [a.unwrap(), b.unwrap()];
    got.sort_by(|x, y| x.total_cmp(y));
    assert_eq!(got, [3.0, 4.0]);

    // Default callbacks: whichever reply lands last is what local state holds.
    wp.update_idle_velocity_async(6.0, None);
    wp.update_idle_velocity_async(7.0, None);
    std::thread::sleep(Duration::from_millis(200));
    let v = wp.init_settings().idle_velocity;
    assert!(v == 6.0 || v == 7.0, "{}", v);
}

#[test]
fn test_sync_velocity_update_leaves_local_state() {
    let (link, mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));
    wp.init(Some(init(2)), T).unwrap();

    let ack = wp.update_idle_velocity(2.0, T).unwrap();
    assert_eq!(ack.code, MissionAck::SUCCESS);
    assert_eq!(mock.remote().init.unwrap().idle_velocity, 2.0);
    assert_eq!(wp.init_settings().idle_velocity, 5.0);

    let ack = wp.update_idle_velocity(99.0, T).unwrap();
    assert_eq!(ack.code, MissionAck::WAYPOINT_INVALID_VELOCITY);

    let read = wp.read_idle_velocity(T).unwrap();
    assert_eq!(read.idle_velocity, 2.0);
}

#[test]
fn test_pause_twice_is_accepted() {
    let (link, mock) = setup();
    let wp = loaded_waypoint(&link, 2);
    assert_eq!(wp.start(T).unwrap(), MissionAck::SUCCESS);

    assert_eq!(wp.pause(T).unwrap(), MissionAck::SUCCESS);
    assert_eq!(wp.pause(T).unwrap(), MissionAck::SUCCESS);
    assert_eq!(mock.remote().waypoint_phase, Phase::Paused);

    assert_eq!(wp.resume(T).unwrap(), MissionAck::SUCCESS);
    assert_eq!(wp.stop(T).unwrap(), MissionAck::SUCCESS);
    assert_eq!(mock.remote().waypoint_phase, Phase::Idle);
}

#[test]
fn test_start_before_upload_is_rejected() {
    let (link, _mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));
    assert_eq!(wp.start(T).unwrap(), MissionAck::NOT_INITIALIZED);
    wp.init(Some(init(2)), T).unwrap();
    assert!(!wp.start(T).unwrap().is_success());
}

#[test]
fn test_download_error_code_not_applied() {
    let (link, mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));
    wp.set_init_settings(init(5));
    mock.configure(|r| r.fail_with = Some(MissionAck::NOT_INITIALIZED));

    wp.download_async(None);
    wp.download_index_async(0, None);
    std::thread::sleep(Duration::from_millis(200));

    assert_eq!(wp.init_settings().index_number, 5);
    assert!(wp.last_index().is_none());

    let ack = wp.download(T).unwrap();
    assert_eq!(ack.code, MissionAck::NOT_INITIALIZED);
}

#[test]
fn test_download_applies_on_success() {
    let (link, mock) = setup();
    let wp = loaded_waypoint(&link, 3);

    let other = WaypointMission::new(as_dyn(&link));
    other.download_async(None);
    other.download_index_async(2, None);
    std::thread::sleep(Duration::from_millis(200));

    assert_eq!(other.init_settings(), mock.remote().init.unwrap());
    assert_eq!(other.last_index().unwrap(), wp.point(2).unwrap());
    assert!(other.point(2).is_none());
}

#[test]
fn test_independent_missions_share_a_link() {
    let (link, _mock) = setup();
    let manager = MissionManager::new(as_dyn(&link));
    let first = manager.waypoint();
    let second = manager.new_waypoint();

    first.set_init_settings(init(3));
    second.set_init_settings(init(6));
    first.upload_point(point(1), T).unwrap();

    assert_eq!(second.init_settings().index_number, 6);
    assert!(second.point(1).is_none());
    assert_eq!(first.init_settings().index_number, 3);
}

#[test]
fn test_uploaded_entry_matches_with_reserved_cleared() {
    let (link, mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));
    wp.init(Some(init(2)), T).unwrap();

    let mut p = point(1);
    p.reserved = [9; 8];
    p.action_number = 2;
    p.action_repeat = 3;
    p.command_list[0] = 1;
    p.command_parameter[0] = 2000;
    wp.upload_point(p.clone(), T).unwrap();

    let mut expected = p;
    expected.reserved = [0; 8];
    assert_eq!(wp.point(1).unwrap(), expected);
    assert_eq!(mock.remote().points[1].clone().unwrap(), expected);
}

#[test]
fn test_manager_uploads_whole_mission() {
    let (link, mock) = setup();
    let manager = MissionManager::new(as_dyn(&link));
    let points: Vec<_> = (0..4).map(point).collect();
    let code = manager.upload_waypoints(init(4), &points, T).unwrap();
    assert_eq!(code, MissionAck::SUCCESS);
    assert_eq!(mock.count(mission::WAYPOINT_ADD_POINT), 4);
    assert!(mock.remote().points.iter().all(Option::is_some));
    assert_eq!(manager.waypoint().start(T).unwrap(), MissionAck::SUCCESS);
}

#[test]
fn test_hotpoint_async_controls_fire_once() {
    let (link, mock) = setup();
    let hp = HotpointMission::new(as_dyn(&link));

    let (cb, rx) = reply();
    hp.start_async(cb);
    let ack = only(rx);
    assert_eq!(ack.code, MissionAck::SUCCESS);
    assert_eq!(ack.max_radius, 500.0);

    let (cb, rx) = reply();
    hp.pause_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    let (cb, rx) = reply();
    hp.resume_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    let (cb, rx) = reply();
    hp.reset_yaw_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    let (cb, rx) = reply();
    hp.stop_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);

    let (cb, rx) = reply();
    hp.download_async(cb);
    assert!(only(rx).code.is_success());
    assert_eq!(mock.remote().hotpoint_phase, Phase::Idle);
}

#[test]
fn test_hotpoint_default_callbacks_drive_vehicle() {
    let (link, mock) = setup();
    let hp = HotpointMission::new(as_dyn(&link));

    hp.start_async(None);
    eventually("orbit start", || mock.remote().hotpoint_phase == Phase::Running);
    hp.pause_async(None);
    eventually("pause", || mock.remote().hotpoint_phase == Phase::Paused);
    hp.resume_async(None);
    eventually("resume", || mock.remote().hotpoint_phase == Phase::Running);
    hp.reset_yaw_async(None);
    eventually("reset yaw", || mock.count(mission::HOTPOINT_SET_YAW) == 1);
    hp.stop_async(None);
    eventually("stop", || mock.remote().hotpoint_phase == Phase::Idle);
    hp.download_async(None);
    eventually("download", || mock.count(mission::HOTPOINT_DOWNLOAD) == 1);
}

#[test]
fn test_waypoint_async_controls_fire_once() {
    let (link, mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));

    let (cb, rx) = reply();
    wp.init_async(Some(init(2)), cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    for i in 0..2 {
        let (cb, rx) = reply();
        wp.upload_point_async(point(i), cb).unwrap();
        assert_eq!(only(rx).index, i);
    }

    let (cb, rx) = reply();
    wp.start_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    let (cb, rx) = reply();
    wp.pause_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    let (cb, rx) = reply();
    wp.resume_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    let (cb, rx) = reply();
    wp.read_idle_velocity_async(cb);
    assert_eq!(only(rx).idle_velocity, 5.0);
    let (cb, rx) = reply();
    wp.stop_async(cb);
    assert_eq!(only(rx), MissionAck::SUCCESS);
    assert_eq!(mock.remote().waypoint_phase, Phase::Idle);
}

#[test]
fn test_waypoint_default_callbacks_drive_vehicle() {
    let (link, mock) = setup();
    let wp = WaypointMission::new(as_dyn(&link));

    wp.init_async(Some(init(2)), None);
    eventually("init", || mock.remote().init.is_some());
    for i in 0..2 {
        wp.upload_point_async(point(i), None).unwrap();
    }
    eventually("points", || mock.remote().points.iter().all(Option::is_some));
    wp.start_async(None);
    eventually("start", || mock.remote().waypoint_phase == Phase::Running);
    wp.pause_async(None);
    eventually("pause", || mock.remote().waypoint_phase == Phase::Paused);
    wp.resume_async(None);
    eventually("resume", || mock.remote().waypoint_phase == Phase::Running);

    mock.configure(|r| {
        if let Some(init) = r.init.as_mut() {
            init.idle_velocity = 3.5;
        }
    });
    wp.read_idle_velocity_async(None);
    eventually("idle velocity", || wp.init_settings().idle_velocity == 3.5);

    wp.stop_async(None);
    eventually("stop", || mock.remote().waypoint_phase == Phase::Idle);
}

#[test]
fn test_repeated_download_leaves_same_state() {
    let (link, mock) = setup();
    let _loaded = loaded_waypoint(&link, 3);

    let wp = WaypointMission::new(as_dyn(&link));
    wp.download_async(None);
    eventually("download", || wp.init_settings().index_number == 3);
    wp.read_idle_velocity_async(None);
    eventually("velocity", || mock.count(mission::WAYPOINT_GET_VELOCITY) == 1);
    std::thread::sleep(Duration::from_millis(50));
    let first = wp.snapshot();

    wp.download_async(None);
    wp.read_idle_velocity_async(None);
    eventually("second pass", || {
        mock.count(mission::WAYPOINT_DOWNLOAD) == 2 && mock.count(mission::WAYPOINT_GET_VELOCITY) == 2
    });
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(wp.snapshot(), first);
}

#[test]
fn test_hot_point_seeded_from_position() {
    let (link, _mock) = setup();
    let hp = HotpointMission::new(as_dyn(&link));
    let pos = GlobalPosition::from_degrees(22.5431, 113.9589, 30.0);
    hp.set_hot_point_from(&pos);
    hp.start(T).unwrap();

    let sent = link.sent();
    let frame = sent.iter().find(|f| f.cmd == mission::HOTPOINT_START).unwrap();
    let wire = HotpointSettings::decode(&frame.payload).unwrap();
    assert_eq!(wire.latitude, 22.5431f64.to_radians());
    assert_eq!(wire.longitude, 113.9589f64.to_radians());
    assert_eq!(wire.height, 30.0);
}

#[test]
fn test_push_frames_reach_their_callback() {
    let (link, _mock) = setup();
    let manager = MissionManager::new(as_dyn(&link));
    let (hotpoint_seen, cb) = counter();
    manager.hotpoint().set_push_callback(cb);
    let (event_seen, cb) = counter();
    manager.waypoint().set_event_callback(cb);
    let (status_seen, cb) = counter();
    manager.waypoint().set_status_callback(cb);

    let frame = RecvFrame::ack(9, bytes::Bytes::from_static(&[1, 2, 3]));
    manager.route_push(Push::WaypointEvent, &frame);
    manager.route_push(Push::WaypointEvent, &frame);
    manager.route_push(Push::HotpointStatus, &frame);

    assert_eq!(event_seen.load(Ordering::SeqCst), 2);
    assert_eq!(hotpoint_seen.load(Ordering::SeqCst), 1);
    assert_eq!(status_seen.load(Ordering::SeqCst), 0);

    manager.waypoint().dispatch_status(&frame);
    assert_eq!(status_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_push_callback_may_replace_itself() {
    let (link, _mock) = setup();
    let hp = Arc::new(HotpointMission::new(as_dyn(&link)));
    let (after, replacement) = counter();
    let handle = Arc::clone(&hp);
    let slot = std::sync::Mutex::new(Some(replacement));
    hp.set_push_callback(Arc::new(move |_: &RecvFrame| {
        if let Some(next) = slot.lock().unwrap().take() {
            handle.set_push_callback(next);
        }
    }));

    let frame = RecvFrame::ack(1, bytes::Bytes::from_static(&[0]));
    hp.dispatch_push(&frame);
    hp.dispatch_push(&frame);
    assert_eq!(after.load(Ordering::SeqCst), 1);
}
