// tests/end_to_end.rs

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use telemetry_monitor::series::PositionClock;
use telemetry_monitor::{
    AngleDecoder, Capacity, FrequencyDecoder, GaugeState, MemoryLink, Monitor, MonitorEvent,
    PositionMode, SeriesBuffer, TemperatureDecoder, TickOutcome, TickSession, Ticker, Viewport,
};

#[test]
fn temperature_session_keeps_only_decodable_lines() {
    // ---
    // Arrange
    // ---
    let (link, feed) = MemoryLink::with_lines("mem", ["23.5°C", "garbage", "24.1°C", "-1.0°C"]);
    let mut session = TickSession::new(link, TemperatureDecoder);
    let mut clock = PositionClock::start(PositionMode::ElapsedTime);
    let mut series = SeriesBuffer::unbounded();
    let mut view = Viewport::time_based();

    // ---
    // Act
    // ---
    let mut ticks = 0;
    Ticker::new(Duration::from_millis(1)).run(|| {
        ticks += 1;
        if let TickOutcome::Reading(v) = session.tick().expect("memory link never fails") {
            series.append(v, clock.next_position());
            view.observe(series.iter().copied());
        }
        if feed.pending() == 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    // ---
    // Assert
    // ---
    assert_eq!(ticks, 4, "one line per tick");
    let values: Vec<f64> = series.snapshot().iter().map(|m| m.value).collect();
    assert_eq!(values, vec![23.5, 24.1, -1.0]);
    assert!(series
        .snapshot()
        .windows(2)
        .all(|w| w[0].position <= w[1].position));
    assert_eq!(series.current(), -1.0);
    assert!(view.y.contains(-1.0) && view.y.contains(24.1));
    assert!(view.y.lo <= -3.0);
}

#[test]
fn servo_session_ignores_out_of_range_angles() {
    let (link, _feed) =
        MemoryLink::with_lines("mem", ["ANGLE:90", "ANGLE:200", "ANGLE:abc", "ANGLE:45"]);
    let mut session = TickSession::new(link, AngleDecoder);
    let mut gauge = GaugeState::new();
    let mut seen = Vec::new();

    for _ in 0..5 {
        if let Some(angle) = session.tick().unwrap().reading() {
            gauge.set(angle);
            seen.push(gauge.angle());
        }
    }

    assert_eq!(seen, vec![90, 45]);
    assert_eq!(gauge.angle(), 45);
}

#[test]
fn frequency_monitor_start_stop_cycle() {
    let lines: Vec<String> = (1..=120).map(|n| format!("Frequency: {} Hz", n * 10)).collect();
    let (link, feed) = MemoryLink::with_lines("mem", &lines);
    feed.push_line("status: ok");

    let mut monitor = Monitor::new(Capacity::Bounded(100), PositionMode::SampleIndex)
        .with_poll_interval(Duration::from_millis(1));
    assert!(!monitor.stop().unwrap(), "stop before start is a no-op");

    monitor.start(link, FrequencyDecoder).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while feed.pending() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(monitor.stop().unwrap());
    assert!(!monitor.stop().unwrap());
    assert_eq!(feed.close_count(), 1);

    let snap = monitor.snapshot();
    assert_eq!(snap.len(), 100);
    assert_eq!(snap[0].value, 210.0);
    assert_eq!(snap[99].value, 1200.0);
    assert_eq!(snap[99].position, 119.0);

    let events = monitor.drain();
    let raw_lines = events
        .iter()
        .filter(|e| matches!(e, MonitorEvent::Line(_)))
        .count();
    assert_eq!(raw_lines, 121);
    assert_eq!(events.last(), Some(&MonitorEvent::Stopped));
}
