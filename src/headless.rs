// src/headless.rs
//
// Window-less runs: readings go to the log instead of a chart.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use telemetry_monitor::series::PositionClock;
use telemetry_monitor::{
    AngleDecoder, Capacity, FrequencyDecoder, GaugeState, LineDecoder, LineSource, Monitor,
    MonitorEvent, PositionMode, Result, SeriesBuffer, TemperatureDecoder, TickOutcome,
    TickSession, Ticker, Viewport,
};

/// Set when the user asks a headless run to end. Loops check it once per
/// tick and return, so the link is dropped (and logged) normally.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Watches for Ctrl+C on a small background runtime.
    pub fn on_ctrl_c() -> Result<Self> {
        let interrupt = Self::default();
        let flag = interrupt.clone();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("ctrl-c".to_string())
            .spawn(move || {
                rt.block_on(async {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            log::info!("interrupted, closing the link");
                            flag.trigger();
                        }
                        Err(e) => log::warn!("Ctrl+C handler unavailable: {e}"),
                    }
                })
            })?;
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ticks `session` every `period` until the link fails or `interrupt` is set.
fn run_ticks<S, D, F>(
    mut session: TickSession<S, D>,
    period: Duration,
    interrupt: &Interrupt,
    mut on_reading: F,
) -> Result<()>
where
    S: LineSource,
    D: LineDecoder,
    F: FnMut(D::Output),
{
    let mut outcome = Ok(());
    Ticker::new(period).run(|| {
        if interrupt.is_set() {
            return ControlFlow::Break(());
        }
        match session.tick() {
            Ok(TickOutcome::Reading(v)) => {
                on_reading(v);
                ControlFlow::Continue(())
            }
            Ok(_) => ControlFlow::Continue(()),
            Err(e) => {
                outcome = Err(e);
                ControlFlow::Break(())
            }
        }
    });
    outcome
}

pub fn temperature<S: LineSource>(link: S, period: Duration, interrupt: &Interrupt) -> Result<()> {
    let mut clock = PositionClock::start(PositionMode::ElapsedTime);
    let mut series = SeriesBuffer::unbounded();
    let mut view = Viewport::time_based();

    let session = TickSession::new(link, TemperatureDecoder);
    run_ticks(session, period, interrupt, |celsius| {
        let m = series.append(celsius, clock.next_position());
        view.observe(series.iter().copied());
        log::info!(
            "time {:.1}s, temperature {:.1}°C (y {:.1}..{:.1})",
            m.position,
            m.value,
            view.y.lo,
            view.y.hi
        );
    })
}

pub fn servo<S: LineSource>(link: S, period: Duration, interrupt: &Interrupt) -> Result<()> {
    let mut gauge = GaugeState::new();

    run_ticks(TickSession::new(link, AngleDecoder), period, interrupt, |angle| {
        if angle != gauge.angle() {
            gauge.set(angle);
            log::info!("servo angle {}° (segment {})", gauge.angle(), gauge.segment());
        }
    })
}

/// Runs the background reader and logs its events until it stops.
pub fn frequency<S: LineSource + 'static>(
    link: S,
    mode: PositionMode,
    window: usize,
    interrupt: &Interrupt,
) -> Result<()> {
    let mut monitor = Monitor::new(Capacity::Bounded(window), mode);
    monitor.start(link, FrequencyDecoder)?;

    let mut failure = None;
    Ticker::new(Duration::from_millis(100)).run(|| {
        for event in monitor.drain() {
            match event {
                MonitorEvent::Line(line) => log::debug!("raw: {line}"),
                MonitorEvent::Reading(m) => {
                    log::info!("frequency {} Hz ({} held)", m.value, monitor.series().len())
                }
                MonitorEvent::Error(msg) => failure = Some(msg),
                MonitorEvent::Stopped => return ControlFlow::Break(()),
            }
        }
        if interrupt.is_set() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    monitor.stop()?;
    if let Some(msg) = failure {
        log::error!("reader stopped: {msg}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_monitor::MemoryLink;

    fn interrupt_after(ms: u64) -> Interrupt {
        let interrupt = Interrupt::default();
        let flag = interrupt.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            flag.trigger();
        });
        interrupt
    }

    #[test]
    fn interrupt_ends_an_idle_temperature_run_and_closes_the_link() {
        let (link, feed) = MemoryLink::with_lines("mem", ["23.5°C"]);

        temperature(link, Duration::from_millis(1), &interrupt_after(50)).unwrap();

        assert_eq!(feed.pending(), 0);
        assert_eq!(feed.close_count(), 1);
    }

    #[test]
    fn interrupt_set_before_the_first_tick_reads_nothing() {
        let (link, feed) = MemoryLink::with_lines("mem", ["ANGLE:90"]);
        let interrupt = Interrupt::default();
        interrupt.trigger();

        servo(link, Duration::from_millis(1), &interrupt).unwrap();

        assert_eq!(feed.pending(), 1);
        assert_eq!(feed.close_count(), 1);
    }

    #[test]
    fn interrupt_stops_the_frequency_reader() {
        let (link, feed) = MemoryLink::with_lines("mem", ["Frequency: 50 Hz"]);

        frequency(link, PositionMode::SampleIndex, 100, &interrupt_after(150)).unwrap();

        assert_eq!(feed.close_count(), 1);
    }

    #[test]
    fn link_fault_ends_a_run_with_the_error() {
        let (link, feed) = MemoryLink::new("mem");
        feed.push_fault(std::io::ErrorKind::BrokenPipe);

        let result = temperature(link, Duration::from_millis(1), &Interrupt::default());

        assert!(result.is_err());
        assert_eq!(feed.close_count(), 1);
    }
}
