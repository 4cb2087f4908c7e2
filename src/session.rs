//! Timer-driven polling: a toolkit-free ticker and the one-line-per-tick session.

use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use crate::decode::LineDecoder;
use crate::link::LineSource;
use crate::Result;

/// Calls a closure on a fixed period until it breaks.
///
/// GUI front-ends use their own timer instead; this drives headless runs
/// and tests.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    period: Duration,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs `on_tick` every period. A tick that overruns the period starts
    /// the next one immediately; ticks never overlap.
    pub fn run<F>(&self, mut on_tick: F)
    where
        F: FnMut() -> ControlFlow<()>,
    {
        loop {
            let started = Instant::now();
            if on_tick().is_break() {
                break;
            }
            if let Some(rest) = self.period.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome<T> {
    /// Nothing waiting on the link
    NoData,
    /// A line arrived but carried no reading
    Skipped(String),
    Reading(T),
}

impl<T: Copy> TickOutcome<T> {
    pub fn reading(&self) -> Option<T> {
        match self {
            TickOutcome::Reading(v) => Some(*v),
            _ => None,
        }
    }
}

/// Cooperative polling session: owns the link for its whole lifetime.
///
/// Each [`tick`](TickSession::tick) makes at most one availability check,
/// reads at most one line and decodes it. The link is released when the
/// session is dropped.
pub struct TickSession<S, D> {
    source: S,
    decoder: D,
}

impl<S, D> TickSession<S, D>
where
    S: LineSource,
    D: LineDecoder,
{
    pub fn new(source: S, decoder: D) -> Self {
        Self { source, decoder }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// One poll step. Errors are transport faults only.
    pub fn tick(&mut self) -> Result<TickOutcome<D::Output>> {
        if self.source.bytes_available()? == 0 {
            return Ok(TickOutcome::NoData);
        }
        let Some(line) = self.source.read_line()? else {
            return Ok(TickOutcome::NoData);
        };

        log::debug!("{}: received {line:?}", self.source.name());
        match self.decoder.decode(&line) {
            Some(v) => Ok(TickOutcome::Reading(v)),
            None => {
                log::debug!("{}: no reading in {line:?}", self.source.name());
                Ok(TickOutcome::Skipped(line))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{AngleDecoder, TemperatureDecoder};
    use crate::link::MemoryLink;
    use crate::Error;

    #[test]
    fn ticker_runs_until_break() {
        let mut count = 0;
        Ticker::new(Duration::from_millis(1)).run(|| {
            count += 1;
            if count == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(count, 5);
    }

    #[test]
    fn ticker_waits_out_the_period() {
        let started = Instant::now();
        let mut ticks = 0;
        Ticker::new(Duration::from_millis(20)).run(|| {
            ticks += 1;
            if ticks == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn one_line_per_tick() {
        let (link, feed) = MemoryLink::with_lines("mem", ["ANGLE:10", "ANGLE:20"]);
        let mut session = TickSession::new(link, AngleDecoder);

        assert_eq!(session.tick().unwrap(), TickOutcome::Reading(10));
        assert_eq!(feed.pending(), 1);
        assert_eq!(session.tick().unwrap(), TickOutcome::Reading(20));
        assert_eq!(session.tick().unwrap(), TickOutcome::NoData);
    }

    #[test]
    fn undecodable_lines_are_skipped() {
        let (link, _feed) = MemoryLink::with_lines("mem", ["garbage", "21.0°C"]);
        let mut session = TickSession::new(link, TemperatureDecoder);

        assert_eq!(session.tick().unwrap(), TickOutcome::Skipped("garbage".into()));
        assert_eq!(session.tick().unwrap().reading(), Some(21.0));
    }

    #[test]
    fn transport_faults_surface_as_errors() {
        let (link, feed) = MemoryLink::new("mem");
        feed.push_fault(std::io::ErrorKind::BrokenPipe);
        let mut session = TickSession::new(link, TemperatureDecoder);
        assert!(matches!(session.tick(), Err(Error::Io(_))));
    }

    #[test]
    fn dropping_the_session_releases_the_link() {
        let (link, feed) = MemoryLink::new("mem");
        let session = TickSession::new(link, AngleDecoder);
        assert_eq!(session.source_name(), "mem");
        drop(session);
        assert_eq!(feed.close_count(), 1);
    }
}
