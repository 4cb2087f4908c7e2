//! Background reader: polls the link on its own thread and reports to the UI
//! through a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::decode::LineDecoder;
use crate::link::LineSource;
use crate::series::{Capacity, Measurement, PositionClock, PositionMode, SeriesBuffer, SharedSeries};
use crate::{Error, Result};

/// Pause between two availability checks on the reader thread.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sent from the reader thread to whoever owns the [`Monitor`].
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Every non-empty line received, decodable or not
    Line(String),
    /// A decoded reading, already appended to the series
    Reading(Measurement),
    /// Transport fault; the reader stops after sending it
    Error(String),
    /// The reader has exited and released the link
    Stopped,
}

/// Owns the reader thread and the series it fills.
///
/// `start` and `stop` may be called in any order and any number of times:
/// starting twice is rejected, stopping an idle monitor does nothing.
pub struct Monitor {
    series: SharedSeries,
    position_mode: PositionMode,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    events: Option<Receiver<MonitorEvent>>,
}

impl Monitor {
    pub fn new(capacity: Capacity, position_mode: PositionMode) -> Self {
        Self {
            series: SharedSeries::new(SeriesBuffer::new(capacity)),
            position_mode,
            poll_interval: POLL_INTERVAL,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            events: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn position_mode(&self) -> PositionMode {
        self.position_mode
    }

    /// True until the reader exits, whether by `stop` or by a transport fault.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Hands `source` to a new reader thread and clears the series.
    pub fn start<S, D>(&mut self, source: S, decoder: D) -> Result<()>
    where
        S: LineSource + 'static,
        D: LineDecoder + Send + 'static,
    {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }
        // reap a reader that ended on its own
        self.join_worker()?;

        self.series.clear();
        let (tx, rx) = channel();
        self.events = Some(rx);
        self.running.store(true, Ordering::Release);

        let reader = Reader {
            series: self.series.clone(),
            clock: PositionClock::start(self.position_mode),
            running: self.running.clone(),
            interval: self.poll_interval,
            tx,
        };
        log::info!("{}: monitoring started", source.name());
        self.worker = Some(thread::spawn(move || reader.run(source, decoder)));
        Ok(())
    }

    /// Asks the reader to exit and waits for it; the link is closed by then.
    ///
    /// Returns `false` when there was no reader to stop.
    pub fn stop(&mut self) -> Result<bool> {
        self.running.store(false, Ordering::Release);
        let had_worker = self.worker.is_some();
        self.join_worker()?;
        if had_worker {
            log::info!("monitoring stopped");
        }
        Ok(had_worker)
    }

    fn join_worker(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| Error::ReaderPanicked),
            None => Ok(()),
        }
    }

    /// Events queued since the last call, oldest first.
    pub fn drain(&self) -> Vec<MonitorEvent> {
        let mut out = Vec::new();
        if let Some(rx) = &self.events {
            loop {
                match rx.try_recv() {
                    Ok(ev) => out.push(ev),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        out
    }

    pub fn snapshot(&self) -> Vec<Measurement> {
        self.series.snapshot()
    }

    pub fn current(&self) -> f64 {
        self.series.current()
    }

    pub fn series(&self) -> &SharedSeries {
        &self.series
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("stopping monitor on drop: {e}");
        }
    }
}

struct Reader {
    series: SharedSeries,
    clock: PositionClock,
    running: Arc<AtomicBool>,
    interval: Duration,
    tx: Sender<MonitorEvent>,
}

impl Reader {
    fn run<S: LineSource, D: LineDecoder>(mut self, mut source: S, decoder: D) {
        while self.running.load(Ordering::Acquire) {
            match poll_line(&mut source) {
                Ok(Some(line)) => self.handle_line(source.name(), line, &decoder),
                Ok(None) => {}
                Err(e) => {
                    log::error!("{}: read error: {e}", source.name());
                    let _ = self.tx.send(MonitorEvent::Error(e.to_string()));
                    break;
                }
            }
            thread::sleep(self.interval);
        }

        self.running.store(false, Ordering::Release);
        drop(source);
        let _ = self.tx.send(MonitorEvent::Stopped);
    }

    fn handle_line<D: LineDecoder>(&mut self, name: &str, line: String, decoder: &D) {
        let reading = decoder.decode(&line);
        let _ = self.tx.send(MonitorEvent::Line(line));

        match reading {
            Some(v) => {
                let m = self.series.append(D::to_value(v), self.clock.next_position());
                log::debug!("{name}: reading {v:?} at {:.2}", m.position);
                let _ = self.tx.send(MonitorEvent::Reading(m));
            }
            None => log::debug!("{name}: line carried no reading"),
        }
    }
}

fn poll_line<S: LineSource>(source: &mut S) -> Result<Option<String>> {
    if source.bytes_available()? == 0 {
        return Ok(None);
    }
    source.read_line()
}
