//! Live series buffering and the axis policy the charts draw with.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// One reading and where it sits on the horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Elapsed seconds or sample index, depending on [`PositionMode`]
    pub position: f64,
    pub value: f64,
}

/// How many measurements a [`SeriesBuffer`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Keep the whole session
    Unbounded,
    /// Keep the most recent N, evicting the oldest first
    Bounded(usize),
}

/// What the horizontal position of a measurement means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionMode {
    /// Seconds since monitoring started
    ElapsedTime,
    /// 0, 1, 2, ... per accepted reading
    #[default]
    SampleIndex,
}

/// Hands out non-decreasing positions for one monitoring session.
#[derive(Debug, Clone)]
pub struct PositionClock {
    mode: PositionMode,
    started: Instant,
    next_index: u64,
}

impl PositionClock {
    pub fn start(mode: PositionMode) -> Self {
        Self {
            mode,
            started: Instant::now(),
            next_index: 0,
        }
    }

    pub fn mode(&self) -> PositionMode {
        self.mode
    }

    /// Position for the next accepted reading.
    pub fn next_position(&mut self) -> f64 {
        match self.mode {
            PositionMode::ElapsedTime => self.started.elapsed().as_secs_f64(),
            PositionMode::SampleIndex => {
                let idx = self.next_index;
                self.next_index += 1;
                idx as f64
            }
        }
    }
}

/// Ordered measurements for one session, optionally bounded.
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    entries: VecDeque<Measurement>,
    capacity: Capacity,
    latest: Option<Measurement>,
}

impl SeriesBuffer {
    /// A bounded capacity of zero is treated as one.
    pub fn new(capacity: Capacity) -> Self {
        let capacity = match capacity {
            Capacity::Bounded(n) => Capacity::Bounded(n.max(1)),
            Capacity::Unbounded => Capacity::Unbounded,
        };
        let entries = match capacity {
            Capacity::Bounded(n) => VecDeque::with_capacity(n),
            Capacity::Unbounded => VecDeque::new(),
        };
        Self {
            entries,
            capacity,
            latest: None,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(Capacity::Unbounded)
    }

    pub fn bounded(n: usize) -> Self {
        Self::new(Capacity::Bounded(n))
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Appends one reading, evicting the oldest entry when a bounded buffer is full.
    ///
    /// A position earlier than the previous one is raised to it so positions
    /// never go backwards. Returns the stored measurement.
    pub fn append(&mut self, value: f64, position: f64) -> Measurement {
        let position = match self.latest {
            Some(prev) if position < prev.position => prev.position,
            _ => position,
        };
        let m = Measurement { position, value };

        if let Capacity::Bounded(n) = self.capacity {
            while self.entries.len() >= n {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(m);
        self.latest = Some(m);
        m
    }

    /// Copy of the held measurements, oldest first.
    pub fn snapshot(&self) -> Vec<Measurement> {
        self.entries.iter().copied().collect()
    }

    /// Most recent value, or 0.0 before the first reading.
    pub fn current(&self) -> f64 {
        self.latest.map(|m| m.value).unwrap_or(0.0)
    }

    pub fn latest(&self) -> Option<Measurement> {
        self.latest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest = None;
    }
}

/// A [`SeriesBuffer`] shared between a reader thread and the UI.
///
/// Every read hands out a copy, so a reader never sees a half-applied append.
#[derive(Debug, Clone)]
pub struct SharedSeries {
    inner: Arc<Mutex<SeriesBuffer>>,
}

impl SharedSeries {
    pub fn new(buffer: SeriesBuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SeriesBuffer> {
        // a panic elsewhere cannot leave a measurement half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, value: f64, position: f64) -> Measurement {
        self.lock().append(value, position)
    }

    pub fn snapshot(&self) -> Vec<Measurement> {
        self.lock().snapshot()
    }

    pub fn current(&self) -> f64 {
        self.lock().current()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }
}

// ---------------- Axis scaling ----------------

/// Margin added around the visible values when the vertical range grows.
pub const Y_MARGIN: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub lo: f64,
    pub hi: f64,
}

impl AxisRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }

    pub fn span(&self) -> f64 {
        self.hi - self.lo
    }
}

/// How the horizontal range follows new data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XTracking {
    /// Anchored at zero; once the newest position gets within `lead` of the
    /// right edge the edge moves to `newest + pad`.
    FromZero { lead: f64, pad: f64 },
    /// Oldest to newest held position.
    Window,
}

/// Displayed axis ranges, widened as readings arrive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: AxisRange,
    pub y: AxisRange,
    tracking: XTracking,
}

impl Viewport {
    pub fn new(x: AxisRange, y: AxisRange, tracking: XTracking) -> Self {
        Self { x, y, tracking }
    }

    /// 0-60 s by 0-50, growing to the right in 20 s steps.
    pub fn time_based() -> Self {
        Self::new(
            AxisRange::new(0.0, 60.0),
            AxisRange::new(0.0, 50.0),
            XTracking::FromZero {
                lead: 10.0,
                pad: 20.0,
            },
        )
    }

    pub fn sliding_window(y: AxisRange) -> Self {
        Self::new(AxisRange::new(0.0, 1.0), y, XTracking::Window)
    }

    pub fn tracking(&self) -> XTracking {
        self.tracking
    }

    /// Adjusts both axes after a reading was appended.
    ///
    /// `visible` is the buffer content, oldest first; its last entry is the
    /// newest reading. Any number of readings may have been appended since
    /// the previous call.
    pub fn observe<I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = Measurement>,
    {
        let mut iter = visible.into_iter();
        let Some(first) = iter.next() else {
            return;
        };
        let (newest, lo, hi) = iter.fold((first, first.value, first.value), |(_, lo, hi), m| {
            (m, lo.min(m.value), hi.max(m.value))
        });

        // several readings may have arrived since the last call
        if lo < self.y.lo || hi > self.y.hi {
            self.y = AxisRange::new(lo - Y_MARGIN, hi + Y_MARGIN);
        }

        match self.tracking {
            XTracking::FromZero { lead, pad } => {
                if newest.position > self.x.hi - lead {
                    self.x = AxisRange::new(0.0, newest.position + pad);
                }
            }
            XTracking::Window => {
                let hi = newest.position.max(first.position + 1.0);
                self.x = AxisRange::new(first.position, hi);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(buf: &SeriesBuffer) -> Vec<f64> {
        buf.snapshot().iter().map(|m| m.value).collect()
    }

    #[test]
    fn bounded_buffer_keeps_the_last_n_in_order() {
        let mut buf = SeriesBuffer::bounded(100);
        for i in 0..250 {
            buf.append(i as f64, i as f64);
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 100);
        assert_eq!(snap[0].value, 150.0);
        assert_eq!(snap[99].value, 249.0);
        assert!(snap.windows(2).all(|w| w[0].value + 1.0 == w[1].value));
    }

    #[test]
    fn unbounded_buffer_keeps_everything() {
        let mut buf = SeriesBuffer::unbounded();
        for i in 0..5000 {
            buf.append(i as f64 * 0.5, i as f64);
        }
        assert_eq!(buf.len(), 5000);
        assert_eq!(buf.snapshot()[4999].value, 2499.5);
    }

    #[test]
    fn current_defaults_to_zero_then_tracks_the_last_append() {
        let mut buf = SeriesBuffer::bounded(2);
        assert_eq!(buf.current(), 0.0);
        buf.append(3.0, 0.0);
        buf.append(4.0, 1.0);
        buf.append(5.0, 2.0);
        assert_eq!(buf.current(), 5.0);
        assert_eq!(values(&buf), vec![4.0, 5.0]);
    }

    #[test]
    fn positions_never_go_backwards() {
        let mut buf = SeriesBuffer::unbounded();
        buf.append(1.0, 5.0);
        let m = buf.append(2.0, 3.0);
        assert_eq!(m.position, 5.0);
    }

    #[test]
    fn zero_capacity_still_holds_the_latest() {
        let mut buf = SeriesBuffer::bounded(0);
        buf.append(1.0, 0.0);
        buf.append(2.0, 1.0);
        assert_eq!(values(&buf), vec![2.0]);
    }

    #[test]
    fn sample_index_clock_counts_up() {
        let mut clock = PositionClock::start(PositionMode::SampleIndex);
        let got: Vec<f64> = (0..3).map(|_| clock.next_position()).collect();
        assert_eq!(got, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn elapsed_clock_is_non_decreasing() {
        let mut clock = PositionClock::start(PositionMode::ElapsedTime);
        let a = clock.next_position();
        let b = clock.next_position();
        assert!(a >= 0.0 && b >= a);
    }

    #[test]
    fn shared_series_snapshots_from_another_thread() {
        let shared = SharedSeries::new(SeriesBuffer::bounded(10));
        let writer = shared.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..1000 {
                writer.append(i as f64, i as f64);
            }
        });
        for _ in 0..100 {
            let snap = shared.snapshot();
            assert!(snap.len() <= 10);
            assert!(snap.windows(2).all(|w| w[0].value + 1.0 == w[1].value));
        }
        handle.join().unwrap();
        assert_eq!(shared.current(), 999.0);
    }

    #[test]
    fn viewport_widens_around_out_of_range_values() {
        let mut buf = SeriesBuffer::unbounded();
        let mut view = Viewport::time_based();

        buf.append(23.5, 1.0);
        view.observe(buf.iter().copied());
        assert_eq!(view.y, AxisRange::new(0.0, 50.0));

        buf.append(-1.0, 2.0);
        view.observe(buf.iter().copied());
        assert_eq!(view.y, AxisRange::new(-3.0, 25.5));
        assert!(view.y.lo <= -1.0 - Y_MARGIN && view.y.hi >= -1.0 + Y_MARGIN);
    }

    #[test]
    fn viewport_range_covers_all_visible_values() {
        let mut buf = SeriesBuffer::bounded(5);
        let mut view = Viewport::sliding_window(AxisRange::new(0.0, 10.0));
        for (i, v) in [5.0, 80.0, -20.0, 7.0, 300.0, 6.0].into_iter().enumerate() {
            buf.append(v, i as f64);
            view.observe(buf.iter().copied());
            assert!(buf.iter().all(|m| view.y.contains(m.value)));
        }
    }

    #[test]
    fn viewport_covers_a_batch_appended_between_observations() {
        let mut buf = SeriesBuffer::bounded(100);
        let mut view = Viewport::sliding_window(AxisRange::new(0.0, 100.0));

        // the newest value is in range, an earlier one is not
        buf.append(500.0, 0.0);
        buf.append(50.0, 1.0);
        view.observe(buf.iter().copied());
        assert_eq!(view.y, AxisRange::new(48.0, 502.0));

        buf.append(-40.0, 2.0);
        buf.append(60.0, 3.0);
        buf.append(70.0, 4.0);
        view.observe(buf.iter().copied());
        assert!(buf.iter().all(|m| view.y.contains(m.value)), "{:?}", view.y);
        assert_eq!(view.y, AxisRange::new(-42.0, 502.0));
    }

    #[test]
    fn time_based_x_axis_grows_with_padding() {
        let mut buf = SeriesBuffer::unbounded();
        let mut view = Viewport::time_based();
        buf.append(20.0, 49.0);
        view.observe(buf.iter().copied());
        assert_eq!(view.x, AxisRange::new(0.0, 60.0));
        buf.append(20.0, 51.0);
        view.observe(buf.iter().copied());
        assert_eq!(view.x, AxisRange::new(0.0, 71.0));
    }

    #[test]
    fn window_x_axis_follows_oldest_and_newest() {
        let mut buf = SeriesBuffer::bounded(3);
        let mut view = Viewport::sliding_window(AxisRange::new(0.0, 10.0));
        for i in 0..6 {
            buf.append(1.0, i as f64);
        }
        view.observe(buf.iter().copied());
        assert_eq!(view.x, AxisRange::new(3.0, 5.0));
    }
}
