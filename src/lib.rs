//! Live telemetry from a microcontroller's serial console.
//!
//! Lines arrive over a [`link::LineSource`], a [`decode::LineDecoder`] turns
//! them into readings and a [`series::SeriesBuffer`] holds what the charts
//! draw. Two polling shapes are provided: [`session::TickSession`], stepped
//! once per timer tick on the UI thread, and [`monitor::Monitor`], which reads
//! on its own thread and reports over a channel.
//!
//! Nothing here depends on a GUI toolkit.

pub mod decode;
pub mod error;
pub mod gauge;
pub mod link;
pub mod monitor;
pub mod series;
pub mod session;
pub mod settings;

pub use decode::{AngleDecoder, FrequencyDecoder, LineDecoder, TemperatureDecoder};
pub use error::{Error, Result};
pub use gauge::GaugeState;
pub use link::{LineSource, LinkSettings, MemoryFeed, MemoryLink, SerialLink};
pub use monitor::{Monitor, MonitorEvent};
pub use series::{Capacity, Measurement, PositionMode, SeriesBuffer, SharedSeries, Viewport};
pub use session::{TickOutcome, TickSession, Ticker};
pub use settings::AppSettings;
