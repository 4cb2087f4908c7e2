//! Line-oriented byte sources: the serial port, and an in-memory stand-in.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::SerialPort;

use crate::{Error, Result};

/// Read timeout used when none is configured.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Something that yields newline-terminated text lines.
///
/// Implementors own their handle; dropping the source releases it.
pub trait LineSource: Send {
    /// Bytes waiting to be read. Must not block.
    fn bytes_available(&mut self) -> Result<u32>;

    /// Reads up to the next `\n`, waiting at most the read timeout.
    ///
    /// Returns the line with surrounding whitespace removed, or `None` when
    /// nothing usable arrived (timeout, blank line, invalid UTF-8).
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Port or source name used in log and status messages.
    fn name(&self) -> &str;
}

fn line_from_bytes(raw: Vec<u8>, source: &str) -> Option<String> {
    match String::from_utf8(raw) {
        Ok(s) => {
            let line = s.trim();
            if line.is_empty() {
                None
            } else {
                Some(line.to_string())
            }
        }
        Err(e) => {
            log::debug!("{source}: dropping line that is not UTF-8: {e}");
            None
        }
    }
}

// ---------------- Serial framing options ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBitsOpt {
    Seven,
    Eight,
}

impl DataBitsOpt {
    pub const ALL: [DataBitsOpt; 2] = [DataBitsOpt::Seven, DataBitsOpt::Eight];
}

// labels shown in the framing pickers
impl std::fmt::Display for DataBitsOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataBitsOpt::Seven => "7 data bits",
            DataBitsOpt::Eight => "8 data bits",
        })
    }
}

impl From<DataBitsOpt> for serialport::DataBits {
    fn from(v: DataBitsOpt) -> Self {
        match v {
            DataBitsOpt::Seven => serialport::DataBits::Seven,
            DataBitsOpt::Eight => serialport::DataBits::Eight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParityOpt {
    None,
    Even,
    Odd,
}

impl ParityOpt {
    pub const ALL: [ParityOpt; 3] = [ParityOpt::None, ParityOpt::Even, ParityOpt::Odd];
}

impl std::fmt::Display for ParityOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ParityOpt::None => "no parity",
            ParityOpt::Even => "even parity",
            ParityOpt::Odd => "odd parity",
        })
    }
}

impl From<ParityOpt> for serialport::Parity {
    fn from(v: ParityOpt) -> Self {
        match v {
            ParityOpt::None => serialport::Parity::None,
            ParityOpt::Even => serialport::Parity::Even,
            ParityOpt::Odd => serialport::Parity::Odd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBitsOpt {
    One,
    Two,
}

impl StopBitsOpt {
    pub const ALL: [StopBitsOpt; 2] = [StopBitsOpt::One, StopBitsOpt::Two];
}

impl std::fmt::Display for StopBitsOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StopBitsOpt::One => "1 stop bit",
            StopBitsOpt::Two => "2 stop bits",
        })
    }
}

impl From<StopBitsOpt> for serialport::StopBits {
    fn from(v: StopBitsOpt) -> Self {
        match v {
            StopBitsOpt::One => serialport::StopBits::One,
            StopBitsOpt::Two => serialport::StopBits::Two,
        }
    }
}

/// Everything needed to open the serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBitsOpt,
    pub parity: ParityOpt,
    pub stop_bits: StopBitsOpt,
    pub timeout: Duration,
}

impl LinkSettings {
    /// 8N1 with the default read timeout.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: DataBitsOpt::Eight,
            parity: ParityOpt::None,
            stop_bits: StopBitsOpt::One,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

// ---------------- Serial port ----------------

/// An open serial port. Closed when dropped.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Opens the port; blocks until the driver succeeds or fails.
    pub fn open(settings: &LinkSettings) -> Result<Self> {
        let port = serialport::new(&settings.port_name, settings.baud_rate)
            .timeout(settings.timeout)
            .data_bits(settings.data_bits.into())
            .parity(settings.parity.into())
            .stop_bits(settings.stop_bits.into())
            .open()
            .map_err(|source| Error::Open {
                port: settings.port_name.clone(),
                source,
            })?;

        log::info!(
            "connected to {} at {} baud",
            settings.port_name,
            settings.baud_rate
        );
        Ok(Self {
            port,
            name: settings.port_name.clone(),
        })
    }
}

impl LineSource for SerialLink {
    fn bytes_available(&mut self) -> Result<u32> {
        Ok(self.port.bytes_to_read()?)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut raw = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => raw.push(byte[0]),
                // partial line on timeout, like a plain readline
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(line_from_bytes(raw, &self.name))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        log::info!("{}: serial port closed", self.name);
    }
}

// ---------------- Port discovery ----------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// What `SerialLink::open` needs, e.g. `COM4`.
    pub port_name: String,
    /// Picker label, e.g. `COM4: STMicroelectronics STLink`.
    pub display: String,
}

impl PortEntry {
    /// The entry in `ports` for `name`, compared case-insensitively.
    pub fn find<'a>(ports: &'a [PortEntry], name: &str) -> Option<&'a PortEntry> {
        ports.iter().find(|p| p.port_name.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for PortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Lists serial ports known to the OS, sorted by description.
pub fn scan_ports() -> Vec<PortEntry> {
    let ports = match serialport::available_ports() {
        Ok(p) => p,
        Err(e) => {
            log::warn!("port scan failed: {e}");
            return Vec::new();
        }
    };

    let mut out: Vec<PortEntry> = ports
        .into_iter()
        .map(|p| {
            let display = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    let parts: Vec<String> =
                        [info.manufacturer, info.product].into_iter().flatten().collect();
                    if parts.is_empty() {
                        format!("{}: USB Serial", p.port_name)
                    } else {
                        format!("{}: {}", p.port_name, parts.join(" "))
                    }
                }
                serialport::SerialPortType::BluetoothPort => format!("{}: Bluetooth", p.port_name),
                serialport::SerialPortType::PciPort => format!("{}: PCI", p.port_name),
                serialport::SerialPortType::Unknown => p.port_name.clone(),
            };
            PortEntry {
                port_name: p.port_name,
                display,
            }
        })
        .collect();

    out.sort_by(|a, b| a.display.cmp(&b.display));
    out
}

// ---------------- In-memory link ----------------

enum Chunk {
    Bytes(Vec<u8>),
    Fault(io::ErrorKind),
}

#[derive(Default)]
struct MemoryState {
    chunks: VecDeque<Chunk>,
}

/// In-process [`LineSource`] fed through a [`MemoryFeed`].
///
/// Behaves like a port with nothing pending once the queue is empty. Used
/// for tests and dry runs without hardware.
pub struct MemoryLink {
    state: Arc<Mutex<MemoryState>>,
    closed: Arc<AtomicUsize>,
    name: String,
}

/// Writer side of a [`MemoryLink`].
#[derive(Clone)]
pub struct MemoryFeed {
    state: Arc<Mutex<MemoryState>>,
    closed: Arc<AtomicUsize>,
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryLink {
    pub fn new(name: impl Into<String>) -> (MemoryLink, MemoryFeed) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        let closed = Arc::new(AtomicUsize::new(0));
        let link = MemoryLink {
            state: state.clone(),
            closed: closed.clone(),
            name: name.into(),
        };
        (link, MemoryFeed { state, closed })
    }

    /// A link pre-loaded with `lines`.
    pub fn with_lines<I, S>(name: impl Into<String>, lines: I) -> (MemoryLink, MemoryFeed)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (link, feed) = Self::new(name);
        for line in lines {
            feed.push_line(line.as_ref());
        }
        (link, feed)
    }
}

impl MemoryFeed {
    /// Queues `line` followed by `\r\n`.
    pub fn push_line(&self, line: &str) {
        let mut raw = line.as_bytes().to_vec();
        raw.extend_from_slice(b"\r\n");
        self.push_bytes(raw);
    }

    /// Queues one raw line; the terminator is up to the caller.
    pub fn push_bytes(&self, raw: Vec<u8>) {
        lock_state(&self.state).chunks.push_back(Chunk::Bytes(raw));
    }

    /// The next read fails with an I/O error of `kind`.
    pub fn push_fault(&self, kind: io::ErrorKind) {
        lock_state(&self.state).chunks.push_back(Chunk::Fault(kind));
    }

    /// Lines not yet consumed.
    pub fn pending(&self) -> usize {
        lock_state(&self.state).chunks.len()
    }

    /// How many times the link was dropped (0 or 1).
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl LineSource for MemoryLink {
    fn bytes_available(&mut self) -> Result<u32> {
        let state = lock_state(&self.state);
        Ok(match state.chunks.front() {
            Some(Chunk::Bytes(b)) => b.len() as u32,
            // surface the fault on the following read
            Some(Chunk::Fault(_)) => 1,
            None => 0,
        })
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let next = lock_state(&self.state).chunks.pop_front();
        match next {
            Some(Chunk::Bytes(mut raw)) => {
                if let Some(end) = raw.iter().position(|&b| b == b'\n') {
                    raw.truncate(end);
                }
                Ok(line_from_bytes(raw, &self.name))
            }
            Some(Chunk::Fault(kind)) => Err(io::Error::new(kind, "injected link fault").into()),
            None => Ok(None),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
