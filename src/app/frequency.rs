// src/app/frequency.rs
//
// Frequency monitor: Start/Stop controlled background reader, live value,
// status line, raw line log and a sliding-window chart of the last 100.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use iced::time;
use iced::widget::scrollable::RelativeOffset;
use iced::widget::{button, column, pick_list, row, scrollable, text, text_input, Column};
use iced::{Alignment, Color, Element, Length, Size, Subscription, Task};
use plotters_iced::ChartWidget;

use telemetry_monitor::link::{scan_ports, DataBitsOpt, ParityOpt, PortEntry, StopBitsOpt};
use telemetry_monitor::series::AxisRange;
use telemetry_monitor::{
    AppSettings, Capacity, FrequencyDecoder, Measurement, Monitor, MonitorEvent, PositionMode,
    SerialLink, Viewport,
};

use super::chart::SeriesChart;

pub const WINDOW: usize = 100;
pub const BAUD_RATES: [u32; 3] = [9600, 38400, 115200];
const RAW_LOG_LINES: usize = 1000;

#[derive(Debug, Clone)]
pub enum Message {
    PortChanged(String),
    PortSelected(PortEntry),
    BaudRateSelected(u32),
    DataBitsSelected(DataBitsOpt),
    ParitySelected(ParityOpt),
    StopBitsSelected(StopBitsOpt),
    Start,
    Stop,
    Tick,
    RefreshPorts,
}

struct FrequencyApp {
    monitor: Monitor,
    settings: AppSettings,
    settings_path: PathBuf,
    available_ports: Vec<PortEntry>,

    frequency: Option<u64>,
    status: String,
    raw_log: VecDeque<String>,
    points: Vec<Measurement>,
    viewport: Viewport,
}

impl FrequencyApp {
    fn new(port: Option<String>, baud: Option<u32>, mode: PositionMode) -> Self {
        let settings_path = AppSettings::default_path();
        let mut settings = AppSettings::load_or_default(&settings_path);
        if let Some(p) = port {
            settings.port_name = p;
        }
        if let Some(b) = baud {
            settings.baud_rate = b;
        }

        Self {
            monitor: Monitor::new(Capacity::Bounded(WINDOW), mode),
            settings,
            settings_path,
            available_ports: scan_ports(),
            frequency: None,
            status: "Status: Disconnected".to_string(),
            raw_log: VecDeque::new(),
            points: Vec::new(),
            viewport: initial_viewport(),
        }
    }

    fn title(&self) -> String {
        "Frequency Monitor - Timer Input Capture".to_string()
    }

    fn start_monitoring(&mut self) {
        if self.monitor.is_running() {
            return;
        }

        let link = match SerialLink::open(&self.settings.link_settings()) {
            Ok(l) => l,
            Err(e) => {
                self.status = format!("Error: {e}");
                return;
            }
        };

        match self.monitor.start(link, FrequencyDecoder) {
            Ok(()) => {
                self.status = format!("Status: Connected to {}", self.settings.port_name);
                self.points.clear();
                self.viewport = initial_viewport();
                if let Err(e) = self.settings.save(&self.settings_path) {
                    log::warn!("settings save: {e}");
                }
            }
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn stop_monitoring(&mut self) -> bool {
        let stopped = self.monitor.stop();
        // pick up whatever the reader sent before it exited
        let logged = self.process_events();
        match stopped {
            Ok(_) => self.status = "Status: Disconnected".to_string(),
            Err(e) => self.status = format!("Error: {e}"),
        }
        logged
    }

    /// Returns true when lines were added to the raw log.
    fn process_events(&mut self) -> bool {
        let mut new_readings = false;
        let mut logged = false;

        for event in self.monitor.drain() {
            match event {
                MonitorEvent::Line(line) => {
                    let stamp = Local::now().format("%H:%M:%S%.3f");
                    self.raw_log.push_back(format!("{stamp}  {line}"));
                    logged = true;
                    while self.raw_log.len() > RAW_LOG_LINES {
                        self.raw_log.pop_front();
                    }
                }
                MonitorEvent::Reading(m) => {
                    self.frequency = Some(m.value as u64);
                    new_readings = true;
                }
                MonitorEvent::Error(msg) => self.status = format!("Read Error: {msg}"),
                MonitorEvent::Stopped => {}
            }
        }

        if new_readings {
            self.points = self.monitor.snapshot();
            self.viewport.observe(self.points.iter().copied());
        }
        logged
    }

    fn selected_port(&self) -> Option<PortEntry> {
        PortEntry::find(&self.available_ports, &self.settings.port_name).cloned()
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        // link settings are frozen while the reader owns the port
        let locked = self.monitor.is_running();

        match message {
            Message::PortChanged(p) if !locked => self.settings.port_name = p,
            Message::PortSelected(p) if !locked => self.settings.port_name = p.port_name,
            Message::BaudRateSelected(b) if !locked => self.settings.baud_rate = b,
            Message::DataBitsSelected(d) if !locked => self.settings.data_bits = d,
            Message::ParitySelected(p) if !locked => self.settings.parity = p,
            Message::StopBitsSelected(s) if !locked => self.settings.stop_bits = s,
            Message::PortChanged(_)
            | Message::PortSelected(_)
            | Message::BaudRateSelected(_)
            | Message::DataBitsSelected(_)
            | Message::ParitySelected(_)
            | Message::StopBitsSelected(_) => {}

            Message::Start => self.start_monitoring(),
            Message::Stop => {
                if self.stop_monitoring() {
                    return scroll_to_newest();
                }
            }
            Message::Tick => {
                if self.process_events() {
                    return scroll_to_newest();
                }
            }
            Message::RefreshPorts => self.available_ports = scan_ports(),
        }
        Task::none()
    }

    fn view(&self) -> Element<'_, Message> {
        fn action_button<'a>(
            label: &'a str,
            enabled: bool,
            msg: Message,
        ) -> iced::widget::Button<'a, Message> {
            let mut b = button(label);
            if enabled {
                b = b.on_press(msg);
            }
            b
        }

        let running = self.monitor.is_running();

        let controls: Element<'_, Message> = if running {
            text(format!(
                "COM Port: {}  Baudrate: {}  {}, {}, {}",
                self.settings.port_name,
                self.settings.baud_rate,
                self.settings.data_bits,
                self.settings.parity,
                self.settings.stop_bits
            ))
            .into()
        } else {
            column![
                row![
                    text("COM Port:"),
                    text_input("COM4", &self.settings.port_name)
                        .on_input(Message::PortChanged)
                        .width(Length::Fixed(140.0)),
                    pick_list(
                        self.available_ports.clone(),
                        self.selected_port(),
                        Message::PortSelected,
                    )
                    .placeholder("Detected ports")
                    .width(Length::Fill),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
                row![
                    text("Baudrate:"),
                    pick_list(BAUD_RATES, Some(self.settings.baud_rate), Message::BaudRateSelected)
                        .width(Length::Fixed(120.0)),
                    pick_list(DataBitsOpt::ALL, Some(self.settings.data_bits), Message::DataBitsSelected)
                        .width(Length::Fixed(130.0)),
                    pick_list(ParityOpt::ALL, Some(self.settings.parity), Message::ParitySelected)
                        .width(Length::Fixed(130.0)),
                    pick_list(StopBitsOpt::ALL, Some(self.settings.stop_bits), Message::StopBitsSelected)
                        .width(Length::Fixed(130.0)),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            ]
            .spacing(6)
            .into()
        };

        let buttons = row![
            action_button("Start", !running, Message::Start),
            action_button("Stop", running, Message::Stop),
        ]
        .spacing(10);

        let ports_hint = if self.available_ports.is_empty() {
            "No serial ports found".to_string()
        } else {
            format!("{} serial port(s) detected", self.available_ports.len())
        };

        let frequency_text = match self.frequency {
            Some(f) => format!("Frequency: {f} Hz"),
            None => "Frequency: --- Hz".to_string(),
        };

        let status_color = if self.status.contains("Error") {
            Color::from_rgb8(200, 0, 0)
        } else {
            Color::from_rgb8(90, 90, 90)
        };

        let chart = SeriesChart {
            points: self.points.clone(),
            viewport: self.viewport,
            caption: "Last 100 readings",
            x_desc: match self.monitor.position_mode() {
                PositionMode::SampleIndex => "Sample",
                PositionMode::ElapsedTime => "Time (s)",
            },
            y_desc: "Frequency (Hz)",
            overlay: None,
        };

        let raw = Column::with_children(
            self.raw_log
                .iter()
                .map(|l| text(l.as_str()).size(13.0).into()),
        );

        column![
            controls,
            text(ports_hint).size(12.0),
            buttons,
            text(frequency_text).size(28.0),
            text(&self.status).color(status_color),
            ChartWidget::new(chart)
                .width(Length::Fill)
                .height(Length::Fixed(260.0)),
            text("Raw Data"),
            scrollable(raw)
                .id(raw_log_id())
                .height(Length::Fill)
                .width(Length::Fill),
        ]
        .spacing(10)
        .padding(10)
        .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let events = time::every(Duration::from_millis(50)).map(|_| Message::Tick);
        let ports = time::every(Duration::from_secs(2)).map(|_| Message::RefreshPorts);
        Subscription::batch(vec![events, ports])
    }
}

fn raw_log_id() -> scrollable::Id {
    scrollable::Id::new("raw-log")
}

/// Keeps the raw log on its newest line.
fn scroll_to_newest() -> Task<Message> {
    scrollable::snap_to(raw_log_id(), RelativeOffset::END)
}

fn initial_viewport() -> Viewport {
    Viewport::sliding_window(AxisRange::new(0.0, 100.0))
}

/// Runs the monitor window. The serial port is opened on Start, not here.
pub fn run(port: Option<String>, baud: Option<u32>, mode: PositionMode) -> iced::Result {
    iced::application(FrequencyApp::title, FrequencyApp::update, FrequencyApp::view)
        .subscription(FrequencyApp::subscription)
        .window_size(Size::new(800.0, 760.0))
        .run_with(move || (FrequencyApp::new(port, baud, mode), Task::none()))
}
