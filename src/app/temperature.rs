// src/app/temperature.rs
//
// Scrolling temperature chart. One cooperative poll per 100 ms tick; the
// whole session is kept and plotted against elapsed time.

use std::time::Duration;

use iced::time;
use iced::widget::{column, text};
use iced::{Color, Element, Length, Size, Subscription, Task};
use plotters_iced::ChartWidget;

use telemetry_monitor::series::PositionClock;
use telemetry_monitor::{
    PositionMode, SerialLink, SeriesBuffer, TemperatureDecoder, TickOutcome, TickSession,
    Viewport,
};

use super::chart::SeriesChart;

pub const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
}

struct TemperatureApp {
    session: Option<TickSession<SerialLink, TemperatureDecoder>>,
    port_name: String,
    clock: PositionClock,
    series: SeriesBuffer,
    viewport: Viewport,
    error: Option<String>,
}

impl TemperatureApp {
    fn new(link: SerialLink) -> Self {
        let session = TickSession::new(link, TemperatureDecoder);
        Self {
            port_name: session.source_name().to_string(),
            session: Some(session),
            clock: PositionClock::start(PositionMode::ElapsedTime),
            series: SeriesBuffer::unbounded(),
            viewport: Viewport::time_based(),
            error: None,
        }
    }

    fn title(&self) -> String {
        format!("Real-Time Temperature ({})", self.port_name)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => self.poll(),
        }
        Task::none()
    }

    fn poll(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.tick() {
            Ok(TickOutcome::Reading(celsius)) => {
                let m = self.series.append(celsius, self.clock.next_position());
                self.viewport.observe(self.series.iter().copied());
                log::debug!("time {:.1}s, temperature {:.1}°C", m.position, m.value);
            }
            Ok(TickOutcome::Skipped(_)) | Ok(TickOutcome::NoData) => {}
            Err(e) => {
                // no Start/Stop here: a dead link ends polling for good
                log::error!("{}: {e}", self.port_name);
                self.error = Some(format!("Serial error: {e}"));
                self.session = None;
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let overlay = self.series.latest().map(|m| {
            format!("Current Temp: {:.1}°C   Time: {:.1}s", m.value, m.position)
        });

        let chart = SeriesChart {
            points: self.series.snapshot(),
            viewport: self.viewport,
            caption: "Real-Time Temperature",
            x_desc: "Time (seconds since start)",
            y_desc: "Temperature (°C)",
            overlay,
        };

        let mut content = column![ChartWidget::new(chart)
            .width(Length::Fill)
            .height(Length::Fill)]
        .spacing(8)
        .padding(10);

        if let Some(err) = &self.error {
            content = content.push(text(err).color(Color::from_rgb8(200, 0, 0)));
        }
        content.into()
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.session.is_some() {
            time::every(TICK).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }
}

/// Runs the chart window until it is closed. The link is released on exit.
pub fn run(link: SerialLink) -> iced::Result {
    iced::application(TemperatureApp::title, TemperatureApp::update, TemperatureApp::view)
        .subscription(TemperatureApp::subscription)
        .window_size(Size::new(1000.0, 600.0))
        .antialiasing(true)
        .run_with(move || (TemperatureApp::new(link), Task::none()))
}
