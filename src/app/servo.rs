// src/app/servo.rs
//
// Circular servo gauge, polled cooperatively every 50 ms.

use std::time::Duration;

use iced::time;
use iced::widget::{column, text};
use iced::{Alignment, Color, Element, Length, Size, Subscription, Task};
use plotters_iced::ChartWidget;

use telemetry_monitor::{AngleDecoder, GaugeState, SerialLink, TickOutcome, TickSession};

use super::chart::GaugeChart;

pub const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
}

struct ServoApp {
    session: Option<TickSession<SerialLink, AngleDecoder>>,
    port_name: String,
    gauge: GaugeState,
    error: Option<String>,
}

impl ServoApp {
    fn new(link: SerialLink) -> Self {
        let session = TickSession::new(link, AngleDecoder);
        Self {
            port_name: session.source_name().to_string(),
            session: Some(session),
            gauge: GaugeState::new(),
            error: None,
        }
    }

    fn title(&self) -> String {
        format!("Servo Position Monitor ({})", self.port_name)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if let Some(session) = self.session.as_mut() {
                    match session.tick() {
                        Ok(TickOutcome::Reading(angle)) => self.gauge.set(angle),
                        Ok(_) => {}
                        Err(e) => {
                            log::error!("{}: {e}", self.port_name);
                            self.error = Some(format!("Serial error: {e}"));
                            self.session = None;
                        }
                    }
                }
            }
        }
        Task::none()
    }

    fn view(&self) -> Element<'_, Message> {
        let gauge = ChartWidget::new(GaugeChart { state: self.gauge })
            .width(Length::Fixed(700.0))
            .height(Length::Fixed(700.0));

        let mut content = column![
            text("Servo Position Monitor").size(26.0),
            gauge,
            text("Blue (0°) → Green (45°) → Yellow (90°) → Orange (135°) → Red (180°)").size(14.0),
        ]
        .spacing(8)
        .padding(10)
        .align_x(Alignment::Center);

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

pub fn run(link: SerialLink) -> iced::Result {
    iced::application(ServoApp::title, ServoApp::update, ServoApp::view)
        .subscription(ServoApp::subscription)
        .window_size(Size::new(760.0, 860.0))
        .antialiasing(true)
        .run_with(move || (ServoApp::new(link), Task::none()))
}
