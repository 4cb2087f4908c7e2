// src/app/chart.rs
//
// plotters renderers shared by the front-ends.

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters_iced::{Chart, ChartBuilder, DrawingBackend};

use telemetry_monitor::gauge::{self, GaugeState, SEGMENT_COUNT, SEGMENT_DEGREES};
use telemetry_monitor::{Measurement, Viewport};

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

// ---------------- Line chart ----------------

pub struct SeriesChart {
    pub points: Vec<Measurement>,
    pub viewport: Viewport,
    pub caption: &'static str,
    pub x_desc: &'static str,
    pub y_desc: &'static str,
    pub overlay: Option<String>,
}

impl<Message> Chart<Message> for SeriesChart {
    type State = ();

    fn build_chart<DB: DrawingBackend>(&self, _state: &Self::State, builder: ChartBuilder<DB>) {
        if let Err(e) = self.draw(builder) {
            log::warn!("series chart: {e}");
        }
    }
}

impl SeriesChart {
    fn draw<DB: DrawingBackend>(&self, mut builder: ChartBuilder<DB>) -> DrawResult<DB> {
        let x = self.viewport.x;
        let y = self.viewport.y;

        let mut chart = builder
            .caption(self.caption, ("sans-serif", 20))
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x.lo..x.hi, y.lo..y.hi)?;

        chart
            .configure_mesh()
            .x_desc(self.x_desc)
            .y_desc(self.y_desc)
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        if !self.points.is_empty() {
            chart.draw_series(LineSeries::new(
                self.points.iter().map(|m| (m.position, m.value)),
                BLUE.stroke_width(2),
            ))?;
        }

        if let Some(overlay) = &self.overlay {
            // top-left corner of the plot area
            let pos = (x.lo + x.span() * 0.02, y.hi - y.span() * 0.03);
            chart.draw_series(std::iter::once(Text::new(
                overlay.clone(),
                pos,
                ("sans-serif", 16).into_font(),
            )))?;
        }
        Ok(())
    }
}

// ---------------- Servo gauge ----------------

const ARC_RADIUS: f64 = 1.7;
const OUTER_RING: f64 = 1.8;
const INNER_RING: f64 = 1.5;
const ARM_LENGTH: f64 = 1.3;
const INDICATOR_RADIUS: f64 = 1.45;

pub struct GaugeChart {
    pub state: GaugeState,
}

impl<Message> Chart<Message> for GaugeChart {
    type State = ();

    fn build_chart<DB: DrawingBackend>(&self, _state: &Self::State, builder: ChartBuilder<DB>) {
        if let Err(e) = self.draw(builder) {
            log::warn!("gauge chart: {e}");
        }
    }
}

fn rgb(angle: f64) -> RGBColor {
    let (r, g, b) = gauge::angle_color(angle).to_rgb8();
    RGBColor(r, g, b)
}

/// Closed polyline approximating a circle.
fn circle(center: (f64, f64), radius: f64) -> Vec<(f64, f64)> {
    (0..=72)
        .map(|i| {
            let (x, y) = gauge::polar_point(i as f64 * 5.0, radius);
            (center.0 + x, center.1 + y)
        })
        .collect()
}

impl GaugeChart {
    fn draw<DB: DrawingBackend>(&self, mut builder: ChartBuilder<DB>) -> DrawResult<DB> {
        let angle = self.state.angle() as f64;
        let color = rgb(angle);
        let highlighted = self.state.segment();

        let mut chart = builder
            .margin(10)
            .build_cartesian_2d(-2.2f64..2.2f64, -2.0f64..2.4f64)?;

        // colour-coded range arc, one wedge per segment
        for i in 0..SEGMENT_COUNT {
            let start = (i as u32 * SEGMENT_DEGREES as u32) as f64;
            let end = start + SEGMENT_DEGREES as f64;
            let mut wedge = vec![(0.0, 0.0)];
            wedge.extend((0..=5).map(|k| {
                gauge::polar_point(start + (end - start) * k as f64 / 5.0, ARC_RADIUS)
            }));
            let alpha = if i == highlighted { 1.0 } else { 0.8 };
            chart.draw_series(std::iter::once(Polygon::new(
                wedge,
                rgb(start + SEGMENT_DEGREES as f64 / 2.0).mix(alpha).filled(),
            )))?;
        }

        chart.draw_series(LineSeries::new(circle((0.0, 0.0), OUTER_RING), BLACK.stroke_width(4)))?;
        chart.draw_series(LineSeries::new(circle((0.0, 0.0), INNER_RING), BLACK.mix(0.6).stroke_width(2)))?;

        // major ticks with labels every 30, minor ticks in between
        for a in (0..=180u32).step_by(15) {
            let a = a as f64;
            let major = a % 30.0 == 0.0;
            let inner = if major { INNER_RING } else { 1.55 };
            let width = if major { 4 } else { 2 };
            chart.draw_series(LineSeries::new(
                vec![gauge::polar_point(a, inner), gauge::polar_point(a, 1.65)],
                BLACK.stroke_width(width),
            ))?;
            if major {
                let (lx, ly) = gauge::polar_point(a, 1.95);
                chart.draw_series(std::iter::once(Text::new(
                    format!("{a:.0}°"),
                    (lx - 0.12, ly + 0.08),
                    ("sans-serif", 16).into_font(),
                )))?;
            }
        }

        chart.draw_series(LineSeries::new(
            vec![(0.0, 0.0), gauge::polar_point(angle, ARM_LENGTH)],
            color.stroke_width(8),
        ))?;

        let indicator = gauge::polar_point(angle, INDICATOR_RADIUS);
        chart.draw_series(std::iter::once(Polygon::new(circle(indicator, 0.15), color.filled())))?;
        chart.draw_series(LineSeries::new(circle(indicator, 0.15), BLACK.stroke_width(3)))?;
        chart.draw_series(std::iter::once(Polygon::new(circle((0.0, 0.0), 0.05), WHITE.filled())))?;

        chart.draw_series(std::iter::once(Text::new(
            "SERVO ANGLE",
            (-0.55, 2.3),
            ("sans-serif", 18).into_font().color(&MAGENTA),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{}°", self.state.angle()),
            (-0.25, -1.45),
            ("sans-serif", 32).into_font().color(&color),
        )))?;
        Ok(())
    }
}
