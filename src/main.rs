// src/main.rs
//
// Live serial telemetry monitor: temperature chart, servo gauge and
// frequency monitor for a microcontroller's text console.

mod app;
mod headless;

use clap::{Parser, Subcommand, ValueEnum};

use telemetry_monitor::{LinkSettings, PositionMode, SerialLink};

const DEFAULT_PORT: &str = "COM4";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log readings instead of opening a window
    #[arg(long, global = true)]
    headless: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrolling chart of "<value>°C" style temperature lines
    Temperature(LinkArgs),
    /// Circular gauge for "ANGLE:<0-180>" lines
    Servo(LinkArgs),
    /// Start/Stop monitor for "Frequency: <n> Hz" lines
    Frequency {
        #[command(flatten)]
        link: LinkArgs,

        /// Horizontal axis of the sliding window
        #[arg(long, value_enum, default_value_t = XAxis::Index)]
        x_axis: XAxis,
    },
}

#[derive(clap::Args)]
struct LinkArgs {
    /// Serial port name, e.g. COM4 or /dev/ttyACM0
    #[arg(long, short)]
    port: Option<String>,

    /// Baud rate
    #[arg(long, short)]
    baud: Option<u32>,
}

impl LinkArgs {
    fn settings(&self, default_baud: u32) -> LinkSettings {
        LinkSettings::new(
            self.port.clone().unwrap_or_else(|| DEFAULT_PORT.to_string()),
            self.baud.unwrap_or(default_baud),
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum XAxis {
    /// Sample number
    Index,
    /// Seconds since Start
    Time,
}

impl From<XAxis> for PositionMode {
    fn from(v: XAxis) -> Self {
        match v {
            XAxis::Index => PositionMode::SampleIndex,
            XAxis::Time => PositionMode::ElapsedTime,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Temperature(link) => {
            // a port that will not open ends the program here
            let port = SerialLink::open(&link.settings(9600))?;
            if args.headless {
                let interrupt = headless::Interrupt::on_ctrl_c()?;
                headless::temperature(port, app::temperature::TICK, &interrupt)?;
            } else {
                app::temperature::run(port)?;
            }
        }

        Command::Servo(link) => {
            let port = SerialLink::open(&link.settings(9600))?;
            if args.headless {
                let interrupt = headless::Interrupt::on_ctrl_c()?;
                headless::servo(port, app::servo::TICK, &interrupt)?;
            } else {
                app::servo::run(port)?;
            }
        }

        Command::Frequency { link, x_axis } => {
            if args.headless {
                let port = SerialLink::open(&link.settings(38400))?;
                let interrupt = headless::Interrupt::on_ctrl_c()?;
                headless::frequency(port, x_axis.into(), app::frequency::WINDOW, &interrupt)?;
            } else {
                app::frequency::run(link.port, link.baud, x_axis.into())?;
            }
        }
    }

    Ok(())
}
