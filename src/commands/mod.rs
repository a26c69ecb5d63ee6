use std::fmt::Display;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

mod formatters;
mod relay;

#[derive(Subcommand, Debug)]
pub enum BacklogCmd {
    Relay(relay::Cmd),

    Formatters(formatters::Cmd),
}

impl Display for BacklogCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BacklogCmd::Relay(_cmd) => write!(f, "relay"),
            BacklogCmd::Formatters(_cmd) => write!(f, "formatters"),
        }
    }
}

#[derive(Parser)]
#[command(version, long_version = "")]
#[command(about = "Relay log lines, holding back low severity context until something goes wrong.", long_about = None, disable_help_subcommand = true)]
pub struct Backlog {
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Write verbose messages to stderr for debugging.",
        display_order = 999
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: BacklogCmd,
}

impl Backlog {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            5_u8..=u8::MAX => LevelFilter::TRACE,
        }
    }

    fn setup_logging(&self) -> eyre::Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(self.log_filter())
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| eyre::eyre!(e.to_string()))
    }

    pub fn run(self) -> eyre::Result<()> {
        self.setup_logging()?;

        tracing::info!(target: "backlog", "running command {}", &self.cmd);
        tracing::trace!(target: "backlog", "log level: {}", self.log_filter());

        let result = match &self.cmd {
            BacklogCmd::Relay(relay) => relay.run(),
            BacklogCmd::Formatters(formatters) => formatters.run(),
        };

        if let Err(msg) = &result {
            tracing::error!(target: "backlog", "failed running command {}, error={} cause={}", &self.cmd, msg, msg.root_cause());
        }

        result
    }
}
