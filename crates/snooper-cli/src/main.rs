//! CLI for snooper: CPU, accelerator and machine identity telemetry.

mod commands;
mod format;
mod tui;

use clap::{Args, Parser, Subcommand};

use commands::{OutputFormat, PollPlan};

#[derive(Parser)]
#[command(name = "snooper")]
#[command(about = "snooper: sample CPU, GPU and machine identity telemetry on this host")]
#[command(version = snooper_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Print each result as a pretty JSON document
    #[arg(long, conflicts_with = "ndjson")]
    json: bool,

    /// Print each result as one JSON object per line
    #[arg(long)]
    ndjson: bool,
}

impl OutputArgs {
    fn format(&self) -> OutputFormat {
        OutputFormat::from_flags(self.json, self.ndjson)
    }
}

#[derive(Args)]
struct PollArgs {
    /// Keep sampling every N milliseconds until Ctrl+C
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    watch: Option<u64>,

    /// Stop after N samples (with --watch)
    #[arg(long, value_name = "N", requires = "watch", value_parser = clap::value_parser!(u64).range(1..))]
    count: Option<u64>,
}

impl PollArgs {
    fn plan(&self) -> PollPlan {
        PollPlan::from_args(self.watch, self.count)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merged snapshot: CPU, GPU, memory, load, uptime and identity
    Watch {
        #[command(flatten)]
        poll: PollArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Show serial number and hardware UUID unmasked
        #[arg(long)]
        show_identifiers: bool,
    },

    /// Overall and per-core CPU utilization
    Cpu {
        #[command(flatten)]
        poll: PollArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Accelerator utilization and thermal state
    Gpu {
        #[command(flatten)]
        poll: PollArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Static machine identity
    Info {
        /// Show serial number and hardware UUID unmasked
        #[arg(long)]
        show_identifiers: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Live terminal dashboard with CPU and GPU history
    Dashboard {
        /// Refresh interval in milliseconds
        #[arg(
            long,
            default_value_t = snooper_core::DEFAULT_INTERVAL.as_millis() as u64,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        refresh: u64,

        /// Samples kept per chart
        #[arg(long, default_value_t = snooper_core::DEFAULT_HISTORY_CAPACITY)]
        history: usize,

        /// Show serial number and hardware UUID unmasked
        #[arg(long)]
        show_identifiers: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            poll,
            output,
            show_identifiers,
        } => commands::watch::run(poll.plan(), output.format(), show_identifiers),
        Commands::Cpu { poll, output } => commands::cpu::run(poll.plan(), output.format()),
        Commands::Gpu { poll, output } => commands::gpu::run(poll.plan(), output.format()),
        Commands::Info {
            show_identifiers,
            json,
        } => commands::info::run(show_identifiers, json),
        Commands::Dashboard {
            refresh,
            history,
            show_identifiers,
        } => commands::dashboard::run(refresh, history, show_identifiers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_and_ndjson_conflict() {
        assert!(Cli::try_parse_from(["snooper", "cpu", "--json", "--ndjson"]).is_err());
    }

    #[test]
    fn zero_watch_is_rejected() {
        assert!(Cli::try_parse_from(["snooper", "watch", "--watch", "0"]).is_err());
    }

    #[test]
    fn count_requires_watch() {
        assert!(Cli::try_parse_from(["snooper", "gpu", "--count", "3"]).is_err());
        let cli = Cli::try_parse_from(["snooper", "gpu", "--watch", "250", "--count", "3"]).unwrap();
        let Commands::Gpu { poll, output } = cli.command else {
            panic!("expected gpu command");
        };
        let plan = poll.plan();
        assert!(plan.repeat);
        assert_eq!(plan.count, Some(3));
        assert_eq!(output.format(), OutputFormat::Table);
    }

    #[test]
    fn dashboard_defaults() {
        let cli = Cli::try_parse_from(["snooper", "dashboard"]).unwrap();
        let Commands::Dashboard {
            refresh,
            history,
            show_identifiers,
        } = cli.command
        else {
            panic!("expected dashboard command");
        };
        assert_eq!(refresh, 1000);
        assert_eq!(history, snooper_core::DEFAULT_HISTORY_CAPACITY);
        assert!(!show_identifiers);
    }
}
