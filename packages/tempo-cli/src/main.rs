mod follow;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tempo_scheduler::TokioHost;
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tempo")]
#[command(about = "Follow quantized time values as they tick", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with scheduler options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum wake delay in milliseconds, overrides the config file
    #[arg(long, global = true)]
    visible_throttle_ms: Option<f64>,

    /// Print one JSON sample per line
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Count down to a deadline in whole intervals
    Countdown {
        /// Deadline, relative to now; negative for one already passed
        #[arg(long, allow_hyphen_values = true)]
        in_ms: f64,
        #[arg(long, default_value_t = 1000.0)]
        interval_ms: f64,
    },
    /// Print ticks of an interval grid
    Ticks {
        #[arg(long, default_value_t = 1000.0)]
        interval_ms: f64,
        /// Grid anchor relative to now; defaults to the Unix epoch
        #[arg(long, allow_hyphen_values = true)]
        anchor_ms: Option<f64>,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Report when a deadline has passed
    After {
        #[arg(long, allow_hyphen_values = true)]
        in_ms: f64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let options = follow::load_options(cli.config.as_deref(), cli.visible_throttle_ms)?;
    tracing::debug!(?options, "scheduler options");

    let local = LocalSet::new();
    let mut out = std::io::stdout();
    local
        .run_until(async move {
            let host = TokioHost::new();
            let scheduler = host.scheduler(options);
            let now = scheduler.get_time();

            match cli.command {
                Commands::Countdown { in_ms, interval_ms } => {
                    let watch = tempo_watch::countdown(&scheduler, now + in_ms, interval_ms)?;
                    let render = |remaining: &f64| {
                        if *remaining < 0.0 {
                            "expired".to_string()
                        } else {
                            format!("{remaining} ms left")
                        }
                    };
                    follow::follow(watch, None, cli.json, render, &mut out).await
                }
                Commands::Ticks {
                    interval_ms,
                    anchor_ms,
                    count,
                } => {
                    let anchor = anchor_ms.map(|offset| now + offset);
                    let watch = tempo_watch::time_interval(&scheduler, interval_ms, anchor)?;
                    let render = |tick: &f64| format!("tick at {:+} ms", tick - now);
                    follow::follow(watch, Some(count), cli.json, render, &mut out).await
                }
                Commands::After { in_ms } => {
                    let watch = tempo_watch::is_after(&scheduler, now + in_ms)?;
                    let render = |after: &bool| String::from(if *after { "passed" } else { "pending" });
                    follow::follow(watch, None, cli.json, render, &mut out).await
                }
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_deadlines_parse() {
        let cli = Cli::try_parse_from(["tempo", "countdown", "--in-ms", "-5"]).unwrap();
        assert!(matches!(cli.command, Commands::Countdown { in_ms, .. } if in_ms == -5.0));

        let cli = Cli::try_parse_from(["tempo", "after", "--in-ms", "-250.5"]).unwrap();
        assert!(matches!(cli.command, Commands::After { in_ms } if in_ms == -250.5));

        let cli = Cli::try_parse_from(["tempo", "ticks", "--anchor-ms", "-100"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ticks { anchor_ms: Some(anchor), .. } if anchor == -100.0
        ));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "tempo",
            "after",
            "--in-ms",
            "10",
            "--json",
            "--visible-throttle-ms",
            "40",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.visible_throttle_ms, Some(40.0));
    }
}
