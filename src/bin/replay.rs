use std::path::PathBuf;

use clap::Parser;
use hexarbiter::game::MatchSnapshot;
use hexarbiter::{GameConfig, GameState, Request};
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(name = "hexarbiter-replay")]
#[command(about = "Run a scripted sequence of requests against a fresh match")]
struct Args {
    /// JSON script: {"config": {...}, "steps": [{"player": 0, "request": {...}}]}
    script: PathBuf,

    /// Overrides the seed in the script's config
    #[arg(long)]
    seed: Option<u64>,

    /// Stop at the first rejected request
    #[arg(long)]
    strict: bool,

    /// Print the final public snapshot
    #[arg(long)]
    snapshot: bool,
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    config: GameConfig,
    steps: Vec<ScriptStep>,
}

#[derive(Debug, Deserialize)]
struct ScriptStep {
    player: usize,
    request: Request,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum StepReport<'a> {
    Applied {
        step: usize,
        dispatches: &'a [hexarbiter::Dispatch],
    },
    Rejected {
        step: usize,
        error: String,
    },
}

#[derive(Debug, Serialize)]
struct FinalReport {
    snapshot: MatchSnapshot,
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(message) = run(&args) {
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    let raw = std::fs::read_to_string(&args.script)
        .map_err(|e| format!("failed to read {}: {e}", args.script.display()))?;
    let mut script: Script =
        serde_json::from_str(&raw).map_err(|e| format!("invalid script: {e}"))?;
    if args.seed.is_some() {
        script.config.seed = args.seed;
    }

    let mut state = GameState::new(script.config).map_err(|e| e.to_string())?;
    for (idx, step) in script.steps.into_iter().enumerate() {
        let report = match state.step(step.player, step.request) {
            Ok(dispatches) => serde_json::to_string(&StepReport::Applied {
                step: idx,
                dispatches: &dispatches,
            }),
            Err(error) => {
                let line = serde_json::to_string(&StepReport::Rejected {
                    step: idx,
                    error: error.to_string(),
                })
                .map_err(|e| e.to_string())?;
                println!("{line}");
                if args.strict {
                    return Err(format!("step {idx} rejected: {error}"));
                }
                continue;
            }
        };
        println!("{}", report.map_err(|e| e.to_string())?);
    }

    if args.snapshot {
        let report = FinalReport {
            snapshot: state.snapshot(),
        };
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    Ok(())
}
