// chat-probe command line
//
// Usage:
//   chat-probe probe   --config chat-probe.yaml [--url URL] [--out probe-run.json]
//   chat-probe load    --config chat-probe.yaml [--endpoint URL] [--probe-run probe-run.json]
//   chat-probe analyze --input 'runs/*.json' [--out-dir reports]
//   chat-probe run     --config chat-probe.yaml

use anyhow::{Context, Result};
use chat_probe::{
    ExecutiveReport, HarnessConfig, LoadRun, ProbeRun, Verdict, aborted_run, collect_runs,
    executive_report, load_target, probe_target, write_reports,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chat-probe", version, about = "Health checks for third-party chat widgets")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Exit with status 2 when the verdict is Critical
    #[arg(long, global = true)]
    fail_on_critical: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the browser probe suite and save the probe run
    Probe(ProbeArgs),
    /// Load the chat API and save the load run
    Load(LoadArgs),
    /// Analyze saved runs and write reports
    Analyze(AnalyzeArgs),
    /// Probe, load and analyze in one go
    Run(RunArgs),
}

#[derive(Args)]
struct ConfigArg {
    /// YAML config file
    #[arg(short, long, env = "CHAT_PROBE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ProbeArgs {
    #[command(flatten)]
    config: ConfigArg,
    /// Page hosting the widget (overrides target.page_url)
    #[arg(long)]
    url: Option<String>,
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    #[arg(short, long, default_value = "probe-run.json")]
    out: PathBuf,
}

#[derive(Args)]
struct LoadArgs {
    #[command(flatten)]
    config: ConfigArg,
    /// Chat API endpoint (overrides target.api_endpoint)
    #[arg(long)]
    endpoint: Option<String>,
    /// Saved probe run whose recorded traffic is used to infer the endpoint
    #[arg(long)]
    probe_run: Option<PathBuf>,
    #[arg(long)]
    users: Option<usize>,
    #[arg(long)]
    iterations: Option<usize>,
    #[arg(short, long, default_value = "load-run.json")]
    out: PathBuf,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Saved probe/load run files; glob patterns are expanded
    #[arg(short, long = "input", required = true, num_args = 1..)]
    inputs: Vec<String>,
    #[command(flatten)]
    config: ConfigArg,
    /// Report directory (overrides report.output_dir)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArg,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Skip the load stage
    #[arg(long)]
    skip_load: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    match execute(&cli).await {
        Ok(Some(Verdict::Critical)) if cli.fail_on_critical => {
            warn!("Verdict is Critical");
            ExitCode::from(2)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .with_target(verbose > 0);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Returns the verdict when the command produced one
async fn execute(cli: &Cli) -> Result<Option<Verdict>> {
    match &cli.command {
        Command::Probe(args) => {
            let mut config = load_config(args.config.config.as_deref())?;
            if let Some(url) = &args.url {
                config.target.page_url = url.clone();
            }
            if args.headed {
                config.browser = config.browser.headless(false);
            }
            config.validate()?;

            let run = probe_target(&config).await?;
            run.save(&args.out)?;
            info!(
                "Probe run saved to {} ({}/{} passed)",
                args.out.display(),
                run.count(chat_probe::ProbeStatus::Passed),
                run.executed()
            );
            Ok(None)
        }
        Command::Load(args) => {
            let mut config = load_config(args.config.config.as_deref())?;
            if let Some(endpoint) = &args.endpoint {
                config.target.api_endpoint = Some(endpoint.clone());
            }
            if let Some(users) = args.users {
                config.load.users = users;
            }
            if let Some(iterations) = args.iterations {
                config.load.iterations = iterations;
            }
            config.validate()?;

            let observed = args
                .probe_run
                .as_deref()
                .map(ProbeRun::load)
                .transpose()
                .context("reading probe run")?;
            let run = load_target(&config, observed.as_ref()).await?;
            run.save(&args.out)?;
            info!("Load run saved to {}", args.out.display());
            Ok(None)
        }
        Command::Analyze(args) => {
            let mut config = load_config(args.config.config.as_deref())?;
            if let Some(dir) = &args.out_dir {
                config.report.output_dir = dir.display().to_string();
            }

            let saved = collect_runs(&args.inputs)?;
            let report = executive_report(&config, saved.probes.as_ref(), saved.load.as_ref());
            publish(&config, &report)
        }
        Command::Run(args) => {
            let mut config = load_config(args.config.config.as_deref())?;
            if let Some(url) = &args.url {
                config.target.page_url = url.clone();
            }
            if let Some(endpoint) = &args.endpoint {
                config.target.api_endpoint = Some(endpoint.clone());
            }
            if let Some(dir) = &args.out_dir {
                config.report.output_dir = dir.display().to_string();
            }
            config.validate()?;
            let out_dir = PathBuf::from(&config.report.output_dir);

            let probes = match probe_target(&config).await {
                Ok(run) => run,
                Err(e) => {
                    error!("Probe suite could not run: {}", e);
                    aborted_run(&config, &e)
                }
            };
            probes.save(&out_dir.join("probe-run.json"))?;

            let load: Option<LoadRun> = if args.skip_load {
                None
            } else {
                match load_target(&config, Some(&probes)).await {
                    Ok(run) => {
                        run.save(&out_dir.join("load-run.json"))?;
                        Some(run)
                    }
                    Err(e) => {
                        warn!("Load stage skipped: {}", e);
                        None
                    }
                }
            };

            let report = executive_report(&config, Some(&probes), load.as_ref());
            publish(&config, &report)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => {
            let mut config = HarnessConfig::default();
            config.apply_env();
            Ok(config)
        }
    }
}

fn publish(config: &HarnessConfig, report: &ExecutiveReport) -> Result<Option<Verdict>> {
    let dir = PathBuf::from(&config.report.output_dir);
    let written = write_reports(report, &dir, &config.report.formats)?;

    println!("{}", report.headline());
    for issue in &report.analysis.issues {
        println!(
            "  [{}] {:<22} score {:>3}  ~{} users",
            issue.priority, issue.title, issue.score, issue.affected_users
        );
    }
    for path in written {
        println!("  wrote {}", path.display());
    }
    Ok(Some(report.analysis.verdict))
}
