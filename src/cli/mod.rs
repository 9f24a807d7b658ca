//! CLI argument parsing and command dispatch

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fabric_bench_core::{
    plan, OrchestratorBuilder, PatternCatalog, PatternOverrides, RunConfig, RunResult, Topology,
    ALL_PATTERNS,
};
use fabric_bench_probes::{ssh_probes, ProbeConfig};
use fabric_bench_report::{render_text, write_outputs};

/// Exit code of a run interrupted by Ctrl+C
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "fabric-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run traffic patterns against a topology
    Run(RunArgs),
    /// Print the flow plan of a pattern without executing it
    Plan {
        /// Path to the topology file
        #[arg(short, long)]
        topology: PathBuf,

        /// Pattern to plan
        #[arg(short, long)]
        pattern: String,

        /// Override the flow duration in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Override the message size in bytes
        #[arg(long)]
        message_size: Option<u64>,
    },
    /// List the available patterns
    Patterns,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the topology file
    #[arg(short, long)]
    pub topology: PathBuf,

    /// Patterns to run, in order ("all" for every pattern)
    #[arg(short, long, value_delimiter = ',', num_args = 1.., default_value = ALL_PATTERNS)]
    pub patterns: Vec<String>,

    /// Override the flow duration in seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Override the message size in bytes
    #[arg(long)]
    pub message_size: Option<u64>,

    /// Concurrent flows per host
    #[arg(long)]
    pub flows_per_host: Option<usize>,

    /// Expected per-flow rate in Gbps; slower flows fail the rate check
    #[arg(long)]
    pub min_flow_gbps: Option<f64>,

    /// Path to a run configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to a probe (SSH and command) configuration file
    #[arg(long, env = "FABRIC_BENCH_PROBE_CONFIG")]
    pub probe_config: Option<PathBuf>,

    /// Directory for the text report and JSON results
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

impl Cli {
    /// Dispatch the selected command
    pub async fn execute(&self) -> Result<ExitCode> {
        match &self.command {
            Commands::Run(args) => run(args).await,
            Commands::Plan {
                topology,
                pattern,
                duration,
                message_size,
            } => {
                print_plan(topology, pattern, *duration, *message_size)?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Patterns => {
                print_patterns();
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

async fn run(args: &RunArgs) -> Result<ExitCode> {
    let topology = Topology::from_json_file(&args.topology)
        .with_context(|| format!("Failed to load topology: {}", args.topology.display()))?;

    let config = run_config(args)?;

    let probe_config = match &args.probe_config {
        Some(path) => ProbeConfig::from_json_file(path)
            .with_context(|| format!("Failed to load probe config: {}", path.display()))?,
        None => ProbeConfig::default(),
    };
    let (meter, listeners) = ssh_probes(&probe_config);

    let orchestrator = OrchestratorBuilder::new()
        .config(config)
        .topology(topology)
        .meter(Arc::new(meter))
        .listeners(Arc::new(listeners))
        .build()
        .context("Invalid run configuration")?;

    print_banner(
        args,
        orchestrator.config(),
        orchestrator.topology().len(),
        &probe_config,
    );

    let run = orchestrator.run_with_signal_handling(&args.patterns).await?;

    println!("{}", render_text(&run));
    let paths = write_outputs(&run, &args.output_dir).with_context(|| {
        format!(
            "Failed to write report to: {}",
            args.output_dir.display()
        )
    })?;
    println!("Report saved to {}", paths.text.display());
    println!("Results saved to {}", paths.json.display());

    Ok(exit_code(&run))
}

fn run_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => RunConfig::default(),
    };

    // command-line values take precedence over the config file
    let overrides = PatternOverrides::new(
        args.duration.or(config.overrides.duration_secs),
        args.message_size.or(config.overrides.message_size),
    )?;
    config = config.with_overrides(overrides);

    if let Some(flows_per_host) = args.flows_per_host {
        config = config.with_flows_per_host(flows_per_host);
    }
    if let Some(rate) = args.min_flow_gbps {
        config = config.with_min_flow_gbps(rate);
    }

    config.validate()?;
    Ok(config)
}

fn exit_code(run: &RunResult) -> ExitCode {
    if run.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_CANCELLED)
    }
}

fn print_banner(args: &RunArgs, config: &RunConfig, hosts: usize, probes: &ProbeConfig) {
    println!("\n{}", "=".repeat(70));
    println!("   fabric-bench - Collective Traffic Patterns");
    println!("{}", "=".repeat(70));
    println!();
    println!("Configuration:");
    println!("  Topology:     {} ({} hosts)", args.topology.display(), hosts);
    println!("  Patterns:     {}", args.patterns.join(", "));
    println!("  SSH user:     {}", probes.ssh.user);
    if let Some(duration) = args.duration {
        println!("  Duration:     {duration}s");
    }
    if let Some(size) = args.message_size {
        println!("  Message size: {size} bytes");
    }
    println!("  Flows/host:   {}", config.flows_per_host);
    if let Some(rate) = config.min_flow_gbps {
        println!("  Min rate:     {rate:.2} Gbps per flow");
    }
    println!("{}", "=".repeat(70));
    println!();
}

fn print_plan(
    topology: &Path,
    pattern: &str,
    duration: Option<u64>,
    message_size: Option<u64>,
) -> Result<()> {
    let topology = Topology::from_json_file(topology)
        .with_context(|| format!("Failed to load topology: {}", topology.display()))?;

    let catalog = PatternCatalog::builtin();
    let overrides = PatternOverrides::new(duration, message_size)?;
    let descriptor = catalog.get(pattern)?.with_overrides(&overrides);
    let plan = plan(&descriptor, &topology);

    println!(
        "{}: {} phase(s), {} flow(s) over {} host(s)",
        descriptor.name,
        plan.phases.len(),
        plan.flow_count(),
        topology.len()
    );
    if plan.is_empty() {
        println!(
            "  nothing to run: {} needs at least {} hosts",
            descriptor.kind,
            descriptor.kind.min_hosts()
        );
    }

    for phase in &plan.phases {
        println!(
            "  phase {} ({}s, {} bytes, {} stream(s), block {} bytes)",
            phase.name,
            phase.spec.duration_secs,
            phase.spec.message_size,
            phase.spec.parallel_streams(),
            phase.spec.block_len()
        );
        for flow in &phase.flows {
            let src = &topology.hosts()[flow.src];
            let dst = &topology.hosts()[flow.dst];
            println!("    {} -> {} ({})", src.name, dst.name, dst.data_ip);
        }
    }

    Ok(())
}

fn print_patterns() {
    println!(
        "{:<18} {:>14} {:>10} {:>7}  DESCRIPTION",
        "PATTERN", "MESSAGE SIZE", "DURATION", "PHASES"
    );
    for descriptor in PatternCatalog::builtin().iter() {
        println!(
            "{:<18} {:>14} {:>9}s {:>7}  {}",
            descriptor.kind.key(),
            descriptor.message_size,
            descriptor.duration_secs,
            descriptor.phase_count(),
            descriptor.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults_to_all_patterns() {
        let cli = Cli::try_parse_from(["fabric-bench", "run", "--topology", "topo.json"]).unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.patterns, vec!["all"]);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(args.duration.is_none());
    }

    #[test]
    fn test_run_pattern_list_and_overrides() {
        let cli = Cli::try_parse_from([
            "fabric-bench",
            "-v",
            "run",
            "-t",
            "topo.json",
            "--patterns",
            "ring,broadcast",
            "--duration",
            "10",
            "--message-size",
            "1000000",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.patterns, vec!["ring", "broadcast"]);

        let config = run_config(&args).unwrap();
        assert_eq!(config.overrides.duration_secs, Some(10));
        assert_eq!(config.overrides.message_size, Some(1_000_000));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let cli = Cli::try_parse_from([
            "fabric-bench",
            "run",
            "--topology",
            "topo.json",
            "--duration",
            "0",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(run_config(&args).is_err());
    }

    #[test]
    fn test_min_flow_rate_reaches_config() {
        let parse = |rate: &str| {
            let cli = Cli::try_parse_from([
                "fabric-bench",
                "run",
                "--topology",
                "topo.json",
                "--min-flow-gbps",
                rate,
            ])
            .unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run command");
            };
            run_config(&args)
        };

        assert_eq!(parse("8").unwrap().min_flow_gbps, Some(8.0));
        assert!(parse("0").is_err());
    }

    #[test]
    fn test_plan_requires_pattern() {
        let result = Cli::try_parse_from(["fabric-bench", "plan", "--topology", "topo.json"]);
        assert!(result.is_err());
    }
}
