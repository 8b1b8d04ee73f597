use anyhow::Result;
use clap::{Parser, ValueEnum};
use lockstep::{
    core::{util::rollout, Policy, RandomPolicy, ZeroPolicy},
    envs::{sim::PlanarSim, RunConfig},
    metrics::{CsvRecorder, RunMetadata},
    EnvironmentDriver,
};
use log::info;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyKind {
    /// All-zero actions
    Zero,
    /// Uniform actions in [-1, 1]
    Random,
}

/// Runs a fixed policy on a configured environment and writes its metrics.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML run configuration, defaults are used if omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of batched environment steps
    #[arg(long, default_value_t = 1000)]
    steps: usize,

    /// Directory of metrics.csv and metadata.yaml
    #[arg(long, default_value = "./runs/lockstep")]
    out: PathBuf,

    /// Policy producing the actions
    #[arg(long, value_enum, default_value_t = PolicyKind::Random)]
    policy: PolicyKind,

    /// Steps between two rows of the metrics table
    #[arg(long, default_value_t = 100)]
    flush_interval: usize,

    /// Overrides the seed of the configuration
    #[arg(long)]
    seed: Option<u64>,
}

fn run<P: Policy>(env: &mut EnvironmentDriver<PlanarSim>, mut policy: P, args: &Args) -> Result<()> {
    let mut recorder = CsvRecorder::new(&args.out)?;
    let summary = rollout(env, &mut policy, args.steps, args.flush_interval, &mut recorder)?;
    info!(
        "Finished {} steps, {} episodes, mean reward per step {}",
        summary.steps,
        summary.episodes,
        summary.total_reward / (summary.steps.max(1) * env.num_envs()) as f32
    );
    info!("Metrics written to {:?}", recorder.path());
    recorder.finish()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.env.seed = seed;
    }

    let mut env = config.make_env()?;
    let path = RunMetadata::new(&env).save(&args.out)?;
    info!("Run metadata written to {:?}", path);

    let action_space = env.spaces().action;
    match args.policy {
        PolicyKind::Zero => run(&mut env, ZeroPolicy::new(action_space), &args),
        PolicyKind::Random => {
            let seed = args.seed.unwrap_or_else(|| fastrand::u64(..));
            run(&mut env, RandomPolicy::new(action_space, seed), &args)
        }
    }
}
