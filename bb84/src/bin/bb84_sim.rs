//! Batch BB84 simulator.
//!
//! ```text
//! bb84-sim --trials 200 --noise 0.01 --eve 0.3
//! bb84-sim --eve 1.0 --sweep 0,2,4,8,16
//! RUST_LOG=debug bb84-sim --trials 1 --seed 7
//! ```

use std::path::PathBuf;

use clap::Parser;

use bb84::config::ProtocolConfig;
use bb84::simulation::{run_experiment, threshold_sweep, SimConfig, SimResult};

#[derive(Parser)]
#[command(name = "bb84-sim")]
#[command(about = "Monte Carlo runs of BB84 post-processing over a noisy, tapped channel")]
#[command(version)]
struct Cli {
    /// JSON protocol configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Qubits sent per run
    #[arg(short, long)]
    qubits: Option<usize>,

    /// Share of the sifted key disclosed for error estimation
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Largest tolerated number of mismatches among tested bits
    #[arg(long)]
    threshold: Option<usize>,

    /// Number of independent runs
    #[arg(short, long, default_value_t = 100)]
    trials: usize,

    /// Experiment seed; fixes every trial including its hash seed
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Bit-flip probability of the channel
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// Fraction of qubits intercepted and resent by an eavesdropper
    #[arg(long, default_value_t = 0.0)]
    eve: f64,

    /// Comma-separated abort thresholds to sweep instead of a single experiment
    #[arg(long, value_delimiter = ',')]
    sweep: Vec<usize>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn protocol_config(&self) -> bb84::Result<ProtocolConfig> {
        let mut config = match &self.config {
            Some(path) => ProtocolConfig::from_path(path)?,
            None => ProtocolConfig::default(),
        };
        if let Some(qubits) = self.qubits {
            config.qubits = qubits;
        }
        if let Some(fraction) = self.test_fraction {
            config.test_fraction = fraction;
        }
        if let Some(threshold) = self.threshold {
            config.abort_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_summary(label: &str, result: &SimResult) {
    println!("{}", label);
    println!("  trials            {}", result.trials);
    println!("  done              {} ({:.1}%)", result.completed, 100.0 * result.success_rate());
    println!("  aborted           {} ({:.1}%)", result.aborted, 100.0 * result.abort_rate());
    println!("  reconcile failed  {}", result.reconcile_failed);
    println!("  short of data     {}", result.insufficient);
    println!("  key disagreements {}", result.disagreements);
    println!("  pooled error rate {:.4}", result.pooled_error_rate);
    println!("  secret fraction   {:.4}", result.asymptotic_key_fraction());
    println!("  mean secret bits  {:.1}", result.mean_secret_len);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = SimConfig {
        protocol: cli.protocol_config()?,
        flip_probability: cli.noise,
        intercept_fraction: cli.eve,
        trials: cli.trials,
        seed: cli.seed,
    };
    log::info!(
        "{} trials of {} qubits, noise {}, eavesdropping {}",
        config.trials,
        config.protocol.qubits,
        config.flip_probability,
        config.intercept_fraction
    );

    if cli.sweep.is_empty() {
        let result = run_experiment(&config)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_summary("experiment", &result);
        }
    } else {
        let sweep = threshold_sweep(&config, &cli.sweep)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&sweep)?);
        } else {
            for (threshold, result) in &sweep {
                print_summary(&format!("abort threshold {}", threshold), result);
            }
        }
    }
    Ok(())
}
