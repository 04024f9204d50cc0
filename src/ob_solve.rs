use std::path::PathBuf;
use anyhow::{ bail, Context };
use clap::Parser;
use log::info;
use ndarray as nd;
use num_complex::Complex64 as C64;
use maxwell_bloch::OBSolve;

/// Solve the optical-Bloch equations for an atom described in a config file
#[derive(Parser)]
#[command(name = "ob_solve")]
struct Cli {
    /// Path to a JSON or TOML configuration file
    config: PathBuf,

    /// Ignore any cached result and solve again
    #[arg(long)]
    recalc: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    let mut ob_solve = OBSolve::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    info!("{}", ob_solve);

    let n = ob_solve.ob_atom().num_states();
    let populations: Vec<nd::Array2<C64>>
        = (0..n).filter_map(|k| ob_solve.ob_atom().sigma(k, k)).collect();
    let result = ob_solve.solve(None, &populations, cli.recalc, true)
        .context("solve failed")?;

    let nt = result.tlist().len();
    if nt == 0 { bail!("empty result"); }
    let final_pops: Vec<f64>
        = result.expect().column(nt - 1).iter().map(|p| p.re).collect();
    info!("trace at t_max: {:.6}", final_pops.iter().sum::<f64>());
    info!("populations at t_max: {:?}", final_pops);

    println!("done");
    Ok(())
}
