use bridge_fea::{analyze, config, post_processor, AnalysisConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Peak stress and solid area of a perforated bridge section
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON array of [active, x1, y1, x2, y2] hole edges
    edges: String,

    /// Elements along x
    #[arg(long, default_value_t = 20)]
    nelx: usize,

    /// Elements along y
    #[arg(long, default_value_t = 10)]
    nely: usize,

    /// JSON file overriding material, load, supports or solver
    #[arg(long)]
    config: Option<String>,

    /// Print the solid/void layout
    #[arg(long)]
    render: bool,

    /// Write per-element stresses to this CSV file
    #[arg(long)]
    csv: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> bridge_fea::Result<()> {
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AnalysisConfig::default(),
    };
    let edges = config::load_edges(&args.edges)?;

    let report = analyze(&edges, args.nely, args.nelx, args.render, &config)?;

    if let Some(path) = &args.csv {
        post_processor::csv_output(&report, path)?;
    }

    if let Some(layout) = &report.rendered {
        print!("{layout}");
    }

    let (max_stress, area) = report.scalars();
    println!("max_stress = {max_stress}");
    println!("area = {area}");

    Ok(())
}
