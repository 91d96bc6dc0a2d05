//! bundlemap CLI - Debug tool for bundle discovery
//!
//! Usage:
//!   bundlemap-cli frechet <a.txt> <b.txt> [--kind discrete|semi-weak]
//!   bundlemap-cli bundles <folder> --eps <E> [--k <K>] [--strategy <S>]
//!   bundlemap-cli evolve <folder> [--config <cfg.json>] [--min-eps ..]
//!   bundlemap-cli synthetic --count <N> --seed <S> --out <dir>
//!
//! Trajectory files hold one whitespace-separated `x y` pair per line; the
//! file stem becomes the trajectory id.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bundlemap::{
    point, AbortHandle, BundleGenerator, DistanceMatrix, EvolutionConfig, EvolutionEngine, ExtractionParams, ExtractionStrategy,
    FrechetKind, SyntheticScenario, Trajectory,
};

#[derive(Parser)]
#[command(name = "bundlemap-cli")]
#[command(about = "Debug tool for trajectory bundles and evolution diagrams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fréchet distance between two trajectory files
    Frechet {
        a: PathBuf,
        b: PathBuf,

        /// discrete or semi-weak
        #[arg(short, long, default_value = "discrete")]
        kind: FrechetKind,
    },

    /// Bundles of a trajectory folder at one epsilon
    Bundles {
        /// Folder containing trajectory files
        folder: PathBuf,

        #[arg(long)]
        eps: f64,

        /// Minimum bundle size
        #[arg(short, long, default_value = "2")]
        k: usize,

        /// furthest-endpoint or maximal-length
        #[arg(long, default_value = "furthest-endpoint")]
        strategy: ExtractionStrategy,

        /// Also match trajectories driven in the opposite direction
        #[arg(long)]
        ignore_direction: bool,
    },

    /// Evolution diagram of a trajectory folder
    Evolve {
        /// Folder containing trajectory files
        folder: PathBuf,

        /// JSON file with an EvolutionConfig
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        min_eps: Option<f64>,

        #[arg(long)]
        max_eps: Option<f64>,

        #[arg(long)]
        delta_eps: Option<f64>,
    },

    /// Write a synthetic trajectory set
    Synthetic {
        #[arg(short, long, default_value = "20")]
        count: usize,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Frechet { a, b, kind } => run_frechet(&a, &b, kind, cli.json),
        Commands::Bundles {
            folder,
            eps,
            k,
            strategy,
            ignore_direction,
        } => run_bundles(&folder, eps, k, strategy, ignore_direction, cli.json),
        Commands::Evolve {
            folder,
            config,
            min_eps,
            max_eps,
            delta_eps,
        } => run_evolve(&folder, config.as_deref(), min_eps, max_eps, delta_eps, cli.json),
        Commands::Synthetic { count, seed, out } => run_synthetic(count, seed, &out),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse one trajectory file
fn read_trajectory(path: &Path) -> Result<Trajectory, String> {
    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let mut points = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace().map(str::parse::<f64>);
        match (fields.next(), fields.next()) {
            (Some(Ok(x)), Some(Ok(y))) => points.push(point(x, y)),
            _ => return Err(format!("{}:{}: expected 'x y'", path.display(), line_no + 1)),
        }
    }
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    Trajectory::new(id, points).map_err(|e| e.to_string())
}

/// Load every `.txt` file of a folder, sorted by name. Status goes to
/// stderr so `--json` output stays parseable
fn load_folder(folder: &Path) -> Result<Vec<Arc<Trajectory>>, String> {
    eprintln!("\n{}", "=".repeat(60));
    eprintln!("Loading trajectories from: {}", folder.display());
    eprintln!("{}", "=".repeat(60));

    let mut paths: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(|e| format!("Error reading folder: {}", e))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "txt"))
        .collect();
    paths.sort();

    let mut trajectories = Vec::new();
    for path in paths {
        match read_trajectory(&path) {
            Ok(t) => {
                eprintln!("  [OK] {} - {} points, length {:.1}", t.id(), t.num_points(), t.euclidean_length());
                trajectories.push(Arc::new(t));
            }
            Err(e) => eprintln!("  [ERR] {}", e),
        }
    }
    eprintln!("\nLoaded {} trajectories", trajectories.len());
    Ok(trajectories)
}

#[derive(Serialize)]
struct FrechetOutput {
    kind: FrechetKind,
    distance: f64,
}

fn run_frechet(a: &Path, b: &Path, kind: FrechetKind, json: bool) -> Result<(), String> {
    let a = read_trajectory(a)?;
    let b = read_trajectory(b)?;
    let distance = kind
        .compute(&DistanceMatrix::between(&a, &b))
        .map_err(|e| e.to_string())?
        .distance;
    if json {
        let out = serde_json::to_string_pretty(&FrechetOutput { kind, distance }).map_err(|e| e.to_string())?;
        println!("{}", out);
    } else {
        println!("{} Fréchet distance {} <-> {}: {:.6}", kind, a.id(), b.id(), distance);
    }
    Ok(())
}

#[derive(Serialize)]
struct MemberOutput {
    trajectory: String,
    reversed: bool,
    from: f64,
    to: f64,
}

#[derive(Serialize)]
struct BundleOutput {
    size: usize,
    length: f64,
    representative: MemberOutput,
    members: Vec<MemberOutput>,
}

fn member_output(sub: &bundlemap::Subtrajectory) -> MemberOutput {
    MemberOutput {
        trajectory: sub.parent_id().to_string(),
        reversed: sub.parent().is_reversed(),
        from: sub.from_index(),
        to: sub.to_index(),
    }
}

fn bundle_output(bundle: &bundlemap::Bundle) -> BundleOutput {
    BundleOutput {
        size: bundle.size(),
        length: bundle.continuous_length(),
        representative: member_output(bundle.representative()),
        members: bundle.members().iter().map(member_output).collect(),
    }
}

fn run_bundles(
    folder: &Path,
    eps: f64,
    k: usize,
    strategy: ExtractionStrategy,
    ignore_direction: bool,
    json: bool,
) -> Result<(), String> {
    let trajectories = load_folder(folder)?;
    let config = EvolutionConfig::default();
    let generator =
        BundleGenerator::new(trajectories, strategy, ignore_direction, true).map_err(|e| e.to_string())?;
    let params = ExtractionParams::new(eps, k, config.lambda(eps), config.min_length(eps));
    let set = generator
        .generate(params, &AbortHandle::new())
        .map_err(|e| e.to_string())?;

    if json {
        let out: Vec<BundleOutput> = set.bundles.iter().map(|b| bundle_output(b)).collect();
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("BUNDLES (eps={}, k={}, {})", eps, k, strategy);
    println!("{}", "=".repeat(60));
    for (i, bundle) in set.bundles.iter().enumerate() {
        println!("\n  [{}] {}", i, bundle);
        for member in bundle.members() {
            println!("      {}", member);
        }
    }
    println!("\n{} bundles, {} absorbed", set.len(), set.absorbed.len());
    Ok(())
}

#[derive(Serialize)]
struct ClassOutput {
    class: usize,
    birth: f64,
    merge: Option<f64>,
    merged_into: Option<usize>,
    lifespan: f64,
    best_epsilon: f64,
    bundle: Option<BundleOutput>,
}

fn run_evolve(
    folder: &Path,
    config_path: Option<&Path>,
    min_eps: Option<f64>,
    max_eps: Option<f64>,
    delta_eps: Option<f64>,
    json: bool,
) -> Result<(), String> {
    let mut config = match config_path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
            serde_json::from_str::<EvolutionConfig>(&text).map_err(|e| e.to_string())?
        }
        None => EvolutionConfig::default(),
    };
    if let Some(v) = min_eps {
        config.min_eps = v;
    }
    if let Some(v) = max_eps {
        config.max_eps = v;
    }
    if let Some(v) = delta_eps {
        config.delta_eps = v;
    }

    let trajectories = load_folder(folder)?;
    let engine = EvolutionEngine::new(config).map_err(|e| e.to_string())?;
    let diagram = engine.run(trajectories).map_err(|e| e.to_string())?;
    let best = diagram.bundles_at_best();

    let classes: Vec<ClassOutput> = diagram
        .reported_classes()
        .into_iter()
        .filter_map(|class| {
            let merge = diagram.merge_epsilon(class)?;
            Some(ClassOutput {
                class,
                birth: diagram.birth_epsilon(class)?,
                merge: merge.is_finite().then_some(merge),
                merged_into: diagram.merged_into(class),
                lifespan: diagram.lifespan(class)?,
                best_epsilon: diagram.best_epsilon(class)?,
                bundle: best.get(&class).map(|b| bundle_output(b)),
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&classes).map_err(|e| e.to_string())?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("EVOLUTION DIAGRAM ({} states, {} classes)", diagram.states().len(), diagram.num_classes());
    println!("{}", "=".repeat(60));
    for c in &classes {
        let merge = match (c.merge, c.merged_into) {
            (Some(eps), Some(into)) => format!("merges into {} at {:.1}", into, eps),
            _ => "immortal".to_string(),
        };
        let size = c.bundle.as_ref().map_or(0, |b| b.size);
        println!(
            "  class {:>4}: born {:>6.1}, {}, lifespan {:>6.1}, best {:>6.1}, size {}",
            c.class, c.birth, merge, c.lifespan, c.best_epsilon, size
        );
    }
    Ok(())
}

fn run_synthetic(count: usize, seed: u64, out: &Path) -> Result<(), String> {
    let scenario = SyntheticScenario {
        trajectory_count: count,
        seed,
        ..SyntheticScenario::multi_corridor()
    };
    let dataset = scenario.generate();
    fs::create_dir_all(out).map_err(|e| e.to_string())?;

    for trajectory in &dataset.trajectories {
        let path = out.join(format!("{}.txt", trajectory.id()));
        let file = File::create(&path).map_err(|e| e.to_string())?;
        let mut writer = BufWriter::new(file);
        for p in trajectory.points() {
            writeln!(writer, "{} {}", p.x, p.y).map_err(|e| e.to_string())?;
        }
    }

    println!("Wrote {} trajectories to {}", dataset.trajectories.len(), out.display());
    for corridor in &dataset.expected_corridors {
        println!(
            "  {}: length {:.1}, {} trajectories",
            corridor.name,
            corridor.length,
            corridor.trajectory_ids.len()
        );
    }
    Ok(())
}
