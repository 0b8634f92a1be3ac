// main.rs - Headless driver: runs the engine and reports each rendered frame

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use life_engine::patterns::{self, Pattern};
use life_engine::{Engine, EngineConfig, Mutation, RenderDiff};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FRAME_MS: u64 = 16;   // ~60 frames per second

/// Runs Conway's Game of Life on a chunked, multi-worker engine.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// YAML file with engine settings. Flags below override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Side length of the square grid.
    #[arg(long, value_name = "CELLS")]
    size: Option<usize>,
    /// Number of chunk workers.
    #[arg(long, value_name = "COUNT")]
    workers: Option<usize>,
    /// Stop after this many generations. Runs until Ctrl-C when omitted.
    #[arg(long, value_name = "COUNT")]
    generations: Option<u64>,
    /// Milliseconds between rendered frames.
    #[arg(
        long = "frame-ms",
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_FRAME_MS,
        value_parser = clap::value_parser!(u64).range(1..=60_000)
    )]
    frame_ms: u64,
    /// Pattern to stamp, as NAME or NAME@X,Y. May be repeated.
    #[arg(long = "pattern", value_name = "NAME@X,Y")]
    patterns: Vec<PatternArg>,
    /// Fill the grid randomly before the first generation.
    #[arg(long)]
    random: bool,
    /// Seed for the random fill.
    #[arg(long, requires = "random")]
    seed: Option<u64>,
}

/// A library pattern with an optional top-left position.
#[derive(Clone, Debug)]
struct PatternArg {
    pattern: &'static Pattern,
    at: Option<(i64, i64)>,
}

impl PatternArg {
    /// Explicit position, or the pattern centred on the grid.
    fn position(&self, size: usize) -> (i64, i64) {
        self.at.unwrap_or_else(|| {
            let (width, height) = self.pattern.extent();
            let half = size as i64 / 2;
            (half - width / 2, half - height / 2)
        })
    }
}

impl FromStr for PatternArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (name, at) = match value.split_once('@') {
            Some((name, at)) => (name, Some(at)),
            None => (value, None),
        };
        let pattern = patterns::find(name).ok_or_else(|| {
            let known: Vec<_> = patterns::PATTERNS.iter().map(|p| p.name).collect();
            format!("unknown pattern {name:?}; expected one of {}", known.join(", "))
        })?;

        let at = at
            .map(|at| {
                let (x, y) = at
                    .split_once(',')
                    .ok_or_else(|| "expected position as X,Y".to_string())?;
                let x = x.trim().parse::<i64>().map_err(|error| format!("invalid x: {error}"))?;
                let y = y.trim().parse::<i64>().map_err(|error| format!("invalid y: {error}"))?;
                Ok::<_, String>((x, y))
            })
            .transpose()?;

        Ok(Self { pattern, at })
    }
}

fn load_config(args: &CliArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(size) = args.size {
        config.grid_size = size;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate().context("invalid engine configuration")?;
    Ok(config)
}

/// Diffs the current generation against the last frame and logs what a renderer would draw.
fn render_frame(engine: &Engine, diff: &mut RenderDiff) {
    let frame = engine.snapshot_for_render();
    let total = frame.size() * frame.size();
    let live = frame.live_count();
    let drawn = diff.render(frame, |_| {});
    let stats = engine.stats();
    let population = format!("{:.1}%", live as f64 / total as f64 * 100.0);

    info!(
        generation = engine.generation(),
        fills = drawn.fills,
        clears = drawn.clears,
        draw_calls = drawn.draw_calls(),
        live,
        dead = total - live,
        population = %population,
        cycle_ms = stats.cycle_time.as_secs_f64() * 1000.0,
        "frame"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let engine = Engine::start(config).context("failed to start engine")?;
    let size = engine.config().grid_size;

    for stamp in &args.patterns {
        let (x, y) = stamp.position(size);
        info!(pattern = stamp.pattern.name, x, y, "stamping pattern");
        engine.enqueue(Mutation::stamp(stamp.pattern, x, y));
    }
    if args.random {
        engine.enqueue(Mutation::RandomFill { density: None, seed: args.seed });
    }
    if args.patterns.is_empty() && !args.random {
        warn!("no pattern or random fill requested; the grid stays empty");
    }

    let mut diff = RenderDiff::new(size);
    {
        let finished = async {
            match args.generations {
                Some(count) => engine.run_generations(count).await,
                None => {
                    engine.set_running(true);
                    std::future::pending().await
                }
            }
        };
        tokio::pin!(finished);

        let mut frames = tokio::time::interval(Duration::from_millis(args.frame_ms));
        loop {
            tokio::select! {
                reached = &mut finished => {
                    let reached = reached.context("simulation stopped unexpectedly")?;
                    info!(generation = reached, "requested generations complete");
                    break;
                }
                _ = frames.tick() => render_frame(&engine, &mut diff),
                signal = tokio::signal::ctrl_c() => {
                    if let Err(error) = signal {
                        bail!("failed to listen for Ctrl-C: {error}");
                    }
                    info!("interrupted");
                    break;
                }
            }
        }
    }

    render_frame(&engine, &mut diff);
    engine.shutdown().await.context("engine failed")?;
    Ok(())
}
