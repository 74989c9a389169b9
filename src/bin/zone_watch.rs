//! zone_watch - flag restricted-zone intrusions in a recorded video

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;

use zone_watch::config::{parse_point, ZoneWatchConfig};
use zone_watch::{validate_coordinates, FileSource, FrameSource, IntrusionDetector, Point};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input video path, or a synthetic scene (stub://static, stub://walker).
    #[arg(long, env = "ZONE_WATCH_INPUT")]
    input: Option<String>,
    /// Output video path. A trailing '/' or an existing directory writes JPEG frames.
    #[arg(long, env = "ZONE_WATCH_OUTPUT")]
    output: Option<String>,
    /// Zone type (line|polygon).
    #[arg(long, value_name = "TYPE")]
    zone_type: Option<String>,
    /// Zone point as x,y; repeat once per point, in order.
    #[arg(long = "point", value_name = "X,Y", value_parser = parse_point_arg)]
    points: Vec<Point>,
    /// Minimum detection confidence (0-1).
    #[arg(long)]
    confidence: Option<f32>,
    /// Config file (JSON, or TOML by extension). Defaults to $ZONE_WATCH_CONFIG.
    #[arg(long)]
    config: Option<String>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    /// Print video metadata and zone information as JSON, then exit.
    #[arg(long)]
    info: bool,
}

fn parse_point_arg(value: &str) -> std::result::Result<Point, String> {
    parse_point(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut cfg = match args.config.as_deref() {
        Some(path) => ZoneWatchConfig::load_from(Path::new(path)),
        None => ZoneWatchConfig::load(),
    }
    .context("load configuration")?;

    if let Some(kind) = args.zone_type.as_deref() {
        cfg.zone_kind = kind.parse()?;
    }
    if !args.points.is_empty() {
        cfg.zone_points = args.points.clone();
    }
    if let Some(confidence) = args.confidence {
        cfg.classifier.confidence_threshold = confidence;
    }
    cfg.classifier.validate()?;

    let input = args
        .input
        .or(cfg.input.clone())
        .ok_or_else(|| anyhow!("--input is required"))?;
    let zone = cfg.zone().context("build restricted zone")?;

    let meta = {
        let _stage = ui.stage("inspect input");
        FileSource::open(&input)?.metadata()
    };
    eprintln!(
        "input: {}x{} @ {:.2} fps, {} frames ({})",
        meta.width,
        meta.height,
        meta.fps,
        meta.frame_count,
        ui::format_clock(meta.duration_secs())
    );

    if args.info {
        let zone_check = validate_coordinates(zone.points(), meta.width, meta.height);
        let report = serde_json::json!({
            "video": {
                "fps": meta.fps,
                "width": meta.width,
                "height": meta.height,
                "frame_count": meta.frame_count,
                "duration_secs": meta.duration_secs(),
                "duration": ui::format_clock(meta.duration_secs()),
            },
            "zone": zone.info(),
            "zone_error": zone_check.err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let output = args
        .output
        .or(cfg.output.clone())
        .ok_or_else(|| anyhow!("--output is required"))?;

    let mut detector = IntrusionDetector::new(zone, cfg.classifier.clone())?;
    let mut progress = ui.progress("frames");
    let mut on_progress = |fraction: f64| progress.update(fraction);
    let summary = detector
        .run_video(&input, &output, Some(&mut on_progress))
        .with_context(|| format!("process {input}"))?;
    progress.finish();

    eprintln!("Total intrusions detected: {}", summary.total_intrusions);
    let report = serde_json::json!({
        "input": input,
        "output": output,
        "summary": summary,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
