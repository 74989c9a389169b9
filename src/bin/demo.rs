//! demo - synthetic walker scene through the full pipeline

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use zone_watch::{
    ClassifierConfig, FileSource, FrameSink, FrameSource, IntrusionDetector, JpegSequenceSink,
    Point, Zone, ZoneKind,
};

#[path = "../ui.rs"]
mod ui;

const SCENE: &str = "stub://walker";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory for annotated JPEG frames.
    #[arg(long, default_value = "demo_out")]
    out: String,
    /// Zone type (line|polygon).
    #[arg(long, default_value = "polygon", value_name = "TYPE")]
    zone_type: String,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn demo_zone(kind: ZoneKind) -> Result<Zone> {
    let points = match kind {
        ZoneKind::Polygon => vec![
            Point::new(120, 60),
            Point::new(220, 60),
            Point::new(220, 200),
            Point::new(120, 200),
        ],
        ZoneKind::Line => vec![Point::new(165, 20), Point::new(165, 220)],
    };
    Ok(Zone::new(kind, points)?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, false);

    let zone = demo_zone(args.zone_type.parse()?)?;
    let mut detector = IntrusionDetector::new(zone, ClassifierConfig::default())?;

    let mut source = FileSource::open(SCENE)?;
    let meta = source.metadata();
    detector.zone().validate_within(meta.width, meta.height)?;

    eprintln!(
        "demo: {} is {}x{}, {} frames ({})",
        SCENE,
        meta.width,
        meta.height,
        meta.frame_count,
        ui::format_clock(meta.duration_secs())
    );

    let out_dir = PathBuf::from(&args.out);
    let mut sink = JpegSequenceSink::create(&out_dir)?;

    let mut intrusions = 0u64;
    let mut crossings = 0u64;
    let mut last_center = None;
    {
        let _stage = ui.stage(&format!("run {SCENE}"));
        let mut progress = ui.progress("frames");
        while let Some(frame) = source.next_frame()? {
            let report = detector.process_frame(&frame)?;
            if meta.frame_count > 0 {
                progress.update(report.index as f64 / meta.frame_count as f64);
            }
            sink.write_frame(&report.annotated)?;
            intrusions += report.intrusions.len() as u64;

            let center = report.detections.first().map(|d| d.center());
            if detector.zone().crosses(last_center, center) {
                crossings += 1;
                eprintln!("demo: frame {} crossed the line", report.index);
            }
            if center.is_some() {
                last_center = center;
            }
        }
        progress.finish();
        sink.finish()?;
    }

    eprintln!(
        "demo: read {} frames, wrote {} -> {} ({} intrusions, {} line crossings)",
        source.stats().frames_read,
        sink.written(),
        out_dir.display(),
        intrusions,
        crossings
    );
    if intrusions == 0 {
        return Err(anyhow!("demo scene produced no intrusions"));
    }
    Ok(())
}
