//! Frame-by-frame intrusion detection.
//!
//! `IntrusionDetector` owns the zone (through its annotator), one classifier and the running
//! counters. Each frame is classified, detection centers are tested against the zone, the
//! frame is annotated and handed to the sink. Processing is strictly sequential; the
//! progress callback runs on the calling thread after every frame.

use serde::Serialize;

use crate::annotate::Annotator;
use crate::detect::{self, ClassifierConfig, Detection, RegionClassifier};
use crate::error::Result;
use crate::frame::Frame;
use crate::ingest::{FileSource, FrameSource};
use crate::output::{self, FrameSink};
use crate::zone::Zone;

/// Outcome of one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    /// 1-based position in the current run.
    pub index: u64,
    pub detections: Vec<Detection>,
    pub intrusions: Vec<Detection>,
    pub annotated: Frame,
}

/// Totals for a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub total_intrusions: u64,
    pub frames_with_intrusions: u64,
    pub total_detections: u64,
}

impl RunSummary {
    fn record(&mut self, report: &FrameReport) {
        self.frames_processed += 1;
        self.total_detections += report.detections.len() as u64;
        self.total_intrusions += report.intrusions.len() as u64;
        if !report.intrusions.is_empty() {
            self.frames_with_intrusions += 1;
        }
    }
}

pub struct IntrusionDetector {
    classifier: Box<dyn RegionClassifier>,
    annotator: Annotator,
    frames_processed: u64,
}

impl IntrusionDetector {
    /// Detector with the default motion classifier for this build.
    pub fn new(zone: Zone, config: ClassifierConfig) -> Result<Self> {
        Ok(Self::with_classifier(zone, detect::default_classifier(config)?))
    }

    pub fn with_classifier(zone: Zone, classifier: Box<dyn RegionClassifier>) -> Self {
        Self {
            classifier,
            annotator: Annotator::new(zone),
            frames_processed: 0,
        }
    }

    pub fn zone(&self) -> &Zone {
        self.annotator.zone()
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// Detections whose center lies inside the zone.
    pub fn intrusions_in(&self, detections: &[Detection]) -> Vec<Detection> {
        detections
            .iter()
            .filter(|d| self.zone().contains(d.center()))
            .copied()
            .collect()
    }

    /// Classify, test and annotate a single frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameReport> {
        let detections = self.classifier.classify(frame)?;
        let intrusions = self.intrusions_in(&detections);
        self.frames_processed += 1;

        let mut annotated = frame.clone();
        self.annotator.draw(&mut annotated, &detections, &intrusions);

        if !intrusions.is_empty() {
            log::debug!(
                "frame {}: {} intrusion(s) among {} detection(s)",
                self.frames_processed,
                intrusions.len(),
                detections.len()
            );
        }
        Ok(FrameReport {
            index: self.frames_processed,
            detections,
            intrusions,
            annotated,
        })
    }

    /// Process every frame of `source` into `sink` and return the run totals.
    ///
    /// The source metadata and zone are validated before any frame is read; on failure
    /// nothing is written and the sink is left untouched. Once processing starts the sink is
    /// finished exactly once, whether the run succeeds or not. A frame whose size differs
    /// from the metadata ends the stream.
    pub fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        on_progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let meta = source.metadata();
        meta.validate()?;
        self.zone().validate_within(meta.width, meta.height)?;

        self.classifier.reset();
        self.frames_processed = 0;
        log::info!(
            "processing {}x{} stream ({} frames) with {} classifier, {} zone",
            meta.width,
            meta.height,
            meta.frame_count,
            self.classifier.name(),
            self.zone().kind()
        );

        let outcome = self.run_frames(source, sink, on_progress);
        let finished = sink.finish();
        let summary = outcome?;
        finished?;

        log::info!(
            "processed {} frame(s): {} intrusion(s) on {} frame(s)",
            summary.frames_processed,
            summary.total_intrusions,
            summary.frames_with_intrusions
        );
        Ok(summary)
    }

    fn run_frames<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        mut on_progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let meta = source.metadata();
        let mut summary = RunSummary::default();

        while let Some(frame) = source.next_frame()? {
            if !meta.matches(&frame) {
                log::warn!(
                    "frame {} is {}x{}, stream is {}x{}; stopping",
                    summary.frames_processed + 1,
                    frame.width(),
                    frame.height(),
                    meta.width,
                    meta.height
                );
                break;
            }

            let report = self.process_frame(&frame)?;
            summary.record(&report);
            sink.write_frame(&report.annotated)?;

            if let Some(callback) = on_progress.as_deref_mut() {
                if meta.frame_count > 0 {
                    let progress = summary.frames_processed as f64 / meta.frame_count as f64;
                    callback(progress.min(1.0));
                }
            }
        }
        Ok(summary)
    }

    /// Like `run`, returning only the intrusion count.
    pub fn process<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        on_progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<u64>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        Ok(self.run(source, sink, on_progress)?.total_intrusions)
    }

    /// Open `input`, write the annotated stream to `output` and return the run totals.
    ///
    /// The output is only created after the zone has been validated against the input.
    pub fn run_video(
        &mut self,
        input: &str,
        output: &str,
        on_progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<RunSummary> {
        let mut source = FileSource::open(input)?;
        let meta = source.metadata();
        meta.validate()?;
        self.zone().validate_within(meta.width, meta.height)?;

        let mut sink = output::create_sink(output, &meta)?;
        self.run(&mut source, &mut sink, on_progress)
    }

    pub fn process_video(
        &mut self,
        input: &str,
        output: &str,
        on_progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<u64> {
        Ok(self.run_video(input, output, on_progress)?.total_intrusions)
    }
}
