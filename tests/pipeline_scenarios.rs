use image::Rgb;

use zone_watch::ingest::Mover;
use zone_watch::{
    ClassifierConfig, Detection, Error, Frame, FrameSink, FrameSource, IntrusionDetector,
    MemorySink, Point, RegionClassifier, Result, SyntheticScene, VideoMetadata, Zone, ZoneKind,
};

const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
const PERSON: Rgb<u8> = Rgb([230, 230, 230]);

fn square_zone() -> Zone {
    Zone::new(
        ZoneKind::Polygon,
        vec![
            Point::new(100, 50),
            Point::new(200, 50),
            Point::new(200, 150),
            Point::new(100, 150),
        ],
    )
    .expect("zone")
}

/// 10 frames; a 30x60 block steps through the zone on frames 4, 5 and 6.
fn walk_through_scene() -> SyntheticScene {
    let mut path = vec![None; 3];
    path.extend([102, 136, 170].map(|x| Some(Point::new(x, 70))));
    SyntheticScene::new(300, 200, 10, 10.0, BACKGROUND).with_mover(Mover {
        width: 30,
        height: 60,
        color: PERSON,
        path,
    })
}

fn detector() -> IntrusionDetector {
    IntrusionDetector::new(square_zone(), ClassifierConfig::with_threshold(0.3)).expect("detector")
}

fn per_frame_intrusions(scene: &mut SyntheticScene) -> Vec<usize> {
    let mut detector = detector();
    let mut counts = Vec::new();
    while let Some(frame) = scene.next_frame().expect("frame") {
        counts.push(detector.process_frame(&frame).expect("process").intrusions.len());
    }
    counts
}

#[test]
fn person_walking_through_zone_is_flagged_only_while_inside() {
    let counts = per_frame_intrusions(&mut walk_through_scene());
    assert_eq!(counts.len(), 10);
    for (i, count) in counts.iter().enumerate() {
        let frame = i + 1;
        if (4..=6).contains(&frame) {
            assert!(*count >= 1, "frame {frame} should have an intrusion");
        } else {
            assert_eq!(*count, 0, "frame {frame} should be clear");
        }
    }
}

#[test]
fn run_writes_every_annotated_frame_and_totals_match() {
    let mut scene = walk_through_scene();
    let mut sink = MemorySink::new();
    let summary = detector().run(&mut scene, &mut sink, None).expect("run");

    assert_eq!(summary.frames_processed, 10);
    assert_eq!(sink.frames.len(), 10);
    assert!(sink.finished);
    assert!(summary.frames_with_intrusions >= 3);
    assert!(summary.total_intrusions >= summary.frames_with_intrusions);
    // Annotated output differs from the raw input once the zone is drawn.
    assert_ne!(sink.frames[0], scene.render(0));
}

#[test]
fn static_scene_has_no_intrusions() {
    let mut scene = SyntheticScene::preset("static").expect("preset");
    let zone = Zone::new(
        ZoneKind::Polygon,
        vec![Point::new(0, 0), Point::new(319, 0), Point::new(319, 239), Point::new(0, 239)],
    )
    .expect("zone");
    let mut detector = IntrusionDetector::new(zone, ClassifierConfig::default()).expect("detector");
    let mut sink = MemorySink::new();
    let intrusions = detector.process(&mut scene, &mut sink, None).expect("process");
    assert_eq!(intrusions, 0);
    assert_eq!(sink.frames.len(), 30);
}

#[test]
fn rerun_with_fresh_detector_gives_same_count() {
    let first = detector()
        .process(&mut walk_through_scene(), &mut MemorySink::new(), None)
        .expect("first");
    let second = detector()
        .process(&mut walk_through_scene(), &mut MemorySink::new(), None)
        .expect("second");
    assert_eq!(first, second);

    // Reusing a detector restarts the background model.
    let mut reused = detector();
    let a = reused
        .process(&mut walk_through_scene(), &mut MemorySink::new(), None)
        .expect("a");
    let b = reused
        .process(&mut walk_through_scene(), &mut MemorySink::new(), None)
        .expect("b");
    assert_eq!(a, b);
    assert_eq!(a, first);
}

#[test]
fn progress_is_reported_once_per_frame_and_ends_at_one() {
    let mut seen = Vec::new();
    let mut on_progress = |p: f64| seen.push(p);
    detector()
        .run(&mut walk_through_scene(), &mut MemorySink::new(), Some(&mut on_progress))
        .expect("run");

    assert_eq!(seen.len(), 10);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(seen.last().copied(), Some(1.0));
}

#[test]
fn progress_is_skipped_when_frame_count_is_unknown() {
    let mut calls = 0;
    let mut on_progress = |_: f64| calls += 1;
    let mut scene = walk_through_scene().with_reported_frames(0);
    let summary = detector()
        .run(&mut scene, &mut MemorySink::new(), Some(&mut on_progress))
        .expect("run");
    assert_eq!(summary.frames_processed, 10);
    assert_eq!(calls, 0);
}

#[test]
fn zone_outside_frame_fails_before_any_output() {
    let zone = Zone::new(ZoneKind::Line, vec![Point::new(10, 10), Point::new(400, 10)])
        .expect("zone");
    let mut detector = IntrusionDetector::new(zone, ClassifierConfig::default()).expect("detector");
    let mut sink = MemorySink::new();
    let err = detector
        .run(&mut walk_through_scene(), &mut sink, None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidZone(_)), "{err}");
    assert!(sink.frames.is_empty());
    assert!(!sink.finished);
}

#[test]
fn zero_sized_stream_is_rejected() {
    let mut scene = SyntheticScene::new(0, 0, 5, 10.0, BACKGROUND);
    let mut sink = MemorySink::new();
    let err = detector().run(&mut scene, &mut sink, None).unwrap_err();
    assert!(matches!(err, Error::VideoOpen(_)), "{err}");
    assert!(!sink.finished);
}

struct Failing;

impl RegionClassifier for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn classify(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        Err(Error::classifier("model unavailable"))
    }
}

#[test]
fn classifier_failure_still_finishes_the_sink() {
    let mut detector = IntrusionDetector::with_classifier(square_zone(), Box::new(Failing));
    let mut sink = MemorySink::new();
    let err = detector
        .run(&mut walk_through_scene(), &mut sink, None)
        .unwrap_err();
    assert!(matches!(err, Error::Classifier(_)), "{err}");
    assert!(sink.frames.is_empty());
    assert!(sink.finished);
}

/// Yields two frames of the advertised size, then one that is smaller.
struct Shrinking {
    emitted: u32,
}

impl FrameSource for Shrinking {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::new(10.0, 300, 200, 4)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.emitted += 1;
        Ok(match self.emitted {
            1 | 2 => Some(Frame::from_pixel(300, 200, BACKGROUND)),
            3 => Some(Frame::from_pixel(150, 100, BACKGROUND)),
            _ => Some(Frame::from_pixel(300, 200, BACKGROUND)),
        })
    }
}

#[test]
fn frame_size_change_ends_the_run() {
    let mut sink = MemorySink::new();
    let summary = detector()
        .run(&mut Shrinking { emitted: 0 }, &mut sink, None)
        .expect("run");
    assert_eq!(summary.frames_processed, 2);
    assert_eq!(sink.frames.len(), 2);
    assert!(sink.finished);
}

#[test]
fn boxed_sink_and_source_are_accepted() {
    let mut source: Box<dyn FrameSource> = Box::new(walk_through_scene());
    let mut sink: Box<dyn FrameSink> = Box::new(MemorySink::new());
    let summary = detector().run(&mut source, &mut sink, None).expect("run");
    assert_eq!(summary.frames_processed, 10);
}

#[test]
fn mover_touching_left_edge_is_detected() {
    let mut path = vec![None; 3];
    path.push(Some(Point::new(0, 70)));
    let mut scene = SyntheticScene::new(300, 200, 6, 10.0, BACKGROUND).with_mover(Mover {
        width: 30,
        height: 60,
        color: PERSON,
        path,
    });
    let zone = Zone::new(
        ZoneKind::Polygon,
        vec![Point::new(0, 0), Point::new(120, 0), Point::new(120, 199), Point::new(0, 199)],
    )
    .expect("zone");
    let mut detector =
        IntrusionDetector::new(zone, ClassifierConfig::with_threshold(0.3)).expect("detector");

    let mut counts = Vec::new();
    while let Some(frame) = scene.next_frame().expect("frame") {
        counts.push(detector.process_frame(&frame).expect("process").intrusions.len());
    }
    assert_eq!(counts[..3], [0, 0, 0]);
    assert!(counts[3] >= 1, "edge mover missed: {counts:?}");
}

#[test]
fn line_zone_flags_only_the_frame_on_the_corridor() {
    // Centers on frames 4, 5, 6 are x = 117, 151, 185; the line sits at x = 151.
    let zone = Zone::new(ZoneKind::Line, vec![Point::new(151, 20), Point::new(151, 180)])
        .expect("zone");
    let mut detector =
        IntrusionDetector::new(zone, ClassifierConfig::with_threshold(0.3)).expect("detector");
    let mut sink = MemorySink::new();
    let mut scene = walk_through_scene();

    let mut per_frame = Vec::new();
    while let Some(frame) = scene.next_frame().expect("frame") {
        let report = detector.process_frame(&frame).expect("process");
        per_frame.push((report.detections.len(), report.intrusions.len()));
        sink.write_frame(&report.annotated).expect("write");
    }
    for (i, (detections, intrusions)) in per_frame.iter().enumerate() {
        match i + 1 {
            4 | 6 => {
                assert!(*detections >= 1, "frame {} should see the mover", i + 1);
                assert_eq!(*intrusions, 0, "frame {} is outside the corridor", i + 1);
            }
            5 => assert!(*intrusions >= 1, "frame 5 is on the line"),
            _ => assert_eq!(*intrusions, 0),
        }
    }

    let summary = IntrusionDetector::new(
        Zone::new(ZoneKind::Line, vec![Point::new(151, 20), Point::new(151, 180)]).expect("zone"),
        ClassifierConfig::with_threshold(0.3),
    )
    .expect("detector")
    .run(&mut walk_through_scene(), &mut MemorySink::new(), None)
    .expect("run");
    assert_eq!(summary.frames_with_intrusions, 1);
}

/// Fails on the third write and records how it was driven.
#[derive(Default)]
struct FailingSink {
    attempts: u32,
    finishes: u32,
}

impl FrameSink for FailingSink {
    fn write_frame(&mut self, _frame: &Frame) -> Result<()> {
        self.attempts += 1;
        if self.attempts == 3 {
            return Err(Error::video_write("disk full"));
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finishes += 1;
        Ok(())
    }
}

/// Counts frames handed out by the wrapped source.
struct Counting<S> {
    inner: S,
    pulled: u32,
}

impl<S: FrameSource> FrameSource for Counting<S> {
    fn metadata(&self) -> VideoMetadata {
        self.inner.metadata()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.inner.next_frame()?;
        if frame.is_some() {
            self.pulled += 1;
        }
        Ok(frame)
    }
}

#[test]
fn write_failure_aborts_run_and_finishes_sink_once() {
    let mut source = Counting {
        inner: walk_through_scene(),
        pulled: 0,
    };
    let mut sink = FailingSink::default();
    let err = detector().run(&mut source, &mut sink, None).unwrap_err();

    assert!(matches!(err, Error::VideoWrite(_)), "{err}");
    assert_eq!(sink.attempts, 3);
    assert_eq!(sink.finishes, 1);
    assert_eq!(source.pulled, 3);
}
