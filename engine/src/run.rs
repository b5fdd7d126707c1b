use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::{debug, info};
use strum::Display;

use crate::{
    bridge::{CursorSession, FrameSource, PointerSession, VideoSource},
    debug::DebugWindow,
    detect::{ContourDetector, Detector},
    models::Settings,
    segment::Segmenter,
    tracker::TouchTracker,
};

/// Interval for reporting frames that overrun their throttle delay.
const SLOW_FRAME_LOG_SECS: u64 = 5;

/// How the frame loop ended.
#[derive(Clone, Copy, PartialEq, Display, Debug)]
pub enum Termination {
    /// The camera stream stopped or the last frame of the video was reached.
    #[strum(to_string = "end of stream")]
    EndOfStream,
    /// The user requested a stop.
    #[strum(to_string = "user interrupt")]
    Interrupted,
}

/// Runs the full pipeline until the stream ends or `stop` is raised.
///
/// Settings are re-read (and clamped) at every frame boundary, so the owner
/// of the handle can adjust tunables between frames.
pub fn run(settings: Arc<Mutex<Settings>>, stop: Arc<AtomicBool>) -> Result<Termination> {
    let (source, endpoint) = {
        let settings = settings.lock().unwrap();
        (settings.source.clone(), settings.endpoint.clone())
    };

    let source = VideoSource::open(&source)?;
    let mut session = PointerSession::connect(&endpoint)
        .with_context(|| format!("could not connect to pointer endpoint {endpoint}"))?;
    info!(
        target: "run",
        "tracking {}x{} frames, publishing to {endpoint}",
        source.width(),
        source.height(),
    );

    run_loop(source, &mut session, settings, stop)
}

fn run_loop(
    mut source: impl FrameSource,
    session: &mut dyn CursorSession,
    settings: Arc<Mutex<Settings>>,
    stop: Arc<AtomicBool>,
) -> Result<Termination> {
    let mut segmenter = Segmenter::new();
    let detector = ContourDetector;
    let mut tracker = TouchTracker::new(source.width(), source.height());
    let mut window = DebugWindow;
    let mut frame_count = 0u64;
    let mut last_slow_log = Instant::now();

    loop {
        let settings = settings.lock().unwrap().clamped();
        thread::sleep(Duration::from_millis(settings.frame_delay_millis));
        let start = Instant::now();

        let Some(gray) = source.grab()? else {
            info!(target: "run", "TERMINATION: camera stream stopped or last frame of video reached");
            return Ok(Termination::EndOfStream);
        };

        let mask = segmenter.apply(&gray, settings.blur_kernel, settings.binary_threshold)?;
        let detections = detector.detect(&mask)?;
        tracker.process(&detections, settings.distance_threshold, session)?;

        frame_count += 1;
        let elapsed = start.elapsed();
        if settings.display {
            window.show(
                &mask,
                &detections,
                tracker.touches(),
                frame_count,
                elapsed,
            )?;
        }

        if elapsed.as_millis() as u64 > settings.frame_delay_millis
            && last_slow_log.elapsed().as_secs() >= SLOW_FRAME_LOG_SECS
        {
            last_slow_log = Instant::now();
            debug!(
                target: "run",
                "frame #{frame_count} took {}ms with {} touches live",
                elapsed.as_millis(),
                tracker.touches().len(),
            );
        }

        if stop.load(Ordering::SeqCst) {
            info!(target: "run", "TERMINATION: user requested stop");
            return Ok(Termination::Interrupted);
        }
    }
}

#[cfg(test)]
mod tests {
    use opencv::core::{CV_8UC1, Mat, MatExprTraitConst};

    use super::*;
    use crate::bridge::{MockCursorSession, MockFrameSource};

    fn test_settings() -> Arc<Mutex<Settings>> {
        Arc::new(Mutex::new(Settings {
            frame_delay_millis: 0,
            ..Settings::default()
        }))
    }

    fn blank_frame() -> Mat {
        Mat::zeros(60, 80, CV_8UC1).unwrap().to_mat().unwrap()
    }

    fn frame_source(frames: u32) -> MockFrameSource {
        let mut source = MockFrameSource::new();
        let mut remaining = frames;
        source.expect_width().return_const(80);
        source.expect_height().return_const(60);
        source.expect_grab().returning(move || {
            if remaining == 0 {
                return Ok(None);
            }
            remaining -= 1;
            Ok(Some(blank_frame()))
        });
        source
    }

    #[test]
    fn loop_ends_when_the_stream_does() {
        let mut session = MockCursorSession::new();
        session.expect_begin_frame().times(3).return_const(());
        session.expect_commit_frame().times(3).returning(|| Ok(()));

        let termination = run_loop(
            frame_source(3),
            &mut session,
            test_settings(),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert_eq!(termination, Termination::EndOfStream);
    }

    #[test]
    fn loop_observes_the_stop_flag_after_publishing() {
        let mut session = MockCursorSession::new();
        session.expect_begin_frame().times(1).return_const(());
        session.expect_commit_frame().times(1).returning(|| Ok(()));

        let termination = run_loop(
            frame_source(100),
            &mut session,
            test_settings(),
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();
        assert_eq!(termination, Termination::Interrupted);
    }
}
