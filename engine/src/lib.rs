mod bridge;
mod config;
mod debug;
mod detect;
mod models;
mod run;
mod segment;
mod tracker;

pub use {
    bridge::{CursorHandle, CursorSession, FrameSource, PointerSession, VideoSource},
    config::{load_settings, save_settings},
    detect::{ContourDetector, Detector},
    models::{CaptureSource, Settings},
    run::{Termination, run},
    segment::Segmenter,
    tracker::{Detection, Touch, TouchTracker},
};
