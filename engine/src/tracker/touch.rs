use opencv::core::Point2f;

use crate::bridge::CursorHandle;

/// A persistent identity assigned to a sequence of detections believed to be
/// the same fingertip across frames.
///
/// Owns the downstream cursor for its lifetime: the handle is attached when
/// the touch is first published and released exactly once when the touch is
/// retired.
#[derive(Debug)]
pub struct Touch {
    id: u64,
    position: Point2f,
    missed_frames: u32,
    matched: bool,
    cursor: Option<CursorHandle>,
}

impl Touch {
    pub(super) fn new(id: u64, position: Point2f) -> Self {
        Self {
            id,
            position,
            missed_frames: 0,
            matched: true,
            cursor: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn position(&self) -> Point2f {
        self.position
    }

    /// Consecutive frames in which this touch received no matching detection.
    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    pub(super) fn matched(&self) -> bool {
        self.matched
    }

    /// Re-measures the touch at `position`, resetting the miss counter.
    pub(super) fn rematch(&mut self, position: Point2f) {
        self.position = position;
        self.missed_frames = 0;
        self.matched = true;
    }

    pub(super) fn miss(&mut self) {
        self.missed_frames += 1;
    }

    pub(super) fn clear_matched(&mut self) {
        self.matched = false;
    }

    pub(super) fn cursor(&self) -> Option<&CursorHandle> {
        self.cursor.as_ref()
    }

    pub(super) fn attach_cursor(&mut self, cursor: CursorHandle) {
        self.cursor = Some(cursor);
    }

    pub(super) fn take_cursor(&mut self) -> Option<CursorHandle> {
        self.cursor.take()
    }
}
