use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use opencv::core::Point2f;

use super::{Detection, Touch, distance};
use crate::bridge::CursorSession;

/// Consecutive missed frames a touch survives; one more miss retires it.
const MAX_MISSED_FRAMES: u32 = 2;

/// Tracks touches across frames and republishes them as persistent cursors.
///
/// Association is greedy and order dependent: each detection claims the first
/// touch in registry order whose distance is strictly below the threshold and
/// that no earlier detection claimed this frame. This is not an optimal
/// assignment; two blobs passing within the threshold of each other can swap
/// identities.
#[derive(Debug)]
pub struct TouchTracker {
    touches: Vec<Touch>,
    next_id: u64,
    frame_width: f32,
    frame_height: f32,
}

impl TouchTracker {
    pub fn new(frame_width: i32, frame_height: i32) -> Self {
        Self {
            touches: Vec::new(),
            next_id: 1,
            frame_width: frame_width as f32,
            frame_height: frame_height as f32,
        }
    }

    /// The live registry in iteration order.
    pub fn touches(&self) -> &[Touch] {
        &self.touches
    }

    /// Advances the registry by one frame and publishes the stabilized state
    /// to `session` as one begin/commit bracketed batch.
    pub fn process(
        &mut self,
        detections: &[Detection],
        distance_threshold: f64,
        session: &mut dyn CursorSession,
    ) -> Result<()> {
        let retired = self.associate(detections, distance_threshold);
        self.publish(retired, session)
    }

    fn associate(&mut self, detections: &[Detection], distance_threshold: f64) -> Vec<Touch> {
        for detection in detections {
            match self.first_unmatched_within(detection.center, distance_threshold) {
                Some(index) => self.touches[index].rematch(detection.center),
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.touches.push(Touch::new(id, detection.center));
                }
            }
        }

        // A touch that already sat out its grace period retires on the next
        // miss; the counter itself stops at the retention limit plus one.
        let mut retired = Vec::new();
        let mut index = 0;
        while index < self.touches.len() {
            let touch = &mut self.touches[index];
            if touch.matched() {
                index += 1;
            } else if touch.missed_frames() > MAX_MISSED_FRAMES {
                retired.push(self.touches.remove(index));
            } else {
                touch.miss();
                index += 1;
            }
        }

        retired
    }

    fn first_unmatched_within(&self, center: Point2f, distance_threshold: f64) -> Option<usize> {
        self.touches.iter().position(|touch| {
            !touch.matched() && distance(touch.position(), center) < distance_threshold
        })
    }

    fn publish(&mut self, retired: Vec<Touch>, session: &mut dyn CursorSession) -> Result<()> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default();
        session.begin_frame(timestamp_ms);

        for touch in &mut self.touches {
            let x = touch.position().x / self.frame_width;
            let y = touch.position().y / self.frame_height;
            if touch.cursor().is_none() {
                let cursor = session.add_cursor(touch.id(), x, y);
                touch.attach_cursor(cursor);
            } else if touch.matched() {
                let cursor = touch.cursor().expect("cursor attached");
                session.update_cursor(cursor, x, y);
            }
        }

        for mut touch in retired {
            if let Some(cursor) = touch.take_cursor() {
                session.remove_cursor(cursor);
            }
        }

        session.commit_frame()?;

        for touch in &mut self.touches {
            touch.clear_matched();
        }
        Ok(())
    }
}
