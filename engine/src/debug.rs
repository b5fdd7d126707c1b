use std::time::Duration;

use anyhow::Result;
use opencv::{
    core::{Mat, Point, Scalar, Size},
    highgui::{imshow, wait_key},
    imgproc::{COLOR_GRAY2BGR, FONT_HERSHEY_PLAIN, LINE_8, cvt_color_def, ellipse, put_text_def},
};

use crate::tracker::{Detection, Touch};

const WINDOW_NAME: &str = "mtrack";

/// On-screen rendering of the current mask, fitted ellipses and touch ids.
///
/// Purely observational; key input is ignored, the window only needs its
/// event pump serviced once per frame.
#[derive(Default, Debug)]
pub struct DebugWindow;

impl DebugWindow {
    pub fn show(
        &mut self,
        mask: &Mat,
        detections: &[Detection],
        touches: &[Touch],
        frame: u64,
        frame_time: Duration,
    ) -> Result<()> {
        let mut canvas = Mat::default();
        cvt_color_def(mask, &mut canvas, COLOR_GRAY2BGR)?;

        for detection in detections {
            ellipse(
                &mut canvas,
                Point::new(detection.center.x as i32, detection.center.y as i32),
                Size::new(
                    (detection.size.width / 2.0) as i32,
                    (detection.size.height / 2.0) as i32,
                ),
                detection.angle as f64,
                0.0,
                360.0,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                1,
                LINE_8,
                0,
            )?;
        }

        for touch in touches {
            let position = touch.position();
            put_text_def(
                &mut canvas,
                &touch.id().to_string(),
                Point::new(position.x as i32 + 3, position.y as i32 + 3),
                FONT_HERSHEY_PLAIN,
                1.0,
                Scalar::all(255.0),
            )?;
        }

        put_text_def(
            &mut canvas,
            &format!("frame #{frame}"),
            Point::new(0, 15),
            FONT_HERSHEY_PLAIN,
            1.0,
            Scalar::all(255.0),
        )?;
        put_text_def(
            &mut canvas,
            &format!("time per frame: {}ms", frame_time.as_millis()),
            Point::new(0, 30),
            FONT_HERSHEY_PLAIN,
            1.0,
            Scalar::all(255.0),
        )?;

        imshow(WINDOW_NAME, &canvas)?;
        let _ = wait_key(1)?;
        Ok(())
    }
}
