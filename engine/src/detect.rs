use std::fmt::Debug;

use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use opencv::{
    core::{Mat, Point, Vec4i, Vector},
    imgproc::{
        CHAIN_APPROX_SIMPLE, RETR_CCOMP, contour_area, find_contours_with_hierarchy, fit_ellipse,
    },
};

use crate::tracker::Detection;

/// Contours enclosing at most this area are noise, not blobs.
const MAX_NOISE_AREA: f64 = 30.0;

/// Contours with at most this many boundary points cannot be fitted with a
/// stable ellipse.
const MAX_UNSTABLE_POINTS: usize = 4;

/// Extracts candidate blob detections from a binary foreground mask.
#[cfg_attr(test, automock)]
pub trait Detector: Debug {
    fn detect(&self, mask: &Mat) -> Result<Vec<Detection>>;
}

/// Default [`Detector`] fitting rotated ellipses to outer contours.
///
/// Detections come out in contour traversal order; the order is deterministic
/// for a given mask but otherwise arbitrary.
#[derive(Default, Debug)]
pub struct ContourDetector;

impl Detector for ContourDetector {
    fn detect(&self, mask: &Mat) -> Result<Vec<Detection>> {
        let mut contours = Vector::<Vector<Point>>::new();
        let mut hierarchy = Vector::<Vec4i>::new();
        find_contours_with_hierarchy(
            mask,
            &mut contours,
            &mut hierarchy,
            RETR_CCOMP,
            CHAIN_APPROX_SIMPLE,
            Point::default(),
        )?;

        let mut detections = Vec::new();
        if hierarchy.is_empty() {
            return Ok(detections);
        }

        // Walk the top-level contours through the next-sibling links; hole
        // boundaries sit one level down and are not separate blobs.
        let mut index = 0;
        while index >= 0 {
            let contour = contours.get(index as usize)?;
            if contour_area(&contour, false)? > MAX_NOISE_AREA
                && contour.len() > MAX_UNSTABLE_POINTS
            {
                let ellipse = fit_ellipse(&contour)?;
                detections.push(Detection {
                    center: ellipse.center,
                    size: ellipse.size,
                    angle: ellipse.angle,
                });
            }
            index = hierarchy.get(index as usize)?[0];
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use opencv::{
        core::{CV_8UC1, MatExprTraitConst, Scalar},
        imgproc::{FILLED, LINE_8, circle},
    };

    use super::*;

    fn blank_mask() -> Mat {
        Mat::zeros(120, 120, CV_8UC1).unwrap().to_mat().unwrap()
    }

    fn draw_disc(mask: &mut Mat, center: Point, radius: i32) {
        circle(mask, center, radius, Scalar::all(255.0), FILLED, LINE_8, 0).unwrap();
    }

    #[test]
    fn empty_mask_yields_no_detections() {
        let detections = ContourDetector.detect(&blank_mask()).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn disc_is_detected_at_its_center() {
        let mut mask = blank_mask();
        draw_disc(&mut mask, Point::new(60, 60), 10);

        let detections = ContourDetector.detect(&mask).unwrap();
        assert_eq!(detections.len(), 1);

        let detection = &detections[0];
        assert!((detection.center.x - 60.0).abs() < 2.0);
        assert!((detection.center.y - 60.0).abs() < 2.0);
        assert!((detection.size.width - 20.0).abs() < 3.0);
        assert!((detection.size.height - 20.0).abs() < 3.0);
    }

    #[test]
    fn undersized_contours_are_skipped() {
        let mut mask = blank_mask();
        // A lone pixel and a 3x3 dot both enclose less area than the filter.
        draw_disc(&mut mask, Point::new(20, 20), 0);
        draw_disc(&mut mask, Point::new(80, 80), 1);

        let detections = ContourDetector.detect(&mask).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn hole_boundaries_are_not_reported() {
        let mut mask = blank_mask();
        // A ring has an outer boundary and a hole boundary.
        circle(
            &mut mask,
            Point::new(60, 60),
            15,
            Scalar::all(255.0),
            4,
            LINE_8,
            0,
        )
        .unwrap();

        let detections = ContourDetector.detect(&mask).unwrap();
        assert_eq!(detections.len(), 1);
    }

    #[test]
    fn multiple_blobs_are_all_reported() {
        let mut mask = blank_mask();
        draw_disc(&mut mask, Point::new(30, 30), 8);
        draw_disc(&mut mask, Point::new(90, 90), 8);

        let mut detections = ContourDetector.detect(&mask).unwrap();
        assert_eq!(detections.len(), 2);

        detections.sort_by(|a, b| a.center.x.total_cmp(&b.center.x));
        assert!((detections[0].center.x - 30.0).abs() < 2.0);
        assert!((detections[1].center.x - 90.0).abs() < 2.0);
    }
}
