use anyhow::Result;
use opencv::{
    core::{Mat, MatTraitConst, ModifyInplace, Size, absdiff},
    imgproc::{THRESH_BINARY, blur_def, threshold},
};

/// Turns raw grayscale frames into binary foreground masks by differencing
/// against a fixed reference frame.
///
/// The reference is captured from the first frame this segmenter sees and
/// stays immutable for the rest of the run.
#[derive(Default, Debug)]
pub struct Segmenter {
    reference: Option<Mat>,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Produces the foreground mask for `gray`.
    ///
    /// The difference against the reference is reduced by its own box-blurred
    /// copy, suppressing broad illumination drift while keeping sharp
    /// localized changes, then thresholded into a 0/255 mask. Frames must
    /// match the reference frame's dimensions.
    pub fn apply(&mut self, gray: &Mat, blur_kernel: i32, binary_threshold: f64) -> Result<Mat> {
        if self.reference.is_none() {
            self.reference = Some(gray.try_clone()?);
        }
        let reference = self.reference.as_ref().expect("reference captured");

        let mut diff = Mat::default();
        absdiff(reference, gray, &mut diff)?;

        let mut blurred = Mat::default();
        blur_def(&diff, &mut blurred, Size::new(blur_kernel, blur_kernel))?;

        let mut residual = Mat::default();
        absdiff(&diff, &blurred, &mut residual)?;
        unsafe {
            // SAFETY: threshold can be called in place.
            residual.modify_inplace(|mat, mat_mut| {
                threshold(mat, mat_mut, binary_threshold, 255.0, THRESH_BINARY).unwrap()
            });
        }

        Ok(residual)
    }
}

#[cfg(test)]
mod tests {
    use opencv::{
        core::{CV_8UC1, Rect, Scalar, count_non_zero},
        imgproc::{FILLED, LINE_8, rectangle},
    };

    use super::*;

    fn uniform_frame(value: f64) -> Mat {
        Mat::new_rows_cols_with_default(120, 120, CV_8UC1, Scalar::all(value)).unwrap()
    }

    fn frame_with_spot(background: f64, spot: Rect) -> Mat {
        let mut frame = uniform_frame(background);
        rectangle(&mut frame, spot, Scalar::all(250.0), FILLED, LINE_8, 0).unwrap();
        frame
    }

    #[test]
    fn first_frame_becomes_reference_and_yields_empty_mask() {
        let mut segmenter = Segmenter::new();
        let mask = segmenter.apply(&uniform_frame(10.0), 40, 16.0).unwrap();

        assert!(segmenter.has_reference());
        assert_eq!(count_non_zero(&mask).unwrap(), 0);
    }

    #[test]
    fn sharp_bright_spot_is_classified_foreground() {
        let mut segmenter = Segmenter::new();
        segmenter.apply(&uniform_frame(10.0), 40, 16.0).unwrap();

        let mask = segmenter
            .apply(&frame_with_spot(10.0, Rect::new(57, 57, 6, 6)), 40, 16.0)
            .unwrap();

        // The spot is small relative to the blur kernel, so its center
        // survives the local-mean subtraction.
        assert_eq!(*mask.at_2d::<u8>(60, 60).unwrap(), 255);
        assert_eq!(*mask.at_2d::<u8>(10, 10).unwrap(), 0);
    }

    #[test]
    fn threshold_suppresses_weak_changes() {
        let mut segmenter = Segmenter::new();
        segmenter.apply(&uniform_frame(10.0), 40, 16.0).unwrap();

        // An intensity step of 12 stays below a threshold of 16.
        let mut frame = uniform_frame(10.0);
        rectangle(
            &mut frame,
            Rect::new(57, 57, 6, 6),
            Scalar::all(22.0),
            FILLED,
            LINE_8,
            0,
        )
        .unwrap();
        let mask = segmenter.apply(&frame, 40, 16.0).unwrap();

        assert_eq!(count_non_zero(&mask).unwrap(), 0);
    }

    #[test]
    fn reference_stays_immutable_across_frames() {
        let baseline = uniform_frame(10.0);
        let mut segmenter = Segmenter::new();
        segmenter.apply(&baseline, 40, 16.0).unwrap();
        segmenter
            .apply(&frame_with_spot(10.0, Rect::new(57, 57, 6, 6)), 40, 16.0)
            .unwrap();

        // Returning to the baseline frame differences back to nothing, so the
        // reference cannot have drifted toward later frames.
        let mask = segmenter.apply(&baseline, 40, 16.0).unwrap();
        assert_eq!(count_non_zero(&mask).unwrap(), 0);
    }
}
