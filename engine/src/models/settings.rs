use serde::{Deserialize, Serialize};
use strum::Display;

/// Valid range of the box blur kernel size in pixels.
const BLUR_KERNEL_RANGE: (i32, i32) = (1, 150);

/// Valid range of the binary threshold applied to the residual image.
const BINARY_THRESHOLD_RANGE: (f64, f64) = (1.0, 35.0);

/// Valid range of the touch association distance in pixels.
const DISTANCE_THRESHOLD_RANGE: (f64, f64) = (1.0, 50.0);

/// Where frames are acquired from.
#[derive(Clone, PartialEq, Serialize, Deserialize, Display, Debug)]
#[serde(tag = "kind", content = "value")]
pub enum CaptureSource {
    /// A camera device index as enumerated by the capture backend.
    #[strum(to_string = "camera {0}")]
    Camera(i32),
    /// A path to a prerecorded video file.
    #[strum(to_string = "video file {0}")]
    Video(String),
}

impl Default for CaptureSource {
    fn default() -> Self {
        Self::Camera(0)
    }
}

/// Runtime-tunable configuration.
///
/// Tunables are read fresh at each frame boundary through [`Settings::clamped`];
/// out-of-range values are pulled back to the edge of their valid range rather
/// than rejected.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct Settings {
    #[serde(default)]
    pub source: CaptureSource,
    /// Box blur kernel size used to estimate ambient lighting variation.
    #[serde(default = "blur_kernel_default")]
    pub blur_kernel: i32,
    /// Residual intensity above which a pixel is classified foreground.
    #[serde(default = "binary_threshold_default")]
    pub binary_threshold: f64,
    /// Maximum euclidean pixel distance at which a detection continues an
    /// existing touch.
    #[serde(default = "distance_threshold_default")]
    pub distance_threshold: f64,
    /// Artificial per-frame delay throttling the loop.
    #[serde(default = "frame_delay_millis_default")]
    pub frame_delay_millis: u64,
    /// URL of the downstream pointer service.
    #[serde(default = "endpoint_default")]
    pub endpoint: String,
    /// Shows the visualization window when enabled.
    #[serde(default)]
    pub display: bool,
}

impl Settings {
    /// Returns a copy with every tunable clamped to its valid range.
    pub fn clamped(&self) -> Settings {
        let mut settings = self.clone();
        settings.blur_kernel = settings
            .blur_kernel
            .clamp(BLUR_KERNEL_RANGE.0, BLUR_KERNEL_RANGE.1);
        settings.binary_threshold = settings
            .binary_threshold
            .clamp(BINARY_THRESHOLD_RANGE.0, BINARY_THRESHOLD_RANGE.1);
        settings.distance_threshold = settings
            .distance_threshold
            .clamp(DISTANCE_THRESHOLD_RANGE.0, DISTANCE_THRESHOLD_RANGE.1);
        settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: CaptureSource::default(),
            blur_kernel: blur_kernel_default(),
            binary_threshold: binary_threshold_default(),
            distance_threshold: distance_threshold_default(),
            frame_delay_millis: frame_delay_millis_default(),
            endpoint: endpoint_default(),
            display: false,
        }
    }
}

fn blur_kernel_default() -> i32 {
    40
}

fn binary_threshold_default() -> f64 {
    16.0
}

fn distance_threshold_default() -> f64 {
    25.0
}

fn frame_delay_millis_default() -> u64 {
    30
}

fn endpoint_default() -> String {
    "http://127.0.0.1:50051".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_pulls_tunables_into_range() {
        let settings = Settings {
            blur_kernel: 500,
            binary_threshold: 0.1,
            distance_threshold: 99.0,
            ..Settings::default()
        };

        let clamped = settings.clamped();
        assert_eq!(clamped.blur_kernel, 150);
        assert_eq!(clamped.binary_threshold, 1.0);
        assert_eq!(clamped.distance_threshold, 50.0);
    }

    #[test]
    fn clamped_keeps_in_range_tunables() {
        let settings = Settings::default();
        assert_eq!(settings.clamped(), settings);
    }

    #[test]
    fn deserializes_with_defaults() {
        let settings = serde_json::from_str::<Settings>("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn deserializes_partial_overrides() {
        let settings =
            serde_json::from_str::<Settings>(r#"{"binary_threshold": 20.5, "display": true}"#)
                .unwrap();
        assert_eq!(settings.binary_threshold, 20.5);
        assert!(settings.display);
        assert_eq!(settings.blur_kernel, 40);
    }
}
