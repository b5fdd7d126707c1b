use std::fmt::Debug;

use anyhow::{Result, bail};
#[cfg(test)]
use mockall::automock;
use opencv::{
    core::{Mat, MatTraitConst},
    imgproc::{COLOR_BGR2GRAY, cvt_color_def},
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use transport::{CursorOp, FrameBundle, Kind, PointerClient};

use crate::models::CaptureSource;

/// A source of grayscale frames with fixed dimensions.
#[cfg_attr(test, automock)]
pub trait FrameSource: Debug {
    /// Grabs the next frame, `None` once the stream has ended.
    fn grab(&mut self) -> Result<Option<Mat>>;

    fn width(&self) -> i32;

    fn height(&self) -> i32;
}

/// Default [`FrameSource`] backed by an OpenCV capture device.
///
/// Color conversion happens here so the pipeline only ever sees
/// single-channel intensity frames.
#[derive(Debug)]
pub struct VideoSource {
    inner: VideoCapture,
    width: i32,
    height: i32,
}

impl VideoSource {
    /// Opens `source`, failing when the camera / video stream cannot be
    /// opened.
    pub fn open(source: &CaptureSource) -> Result<Self> {
        let inner = match source {
            CaptureSource::Camera(index) => VideoCapture::new(*index, videoio::CAP_ANY)?,
            CaptureSource::Video(path) => VideoCapture::from_file(path, videoio::CAP_ANY)?,
        };
        if !inner.is_opened()? {
            bail!("could not open {source}");
        }

        let width = inner.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = inner.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        if width <= 0 || height <= 0 {
            bail!("{source} reports invalid frame size {width}x{height}");
        }

        Ok(Self {
            inner,
            width,
            height,
        })
    }
}

impl FrameSource for VideoSource {
    fn grab(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.inner.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }

        let mut gray = Mat::default();
        cvt_color_def(&frame, &mut gray, COLOR_BGR2GRAY)?;
        Ok(Some(gray))
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }
}

/// Handle to a cursor owned by a [`CursorSession`].
///
/// Deliberately not cloneable: a handle is acquired once per touch and given
/// back exactly once on removal.
#[derive(PartialEq, Eq, Debug)]
pub struct CursorHandle(u64);

impl CursorHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Session-oriented publishing boundary for tracked cursors.
///
/// Exactly one `begin_frame`/`commit_frame` pair brackets all cursor events
/// of a processed frame. Coordinates are normalized to [0, 1].
#[cfg_attr(test, automock)]
pub trait CursorSession: Debug {
    fn begin_frame(&mut self, timestamp_ms: i64);

    fn add_cursor(&mut self, id: u64, x: f32, y: f32) -> CursorHandle;

    fn update_cursor(&mut self, cursor: &CursorHandle, x: f32, y: f32);

    fn remove_cursor(&mut self, cursor: CursorHandle);

    fn commit_frame(&mut self) -> Result<()>;
}

/// The wire side of a [`PointerSession`].
#[cfg_attr(test, automock)]
trait PointerTransport: Debug {
    fn publish(&mut self, bundle: FrameBundle) -> transport::Result<()>;
}

impl PointerTransport for PointerClient {
    fn publish(&mut self, bundle: FrameBundle) -> transport::Result<()> {
        PointerClient::publish(self, bundle)
    }
}

/// Default [`CursorSession`] backed by the gRPC pointer transport.
///
/// Cursor operations accumulate between `begin_frame` and `commit_frame` and
/// ship as a single [`FrameBundle`] on commit, so subscribers never observe a
/// partially updated frame.
#[derive(Debug)]
pub struct PointerSession {
    transport: Box<dyn PointerTransport>,
    ops: Vec<CursorOp>,
    timestamp_ms: i64,
    frame: u64,
}

impl PointerSession {
    pub fn connect(url: &str) -> transport::Result<Self> {
        Ok(Self::with_transport(Box::new(PointerClient::connect(url)?)))
    }

    fn with_transport(transport: Box<dyn PointerTransport>) -> Self {
        Self {
            transport,
            ops: Vec::new(),
            timestamp_ms: 0,
            frame: 0,
        }
    }
}

impl CursorSession for PointerSession {
    fn begin_frame(&mut self, timestamp_ms: i64) {
        self.ops.clear();
        self.timestamp_ms = timestamp_ms;
    }

    fn add_cursor(&mut self, id: u64, x: f32, y: f32) -> CursorHandle {
        self.ops.push(CursorOp {
            cursor: id,
            kind: Kind::Add as i32,
            x,
            y,
        });
        CursorHandle::new(id)
    }

    fn update_cursor(&mut self, cursor: &CursorHandle, x: f32, y: f32) {
        self.ops.push(CursorOp {
            cursor: cursor.id(),
            kind: Kind::Update as i32,
            x,
            y,
        });
    }

    fn remove_cursor(&mut self, cursor: CursorHandle) {
        self.ops.push(CursorOp {
            cursor: cursor.id(),
            kind: Kind::Remove as i32,
            x: 0.0,
            y: 0.0,
        });
    }

    fn commit_frame(&mut self) -> Result<()> {
        self.frame += 1;
        let bundle = FrameBundle {
            timestamp_ms: self.timestamp_ms,
            frame: self.frame,
            ops: std::mem::take(&mut self.ops),
        };
        self.transport.publish(bundle)?;
        Ok(())
    }
}
