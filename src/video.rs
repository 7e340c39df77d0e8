//! OpenCV-backed collaborators: file capture, annotated video writer, an interactive
//! window that turns mouse input into [`PointerEvent`]s, and the overlay renderer.

use std::path::Path;
use std::sync::{Arc, Mutex};

use nalgebra as na;
use opencv::{
    core::{self, Mat, Vector},
    highgui, imgproc,
    prelude::*,
    videoio,
};

use crate::bbox::{BBox, Ltrb};
use crate::controller::PointerEvent;
use crate::counter::Counter;
use crate::detection::Detection;
use crate::error::Error;
use crate::pipeline::{Annotate, Display, DisplayFeedback, FrameSink, FrameSource};
use crate::region::{Color, Region};

const QUIT_KEY: i32 = b'q' as i32;

/// Whether OpenCV sees a CUDA device; used to resolve `--device auto`.
pub fn has_cuda() -> bool {
    core::get_cuda_enabled_device_count()
        .map(|n| n > 0)
        .unwrap_or(false)
}

pub struct VideoCapture {
    cam: videoio::VideoCapture,
    fps: f64,
    dims: (i32, i32),
}

impl VideoCapture {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let cam = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;

        if !videoio::VideoCapture::is_opened(&cam)? {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }

        let width = cam.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = cam.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        let fps = cam.get(videoio::CAP_PROP_FPS)?;

        log::info!("video {:?}: {}x{} @ {:.2} fps", path, width, height, fps);

        Ok(Self {
            cam,
            fps,
            dims: (width, height),
        })
    }

    #[inline]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    #[inline]
    pub fn dims(&self) -> (i32, i32) {
        self.dims
    }
}

impl FrameSource for VideoCapture {
    type Frame = Mat;

    fn read(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();

        // a failed read is the end of the stream, not an error
        match self.cam.read(&mut frame) {
            Ok(true) if frame.cols() > 0 && frame.rows() > 0 => Ok(Some(frame)),
            Ok(_) => Ok(None),
            Err(err) => {
                log::info!("frame read failed, stopping: {}", err);
                Ok(None)
            }
        }
    }
}

impl Drop for VideoCapture {
    fn drop(&mut self) {
        if let Err(err) = self.cam.release() {
            log::warn!("failed to release capture: {}", err);
        }
    }
}

/// mp4v writer with the frame rate and size of the source, fixed at creation.
pub struct VideoWriter {
    writer: videoio::VideoWriter,
}

impl VideoWriter {
    pub fn new<P: AsRef<Path>>(out_file: P, fps: f64, size: (i32, i32)) -> Result<Self, Error> {
        let out_file = out_file.as_ref();
        let writer = videoio::VideoWriter::new(
            &out_file.to_string_lossy(),
            videoio::VideoWriter::fourcc(b'm' as _, b'p' as _, b'4' as _, b'v' as _)?,
            fps,
            core::Size::new(size.0, size.1),
            true,
        )?;

        log::info!("writing annotated video to {:?}", out_file);

        Ok(Self { writer })
    }

    pub fn release(&mut self) -> Result<(), Error> {
        self.writer.release()?;
        Ok(())
    }
}

impl FrameSink<Mat> for VideoWriter {
    fn write(&mut self, frame: &Mat) -> Result<(), Error> {
        self.writer.write(frame)?;
        Ok(())
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::warn!("failed to release writer: {}", err);
        }
    }
}

/// Preview window. Mouse input is queued by the highgui callback and handed out on
/// the next [`Display::show`], on the loop's own thread.
pub struct Window {
    name: String,
    events: Arc<Mutex<Vec<PointerEvent>>>,
}

impl Window {
    pub fn open<S: Into<String>>(name: S) -> Result<Self, Error> {
        let name = name.into();
        let events = Arc::new(Mutex::new(Vec::new()));

        highgui::named_window(&name, highgui::WINDOW_AUTOSIZE)?;

        let queue = Arc::clone(&events);
        highgui::set_mouse_callback(
            &name,
            Some(Box::new(move |event, x, y, _flags| {
                let (x, y) = (x as f32, y as f32);
                let event = match event {
                    highgui::EVENT_LBUTTONDOWN => PointerEvent::press(x, y),
                    highgui::EVENT_MOUSEMOVE => PointerEvent::moved(x, y),
                    highgui::EVENT_LBUTTONUP => PointerEvent::release(x, y),
                    _ => return,
                };

                if let Ok(mut queue) = queue.lock() {
                    queue.push(event);
                }
            })),
        )?;

        Ok(Self { name, events })
    }
}

impl Display<Mat> for Window {
    fn show(&mut self, frame: &Mat) -> Result<DisplayFeedback, Error> {
        highgui::imshow(&self.name, frame)?;
        let key = highgui::wait_key(1)?;

        let events = match self.events.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        };

        Ok(DisplayFeedback {
            events,
            quit: key & 0xFF == QUIT_KEY,
        })
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_window(&self.name) {
            log::warn!("failed to close window {:?}: {}", self.name, err);
        }
    }
}

#[inline]
fn scalar(color: Color) -> core::Scalar {
    core::Scalar::new(color[0] as f64, color[1] as f64, color[2] as f64, 255.0)
}

#[inline]
fn point(p: &na::Point2<f32>) -> core::Point {
    core::Point::new(p.x as i32, p.y as i32)
}

/// Stable per-class color.
fn class_color(class: i32) -> Color {
    const PALETTE: [Color; 10] = [
        [56, 56, 255],
        [151, 157, 255],
        [31, 112, 255],
        [29, 178, 255],
        [49, 210, 207],
        [10, 249, 72],
        [23, 204, 146],
        [134, 219, 61],
        [211, 188, 0],
        [255, 115, 100],
    ];

    PALETTE[class.rem_euclid(PALETTE.len() as i32) as usize]
}

/// Draws regions with their counts, tracked boxes and trajectories.
pub struct Overlay {
    pub names: Vec<String>,
    pub line_thickness: i32,
    pub track_thickness: i32,
    pub region_thickness: i32,
}

impl Overlay {
    fn class_name(&self, class: i32) -> String {
        usize::try_from(class)
            .ok()
            .and_then(|idx| self.names.get(idx))
            .cloned()
            .unwrap_or_else(|| class.to_string())
    }

    fn draw_label(
        &self,
        frame: &mut Mat,
        text: &str,
        anchor: core::Point,
        background: Color,
        foreground: Color,
    ) -> Result<(), Error> {
        let scale = 0.7;
        let mut baseline = 0;
        let size = imgproc::get_text_size(
            text,
            imgproc::FONT_HERSHEY_SIMPLEX,
            scale,
            self.line_thickness,
            &mut baseline,
        )?;

        imgproc::rectangle(
            frame,
            core::Rect::new(
                anchor.x - 5,
                anchor.y - size.height - 5,
                size.width + 10,
                size.height + 10,
            ),
            scalar(background),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;

        imgproc::put_text(
            frame,
            text,
            anchor,
            imgproc::FONT_HERSHEY_SIMPLEX,
            scale,
            scalar(foreground),
            self.line_thickness,
            imgproc::LINE_AA,
            false,
        )?;

        Ok(())
    }

    fn draw_region(&self, frame: &mut Mat, region: &Region) -> Result<(), Error> {
        let ring: Vector<core::Point> = region.polygon.vertices().iter().map(point).collect();
        let mut rings = Vector::<Vector<core::Point>>::new();
        rings.push(ring);

        imgproc::polylines(
            frame,
            &rings,
            true,
            scalar(region.color),
            self.region_thickness,
            imgproc::LINE_AA,
            0,
        )?;

        self.draw_label(
            frame,
            &region.label(),
            point(&region.label_anchor()),
            region.color,
            region.text_color,
        )
    }

    fn draw_box(
        &self,
        frame: &mut Mat,
        bbox: &BBox<Ltrb>,
        label: &str,
        color: Color,
    ) -> Result<(), Error> {
        let size = bbox.as_xywh();
        let rect = core::Rect::new(
            bbox.left() as i32,
            bbox.top() as i32,
            size.width() as i32,
            size.height() as i32,
        );

        imgproc::rectangle(
            frame,
            rect,
            scalar(color),
            self.line_thickness,
            imgproc::LINE_8,
            0,
        )?;

        self.draw_label(
            frame,
            label,
            core::Point::new(rect.x, rect.y),
            color,
            [255, 255, 255],
        )
    }
}

impl Annotate<Mat> for Overlay {
    fn annotate(
        &self,
        frame: &mut Mat,
        detections: &[Detection],
        counter: &Counter,
    ) -> Result<(), Error> {
        // only tracked boxes are drawn, like the counting itself
        for det in detections {
            let track_id = match det.track_id {
                Some(id) => id,
                None => continue,
            };

            let color = class_color(det.class);
            self.draw_box(frame, &det.bbox, &self.class_name(det.class), color)?;

            if let Some(trajectory) = counter.history().get(track_id) {
                let pts: Vector<core::Point> = trajectory.points().map(point).collect();
                let mut lines = Vector::<Vector<core::Point>>::new();
                lines.push(pts);

                imgproc::polylines(
                    frame,
                    &lines,
                    false,
                    scalar(color),
                    self.track_thickness,
                    imgproc::LINE_AA,
                    0,
                )?;
            }
        }

        for region in counter.regions().iter() {
            self.draw_region(frame, region)?;
        }

        Ok(())
    }
}
