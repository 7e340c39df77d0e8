//! The per-frame loop and the seams to the collaborators it drives: a frame source,
//! the upstream tracker, an annotator, an optional writer and an optional window.
//!
//! Everything runs on the caller's thread. Pointer events returned by the window are
//! applied after the frame has been counted, so they take effect from the next frame on.

use crate::controller::{InteractionController, PointerEvent};
use crate::counter::{Counter, FrameReport, RegionCount};
use crate::detection::Detection;
use crate::error::Error;

pub trait FrameSource {
    type Frame;

    /// `Ok(None)` ends the stream; a failed read is reported the same way.
    fn read(&mut self) -> Result<Option<Self::Frame>, Error>;
}

/// The upstream detector/tracker.
pub trait Tracking<F> {
    fn track(&mut self, frame: &F) -> Result<Vec<Detection>, Error>;
}

/// Draws boxes, trajectories, regions and labels onto a frame.
pub trait Annotate<F> {
    fn annotate(
        &self,
        frame: &mut F,
        detections: &[Detection],
        counter: &Counter,
    ) -> Result<(), Error>;
}

pub trait FrameSink<F> {
    fn write(&mut self, frame: &F) -> Result<(), Error>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayFeedback {
    pub events: Vec<PointerEvent>,
    pub quit: bool,
}

pub trait Display<F> {
    fn show(&mut self, frame: &F) -> Result<DisplayFeedback, Error>;
}

impl<F, K: FrameSink<F>> FrameSink<F> for Option<K> {
    #[inline]
    fn write(&mut self, frame: &F) -> Result<(), Error> {
        match self {
            Some(sink) => sink.write(frame),
            None => Ok(()),
        }
    }
}

impl<F, D: Display<F>> Display<F> for Option<D> {
    #[inline]
    fn show(&mut self, frame: &F) -> Result<DisplayFeedback, Error> {
        match self {
            Some(display) => display.show(frame),
            None => Ok(DisplayFeedback::default()),
        }
    }
}

/// Collaborator that does nothing: no drawing, no output, no window.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl<F> Annotate<F> for Headless {
    #[inline]
    fn annotate(&self, _: &mut F, _: &[Detection], _: &Counter) -> Result<(), Error> {
        Ok(())
    }
}

impl<F> FrameSink<F> for Headless {
    #[inline]
    fn write(&mut self, _: &F) -> Result<(), Error> {
        Ok(())
    }
}

impl<F> Display<F> for Headless {
    #[inline]
    fn show(&mut self, _: &F) -> Result<DisplayFeedback, Error> {
        Ok(DisplayFeedback::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Counted(FrameReport),
    Quit(FrameReport),
    EndOfStream,
}

/// One video processed by one tracker. Owns the counting state for its whole duration.
pub struct Session<S, T> {
    source: S,
    tracker: T,
    counter: Counter,
    controller: InteractionController,
}

impl<S, T> Session<S, T>
where
    S: FrameSource,
    T: Tracking<S::Frame>,
{
    pub fn new(source: S, tracker: T, counter: Counter) -> Self {
        Self {
            source,
            tracker,
            counter,
            controller: InteractionController::new(),
        }
    }

    #[inline]
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    #[inline]
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn into_counter(self) -> Counter {
        self.counter
    }

    /// Feeds a pointer event to the region registry.
    pub fn pointer(&mut self, event: PointerEvent) {
        self.controller.handle(self.counter.regions_mut(), event);
    }

    pub fn step<A, K, D>(
        &mut self,
        annotator: &A,
        sink: &mut K,
        display: &mut D,
    ) -> Result<Step, Error>
    where
        A: Annotate<S::Frame>,
        K: FrameSink<S::Frame>,
        D: Display<S::Frame>,
    {
        let mut frame = match self.source.read()? {
            Some(frame) => frame,
            None => return Ok(Step::EndOfStream),
        };

        let detections = self.tracker.track(&frame)?;
        let report = self.counter.process(&detections);

        annotator.annotate(&mut frame, &detections, &self.counter)?;
        sink.write(&frame)?;

        let feedback = display.show(&frame)?;
        for event in feedback.events {
            self.pointer(event);
        }

        Ok(if feedback.quit {
            Step::Quit(report)
        } else {
            Step::Counted(report)
        })
    }

    /// Runs until the stream ends or the window asks to quit, then returns the final counts.
    pub fn run<A, K, D>(
        &mut self,
        annotator: &A,
        sink: &mut K,
        display: &mut D,
    ) -> Result<Vec<RegionCount>, Error>
    where
        A: Annotate<S::Frame>,
        K: FrameSink<S::Frame>,
        D: Display<S::Frame>,
    {
        log::info!(
            "counting session started: {} regions, {} policy",
            self.counter.regions().len(),
            self.counter.policy()
        );

        loop {
            match self.step(annotator, sink, display)? {
                Step::Counted(_) => {}
                Step::Quit(report) => {
                    log::info!("quit requested at frame {}", report.frame);
                    break;
                }
                Step::EndOfStream => {
                    log::info!("end of stream after {} frames", self.counter.frame());
                    break;
                }
            }
        }

        Ok(self.counter.summary())
    }
}
