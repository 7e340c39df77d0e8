pub mod bbox;
pub mod config;
pub mod controller;
pub mod counter;
pub mod detection;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod history;
pub mod pipeline;
pub mod region;
pub mod replay;

#[cfg(feature = "opencv")]
pub mod video;

mod circular_queue;

pub use config::{CountConfig, Device, RunOptions};
pub use controller::{InteractionController, PointerEvent};
pub use counter::{Counter, CountingPolicy, FrameReport, RegionCount};
pub use detection::Detection;
pub use error::Error;
pub use frame::Frame;
pub use geometry::Polygon;
pub use history::{EvictionPolicy, TrackHistory, Trajectory};
pub use pipeline::{Annotate, Display, DisplayFeedback, FrameSink, FrameSource, Session, Tracking};
pub use region::{DragState, Region, RegionRegistry};
