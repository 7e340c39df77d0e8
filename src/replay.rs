//! Pre-computed tracker output, one frame per line:
//!
//! ```text
//! 1: [{"box": [10, 20, 40, 80], "c": 0, "id": 7}, {"box": [0, 0, 5, 5], "c": 2}]
//! 2: []
//! ```
//!
//! The `N:` prefix is optional; a bare JSON array is numbered by its position.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use crate::detection::Detection;
use crate::error::Error;
use crate::frame::Frame;
use crate::pipeline::{FrameSource, Tracking};

/// Class allow-list; an empty or absent list keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassFilter(Option<Vec<i32>>);

impl ClassFilter {
    pub fn new(classes: Option<Vec<i32>>) -> Self {
        Self(classes.filter(|c| !c.is_empty()))
    }

    #[inline]
    pub fn allows(&self, class: i32) -> bool {
        match &self.0 {
            Some(classes) => classes.contains(&class),
            None => true,
        }
    }

    pub fn apply(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.retain(|d| self.allows(d.class));
        detections
    }
}

pub fn parse_line(line: &str, lineno: usize) -> Result<(Option<u64>, Vec<Detection>), Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok((None, Vec::new()));
    }

    let (index, payload) = if line.starts_with('[') {
        (None, line)
    } else {
        match line.split_once(':') {
            Some((prefix, rest)) => (prefix.trim().parse().ok(), rest.trim()),
            None => (None, line),
        }
    };

    let detections =
        serde_json::from_str(payload).map_err(|source| Error::Json { line: lineno, source })?;

    Ok((index, detections))
}

struct LineReader<R> {
    lines: Lines<R>,
    lineno: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            lineno: 0,
        }
    }

    fn next_frame(&mut self) -> Result<Option<(Option<u64>, Vec<Detection>)>, Error> {
        match self.lines.next() {
            Some(line) => {
                self.lineno += 1;
                parse_line(&line?, self.lineno).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Tracker that hands out one recorded line per video frame.
pub struct ReplayTracker<R> {
    reader: LineReader<R>,
    filter: ClassFilter,
    exhausted: bool,
}

impl ReplayTracker<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> ReplayTracker<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: LineReader::new(reader),
            filter: ClassFilter::default(),
            exhausted: false,
        }
    }

    pub fn with_classes(mut self, classes: Option<Vec<i32>>) -> Self {
        self.filter = ClassFilter::new(classes);
        self
    }
}

impl<F, R: BufRead> Tracking<F> for ReplayTracker<R> {
    fn track(&mut self, _frame: &F) -> Result<Vec<Detection>, Error> {
        match self.reader.next_frame()? {
            Some((_, detections)) => Ok(self.filter.apply(detections)),
            None => {
                if !self.exhausted {
                    log::warn!(
                        "detections ran out after {} lines, remaining frames are empty",
                        self.reader.lineno
                    );
                    self.exhausted = true;
                }

                Ok(Vec::new())
            }
        }
    }
}

/// A detections file read as a stream of frames, for counting without video.
pub struct DetectionLog<R> {
    reader: LineReader<R>,
    dims: (u32, u32),
    next_index: u64,
}

impl DetectionLog<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> DetectionLog<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: LineReader::new(reader),
            dims: (0, 0),
            next_index: 1,
        }
    }

    pub fn with_dims(mut self, dims: (u32, u32)) -> Self {
        self.dims = dims;
        self
    }
}

impl DetectionLog<io::Cursor<String>> {
    pub fn from_text<S: Into<String>>(text: S) -> Self {
        Self::new(io::Cursor::new(text.into()))
    }
}

impl<R: BufRead> FrameSource for DetectionLog<R> {
    type Frame = Frame;

    fn read(&mut self) -> Result<Option<Frame>, Error> {
        let (index, detections) = match self.reader.next_frame()? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };

        let index = index.unwrap_or(self.next_index);
        self.next_index = index.saturating_add(1);

        Ok(Some(Frame::new(index, self.dims, detections)))
    }
}

/// Tracker for [`Frame`]s that already carry their detections.
#[derive(Debug, Clone, Default)]
pub struct PassThrough {
    filter: ClassFilter,
}

impl PassThrough {
    pub fn new(classes: Option<Vec<i32>>) -> Self {
        Self {
            filter: ClassFilter::new(classes),
        }
    }
}

impl Tracking<Frame> for PassThrough {
    #[inline]
    fn track(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        Ok(self.filter.apply(frame.detections.clone()))
    }
}
