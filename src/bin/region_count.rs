//! region_count - count tracked objects inside draggable regions of a video.
//!
//! Detections come from a recorded tracker run (`--weights`, one JSON line per frame).
//! With `--view-img` the regions can be moved with the left mouse button; `q` quits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use region_count::{
    config::{CountConfig, Device, RunOptions},
    pipeline::Session,
    replay::ReplayTracker,
    video::{self, Overlay, VideoCapture, VideoWriter, Window},
    CountingPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "region_count", about = "Region based object counting")]
struct Args {
    /// Tracker output to replay
    #[arg(long, default_value = "models/best.dets")]
    weights: PathBuf,
    /// Video file
    #[arg(long)]
    source: PathBuf,
    /// auto, cpu or a GPU index
    #[arg(long, default_value = "auto")]
    device: Device,
    #[arg(long)]
    view_img: bool,
    /// Do not write the annotated video
    #[arg(long)]
    nosave: bool,
    /// Reuse the output directory instead of creating exp2, exp3, ...
    #[arg(long)]
    exist_ok: bool,
    /// Only keep these class ids
    #[arg(long, num_args = 1..)]
    classes: Option<Vec<i32>>,
    #[arg(long, default_value_t = 2)]
    line_thickness: i32,
    #[arg(long, default_value_t = 2)]
    track_thickness: i32,
    #[arg(long, default_value_t = 2)]
    region_thickness: i32,
    /// Region definitions (TOML)
    #[arg(long, env = "REGION_COUNT_REGIONS")]
    regions: Option<PathBuf>,
    /// per_frame or once_per_object, overrides the region file
    #[arg(long)]
    policy: Option<CountingPolicy>,
    /// Class names, in class id order
    #[arg(long, value_delimiter = ',')]
    names: Vec<String>,
    #[arg(long, default_value = "region_count_output")]
    project: PathBuf,
    /// Write the final counts as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Args {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            device: self.device,
            view: self.view_img,
            save: !self.nosave,
            exist_ok: self.exist_ok,
            classes: self.classes.clone(),
            line_thickness: self.line_thickness,
            track_thickness: self.track_thickness,
            region_thickness: self.region_thickness,
            output_root: self.project.clone(),
            ..RunOptions::new(&self.weights, &self.source)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let opts = args.run_options();
    opts.validate()?;

    let mut count_cfg = CountConfig::load(args.regions.as_deref())
        .with_context(|| format!("loading regions from {:?}", args.regions))?;
    if let Some(policy) = args.policy {
        count_cfg.policy = policy;
    }

    let device = opts.device.resolve(video::has_cuda);
    log::info!("replaying tracker output from {:?} on {}", opts.weights, device);

    let capture = VideoCapture::open(&opts.source)?;
    let (fps, dims) = (capture.fps(), capture.dims());

    let mut writer = if opts.save {
        let dir = opts.save_dir();
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
        Some(VideoWriter::new(opts.output_file(&dir), fps, dims)?)
    } else {
        None
    };

    let mut window = if opts.view {
        Some(Window::open("region_count")?)
    } else {
        None
    };

    let tracker = ReplayTracker::open(&opts.weights)?.with_classes(opts.classes.clone());
    let overlay = Overlay {
        names: args.names.clone(),
        line_thickness: opts.line_thickness,
        track_thickness: opts.track_thickness,
        region_thickness: opts.region_thickness,
    };

    let mut session = Session::new(capture, tracker, count_cfg.counter()?);
    let summary = session.run(&overlay, &mut writer, &mut window)?;

    // release output and window before reporting
    drop(window);
    drop(writer);
    drop(session);

    for region in &summary {
        println!("{}", region);
    }

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json).with_context(|| format!("writing summary to {:?}", path))?;
    }

    Ok(())
}
