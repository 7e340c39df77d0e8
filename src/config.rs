use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_derive::Deserialize;

use crate::counter::{Counter, CountingPolicy};
use crate::error::Error;
use crate::history::{HistoryConfig, TrackHistory};
use crate::region::{Color, Region, RegionRegistry};

pub const POLICY_ENV: &str = "REGION_COUNT_POLICY";

const DEFAULT_REGION_COLOR: Color = [255, 42, 4];
const DEFAULT_TEXT_COLOR: Color = [255, 255, 255];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub polygon: Vec<[f32; 2]>,
    #[serde(default = "default_region_color")]
    pub color: Color,
    #[serde(default = "default_text_color")]
    pub text_color: Color,
}

fn default_region_color() -> Color {
    DEFAULT_REGION_COLOR
}

fn default_text_color() -> Color {
    DEFAULT_TEXT_COLOR
}

impl RegionSpec {
    pub fn build(&self) -> Result<Region, Error> {
        Region::new(self.name.clone(), &self.polygon, self.color, self.text_color)
    }
}

/// The two regions the counter starts with when no region file is given.
pub fn default_regions() -> Vec<RegionSpec> {
    vec![
        RegionSpec {
            name: "YOLOv8 Polygon Region".to_string(),
            polygon: vec![
                [50.0, 80.0],
                [250.0, 20.0],
                [450.0, 80.0],
                [400.0, 350.0],
                [100.0, 350.0],
            ],
            color: [255, 42, 4],
            text_color: [255, 255, 255],
        },
        RegionSpec {
            name: "YOLOv8 Rectangle Region".to_string(),
            polygon: vec![[200.0, 250.0], [440.0, 250.0], [440.0, 550.0], [200.0, 550.0]],
            color: [37, 255, 225],
            text_color: [0, 0, 0],
        },
    ]
}

#[derive(Debug, Deserialize, Default)]
struct CountConfigFile {
    policy: Option<CountingPolicy>,
    history: Option<HistoryConfig>,
    regions: Option<Vec<RegionSpec>>,
}

/// Counting setup: policy, trajectory settings and the starting regions.
#[derive(Debug, Clone, PartialEq)]
pub struct CountConfig {
    pub policy: CountingPolicy,
    pub history: HistoryConfig,
    pub regions: Vec<RegionSpec>,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            policy: CountingPolicy::default(),
            history: HistoryConfig::default(),
            regions: default_regions(),
        }
    }
}

impl FromStr for CountConfig {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let file: CountConfigFile = toml::from_str(raw)?;

        Ok(Self::from_file(file))
    }
}

impl CountConfig {
    /// Reads `path` if given, then applies `REGION_COUNT_POLICY`.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut cfg = match path {
            Some(path) => std::fs::read_to_string(path)?.parse::<Self>()?,
            None => Self::default(),
        };

        cfg.apply_env()?;
        cfg.validate()?;

        Ok(cfg)
    }

    fn from_file(file: CountConfigFile) -> Self {
        Self {
            policy: file.policy.unwrap_or_default(),
            history: file.history.unwrap_or_default(),
            regions: file.regions.unwrap_or_else(default_regions),
        }
    }

    fn apply_env(&mut self) -> Result<(), Error> {
        if let Ok(policy) = std::env::var(POLICY_ENV) {
            if !policy.trim().is_empty() {
                self.policy = policy.parse()?;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.history.capacity == 0 {
            return Err(Error::ZeroTrajectoryCapacity);
        }

        self.registry().map(|_| ())
    }

    pub fn registry(&self) -> Result<RegionRegistry, Error> {
        let regions = self
            .regions
            .iter()
            .map(RegionSpec::build)
            .collect::<Result<Vec<_>, _>>()?;

        RegionRegistry::new(regions)
    }

    pub fn counter(&self) -> Result<Counter, Error> {
        Ok(Counter::new(
            self.registry()?,
            TrackHistory::from_config(&self.history),
            self.policy,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Auto,
    Cpu,
    Gpu(u32),
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();

        match value.as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Gpu(0)),
            other => other
                .strip_prefix("cuda:")
                .unwrap_or(other)
                .parse()
                .map(Device::Gpu)
                .map_err(|_| Error::InvalidDevice(s.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Auto => f.write_str("auto"),
            Device::Cpu => f.write_str("cpu"),
            Device::Gpu(idx) => write!(f, "cuda:{}", idx),
        }
    }
}

impl Device {
    /// Picks a concrete device for `auto`; `has_gpu` is only consulted in that case.
    pub fn resolve<P: FnOnce() -> bool>(self, has_gpu: P) -> Device {
        let device = match self {
            Device::Auto => {
                if has_gpu() {
                    Device::Gpu(0)
                } else {
                    Device::Cpu
                }
            }
            explicit => explicit,
        };

        log::info!("inference device: {} (requested {})", device, self);

        device
    }
}

/// Options of one counting run, independent of where they were parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub weights: PathBuf,
    pub source: PathBuf,
    pub device: Device,
    pub view: bool,
    pub save: bool,
    pub exist_ok: bool,
    pub classes: Option<Vec<i32>>,
    pub line_thickness: i32,
    pub track_thickness: i32,
    pub region_thickness: i32,
    pub output_root: PathBuf,
}

impl RunOptions {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(weights: P, source: Q) -> Self {
        Self {
            weights: weights.into(),
            source: source.into(),
            device: Device::Auto,
            view: false,
            save: true,
            exist_ok: false,
            classes: None,
            line_thickness: 2,
            track_thickness: 2,
            region_thickness: 2,
            output_root: PathBuf::from("region_count_output"),
        }
    }

    /// Fails before any resource is opened if the source or the weights are missing.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.source.exists() {
            return Err(Error::SourceNotFound(self.source.clone()));
        }

        if !self.weights.exists() {
            return Err(Error::WeightsNotFound(self.weights.clone()));
        }

        Ok(())
    }

    /// Directory the annotated video goes to, honoring `exist_ok`.
    pub fn save_dir(&self) -> PathBuf {
        increment_path(&self.output_root.join("exp"), self.exist_ok)
    }

    /// `<dir>/<source stem>.mp4`
    pub fn output_file(&self, dir: &Path) -> PathBuf {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());

        dir.join(format!("{}.mp4", stem))
    }
}

/// Returns `base` when it is free or `exist_ok` is set, otherwise the first free
/// `base2`, `base3`, ...
pub fn increment_path(base: &Path, exist_ok: bool) -> PathBuf {
    if exist_ok || !base.exists() {
        return base.to_path_buf();
    }

    let stem = base
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    (2..)
        .map(|n| base.with_file_name(format!("{}{}", stem, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| base.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_regions() {
        let cfg = CountConfig::default();
        let registry = cfg.registry().unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap().name, "YOLOv8 Polygon Region");
        assert_eq!(registry.get(1).unwrap().color, [37, 255, 225]);
        assert_eq!(cfg.policy, CountingPolicy::PerFrame);
        assert_eq!(cfg.history.capacity, 30);
    }

    #[test]
    fn parses_region_file() {
        let cfg: CountConfig = r#"
            policy = "once_per_object"

            [history]
            max_idle_frames = 120

            [[regions]]
            name = "Entrance"
            polygon = [[0, 0], [100, 0], [100, 50], [0, 50]]
            color = [0, 255, 0]

            [[regions]]
            name = "Exit"
            polygon = [[200, 0], [300, 0], [250, 80]]
        "#
        .parse()
        .unwrap();

        assert_eq!(cfg.policy, CountingPolicy::OncePerObject);
        assert_eq!(cfg.history.capacity, 30);
        assert_eq!(cfg.history.max_idle_frames, Some(120));
        assert_eq!(cfg.regions.len(), 2);
        assert_eq!(cfg.regions[0].color, [0, 255, 0]);
        assert_eq!(cfg.regions[1].text_color, [255, 255, 255]);

        let counter = cfg.counter().unwrap();
        assert_eq!(counter.policy(), CountingPolicy::OncePerObject);
    }

    #[test]
    fn short_polygon_is_a_config_error() {
        let cfg: CountConfig = r#"
            [[regions]]
            name = "Broken"
            polygon = [[0, 0], [1, 1]]
        "#
        .parse()
        .unwrap();

        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidRegion { ref name, vertices: 2 }) if name == "Broken"
        ));
    }

    #[test]
    fn zero_trajectory_capacity_is_a_config_error() {
        let cfg: CountConfig = "[history]\ncapacity = 0\n".parse().unwrap();

        assert!(matches!(cfg.validate(), Err(Error::ZeroTrajectoryCapacity)));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let res = "policy = \"sometimes\"".parse::<CountConfig>();

        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[test]
    fn device_parsing_and_resolution() {
        assert_eq!("auto".parse::<Device>().unwrap(), Device::Auto);
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("0".parse::<Device>().unwrap(), Device::Gpu(0));
        assert_eq!("cuda:1".parse::<Device>().unwrap(), Device::Gpu(1));
        assert!(matches!("tpu".parse::<Device>(), Err(Error::InvalidDevice(_))));

        assert_eq!(Device::Auto.resolve(|| true), Device::Gpu(0));
        assert_eq!(Device::Auto.resolve(|| false), Device::Cpu);
        assert_eq!(Device::Cpu.resolve(|| panic!("probe must not run")), Device::Cpu);
    }

    #[test]
    fn output_file_uses_source_stem() {
        let opts = RunOptions::new("best.pt", "videos/street.avi");

        assert_eq!(
            opts.output_file(Path::new("out/exp")),
            PathBuf::from("out/exp/street.mp4")
        );
    }

    #[test]
    fn validate_reports_missing_source_first() {
        let opts = RunOptions::new("/nonexistent/best.pt", "/nonexistent/video.mp4");

        assert!(matches!(opts.validate(), Err(Error::SourceNotFound(_))));
    }
}
