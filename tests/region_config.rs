use std::io::Write;
use std::sync::Mutex;

use tempfile::{tempdir, NamedTempFile};

use region_count::{
    config::{increment_path, CountConfig, RunOptions, POLICY_ENV},
    CountingPolicy, Error,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

const REGIONS: &str = r#"
policy = "per_frame"

[history]
capacity = 10

[[regions]]
name = "Gate"
polygon = [[0, 0], [100, 0], [100, 100], [0, 100]]
color = [0, 0, 255]
text_color = [255, 255, 255]
"#;

#[test]
fn loads_regions_file_with_env_policy_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::remove_var(POLICY_ENV);

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(REGIONS.as_bytes()).expect("write config");

    let cfg = CountConfig::load(Some(file.path())).expect("load config");
    assert_eq!(cfg.policy, CountingPolicy::PerFrame);
    assert_eq!(cfg.history.capacity, 10);
    assert_eq!(cfg.regions[0].name, "Gate");

    std::env::set_var(POLICY_ENV, "once_per_object");
    let cfg = CountConfig::load(Some(file.path())).expect("load config");
    assert_eq!(cfg.policy, CountingPolicy::OncePerObject);

    std::env::set_var(POLICY_ENV, "bogus");
    assert!(matches!(
        CountConfig::load(Some(file.path())),
        Err(Error::InvalidPolicy(_))
    ));

    std::env::remove_var(POLICY_ENV);
}

#[test]
fn missing_regions_file_is_an_io_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempdir().unwrap();

    let res = CountConfig::load(Some(dir.path().join("regions.toml").as_path()));

    assert!(matches!(res, Err(Error::Io(_))));
}

#[test]
fn degenerate_region_file_is_rejected_on_load() {
    let _guard = ENV_LOCK.lock().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[[regions]]\nname = \"Line\"\npolygon = [[0, 0], [10, 10]]\n")
        .unwrap();

    let res = CountConfig::load(Some(file.path()));

    assert!(matches!(res, Err(Error::InvalidRegion { vertices: 2, .. })));
}

#[test]
fn duplicate_region_names_are_rejected_on_load() {
    let _guard = ENV_LOCK.lock().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    let body = "[[regions]]\nname = \"A\"\npolygon = [[0, 0], [1, 0], [1, 1]]\n".repeat(2);
    file.write_all(body.as_bytes()).unwrap();

    let res = CountConfig::load(Some(file.path()));

    assert!(matches!(res, Err(Error::DuplicateRegion(_))));
}

#[test]
fn increment_path_skips_taken_directories() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("exp");

    assert_eq!(increment_path(&base, false), base);

    std::fs::create_dir(&base).unwrap();
    assert_eq!(increment_path(&base, false), dir.path().join("exp2"));
    assert_eq!(increment_path(&base, true), base);

    std::fs::create_dir(dir.path().join("exp2")).unwrap();
    assert_eq!(increment_path(&base, false), dir.path().join("exp3"));
}

#[test]
fn run_options_validate_inputs() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("clip.mp4");
    let weights = dir.path().join("best.dets");

    let opts = RunOptions::new(&weights, &source);
    assert!(matches!(opts.validate(), Err(Error::SourceNotFound(_))));

    std::fs::write(&source, b"").unwrap();
    assert!(matches!(opts.validate(), Err(Error::WeightsNotFound(_))));

    std::fs::write(&weights, b"").unwrap();
    assert!(opts.validate().is_ok());

    let opts = RunOptions {
        output_root: dir.path().join("out"),
        ..opts
    };
    assert_eq!(opts.save_dir(), dir.path().join("out").join("exp"));
    assert_eq!(
        opts.output_file(&opts.save_dir()),
        dir.path().join("out").join("exp").join("clip.mp4")
    );
}

#[test]
fn bundled_demo_regions_parse() {
    let cfg: CountConfig = include_str!("../demos/regions.toml").parse().unwrap();

    assert_eq!(cfg.policy, CountingPolicy::OncePerObject);
    assert_eq!(cfg.history.max_idle_frames, Some(300));
    assert_eq!(cfg.registry().unwrap().len(), 2);
}
