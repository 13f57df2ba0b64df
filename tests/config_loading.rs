// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use fsseg::config::{load_and_validate, load_from_path};
use fsseg::errors::FssegError;
use fsseg::types::SegmentationKind;
use tempfile::NamedTempFile;

fn config_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file
}

#[test]
fn minimal_config_gets_defaults() {
    let file = config_file(
        r#"
[config]
subjects_dir = "/mnt/clab/freesurfer"
pd_images_dir = "/mnt/clab/hMRI"
analysis_id = "cost2022"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let driver = cfg.driver;

    assert_eq!(driver.subjects_dir, PathBuf::from("/mnt/clab/freesurfer"));
    assert_eq!(driver.threads, 40);
    assert!(driver.skip_existing);
    assert_eq!(driver.kinds, vec![SegmentationKind::Hippocampus]);
    assert_eq!(driver.subject_prefix, "sub-");
    assert_eq!(driver.invocation_timeout, None);
    assert_eq!(
        driver.output_path("sub-01", SegmentationKind::Hippocampus),
        PathBuf::from("/mnt/clab/freesurfer/sub-01/mri/cost2022.FSspace.mgz")
    );
    assert!(!cfg.notify.enabled);
}

#[test]
fn full_config_is_resolved() {
    let file = config_file(
        r#"
[config]
subjects_dir = "/data/fs"
pd_images_dir = "/data/pd"
analysis_id = "pilot"
threads = 8
skip_existing = false
kinds = ["scl", "brainstem", "hpc", "hpc"]
companion_pattern = "*_PDw.nii"
output_template = "{analysis_id}.{kind}.mgz"
work_dir = "/var/fsseg"
invocation_timeout = "36h"

[notify]
enabled = true
telegram_chat_id = "12345"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let driver = cfg.driver;

    assert_eq!(driver.threads, 8);
    assert!(!driver.skip_existing);
    assert_eq!(
        driver.kinds,
        vec![
            SegmentationKind::Hippocampus,
            SegmentationKind::Brainstem,
            SegmentationKind::SubcorticalLimbic,
        ]
    );
    assert!(driver.is_companion(std::path::Path::new("s01_PDw.nii")));
    assert!(!driver.is_companion(std::path::Path::new("s01_PD.nii")));
    assert_eq!(
        driver.output_path("sub-01", SegmentationKind::Brainstem),
        PathBuf::from("/data/fs/sub-01/mri/pilot.bs.mgz")
    );
    assert_eq!(driver.errlog_path(), PathBuf::from("/var/fsseg/pilot_errlog.txt"));
    assert_eq!(driver.invocation_timeout, Some(Duration::from_secs(36 * 3600)));

    assert!(cfg.notify.enabled);
    assert_eq!(cfg.notify.telegram_chat_id.as_deref(), Some("12345"));
    assert_eq!(cfg.notify.telegram_token, None);
}

#[test]
fn missing_required_key_is_a_toml_error() {
    let file = config_file(
        r#"
[config]
subjects_dir = "/data/fs"
analysis_id = "pilot"
"#,
    );

    match load_from_path(file.path()) {
        Err(FssegError::TomlError(e)) => assert!(e.to_string().contains("pd_images_dir")),
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_kind_is_a_toml_error() {
    let file = config_file(
        r#"
[config]
subjects_dir = "/data/fs"
pd_images_dir = "/data/pd"
analysis_id = "pilot"
kinds = ["cortex"]
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(FssegError::TomlError(_))
    ));
}

#[test]
fn empty_kinds_is_a_config_error() {
    let file = config_file(
        r#"
[config]
subjects_dir = "/data/fs"
pd_images_dir = "/data/pd"
analysis_id = "pilot"
kinds = []
"#,
    );

    match load_and_validate(file.path()) {
        Err(FssegError::ConfigError(msg)) => assert!(msg.contains("kinds")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn bad_timeout_is_a_config_error() {
    let file = config_file(
        r#"
[config]
subjects_dir = "/data/fs"
pd_images_dir = "/data/pd"
analysis_id = "pilot"
invocation_timeout = "two days"
"#,
    );

    match load_and_validate(file.path()) {
        Err(FssegError::ConfigError(msg)) => assert!(msg.contains("invocation_timeout")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let result = load_from_path("/definitely/not/here/Fsseg.toml");
    assert!(matches!(result, Err(FssegError::IoError(_))));
}
