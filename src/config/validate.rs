// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use globset::Glob;

use crate::config::model::{ConfigFile, ConfigSection, DriverConfig, RawConfigFile};
use crate::errors::{FssegError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::FssegError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let driver = validate_driver_section(&raw.config)?;
        Ok(ConfigFile::new_unchecked(driver, raw.notify))
    }
}

fn validate_driver_section(cfg: &ConfigSection) -> Result<DriverConfig> {
    validate_analysis_id(&cfg.analysis_id)?;

    if cfg.threads == 0 {
        return Err(FssegError::ConfigError(
            "[config].threads must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.kinds.is_empty() {
        return Err(FssegError::ConfigError(
            "[config].kinds must name at least one segmentation kind".to_string(),
        ));
    }
    let mut kinds = cfg.kinds.clone();
    kinds.sort();
    kinds.dedup();

    if cfg.subject_prefix.trim().is_empty() {
        return Err(FssegError::ConfigError(
            "[config].subject_prefix must not be empty".to_string(),
        ));
    }

    if cfg.output_template.trim().is_empty() {
        return Err(FssegError::ConfigError(
            "[config].output_template must not be empty".to_string(),
        ));
    }

    let companion_matcher = Glob::new(&cfg.companion_pattern)
        .map_err(|e| {
            FssegError::ConfigError(format!(
                "invalid [config].companion_pattern '{}': {}",
                cfg.companion_pattern, e
            ))
        })?
        .compile_matcher();

    let invocation_timeout = match cfg.invocation_timeout {
        Some(ref s) => Some(parse_duration(s).map_err(|e| {
            FssegError::ConfigError(format!("invalid [config].invocation_timeout: {e}"))
        })?),
        None => None,
    };

    Ok(DriverConfig {
        subjects_dir: expand_tilde(&cfg.subjects_dir),
        pd_images_dir: expand_tilde(&cfg.pd_images_dir),
        analysis_id: cfg.analysis_id.trim().to_string(),
        threads: cfg.threads,
        skip_existing: cfg.skip_existing,
        kinds,
        subject_prefix: cfg.subject_prefix.clone(),
        companion_pattern: cfg.companion_pattern.clone(),
        companion_matcher,
        output_template: cfg.output_template.clone(),
        work_dir: expand_tilde(&cfg.work_dir),
        invocation_timeout,
    })
}

fn validate_analysis_id(id: &str) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(FssegError::ConfigError(
            "[config].analysis_id must not be empty".to_string(),
        ));
    }
    // The label becomes part of file names in the work and subject dirs.
    if id.contains(['/', '\\']) || id.chars().any(char::is_whitespace) {
        return Err(FssegError::ConfigError(format!(
            "[config].analysis_id '{}' must not contain path separators or whitespace",
            id
        )));
    }
    Ok(())
}

/// Expand a leading `~` to `$HOME`. Other paths are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

/// Parse durations like `500ms`, `30s`, `10m` or `48h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::NotifySection;
    use crate::types::SegmentationKind;

    fn raw(section: ConfigSection) -> RawConfigFile {
        RawConfigFile {
            config: section,
            notify: NotifySection::default(),
        }
    }

    #[test]
    fn kinds_are_sorted_into_run_order_and_deduplicated() {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.kinds = vec![
            SegmentationKind::SubcorticalLimbic,
            SegmentationKind::Hippocampus,
            SegmentationKind::SubcorticalLimbic,
        ];

        let cfg = ConfigFile::try_from(raw(section)).unwrap();
        assert_eq!(
            cfg.driver.kinds,
            vec![
                SegmentationKind::Hippocampus,
                SegmentationKind::SubcorticalLimbic
            ]
        );
    }

    #[test]
    fn zero_threads_is_rejected() {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.threads = 0;

        match ConfigFile::try_from(raw(section)) {
            Err(FssegError::ConfigError(msg)) => assert!(msg.contains("threads")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn analysis_id_with_separator_is_rejected() {
        let section = ConfigSection::new("/subs", "/pds", "../escape");
        assert!(matches!(
            ConfigFile::try_from(raw(section)),
            Err(FssegError::ConfigError(_))
        ));
    }

    #[test]
    fn bad_companion_glob_is_rejected() {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.companion_pattern = "[PD.nii".to_string();

        match ConfigFile::try_from(raw(section)) {
            Err(FssegError::ConfigError(msg)) => assert!(msg.contains("companion_pattern")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn timeout_is_parsed() {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.invocation_timeout = Some("2h".to_string());

        let cfg = ConfigFile::try_from(raw(section)).unwrap();
        assert_eq!(
            cfg.driver.invocation_timeout,
            Some(Duration::from_secs(7200))
        );
    }

    #[test]
    fn parse_duration_rejects_unknown_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert!(parse_duration("3d").is_err());
        assert!(parse_duration("15").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn paths_derive_from_config() {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.work_dir = "/work".to_string();
        let cfg = ConfigFile::try_from(raw(section)).unwrap().driver;

        assert_eq!(cfg.errlog_path(), PathBuf::from("/work/cost2022_errlog.txt"));
        assert_eq!(
            cfg.marker_path("sub-01", SegmentationKind::Thalamus),
            PathBuf::from("/work/sub-01_thn_seg_err.txt")
        );
        assert_eq!(
            cfg.output_path("sub-01", SegmentationKind::Thalamus),
            PathBuf::from("/subs/sub-01/mri/cost2022.FSspace.mgz")
        );
        assert_eq!(
            cfg.companion_dir("sub-01"),
            PathBuf::from("/pds/sub-01/Results")
        );
    }

    #[test]
    fn kind_placeholder_gives_per_kind_outputs() {
        let mut section = ConfigSection::new("/subs", "/pds", "cost2022");
        section.output_template = "{analysis_id}.{kind}.FSspace.mgz".to_string();
        let cfg = ConfigFile::try_from(raw(section)).unwrap().driver;

        assert_ne!(
            cfg.output_path("sub-01", SegmentationKind::Hippocampus),
            cfg.output_path("sub-01", SegmentationKind::Brainstem)
        );
    }
}
