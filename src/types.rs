use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// One of the external sub-segmentation procedures applied to a subject's
/// reconstructed anatomy.
///
/// The declaration order is the order in which kinds are run for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum SegmentationKind {
    /// Hippocampal subfields and amygdala nuclei.
    #[serde(rename = "hpc", alias = "hippocampus")]
    Hippocampus,
    /// Thalamic nuclei.
    #[serde(rename = "thn", alias = "thalamus")]
    Thalamus,
    /// Brainstem substructures.
    #[serde(rename = "bs", alias = "brainstem")]
    Brainstem,
    /// Hypothalamic subunits. Not run yet: needs a newer toolchain.
    #[serde(rename = "hth", alias = "hypothalamus")]
    Hypothalamus,
    /// Subcortical limbic structures.
    #[serde(rename = "scl", alias = "limbic")]
    SubcorticalLimbic,
}

impl SegmentationKind {
    pub const ALL: [SegmentationKind; 5] = [
        SegmentationKind::Hippocampus,
        SegmentationKind::Thalamus,
        SegmentationKind::Brainstem,
        SegmentationKind::Hypothalamus,
        SegmentationKind::SubcorticalLimbic,
    ];

    /// Short lowercase code used in error marker names (`sub-01_hpc_seg_err.txt`).
    pub fn tag(self) -> &'static str {
        match self {
            SegmentationKind::Hippocampus => "hpc",
            SegmentationKind::Thalamus => "thn",
            SegmentationKind::Brainstem => "bs",
            SegmentationKind::Hypothalamus => "hth",
            SegmentationKind::SubcorticalLimbic => "scl",
        }
    }

    /// Human-readable label used in log lines and notifications.
    pub fn label(self) -> &'static str {
        match self {
            SegmentationKind::Hippocampus => "HPC/AMG",
            SegmentationKind::Thalamus => "THN",
            SegmentationKind::Brainstem => "BS",
            SegmentationKind::Hypothalamus => "HTH",
            SegmentationKind::SubcorticalLimbic => "SCL",
        }
    }

    /// Whether the tool takes the proton-density companion image as input.
    pub fn needs_companion(self) -> bool {
        matches!(
            self,
            SegmentationKind::Hippocampus | SegmentationKind::Thalamus
        )
    }
}

impl fmt::Display for SegmentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SegmentationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hpc" | "hippocampus" => Ok(SegmentationKind::Hippocampus),
            "thn" | "thalamus" => Ok(SegmentationKind::Thalamus),
            "bs" | "brainstem" => Ok(SegmentationKind::Brainstem),
            "hth" | "hypothalamus" => Ok(SegmentationKind::Hypothalamus),
            "scl" | "limbic" => Ok(SegmentationKind::SubcorticalLimbic),
            other => Err(format!(
                "invalid segmentation kind: {other} (expected one of hpc, thn, bs, hth, scl)"
            )),
        }
    }
}

/// Lifecycle of a [`crate::batch::BatchDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Idle,
    Running,
    Completed,
    /// The batch was refused before any subject was touched.
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_tags_and_long_names() {
        assert_eq!("hpc".parse::<SegmentationKind>(), Ok(SegmentationKind::Hippocampus));
        assert_eq!(" Thalamus ".parse::<SegmentationKind>(), Ok(SegmentationKind::Thalamus));
        assert_eq!("limbic".parse::<SegmentationKind>(), Ok(SegmentationKind::SubcorticalLimbic));
        assert!("cortex".parse::<SegmentationKind>().is_err());
    }

    #[test]
    fn new_driver_state_is_idle() {
        assert_eq!(DriverState::default(), DriverState::Idle);
    }

    #[test]
    fn declaration_order_is_run_order() {
        let mut shuffled = vec![
            SegmentationKind::SubcorticalLimbic,
            SegmentationKind::Brainstem,
            SegmentationKind::Hippocampus,
            SegmentationKind::Thalamus,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                SegmentationKind::Hippocampus,
                SegmentationKind::Thalamus,
                SegmentationKind::Brainstem,
                SegmentationKind::SubcorticalLimbic,
            ]
        );
    }

    #[test]
    fn only_hippocampus_and_thalamus_need_pd_image() {
        let needing: Vec<_> = SegmentationKind::ALL
            .into_iter()
            .filter(|k| k.needs_companion())
            .collect();
        assert_eq!(
            needing,
            vec![SegmentationKind::Hippocampus, SegmentationKind::Thalamus]
        );
    }
}
