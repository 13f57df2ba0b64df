// src/batch/mod.rs

//! Segmentation batch: subject discovery, resume checks, companion image
//! lookup, failure logging, timing and the driver that ties them together.

pub mod companion;
pub mod discovery;
pub mod driver;
pub mod precheck;
pub mod result_log;
pub mod status;
pub mod timing;

pub use companion::{resolve_companion, CompanionError};
pub use discovery::{discover_subjects, normalize_subject_id};
pub use driver::{BatchDriver, BatchSummary, PlannedAction, PlannedJob};
pub use precheck::PrecheckStatus;
pub use result_log::FailureCategory;
pub use status::{collect_status, KindStatus, StatusReport};
pub use timing::TimingSamples;
