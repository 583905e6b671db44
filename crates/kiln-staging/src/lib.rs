//! Kiln Staging
//!
//! Artifact staging for training runs:
//! - Parsing object-storage location references (`StorageLocation`)
//! - Mirroring local files into object storage (glob + directory variants)
//! - Well-known training-run output directories (`RunLayout`)
//! - The end-of-training staging sequence (`stage_run`)

pub mod error;
pub mod layout;
pub mod location;
pub mod mirror;
pub mod run;

pub use error::{StagingError, StagingResult};
pub use layout::RunLayout;
pub use location::{LocationParseError, StorageLocation};
pub use mirror::{upload_directory, upload_matching_files};
pub use run::{stage_run, StageRunOptions, StageRunReport};
