//! 동기화 작업 모듈.

pub mod dataset_sync;
pub mod local_import;
pub mod plan;
pub mod status;
pub mod view_refresh;

pub use dataset_sync::{sync_all, sync_dataset, SyncContext};
pub use local_import::{import_all, import_dataset, local_listing};
pub use plan::{is_planned, plan, plan_range, Dated, LocalArtifact};
pub use status::{collect_status, DatasetStatus};
pub use view_refresh::{log_compression_stats, refresh_views};
