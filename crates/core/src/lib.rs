pub mod abort;
pub mod annotation;
pub mod config;
pub mod grouping;
pub mod job;
pub mod launch;
pub mod merger;
pub mod metrics;
pub mod processor;
pub mod progress;
pub mod testing;

pub use abort::{AbortError, AbortSignal, MarkerFileAbortSignal, MemoryAbortSignal};
pub use annotation::{write_annotation_csv, AnnotationError};
pub use config::{
    load_config, load_config_from_str, validate_config, AbortBackend, Config, ConfigError,
    JobsConfig, LaunchStoreBackend, PipelineConfig, SanitizedConfig, ServerConfig,
    StorageConfig,
};
pub use grouping::{build_groups, GroupBuild, GroupingOptions, ProcessingGroup};
pub use job::{
    AnnotationStatus, JobError, JobEvent, JobReporter, JobRunner, JobState, JobStatus, JobSummary,
};
pub use launch::{
    FileLaunchStore, InputItem, LaunchConfiguration, LaunchDigest, LaunchError, LaunchStore,
    SqliteLaunchStore,
};
pub use merger::{merge_artifacts, MergeError};
pub use processor::{
    CommandGroupProcessor, GroupArtifact, GroupContext, GroupProcessingError, GroupProcessor,
    ProcessingStage, StageOutcome,
};
pub use progress::{NullSink, ProgressSink, ProgressTick, Stage};
