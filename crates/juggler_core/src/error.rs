use std::path::PathBuf;

use thiserror::Error;

/// Errors detected while registering axes or validating a run, before any
/// private file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid site pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("site pattern `{pattern}` must have exactly one capture group, found {found}")]
    CaptureCount { pattern: String, found: usize },
    #[error("site pattern `{pattern}` matches nothing in {}", template.display())]
    SiteNotFound { pattern: String, template: PathBuf },
    #[error("site pattern `{pattern}` matches {} but leaves no region to rewrite", path.display())]
    NothingToRewrite { pattern: String, path: PathBuf },
    #[error("axis bound to {} has no sites", template.display())]
    NoSites { template: PathBuf },
    #[error("axis bound to {} has no values", template.display())]
    NoValues { template: PathBuf },
    #[error("axis bound to {} has {sites} sites but {sequences} value sequences", template.display())]
    SequenceCount {
        template: PathBuf,
        sites: usize,
        sequences: usize,
    },
    #[error("site {site} of axis bound to {} has {found} values, expected {expected}", template.display())]
    SequenceLength {
        template: PathBuf,
        site: usize,
        expected: usize,
        found: usize,
    },
    #[error("value tuple has arity {found}, axis bound to {} has {expected} sites", template.display())]
    TupleArity {
        template: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("range rule does not advance past {value}")]
    StalledRange { value: String },
    #[error("no axes registered")]
    NoAxes,
    #[error("{workers} worker ranks requested for only {units} units")]
    TooManyRanks { workers: usize, units: usize },
    #[error("distributed run needs at least 2 ranks, world has {size}")]
    WorldTooSmall { size: usize },
}

/// Failures of the point-to-point transport used by the distributed protocol.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rank {rank} disconnected")]
    Disconnected { rank: usize },
    #[error("inbox of rank {rank} closed, no peer left to send")]
    Closed { rank: usize },
    #[error("rank {rank} cannot send to itself")]
    SelfSend { rank: usize },
    #[error("rank {rank} is outside a world of size {size}")]
    UnknownRank { rank: usize, size: usize },
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[cfg(feature = "parallel")]
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("worker in slot {slot} panicked")]
    WorkerPanicked { slot: usize },
    #[error("worker rank {rank} failed: {detail}")]
    RankFailed { rank: usize, detail: String },
    #[error("protocol violation at rank {rank}: {detail}")]
    Protocol { rank: usize, detail: &'static str },
}

impl SweepError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SweepError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
