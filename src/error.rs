use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn encoded bytes into samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to probe audio format: {0}")]
    Probe(#[source] symphonia::core::errors::Error),
    #[error("no audio tracks found")]
    NoTrack,
    #[error("unknown sample rate")]
    UnknownSampleRate,
    #[error("failed to create audio decoder: {0}")]
    Codec(#[source] symphonia::core::errors::Error),
    #[error("audio stream error: {0}")]
    Stream(#[from] symphonia::core::errors::Error),
    #[error("decode cancelled")]
    Cancelled,
    #[error("decode worker panicked")]
    WorkerPanicked,
}

/// A magnitude sequence that does not match the surface it is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("magnitude sequence has {actual} entries but the surface has {expected} width segments")]
pub struct ContractViolation {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write STL: {0}")]
    Io(#[from] std::io::Error),
    #[error("index buffer length {0} is not a multiple of 3")]
    RaggedIndices(usize),
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("{0} triangles exceed the STL triangle count field")]
    TooManyTriangles(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Why a pipeline run did not produce a new terrain.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("no terrain has been generated yet")]
    NothingToExport,
}
