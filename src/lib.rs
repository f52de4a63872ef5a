//! Audio-driven cylindrical relief meshes.
//!
//! A decoded waveform is reduced to one mean-amplitude value per
//! circumferential segment, those values push the side wall of a cylinder
//! outward along its normals, and the result is written as binary STL.

pub mod audio;
pub mod config;
pub mod error;
pub mod mesh;
pub mod naming;
pub mod session;

pub use audio::decode::{AudioDecoder, CancelToken, DecodedAudio, SymphoniaDecoder};
pub use audio::reduce::{reduce, MagnitudeSequence};
pub use config::{Config, TerrainConfig, ViewerConfig};
pub use error::{ConfigError, ContractViolation, DecodeError, ExportError, PipelineError};
pub use mesh::relief::{deform, ReliefMesh};
pub use mesh::stl::{export_binary, write_binary};
pub use mesh::surface::{BaseSurface, SurfaceParams, TriangleMesh};
pub use session::{DecodeHandle, Outcome, Session, Terrain};
