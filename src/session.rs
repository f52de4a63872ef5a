//! Pipeline session: owns the current terrain and the decodes in flight.
//!
//! Decodes run on worker threads and report back over a channel. Each
//! submission gets a generation number in submission order; a completion only
//! replaces the current terrain if its generation is newer than the one on
//! display, so a slow old decode can never overwrite a newer result.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::audio::decode::{AudioDecoder, CancelToken, DecodedAudio};
use crate::audio::reduce::{reduce, MagnitudeSequence};
use crate::config::{TerrainConfig, ViewerConfig};
use crate::error::{ConfigError, DecodeError, PipelineError};
use crate::mesh::relief::{deform, ReliefMesh};
use crate::mesh::stl::export_binary;
use crate::mesh::surface::BaseSurface;
use crate::naming::{file_stem, stl_file_name};

/// One completed pipeline run, as shown to the viewer.
#[derive(Debug)]
pub struct Terrain {
    pub generation: u64,
    pub stem: String,
    pub sample_rate: u32,
    pub magnitudes: MagnitudeSequence,
    pub mesh: ReliefMesh,
}

impl Terrain {
    pub fn file_name(&self) -> String {
        stl_file_name(&self.stem)
    }
}

/// What happened to a finished decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Became the current terrain.
    Applied { generation: u64 },
    /// Finished after a newer submission had already been applied.
    Discarded { generation: u64 },
    Cancelled { generation: u64 },
}

impl Outcome {
    pub fn generation(&self) -> u64 {
        match *self {
            Outcome::Applied { generation }
            | Outcome::Discarded { generation }
            | Outcome::Cancelled { generation } => generation,
        }
    }
}

/// Caller's grip on a submitted decode.
#[derive(Clone, Debug)]
pub struct DecodeHandle {
    generation: u64,
    cancel: CancelToken,
}

impl DecodeHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

struct Completion {
    generation: u64,
    name: String,
    result: Result<DecodedAudio, DecodeError>,
}

pub struct Session {
    terrain: TerrainConfig,
    viewer: ViewerConfig,
    base: BaseSurface,
    decoder: Arc<dyn AudioDecoder>,
    next_generation: u64,
    applied_generation: u64,
    in_flight: HashMap<u64, CancelToken>,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    current: Option<Arc<Terrain>>,
    subscribers: Vec<Sender<Arc<Terrain>>>,
}

impl Session {
    pub fn new(
        terrain: TerrainConfig,
        viewer: ViewerConfig,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Result<Self, ConfigError> {
        terrain.validate()?;
        viewer.validate()?;

        let base = BaseSurface::generate(terrain.surface_params());
        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();

        Ok(Self {
            terrain,
            viewer,
            base,
            decoder,
            next_generation: 1,
            applied_generation: 0,
            in_flight: HashMap::new(),
            completions_tx,
            completions_rx,
            current: None,
            subscribers: Vec::new(),
        })
    }

    pub fn base(&self) -> &BaseSurface {
        &self.base
    }

    pub fn terrain_config(&self) -> &TerrainConfig {
        &self.terrain
    }

    /// Display rotation for the viewer; has no effect on exported geometry.
    pub fn rotation(&self) -> [f32; 3] {
        self.viewer.rotation
    }

    pub fn current(&self) -> Option<&Arc<Terrain>> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Receive every terrain that replaces the displayed one.
    pub fn subscribe(&mut self) -> Receiver<Arc<Terrain>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Start decoding `bytes` on a worker thread.
    pub fn submit(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> DecodeHandle {
        let name = name.into();
        let generation = self.next_generation;
        self.next_generation += 1;

        let cancel = CancelToken::new();
        self.in_flight.insert(generation, cancel.clone());

        log::info!("Submitting {} ({} bytes) as generation {}", name, bytes.len(), generation);

        let decoder = Arc::clone(&self.decoder);
        let tx = self.completions_tx.clone();
        let token = cancel.clone();
        let spawned = thread::Builder::new()
            .name(format!("decode-{}", generation))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    decoder.decode(&name, bytes, &token)
                }))
                .unwrap_or(Err(DecodeError::WorkerPanicked));
                // The session may already be gone; nothing to report to then.
                let _ = tx.send(Completion {
                    generation,
                    name,
                    result,
                });
            });

        if let Err(err) = spawned {
            log::error!("Failed to spawn decode worker for generation {}: {}", generation, err);
            let _ = self.completions_tx.send(Completion {
                generation,
                name: format!("generation {}", generation),
                result: Err(DecodeError::WorkerPanicked),
            });
        }

        DecodeHandle { generation, cancel }
    }

    /// Block until the next in-flight decode finishes and process it.
    ///
    /// Returns `None` when nothing is in flight.
    pub fn wait_next(&mut self) -> Option<Result<Outcome, PipelineError>> {
        if self.in_flight.is_empty() {
            return None;
        }
        let completion = self.completions_rx.recv().ok()?;
        Some(self.complete(completion))
    }

    /// Process a finished decode if one is ready, without blocking.
    pub fn try_next(&mut self) -> Option<Result<Outcome, PipelineError>> {
        let completion = self.completions_rx.try_recv().ok()?;
        Some(self.complete(completion))
    }

    /// Submit `bytes` and wait for that decode to finish, processing any
    /// other completions that arrive first.
    pub fn load(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<Outcome, PipelineError> {
        let generation = self.submit(name, bytes).generation();
        loop {
            match self.wait_next() {
                Some(result) => {
                    let own = match &result {
                        Ok(outcome) => outcome.generation() == generation,
                        Err(_) => !self.in_flight.contains_key(&generation),
                    };
                    if own {
                        return result;
                    }
                    if let Err(err) = result {
                        log::warn!("Earlier submission failed: {}", err);
                    }
                }
                // submit() always registers the generation, so this only
                // happens if its completion was consumed elsewhere.
                None => return Ok(Outcome::Discarded { generation }),
            }
        }
    }

    /// Run reduce and deform on already-decoded audio, bypassing the worker.
    pub fn apply_audio(&mut self, name: &str, audio: &DecodedAudio) -> Result<Arc<Terrain>, PipelineError> {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.apply(generation, name, audio)
    }

    /// Binary STL of the current terrain.
    pub fn export(&self) -> Result<Vec<u8>, PipelineError> {
        let terrain = self.current.as_ref().ok_or(PipelineError::NothingToExport)?;
        Ok(export_binary(&terrain.mesh)?)
    }

    /// `<stem>.stl` of the current terrain, if there is one to export.
    pub fn export_file_name(&self) -> Option<String> {
        self.current.as_ref().map(|t| t.file_name())
    }

    fn complete(&mut self, completion: Completion) -> Result<Outcome, PipelineError> {
        let Completion {
            generation,
            name,
            result,
        } = completion;
        self.in_flight.remove(&generation);

        let audio = match result {
            Ok(audio) => audio,
            Err(DecodeError::Cancelled) => {
                log::debug!("Generation {} ({}) was cancelled", generation, name);
                return Ok(Outcome::Cancelled { generation });
            }
            Err(source) => return Err(PipelineError::Decode { name, source }),
        };

        if generation <= self.applied_generation {
            log::debug!(
                "Discarding generation {} ({}); generation {} is already displayed",
                generation,
                name,
                self.applied_generation
            );
            return Ok(Outcome::Discarded { generation });
        }

        self.apply(generation, &name, &audio)?;
        Ok(Outcome::Applied { generation })
    }

    fn apply(&mut self, generation: u64, name: &str, audio: &DecodedAudio) -> Result<Arc<Terrain>, PipelineError> {
        let magnitudes = reduce(audio.first_channel(), self.terrain.width_segments);
        let mesh = deform(&self.base, &magnitudes, self.terrain.height_scale)?;

        let terrain = Arc::new(Terrain {
            generation,
            stem: file_stem(name),
            sample_rate: audio.sample_rate,
            magnitudes,
            mesh,
        });

        log::info!(
            "Generation {} applied: {} -> {} (peak magnitude {:.4})",
            generation,
            name,
            terrain.file_name(),
            terrain.magnitudes.peak()
        );

        self.applied_generation = generation;
        self.current = Some(Arc::clone(&terrain));
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&terrain)).is_ok());

        Ok(terrain)
    }
}
