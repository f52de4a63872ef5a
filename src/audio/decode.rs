use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

/// Decoded PCM, one planar buffer per channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    /// The only channel the terrain pipeline consumes. Empty when the stream
    /// carried no channels at all.
    pub fn first_channel(&self) -> &[f32] {
        self.channels.first().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.first_channel().len() as f32 / self.sample_rate as f32
    }
}

/// Shared flag telling an in-flight decode to stop at its next packet.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Turns an encoded audio file into samples.
///
/// Implementations run on a worker thread owned by the session, so they must
/// be shareable across threads. `name` is the display name of the input and
/// may be used as a format hint.
pub trait AudioDecoder: Send + Sync {
    fn decode(
        &self,
        name: &str,
        bytes: Vec<u8>,
        cancel: &CancelToken,
    ) -> Result<DecodedAudio, DecodeError>;
}

/// Decoder backed by symphonia's probe and codec registries.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(
        &self,
        name: &str,
        bytes: Vec<u8>,
        cancel: &CancelToken,
    ) -> Result<DecodedAudio, DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(DecodeError::Probe)?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoTrack)?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or(DecodeError::UnknownSampleRate)?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(DecodeError::Codec)?;

        let mut channels: Vec<Vec<f32>> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Err(DecodeError::Cancelled);
            }

            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::debug!("Skipping undecodable packet in {}: {}", name, msg);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            let num_channels = spec.channels.count();
            if num_frames == 0 || num_channels == 0 {
                continue;
            }
            if channels.len() < num_channels {
                channels.resize_with(num_channels, Vec::new);
            }

            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_planar_ref(decoded);

            for (channel, plane) in channels
                .iter_mut()
                .zip(sample_buf.samples().chunks_exact(num_frames))
            {
                channel.extend_from_slice(plane);
            }
        }

        let audio = DecodedAudio {
            sample_rate,
            channels,
        };

        log::info!(
            "Decoded {}: {} samples x {} channel(s), {}Hz, {:.1}s",
            name,
            audio.first_channel().len(),
            audio.channels.len(),
            sample_rate,
            audio.duration_secs()
        );

        Ok(audio)
    }
}
