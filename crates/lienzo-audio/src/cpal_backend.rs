//! cpal-based audio backend.
//!
//! One output stream is opened at the device's default configuration, and
//! every source is software-mixed into its callback: per-source queues of
//! int16 buffers are resampled to the output rate (nearest-frame), summed
//! in f32, scaled by the master volume and clamped. This is deliberately
//! the "one mixed stream" architecture — one device endpoint total, not one
//! per voice, no matter how many sources exist.
//!
//! `stop_source` merely clears the playing flag; the cursor into the queued
//! data stays put, so `start_source` resumes exactly where playback left
//! off (the pause semantics the mixer relies on).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;

use crate::backend::{AudioBackend, SourceId, SourceParams};
use crate::{Error, Result};

/// Type-erased handle keeping the cpal stream alive until drop.
struct StreamHandle {
    _inner: Box<dyn Send>,
}

struct Source {
    channels: u16,
    sample_rate: u32,
    looping: bool,
    playing: bool,
    /// Queued PCM buffers; the front one is being consumed.
    queue: VecDeque<Arc<[i16]>>,
    /// Fractional frame position inside the front buffer.
    cursor: f64,
    /// A non-looping source that ran out of data.
    drained: bool,
}

struct Shared {
    next_id: u64,
    master_volume: f32,
    sources: HashMap<u64, Source>,
}

/// Audio backend playing through cpal (ALSA, CoreAudio, WASAPI, ...).
pub struct CpalBackend {
    shared: Arc<Mutex<Shared>>,
    /// Keeps the output stream alive; never touched after construction.
    _stream: Mutex<StreamHandle>,
}

impl CpalBackend {
    /// Open the default output device and start the mixing stream.
    ///
    /// Fails (and lets the probe move on to the null backend) when there is
    /// no output device or the stream cannot be built.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or(Error::NoDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::Backend(e.to_string()))?;

        let output_rate = config.sample_rate().0;
        let output_channels = config.channels();

        let shared = Arc::new(Mutex::new(Shared {
            next_id: 1,
            master_volume: 1.0,
            sources: HashMap::new(),
        }));

        let mix_shared = shared.clone();

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    mix(&mix_shared, data, output_rate, output_channels);
                },
                |error| {
                    tracing::warn!(%error, "cpal stream error");
                },
                None,
            )
            .map_err(|e| Error::Backend(e.to_string()))?;

        stream.play().map_err(|e| Error::Backend(e.to_string()))?;

        tracing::info!(
            host = host.id().name(),
            sample_rate = output_rate,
            channels = output_channels,
            "cpal backend initialized"
        );

        Ok(Self {
            shared,
            _stream: Mutex::new(StreamHandle {
                _inner: Box::new(stream),
            }),
        })
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn set_master_volume(&self, volume: f32) {
        self.shared.lock().master_volume = volume.clamp(0.0, 1.0);
    }

    fn create_source(&self, params: SourceParams) -> Result<SourceId> {
        if params.channels == 0 || params.channels > 2 || params.sample_rate == 0 {
            return Err(Error::Backend(format!(
                "unsupported source format: {} ch, {} Hz",
                params.channels, params.sample_rate
            )));
        }

        let mut shared = self.shared.lock();
        let id = shared.next_id;
        shared.next_id += 1;

        shared.sources.insert(
            id,
            Source {
                channels: params.channels,
                sample_rate: params.sample_rate,
                looping: params.looping,
                playing: false,
                queue: VecDeque::new(),
                cursor: 0.0,
                drained: false,
            },
        );

        Ok(SourceId(id))
    }

    fn destroy_source(&self, source: SourceId) {
        self.shared.lock().sources.remove(&source.0);
    }

    fn is_source_used(&self, source: SourceId) -> bool {
        let shared = self.shared.lock();
        shared
            .sources
            .get(&source.0)
            .is_some_and(|s| !s.drained && (s.playing || !s.queue.is_empty()))
    }

    fn queue_buffer(&self, source: SourceId, samples: Arc<[i16]>) -> Result<()> {
        let mut shared = self.shared.lock();

        let Some(src) = shared.sources.get_mut(&source.0) else {
            return Err(Error::Backend("unknown source".to_string()));
        };

        if !samples.is_empty() {
            src.queue.push_back(samples);
            src.drained = false;
        }

        Ok(())
    }

    fn queued_buffers(&self, source: SourceId) -> usize {
        self.shared
            .lock()
            .sources
            .get(&source.0)
            .map_or(0, |s| s.queue.len())
    }

    fn start_source(&self, source: SourceId) -> Result<()> {
        let mut shared = self.shared.lock();

        let Some(src) = shared.sources.get_mut(&source.0) else {
            return Err(Error::Backend("unknown source".to_string()));
        };

        src.playing = true;
        Ok(())
    }

    fn stop_source(&self, source: SourceId) -> Result<()> {
        let mut shared = self.shared.lock();

        let Some(src) = shared.sources.get_mut(&source.0) else {
            return Err(Error::Backend("unknown source".to_string()));
        };

        src.playing = false;
        Ok(())
    }
}

/// Fill one output buffer from every playing source.
fn mix(shared: &Arc<Mutex<Shared>>, data: &mut [f32], output_rate: u32, output_channels: u16) {
    data.fill(0.0);

    let mut shared = shared.lock();
    let master = shared.master_volume;
    let out_channels = usize::from(output_channels);
    let frames = data.len() / out_channels.max(1);

    for src in shared.sources.values_mut() {
        if !src.playing {
            continue;
        }

        let step = f64::from(src.sample_rate) / f64::from(output_rate);

        for frame in 0..frames {
            let Some(front) = src.queue.front() else {
                if !src.looping {
                    src.playing = false;
                    src.drained = true;
                }
                break;
            };

            let src_channels = usize::from(src.channels);
            let front_frames = front.len() / src_channels;
            let src_frame = src.cursor as usize;

            if src_frame >= front_frames {
                // Front buffer consumed: recycle it when looping, drop it
                // otherwise.
                src.cursor -= front_frames as f64;

                if src.looping {
                    let recycled = src.queue.pop_front();
                    if let Some(buffer) = recycled {
                        src.queue.push_back(buffer);
                    }
                } else {
                    src.queue.pop_front();
                }

                if src.queue.is_empty() {
                    if !src.looping {
                        src.playing = false;
                        src.drained = true;
                    }
                    break;
                }

                continue;
            }

            for channel in 0..out_channels {
                // Mono sources feed every output channel; extra output
                // channels repeat the last source channel.
                let source_channel = channel.min(src_channels - 1);
                let sample = front[src_frame * src_channels + source_channel];
                data[frame * out_channels + channel] += f32::from(sample) / 32768.0;
            }

            src.cursor += step;
        }
    }

    for sample in data.iter_mut() {
        *sample = (*sample * master).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shared(sources: Vec<(u64, Source)>) -> Arc<Mutex<Shared>> {
        Arc::new(Mutex::new(Shared {
            next_id: 100,
            master_volume: 1.0,
            sources: sources.into_iter().collect(),
        }))
    }

    fn source(samples: Vec<i16>, channels: u16, looping: bool) -> Source {
        Source {
            channels,
            sample_rate: 48_000,
            looping,
            playing: true,
            queue: VecDeque::from([Arc::from(samples)]),
            cursor: 0.0,
            drained: false,
        }
    }

    #[test]
    fn test_mix_mono_to_stereo() {
        let shared = test_shared(vec![(1, source(vec![16384, -16384], 1, false))]);
        let mut out = vec![0.0f32; 8];

        mix(&shared, &mut out, 48_000, 2);

        // Each mono sample lands on both output channels.
        assert!((out[0] - 0.5).abs() < 1e-3);
        assert!((out[1] - 0.5).abs() < 1e-3);
        assert!((out[2] + 0.5).abs() < 1e-3);
        assert!((out[3] + 0.5).abs() < 1e-3);
        // Past the end: silence, source drained.
        assert_eq!(&out[4..], &[0.0; 4]);

        let guard = shared.lock();
        let src = &guard.sources[&1];
        assert!(src.drained);
        assert!(!src.playing);
        assert!(src.queue.is_empty());
    }

    #[test]
    fn test_mix_looping_source_wraps() {
        let shared = test_shared(vec![(1, source(vec![8192, -8192], 1, true))]);
        let mut out = vec![0.0f32; 12];

        mix(&shared, &mut out, 48_000, 2);

        // The 2-frame buffer repeats for all 6 output frames.
        for frame in 0..6 {
            let expected = if frame % 2 == 0 { 0.25 } else { -0.25 };
            assert!((out[frame * 2] - expected).abs() < 1e-3, "frame {frame}");
        }

        let guard = shared.lock();
        assert!(guard.sources[&1].playing);
        assert!(!guard.sources[&1].drained);
    }

    #[test]
    fn test_mix_applies_master_volume_and_clamps() {
        let shared = test_shared(vec![
            (1, source(vec![i16::MAX; 4], 1, false)),
            (2, source(vec![i16::MAX; 4], 1, false)),
        ]);
        shared.lock().master_volume = 0.5;

        let mut out = vec![0.0f32; 8];
        mix(&shared, &mut out, 48_000, 2);

        // Two full-scale sources sum to ~2.0, halved to ~1.0.
        assert!((out[0] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_paused_source_keeps_position() {
        let shared = test_shared(vec![(1, source((0..8).map(|i| i * 1000).collect(), 1, false))]);

        let mut out = vec![0.0f32; 8]; // consumes 4 frames at 1:1
        mix(&shared, &mut out, 48_000, 2);

        shared.lock().sources.get_mut(&1).unwrap().playing = false;

        let mut silent = vec![1.0f32; 8];
        mix(&shared, &mut silent, 48_000, 2);
        assert_eq!(silent, vec![0.0; 8]);

        // Cursor did not move while paused.
        assert_eq!(shared.lock().sources[&1].cursor as usize, 4);
    }
}
