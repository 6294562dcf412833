//! Audio stream decoders.
//!
//! Two formats are supported, probed in order: RIFF WAVE (via hound) and
//! Ogg Vorbis (via symphonia). Whichever recognizes the data is wrapped in a
//! [`Decoder`] presenting one uniform interface to the mixer:
//!
//! - stream format (`channels`, `sample_rate`, `total_samples`)
//! - `read` the next chunk of interleaved int16 samples
//! - `rewind` to the first sample
//!
//! `total_samples` counts individual sample values across all channels, the
//! same unit `read` consumes. WAV sample depths of 8, 16, 24 and 32 bits
//! (and float) are normalized to int16.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::{Error, Result};

/// A decoded audio stream, format-agnostic.
pub enum Decoder {
    /// RIFF WAVE, decoded by hound.
    Wav(WavDecoder),
    /// Ogg Vorbis, decoded by symphonia.
    Vorbis(VorbisDecoder),
}

impl Decoder {
    /// Open a file, probing WAV first, then Ogg Vorbis.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();

        match WavDecoder::open_file(path) {
            Ok(wav) => {
                tracing::info!(file = %name, format = "RIFF WAVE", "audio stream opened");
                return Ok(Self::Wav(wav));
            }
            Err(error) => {
                tracing::debug!(file = %name, %error, "not a WAV stream");
            }
        }

        match VorbisDecoder::open_source(Box::new(File::open(path)?)) {
            Ok(vorbis) => {
                tracing::info!(file = %name, format = "Ogg Vorbis", "audio stream opened");
                Ok(Self::Vorbis(vorbis))
            }
            Err(error) => {
                tracing::warn!(file = %name, %error, "audio format not recognized");
                Err(Error::UnrecognizedFormat(name))
            }
        }
    }

    /// Probe an in-memory buffer the same way [`open`](Self::open) probes a
    /// file. `name` is used only for logging.
    pub fn from_bytes(name: &str, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data: Arc<[u8]> = data.into();

        match WavDecoder::new(Box::new(SharedBytes::new(data.clone()))) {
            Ok(wav) => {
                tracing::info!(source = name, format = "RIFF WAVE", "audio stream opened");
                return Ok(Self::Wav(wav));
            }
            Err(error) => {
                tracing::debug!(source = name, %error, "not a WAV stream");
            }
        }

        match VorbisDecoder::open_source(Box::new(SharedBytes::new(data))) {
            Ok(vorbis) => {
                tracing::info!(source = name, format = "Ogg Vorbis", "audio stream opened");
                Ok(Self::Vorbis(vorbis))
            }
            Err(error) => {
                tracing::warn!(source = name, %error, "audio format not recognized");
                Err(Error::UnrecognizedFormat(name.to_string()))
            }
        }
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        match self {
            Self::Wav(d) => d.channels,
            Self::Vorbis(d) => d.channels,
        }
    }

    /// Samples per second per channel.
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Wav(d) => d.sample_rate,
            Self::Vorbis(d) => d.sample_rate,
        }
    }

    /// Total sample count across all channels. Decoders may deliver
    /// slightly fewer; treat this as an upper bound for allocation.
    pub fn total_samples(&self) -> u64 {
        match self {
            Self::Wav(d) => d.total_samples,
            Self::Vorbis(d) => d.total_samples,
        }
    }

    /// Decode the next samples into `out`. Returns how many were written;
    /// `0` means end of stream.
    pub fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        match self {
            Self::Wav(d) => d.read(out),
            Self::Vorbis(d) => d.read(out),
        }
    }

    /// Seek back to the first sample.
    pub fn rewind(&mut self) -> Result<()> {
        match self {
            Self::Wav(d) => d.rewind(),
            Self::Vorbis(d) => d.rewind(),
        }
    }
}

trait ReadSeek: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> ReadSeek for T {}

/// A cheaply cloneable byte buffer usable as a decoder source.
struct SharedBytes {
    data: Arc<[u8]>,
    pos: u64,
}

impl SharedBytes {
    fn new(data: Arc<[u8]>) -> Self {
        Self { data, pos: 0 }
    }
}

impl Read for SharedBytes {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let start = (self.pos as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for SharedBytes {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let len = self.data.len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };

        if target < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start",
            ));
        }

        self.pos = target as u64;
        Ok(self.pos)
    }
}

impl MediaSource for SharedBytes {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

/// RIFF WAVE stream decoder.
pub struct WavDecoder {
    reader: hound::WavReader<Box<dyn ReadSeek>>,
    channels: u16,
    sample_rate: u32,
    total_samples: u64,
    bits: u16,
    float: bool,
}

impl WavDecoder {
    fn open_file(path: &Path) -> Result<Self> {
        Self::new(Box::new(File::open(path)?))
    }

    fn new(source: Box<dyn ReadSeek>) -> Result<Self> {
        let reader = hound::WavReader::new(source)?;
        let spec = reader.spec();

        Ok(Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            total_samples: u64::from(reader.len()),
            bits: spec.bits_per_sample,
            float: spec.sample_format == hound::SampleFormat::Float,
            reader,
        })
    }

    fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        let mut written = 0;

        if self.float {
            for sample in self.reader.samples::<f32>().take(out.len()) {
                out[written] = (sample? * 32767.0).clamp(-32768.0, 32767.0) as i16;
                written += 1;
            }
        } else if self.bits <= 16 {
            let shift = 16 - self.bits;
            for sample in self.reader.samples::<i16>().take(out.len()) {
                out[written] = sample? << shift;
                written += 1;
            }
        } else {
            let shift = self.bits - 16;
            for sample in self.reader.samples::<i32>().take(out.len()) {
                out[written] = (sample? >> shift) as i16;
                written += 1;
            }
        }

        Ok(written)
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(0)?;
        Ok(())
    }
}

/// Ogg Vorbis stream decoder.
pub struct VorbisDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    channels: u16,
    sample_rate: u32,
    total_samples: u64,
    /// Interleaved samples decoded beyond what the last `read` consumed.
    pending: Vec<i16>,
    pending_pos: usize,
}

impl VorbisDecoder {
    fn open_source(source: Box<dyn MediaSource>) -> Result<Self> {
        let stream = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        hint.with_extension("ogg");

        let probed = symphonia::default::get_probe().format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        let format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| Error::UnrecognizedFormat("no audio track".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;

        let channels = track
            .codec_params
            .channels
            .map_or(0, |c| c.count()) as u16;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(0);

        if channels == 0 || sample_rate == 0 {
            return Err(Error::UnrecognizedFormat(
                "vorbis stream without format parameters".to_string(),
            ));
        }

        let total_samples = track
            .codec_params
            .n_frames
            .map_or(0, |frames| frames * u64::from(channels));

        Ok(Self {
            track_id: track.id,
            channels,
            sample_rate,
            total_samples,
            format,
            decoder,
            pending: Vec::new(),
            pending_pos: 0,
        })
    }

    fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        let mut written = 0;

        loop {
            // Serve leftovers from the previous packet first.
            while self.pending_pos < self.pending.len() && written < out.len() {
                out[written] = self.pending[self.pending_pos];
                self.pending_pos += 1;
                written += 1;
            }

            if written == out.len() {
                return Ok(written);
            }

            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                // End of stream, or a stream reset we treat as one.
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(written);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(written),
                Err(error) => return Err(error.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buffer =
                        SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);

                    self.pending.clear();
                    self.pending.extend_from_slice(buffer.samples());
                    self.pending_pos = 0;
                }
                // A corrupt packet is recoverable; skip it.
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::debug!(reason, "skipping undecodable vorbis packet");
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time: Time::default(),
                track_id: Some(self.track_id),
            },
        )?;
        self.decoder.reset();
        self.pending.clear();
        self.pending_pos = 0;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write a small WAV into a byte buffer.
    fn wav_bytes(channels: u16, bits: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &sample in samples {
                match bits {
                    8 => writer.write_sample((sample >> 8) as i8).unwrap(),
                    16 => writer.write_sample(sample).unwrap(),
                    24 | 32 => writer
                        .write_sample(i32::from(sample) << (bits - 16))
                        .unwrap(),
                    _ => unreachable!(),
                }
            }
            writer.finalize().unwrap();
        }

        cursor.into_inner()
    }

    #[test]
    fn test_wav_roundtrip_16bit() {
        let samples: Vec<i16> = (0..1000).map(|i| (i * 13 % 2000) - 1000).collect();
        let bytes = wav_bytes(2, 16, &samples);

        let mut decoder = Decoder::from_bytes("test.wav", bytes).unwrap();
        assert_eq!(decoder.channels(), 2);
        assert_eq!(decoder.sample_rate(), 44_100);
        assert_eq!(decoder.total_samples(), 1000);

        let mut out = vec![0i16; 1000];
        assert_eq!(decoder.read(&mut out).unwrap(), 1000);
        assert_eq!(out, samples);

        // EOF.
        assert_eq!(decoder.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_wav_rewind() {
        let samples: Vec<i16> = (0..256).map(|i| i * 100).collect();
        let bytes = wav_bytes(1, 16, &samples);

        let mut decoder = Decoder::from_bytes("test.wav", bytes).unwrap();
        let mut out = vec![0i16; 256];

        decoder.read(&mut out).unwrap();
        decoder.rewind().unwrap();

        let mut again = vec![0i16; 256];
        assert_eq!(decoder.read(&mut again).unwrap(), 256);
        assert_eq!(again, samples);
    }

    #[test]
    fn test_wav_chunked_reads() {
        let samples: Vec<i16> = (0..500).map(|i| i as i16).collect();
        let bytes = wav_bytes(1, 16, &samples);

        let mut decoder = Decoder::from_bytes("test.wav", bytes).unwrap();
        let mut collected = Vec::new();
        let mut chunk = vec![0i16; 128];

        loop {
            let n = decoder.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&chunk[..n]);
        }

        assert_eq!(collected, samples);
    }

    #[test]
    fn test_wav_24bit_normalization() {
        let samples = vec![i16::MIN, -1, 0, 1, i16::MAX];
        let bytes = wav_bytes(1, 24, &samples);

        let mut decoder = Decoder::from_bytes("test.wav", bytes).unwrap();
        let mut out = vec![0i16; 5];
        decoder.read(&mut out).unwrap();

        assert_eq!(out, samples);
    }

    #[test]
    fn test_open_probes_files_on_disk() {
        let samples: Vec<i16> = (0..100).map(|i| i * 7).collect();
        let bytes = wav_bytes(1, 16, &samples);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, bytes).unwrap();

        let mut decoder = Decoder::open(&path).unwrap();
        assert_eq!(decoder.channels(), 1);

        let mut out = vec![0i16; 100];
        assert_eq!(decoder.read(&mut out).unwrap(), 100);
        assert_eq!(out, samples);

        assert!(Decoder::open(dir.path().join("missing.wav")).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let garbage = vec![0xABu8; 512];
        assert!(matches!(
            Decoder::from_bytes("garbage", garbage),
            Err(Error::UnrecognizedFormat(_))
        ));
    }

    #[test]
    fn test_shared_bytes_seeking() {
        let mut source = SharedBytes::new(Arc::from(&b"0123456789"[..]));

        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"0123");

        source.seek(SeekFrom::Start(8)).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");

        source.seek(SeekFrom::End(-1)).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 1);

        assert!(source.seek(SeekFrom::Current(-100)).is_err());
    }
}
