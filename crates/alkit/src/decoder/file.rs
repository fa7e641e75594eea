//! Built-in file decoder backed by `symphonia`.
//!
//! The whole file is decoded on open. 8-bit sources are kept as
//! [`SampleType::UInt8`], up to 16 bits as [`SampleType::Int16`], anything
//! wider or floating point as [`SampleType::Float32`].
use std::{fmt::Display, fs::File, path::Path};

use symphonia::core::{
    audio::{AudioBufferRef, SampleBuffer},
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::{
    audio::formats::{ChannelConfig, SampleType},
    decoder::Decoder,
    AlError, AlResult,
};

pub struct FileDecoder {
    frequency: u32,
    channel_config: ChannelConfig,
    sample_type: SampleType,
    data: Vec<u8>,
    frame_bytes: usize,
    position: u64,
}

fn open_error(path: &Path, e: impl Display) -> AlError {
    AlError::resource(format!("{}: {e}", path.display()))
}

impl FileDecoder {
    pub fn open(path: impl AsRef<Path>) -> AlResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| open_error(path, e))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| open_error(path, "no audio track"))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let frequency = params
            .sample_rate
            .ok_or_else(|| open_error(path, "unknown sample rate"))?;
        let channels = params
            .channels
            .map(|c| c.count() as u32)
            .ok_or_else(|| open_error(path, "unknown channel layout"))?;
        let channel_config = ChannelConfig::from_channel_count(channels)?;
        let sample_type = match params.bits_per_sample {
            Some(bits) if bits <= 8 => SampleType::UInt8,
            Some(bits) if bits <= 16 => SampleType::Int16,
            _ => SampleType::Float32,
        };

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| open_error(path, e))?;

        let mut data = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => return Err(open_error(path, e)),
            };
            if packet.track_id() != track_id {
                continue;
            }
            if let Some(decoded) =
                skip_corrupt(decoder.decode(&packet)).map_err(|e| open_error(path, e))?
            {
                append_interleaved(&mut data, decoded, sample_type);
            }
        }

        let frame_bytes = channels as usize * sample_type.bytes_per_sample();
        tracing::debug!(
            path = %path.display(),
            frequency,
            channels,
            sample_type = %sample_type,
            frames = data.len() / frame_bytes,
            "file decoded"
        );
        Ok(Self {
            frequency,
            channel_config,
            sample_type,
            data,
            frame_bytes,
            position: 0,
        })
    }
}

fn append_interleaved(out: &mut Vec<u8>, decoded: AudioBufferRef<'_>, sample_type: SampleType) {
    let spec = *decoded.spec();
    let capacity = decoded.capacity() as u64;
    match sample_type {
        SampleType::UInt8 | SampleType::Mulaw => {
            let mut buf = SampleBuffer::<u8>::new(capacity, spec);
            buf.copy_interleaved_ref(decoded);
            out.extend_from_slice(buf.samples());
        }
        SampleType::Int16 => {
            let mut buf = SampleBuffer::<i16>::new(capacity, spec);
            buf.copy_interleaved_ref(decoded);
            out.extend(buf.samples().iter().flat_map(|s| s.to_le_bytes()));
        }
        SampleType::Float32 => {
            let mut buf = SampleBuffer::<f32>::new(capacity, spec);
            buf.copy_interleaved_ref(decoded);
            out.extend(buf.samples().iter().flat_map(|s| s.to_le_bytes()));
        }
    }
}

/// Drops a packet the codec rejects as malformed. Any other error ends the
/// load.
fn skip_corrupt<T>(decoded: Result<T, SymphoniaError>) -> Result<Option<T>, SymphoniaError> {
    match decoded {
        Ok(decoded) => Ok(Some(decoded)),
        Err(SymphoniaError::DecodeError(reason)) => {
            tracing::warn!(reason, "skipping undecodable packet");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl Decoder for FileDecoder {
    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn channel_config(&self) -> ChannelConfig {
        self.channel_config
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn length(&self) -> u64 {
        (self.data.len() / self.frame_bytes) as u64
    }

    fn seek(&mut self, frame: u64) -> bool {
        if frame > self.length() {
            return false;
        }
        self.position = frame;
        true
    }

    fn read(&mut self, frames: usize) -> Vec<u8> {
        let start = (self.position as usize * self.frame_bytes).min(self.data.len());
        let end = (start + frames * self.frame_bytes).min(self.data.len());
        self.position += ((end - start) / self.frame_bytes) as u64;
        self.data[start..end].to_vec()
    }
}

impl std::fmt::Debug for FileDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDecoder")
            .field("frequency", &self.frequency)
            .field("channel_config", &self.channel_config)
            .field("sample_type", &self.sample_type)
            .field("length", &self.length())
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_assets::WavFile;

    #[test]
    fn test_file_decoder_reads_wav() {
        let wav = WavFile::stereo_i16(44100, &[(1, -1), (2, -2), (3, -3)]);
        let mut decoder = FileDecoder::open(wav.path()).unwrap();
        assert_eq!(decoder.frequency(), 44100);
        assert_eq!(decoder.channel_config(), ChannelConfig::Stereo);
        assert_eq!(decoder.sample_type(), SampleType::Int16);
        assert_eq!(decoder.length(), 3);
        assert_eq!(decoder.loop_points(), (0, 3));

        let first = decoder.read(2);
        assert_eq!(first.len(), 8);
        assert_eq!(i16::from_le_bytes([first[4], first[5]]), 2);
        assert_eq!(decoder.read(2).len(), 4);
        assert!(decoder.read(2).is_empty());
    }

    #[test]
    fn test_file_decoder_seek() {
        let wav = WavFile::mono_i16(8000, &[10, 20, 30, 40]);
        let mut decoder = FileDecoder::open(wav.path()).unwrap();
        assert!(decoder.seek(3));
        assert_eq!(decoder.read(10), 40i16.to_le_bytes().to_vec());
        assert!(decoder.seek(4));
        assert!(decoder.read(1).is_empty());
        assert!(!decoder.seek(5));
    }

    #[test]
    fn test_file_decoder_missing_file() {
        assert!(matches!(
            FileDecoder::open("definitely/not/here.wav"),
            Err(AlError::Resource(_))
        ));
    }

    #[test]
    fn test_corrupt_packet_is_skipped() {
        assert!(matches!(skip_corrupt(Ok(7u8)), Ok(Some(7))));
        assert!(matches!(
            skip_corrupt::<u8>(Err(SymphoniaError::DecodeError("bad frame header"))),
            Ok(None)
        ));
        assert!(matches!(
            skip_corrupt::<u8>(Err(SymphoniaError::Unsupported("codec"))),
            Err(SymphoniaError::Unsupported(_))
        ));
        assert!(matches!(
            skip_corrupt::<u8>(Err(SymphoniaError::ResetRequired)),
            Err(SymphoniaError::ResetRequired)
        ));
    }

    #[test]
    fn test_file_decoder_rejects_garbage() {
        let file = WavFile::raw("bin", b"this is not audio");
        assert!(FileDecoder::open(file.path()).is_err());
    }
}
