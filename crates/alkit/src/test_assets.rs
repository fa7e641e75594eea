use std::io::Write;

use crate::{
    audio::formats::{ChannelConfig, SampleType},
    buffer::Buffer,
    decoder::Decoder,
    AlResult,
};

/// Mono 16-bit 44.1 kHz decoder producing a fixed number of frames of a
/// sawtooth.
pub(crate) struct ToneDecoder {
    frames: u64,
    position: u64,
}

impl ToneDecoder {
    pub(crate) fn new(frames: u64) -> Self {
        Self {
            frames,
            position: 0,
        }
    }
}

impl Decoder for ToneDecoder {
    fn frequency(&self) -> u32 {
        44100
    }

    fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::Mono
    }

    fn sample_type(&self) -> SampleType {
        SampleType::Int16
    }

    fn length(&self) -> u64 {
        self.frames
    }

    fn seek(&mut self, frame: u64) -> bool {
        if frame > self.frames {
            return false;
        }
        self.position = frame;
        true
    }

    fn read(&mut self, frames: usize) -> Vec<u8> {
        let end = (self.position + frames as u64).min(self.frames);
        let out = (self.position..end)
            .flat_map(|f| (((f % 64) as i16 - 32) * 512).to_le_bytes())
            .collect();
        self.position = end;
        out
    }
}

/// A cached mono buffer of `frames` frames at 44.1 kHz.
pub(crate) fn mono_buffer(name: &str, frames: u64) -> AlResult<Buffer> {
    Buffer::from_decoder(name, Box::new(ToneDecoder::new(frames)))
}

/// A file in the temp dir, removed on drop.
pub(crate) struct WavFile {
    path: tempfile::TempPath,
}

impl WavFile {
    pub(crate) fn raw(ext: &str, bytes: &[u8]) -> Self {
        let mut file = tempfile::Builder::new()
            .prefix("alkit_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(bytes).unwrap();
        Self {
            path: file.into_temp_path(),
        }
    }

    pub(crate) fn mono_i16(sample_rate: u32, samples: &[i16]) -> Self {
        Self::raw("wav", &wav_i16_le(1, sample_rate, samples))
    }

    pub(crate) fn stereo_i16(sample_rate: u32, frames: &[(i16, i16)]) -> Self {
        let samples: Vec<i16> = frames.iter().flat_map(|(l, r)| [*l, *r]).collect();
        Self::raw("wav", &wav_i16_le(2, sample_rate, &samples))
    }

    pub(crate) fn path(&self) -> &str {
        self.path.to_str().unwrap()
    }
}

/// A canonical 44-byte-header PCM WAV of interleaved 16-bit samples.
pub(crate) fn wav_i16_le(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    assert!(channels > 0 && samples.len() % channels as usize == 0);
    let block_align = channels * 2;
    let data_len = (samples.len() * 2) as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    for field in [
        b"RIFF".as_slice(),
        &(36 + data_len).to_le_bytes(),
        b"WAVEfmt ",
        &16u32.to_le_bytes(),
        &1u16.to_le_bytes(),
        &channels.to_le_bytes(),
        &sample_rate.to_le_bytes(),
        &(sample_rate * block_align as u32).to_le_bytes(),
        &block_align.to_le_bytes(),
        &16u16.to_le_bytes(),
        b"data",
        &data_len.to_le_bytes(),
    ] {
        out.extend_from_slice(field);
    }
    out.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
    out
}
