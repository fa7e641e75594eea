//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    path::{Path, PathBuf},
};

use alkit::prelude::*;

/// Mono 16-bit 44.1 kHz silence of a fixed length.
pub struct Silence {
    frames: u64,
    position: u64,
}

impl Silence {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            position: 0,
        }
    }
}

impl Decoder for Silence {
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
        let bytes = vec![0u8; (end - self.position) as usize * 2];
        self.position = end;
        bytes
    }
}

pub fn silence_buffer(name: &str, frames: u64) -> Buffer {
    Buffer::from_decoder(name, Box::new(Silence::new(frames))).expect("buffer")
}

/// Writes a mono 16-bit PCM WAV file into `dir`.
pub fn write_wav(dir: &Path, file_name: &str, sample_rate: u32, samples: &[i16]) -> PathBuf {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    let path = dir.join(file_name);
    std::fs::write(&path, out).expect("write wav");
    path
}

/// Records every notification it receives.
#[derive(Default)]
pub struct Recorder {
    pub stopped: RefCell<Vec<SourceRef>>,
    pub force_stopped: RefCell<Vec<SourceRef>>,
    pub disconnected: Cell<usize>,
    pub not_found: RefCell<Vec<String>>,
    pub substitutes: Vec<(String, String)>,
}

impl Recorder {
    pub fn with_substitute(missing: &str, substitute: &str) -> Self {
        Self {
            substitutes: vec![(missing.to_string(), substitute.to_string())],
            ..Default::default()
        }
    }
}

impl MessageHandler for Recorder {
    fn device_disconnected(&self, _device: &DeviceRef) {
        self.disconnected.set(self.disconnected.get() + 1);
    }

    fn source_stopped(&self, source: &SourceRef) {
        self.stopped.borrow_mut().push(source.clone());
    }

    fn source_force_stopped(&self, source: &SourceRef) {
        self.force_stopped.borrow_mut().push(source.clone());
    }

    fn resource_not_found(&self, name: &str) -> String {
        self.not_found.borrow_mut().push(name.to_string());
        self.substitutes
            .iter()
            .find(|(missing, _)| missing == name)
            .map(|(_, substitute)| substitute.clone())
            .unwrap_or_default()
    }
}
