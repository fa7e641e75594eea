//! Channel layouts and sample encodings of decoded audio.
use std::{fmt, str::FromStr};

use crate::{AlError, AlResult};

/// Speaker layout of decoded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelConfig {
    Mono,
    Stereo,
    Rear,
    Quad,
    X51,
    X61,
    X71,
    BFormat2D,
    BFormat3D,
}

impl ChannelConfig {
    pub const ALL: [ChannelConfig; 9] = [
        ChannelConfig::Mono,
        ChannelConfig::Stereo,
        ChannelConfig::Rear,
        ChannelConfig::Quad,
        ChannelConfig::X51,
        ChannelConfig::X61,
        ChannelConfig::X71,
        ChannelConfig::BFormat2D,
        ChannelConfig::BFormat3D,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ChannelConfig::Mono => "Mono",
            ChannelConfig::Stereo => "Stereo",
            ChannelConfig::Rear => "Rear",
            ChannelConfig::Quad => "Quadrophonic",
            ChannelConfig::X51 => "5.1 Surround",
            ChannelConfig::X61 => "6.1 Surround",
            ChannelConfig::X71 => "7.1 Surround",
            ChannelConfig::BFormat2D => "B-Format 2D",
            ChannelConfig::BFormat3D => "B-Format 3D",
        }
    }

    pub const fn channels(self) -> u32 {
        match self {
            ChannelConfig::Mono => 1,
            ChannelConfig::Stereo => 2,
            ChannelConfig::Rear => 2,
            ChannelConfig::Quad => 4,
            ChannelConfig::X51 => 6,
            ChannelConfig::X61 => 7,
            ChannelConfig::X71 => 8,
            ChannelConfig::BFormat2D => 3,
            ChannelConfig::BFormat3D => 4,
        }
    }

    /// Layout conventionally used for a plain interleaved stream with
    /// `channels` channels.
    pub fn from_channel_count(channels: u32) -> AlResult<Self> {
        match channels {
            1 => Ok(ChannelConfig::Mono),
            2 => Ok(ChannelConfig::Stereo),
            4 => Ok(ChannelConfig::Quad),
            6 => Ok(ChannelConfig::X51),
            7 => Ok(ChannelConfig::X61),
            8 => Ok(ChannelConfig::X71),
            other => Err(AlError::validation("channel count", other)),
        }
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelConfig {
    type Err = AlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelConfig::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| AlError::validation("channel config", s))
    }
}

/// Encoding of individual samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    UInt8,
    Int16,
    Float32,
    Mulaw,
}

impl SampleType {
    pub const ALL: [SampleType; 4] = [
        SampleType::UInt8,
        SampleType::Int16,
        SampleType::Float32,
        SampleType::Mulaw,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SampleType::UInt8 => "Unsigned 8-bit",
            SampleType::Int16 => "Signed 16-bit",
            SampleType::Float32 => "32-bit float",
            SampleType::Mulaw => "Mulaw",
        }
    }

    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleType::UInt8 | SampleType::Mulaw => 1,
            SampleType::Int16 => 2,
            SampleType::Float32 => 4,
        }
    }

    /// Converts little-endian sample bytes to normalized `f32` samples.
    /// Trailing bytes that do not form a whole sample are ignored.
    pub fn to_f32(self, bytes: &[u8]) -> Vec<f32> {
        match self {
            SampleType::UInt8 => bytes.iter().map(|b| (*b as f32 - 128.0) / 128.0).collect(),
            SampleType::Int16 => bytes
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
                .collect(),
            SampleType::Float32 => bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            SampleType::Mulaw => bytes
                .iter()
                .map(|b| mulaw_to_i16(*b) as f32 / 32768.0)
                .collect(),
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleType {
    type Err = AlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SampleType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| AlError::validation("sample type", s))
    }
}

/// G.711 mu-law expansion.
fn mulaw_to_i16(byte: u8) -> i16 {
    let u = !byte;
    let sign = u & 0x80;
    let exponent = (u >> 4) & 0x07;
    let mantissa = u & 0x0F;
    let magnitude = ((((mantissa as i32) << 3) + 0x84) << exponent) - 0x84;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Total size in bytes of `frames` frames.
pub(crate) fn frames_to_bytes(frames: u64, config: ChannelConfig, ty: SampleType) -> u64 {
    frames * config.channels() as u64 * ty.bytes_per_sample() as u64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_channel_config_names_parse_back() {
        for config in ChannelConfig::ALL {
            assert_eq!(config.name().parse::<ChannelConfig>().unwrap(), config);
        }
        assert!(matches!(
            "Shu".parse::<ChannelConfig>(),
            Err(AlError::Validation { .. })
        ));
    }

    #[test]
    fn test_sample_type_names_parse_back() {
        for ty in SampleType::ALL {
            assert_eq!(ty.to_string().parse::<SampleType>().unwrap(), ty);
        }
        assert!("Type".parse::<SampleType>().is_err());
    }

    #[test]
    fn test_sample_conversion() {
        assert_eq!(SampleType::UInt8.to_f32(&[128, 0]), vec![0.0, -1.0]);
        let bytes = [0x00, 0x40, 0x00, 0xC0];
        assert_eq!(SampleType::Int16.to_f32(&bytes), vec![0.5, -0.5]);
        let bytes = 0.25f32.to_le_bytes();
        assert_eq!(SampleType::Float32.to_f32(&bytes), vec![0.25]);
    }

    #[test]
    fn test_mulaw_expansion_extremes() {
        assert_eq!(mulaw_to_i16(0xFF), 0);
        assert_eq!(mulaw_to_i16(0x7F), 0);
        assert_eq!(mulaw_to_i16(0x80), 32124);
        assert_eq!(mulaw_to_i16(0x00), -32124);
    }

    #[test]
    fn test_frames_to_bytes() {
        assert_eq!(frames_to_bytes(10, ChannelConfig::Stereo, SampleType::Int16), 40);
        assert_eq!(frames_to_bytes(3, ChannelConfig::X51, SampleType::Float32), 72);
    }
}
