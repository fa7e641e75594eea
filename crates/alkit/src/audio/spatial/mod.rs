//! Distance attenuation models and spatialization mode.
use std::str::FromStr;

use crate::{sys, AlError, AlStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceModel {
    #[default]
    InverseClamped,
    LinearClamped,
    ExponentClamped,
    Inverse,
    Linear,
    Exponent,
    None,
}

impl DistanceModel {
    pub const ALL: [DistanceModel; 7] = [
        DistanceModel::InverseClamped,
        DistanceModel::LinearClamped,
        DistanceModel::ExponentClamped,
        DistanceModel::Inverse,
        DistanceModel::Linear,
        DistanceModel::Exponent,
        DistanceModel::None,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            DistanceModel::InverseClamped => "inverse clamped",
            DistanceModel::LinearClamped => "linear clamped",
            DistanceModel::ExponentClamped => "exponent clamped",
            DistanceModel::Inverse => "inverse",
            DistanceModel::Linear => "linear",
            DistanceModel::Exponent => "exponent",
            DistanceModel::None => "none",
        }
    }
}

impl FromStr for DistanceModel {
    type Err = AlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistanceModel::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| AlError::validation("distance model", s))
    }
}

impl From<DistanceModel> for sys::ALenum {
    fn from(v: DistanceModel) -> Self {
        match v {
            DistanceModel::InverseClamped => sys::AL_INVERSE_DISTANCE_CLAMPED,
            DistanceModel::LinearClamped => sys::AL_LINEAR_DISTANCE_CLAMPED,
            DistanceModel::ExponentClamped => sys::AL_EXPONENT_DISTANCE_CLAMPED,
            DistanceModel::Inverse => sys::AL_INVERSE_DISTANCE,
            DistanceModel::Linear => sys::AL_LINEAR_DISTANCE,
            DistanceModel::Exponent => sys::AL_EXPONENT_DISTANCE,
            DistanceModel::None => sys::AL_NONE,
        }
    }
}

impl TryFrom<sys::ALenum> for DistanceModel {
    type Error = AlError;

    fn try_from(v: sys::ALenum) -> Result<Self, Self::Error> {
        DistanceModel::ALL
            .into_iter()
            .find(|m| sys::ALenum::from(*m) == v)
            .ok_or(AlError::Engine(AlStatus(sys::AL_INVALID_ENUM)))
    }
}

/// Whether a source is rendered in 3-D.
///
/// `Auto` spatializes mono sources only, which is the engine default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Spatialize {
    #[default]
    Auto,
    On,
    Off,
}

impl From<Spatialize> for sys::ALenum {
    fn from(v: Spatialize) -> Self {
        match v {
            Spatialize::Auto => sys::AL_AUTO_SOFT,
            Spatialize::On => sys::AL_TRUE,
            Spatialize::Off => sys::AL_FALSE,
        }
    }
}

impl TryFrom<sys::ALenum> for Spatialize {
    type Error = AlError;

    fn try_from(v: sys::ALenum) -> Result<Self, Self::Error> {
        match v {
            sys::AL_AUTO_SOFT => Ok(Spatialize::Auto),
            sys::AL_TRUE => Ok(Spatialize::On),
            sys::AL_FALSE => Ok(Spatialize::Off),
            _ => Err(AlError::Engine(AlStatus(sys::AL_INVALID_ENUM))),
        }
    }
}

impl From<Option<bool>> for Spatialize {
    fn from(v: Option<bool>) -> Self {
        match v {
            None => Spatialize::Auto,
            Some(true) => Spatialize::On,
            Some(false) => Spatialize::Off,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_distance_model_roundtrip() {
        for model in DistanceModel::ALL {
            let raw: sys::ALenum = model.into();
            assert_eq!(DistanceModel::try_from(raw).unwrap(), model);
            assert_eq!(model.name().parse::<DistanceModel>().unwrap(), model);
        }
        assert!("EYYYYLMAO".parse::<DistanceModel>().is_err());
    }

    #[test]
    fn test_spatialize_roundtrip() {
        for mode in [Spatialize::Auto, Spatialize::On, Spatialize::Off] {
            let raw: sys::ALenum = mode.into();
            assert_eq!(Spatialize::try_from(raw).unwrap(), mode);
        }
        assert_eq!(Spatialize::from(None), Spatialize::Auto);
        assert_eq!(Spatialize::from(Some(false)), Spatialize::Off);
    }
}
