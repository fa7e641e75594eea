use std::collections::BTreeMap;

use crate::*;

const REVERB_PARAMS: std::ops::RangeInclusive<ALenum> =
    AL_EAXREVERB_DENSITY..=AL_EAXREVERB_DECAY_HFLIMIT;
const CHORUS_PARAMS: std::ops::RangeInclusive<ALenum> = AL_CHORUS_WAVEFORM..=AL_CHORUS_DELAY;

/// Parameters stored for one effect object. Vector parameters use all three
/// lanes, scalar ones only the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EffectState {
    pub kind: ALenum,
    pub params: BTreeMap<ALenum, [f32; 3]>,
}

impl EffectState {
    pub fn set_kind(&mut self, kind: ALenum) -> Result<(), ALenum> {
        match kind {
            AL_EFFECT_NULL | AL_EFFECT_EAXREVERB | AL_EFFECT_CHORUS => {
                if kind != self.kind {
                    self.params.clear();
                }
                self.kind = kind;
                Ok(())
            }
            _ => Err(AL_INVALID_ENUM),
        }
    }

    pub fn set(&mut self, param: ALenum, value: [f32; 3]) -> Result<(), ALenum> {
        let known = match self.kind {
            AL_EFFECT_EAXREVERB => REVERB_PARAMS.contains(&param),
            AL_EFFECT_CHORUS => CHORUS_PARAMS.contains(&param),
            _ => false,
        };
        if !known {
            return Err(AL_INVALID_ENUM);
        }
        if value.iter().any(|v| v.is_nan()) {
            return Err(AL_INVALID_VALUE);
        }
        self.params.insert(param, value);
        Ok(())
    }

    pub fn get(&self, param: ALenum) -> Result<[f32; 3], ALenum> {
        self.params.get(&param).copied().ok_or(AL_INVALID_ENUM)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SlotState {
    pub effect: EffectState,
    pub gain: f32,
    pub send_auto: bool,
}

impl Default for SlotState {
    fn default() -> Self {
        Self {
            effect: EffectState::default(),
            gain: 1.0,
            send_auto: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_effect_params_follow_kind() {
        let mut fx = EffectState::default();
        assert_eq!(
            fx.set(AL_EAXREVERB_DENSITY, [1.0, 0.0, 0.0]),
            Err(AL_INVALID_ENUM)
        );
        fx.set_kind(AL_EFFECT_EAXREVERB).unwrap();
        fx.set(AL_EAXREVERB_DENSITY, [0.5, 0.0, 0.0]).unwrap();
        assert_eq!(fx.get(AL_EAXREVERB_DENSITY).unwrap()[0], 0.5);

        fx.set_kind(AL_EFFECT_CHORUS).unwrap();
        assert!(fx.params.is_empty());
        assert!(fx.set(AL_CHORUS_DELAY, [0.01, 0.0, 0.0]).is_ok());
        assert_eq!(fx.set_kind(0x7777), Err(AL_INVALID_ENUM));
    }
}
