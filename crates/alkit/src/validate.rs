//! Range checks applied to every property write before it reaches the engine.
//!
//! Each check returns [`AlError::Validation`] naming the field and the
//! rejected value. NaN is outside every domain.

use crate::{audio::math::vec3::Vec3, sys, AlError, AlResult};

#[inline]
pub fn non_negative(field: &'static str, value: f32) -> AlResult<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(AlError::validation(field, value))
    }
}

#[inline]
pub fn positive(field: &'static str, value: f32) -> AlResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(AlError::validation(field, value))
    }
}

/// `min <= value <= max`.
#[inline]
pub fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> AlResult<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(AlError::validation(field, value))
    }
}

/// Both components within `[min, max]`, in any order.
pub fn pair_in_range(field: &'static str, pair: (f32, f32), min: f32, max: f32) -> AlResult<()> {
    in_range(field, pair.0, min, max)
        .and_then(|_| in_range(field, pair.1, min, max))
        .map_err(|_| AlError::validation(field, pair))
}

/// `low <= high`, both within `[min, max]`.
pub fn ordered_pair(field: &'static str, pair: (f32, f32), min: f32, max: f32) -> AlResult<()> {
    pair_in_range(field, pair, min, max)?;
    if pair.0 <= pair.1 {
        Ok(())
    } else {
        Err(AlError::validation(field, pair))
    }
}

pub fn pair_non_negative(field: &'static str, pair: (f32, f32)) -> AlResult<()> {
    if pair.0 >= 0.0 && pair.1 >= 0.0 {
        Ok(())
    } else {
        Err(AlError::validation(field, pair))
    }
}

/// `0 <= low <= high < inf`. `f32::MAX` is accepted as "unbounded".
pub fn distance_range(field: &'static str, pair: (f32, f32)) -> AlResult<()> {
    if pair.0 >= 0.0 && pair.0 <= pair.1 && pair.1.is_finite() {
        Ok(())
    } else {
        Err(AlError::validation(field, pair))
    }
}

/// Any finite or infinite pair; only NaN is rejected.
pub fn pair_not_nan(field: &'static str, pair: (f32, f32)) -> AlResult<()> {
    if pair.0.is_nan() || pair.1.is_nan() {
        Err(AlError::validation(field, pair))
    } else {
        Ok(())
    }
}

/// Index into the engine's resampler list.
pub fn resampler_index(index: usize) -> AlResult<()> {
    if index < sys::RESAMPLERS.len() {
        Ok(())
    } else {
        Err(AlError::validation("resampler index", index))
    }
}

/// Rejects vectors with a NaN component.
pub fn vector(field: &'static str, value: Vec3) -> AlResult<()> {
    if value.is_nan() {
        Err(AlError::validation(field, value))
    } else {
        Ok(())
    }
}

/// Each of the three filter gains within `[0, 1]`.
pub fn filter_gains(field: &'static str, gains: [f32; 3]) -> AlResult<()> {
    if gains.iter().all(|g| (0.0..=1.0).contains(g)) {
        Ok(())
    } else {
        Err(AlError::validation(field, gains))
    }
}

/// Direct-path filter gains: each `>= 0`. Gains above one boost.
pub fn direct_filter_gains(field: &'static str, gains: [f32; 3]) -> AlResult<()> {
    if gains.iter().all(|g| *g >= 0.0) {
        Ok(())
    } else {
        Err(AlError::validation(field, gains))
    }
}

/// `index < len`.
#[inline]
pub fn index(index: usize, len: usize) -> AlResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(AlError::Index { index, len })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries_are_inclusive() {
        assert!(non_negative("gain", 0.0).is_ok());
        assert!(non_negative("gain", f32::INFINITY).is_ok());
        assert!(positive("pitch", 0.0).is_err());
        assert!(in_range("air absorption factor", 10.0, 0.0, 10.0).is_ok());
        assert!(in_range("air absorption factor", 10.000_1, 0.0, 10.0).is_err());
        assert!(ordered_pair("gain range", (0.0, 1.0), 0.0, 1.0).is_ok());
        assert!(ordered_pair("gain range", (0.5, 0.5), 0.0, 1.0).is_ok());
    }

    #[test]
    fn test_pairs() {
        assert!(ordered_pair("gain range", (9.0 / 11.0, 5.0 / 7.0), 0.0, 1.0).is_err());
        assert!(ordered_pair("gain range", (6.0 / 9.0, 420.0), 0.0, 1.0).is_err());
        assert!(pair_in_range("cone angles", (4.2, 69.0), 0.0, 360.0).is_ok());
        assert!(pair_in_range("cone angles", (69.0, 4.2), 0.0, 360.0).is_ok());
        assert!(pair_in_range("cone angles", (420.0, 69.0), 0.0, 360.0).is_err());
        assert!(pair_non_negative("rolloff factors", (6.0, -9.0)).is_err());
    }

    #[test]
    fn test_distance_range() {
        assert!(distance_range("distance range", (1.0, f32::MAX)).is_ok());
        assert!(distance_range("distance range", (420.0, f32::INFINITY)).is_err());
        assert!(distance_range("distance range", (-420.0, 0.5)).is_err());
        assert!(distance_range("distance range", (0.9, 0.7)).is_err());
    }

    #[test]
    fn test_index_error_carries_len() {
        assert_eq!(index(4, 4), Err(AlError::Index { index: 4, len: 4 }));
        assert!(index(3, 4).is_ok());
    }

    #[test]
    fn test_nan_is_rejected_everywhere() {
        assert!(non_negative("gain", f32::NAN).is_err());
        assert!(positive("pitch", f32::NAN).is_err());
        assert!(in_range("doppler factor", f32::NAN, 0.0, 1.0).is_err());
        assert!(vector("position", Vec3::new(0.0, f32::NAN, 0.0)).is_err());
        assert!(filter_gains("filter", [1.0, f32::NAN, 0.0]).is_err());
        assert!(direct_filter_gains("direct filter", [f32::NAN, 1.0, 1.0]).is_err());
    }

    proptest! {
        #[test]
        fn prop_in_range_matches_interval(v in -100.0f32..100.0, lo in -50.0f32..0.0, hi in 0.0f32..50.0) {
            prop_assert_eq!(in_range("value", v, lo, hi).is_ok(), v >= lo && v <= hi);
        }

        #[test]
        fn prop_ordered_pair_requires_order(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            prop_assert_eq!(ordered_pair("gain range", (a, b), 0.0, 1.0).is_ok(), a <= b);
        }

        #[test]
        fn prop_filter_gains_unit_interval(g in proptest::array::uniform3(-1.0f32..2.0)) {
            let expected = g.iter().all(|x| (0.0..=1.0).contains(x));
            prop_assert_eq!(filter_gains("filter", g).is_ok(), expected);
        }

        #[test]
        fn prop_direct_filter_gains_non_negative(g in proptest::array::uniform3(-1.0f32..10.0)) {
            let expected = g.iter().all(|x| *x >= 0.0);
            prop_assert_eq!(direct_filter_gains("direct filter", g).is_ok(), expected);
        }
    }
}
