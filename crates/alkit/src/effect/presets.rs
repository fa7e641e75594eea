//! Named EFX reverb presets.
use crate::{audio::math::vec3::Vec3, effect::ReverbProperties, AlError, AlResult};

// density, diffusion, gain, gain_hf, gain_lf, decay_time, decay_hf_ratio,
// decay_lf_ratio, reflections_gain, reflections_delay, late_reverb_gain,
// late_reverb_delay, echo_time, echo_depth, modulation_time,
// modulation_depth, air_absorption_gain_hf, hf_reference, lf_reference,
// room_rolloff_factor, decay_hf_limit. Pans are zero for every preset.
type Row = [f32; 21];

static REVERB_PRESETS: &[(&str, Row)] = &[
    ("GENERIC", [1.0, 1.0, 0.3162, 0.8913, 1.0, 1.49, 0.83, 1.0, 0.05, 0.007, 1.2589, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("PADDEDCELL", [0.1715, 1.0, 0.3162, 0.001, 1.0, 0.17, 0.1, 1.0, 0.25, 0.001, 1.2691, 0.002, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("ROOM", [0.4287, 1.0, 0.3162, 0.5929, 1.0, 0.4, 0.83, 1.0, 0.1503, 0.002, 1.0629, 0.003, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("BATHROOM", [0.1715, 1.0, 0.3162, 0.2512, 1.0, 1.49, 0.54, 1.0, 0.6531, 0.007, 3.2734, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("LIVINGROOM", [0.9766, 1.0, 0.3162, 0.001, 1.0, 0.5, 0.1, 1.0, 0.2051, 0.003, 0.2805, 0.004, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("STONEROOM", [1.0, 1.0, 0.3162, 0.7079, 1.0, 2.31, 0.64, 1.0, 0.4411, 0.012, 1.1003, 0.017, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("AUDITORIUM", [1.0, 1.0, 0.3162, 0.5781, 1.0, 4.32, 0.59, 1.0, 0.4032, 0.02, 0.717, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("CONCERTHALL", [1.0, 1.0, 0.3162, 0.5623, 1.0, 3.92, 0.7, 1.0, 0.2427, 0.02, 0.9977, 0.029, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("CAVE", [1.0, 1.0, 0.3162, 1.0, 1.0, 2.91, 1.3, 1.0, 0.5, 0.015, 0.7063, 0.022, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 0.0]),
    ("ARENA", [1.0, 1.0, 0.3162, 0.4477, 1.0, 7.24, 0.33, 1.0, 0.2612, 0.02, 1.0186, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("HANGAR", [1.0, 1.0, 0.3162, 0.3162, 1.0, 10.05, 0.23, 1.0, 0.5, 0.02, 1.256, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("CARPETEDHALLWAY", [0.4287, 1.0, 0.3162, 0.01, 1.0, 0.3, 0.1, 1.0, 0.1215, 0.002, 0.1531, 0.03, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("HALLWAY", [0.3645, 1.0, 0.3162, 0.7079, 1.0, 1.49, 0.59, 1.0, 0.2458, 0.007, 1.6615, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("STONECORRIDOR", [1.0, 1.0, 0.3162, 0.7612, 1.0, 2.7, 0.79, 1.0, 0.2472, 0.013, 1.5758, 0.02, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("ALLEY", [1.0, 0.3, 0.3162, 0.7328, 1.0, 1.49, 0.86, 1.0, 0.25, 0.007, 0.9954, 0.011, 0.125, 0.95, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("FOREST", [1.0, 0.3, 0.3162, 0.0224, 1.0, 1.49, 0.54, 1.0, 0.0525, 0.162, 0.7682, 0.088, 0.125, 1.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("CITY", [1.0, 0.5, 0.3162, 0.3981, 1.0, 1.49, 0.67, 1.0, 0.073, 0.007, 0.1427, 0.011, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("MOUNTAINS", [1.0, 0.27, 0.3162, 0.0562, 1.0, 1.49, 0.21, 1.0, 0.0407, 0.3, 0.1919, 0.1, 0.25, 1.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 0.0]),
    ("QUARRY", [1.0, 1.0, 0.3162, 0.3162, 1.0, 1.49, 0.83, 1.0, 0.0, 0.061, 1.7783, 0.025, 0.125, 0.7, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("PLAIN", [1.0, 0.21, 0.3162, 0.1, 1.0, 1.49, 0.5, 1.0, 0.0585, 0.179, 0.1089, 0.1, 0.25, 1.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("PARKINGLOT", [1.0, 1.0, 0.3162, 1.0, 1.0, 1.65, 1.5, 1.0, 0.2082, 0.008, 0.2652, 0.012, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 0.0]),
    ("SEWERPIPE", [0.3071, 0.8, 0.3162, 0.3162, 1.0, 2.81, 0.14, 1.0, 1.6387, 0.014, 3.2471, 0.021, 0.25, 0.0, 0.25, 0.0, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("UNDERWATER", [0.3645, 1.0, 0.3162, 0.01, 1.0, 1.49, 0.1, 1.0, 0.5963, 0.007, 7.0795, 0.011, 0.25, 0.0, 1.18, 0.348, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("DRUGGED", [0.4287, 0.5, 0.3162, 1.0, 1.0, 8.39, 1.39, 1.0, 0.876, 0.002, 3.1081, 0.03, 0.25, 0.0, 0.25, 1.0, 0.9943, 5000.0, 250.0, 0.0, 0.0]),
    ("DIZZY", [0.3645, 0.6, 0.3162, 0.631, 1.0, 17.23, 0.56, 1.0, 0.1392, 0.02, 0.4937, 0.03, 0.25, 1.0, 0.81, 0.31, 0.9943, 5000.0, 250.0, 0.0, 0.0]),
    ("PSYCHOTIC", [0.0625, 0.5, 0.3162, 0.8404, 1.0, 7.56, 0.91, 1.0, 0.4864, 0.02, 2.4378, 0.03, 0.25, 0.0, 4.0, 1.0, 0.9943, 5000.0, 250.0, 0.0, 0.0]),
    ("DUSTYROOM", [0.3645, 0.56, 0.3162, 0.7943, 0.7079, 1.79, 0.38, 0.21, 0.5012, 0.002, 1.2589, 0.006, 0.202, 0.05, 0.25, 0.0, 0.9886, 13046.0, 163.3, 0.0, 1.0]),
    ("CHAPEL", [1.0, 0.84, 0.3162, 0.5623, 1.0, 4.62, 0.64, 1.23, 0.4467, 0.032, 0.7943, 0.049, 0.25, 0.0, 0.25, 0.11, 0.9943, 5000.0, 250.0, 0.0, 1.0]),
    ("SMALLWATERROOM", [1.0, 0.7, 0.3162, 0.4477, 1.0, 1.51, 1.25, 1.14, 0.8913, 0.02, 1.4125, 0.03, 0.179, 0.15, 0.895, 0.19, 0.992, 5000.0, 250.0, 0.0, 0.0]),
];

fn from_row(r: &Row) -> ReverbProperties {
    ReverbProperties {
        density: r[0],
        diffusion: r[1],
        gain: r[2],
        gain_hf: r[3],
        gain_lf: r[4],
        decay_time: r[5],
        decay_hf_ratio: r[6],
        decay_lf_ratio: r[7],
        reflections_gain: r[8],
        reflections_delay: r[9],
        reflections_pan: Vec3::ZERO,
        late_reverb_gain: r[10],
        late_reverb_delay: r[11],
        late_reverb_pan: Vec3::ZERO,
        echo_time: r[12],
        echo_depth: r[13],
        modulation_time: r[14],
        modulation_depth: r[15],
        air_absorption_gain_hf: r[16],
        hf_reference: r[17],
        lf_reference: r[18],
        room_rolloff_factor: r[19],
        decay_hf_limit: r[20] != 0.0,
    }
}

/// Names accepted by [`reverb`], in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
    REVERB_PRESETS.iter().map(|(name, _)| *name)
}

/// The reverb preset called `name` (exact, upper-case match).
pub fn reverb(name: &str) -> AlResult<ReverbProperties> {
    REVERB_PRESETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, row)| from_row(row))
        .ok_or_else(|| AlError::validation("reverb preset", name))
}
