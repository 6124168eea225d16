//! Nœud de gain : met à l'échelle chaque échantillon par un facteur linéaire
//! dans `[0.0, 1.0]`.
//!
//! Généralise les noyaux `apply_gain_stereo_i16`/`i24`/`i32` écrits à la main
//! par profondeur de bits (chacun pour exactement deux canaux entrelacés) en
//! une seule fonction qui fonctionne sur autant de canaux planaires que
//! [`Buffer`](crate::buffer::Buffer) en porte, en dispatchant sur
//! [`SampleFormat`] plutôt qu'en dupliquant le code par type.

use bytemuck::{cast_slice_mut, Pod};

use crate::format::SampleFormat;
use crate::sample_types::Sample;

/// Met à l'échelle chaque échantillon de chaque plan de canal par
/// `linear_gain`, en place. Un gain de `1.0` exactement ne fait rien (comme
/// le graphe de filtres, qui omet alors le nœud de gain entièrement).
pub fn apply_gain_planar(planes: &mut [Vec<u8>], sample_fmt: SampleFormat, linear_gain: f64) {
    if (linear_gain - 1.0).abs() < f64::EPSILON {
        return;
    }
    for plane in planes.iter_mut() {
        match sample_fmt {
            SampleFormat::U8 | SampleFormat::U8Planar => apply_gain_typed::<u8>(plane, linear_gain),
            SampleFormat::S16 | SampleFormat::S16Planar => apply_gain_typed::<i16>(plane, linear_gain),
            SampleFormat::S32 | SampleFormat::S32Planar => apply_gain_typed::<i32>(plane, linear_gain),
            SampleFormat::Flt | SampleFormat::FltPlanar => apply_gain_typed::<f32>(plane, linear_gain),
            SampleFormat::Dbl | SampleFormat::DblPlanar => apply_gain_typed::<f64>(plane, linear_gain),
        }
    }
}

fn apply_gain_typed<S: Sample + Pod>(bytes: &mut [u8], gain: f64) {
    let samples: &mut [S] = cast_slice_mut(bytes);
    for s in samples.iter_mut() {
        *s = S::from_f64((s.to_f64() * gain).clamp(-1.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_gain_is_a_no_op() {
        let mut planes = vec![16_000i16.to_le_bytes().to_vec()];
        let before = planes.clone();
        apply_gain_planar(&mut planes, SampleFormat::S16Planar, 1.0);
        assert_eq!(planes, before);
    }

    #[test]
    fn half_gain_halves_sample_magnitude() {
        let mut planes = vec![16_000i16.to_le_bytes().to_vec()];
        apply_gain_planar(&mut planes, SampleFormat::S16Planar, 0.5);
        let sample = i16::from_le_bytes(planes[0].clone().try_into().unwrap());
        assert!((sample as i32 - 8_000).abs() <= 1);
    }

    #[test]
    fn gain_clamps_rather_than_overflows() {
        let mut planes = vec![1.0f32.to_le_bytes().to_vec()];
        apply_gain_planar(&mut planes, SampleFormat::FltPlanar, 2.0);
        let sample = f32::from_le_bytes(planes[0].clone().try_into().unwrap());
        assert!(sample <= 1.0);
    }
}
