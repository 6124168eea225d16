//! Conversion de format d'échantillon et remix de canaux pour le nœud de
//! conversion de format par groupe du graphe de filtres.
//!
//! S'inspire du motif normaliser-en-f32/dénormaliser d'`int_float.rs`,
//! généralisé depuis ses points d'entrée fixes i32-stéréo-seulement vers
//! n'importe quelle paire de [`SampleFormat`] et n'importe quel nombre de
//! canaux, via [`Sample::to_f64`]/[`Sample::from_f64`] comme représentation
//! intermédiaire commune.

use bytemuck::{cast_slice, Pod};

use crate::format::SampleFormat;
use crate::sample_types::Sample;

/// Convertit chaque plan de canal de `from_fmt` vers `to_fmt`. Ne fait rien
/// (clone) quand les formats correspondent déjà.
pub fn convert_sample_format(
    planes: &[Vec<u8>],
    from_fmt: SampleFormat,
    to_fmt: SampleFormat,
) -> Vec<Vec<u8>> {
    if from_fmt == to_fmt {
        return planes.to_vec();
    }
    planes
        .iter()
        .map(|plane| write_normalized(&read_normalized(plane, from_fmt), to_fmt))
        .collect()
}

fn read_normalized(bytes: &[u8], fmt: SampleFormat) -> Vec<f64> {
    fn read_typed<S: Sample + Pod>(bytes: &[u8]) -> Vec<f64> {
        cast_slice::<u8, S>(bytes).iter().map(|s| s.to_f64()).collect()
    }
    match fmt {
        SampleFormat::U8 | SampleFormat::U8Planar => read_typed::<u8>(bytes),
        SampleFormat::S16 | SampleFormat::S16Planar => read_typed::<i16>(bytes),
        SampleFormat::S32 | SampleFormat::S32Planar => read_typed::<i32>(bytes),
        SampleFormat::Flt | SampleFormat::FltPlanar => read_typed::<f32>(bytes),
        SampleFormat::Dbl | SampleFormat::DblPlanar => read_typed::<f64>(bytes),
    }
}

fn write_normalized(samples: &[f64], fmt: SampleFormat) -> Vec<u8> {
    fn write_typed<S: Sample + Pod>(samples: &[f64]) -> Vec<u8> {
        let typed: Vec<S> = samples.iter().map(|&v| S::from_f64(v)).collect();
        bytemuck::cast_slice(&typed).to_vec()
    }
    match fmt {
        SampleFormat::U8 | SampleFormat::U8Planar => write_typed::<u8>(samples),
        SampleFormat::S16 | SampleFormat::S16Planar => write_typed::<i16>(samples),
        SampleFormat::S32 | SampleFormat::S32Planar => write_typed::<i32>(samples),
        SampleFormat::Flt | SampleFormat::FltPlanar => write_typed::<f32>(samples),
        SampleFormat::Dbl | SampleFormat::DblPlanar => write_typed::<f64>(samples),
    }
}

/// Remixe des données de canaux planaires de `from_channels` vers `to_channels`.
///
/// C'est un remix positionnel simple, pas une matrice de mixage complète :
/// mono→stéréo duplique le canal unique, stéréo→mono moyenne les deux canaux
/// (via le domaine `f64` normalisé), et tout autre changement de nombre de
/// canaux garde les `min(from, to)` premiers canaux et comble le reste de
/// silence. Suffisant pour les formats de sink ciblés par le graphe de
/// filtres de ce crate ; une matrice de downmix complète est hors de portée.
pub fn remix_channels(
    planes: &[Vec<u8>],
    sample_fmt: SampleFormat,
    to_channels: usize,
) -> Vec<Vec<u8>> {
    let from_channels = planes.len();
    if from_channels == to_channels {
        return planes.to_vec();
    }
    if from_channels == 1 && to_channels == 2 {
        return vec![planes[0].clone(), planes[0].clone()];
    }
    if from_channels == 2 && to_channels == 1 {
        let left = read_normalized(&planes[0], sample_fmt);
        let right = read_normalized(&planes[1], sample_fmt);
        let mixed: Vec<f64> = left.iter().zip(&right).map(|(l, r)| (l + r) * 0.5).collect();
        return vec![write_normalized(&mixed, sample_fmt)];
    }
    let mut out: Vec<Vec<u8>> = planes.iter().take(to_channels).cloned().collect();
    let silent_len = planes.first().map(|p| p.len()).unwrap_or(0);
    while out.len() < to_channels {
        out.push(vec![0u8; silent_len]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_formats_round_trip_unchanged() {
        let planes = vec![vec![1u8, 2, 3, 4]];
        let out = convert_sample_format(&planes, SampleFormat::S16Planar, SampleFormat::S16Planar);
        assert_eq!(out, planes);
    }

    #[test]
    fn s16_to_f32_preserves_sign_and_magnitude_order() {
        let low = 1_000i16.to_le_bytes().to_vec();
        let high = 20_000i16.to_le_bytes().to_vec();
        let low_f = convert_sample_format(&[low], SampleFormat::S16Planar, SampleFormat::FltPlanar);
        let high_f = convert_sample_format(&[high], SampleFormat::S16Planar, SampleFormat::FltPlanar);
        let low_val = f32::from_le_bytes(low_f[0].clone().try_into().unwrap());
        let high_val = f32::from_le_bytes(high_f[0].clone().try_into().unwrap());
        assert!(low_val > 0.0 && high_val > low_val);
    }

    #[test]
    fn mono_to_stereo_duplicates_channel() {
        let planes = vec![vec![1u8, 2, 3, 4]];
        let out = remix_channels(&planes, SampleFormat::S16Planar, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], out[1]);
    }

    #[test]
    fn stereo_to_mono_averages_channels() {
        let left = 10_000i16.to_le_bytes().to_vec();
        let right = 20_000i16.to_le_bytes().to_vec();
        let out = remix_channels(&[left, right], SampleFormat::S16Planar, 1);
        assert_eq!(out.len(), 1);
        let mixed = i16::from_le_bytes(out[0].clone().try_into().unwrap());
        assert!((mixed as i32 - 15_000).abs() <= 2);
    }
}
