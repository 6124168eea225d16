//! Conversion de fréquence d'échantillonnage pour le nœud de conversion de
//! format du graphe de filtres.
//!
//! S'inspire de `resampling.rs`, qui code en dur une unique instance
//! `Soxr<Stereo<f32>>`. Les sinks réels de ce crate ne sont pas toujours
//! stéréo, donc le cas à 2 canaux garde le chemin `Stereo<f32>` (soxr
//! rééchantillonne des paires de canaux entrelacés plus efficacement
//! ensemble que séparément) et tout autre nombre de canaux fait tourner un
//! resampler `Mono<f32>` par canal à la place.

use soxr::format::{Mono, Stereo};
use soxr::params::{QualityRecipe, QualitySpec, RuntimeSpec};
use soxr::Soxr;

use crate::error::PlaylistError;

enum Inner {
    Stereo(Soxr<Stereo<f32>>),
    PerChannel(Vec<Soxr<Mono<f32>>>),
}

pub struct Resampler {
    source_hz: f64,
    dest_hz: f64,
    channels: usize,
    inner: Inner,
}

impl Resampler {
    pub fn new(source_hz: u32, dest_hz: u32, channels: u16) -> Result<Self, PlaylistError> {
        let channels = channels as usize;
        let quality = QualitySpec::new(QualityRecipe::high());

        let inner = if channels == 2 {
            let soxr = Soxr::<Stereo<f32>>::new_with_params(
                source_hz as f64,
                dest_hz as f64,
                quality,
                RuntimeSpec::default(),
            )
            .map_err(|e| PlaylistError::FilterBuildFailed(e.to_string()))?;
            Inner::Stereo(soxr)
        } else {
            let mut per_channel = Vec::with_capacity(channels);
            for _ in 0..channels {
                let soxr = Soxr::<Mono<f32>>::new_with_params(
                    source_hz as f64,
                    dest_hz as f64,
                    quality,
                    RuntimeSpec::default(),
                )
                .map_err(|e| PlaylistError::FilterBuildFailed(e.to_string()))?;
                per_channel.push(soxr);
            }
            Inner::PerChannel(per_channel)
        };

        Ok(Resampler {
            source_hz: source_hz as f64,
            dest_hz: dest_hz as f64,
            channels,
            inner,
        })
    }

    fn output_len(&self, input_frames: usize) -> usize {
        ((input_frames as f64) * self.dest_hz / self.source_hz).ceil() as usize
    }

    /// Rééchantillonne des données de canaux planaires `f32`. `planes.len()`
    /// doit correspondre au nombre de canaux pour lequel ce resampler a été
    /// construit.
    pub fn process(&mut self, planes: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, PlaylistError> {
        assert_eq!(planes.len(), self.channels, "channel count mismatch");
        let frame_count = planes.first().map(|p| p.len()).unwrap_or(0);
        let out_len = self.output_len(frame_count);

        match &mut self.inner {
            Inner::Stereo(soxr) => {
                let mut input = vec![[0.0f32; 2]; frame_count];
                for (i, frame) in input.iter_mut().enumerate() {
                    frame[0] = planes[0][i];
                    frame[1] = planes[1][i];
                }
                let mut output = vec![[0.0f32; 2]; out_len];
                soxr.process(&input, &mut output)
                    .map_err(|e| PlaylistError::FilterBuildFailed(e.to_string()))?;
                let mut left = Vec::with_capacity(output.len());
                let mut right = Vec::with_capacity(output.len());
                for frame in &output {
                    left.push(frame[0]);
                    right.push(frame[1]);
                }
                Ok(vec![left, right])
            }
            Inner::PerChannel(resamplers) => {
                let mut outputs = Vec::with_capacity(self.channels);
                for (channel, soxr) in resamplers.iter_mut().enumerate() {
                    let input: Vec<[f32; 1]> = planes[channel].iter().map(|&s| [s]).collect();
                    let mut output = vec![[0.0f32; 1]; out_len];
                    soxr.process(&input, &mut output)
                        .map_err(|e| PlaylistError::FilterBuildFailed(e.to_string()))?;
                    outputs.push(output.into_iter().map(|f| f[0]).collect());
                }
                Ok(outputs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_resampler_produces_expected_frame_count() {
        let mut r = Resampler::new(48_000, 44_100, 2).unwrap();
        let left = vec![0.0f32; 4_800];
        let right = vec![0.0f32; 4_800];
        let out = r.process(&[left, right]).unwrap();
        assert_eq!(out.len(), 2);
        let expected = ((4_800.0f64) * 44_100.0 / 48_000.0).ceil() as usize;
        assert!((out[0].len() as i64 - expected as i64).abs() <= 2);
    }

    #[test]
    fn mono_resampler_path_used_for_non_stereo_channel_counts() {
        let mut r = Resampler::new(44_100, 48_000, 1).unwrap();
        let out = r.process(&[vec![0.0f32; 441]]).unwrap();
        assert_eq!(out.len(), 1);
    }
}
