//! DSP au niveau échantillon utilisé par le graphe de filtres : gain,
//! conversion de format d'échantillon, remix de canaux et rééchantillonnage.
//!
//! Plutôt que des noyaux spécifiques à chaque profondeur de bits, ceux-ci
//! opèrent génériquement sur [`crate::sample_types::Sample`], pour qu'un seul
//! chemin de code couvre tous les [`crate::format::SampleFormat`] pris en
//! charge par le cœur de playlist.

pub mod convert;
pub mod gain;
pub mod resample;

pub use convert::{convert_sample_format, remix_channels};
pub use gain::apply_gain_planar;
pub use resample::Resampler;
