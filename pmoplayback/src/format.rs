//! Description du format audio, partagée par les sources d'entrée, les sinks
//! et le graphe de filtres.
//!
//! Un [`AudioFormat`] est un descripteur simple, comparable champ par champ :
//! deux formats sont égaux ssi tous leurs champs correspondent. C'est ce qui
//! permet à la table des sinks (voir [`crate::sink_map`]) de décider si deux
//! sinks peuvent partager une même branche de sortie du graphe de filtres.

use std::fmt;

/// Masque de bits décrivant les canaux présents, suivant la convention
/// utilisée par la plupart des frameworks multimédia (un bit par position de
/// canal logique).
pub type ChannelLayout = u64;

pub const CHANNEL_FRONT_LEFT: ChannelLayout = 1 << 0;
pub const CHANNEL_FRONT_RIGHT: ChannelLayout = 1 << 1;
pub const CHANNEL_FRONT_CENTER: ChannelLayout = 1 << 2;
pub const CHANNEL_LOW_FREQUENCY: ChannelLayout = 1 << 3;
pub const CHANNEL_BACK_LEFT: ChannelLayout = 1 << 4;
pub const CHANNEL_BACK_RIGHT: ChannelLayout = 1 << 5;

pub const LAYOUT_MONO: ChannelLayout = CHANNEL_FRONT_CENTER;
pub const LAYOUT_STEREO: ChannelLayout = CHANNEL_FRONT_LEFT | CHANNEL_FRONT_RIGHT;
pub const LAYOUT_5POINT1: ChannelLayout = LAYOUT_STEREO
    | CHANNEL_FRONT_CENTER
    | CHANNEL_LOW_FREQUENCY
    | CHANNEL_BACK_LEFT
    | CHANNEL_BACK_RIGHT;

/// Nombre de canaux encodés par un masque de disposition.
#[inline]
pub fn channel_count(layout: ChannelLayout) -> u16 {
    layout.count_ones() as u16
}

/// Format de stockage des échantillons. Les variantes entrelacées et
/// planaires restent distinctes pour l'égalité/le regroupement même si ce
/// crate garde toujours les données décodées de [`crate::buffer::Buffer`]
/// planaires en interne ; la distinction compte quand même car elle fait
/// partie de ce qu'un sink déclare vouloir en aval, de la même façon
/// qu'`AVSampleFormat` les distingue en amont.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    Flt,
    Dbl,
    U8Planar,
    S16Planar,
    S32Planar,
    FltPlanar,
    DblPlanar,
}

impl SampleFormat {
    /// Octets occupés par un seul échantillon de ce format.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8Planar => 1,
            SampleFormat::S16 | SampleFormat::S16Planar => 2,
            SampleFormat::S32 | SampleFormat::S32Planar => 4,
            SampleFormat::Flt | SampleFormat::FltPlanar => 4,
            SampleFormat::Dbl | SampleFormat::DblPlanar => 8,
        }
    }

    pub const fn is_planar(self) -> bool {
        matches!(
            self,
            SampleFormat::U8Planar
                | SampleFormat::S16Planar
                | SampleFormat::S32Planar
                | SampleFormat::FltPlanar
                | SampleFormat::DblPlanar
        )
    }

    /// Le pendant entrelacé/planaire de ce format (identité s'il l'est déjà).
    pub const fn with_planar(self, planar: bool) -> SampleFormat {
        use SampleFormat::*;
        match (self, planar) {
            (U8 | U8Planar, true) => U8Planar,
            (U8 | U8Planar, false) => U8,
            (S16 | S16Planar, true) => S16Planar,
            (S16 | S16Planar, false) => S16,
            (S32 | S32Planar, true) => S32Planar,
            (S32 | S32Planar, false) => S32,
            (Flt | FltPlanar, true) => FltPlanar,
            (Flt | FltPlanar, false) => Flt,
            (Dbl | DblPlanar, true) => DblPlanar,
            (Dbl | DblPlanar, false) => Dbl,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::Flt => "flt",
            SampleFormat::Dbl => "dbl",
            SampleFormat::U8Planar => "u8p",
            SampleFormat::S16Planar => "s16p",
            SampleFormat::S32Planar => "s32p",
            SampleFormat::FltPlanar => "fltp",
            SampleFormat::DblPlanar => "dblp",
        };
        f.write_str(name)
    }
}

/// Un format PCM entièrement spécifié : fréquence d'échantillonnage,
/// disposition des canaux et stockage des échantillons.
///
/// L'égalité se fait champ par champ, comme l'exige `format_equivalent` dans
/// la table des sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
    pub sample_fmt: SampleFormat,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channel_layout: ChannelLayout, sample_fmt: SampleFormat) -> Self {
        Self {
            sample_rate,
            channel_layout,
            sample_fmt,
        }
    }

    pub fn channels(&self) -> u16 {
        channel_count(self.channel_layout)
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels() as usize * self.sample_fmt.bytes_per_sample()
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.bytes_per_frame() as u64 * self.sample_rate as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_format_equality() {
        let a = AudioFormat::new(48_000, LAYOUT_STEREO, SampleFormat::S16);
        let b = AudioFormat::new(48_000, LAYOUT_STEREO, SampleFormat::S16);
        assert_eq!(a, b);

        let c = AudioFormat::new(44_100, LAYOUT_STEREO, SampleFormat::S16);
        assert_ne!(a, c);
    }

    #[test]
    fn bytes_per_sec_matches_channels_times_rate() {
        let fmt = AudioFormat::new(48_000, LAYOUT_STEREO, SampleFormat::S16);
        assert_eq!(fmt.channels(), 2);
        assert_eq!(fmt.bytes_per_frame(), 4);
        assert_eq!(fmt.bytes_per_sec(), 48_000 * 4);
    }

    #[test]
    fn packed_and_planar_are_distinct() {
        assert_ne!(SampleFormat::S16, SampleFormat::S16Planar);
        assert_eq!(SampleFormat::S16.with_planar(true), SampleFormat::S16Planar);
        assert!(SampleFormat::S16Planar.is_planar());
    }
}
