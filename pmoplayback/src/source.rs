//! Le collaborateur décodeur/démultiplexeur.
//!
//! Ouvrir un fichier, le démultiplexer en paquets et décoder ces paquets en
//! PCM est un sous-système entier à lui seul, explicitement hors de portée
//! ici (voir la doc de tête du crate). Ce qui est dans le périmètre, c'est
//! l'interface étroite dont le worker de décodage a besoin : infos de flux,
//! une frame décodée à la fois, comptabilité de seek/pause/eof.
//! [`AudioSource`] fixe cette interface ; tout ce qui l'implémente — un vrai
//! démultiplexeur, un générateur synthétique, un double de test — peut se
//! placer derrière un item de [`crate::playlist::Playlist`].

use crate::format::AudioFormat;

/// Propriétés statiques d'une source, lues quand le graphe de filtres doit
/// décider s'il doit se reconstruire pour cet item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub format: AudioFormat,
    /// Base de temps sous forme de rationnel `(num, den)`, suivant la
    /// convention de la plupart des démultiplexeurs : un timestamp de paquet
    /// `pts` représente `pts * num / den` secondes.
    pub time_base: (i64, i64),
    /// Temps de début du flux en unités de base de temps, si le conteneur en
    /// déclare un.
    pub start_time: Option<i64>,
}

impl StreamInfo {
    pub fn seconds_to_timestamp(&self, seconds: f64) -> i64 {
        let mut ts = (seconds * self.time_base.1 as f64 / self.time_base.0 as f64) as i64;
        if let Some(start) = self.start_time {
            ts += start;
        }
        ts
    }
}

/// Une frame décodée, planaire par canal, dans le format natif de la source.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub data: Vec<Vec<u8>>,
    pub frame_count: usize,
    /// Timestamp de présentation en unités de base de temps, si connu.
    pub pts: Option<i64>,
}

/// Résultat d'un prélèvement d'une unité d'audio décodé depuis une source.
pub enum ReadOutcome {
    /// Une frame a été décodée ; l'horloge doit avancer de la durée de cette frame.
    Frame(DecodedFrame),
    /// La source n'a pas de données pour l'instant (pas nécessairement une
    /// fin de flux) ; le worker doit cesser de tirer sur cette source cette
    /// itération.
    Pending,
    /// La source est épuisée (y compris la purge de délai, le cas échéant).
    Eof,
}

/// Collaborateur décodeur/démultiplexeur fixé par l'interface externe de ce
/// crate.
///
/// Toutes les méthodes ne sont appelées que depuis le thread du worker de
/// décodage, sous le mutex de coordination de la playlist propriétaire :
/// aucune synchronisation interne n'est requise des implémentations au-delà
/// de `Send`.
pub trait AudioSource: Send {
    fn stream_info(&self) -> StreamInfo;

    /// Tire et décode la prochaine unité d'audio.
    fn read_frame(&mut self) -> ReadOutcome;

    /// Si le codec sous-jacent bufferise des frames en interne et a besoin
    /// d'une passe de purge (paquets vides) une fois que le démultiplexeur
    /// signale l'EOF.
    fn has_delay(&self) -> bool {
        false
    }

    /// Nourrit un paquet vide pour vider le buffer de délai interne d'un codec.
    fn drain(&mut self) -> ReadOutcome {
        ReadOutcome::Eof
    }

    /// Se déplace au timestamp donné (base de temps de la source). Les
    /// erreurs ne sont pas fatales : le worker logue et continue à décoder
    /// depuis où la source se retrouve.
    fn seek(&mut self, timestamp: i64) -> Result<(), String>;

    fn flush(&mut self);

    fn read_pause(&mut self) {}
    fn read_play(&mut self) {}

    /// Meilleure estimation actuelle de la position de lecture, en secondes.
    fn audio_clock(&self) -> f64;
}

/// Une source synthétique en onde sinusoïdale, utile pour les tests et comme
/// implémentation de référence d'[`AudioSource`] ; elle ne touche jamais à de
/// vraies E/S.
pub struct SineWaveSource {
    format: AudioFormat,
    frequency_hz: f64,
    total_frames: usize,
    frames_emitted: usize,
    frames_per_chunk: usize,
    phase: f64,
    clock: f64,
    eof: bool,
}

impl SineWaveSource {
    pub fn new(format: AudioFormat, frequency_hz: f64, duration_seconds: f64) -> Self {
        let total_frames = (duration_seconds * format.sample_rate as f64) as usize;
        Self {
            format,
            frequency_hz,
            total_frames,
            frames_emitted: 0,
            frames_per_chunk: (format.sample_rate / 10).max(1) as usize,
            phase: 0.0,
            clock: 0.0,
            eof: false,
        }
    }
}

impl AudioSource for SineWaveSource {
    fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            format: self.format,
            time_base: (1, self.format.sample_rate as i64),
            start_time: Some(0),
        }
    }

    fn read_frame(&mut self) -> ReadOutcome {
        if self.eof || self.frames_emitted >= self.total_frames {
            self.eof = true;
            return ReadOutcome::Eof;
        }

        let n = self
            .frames_per_chunk
            .min(self.total_frames - self.frames_emitted);
        let channels = self.format.channels() as usize;
        let step = 2.0 * std::f64::consts::PI * self.frequency_hz / self.format.sample_rate as f64;

        let mut data = vec![Vec::with_capacity(n * 8); channels];
        for _ in 0..n {
            let sample = (self.phase.sin() * i16::MAX as f64) as i16;
            self.phase += step;
            for plane in data.iter_mut() {
                plane.extend_from_slice(&sample.to_le_bytes());
            }
        }

        let pts = self.frames_emitted as i64;
        self.frames_emitted += n;
        self.clock = self.frames_emitted as f64 / self.format.sample_rate as f64;

        ReadOutcome::Frame(DecodedFrame {
            data,
            frame_count: n,
            pts: Some(pts),
        })
    }

    fn seek(&mut self, timestamp: i64) -> Result<(), String> {
        self.frames_emitted = timestamp.max(0) as usize;
        self.clock = self.frames_emitted as f64 / self.format.sample_rate as f64;
        self.eof = self.frames_emitted >= self.total_frames;
        Ok(())
    }

    fn flush(&mut self) {
        self.phase = 0.0;
    }

    fn audio_clock(&self) -> f64 {
        self.clock
    }
}
