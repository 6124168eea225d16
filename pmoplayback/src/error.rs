//! Types d'erreurs absorbées ou renvoyées à travers le cœur de playlist.
//!
//! La plupart ne s'échappent jamais du worker de décodage : elles sont
//! loguées et la lecture continue sur l'item suivant, suivant la règle de la
//! conception originale « pas de retour d'erreur sur les chemins pilotés par
//! condvar ». Seuls les chemins de construction (`Playlist::new`,
//! `Sink::attach`) renvoient effectivement un `Result`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("allocation failed")]
    OutOfMemory,

    #[error("filter graph build failed: {0}")]
    FilterBuildFailed(String),

    #[error("decoder error: {0}")]
    DecoderError(String),

    #[error("seek failed: {0}")]
    SeekFailed(String),

    #[error("source aborted")]
    SourceAborted,

    #[error("queue aborted")]
    QueueAborted,
}
