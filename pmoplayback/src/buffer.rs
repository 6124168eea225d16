//! Audio décodé et filtré, prêt pour un sink : [`Buffer`].
//!
//! Un `Buffer` est à comptage de références (`Arc` en interne) et immuable
//! une fois construit. Chaque file de sink qui reçoit un buffer produit à
//! partir de la même frame source partage la même allocation sous-jacente ;
//! cloner un `Buffer` ne fait qu'incrémenter le compteur de références, ça
//! ne copie jamais les échantillons.

use std::sync::Arc;

use crate::format::AudioFormat;
use crate::playlist_item::ItemId;

/// Une frame PCM décodée et filtrée, planaire par canal.
struct BufferInner {
    item: ItemId,
    position_seconds: f64,
    data: Vec<Vec<u8>>,
    frame_count: usize,
    format: AudioFormat,
}

/// Handle bon marché à cloner vers un buffer décodé.
///
/// Toutes les files de sink référençant la même frame décodée partagent une
/// seule allocation ; le buffer est libéré quand la dernière file relâche
/// son handle.
#[derive(Clone)]
pub struct Buffer(Arc<BufferInner>);

impl Buffer {
    pub fn new(
        item: ItemId,
        position_seconds: f64,
        data: Vec<Vec<u8>>,
        frame_count: usize,
        format: AudioFormat,
    ) -> Self {
        Buffer(Arc::new(BufferInner {
            item,
            position_seconds,
            data,
            frame_count,
            format,
        }))
    }

    /// L'item de playlist depuis lequel ce buffer a été décodé, au moment du
    /// décodage.
    ///
    /// C'est une simple valeur [`ItemId`], pas un pointeur possédant, donc un
    /// buffer référençant un item supprimé ne maintient jamais les
    /// ressources de cet item en vie ; elle ne sert qu'à faire correspondre
    /// les buffers pendant une purge.
    pub fn item(&self) -> ItemId {
        self.0.item
    }

    pub fn position_seconds(&self) -> f64 {
        self.0.position_seconds
    }

    pub fn frame_count(&self) -> usize {
        self.0.frame_count
    }

    pub fn format(&self) -> AudioFormat {
        self.0.format
    }

    /// Données de canaux planaires, une tranche d'échantillons bruts (au
    /// format `format().sample_fmt`) par canal.
    pub fn planes(&self) -> &[Vec<u8>] {
        &self.0.data
    }

    /// Taille totale en octets sur tous les plans de canaux ; c'est ce que
    /// la comptabilité des files suit.
    pub fn size_bytes(&self) -> usize {
        self.0.data.iter().map(|plane| plane.len()).sum()
    }
}

/// Ce qui transite dans la file d'un sink : de l'audio réel, ou le marqueur
/// de fin de playlist.
///
/// Utiliser une variante taguée plutôt qu'un pointeur sentinelle distingué
/// (comme le ferait la conception originale à pointeur) fait que `End` n'a
/// jamais besoin de comptage de références et ne peut pas être confondu avec
/// un `Buffer` de longueur nulle.
#[derive(Clone)]
pub enum QueueItem {
    Data(Buffer),
    End,
}

impl QueueItem {
    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            QueueItem::Data(b) => Some(b),
            QueueItem::End => None,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            QueueItem::Data(b) => b.size_bytes(),
            QueueItem::End => 0,
        }
    }
}
