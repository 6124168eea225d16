//! Items de playlist, stockés dans une petite arena plutôt que des pointeurs
//! bruts de liste chaînée.
//!
//! La conception originale à pointeurs prev/next (l'item possède ses
//! voisins) est un moyen facile de construire un cycle de références en Rust
//! pour aucun bénéfice : chaque opération sur la liste passe déjà par le
//! mutex de coordination de la playlist, donc rien à gagner à laisser les
//! items s'atteindre directement. Les items vivent dans une [`ItemArena`]
//! indexée par un [`ItemId`] opaque ; `prev`/`next` ne sont que d'autres
//! `ItemId`s. Un [`Buffer`](crate::buffer::Buffer) peut porter un `ItemId`
//! par valeur longtemps après que l'item lui-même a disparu — ce n'est
//! qu'un nombre, pas une référence possédante — exactement la sémantique
//! « faible par valeur » dont l'identité d'item a besoin pour le
//! rapprochement de purge.

use std::collections::HashMap;

use crate::source::AudioSource;

/// Handle opaque vers un item de playlist. Bon marché à copier, ne porte
/// aucune possession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

impl ItemId {
    #[cfg(test)]
    pub fn for_test(n: u64) -> Self {
        ItemId(n)
    }

    /// Forme numérique, pour le logging uniquement.
    pub(crate) fn raw(&self) -> u64 {
        self.0
    }
}

/// Comptabilité de seek/eof par item, analogue au mutex de seek propre à une
/// source dans la conception originale : muté par `Playlist::seek` depuis
/// n'importe quel thread, lu et effacé par le worker de décodage.
#[derive(Debug, Default)]
pub(crate) struct SeekState {
    pub seek_pos: Option<i64>,
    pub seek_flush: bool,
    pub eof: bool,
}

pub(crate) struct ItemSlot {
    pub source: Box<dyn AudioSource>,
    pub gain: f64,
    pub prev: Option<ItemId>,
    pub next: Option<ItemId>,
    pub seek: SeekState,
}

/// Arena possédant chaque item de playlist vivant.
#[derive(Default)]
pub(crate) struct ItemArena {
    next_id: u64,
    slots: HashMap<ItemId, ItemSlot>,
}

impl ItemArena {
    pub fn insert(&mut self, source: Box<dyn AudioSource>, gain: f64) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            ItemSlot {
                source,
                gain,
                prev: None,
                next: None,
                seek: SeekState::default(),
            },
        );
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemSlot> {
        self.slots.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut ItemSlot> {
        self.slots.get_mut(&id)
    }

    pub fn remove(&mut self, id: ItemId) -> Option<ItemSlot> {
        self.slots.remove(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
