//! Regroupe les sinks attachés par empreinte de format de sortie.
//!
//! Chaque groupe partage une branche de sortie du graphe de filtres : les
//! sinks d'un même groupe reçoivent le même flux converti. La clé de
//! regroupement est [`format_equivalent`], pas l'égalité brute d'[`AudioFormat`]
//! — deux sinks `disable_resample` sont équivalents quel que soit leur format
//! déclaré, puisqu'aucun des deux ne veut que le graphe de filtres touche à
//! son flux.

use std::sync::Arc;

use crate::sink::{Sink, SinkId};

fn format_equivalent(a: &Sink, b: &Sink) -> bool {
    if a.disable_resample() && b.disable_resample() {
        return true;
    }
    a.audio_format() == b.audio_format() && a.buffer_sample_count() == b.buffer_sample_count()
}

/// Une branche de sortie du graphe de filtres et les sinks qu'elle alimente.
pub struct SinkGroup {
    representative: Arc<Sink>,
    members: Vec<Arc<Sink>>,
}

impl SinkGroup {
    pub fn representative(&self) -> &Arc<Sink> {
        &self.representative
    }

    pub fn members(&self) -> &[Arc<Sink>] {
        &self.members
    }
}

/// Groupes de [`Sink`]s partageant une empreinte de format de sortie.
#[derive(Default)]
pub struct SinkMap {
    groups: Vec<SinkGroup>,
}

impl SinkMap {
    pub fn add(&mut self, sink: Arc<Sink>) {
        for group in &mut self.groups {
            if format_equivalent(&group.representative, &sink) {
                group.members.push(sink);
                return;
            }
        }
        self.groups.insert(
            0,
            SinkGroup {
                representative: Arc::clone(&sink),
                members: vec![sink],
            },
        );
    }

    pub fn remove(&mut self, sink_id: SinkId) {
        self.groups.retain_mut(|group| {
            group.members.retain(|s| s.id() != sink_id);
            !group.members.is_empty()
        });
    }

    pub fn groups(&self) -> &[SinkGroup] {
        &self.groups
    }

    pub fn count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter_sinks(&self) -> impl Iterator<Item = &Arc<Sink>> {
        self.groups.iter().flat_map(|g| g.members.iter())
    }

    /// Vrai par vacuité quand aucun sink n'est attaché — comme le
    /// `every_sink` de `playlist.c`, qui vaut 1 par défaut avant même de
    /// parcourir un sink, pour que le worker s'endorme sur `sink_drain_cond`
    /// plutôt que de vider une source sans consommateur jusqu'à `End`.
    pub fn every_sink_full(&self) -> bool {
        self.iter_sinks().all(|s| s.is_full())
    }
}
