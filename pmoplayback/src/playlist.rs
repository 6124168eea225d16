//! La playlist : une liste doublement chaînée d'items adossée à une arena, le
//! mutex/les condvars de coordination qui sérialisent les éditions avec le
//! worker de décodage, et les opérations d'édition publiques.
//!
//! S'inspire de `GroovePlaylist`/`GroovePlaylistPrivate` de
//! `playlist.c` : `decode_head_mutex`, `decode_head_cond`, `sink_drain_cond`,
//! et les opérations `groove_playlist_insert`/`remove`/`seek`/`set_volume`/
//! `set_gain`/`position`/`play`/`pause`/`playing`/`count`, portées des
//! primitives pthread vers `std::sync`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::PlaylistError;
use crate::playlist_item::{ItemArena, ItemId};
use crate::sink::{DrainSignal, Sink, SinkId};
use crate::sink_map::SinkMap;
use crate::source::AudioSource;

/// Tout ce que protège `decode_head_mutex` dans la conception originale.
pub(crate) struct PlaylistInner {
    pub(crate) items: ItemArena,
    pub(crate) head: Option<ItemId>,
    pub(crate) tail: Option<ItemId>,
    pub(crate) volume: f64,
    pub(crate) decode_cursor: Option<ItemId>,
    pub(crate) sink_map: SinkMap,
    pub(crate) sent_end_of_q: bool,
    pub(crate) effective_gain: f64,
    pub(crate) rebuild_flag: bool,
}

impl Default for PlaylistInner {
    fn default() -> Self {
        PlaylistInner {
            items: ItemArena::default(),
            head: None,
            tail: None,
            volume: 1.0,
            decode_cursor: None,
            sink_map: SinkMap::default(),
            sent_end_of_q: false,
            effective_gain: 1.0,
            rebuild_flag: false,
        }
    }
}

/// Le cœur de coordination plus les opérations d'édition de la playlist. Un
/// thread worker de décodage tourne par `Playlist`, démarré à la création et
/// rejoint à la destruction.
pub struct Playlist {
    pub(crate) inner: Mutex<PlaylistInner>,
    pub(crate) decode_head_cond: Condvar,
    pub(crate) sink_drain_cond: Condvar,
    pub(crate) paused: AtomicBool,
    pub(crate) abort_request: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Ce que [`Sink::attach`]/[`Sink::detach`] attendent de la playlist propriétaire.
pub trait AttachSink {
    fn attach_sink(&self, sink: Arc<Sink>);
    fn detach_sink(&self, sink_id: SinkId);
}

impl Playlist {
    /// Crée une playlist et démarre son thread worker de décodage.
    pub fn new() -> Result<Arc<Self>, PlaylistError> {
        let playlist = Arc::new(Playlist {
            inner: Mutex::new(PlaylistInner::default()),
            decode_head_cond: Condvar::new(),
            sink_drain_cond: Condvar::new(),
            paused: AtomicBool::new(false),
            abort_request: AtomicBool::new(false),
            worker: Mutex::new(None),
        });

        let worker_playlist = Arc::clone(&playlist);
        let handle = thread::Builder::new()
            .name("pmoplayback-decode-worker".into())
            .spawn(move || crate::worker::run(worker_playlist))
            .map_err(|e| {
                tracing::error!(error = %e, "failed to spawn decode worker thread");
                PlaylistError::OutOfMemory
            })?;
        *playlist.worker.lock().unwrap() = Some(handle);

        Ok(playlist)
    }

    /// Insère un nouvel item `(source, gain)` avant `next`, ou en queue si
    /// `next` vaut `None`. Renvoie l'id du nouvel item.
    pub fn insert(self: &Arc<Self>, source: Box<dyn AudioSource>, gain: f64, next: Option<ItemId>) -> ItemId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.items.insert(source, gain);

        if inner.head.is_none() {
            inner.head = Some(id);
            inner.tail = Some(id);
            if let Some(slot) = inner.items.get_mut(id) {
                slot.seek.seek_pos = Some(0);
                slot.seek.seek_flush = false;
            }
            inner.decode_cursor = Some(id);
            drop(inner);
            self.decode_head_cond.notify_all();
            tracing::debug!(item = id.raw(), "playlist insert: first item, cursor set");
            return id;
        }

        match next {
            Some(next_id) => {
                let prev_id = inner.items.get(next_id).and_then(|s| s.prev);
                if let Some(slot) = inner.items.get_mut(id) {
                    slot.prev = prev_id;
                    slot.next = Some(next_id);
                }
                if let Some(slot) = inner.items.get_mut(next_id) {
                    slot.prev = Some(id);
                }
                match prev_id {
                    Some(p) => {
                        if let Some(slot) = inner.items.get_mut(p) {
                            slot.next = Some(id);
                        }
                    }
                    None => inner.head = Some(id),
                }
            }
            None => {
                let old_tail = inner.tail;
                if let Some(slot) = inner.items.get_mut(id) {
                    slot.prev = old_tail;
                    slot.next = None;
                }
                if let Some(t) = old_tail {
                    if let Some(slot) = inner.items.get_mut(t) {
                        slot.next = Some(id);
                    }
                }
                inner.tail = Some(id);
            }
        }
        tracing::debug!(item = id.raw(), "playlist insert");
        id
    }

    /// Retire `item` de la liste. Le purge de la file de chaque sink attaché
    /// (en déclenchant `purge_cb` une fois par sink) et avance le curseur de
    /// décodage s'il pointait sur `item`.
    pub fn remove(&self, item: ItemId) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.items.contains(item) {
            return;
        }

        if inner.decode_cursor == Some(item) {
            inner.decode_cursor = inner.items.get(item).and_then(|s| s.next);
        }

        let (prev, next) = inner
            .items
            .get(item)
            .map(|s| (s.prev, s.next))
            .unwrap_or((None, None));
        match prev {
            Some(p) => {
                if let Some(slot) = inner.items.get_mut(p) {
                    slot.next = next;
                }
            }
            None => inner.head = next,
        }
        match next {
            Some(n) => {
                if let Some(slot) = inner.items.get_mut(n) {
                    slot.prev = prev;
                }
            }
            None => inner.tail = prev,
        }
        inner.items.remove(item);

        for sink in inner.sink_map.iter_sinks() {
            sink.purge_item(item);
        }

        drop(inner);
        self.sink_drain_cond.notify_all();
        // Signale aussi decode_head_cond : retirer le seul item laisse le
        // curseur à null, et un worker endormi ne se réveillerait sinon pas.
        self.decode_head_cond.notify_all();
        tracing::debug!(item = item.raw(), "playlist remove");
    }

    /// Retire tous les items, en partant de la tête.
    pub fn clear(&self) {
        loop {
            let head = self.inner.lock().unwrap().head;
            match head {
                Some(id) => self.remove(id),
                None => break,
            }
        }
    }

    /// Déplace `item` à `seconds`, en faisant le curseur de décodage. Le
    /// worker effectue le seek réel sur la source à sa prochaine itération.
    pub fn seek(&self, item: ItemId, seconds: f64) {
        let mut inner = self.inner.lock().unwrap();
        let timestamp = match inner.items.get(item) {
            Some(slot) => slot.source.stream_info().seconds_to_timestamp(seconds),
            None => return,
        };
        if let Some(slot) = inner.items.get_mut(item) {
            slot.seek.seek_pos = Some(timestamp);
            slot.seek.seek_flush = true;
        }
        inner.decode_cursor = Some(item);
        drop(inner);
        self.decode_head_cond.notify_all();
        tracing::debug!(item = item.raw(), seconds, "playlist seek");
    }

    /// Fixe le volume global de la playlist ; recalcule `effective_gain` si
    /// un item est en cours de décodage. Ne positionne pas `rebuild_flag` :
    /// la comparaison de snapshot de gain du graphe de filtres déclenche déjà
    /// une reconstruction d'elle-même.
    pub fn set_volume(&self, volume: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.volume = volume;
        if let Some(cursor) = inner.decode_cursor {
            if let Some(slot) = inner.items.get(cursor) {
                inner.effective_gain = volume * slot.gain;
            }
        }
    }

    /// Fixe le gain d'un item ; recalcule `effective_gain` si c'est le curseur.
    pub fn set_gain(&self, item: ItemId, gain: f64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.items.get_mut(item) {
            slot.gain = gain;
        }
        if inner.decode_cursor == Some(item) {
            let volume = inner.volume;
            if let Some(slot) = inner.items.get(item) {
                inner.effective_gain = volume * slot.gain;
            }
        }
    }

    /// Le curseur de décodage actuel et l'horloge de lecture de la source,
    /// si un item est en cours de décodage.
    pub fn position(&self) -> Option<(ItemId, f64)> {
        let inner = self.inner.lock().unwrap();
        let cursor = inner.decode_cursor?;
        let clock = inner.items.get(cursor)?.source.audio_clock();
        Some((cursor, clock))
    }

    pub fn play(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn playing(&self) -> bool {
        !self.paused.load(Ordering::SeqCst)
    }

    /// Compte d'items best-effort ; les appelants qui mutent en parallèle
    /// sont responsables de leur propre synchronisation externe.
    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }
}

impl AttachSink for Playlist {
    fn attach_sink(&self, sink: Arc<Sink>) {
        let mut inner = self.inner.lock().unwrap();
        inner.sink_map.add(sink);
        drop(inner);
        self.sink_drain_cond.notify_all();
    }

    fn detach_sink(&self, sink_id: SinkId) {
        let mut inner = self.inner.lock().unwrap();
        inner.sink_map.remove(sink_id);
    }
}

impl DrainSignal for Playlist {
    fn signal_sink_drain(&self) {
        self.sink_drain_cond.notify_all();
    }
}

impl Drop for Playlist {
    fn drop(&mut self) {
        self.abort_request.store(true, Ordering::SeqCst);
        self.decode_head_cond.notify_all();
        self.sink_drain_cond.notify_all();

        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }

        let inner = self.inner.lock().unwrap();
        for sink in inner.sink_map.iter_sinks() {
            sink.abort();
        }
        tracing::debug!("playlist destroyed");
    }
}
