//! Point de consommation : format de sortie déclaré, file bornée, hooks de
//! flush/purge.
//!
//! Un `Sink` est créé détaché, puis [`Sink::attach`]é à exactement une
//! playlist à la fois. Le thread qui appelle [`Sink::buffer_get`] est l'unique
//! consommateur de la file ; le worker de décodage en est l'unique
//! producteur. `Sink` lui-même ne touche jamais directement au mutex de
//! coordination de la playlist — c'est le rôle de
//! [`crate::playlist::Playlist`], vers qui `Sink::attach`/`detach` délèguent.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::buffer::{Buffer, QueueItem};
use crate::error::PlaylistError;
use crate::format::AudioFormat;
use crate::playlist_item::ItemId;
use crate::queue::{GetResult, Queue, QueueObserver};

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    fn next() -> Self {
        SinkId(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Résultat d'un [`Sink::buffer_get`]/[`Sink::buffer_peek`] (potentiellement
/// bloquant).
pub enum BufferStatus {
    Yes(Buffer),
    No,
    End,
}

/// Ce qu'un [`Sink`] attend de sa playlist propriétaire : un moyen de
/// réveiller le worker quand la file de ce sink descend sous
/// `min_queue_bytes`. Implémenté par [`crate::playlist::Playlist`] ; tenu par
/// `Sink` uniquement via une référence [`Weak`], pour que le sink ne
/// maintienne jamais sa playlist en vie.
pub trait DrainSignal: Send + Sync {
    fn signal_sink_drain(&self);
}

/// Callbacks fournis par l'utilisateur, invoqués pendant que le mutex de
/// coordination de la playlist propriétaire est tenu. Comme dans la
/// conception originale, les implémentations ne doivent ni rappeler dans la
/// playlist ni bloquer sur ce mutex.
pub trait SinkCallbacks: Send + Sync {
    fn on_flush(&self, _sink: &Sink) {}
    fn on_purge(&self, _sink: &Sink, _item: ItemId) {}
}

struct NoopCallbacks;
impl SinkCallbacks for NoopCallbacks {}

pub struct Sink {
    id: SinkId,
    audio_format: AudioFormat,
    buffer_size: usize,
    buffer_sample_count: usize,
    disable_resample: bool,
    bytes_per_sec: u64,
    min_queue_bytes: usize,
    queue_bytes: AtomicUsize,
    queue: Queue,
    callbacks: Arc<dyn SinkCallbacks>,
    playlist_ref: std::sync::Mutex<Option<Weak<dyn DrainSignal>>>,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("id", &self.id)
            .field("audio_format", &self.audio_format)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl Sink {
    /// Crée un sink détaché. `buffer_size` est la profondeur de file visée en
    /// frames ; `buffer_sample_count` à 0 signifie que le sink accepte des
    /// buffers de taille variable.
    pub fn new(
        audio_format: AudioFormat,
        buffer_size: usize,
        buffer_sample_count: usize,
        disable_resample: bool,
        callbacks: Arc<dyn SinkCallbacks>,
    ) -> Arc<Self> {
        let bytes_per_sec = audio_format.bytes_per_sec();
        let min_queue_bytes = buffer_size * audio_format.bytes_per_frame();
        Arc::new_cyclic(|weak: &std::sync::Weak<Sink>| Sink {
            id: SinkId::next(),
            audio_format,
            buffer_size,
            buffer_sample_count,
            disable_resample,
            bytes_per_sec,
            min_queue_bytes,
            queue_bytes: AtomicUsize::new(0),
            queue: Queue::new(Arc::new(SinkQueueObserver(weak.clone()))),
            callbacks,
            playlist_ref: std::sync::Mutex::new(None),
        })
    }

    pub fn without_callbacks(
        audio_format: AudioFormat,
        buffer_size: usize,
        buffer_sample_count: usize,
        disable_resample: bool,
    ) -> Arc<Self> {
        Self::new(
            audio_format,
            buffer_size,
            buffer_sample_count,
            disable_resample,
            Arc::new(NoopCallbacks),
        )
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn audio_format(&self) -> AudioFormat {
        self.audio_format
    }

    pub fn buffer_sample_count(&self) -> usize {
        self.buffer_sample_count
    }

    pub fn disable_resample(&self) -> bool {
        self.disable_resample
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.bytes_per_sec
    }

    pub fn min_queue_bytes(&self) -> usize {
        self.min_queue_bytes
    }

    pub fn queue_bytes(&self) -> usize {
        self.queue_bytes.load(Ordering::SeqCst)
    }

    pub fn is_full(&self) -> bool {
        self.queue_bytes() >= self.min_queue_bytes
    }

    pub fn is_attached(&self) -> bool {
        self.playlist_ref.lock().unwrap().is_some()
    }

    /// S'attache à une playlist. Délègue le travail protégé par le mutex de
    /// coordination (insertion dans la table des sinks, signal de la condvar
    /// de drain) à la playlist elle-même ; ceci ne fait qu'enregistrer la
    /// référence arrière et réinitialiser la file.
    pub fn attach<P>(self: &Arc<Self>, playlist: &Arc<P>) -> Result<(), PlaylistError>
    where
        P: crate::playlist::AttachSink + DrainSignal + 'static,
    {
        playlist.attach_sink(Arc::clone(self));
        *self.playlist_ref.lock().unwrap() = Some(Arc::downgrade(playlist) as Weak<dyn DrainSignal>);
        self.queue.reset();
        tracing::debug!(sink = self.id.0, "sink attached");
        Ok(())
    }

    /// Se détache de la playlist à laquelle ce sink est attaché, s'il y en a une.
    pub fn detach<P>(self: &Arc<Self>, playlist: &Arc<P>)
    where
        P: crate::playlist::AttachSink + DrainSignal + 'static,
    {
        self.queue.abort();
        self.queue.flush();
        playlist.detach_sink(self.id);
        *self.playlist_ref.lock().unwrap() = None;
        tracing::debug!(sink = self.id.0, "sink detached");
    }

    pub fn buffer_get(&self, block: bool) -> BufferStatus {
        match self.queue.get(block) {
            GetResult::Yes(QueueItem::Data(buf)) => BufferStatus::Yes(buf),
            GetResult::Yes(QueueItem::End) => BufferStatus::End,
            GetResult::No => BufferStatus::No,
        }
    }

    pub fn buffer_peek(&self, block: bool) -> BufferStatus {
        match self.queue.peek(block) {
            GetResult::Yes(QueueItem::Data(buf)) => BufferStatus::Yes(buf),
            GetResult::Yes(QueueItem::End) => BufferStatus::End,
            GetResult::No => BufferStatus::No,
        }
    }

    /// Pousse un élément dans la file de ce sink. Appelé par le worker de décodage.
    pub(crate) fn push(&self, item: QueueItem) {
        self.queue.put(item);
    }

    /// Aborte la file de ce sink, débloquant tout consommateur en attente
    /// dans `buffer_get`. Appelé par la playlist à la destruction.
    pub(crate) fn abort(&self) {
        self.queue.abort();
    }

    /// Retire tout buffer référençant `item` et déclenche `purge_cb` une
    /// fois. Appelé par la playlist sous son mutex de coordination pendant
    /// `remove`.
    pub(crate) fn purge_item(&self, item: ItemId) {
        self.queue.purge(|qi| match qi {
            QueueItem::Data(b) => b.item() == item,
            QueueItem::End => false,
        });
        self.callbacks.on_purge(self, item);
    }

    /// Aborte, vide et déclenche `flush_cb` une fois. Appelé par la playlist
    /// sous son mutex de coordination quand un seek demande un flush.
    pub(crate) fn flush_with_callback(&self) {
        self.queue.flush();
        self.callbacks.on_flush(self);
    }
}

struct SinkQueueObserver(Weak<Sink>);

impl QueueObserver for SinkQueueObserver {
    fn on_put(&self, item: &QueueItem) {
        let Some(sink) = self.0.upgrade() else { return };
        if let QueueItem::Data(buf) = item {
            sink.queue_bytes.fetch_add(buf.size_bytes(), Ordering::SeqCst);
        }
    }

    fn on_get(&self, item: &QueueItem) {
        let Some(sink) = self.0.upgrade() else { return };
        if let QueueItem::Data(buf) = item {
            sink.queue_bytes.fetch_sub(buf.size_bytes(), Ordering::SeqCst);
            if sink.queue_bytes() < sink.min_queue_bytes {
                if let Some(playlist) = sink.playlist_ref.lock().unwrap().as_ref().and_then(Weak::upgrade) {
                    playlist.signal_sink_drain();
                }
            }
        }
    }

    fn on_remove(&self, item: &QueueItem) {
        let Some(sink) = self.0.upgrade() else { return };
        if let QueueItem::Data(buf) = item {
            sink.queue_bytes.fetch_sub(buf.size_bytes(), Ordering::SeqCst);
            if let Some(playlist) = sink.playlist_ref.lock().unwrap().as_ref().and_then(Weak::upgrade) {
                playlist.signal_sink_drain();
            }
        }
    }
}
