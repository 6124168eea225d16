//! File bornée de buffers : une FIFO de [`QueueItem`]s avec comptabilité de
//! taille, `get` bloquant, flush, abort et purge par prédicat.
//!
//! Chaque sink possède exactement une `Queue`. Le worker de décodage en est
//! l'unique producteur ; le thread qui appelle
//! [`Sink::buffer_get`](crate::sink::Sink::buffer_get) en est l'unique
//! consommateur. La comptabilité et la signalisation de la contre-pression
//! sont déléguées à un observateur plutôt qu'intégrées à la file elle-même,
//! pour que la file reste une FIFO nue et que le sink garde la politique.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use crate::buffer::QueueItem;

/// Observe le trafic de la file. Un [`crate::sink::Sink`] implémente ce
/// trait pour tenir `queue_bytes` à jour et signaler la condvar de drain de
/// la playlist propriétaire.
pub trait QueueObserver: Send + Sync {
    fn on_put(&self, item: &QueueItem);
    fn on_get(&self, item: &QueueItem);
    fn on_remove(&self, item: &QueueItem);
}

/// Résultat d'un `get`/`peek` (potentiellement bloquant).
pub enum GetResult {
    Yes(QueueItem),
    No,
}

struct State {
    items: VecDeque<QueueItem>,
    aborted: bool,
}

pub struct Queue {
    state: Mutex<State>,
    not_empty: Condvar,
    observer: Arc<dyn QueueObserver>,
}

impl Queue {
    pub fn new(observer: Arc<dyn QueueObserver>) -> Self {
        Queue {
            state: Mutex::new(State {
                items: VecDeque::new(),
                aborted: false,
            }),
            not_empty: Condvar::new(),
            observer,
        }
    }

    /// Ajoute un élément. Ne fait rien (et relâche l'élément via le hook de
    /// suppression) si la file est abortée ; ne peut sinon pas échouer.
    pub fn put(&self, item: QueueItem) {
        let mut state = self.state.lock().unwrap();
        if state.aborted {
            drop(state);
            self.observer.on_remove(&item);
            return;
        }
        state.items.push_back(item.clone());
        drop(state);
        self.observer.on_put(&item);
        self.not_empty.notify_all();
    }

    /// Retire et renvoie l'élément de tête. Bloque tant que la file est vide
    /// si `block` vaut vrai, se réveille sur put/abort ; renvoie `No`
    /// immédiatement si la file est abortée.
    pub fn get(&self, block: bool) -> GetResult {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.observer.on_get(&item);
                return GetResult::Yes(item);
            }
            if state.aborted || !block {
                return GetResult::No;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Comme `get`, mais laisse l'élément de tête en place.
    pub fn peek(&self, block: bool) -> GetResult {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.front() {
                return GetResult::Yes(item.clone());
            }
            if state.aborted || !block {
                return GetResult::No;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Retire tous les éléments en attente, en invoquant le hook de
    /// suppression sur chacun.
    pub fn flush(&self) {
        let drained: Vec<QueueItem> = {
            let mut state = self.state.lock().unwrap();
            state.items.drain(..).collect()
        };
        for item in &drained {
            self.observer.on_remove(item);
        }
    }

    /// Marque la file comme abortée : réveille tous les threads en attente,
    /// rend les `put` suivants sans effet et les `get` suivants renvoient
    /// `No` immédiatement.
    pub fn abort(&self) {
        let mut state = self.state.lock().unwrap();
        state.aborted = true;
        drop(state);
        self.not_empty.notify_all();
    }

    /// Efface le drapeau d'abort ; la file redevient utilisable.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.aborted = false;
    }

    /// Retire, dans l'ordre, tout élément pour lequel `pred` est vrai, en
    /// invoquant le hook de suppression sur chacun. Le prédicat ne voit
    /// jamais [`QueueItem::End`].
    pub fn purge<F>(&self, mut pred: F)
    where
        F: FnMut(&QueueItem) -> bool,
    {
        let removed: Vec<QueueItem> = {
            let mut state = self.state.lock().unwrap();
            let mut kept = VecDeque::with_capacity(state.items.len());
            let mut removed = Vec::new();
            for item in state.items.drain(..) {
                let drop_it = match &item {
                    QueueItem::End => false,
                    QueueItem::Data(_) => pred(&item),
                };
                if drop_it {
                    removed.push(item);
                } else {
                    kept.push_back(item);
                }
            }
            state.items = kept;
            removed
        };
        for item in &removed {
            self.observer.on_remove(item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::format::{AudioFormat, SampleFormat, LAYOUT_STEREO};
    use crate::playlist_item::ItemId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        puts: AtomicUsize,
        gets: AtomicUsize,
        removes: AtomicUsize,
    }

    impl CountingObserver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                puts: AtomicUsize::new(0),
                gets: AtomicUsize::new(0),
                removes: AtomicUsize::new(0),
            })
        }
    }

    impl QueueObserver for CountingObserver {
        fn on_put(&self, _item: &QueueItem) {
            self.puts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_get(&self, _item: &QueueItem) {
            self.gets.fetch_add(1, Ordering::SeqCst);
        }
        fn on_remove(&self, _item: &QueueItem) {
            self.removes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_buffer(item: u64) -> Buffer {
        let fmt = AudioFormat::new(48_000, LAYOUT_STEREO, SampleFormat::S16Planar);
        Buffer::new(ItemId::for_test(item), 0.0, vec![vec![0u8; 4], vec![0u8; 4]], 1, fmt)
    }

    #[test]
    fn put_then_get_round_trips_in_order() {
        let obs = CountingObserver::new();
        let q = Queue::new(obs.clone());
        q.put(QueueItem::Data(sample_buffer(1)));
        q.put(QueueItem::Data(sample_buffer(2)));

        match q.get(false) {
            GetResult::Yes(item) => assert_eq!(item.as_buffer().unwrap().item(), ItemId::for_test(1)),
            GetResult::No => panic!("expected item"),
        }
        match q.get(false) {
            GetResult::Yes(item) => assert_eq!(item.as_buffer().unwrap().item(), ItemId::for_test(2)),
            GetResult::No => panic!("expected item"),
        }
        assert!(matches!(q.get(false), GetResult::No));
        assert_eq!(obs.puts.load(Ordering::SeqCst), 2);
        assert_eq!(obs.gets.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn abort_wakes_blocked_get_with_no() {
        let obs = CountingObserver::new();
        let q = Arc::new(Queue::new(obs));
        let q2 = q.clone();
        let handle = std::thread::spawn(move || matches!(q2.get(true), GetResult::No));
        std::thread::sleep(std::time::Duration::from_millis(20));
        q.abort();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn put_after_abort_is_dropped_via_remove_hook() {
        let obs = CountingObserver::new();
        let q = Queue::new(obs.clone());
        q.abort();
        q.put(QueueItem::Data(sample_buffer(1)));
        assert!(q.is_empty());
        assert_eq!(obs.removes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_makes_queue_usable_again() {
        let obs = CountingObserver::new();
        let q = Queue::new(obs);
        q.abort();
        q.reset();
        q.put(QueueItem::Data(sample_buffer(1)));
        assert!(matches!(q.get(false), GetResult::Yes(_)));
    }

    #[test]
    fn purge_removes_matching_items_only() {
        let obs = CountingObserver::new();
        let q = Queue::new(obs.clone());
        q.put(QueueItem::Data(sample_buffer(1)));
        q.put(QueueItem::Data(sample_buffer(2)));
        q.put(QueueItem::End);

        q.purge(|item| item.as_buffer().map(|b| b.item() == ItemId::for_test(1)).unwrap_or(false));

        assert_eq!(q.len(), 2);
        match q.get(false) {
            GetResult::Yes(item) => assert_eq!(item.as_buffer().unwrap().item(), ItemId::for_test(2)),
            GetResult::No => panic!("expected item"),
        }
        assert!(matches!(q.get(false), GetResult::Yes(QueueItem::End)));
        assert_eq!(obs.removes.load(Ordering::SeqCst), 1);
    }
}
