//! Le worker de décodage : l'unique thread d'arrière-plan qui pilote une
//! [`crate::playlist::Playlist`] de sa création à sa destruction.
//!
//! S'inspire de `decode_thread` et `audio_decode_frame` de `playlist.c` :
//! même forme de boucle globale (attendre le curseur, attendre le drain,
//! reconstruire, seek/flush, lire, diffuser), en remplaçant la distinction
//! paquet/frame de l'original par un unique appel `AudioSource::read_frame`
//! de ce crate (une source décode ici directement en PCM, donc il n'y a pas
//! de parcours séparé d'une file de paquets).

use std::sync::atomic::Ordering;

use crate::buffer::QueueItem;
use crate::filter_graph::FilterGraphBuilder;
use crate::playlist::Playlist;
use crate::playlist_item::ItemId;
use crate::source::ReadOutcome;
use std::sync::Arc;

enum StepOutcome {
    /// Traité (ou ignoré) sans épuiser la source courante.
    Continue,
    /// La source courante est épuisée ou inutilisable ; avancer le curseur.
    Advance,
}

/// Point d'entrée du worker, exécuté sur son propre `std::thread`. Revient
/// quand `playlist.abort_request` est observé à vrai.
pub(crate) fn run(playlist: Arc<Playlist>) {
    let mut graph = FilterGraphBuilder::default();
    let mut was_paused = playlist.paused.load(Ordering::SeqCst);

    loop {
        if playlist.abort_request.load(Ordering::SeqCst) {
            tracing::debug!("decode worker: abort requested, exiting");
            return;
        }

        let mut inner = playlist.inner.lock().unwrap();

        let cursor = match inner.decode_cursor {
            Some(id) => id,
            None => {
                if !inner.sent_end_of_q {
                    for sink in inner.sink_map.iter_sinks() {
                        sink.push(QueueItem::End);
                    }
                    inner.sent_end_of_q = true;
                    tracing::debug!("decode worker: dispatched end-of-queue sentinel");
                }
                let _inner = playlist.decode_head_cond.wait(inner).unwrap();
                continue;
            }
        };
        inner.sent_end_of_q = false;

        if inner.sink_map.every_sink_full() {
            let _inner = playlist.sink_drain_cond.wait(inner).unwrap();
            continue;
        }

        let volume = inner.volume;
        let gain = inner.items.get(cursor).map(|s| s.gain).unwrap_or(1.0);
        inner.effective_gain = (volume * gain).clamp(0.0, 1.0);

        let paused = playlist.paused.load(Ordering::SeqCst);
        if paused != was_paused {
            if let Some(slot) = inner.items.get_mut(cursor) {
                if paused {
                    slot.source.read_pause();
                } else {
                    slot.source.read_play();
                }
            }
            was_paused = paused;
        }

        match step(&playlist, &mut inner, cursor, &mut graph) {
            StepOutcome::Continue => {}
            StepOutcome::Advance => {
                let next = inner.items.get(cursor).and_then(|s| s.next);
                inner.decode_cursor = next;
                if let Some(next_id) = next {
                    if let Some(slot) = inner.items.get_mut(next_id) {
                        slot.seek.seek_pos = Some(0);
                        slot.seek.seek_flush = false;
                    }
                }
                tracing::debug!(
                    item = cursor.raw(),
                    next = ?next.map(|n| n.raw()),
                    "decode worker: cursor advanced"
                );
            }
        }

        drop(inner);
    }
}

/// Une itération de travail sur l'item courant du curseur : reconstruit le
/// graphe si nécessaire, applique tout seek en attente, tire une frame
/// décodée (ou vide le buffer de délai du codec à l'EOF) et diffuse le
/// résultat vers chaque sink.
fn step(
    playlist: &Playlist,
    inner: &mut crate::playlist::PlaylistInner,
    cursor: ItemId,
    graph: &mut FilterGraphBuilder,
) -> StepOutcome {
    let stream = match inner.items.get(cursor) {
        Some(slot) => slot.source.stream_info(),
        None => return StepOutcome::Advance,
    };
    let effective_gain = inner.effective_gain;

    if let Err(e) = graph.maybe_rebuild(stream, effective_gain, &inner.sink_map, &mut inner.rebuild_flag) {
        tracing::error!(item = cursor.raw(), error = %e, "decode worker: filter graph rebuild failed");
        return StepOutcome::Advance;
    }

    if playlist.abort_request.load(Ordering::SeqCst) {
        return StepOutcome::Advance;
    }

    let (seek_pos, seek_flush) = inner
        .items
        .get(cursor)
        .map(|s| (s.seek.seek_pos, s.seek.seek_flush))
        .unwrap_or((None, false));

    if let Some(ts) = seek_pos {
        if let Some(slot) = inner.items.get_mut(cursor) {
            if let Err(msg) = slot.source.seek(ts) {
                tracing::warn!(item = cursor.raw(), error = %msg, "decode worker: seek failed, continuing from current position");
            }
        }
        if seek_flush {
            for sink in inner.sink_map.iter_sinks() {
                sink.flush_with_callback();
            }
        }
        if let Some(slot) = inner.items.get_mut(cursor) {
            slot.seek.seek_pos = None;
            slot.seek.seek_flush = false;
            slot.seek.eof = false;
        }
    }

    let already_eof = inner.items.get(cursor).map(|s| s.seek.eof).unwrap_or(false);
    let source_format = stream.format;

    let outcome = if already_eof {
        match inner.items.get_mut(cursor) {
            Some(slot) if slot.source.has_delay() => slot.source.drain(),
            _ => return StepOutcome::Advance,
        }
    } else {
        match inner.items.get_mut(cursor) {
            Some(slot) => slot.source.read_frame(),
            None => return StepOutcome::Advance,
        }
    };

    match outcome {
        ReadOutcome::Frame(frame) => {
            let position_seconds = inner.items.get(cursor).map(|s| s.source.audio_clock()).unwrap_or(0.0);
            match graph.process(&frame, source_format, effective_gain, cursor, position_seconds) {
                Ok(outputs) => {
                    for (group, output) in inner.sink_map.groups().iter().zip(outputs) {
                        for sink in group.members() {
                            sink.push(QueueItem::Data(output.clone()));
                        }
                    }
                    StepOutcome::Continue
                }
                Err(e) => {
                    tracing::error!(item = cursor.raw(), error = %e, "decode worker: frame processing failed");
                    StepOutcome::Advance
                }
            }
        }
        ReadOutcome::Pending => StepOutcome::Continue,
        ReadOutcome::Eof => {
            if already_eof {
                tracing::debug!(item = cursor.raw(), "decode worker: delay drain exhausted");
                StepOutcome::Advance
            } else {
                if let Some(slot) = inner.items.get_mut(cursor) {
                    slot.seek.eof = true;
                }
                tracing::debug!(item = cursor.raw(), "decode worker: source reached eof");
                StepOutcome::Continue
            }
        }
    }
}
