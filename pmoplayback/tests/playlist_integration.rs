//! Scénarios de bout en bout faisant fonctionner une vraie `Playlist` et son
//! thread worker de décodage contre `SineWaveSource`, à la place de vraies
//! E/S fichier. Reproduit les six scénarios jugés caractéristiques du cœur de
//! playlist, en vérifiant les codes de retour de `buffer_get`, `position()`
//! et les compteurs d'invocation de callback plutôt que les valeurs brutes
//! d'échantillons — sauf là où l'atténuation elle-même est ce qui est testé.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pmoplayback::{
    AudioFormat, AudioSource, BufferStatus, Playlist, SampleFormat, Sink, SinkCallbacks,
    SineWaveSource, LAYOUT_MONO, LAYOUT_STEREO,
};

fn stereo_48k() -> AudioFormat {
    AudioFormat::new(48_000, LAYOUT_STEREO, SampleFormat::S16Planar)
}

fn mono_44k_flt() -> AudioFormat {
    AudioFormat::new(44_100, LAYOUT_MONO, SampleFormat::Flt)
}

/// Sonde `pred` pendant jusqu'à deux secondes ; les sources de test ne font
/// que quelques centaines de millisecondes d'audio, donc le worker finit
/// toujours largement avant.
fn wait_until<F: FnMut() -> bool>(mut pred: F) -> bool {
    for _ in 0..400 {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

fn drain_until_end(sink: &Sink) -> (usize, bool) {
    let mut frames = 0;
    let mut saw_end = false;
    wait_until(|| match sink.buffer_get(false) {
        BufferStatus::Yes(_) => {
            frames += 1;
            false
        }
        BufferStatus::End => {
            saw_end = true;
            true
        }
        BufferStatus::No => false,
    });
    (frames, saw_end)
}

#[derive(Default)]
struct CallbackCounters {
    flushes: AtomicUsize,
    purges: AtomicUsize,
}

impl SinkCallbacks for CallbackCounters {
    fn on_flush(&self, _sink: &Sink) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_purge(&self, _sink: &Sink, _item: pmoplayback::ItemId) {
        self.purges.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn single_sink_single_source_delivers_all_frames_then_end() {
    let playlist = Playlist::new().expect("spawn playlist");
    let sink = Sink::without_callbacks(stereo_48k(), 4096, 0, true);
    sink.attach(&playlist).expect("attach sink");

    playlist.insert(Box::new(SineWaveSource::new(stereo_48k(), 440.0, 0.1)), 1.0, None);

    let (frames, saw_end) = drain_until_end(&sink);
    assert!(frames > 0, "expected at least one data buffer before end");
    assert!(saw_end, "expected an end-of-queue sentinel");
}

#[test]
fn disable_resample_sink_and_mismatched_sink_both_drain_independently() {
    let playlist = Playlist::new().expect("spawn playlist");

    let native_sink = Sink::without_callbacks(mono_44k_flt(), 4096, 0, true);
    native_sink.attach(&playlist).expect("attach native sink");

    playlist.insert(Box::new(SineWaveSource::new(mono_44k_flt(), 220.0, 0.1)), 1.0, None);

    // Force un second groupe de sinks et une reconstruction du graphe de filtres en plein flux.
    let converted_sink = Sink::without_callbacks(stereo_48k(), 4096, 0, false);
    converted_sink.attach(&playlist).expect("attach converted sink");

    let (native_frames, native_end) = drain_until_end(&native_sink);
    let (converted_frames, converted_end) = drain_until_end(&converted_sink);

    assert!(native_frames > 0);
    assert!(native_end);
    assert!(converted_frames > 0);
    assert!(converted_end);
}

#[test]
fn gain_clamped_to_unity_leaves_samples_unattenuated() {
    let playlist = Playlist::new().expect("spawn playlist");
    let sink = Sink::without_callbacks(stereo_48k(), 8192, 0, true);
    sink.attach(&playlist).expect("attach sink");

    // volume * gain = 2.0 * 0.5 = 1.0 après clamp : le nœud de gain est entièrement sauté.
    playlist.insert(Box::new(SineWaveSource::new(stereo_48k(), 440.0, 0.1)), 0.5, None);
    playlist.set_volume(2.0);

    let mut reference = SineWaveSource::new(stereo_48k(), 440.0, 0.1);
    let reference_frame = match reference.read_frame() {
        pmoplayback::ReadOutcome::Frame(f) => f,
        _ => panic!("expected a reference frame"),
    };

    let mut first_data = None;
    wait_until(|| match sink.buffer_get(false) {
        BufferStatus::Yes(buf) => {
            first_data = Some(buf);
            true
        }
        BufferStatus::End => true,
        BufferStatus::No => false,
    });

    let buf = first_data.expect("expected a data buffer before end");
    assert_eq!(buf.planes()[0], reference_frame.data[0]);
}

#[test]
fn removing_the_current_item_fires_purge_callback_once() {
    let playlist = Playlist::new().expect("spawn playlist");
    let counters = Arc::new(CallbackCounters::default());
    let sink = Sink::new(stereo_48k(), 8192, 0, true, counters.clone());
    sink.attach(&playlist).expect("attach sink");

    let item = playlist.insert(Box::new(SineWaveSource::new(stereo_48k(), 440.0, 2.0)), 1.0, None);

    assert!(wait_until(|| sink.queue_bytes() > 0));

    playlist.remove(item);

    assert!(wait_until(|| counters.purges.load(Ordering::SeqCst) == 1));
    assert_eq!(counters.purges.load(Ordering::SeqCst), 1);
}

#[test]
fn seek_during_playback_flushes_queues_and_fires_flush_callback() {
    let playlist = Playlist::new().expect("spawn playlist");
    let counters = Arc::new(CallbackCounters::default());
    let sink = Sink::new(stereo_48k(), 8192, 0, true, counters.clone());
    sink.attach(&playlist).expect("attach sink");

    let item = playlist.insert(Box::new(SineWaveSource::new(stereo_48k(), 440.0, 2.0)), 1.0, None);
    assert!(wait_until(|| sink.queue_bytes() > 0));

    playlist.seek(item, 1.0);

    assert!(wait_until(|| counters.flushes.load(Ordering::SeqCst) == 1));

    let mut saw_position_past_seek = false;
    assert!(wait_until(|| {
        match sink.buffer_get(false) {
            BufferStatus::Yes(buf) => {
                if buf.position_seconds() >= 0.9 {
                    saw_position_past_seek = true;
                }
                saw_position_past_seek
            }
            _ => false,
        }
    }));
    assert!(saw_position_past_seek);
}

#[test]
fn empty_playlist_sends_exactly_one_end_until_new_work_arrives() {
    let playlist = Playlist::new().expect("spawn playlist");
    let sink = Sink::without_callbacks(stereo_48k(), 4096, 0, true);
    sink.attach(&playlist).expect("attach sink");

    playlist.insert(Box::new(SineWaveSource::new(stereo_48k(), 440.0, 0.02)), 1.0, None);
    assert!(wait_until(|| matches!(sink.buffer_get(false), BufferStatus::End)));

    // Pas de nouvel END sans nouveaux items.
    std::thread::sleep(Duration::from_millis(50));
    assert!(matches!(sink.buffer_get(false), BufferStatus::No));

    playlist.insert(Box::new(SineWaveSource::new(stereo_48k(), 440.0, 0.02)), 1.0, None);
    let mut saw_yes_again = false;
    assert!(wait_until(|| {
        if matches!(sink.buffer_get(false), BufferStatus::Yes(_)) {
            saw_yes_again = true;
        }
        saw_yes_again
    }));
}
