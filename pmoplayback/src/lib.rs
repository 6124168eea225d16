#![doc = r#"
pmoplayback - Cœur de décodage de playlist multi-sinks

Un worker de décodage en arrière-plan vide une playlist ordonnée de sources
audio, fait transiter chaque frame décodée par un graphe de filtres qui
applique le gain et la conversion de format par sink, et diffuse les buffers
résultants vers un ou plusieurs [`Sink`]s attachés via des files bornées et
sous contre-pression.

# Architecture

```text
Playlist (liste de sources, curseur de décodage)
    |
    v
thread worker de décodage  --  FilterGraphBuilder (gain -> remix -> resample -> convert)
    |                              |
    v                              v
 AudioSource::read_frame     un Buffer par SinkGroup
                                   |
                                   v
                           Files de sinks (bornées, Arc<Buffer> partagé)
```

# Exemple

```no_run
use pmoplayback::{AudioFormat, Playlist, SampleFormat, Sink, SineWaveSource, LAYOUT_STEREO};

let playlist = Playlist::new().expect("spawn decode worker");
let format = AudioFormat::new(48_000, LAYOUT_STEREO, SampleFormat::S16Planar);
let sink = Sink::without_callbacks(format, 4096, 0, false);
sink.attach(&playlist).expect("attach sink");

let source = SineWaveSource::new(format, 440.0, 1.0);
playlist.insert(Box::new(source), 1.0, None);
```
"#]

mod buffer;
mod dsp;
mod error;
mod filter_graph;
mod format;
mod playlist;
mod playlist_item;
mod queue;
mod sample_types;
mod sink;
mod sink_map;
mod source;
mod worker;

pub use buffer::{Buffer, QueueItem};
pub use error::PlaylistError;
pub use format::{
    AudioFormat, ChannelLayout, SampleFormat, CHANNEL_BACK_LEFT, CHANNEL_BACK_RIGHT,
    CHANNEL_FRONT_CENTER, CHANNEL_FRONT_LEFT, CHANNEL_FRONT_RIGHT, CHANNEL_LOW_FREQUENCY,
    LAYOUT_5POINT1, LAYOUT_MONO, LAYOUT_STEREO,
};
pub use playlist::{AttachSink, Playlist};
pub use playlist_item::ItemId;
pub use sample_types::{Sample, I24};
pub use sink::{BufferStatus, DrainSignal, Sink, SinkCallbacks, SinkId};
pub use sink_map::{SinkGroup, SinkMap};
pub use source::{AudioSource, DecodedFrame, ReadOutcome, SineWaveSource, StreamInfo};
