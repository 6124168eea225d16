//! Construit et reconstruit la topologie décodage→gain→split→conversion de
//! format par groupe, et y fait transiter une frame décodée.
//!
//! S'inspire d'`init_filter_graph`/`maybe_init_filter_graph` de
//! `playlist.c` (comparaison de snapshot puis reconstruction) et de la boucle
//! de sortie par groupe de sinks d'`audio_decode_frame`, retravaillées autour
//! des noyaux [`crate::dsp`] de ce crate au lieu du graphe `avfilter` de libav.

use bytemuck::cast_slice;

use crate::buffer::Buffer;
use crate::dsp::{apply_gain_planar, convert_sample_format, remix_channels, Resampler};
use crate::error::PlaylistError;
use crate::format::{AudioFormat, SampleFormat};
use crate::playlist_item::ItemId;
use crate::sink_map::SinkMap;
use crate::source::{DecodedFrame, StreamInfo};

#[derive(Clone, PartialEq)]
struct GroupFingerprint {
    channels: u16,
    sample_rate: u32,
    sample_fmt: SampleFormat,
    disable_resample: bool,
}

#[derive(Clone, PartialEq)]
struct Snapshot {
    time_base: (i64, i64),
    sample_rate: u32,
    sample_fmt: SampleFormat,
    channel_layout: u64,
    effective_gain: f64,
    groups: Vec<GroupFingerprint>,
}

struct GroupNode {
    target_format: AudioFormat,
    disable_resample: bool,
    resampler: Option<Resampler>,
}

/// Possède la topologie de graphe courante et le snapshot à partir duquel
/// elle a été construite. Vit entièrement sur le thread du worker de
/// décodage ; aucun autre thread n'y touche.
#[derive(Default)]
pub struct FilterGraphBuilder {
    snapshot: Option<Snapshot>,
    nodes: Vec<GroupNode>,
}

impl FilterGraphBuilder {
    /// Reconstruit le graphe si les infos de flux de la source, le gain
    /// effectif, la forme de la table des sinks, ou `rebuild_flag` ont changé
    /// depuis la dernière construction.
    pub fn maybe_rebuild(
        &mut self,
        stream: StreamInfo,
        effective_gain: f64,
        sink_map: &SinkMap,
        rebuild_flag: &mut bool,
    ) -> Result<(), PlaylistError> {
        let groups: Vec<GroupFingerprint> = sink_map
            .groups()
            .iter()
            .map(|g| {
                let rep = g.representative();
                GroupFingerprint {
                    channels: rep.audio_format().channels(),
                    sample_rate: rep.audio_format().sample_rate,
                    sample_fmt: rep.audio_format().sample_fmt,
                    disable_resample: rep.disable_resample(),
                }
            })
            .collect();

        let candidate = Snapshot {
            time_base: stream.time_base,
            sample_rate: stream.format.sample_rate,
            sample_fmt: stream.format.sample_fmt,
            channel_layout: stream.format.channel_layout,
            effective_gain,
            groups,
        };

        let needs_rebuild = *rebuild_flag || self.snapshot.as_ref() != Some(&candidate);
        if !needs_rebuild {
            return Ok(());
        }

        let mut nodes = Vec::with_capacity(sink_map.groups().len());
        for (group, fingerprint) in sink_map.groups().iter().zip(&candidate.groups) {
            let target_format = group.representative().audio_format();
            let resampler = if !fingerprint.disable_resample
                && fingerprint.sample_rate != stream.format.sample_rate
            {
                match Resampler::new(stream.format.sample_rate, fingerprint.sample_rate, fingerprint.channels) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        tracing::error!(error = %e, "filter graph rebuild failed");
                        return Err(e);
                    }
                }
            } else {
                None
            };
            nodes.push(GroupNode {
                target_format,
                disable_resample: fingerprint.disable_resample,
                resampler,
            });
        }

        self.nodes = nodes;
        self.snapshot = Some(candidate);
        *rebuild_flag = false;
        tracing::debug!(groups = sink_map.count(), gain = effective_gain, "filter graph rebuilt");
        Ok(())
    }

    /// Fait transiter une frame décodée par le graphe courant, produisant un
    /// [`Buffer`] de sortie par groupe de sinks (aligné par index avec
    /// `sink_map.groups()` tel qu'il était lors du dernier
    /// [`Self::maybe_rebuild`]).
    pub fn process(
        &mut self,
        frame: &DecodedFrame,
        source_format: AudioFormat,
        effective_gain: f64,
        item: ItemId,
        position_seconds: f64,
    ) -> Result<Vec<Buffer>, PlaylistError> {
        let clamped_gain = effective_gain.clamp(0.0, 1.0);
        let mut gained = frame.data.clone();
        apply_gain_planar(&mut gained, source_format.sample_fmt, clamped_gain);

        let mut outputs = Vec::with_capacity(self.nodes.len());
        for node in &mut self.nodes {
            if node.disable_resample {
                outputs.push(Buffer::new(
                    item,
                    position_seconds,
                    gained.clone(),
                    frame.frame_count,
                    source_format,
                ));
                continue;
            }

            let target_channels = node.target_format.channels() as usize;
            let remixed = remix_channels(&gained, source_format.sample_fmt, target_channels);
            let as_flt = convert_sample_format(&remixed, source_format.sample_fmt, SampleFormat::FltPlanar);

            let (resampled_flt, out_frame_count) = match node.resampler.as_mut() {
                Some(resampler) => {
                    let f32_planes: Vec<Vec<f32>> =
                        as_flt.iter().map(|p| cast_slice::<u8, f32>(p).to_vec()).collect();
                    let out = resampler.process(&f32_planes)?;
                    let out_len = out.first().map(|p| p.len()).unwrap_or(0);
                    let out_bytes: Vec<Vec<u8>> =
                        out.into_iter().map(|p| bytemuck::cast_slice(&p).to_vec()).collect();
                    (out_bytes, out_len)
                }
                None => (as_flt, frame.frame_count),
            };

            let final_planes =
                convert_sample_format(&resampled_flt, SampleFormat::FltPlanar, node.target_format.sample_fmt);
            outputs.push(Buffer::new(
                item,
                position_seconds,
                final_planes,
                out_frame_count,
                node.target_format,
            ));
        }

        Ok(outputs)
    }

    pub fn group_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{LAYOUT_STEREO, SampleFormat as Fmt};
    use crate::sink::Sink;
    use crate::sink_map::SinkMap;

    fn stream(rate: u32) -> StreamInfo {
        StreamInfo {
            format: AudioFormat::new(rate, LAYOUT_STEREO, Fmt::S16Planar),
            time_base: (1, rate as i64),
            start_time: Some(0),
        }
    }

    #[test]
    fn rebuild_is_skipped_when_nothing_changed() {
        let mut graph = FilterGraphBuilder::default();
        let mut map = SinkMap::default();
        map.add(Sink::without_callbacks(stream(48_000).format, 4096, 0, true));
        let mut flag = false;

        graph.maybe_rebuild(stream(48_000), 1.0, &map, &mut flag).unwrap();
        let first_group_count = graph.group_count();
        graph.maybe_rebuild(stream(48_000), 1.0, &map, &mut flag).unwrap();
        assert_eq!(graph.group_count(), first_group_count);
    }

    #[test]
    fn gain_changes_trigger_rebuild_without_explicit_flag() {
        let mut graph = FilterGraphBuilder::default();
        let mut map = SinkMap::default();
        map.add(Sink::without_callbacks(stream(48_000).format, 4096, 0, true));
        let mut flag = false;

        graph.maybe_rebuild(stream(48_000), 1.0, &map, &mut flag).unwrap();
        graph.maybe_rebuild(stream(48_000), 0.5, &map, &mut flag).unwrap();
        assert_eq!(graph.group_count(), 1);
    }

    #[test]
    fn disable_resample_sink_passes_frame_through_unchanged_format() {
        let mut graph = FilterGraphBuilder::default();
        let mut map = SinkMap::default();
        map.add(Sink::without_callbacks(stream(44_100).format, 4096, 0, true));
        let mut flag = false;
        graph.maybe_rebuild(stream(44_100), 1.0, &map, &mut flag).unwrap();

        let frame = DecodedFrame {
            data: vec![vec![0u8; 8], vec![0u8; 8]],
            frame_count: 2,
            pts: Some(0),
        };
        let out = graph
            .process(&frame, stream(44_100).format, 1.0, ItemId::for_test(1), 0.0)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].format(), stream(44_100).format);
    }
}
