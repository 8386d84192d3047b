//! Audio and video probing.
//!
//! Audio containers are read with symphonia for duration, sample rate and
//! channel count. MP4 video is read with `mp4` for duration, frame rate and
//! frame count, and every 30th frame becomes a `frame` record. Speech is
//! never transcribed, so audio always carries a note saying so.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use reportsmith_shared::{ContentRecord, ExtractionMetadata, FileType, ReportError, Result};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::{Extraction, Extractor};

/// One `frame` record is emitted per this many source frames.
pub const FRAME_SAMPLE_INTERVAL: u64 = 30;

const TRANSCRIPTION_NOTE: &str = "Audio transcription is not available in this build";

/// Extractor for audio or video files.
pub struct MediaExtractor {
    file_type: FileType,
}

impl MediaExtractor {
    pub fn audio() -> Self {
        Self {
            file_type: FileType::Audio,
        }
    }

    pub fn video() -> Self {
        Self {
            file_type: FileType::Video,
        }
    }
}

impl Extractor for MediaExtractor {
    fn file_type(&self) -> FileType {
        self.file_type
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let size = std::fs::metadata(path)
            .map_err(|e| ReportError::io(path, e))?
            .len();

        let mut extraction = Extraction::default();
        extraction.metadata.count("size_bytes", size);

        match self.file_type {
            FileType::Video => extract_video(path, &mut extraction),
            _ => extract_audio(path, &mut extraction.metadata),
        }
        Ok(extraction)
    }

    fn name(&self) -> &str {
        match self.file_type {
            FileType::Video => "video",
            _ => "audio",
        }
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// Stream parameters read from an audio container's default track.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AudioInfo {
    duration_secs: Option<f64>,
    sample_rate: Option<u32>,
    channels: Option<usize>,
}

fn extract_audio(path: &Path, metadata: &mut ExtractionMetadata) {
    match probe_audio(path) {
        Ok(info) => {
            if let Some(secs) = info.duration_secs {
                record_duration(metadata, secs);
            }
            if let Some(rate) = info.sample_rate {
                metadata.count("sample_rate", u64::from(rate));
            }
            if let Some(channels) = info.channels {
                metadata.count("channels", channels as u64);
            }
            metadata.error = Some(TRANSCRIPTION_NOTE.to_string());
        }
        Err(e) => {
            debug!(error = %e, "audio probe failed");
            metadata.error = Some(format!("{TRANSCRIPTION_NOTE}; {e}"));
        }
    }
}

fn probe_audio(path: &Path) -> Result<AudioInfo> {
    let file = File::open(path).map_err(|e| ReportError::io(path, e))?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ReportError::Extraction(format!("audio metadata unreadable: {e}")))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| ReportError::Extraction("audio has no playable track".into()))?;
    let params = &track.codec_params;

    let duration_secs = match (params.time_base, params.n_frames, params.sample_rate) {
        (Some(base), Some(frames), _) => {
            let time = base.calc_time(frames);
            Some(time.seconds as f64 + time.frac)
        }
        (None, Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / f64::from(rate)),
        _ => None,
    };

    Ok(AudioInfo {
        duration_secs,
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count()),
    })
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// Timing read from the first video track of an MP4 file.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VideoInfo {
    duration_secs: f64,
    fps: f64,
    frames: u64,
    width: u16,
    height: u16,
}

fn extract_video(path: &Path, extraction: &mut Extraction) {
    let is_mp4 = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));
    if !is_mp4 {
        extraction.metadata.error =
            Some("Video probing supports MP4 containers only".to_string());
        return;
    }

    match probe_mp4(path) {
        Ok(info) => {
            let metadata = &mut extraction.metadata;
            record_duration(metadata, info.duration_secs);
            metadata.count("frames", info.frames);
            metadata.count("width", u64::from(info.width));
            metadata.count("height", u64::from(info.height));
            metadata
                .attributes
                .insert("fps".to_string(), format!("{:.3}", info.fps));
            extraction.content = sampled_frames(info.frames, info.fps);
        }
        Err(e) => {
            debug!(error = %e, "video probe failed");
            extraction.metadata.error = Some(e.to_string());
        }
    }
}

fn probe_mp4(path: &Path) -> Result<VideoInfo> {
    let file = File::open(path).map_err(|e| ReportError::io(path, e))?;
    let size = file.metadata().map_err(|e| ReportError::io(path, e))?.len();
    let reader = mp4::Mp4Reader::read_header(BufReader::new(file), size)
        .map_err(|e| ReportError::Extraction(format!("video metadata unreadable: {e}")))?;

    let (_, track) = reader
        .tracks()
        .iter()
        .filter(|(_, t)| matches!(t.track_type(), Ok(mp4::TrackType::Video)))
        .min_by_key(|(id, _)| **id)
        .ok_or_else(|| ReportError::Extraction("video has no video track".into()))?;

    let track_secs = track.duration().as_secs_f64();
    Ok(VideoInfo {
        duration_secs: if track_secs > 0.0 {
            track_secs
        } else {
            reader.duration().as_secs_f64()
        },
        fps: track.frame_rate(),
        frames: u64::from(track.sample_count()),
        width: track.width(),
        height: track.height(),
    })
}

/// Frame records for every [`FRAME_SAMPLE_INTERVAL`]th source frame,
/// starting at frame 0.
fn sampled_frames(frames: u64, fps: f64) -> Vec<ContentRecord> {
    if fps.is_nan() || fps <= 0.0 {
        return Vec::new();
    }
    (0..frames)
        .step_by(FRAME_SAMPLE_INTERVAL as usize)
        .map(|frame| ContentRecord::Frame {
            frame,
            timestamp_secs: frame as f64 / fps,
        })
        .collect()
}

fn record_duration(metadata: &mut ExtractionMetadata, secs: f64) {
    metadata.count("duration_ms", (secs * 1000.0).round() as u64);
    metadata
        .attributes
        .insert("duration_secs".to_string(), format!("{secs:.3}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::fixtures::Scratch;

    /// 16-bit PCM mono WAV with `samples` silent samples.
    fn wav(sample_rate: u32, samples: u32) -> Vec<u8> {
        let data_len = samples * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);
        bytes
    }

    #[test]
    fn wav_reports_duration_and_format() {
        let scratch = Scratch::new("media-wav");
        let path = scratch.path("memo.wav");
        let bytes = wav(8000, 12_000);
        std::fs::write(&path, &bytes).unwrap();

        let extraction = MediaExtractor::audio().extract(&path).unwrap();
        let metadata = &extraction.metadata;
        assert!(extraction.content.is_empty());
        assert_eq!(metadata.counters["size_bytes"], bytes.len() as u64);
        assert_eq!(metadata.counters["duration_ms"], 1500);
        assert_eq!(metadata.counters["sample_rate"], 8000);
        assert_eq!(metadata.counters["channels"], 1);
        assert_eq!(metadata.attributes["duration_secs"], "1.500");
        assert_eq!(metadata.error.as_deref(), Some(TRANSCRIPTION_NOTE));
    }

    #[test]
    fn unreadable_audio_keeps_size_and_note() {
        let scratch = Scratch::new("media-bad-audio");
        let path = scratch.path("call.mp3");
        std::fs::write(&path, [0u8; 42]).unwrap();

        let extraction = MediaExtractor::audio().extract(&path).unwrap();
        assert_eq!(extraction.metadata.counters["size_bytes"], 42);
        assert!(!extraction.metadata.counters.contains_key("duration_ms"));
        let note = extraction.metadata.error.unwrap();
        assert!(note.starts_with(TRANSCRIPTION_NOTE));
        assert!(note.contains("unreadable") || note.contains("no playable track"));
    }

    #[test]
    fn non_mp4_video_is_annotated() {
        let scratch = Scratch::new("media-avi");
        let path = scratch.path("clip.avi");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let extraction = MediaExtractor::video().extract(&path).unwrap();
        assert!(extraction.content.is_empty());
        assert_eq!(extraction.metadata.counters["size_bytes"], 16);
        assert!(extraction.metadata.error.unwrap().contains("MP4"));
    }

    #[test]
    fn corrupt_mp4_is_annotated() {
        let scratch = Scratch::new("media-mp4");
        let path = scratch.path("clip.mp4");
        std::fs::write(&path, b"definitely not an mp4 file").unwrap();

        let extraction = MediaExtractor::video().extract(&path).unwrap();
        assert!(extraction.content.is_empty());
        assert!(extraction.metadata.error.is_some());
    }

    #[test]
    fn every_thirtieth_frame_is_sampled() {
        let frames = sampled_frames(95, 30.0);
        assert_eq!(
            frames,
            vec![
                ContentRecord::Frame { frame: 0, timestamp_secs: 0.0 },
                ContentRecord::Frame { frame: 30, timestamp_secs: 1.0 },
                ContentRecord::Frame { frame: 60, timestamp_secs: 2.0 },
                ContentRecord::Frame { frame: 90, timestamp_secs: 3.0 },
            ]
        );
        assert!(sampled_frames(95, 0.0).is_empty());
        assert!(sampled_frames(0, 25.0).is_empty());
    }

    #[test]
    fn registry_routes_media_by_extension() {
        let scratch = Scratch::new("media-registry");
        let path = scratch.path("memo.wav");
        std::fs::write(&path, wav(16_000, 16_000)).unwrap();

        let extracted = crate::ExtractorRegistry::new().extract_file(&path, "memo.wav");
        assert_eq!(extracted.file_type, FileType::Audio);
        assert_eq!(extracted.metadata.counters["duration_ms"], 1000);
        assert!(extracted.conforms());
    }
}
