//! Track records built from detection results
//!
//! A record is what the rest of the app shows and mixes with: display title,
//! rounded BPM, key in both notations, harmonic neighbours and cue points.

use serde::{Deserialize, Serialize};
use slam_analysis::{CamelotKey, DetectionResult, Mode};
use std::path::Path;

/// Waveform colors, assigned round-robin by track index
pub const WAVEFORM_COLORS: [&str; 18] = [
    "#00F0FF", "#FF006E", "#00FF00", "#FFFF00", "#FF00FF", "#00FFFF", "#FF8800", "#8800FF",
    "#FF0088", "#88FF00", "#0088FF", "#FF8888", "#88FF88", "#8888FF", "#FFAA00", "#AA00FF",
    "#00FFAA", "#FF00AA",
];

/// Beats between cue points (16 bars of 4/4)
const BEATS_PER_CUE: f64 = 64.0;

/// No cue point is placed this close to the end
const CUE_END_MARGIN_SECS: f64 = 10.0;

/// One analyzed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub bpm: Option<u32>,
    /// Root name, e.g. "Db"
    pub key: Option<String>,
    pub key_mode: Option<Mode>,
    /// e.g. "8A"
    pub camelot_code: Option<String>,
    /// Same key, relative key and both wheel neighbours
    #[serde(default)]
    pub compatible_keys: Vec<String>,
    #[serde(rename = "duration")]
    pub duration_secs: Option<u32>,
    pub filename: String,
    #[serde(default)]
    pub cue_points: Vec<u32>,
    pub waveform_color: String,
    #[serde(default)]
    pub needs_verification: bool,
}

impl TrackRecord {
    /// Build a record for `filename` from its detection result
    ///
    /// `index` is the track's position in the library and picks its color.
    pub fn from_detection(
        filename: &str,
        artist: &str,
        result: &DetectionResult,
        duration_secs: Option<u32>,
        index: usize,
    ) -> Self {
        let bpm = result.rounded_bpm();
        let camelot = result.key.map(|k| k.camelot());

        let cue_points = match duration_secs {
            Some(duration) => cue_points(duration, bpm as f32),
            None => vec![0],
        };

        Self {
            id: track_id(filename),
            title: title_from_filename(filename),
            artist: artist.to_string(),
            bpm: (bpm > 0).then_some(bpm),
            key: result.key.map(|k| k.root.name().to_string()),
            key_mode: result.key.map(|k| k.mode),
            camelot_code: camelot.map(|c| c.to_string()),
            compatible_keys: camelot
                .map(|c| c.compatible_keys().iter().map(|k| k.to_string()).collect())
                .unwrap_or_default(),
            duration_secs,
            filename: filename.to_string(),
            cue_points,
            waveform_color: waveform_color(index).to_string(),
            needs_verification: result.needs_verification,
        }
    }

    /// Parsed Camelot key, if the record has a valid one
    pub fn camelot(&self) -> Option<CamelotKey> {
        self.camelot_code.as_deref().and_then(CamelotKey::parse)
    }

    /// Whether the two tracks can be mixed harmonically
    ///
    /// False when either key is unknown.
    pub fn is_harmonic_match(&self, other: &TrackRecord) -> bool {
        match (self.camelot(), other.camelot()) {
            (Some(a), Some(b)) => a.is_compatible(&b),
            _ => false,
        }
    }
}

/// Track id: the filename without its extension
pub fn track_id(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

/// Display title derived from a filename
///
/// `deep-house-groove-12345.mp3` becomes `Deep House Groove`.
pub fn title_from_filename(filename: &str) -> String {
    let stem = track_id(filename);
    let stem = strip_numeric_suffix(&stem);

    stem.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cue points in whole seconds: the start, then every 16 bars
///
/// Stops once a point would fall within 10 s of the end.
pub fn cue_points(duration_secs: u32, bpm: f32) -> Vec<u32> {
    let mut points = vec![0];
    if !bpm.is_finite() || bpm <= 0.0 {
        return points;
    }

    let step = BEATS_PER_CUE * 60.0 / bpm as f64;
    let limit = duration_secs as f64 - CUE_END_MARGIN_SECS;
    let mut t = step;
    while t < limit {
        points.push(t as u32);
        t += step;
    }
    points
}

pub fn waveform_color(index: usize) -> &'static str {
    WAVEFORM_COLORS[index % WAVEFORM_COLORS.len()]
}

/// Remove a trailing `-<digits>` run (stock-library upload ids)
fn strip_numeric_suffix(stem: &str) -> &str {
    match stem.rsplit_once('-') {
        Some((head, tail))
            if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => stem,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slam_analysis::{MusicalKey, PitchClass};

    fn result(bpm: f32, key: Option<MusicalKey>) -> DetectionResult {
        DetectionResult {
            bpm,
            bpm_confidence: 92,
            bpm_candidates: Vec::new(),
            bpm_adjusted: false,
            original_bpm: None,
            key,
            key_confidence: 80,
            key_candidates: Vec::new(),
            needs_verification: true,
            verification_reason: Some("key confidence 80% below 90%".to_string()),
            detection_time_ms: 40,
        }
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(
            title_from_filename("deep-house-groove-12345.mp3"),
            "Deep House Groove"
        );
        assert_eq!(title_from_filename("summer_VIBES.wav"), "Summer Vibes");
        assert_eq!(title_from_filename("track-2-remix.mp3"), "Track 2 Remix");
        // A name that is only digits keeps them
        assert_eq!(title_from_filename("2024.mp3"), "2024");
    }

    #[test]
    fn test_track_id() {
        assert_eq!(track_id("deep-house-groove-12345.mp3"), "deep-house-groove-12345");
        assert_eq!(track_id("no_extension"), "no_extension");
    }

    #[test]
    fn test_cue_points_every_16_bars() {
        // 120 BPM: 64 beats = 32 s
        assert_eq!(cue_points(180, 120.0), vec![0, 32, 64, 96, 128, 160]);
        // 128 BPM: 30 s step, 150 is within 10 s of the end
        assert_eq!(cue_points(160, 128.0), vec![0, 30, 60, 90, 120]);
    }

    #[test]
    fn test_cue_points_short_or_invalid() {
        assert_eq!(cue_points(20, 120.0), vec![0]);
        assert_eq!(cue_points(0, 120.0), vec![0]);
        assert_eq!(cue_points(300, 0.0), vec![0]);
        assert_eq!(cue_points(300, f32::NAN), vec![0]);
    }

    #[test]
    fn test_waveform_color_wraps() {
        assert_eq!(waveform_color(0), "#00F0FF");
        assert_eq!(waveform_color(17), "#FF00AA");
        assert_eq!(waveform_color(18), "#00F0FF");
    }

    #[test]
    fn test_from_detection() {
        let key = MusicalKey::new(PitchClass::A, Mode::Minor);
        let record = TrackRecord::from_detection(
            "night-drive-4411.mp3",
            "Pixabay",
            &result(127.6, Some(key)),
            Some(200),
            3,
        );

        assert_eq!(record.id, "night-drive-4411");
        assert_eq!(record.title, "Night Drive");
        assert_eq!(record.artist, "Pixabay");
        assert_eq!(record.bpm, Some(128));
        assert_eq!(record.key.as_deref(), Some("A"));
        assert_eq!(record.key_mode, Some(Mode::Minor));
        assert_eq!(record.camelot_code.as_deref(), Some("8A"));
        assert_eq!(record.compatible_keys, vec!["8A", "8B", "7A", "9A"]);
        assert_eq!(record.cue_points, vec![0, 30, 60, 90, 120, 150, 180]);
        assert_eq!(record.waveform_color, "#FFFF00");
        assert!(record.needs_verification);
    }

    #[test]
    fn test_from_detection_without_key() {
        let record =
            TrackRecord::from_detection("loop.wav", "Unknown", &result(120.0, None), None, 0);
        assert_eq!(record.key, None);
        assert_eq!(record.camelot_code, None);
        assert!(record.compatible_keys.is_empty());
        assert_eq!(record.cue_points, vec![0]);
    }

    #[test]
    fn test_harmonic_match() {
        let a_minor = MusicalKey::new(PitchClass::A, Mode::Minor);
        let c_major = MusicalKey::new(PitchClass::C, Mode::Major);
        let f_sharp_major = MusicalKey::new(PitchClass::Gb, Mode::Major);

        let a = TrackRecord::from_detection("a.mp3", "x", &result(120.0, Some(a_minor)), None, 0);
        let c = TrackRecord::from_detection("c.mp3", "x", &result(120.0, Some(c_major)), None, 1);
        let fs =
            TrackRecord::from_detection("f.mp3", "x", &result(120.0, Some(f_sharp_major)), None, 2);
        let none = TrackRecord::from_detection("n.mp3", "x", &result(120.0, None), None, 3);

        assert!(a.is_harmonic_match(&c));
        assert!(!a.is_harmonic_match(&fs));
        assert!(!a.is_harmonic_match(&none));
    }

    #[test]
    fn test_serializes_manifest_layout() {
        let record = TrackRecord::from_detection(
            "beat-1.mp3",
            "Pixabay",
            &result(120.0, None),
            Some(60),
            0,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["duration"], serde_json::json!(60));
        assert_eq!(json["cuePoints"], serde_json::json!([0, 32]));
        assert_eq!(json["waveformColor"], serde_json::json!("#00F0FF"));
    }
}
