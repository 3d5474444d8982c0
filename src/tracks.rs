use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscriptError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub video_id: String,
    pub url: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
}

/// Caption tracks keyed by language code, remembering insertion order.
#[derive(Debug, Clone, Default)]
pub struct TrackBucket {
    order: Vec<String>,
    tracks: HashMap<String, CaptionTrack>,
}

impl TrackBucket {
    pub fn insert(&mut self, track: CaptionTrack) {
        let code = track.language_code.clone();
        if self.tracks.insert(code.clone(), track).is_none() {
            self.order.push(code);
        }
    }

    pub fn get(&self, language_code: &str) -> Option<&CaptionTrack> {
        self.tracks.get(language_code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|c| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Manual and auto-generated tracks of one video. An ASR track never
/// shadows a manual track with the same code because they live apart.
#[derive(Debug, Clone, Default)]
pub struct TranscriptIndex {
    pub video_id: String,
    pub manual: TrackBucket,
    pub generated: TrackBucket,
}

impl TranscriptIndex {
    pub fn build(video_id: &str, tracks: Vec<CaptionTrack>) -> Self {
        let mut index = TranscriptIndex {
            video_id: video_id.to_string(),
            ..Default::default()
        };
        for track in tracks {
            if track.is_generated {
                index.generated.insert(track);
            } else {
                index.manual.insert(track);
            }
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.manual.is_empty() && self.generated.is_empty()
    }

    /// Manual codes first, then generated codes not seen yet.
    pub fn available_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();
        for code in self.manual.codes().chain(self.generated.codes()) {
            if !languages.iter().any(|l| l == code) {
                languages.push(code.to_string());
            }
        }
        languages
    }

    /// Two passes over the preferences: every manual track is considered
    /// before any generated one.
    pub fn select<S: AsRef<str>>(&self, preferred_languages: &[S]) -> Result<&CaptionTrack> {
        if let Some(track) = self.find_manually_created(preferred_languages) {
            tracing::debug!(language = %track.language_code, "manual transcript selected");
            return Ok(track);
        }
        if let Some(track) = self.find_generated(preferred_languages) {
            tracing::debug!(language = %track.language_code, "generated transcript selected");
            return Ok(track);
        }
        Err(TranscriptError::NoTranscriptAvailable(
            self.video_id.clone(),
            preferred_languages
                .iter()
                .map(|l| l.as_ref().to_string())
                .collect(),
        ))
    }

    pub fn find_manually_created<S: AsRef<str>>(&self, languages: &[S]) -> Option<&CaptionTrack> {
        languages.iter().find_map(|l| self.manual.get(l.as_ref()))
    }

    pub fn find_generated<S: AsRef<str>>(&self, languages: &[S]) -> Option<&CaptionTrack> {
        languages.iter().find_map(|l| self.generated.get(l.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(code: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            video_id: "test".to_string(),
            url: format!("https://example.com/{}{}", code, if generated { "/asr" } else { "" }),
            language: code.to_uppercase(),
            language_code: code.to_string(),
            is_generated: generated,
        }
    }

    #[test]
    fn generated_track_used_only_without_manual_match() {
        let index = TranscriptIndex::build("test", vec![track("en", false), track("pt", true)]);
        // Manual "en" outranks generated "pt" even though "pt" is preferred.
        let selected = index.select(&["pt", "en"]).unwrap();
        assert_eq!(selected.language_code, "en");
        assert!(!selected.is_generated);

        let index = TranscriptIndex::build("test", vec![track("pt", true)]);
        let selected = index.select(&["pt", "en"]).unwrap();
        assert_eq!(selected.language_code, "pt");
        assert!(selected.is_generated);
    }

    #[test]
    fn manual_preferred_language_wins() {
        let index = TranscriptIndex::build(
            "test",
            vec![track("en", false), track("pt", true), track("pt", false)],
        );
        let selected = index.select(&["pt", "en"]).unwrap();
        assert_eq!(selected.language_code, "pt");
        assert!(!selected.is_generated);
    }

    #[test]
    fn no_match_names_attempted_languages() {
        let index = TranscriptIndex::build("vid", vec![track("de", false)]);
        match index.select(&["pt", "en"]) {
            Err(TranscriptError::NoTranscriptAvailable(video, langs)) => {
                assert_eq!(video, "vid");
                assert_eq!(langs, vec!["pt", "en"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn available_languages_dedupe_in_order() {
        let index = TranscriptIndex::build(
            "test",
            vec![
                track("es", true),
                track("en", false),
                track("pt", true),
                track("en", true),
                track("de", false),
            ],
        );
        assert_eq!(index.available_languages(), vec!["en", "de", "es", "pt"]);
    }

    #[test]
    fn generated_never_shadows_manual() {
        let index = TranscriptIndex::build("test", vec![track("en", false), track("en", true)]);
        assert_eq!(index.manual.len(), 1);
        assert_eq!(index.generated.len(), 1);
        assert!(!index.manual.get("en").unwrap().is_generated);
    }
}
