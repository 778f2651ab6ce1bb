//! Wire types for the podcast service.

use clipcast_core::words::WordTiming;
use serde::{Deserialize, Serialize};

/// Response body of the create and status endpoints.
///
/// A status response is "ready" once `choices` is present; until then
/// the body only carries the correlation id, an optional human-readable
/// state, and possibly a generation error string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastResponse {
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<PodcastChoice>>,
}

impl PodcastResponse {
    /// A response with `choices` carries the finished podcast.
    pub fn is_ready(&self) -> bool {
        self.choices.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastChoice {
    pub message: PodcastMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastMessage {
    /// Bilingual script, one entry per passage.
    #[serde(default)]
    pub content: Vec<BilingualText>,
    pub audio: PodcastAudio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BilingualText {
    pub original: String,
    pub translated: String,
}

/// The synthesized audio: one full-episode base64 blob plus per-clip
/// trimmed sections with word-level timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastAudio {
    /// Base64-encoded full episode audio.
    pub data: String,
    #[serde(default)]
    pub trimmed: Vec<PodcastClip>,
}

/// One clip boundary inside the episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastClip {
    #[serde(default)]
    pub segments: Vec<ClipSegment>,
    /// Image-search query describing the clip's topic.
    pub query: String,
    pub start_time: f64,
    pub end_time: f64,
    /// Base64-encoded audio for just this clip.
    #[serde(default)]
    pub audio_base64: String,
}

impl PodcastClip {
    /// Decode this clip's base64 audio into raw bytes.
    pub fn decode_audio(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.audio_base64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipSegment {
    #[serde(default)]
    pub words: Vec<WordTiming>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_status_body_deserializes() {
        let body = r#"{"correlationId":"p-1","status":"processing"}"#;
        let resp: PodcastResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.correlation_id.as_deref(), Some("p-1"));
        assert!(!resp.is_ready());
        assert!(resp.error.is_none());
    }

    #[test]
    fn ready_body_with_clips_deserializes() {
        let body = r#"{
            "correlationId": "p-1",
            "choices": [{
                "message": {
                    "content": [{"original": "Hola", "translated": "Hello"}],
                    "audio": {
                        "data": "QUFB",
                        "trimmed": [{
                            "segments": [{"words": [{"word": "Hola", "start": 0.0, "end": 0.4}]}],
                            "query": "madrid skyline",
                            "startTime": 0.0,
                            "endTime": 3.2,
                            "audioBase64": "QkJC"
                        }]
                    }
                }
            }]
        }"#;
        let resp: PodcastResponse = serde_json::from_str(body).unwrap();
        assert!(resp.is_ready());

        let choices = resp.choices.unwrap();
        let clip = &choices[0].message.audio.trimmed[0];
        assert_eq!(clip.query, "madrid skyline");
        assert_eq!(clip.segments[0].words[0].word, "Hola");
        assert_eq!(clip.audio_base64, "QkJC");
    }

    #[test]
    fn clip_audio_decodes_from_base64() {
        let clip = PodcastClip {
            segments: vec![],
            query: "q".into(),
            start_time: 0.0,
            end_time: 1.0,
            audio_base64: "QUFB".into(),
        };
        assert_eq!(clip.decode_audio().unwrap(), b"AAA");
    }

    #[test]
    fn invalid_base64_audio_is_an_error() {
        let clip = PodcastClip {
            segments: vec![],
            query: "q".into(),
            start_time: 0.0,
            end_time: 1.0,
            audio_base64: "!!!not base64!!!".into(),
        };
        assert!(clip.decode_audio().is_err());
    }

    #[test]
    fn error_body_is_not_ready() {
        let body = r#"{"correlationId":"p-1","error":"synthesis failed"}"#;
        let resp: PodcastResponse = serde_json::from_str(body).unwrap();
        assert!(!resp.is_ready());
        assert_eq!(resp.error.as_deref(), Some("synthesis failed"));
    }

    #[test]
    fn response_round_trips_through_cache_serialization() {
        let body = r#"{"correlationId":"p-1","choices":[{"message":{"content":[],"audio":{"data":"QUFB","trimmed":[]}}}]}"#;
        let resp: PodcastResponse = serde_json::from_str(body).unwrap();
        let cached = serde_json::to_string(&resp).unwrap();
        let reread: PodcastResponse = serde_json::from_str(&cached).unwrap();
        assert!(reread.is_ready());
    }
}
