use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// A playlist as shown in the picker, flattened from Spotify's listing shape
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "SpotifyPlaylist")]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_images: Vec<CoverImage>,
    pub owner_display_name: String,
    pub track_count: u32,
}

impl PlaylistSummary {
    pub fn cover_url(&self) -> Option<&str> {
        self.cover_images.first().map(|image| image.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoverImage {
    pub url: String,
}

/// Playlist object as returned by `GET /v1/me/playlists`
#[derive(Debug, Deserialize)]
struct SpotifyPlaylist {
    id: String,
    name: String,
    description: Option<String>,
    images: Option<Vec<CoverImage>>,
    owner: SpotifyOwner,
    tracks: SpotifyTrackTotals,
}

#[derive(Debug, Deserialize)]
struct SpotifyOwner {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrackTotals {
    total: u32,
}

impl From<SpotifyPlaylist> for PlaylistSummary {
    fn from(raw: SpotifyPlaylist) -> Self {
        PlaylistSummary {
            id: raw.id,
            name: raw.name,
            // Spotify sends "" for playlists without a description
            description: raw.description.filter(|d| !d.is_empty()),
            cover_images: raw.images.unwrap_or_default(),
            owner_display_name: raw.owner.display_name.unwrap_or_default(),
            track_count: raw.tracks.total,
        }
    }
}

/// Response structure for the playlist listing call
#[derive(Debug, Deserialize)]
pub struct PlaylistsPage {
    pub items: Vec<PlaylistSummary>,
}

/// Tokens handed back by the backend after a successful code exchange
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Numeric aggregate over a playlist's tracks, as computed by the analysis backend.
///
/// Every number tolerates being sent as a string; anything missing or
/// unparseable reads as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeSummary {
    #[serde(default, deserialize_with = "lenient_count")]
    pub track_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub artists_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub albums_count: u64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub avg_popularity: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub explicit_ratio: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration_minutes: f64,
    #[serde(default, deserialize_with = "lenient_counts_map")]
    pub top_artists: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_danceability: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_energy: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_valence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_acousticness: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_instrumentalness: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_liveness: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_speechiness: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub avg_tempo: Option<f64>,
    /// Keys the backend sends that we do not model
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl QuantitativeSummary {
    /// Look up any numeric field by its wire name, coercing strings and defaulting to 0
    pub fn numeric(&self, key: &str) -> f64 {
        match key {
            "track_count" => self.track_count as f64,
            "artists_count" => self.artists_count as f64,
            "albums_count" => self.albums_count as f64,
            "avg_popularity" => self.avg_popularity,
            "explicit_ratio" => self.explicit_ratio,
            "duration_minutes" => self.duration_minutes,
            "avg_danceability" => self.avg_danceability.unwrap_or(0.0),
            "avg_energy" => self.avg_energy.unwrap_or(0.0),
            "avg_valence" => self.avg_valence.unwrap_or(0.0),
            "avg_acousticness" => self.avg_acousticness.unwrap_or(0.0),
            "avg_instrumentalness" => self.avg_instrumentalness.unwrap_or(0.0),
            "avg_liveness" => self.avg_liveness.unwrap_or(0.0),
            "avg_speechiness" => self.avg_speechiness.unwrap_or(0.0),
            "avg_tempo" => self.avg_tempo.unwrap_or(0.0),
            other => self.extra.get(other).and_then(coerce_number).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_tracks: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub tracks_analyzed: u64,
}

/// One completed vibe report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub playlist_name: String,
    #[serde(rename = "quantitative_analysis")]
    pub quantitative: QuantitativeSummary,
    #[serde(rename = "ai_vibe_report", default)]
    pub narrative_report: String,
    #[serde(rename = "analysis_metadata", default)]
    pub metadata: AnalysisMetadata,
}

/// Error body the backend sends alongside non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub detail: Option<String>,
}

/// Read a JSON number or numeric string as f64.
///
/// Returns `None` for anything else, including non-finite results.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn coerce_count(value: &Value) -> u64 {
    coerce_number(value)
        .filter(|n| *n > 0.0)
        .map(|n| n.round() as u64)
        .unwrap_or(0)
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value).unwrap_or(0.0))
}

fn lenient_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => Ok(Some(coerce_number(&other).unwrap_or(0.0))),
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_count(&value))
}

fn lenient_counts_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let counts = match value {
        Value::Object(entries) => entries
            .iter()
            .map(|(artist, count)| (artist.clone(), coerce_count(count)))
            .collect(),
        _ => BTreeMap::new(),
    };
    Ok(counts)
}
