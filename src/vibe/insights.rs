use crate::models::QuantitativeSummary;
use std::cmp::Ordering;

pub const TOP_ARTISTS_LIMIT: usize = 5;

/// Tempo that fills the tempo bar completely
pub const TEMPO_DISPLAY_CEILING_BPM: f64 = 200.0;

/// Everything the vibe report says about a playlist beyond the raw numbers
#[derive(Debug, Clone, PartialEq)]
pub struct InsightSet {
    pub diversity: DiversityInsight,
    pub mood: MoodProfile,
    pub listening: ListeningProfile,
    pub popularity: PopularityTrend,
    pub features: Vec<FeatureBar>,
    pub top_artists: Vec<ArtistBar>,
    pub summary: SummaryFigures,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversityInsight {
    /// Distinct artists per track
    pub ratio: f64,
    pub score_percent: u32,
    pub tier: DiversityTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiversityTier {
    ExploresManyArtists,
    BalancedMix,
    SticksWithFavorites,
}

impl DiversityTier {
    pub fn label(&self) -> &'static str {
        match self {
            DiversityTier::ExploresManyArtists => "explores many artists",
            DiversityTier::BalancedMix => "balanced mix",
            DiversityTier::SticksWithFavorites => "sticks with favorites",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiversityTier::ExploresManyArtists => "You love exploring different artists!",
            DiversityTier::BalancedMix => "You have a balanced mix of artists",
            DiversityTier::SticksWithFavorites => "You tend to stick with favorite artists",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodProfile {
    pub valence: f64,
    pub energy: f64,
    pub mood: Mood,
    pub energy_level: EnergyLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    UpbeatPositive,
    BalancedMellow,
    DeepIntrospective,
}

impl Mood {
    pub fn label(&self) -> &'static str {
        match self {
            Mood::UpbeatPositive => "Upbeat & Positive",
            Mood::BalancedMellow => "Balanced & Mellow",
            Mood::DeepIntrospective => "Deep & Introspective",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyLevel {
    High,
    Mixed,
    Relaxed,
}

impl EnergyLevel {
    pub fn description(&self) -> &'static str {
        match self {
            EnergyLevel::High => "High energy tracks dominate your playlist",
            EnergyLevel::Mixed => "You enjoy a mix of energetic and calm music",
            EnergyLevel::Relaxed => "You prefer more relaxed, chill vibes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListeningProfile {
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub style: ListeningStyle,
    pub prefers_instrumental: bool,
}

impl ListeningProfile {
    pub fn vocal_description(&self) -> &'static str {
        if self.prefers_instrumental {
            "You appreciate instrumental music"
        } else {
            "You prefer music with vocals"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningStyle {
    AcousticLover,
    MixedPreferences,
    ElectronicEnthusiast,
}

impl ListeningStyle {
    pub fn label(&self) -> &'static str {
        match self {
            ListeningStyle::AcousticLover => "Acoustic Lover",
            ListeningStyle::MixedPreferences => "Mixed Preferences",
            ListeningStyle::ElectronicEnthusiast => "Electronic Enthusiast",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopularityTrend {
    MainstreamLover,
    BalancedTaste,
    UndergroundExplorer,
}

impl PopularityTrend {
    pub fn label(&self) -> &'static str {
        match self {
            PopularityTrend::MainstreamLover => "Mainstream Lover",
            PopularityTrend::BalancedTaste => "Balanced Taste",
            PopularityTrend::UndergroundExplorer => "Underground Explorer",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PopularityTrend::MainstreamLover => "You enjoy popular, well-known tracks",
            PopularityTrend::BalancedTaste => "You have a mix of popular and niche music",
            PopularityTrend::UndergroundExplorer => {
                "You discover hidden gems and lesser-known artists"
            }
        }
    }
}

/// Audio features shown as bars, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFeature {
    Danceability,
    Energy,
    Valence,
    Acousticness,
    Instrumentalness,
    Liveness,
    Speechiness,
    Tempo,
}

impl AudioFeature {
    pub const ALL: [AudioFeature; 8] = [
        AudioFeature::Danceability,
        AudioFeature::Energy,
        AudioFeature::Valence,
        AudioFeature::Acousticness,
        AudioFeature::Instrumentalness,
        AudioFeature::Liveness,
        AudioFeature::Speechiness,
        AudioFeature::Tempo,
    ];

    /// Key of the average in the quantitative summary
    pub fn summary_key(&self) -> &'static str {
        match self {
            AudioFeature::Danceability => "avg_danceability",
            AudioFeature::Energy => "avg_energy",
            AudioFeature::Valence => "avg_valence",
            AudioFeature::Acousticness => "avg_acousticness",
            AudioFeature::Instrumentalness => "avg_instrumentalness",
            AudioFeature::Liveness => "avg_liveness",
            AudioFeature::Speechiness => "avg_speechiness",
            AudioFeature::Tempo => "avg_tempo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudioFeature::Danceability => "Danceability",
            AudioFeature::Energy => "Energy",
            AudioFeature::Valence => "Valence",
            AudioFeature::Acousticness => "Acousticness",
            AudioFeature::Instrumentalness => "Instrumental",
            AudioFeature::Liveness => "Liveness",
            AudioFeature::Speechiness => "Speechiness",
            AudioFeature::Tempo => "Tempo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureBar {
    pub feature: AudioFeature,
    /// Average as sent by the backend (BPM for tempo)
    pub raw: f64,
    /// Bar fill, 0..=100 for well-formed input
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistBar {
    pub name: String,
    pub count: u64,
    /// Width relative to the most frequent artist in the top list
    pub width_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryFigures {
    pub track_count: u64,
    pub artists_count: u64,
    pub albums_count: u64,
    pub popularity_percent: u32,
    pub total_minutes: u64,
    pub avg_seconds_per_track: f64,
    pub album_ratio: f64,
    pub album_variety: AlbumVariety,
    pub explicit_percent: u32,
    pub explicit_content: ExplicitContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumVariety {
    VeryDiverse,
    GoodVariety,
    Focused,
}

impl AlbumVariety {
    pub fn description(&self) -> &'static str {
        match self {
            AlbumVariety::VeryDiverse => "Very diverse albums",
            AlbumVariety::GoodVariety => "Good album variety",
            AlbumVariety::Focused => "Focused on specific albums",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitContent {
    MostlyExplicit,
    SomeExplicit,
    Clean,
}

impl ExplicitContent {
    pub fn description(&self) -> &'static str {
        match self {
            ExplicitContent::MostlyExplicit => "Mostly explicit content",
            ExplicitContent::SomeExplicit => "Some explicit content",
            ExplicitContent::Clean => "Clean playlist",
        }
    }
}

/// Derive the categorical insights for a quantitative summary.
///
/// Pure: the same summary always yields the same insights. Every threshold is a
/// strict `>`, so a value sitting exactly on a boundary lands in the lower tier.
pub fn derive_insights(summary: &QuantitativeSummary) -> InsightSet {
    InsightSet {
        diversity: diversity(summary),
        mood: mood_profile(summary),
        listening: listening_profile(summary),
        popularity: popularity_trend(summary.avg_popularity),
        features: feature_bars(summary),
        top_artists: top_artists(summary),
        summary: summary_figures(summary),
    }
}

/// `numerator / denominator`, or 0 when there is nothing to divide by
fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn three_tier<T: Copy>(value: f64, upper: f64, lower: f64, tiers: [T; 3]) -> T {
    if value > upper {
        tiers[0]
    } else if value > lower {
        tiers[1]
    } else {
        tiers[2]
    }
}

fn rounded_percent(value: f64) -> u32 {
    (value * 100.0).round().max(0.0) as u32
}

fn diversity(summary: &QuantitativeSummary) -> DiversityInsight {
    let ratio = safe_ratio(summary.artists_count as f64, summary.track_count as f64);
    DiversityInsight {
        ratio,
        score_percent: rounded_percent(ratio),
        tier: three_tier(
            ratio,
            0.7,
            0.4,
            [
                DiversityTier::ExploresManyArtists,
                DiversityTier::BalancedMix,
                DiversityTier::SticksWithFavorites,
            ],
        ),
    }
}

fn mood_profile(summary: &QuantitativeSummary) -> MoodProfile {
    let valence = summary.numeric("avg_valence");
    let energy = summary.numeric("avg_energy");
    MoodProfile {
        valence,
        energy,
        mood: three_tier(
            valence,
            0.6,
            0.4,
            [Mood::UpbeatPositive, Mood::BalancedMellow, Mood::DeepIntrospective],
        ),
        energy_level: three_tier(
            energy,
            0.7,
            0.4,
            [EnergyLevel::High, EnergyLevel::Mixed, EnergyLevel::Relaxed],
        ),
    }
}

fn listening_profile(summary: &QuantitativeSummary) -> ListeningProfile {
    let acousticness = summary.numeric("avg_acousticness");
    let instrumentalness = summary.numeric("avg_instrumentalness");
    ListeningProfile {
        acousticness,
        instrumentalness,
        style: three_tier(
            acousticness,
            0.7,
            0.3,
            [
                ListeningStyle::AcousticLover,
                ListeningStyle::MixedPreferences,
                ListeningStyle::ElectronicEnthusiast,
            ],
        ),
        prefers_instrumental: instrumentalness > 0.5,
    }
}

fn popularity_trend(avg_popularity: f64) -> PopularityTrend {
    three_tier(
        avg_popularity,
        70.0,
        40.0,
        [
            PopularityTrend::MainstreamLover,
            PopularityTrend::BalancedTaste,
            PopularityTrend::UndergroundExplorer,
        ],
    )
}

fn feature_bars(summary: &QuantitativeSummary) -> Vec<FeatureBar> {
    AudioFeature::ALL
        .iter()
        .map(|&feature| {
            let raw = summary.numeric(feature.summary_key());
            let percent = match feature {
                AudioFeature::Tempo => (raw / TEMPO_DISPLAY_CEILING_BPM * 100.0).min(100.0),
                _ => raw * 100.0,
            };
            FeatureBar {
                feature,
                raw,
                percent,
            }
        })
        .collect()
}

/// Most frequent artists first, ties broken alphabetically
fn top_artists(summary: &QuantitativeSummary) -> Vec<ArtistBar> {
    let mut ranked: Vec<(&String, &u64)> = summary.top_artists.iter().collect();
    ranked.sort_by(|a, b| match b.1.cmp(a.1) {
        Ordering::Equal => a.0.cmp(b.0),
        other => other,
    });
    ranked.truncate(TOP_ARTISTS_LIMIT);

    let max_count = ranked.first().map(|(_, count)| **count).unwrap_or(0);

    ranked
        .into_iter()
        .map(|(name, count)| ArtistBar {
            name: name.clone(),
            count: *count,
            width_percent: safe_ratio(*count as f64, max_count as f64) * 100.0,
        })
        .collect()
}

fn summary_figures(summary: &QuantitativeSummary) -> SummaryFigures {
    let tracks = summary.track_count as f64;
    let album_ratio = safe_ratio(summary.albums_count as f64, tracks);

    SummaryFigures {
        track_count: summary.track_count,
        artists_count: summary.artists_count,
        albums_count: summary.albums_count,
        popularity_percent: summary.avg_popularity.round().max(0.0) as u32,
        total_minutes: summary.duration_minutes.round().max(0.0) as u64,
        avg_seconds_per_track: safe_ratio(summary.duration_minutes, tracks) * 60.0,
        album_ratio,
        album_variety: three_tier(
            album_ratio,
            0.8,
            0.5,
            [
                AlbumVariety::VeryDiverse,
                AlbumVariety::GoodVariety,
                AlbumVariety::Focused,
            ],
        ),
        explicit_percent: rounded_percent(summary.explicit_ratio),
        explicit_content: three_tier(
            summary.explicit_ratio,
            0.5,
            0.2,
            [
                ExplicitContent::MostlyExplicit,
                ExplicitContent::SomeExplicit,
                ExplicitContent::Clean,
            ],
        ),
    }
}
