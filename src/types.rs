use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::utils;

/// The grant currently held for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// PKCE verifier and the S256 challenge derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// Successful body of the token endpoint, for both grant types.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Error body of the token endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// One page of `GET /me/tracks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTracksPage {
    pub items: Vec<SavedTrackObject>,
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrackObject {
    pub added_at: DateTime<Utc>,
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    pub album: AlbumObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    #[serde(default)]
    pub images: Vec<ImageObject>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageObject {
    pub url: String,
}

/// Minimal reference from a track to its album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
}

/// A saved track as surfaced by the library sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackItem {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
    pub added_at: DateTime<Utc>,
    pub album: AlbumRef,
}

/// An album derived from the saved tracks, deduplicated by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub image_url: String,
    pub release_date: String,
    pub total_tracks: u32,
    pub uri: String,
}

impl Album {
    /// Derives the album fields from a wire album. Albums without an id cannot
    /// be deduplicated and are skipped.
    pub fn from_object(album: &AlbumObject) -> Option<Self> {
        let id = album.id.clone()?;
        Some(Self {
            id,
            name: album.name.clone(),
            artist: album
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            image_url: album
                .images
                .first()
                .map(|i| i.url.clone())
                .unwrap_or_default(),
            release_date: album.release_date.clone().unwrap_or_default(),
            total_tracks: album.total_tracks,
            uri: album.uri.clone(),
        })
    }

    pub fn decade(&self) -> Decade {
        Decade::for_release_date(&self.release_date)
    }
}

/// Release-decade buckets, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Decade {
    Twenties,
    Tens,
    Noughties,
    Nineties,
    Eighties,
    /// Everything released before 1980, and albums without a usable date.
    Classic,
}

impl Decade {
    pub const ALL: [Decade; 6] = [
        Decade::Twenties,
        Decade::Tens,
        Decade::Noughties,
        Decade::Nineties,
        Decade::Eighties,
        Decade::Classic,
    ];

    /// First calendar year of the bucket. `Classic` has no lower bound and
    /// therefore no readiness threshold.
    pub fn start_year(self) -> Option<i32> {
        match self {
            Decade::Twenties => Some(2020),
            Decade::Tens => Some(2010),
            Decade::Noughties => Some(2000),
            Decade::Nineties => Some(1990),
            Decade::Eighties => Some(1980),
            Decade::Classic => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Decade::Twenties => "2020s",
            Decade::Tens => "2010s",
            Decade::Noughties => "2000s",
            Decade::Nineties => "1990s",
            Decade::Eighties => "1980s",
            Decade::Classic => "classic",
        }
    }

    /// Two-digit form such as `90s`. Only numbered decades have one.
    fn short_label(self) -> Option<&'static str> {
        self.start_year().and_then(|_| self.label().get(2..))
    }

    /// The newest bucket is open ended, so 2030 and later land in `Twenties`.
    pub fn for_year(year: i32) -> Decade {
        Decade::ALL
            .into_iter()
            .find(|d| d.start_year().is_some_and(|start| year >= start))
            .unwrap_or(Decade::Classic)
    }

    pub fn for_release_date(release_date: &str) -> Decade {
        utils::release_year(release_date)
            .map(Decade::for_year)
            .unwrap_or(Decade::Classic)
    }
}

impl fmt::Display for Decade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Decade {
    type Err = String;

    /// Accepts labels like `1990s` or `90s`, plus `classic`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Decade::ALL
            .into_iter()
            .find(|d| d.label() == s || d.short_label() == Some(s.as_str()))
            .ok_or_else(|| {
                format!(
                    "unknown decade '{s}', expected one of \
                     2020s, 2010s, 2000s, 1990s, 1980s, classic"
                )
            })
    }
}

/// Albums of one decade and whether the scan has proven the set complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecadeBucket {
    pub decade: Decade,
    pub albums: Vec<Album>,
    pub ready: bool,
}

impl DecadeBucket {
    pub fn new(decade: Decade) -> Self {
        Self {
            decade,
            albums: Vec::new(),
            ready: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

/// Body of `GET /me/player/currently-playing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<PlayingItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayingItem {
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
}

#[derive(Tabled)]
pub struct AlbumTableRow {
    pub released: String,
    pub name: String,
    pub artist: String,
    pub tracks: u32,
}

impl From<&Album> for AlbumTableRow {
    fn from(album: &Album) -> Self {
        Self {
            released: album.release_date.clone(),
            name: album.name.clone(),
            artist: album.artist.clone(),
            tracks: album.total_tracks,
        }
    }
}
