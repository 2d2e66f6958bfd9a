//! Analysis run configuration, loaded from an optional JSON file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::keywords::{Stopwords, TokenizerKind};
use crate::store::IngestPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub top_playlists: usize,
    pub top_creators: usize,
    pub top_tags: usize,
    pub top_keywords: usize,
    pub top_tracks: usize,
    pub top_artists: usize,
    pub top_albums: usize,
    pub artist_profile_size: usize,
    /// Distinct playlists a song must appear in to count as cross-playlist.
    pub min_cross_playlists: usize,
    pub extra_stopwords: Vec<String>,
    pub tokenizer: TokenizerKind,
    pub ingest_policy: IngestPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_playlists: 30,
            top_creators: 20,
            top_tags: 20,
            top_keywords: 50,
            top_tracks: 30,
            top_artists: 20,
            top_albums: 20,
            artist_profile_size: 8,
            min_cross_playlists: 2,
            extra_stopwords: Vec::new(),
            tokenizer: TokenizerKind::default(),
            ingest_policy: IngestPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load from `path`, or defaults when no path is given.
    /// Fields missing from the file keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn stopwords(&self) -> Stopwords {
        Stopwords::builtin().with_extra(self.extra_stopwords.iter().cloned())
    }
}
