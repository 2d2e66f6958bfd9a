//! Playlist analytics library: record store, aggregation engine and report.

pub mod config;
pub mod distribution;
pub mod group;
pub mod keywords;
pub mod models;
pub mod numeric;
pub mod observer;
pub mod playlists;
pub mod progress;
pub mod report;
pub mod safety;
pub mod store;
pub mod tracks;
