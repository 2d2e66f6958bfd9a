use std::fs;
use std::path::Path;

use playlist_analytics::config::AnalysisConfig;
use playlist_analytics::keywords::TokenizerKind;
use playlist_analytics::models::{PlaylistRecord, PlaylistSortField, TrackRecord};
use playlist_analytics::observer::{Level, RecordingObserver};
use playlist_analytics::report::{build_report, Snapshot};
use playlist_analytics::store::{IngestPolicy, Store};
use playlist_analytics::{playlists, tracks};

const PLAYLISTS_JSON: &str = r#"[
    {"playlist_id": "A", "playlist_name": "Alpha", "creator_name": "amy",
     "play_count": 1000, "subscribed_count": 200, "tags": "pop,dance",
     "description": "summer road trip"},
    {"playlist_id": "B", "playlist_name": "Beta", "creator_name": null,
     "play_count": 3000, "subscribed_count": 100, "tags": ["pop", "rock"],
     "description": null}
]"#;

const TRACKS_JSON: &str = r#"[
    {"song_id": "s1", "song_name": "One", "artist": "Band", "album": "First",
     "playlist_id": "P1", "popularity": 80, "position": 1, "duration": 200000},
    {"song_id": "s1", "song_name": "One", "artist": "Band", "album": "First",
     "playlist_id": "P2", "popularity": 60, "position": 3, "duration": 200000},
    {"song_id": "s2", "song_name": "Two", "artist": "Solo", "album": "",
     "playlist_id": "P1", "popularity": 90, "position": 2, "duration": 95000}
]"#;

fn load_json<T: serde::de::DeserializeOwned>(dir: &Path, name: &str, body: &str) -> Vec<T> {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap()
}

fn ingested_store(dir: &Path) -> Store {
    let playlists: Vec<PlaylistRecord> = load_json(dir, "playlists.json", PLAYLISTS_JSON);
    let tracks: Vec<TrackRecord> = load_json(dir, "tracks.json", TRACKS_JSON);

    let mut store = Store::open(dir.join("playlists.sqlite3")).unwrap();
    store.insert_playlists(&playlists).unwrap();
    store.insert_tracks(&tracks, IngestPolicy::Append).unwrap();
    store
}

#[test]
fn playlist_scenario_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = ingested_store(dir.path());
    let snapshot = Snapshot::load(&store).unwrap();

    let top = playlists::top_playlists(&snapshot.playlists, 2, PlaylistSortField::from("play_count"));
    let ids: Vec<&str> = top.iter().map(|p| p.playlist_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A"]);

    let tags = playlists::tag_distribution(&snapshot.playlists, 2);
    assert_eq!(tags.len(), 2);
    assert_eq!((tags[0].tag.as_str(), tags[0].count), ("pop", 2));
    assert!(tags[1].tag == "dance" || tags[1].tag == "rock");
    assert_eq!(tags[1].count, 1);

    let scale = playlists::scale_distribution(&snapshot.playlists);
    assert_eq!(scale.get("small (<=20)"), Some(2));

    let creators = playlists::creator_distribution(&snapshot.playlists, 10);
    assert!(creators.iter().any(|c| c.creator_name == "unknown"));
}

#[test]
fn crawler_shaped_records_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let playlists: Vec<PlaylistRecord> = load_json(
        dir.path(),
        "crawled_playlists.json",
        r#"[{"playlist_id": 7001, "playlist_name": "Night Drive", "creator_id": 42,
             "creator_name": "amy", "play_count": 1200.0, "subscribed_count": 35,
             "create_time": "2023-05-01 12:00:00", "crawl_time": ""}]"#,
    );
    let tracks: Vec<TrackRecord> = load_json(
        dir.path(),
        "crawled_tracks.json",
        r#"[{"song_id": 9001, "song_name": "Neon", "artist": "Band",
             "playlist_id": 7001, "popularity": 95.0, "position": 1,
             "duration": 215000, "crawl_time": "2023-05-02 08:30:00"}]"#,
    );

    let mut store = Store::open(dir.path().join("crawl.sqlite3")).unwrap();
    store.insert_playlists(&playlists).unwrap();
    store.insert_tracks(&tracks, IngestPolicy::Append).unwrap();

    let stored = store.get_all_playlists().unwrap();
    assert_eq!(stored[0].playlist_id, "7001");
    assert_eq!(stored[0].play_count, 1200);
    assert_eq!(
        stored[0].create_time.map(|t| t.to_rfc3339()),
        Some("2023-05-01T12:00:00+00:00".to_string())
    );
    // a blank crawl time is stamped at ingest
    assert!(stored[0].crawl_time.is_some());

    let stored = store.get_all_tracks().unwrap();
    assert_eq!(stored[0].song_id, "9001");
    assert_eq!(stored[0].popularity, 95);
    assert_eq!(stored[0].duration_format, "3:35");
    assert_eq!(
        stored[0].crawl_time.map(|t| t.to_rfc3339()),
        Some("2023-05-02T08:30:00+00:00".to_string())
    );
}

#[test]
fn track_scenario_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = ingested_store(dir.path());
    let all = store.get_all_tracks().unwrap();

    let membership = tracks::playlist_membership(&all);
    assert_eq!(membership["s1"], 2);
    assert_eq!(membership["s2"], 1);

    let unique = tracks::unique_tracks(&all);
    let s1 = unique.iter().find(|t| t.song_id == "s1").unwrap();
    assert_eq!(s1.popularity, 80);
    assert_eq!(s1.playlist_id, "P1");
    assert_eq!(s1.duration_format, "3:20");
    assert_eq!(unique.len(), 2);
}

#[test]
fn zero_plays_yield_no_popularity_analysis() {
    let flat = vec![
        PlaylistRecord { playlist_id: "A".into(), subscribed_count: 5, ..Default::default() },
        PlaylistRecord { playlist_id: "B".into(), subscribed_count: 9, ..Default::default() },
    ];
    assert!(playlists::popularity_analysis(&flat).is_none());

    let obs = RecordingObserver::default();
    let report = build_report(&Snapshot::new(flat, Vec::new()), &AnalysisConfig::default(), &obs);
    assert!(report.popularity.is_none());
    assert!(obs
        .events()
        .iter()
        .any(|(level, stage, _)| *level == Level::Warn && stage == "popularity"));
}

#[test]
fn recrawl_append_duplicates_rows_without_inflating_cross_counts() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ingested_store(dir.path());
    let tracks_again: Vec<TrackRecord> = load_json(dir.path(), "tracks.json", TRACKS_JSON);

    store.insert_tracks(&tracks_again, IngestPolicy::Append).unwrap();
    let all = store.get_all_tracks().unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(tracks::playlist_membership(&all)["s1"], 2);
    assert_eq!(tracks::unique_tracks(&all).len(), 2);

    store.insert_tracks(&tracks_again, IngestPolicy::ReplacePlaylist).unwrap();
    assert_eq!(store.get_all_tracks().unwrap().len(), 3);
}

#[test]
fn full_report_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = ingested_store(dir.path());
    let config = AnalysisConfig {
        tokenizer: TokenizerKind::UnicodeWords,
        ..Default::default()
    };

    let obs = RecordingObserver::default();
    let snapshot = Snapshot::load(&store).unwrap();
    let first = build_report(&snapshot, &config, &obs);

    assert_eq!(first.playlist_stats.as_ref().unwrap().total_creators, 1);
    assert_eq!(first.track_stats.as_ref().unwrap().unique_songs, 2);
    assert_eq!(first.cross_playlist_by_position.len(), 1);
    assert_eq!(first.cross_playlist_by_position[0].song_id, "s1");
    assert_eq!(first.canonical_track_count, 2);
    assert_eq!(first.albums.len(), 1);
    assert_eq!(first.duration_distribution.get("very short (<=2min)"), Some(1));
    let words: Vec<&str> = first.keywords.iter().map(|k| k.word.as_str()).collect();
    assert_eq!(words, vec!["summer", "road", "trip"]);

    // A second run over unchanged data gives the same aggregates.
    let again = build_report(&Snapshot::load(&store).unwrap(), &config, &obs);
    assert_eq!(
        serde_json::to_value(&first.creators).unwrap(),
        serde_json::to_value(&again.creators).unwrap()
    );
    assert_eq!(first.artist_profiles, again.artist_profiles);
    assert_eq!(first.cross_playlist_by_popularity, again.cross_playlist_by_popularity);

    let out = dir.path().join("report.json");
    first.write_to_file(&out).unwrap();
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["track_stats"]["total_tracks"], 3);
}
