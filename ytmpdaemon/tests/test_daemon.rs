//! Daemon behavior with in-process fakes: command socket protocol, the
//! at-most-one sync gate, rating orchestration, persisted state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::{sleep, timeout};
use ytmpconfig::Config;
use ytmpdaemon::Daemon;
use ytmpsource::{
    CatalogClient, MpdWire, Playlist, Rating, RatingAction, Result, Track, UrlResolver,
};

// ============================================================================
// Fakes
// ============================================================================

struct FakeCatalog {
    playlists: Vec<Playlist>,
    tracks: HashMap<String, Vec<Track>>,
    /// True stored rating; reads conflate Disliked into Neutral.
    rating: Mutex<Rating>,
    set_calls: Mutex<Vec<Rating>>,
    list_delay: Duration,
}

impl Default for FakeCatalog {
    fn default() -> Self {
        Self {
            playlists: Vec::new(),
            tracks: HashMap::new(),
            rating: Mutex::new(Rating::Neutral),
            set_calls: Mutex::new(Vec::new()),
            list_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        if !self.list_delay.is_zero() {
            sleep(self.list_delay).await;
        }
        Ok(self.playlists.clone())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        Ok(self.tracks.get(playlist_id).cloned().unwrap_or_default())
    }

    async fn rating(&self, _video_id: &str) -> Result<Rating> {
        Ok(match *self.rating.lock().unwrap() {
            Rating::Liked => Rating::Liked,
            // The lossy read: disliked comes back neutral.
            Rating::Disliked | Rating::Neutral => Rating::Neutral,
        })
    }

    async fn set_rating(&self, _video_id: &str, rating: Rating) -> Result<()> {
        *self.rating.lock().unwrap() = rating;
        self.set_calls.lock().unwrap().push(rating);
        Ok(())
    }
}

#[derive(Default)]
struct FakeResolver {
    urls: HashMap<String, String>,
}

#[async_trait]
impl UrlResolver for FakeResolver {
    async fn resolve(&self, video_id: &str) -> Result<String> {
        self.urls
            .get(video_id)
            .cloned()
            .ok_or_else(|| ytmpsource::SourceError::temporary("no url"))
    }
}

#[derive(Default)]
struct FakeMpd {
    playlists: Mutex<HashMap<String, Vec<String>>>,
}

#[async_trait]
impl MpdWire for FakeMpd {
    async fn list_playlists(&self) -> Result<Vec<String>> {
        Ok(self.playlists.lock().unwrap().keys().cloned().collect())
    }

    async fn replace_playlist(&self, name: &str, urls: &[String]) -> Result<()> {
        self.playlists
            .lock()
            .unwrap()
            .insert(name.to_string(), urls.to_vec());
        Ok(())
    }

    async fn delete_playlist(&self, name: &str) -> Result<()> {
        self.playlists.lock().unwrap().remove(name);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::load(dir.path().to_str().unwrap()).unwrap();
    // Ephemeral proxy port, no timer interference.
    config.proxy_port = 0;
    config.auto_sync_enabled = false;
    config
}

fn daemon_with(
    dir: &TempDir,
    catalog: FakeCatalog,
    resolver: FakeResolver,
) -> (Daemon, Arc<FakeCatalog>, Arc<FakeMpd>) {
    let catalog = Arc::new(catalog);
    let mpd = Arc::new(FakeMpd::default());
    let daemon = Daemon::new(
        test_config(dir),
        catalog.clone(),
        Arc::new(resolver),
        mpd.clone(),
    )
    .unwrap();
    (daemon, catalog, mpd)
}

async fn send_command(socket_path: &std::path::Path, command: &str) -> Value {
    let stream = UnixStream::connect(socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();

    write_half
        .write_all(format!("{command}\n").as_bytes())
        .await
        .unwrap();

    let mut lines = BufReader::new(read_half).lines();
    let reply = lines.next_line().await.unwrap().unwrap();
    serde_json::from_str(&reply).unwrap()
}

fn seeded_catalog() -> FakeCatalog {
    FakeCatalog {
        playlists: vec![Playlist {
            id: "P1".to_string(),
            name: "chilax".to_string(),
            track_count: 1,
        }],
        tracks: HashMap::from([(
            "P1".to_string(),
            vec![Track {
                video_id: "aaaaaaaaaaa".to_string(),
                title: "So What".to_string(),
                artist: Some("Miles".to_string()),
                duration: None,
            }],
        )]),
        ..Default::default()
    }
}

fn seeded_resolver() -> FakeResolver {
    FakeResolver {
        urls: HashMap::from([("aaaaaaaaaaa".to_string(), "https://upstream/1".to_string())]),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn command_socket_full_session() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("ytmpd.sock");
    let (daemon, _catalog, mpd) = daemon_with(&dir, seeded_catalog(), seeded_resolver());

    let runner = {
        let daemon = daemon.clone();
        tokio::spawn(async move { daemon.run().await })
    };

    // Wait for the socket to appear.
    timeout(Duration::from_secs(5), async {
        while !socket_path.exists() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    // status: no history yet
    let reply = send_command(&socket_path, "status").await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["status"]["sync_in_progress"], false);
    assert!(reply["status"]["last_sync"].is_null());

    // list: delegates to the catalog
    let reply = send_command(&socket_path, "list").await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["playlists"][0]["name"], "chilax");

    // sync: returns immediately, runs in the background
    let reply = send_command(&socket_path, "sync").await;
    assert_eq!(reply["success"], true);

    timeout(Duration::from_secs(5), async {
        loop {
            let reply = send_command(&socket_path, "status").await;
            if !reply["status"]["last_sync"].is_null() {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert!(mpd.playlists.lock().unwrap().contains_key("YT: chilax"));

    let reply = send_command(&socket_path, "status").await;
    assert_eq!(reply["status"]["last_sync_result"]["success"], true);
    assert_eq!(reply["status"]["last_sync_result"]["tracks_added"], 1);

    // quit: daemon shuts down and removes the socket
    let reply = send_command(&socket_path, "quit").await;
    assert_eq!(reply["success"], true);

    timeout(Duration::from_secs(10), runner)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!socket_path.exists());
    assert!(dir.path().join("state.json").exists());
}

#[tokio::test]
async fn unknown_command_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("ytmpd.sock");
    let (daemon, _, _) = daemon_with(&dir, FakeCatalog::default(), FakeResolver::default());

    let runner = {
        let daemon = daemon.clone();
        tokio::spawn(async move { daemon.run().await })
    };
    timeout(Duration::from_secs(5), async {
        while !socket_path.exists() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    let reply = send_command(&socket_path, "self-destruct").await;
    assert_eq!(reply["success"], false);
    assert!(reply["message"]
        .as_str()
        .unwrap()
        .contains("unknown command"));

    daemon.begin_shutdown();
    let _ = timeout(Duration::from_secs(10), runner).await;
}

#[tokio::test]
async fn only_one_sync_runs_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog {
        list_delay: Duration::from_millis(300),
        ..seeded_catalog()
    };
    let (daemon, _, _) = daemon_with(&dir, catalog, seeded_resolver());

    assert!(daemon.try_sync());
    assert!(!daemon.try_sync(), "second sync must be gated off");
    assert!(daemon.status().sync_in_progress);

    // The gate opens once the first pass completes.
    timeout(Duration::from_secs(5), async {
        while daemon.status().sync_in_progress {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert!(daemon.try_sync());
}

#[tokio::test]
async fn rating_toggle_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog {
        rating: Mutex::new(Rating::Liked),
        ..FakeCatalog::default()
    };
    let (daemon, catalog, _) = daemon_with(&dir, catalog, FakeResolver::default());

    // Liked + Like toggles off.
    let t = daemon.rate("aaaaaaaaaaa", RatingAction::Like).await.unwrap();
    assert_eq!(t.new_state, Rating::Neutral);
    assert_eq!(t.upstream, Rating::Neutral);

    // Now observed Neutral; Like again re-likes.
    let t = daemon.rate("aaaaaaaaaaa", RatingAction::Like).await.unwrap();
    assert_eq!(t.new_state, Rating::Liked);

    assert_eq!(
        *catalog.set_calls.lock().unwrap(),
        vec![Rating::Neutral, Rating::Liked]
    );
}

#[tokio::test]
async fn double_dislike_dislikes_twice() {
    let dir = tempfile::tempdir().unwrap();
    let (daemon, catalog, _) =
        daemon_with(&dir, FakeCatalog::default(), FakeResolver::default());

    daemon
        .rate("aaaaaaaaaaa", RatingAction::Dislike)
        .await
        .unwrap();
    // The dislike reads back as Neutral, so a second dislike writes Disliked
    // again instead of toggling off.
    let t = daemon
        .rate("aaaaaaaaaaa", RatingAction::Dislike)
        .await
        .unwrap();
    assert_eq!(t.upstream, Rating::Disliked);

    assert_eq!(
        *catalog.set_calls.lock().unwrap(),
        vec![Rating::Disliked, Rating::Disliked]
    );
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let (daemon, _, _) = daemon_with(&dir, seeded_catalog(), seeded_resolver());
        daemon.try_sync();
        timeout(Duration::from_secs(5), async {
            while daemon.status().state.last_sync.is_none()
                || daemon.status().sync_in_progress
            {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();
    }

    // A new daemon over the same config dir sees the previous sync.
    let (daemon, _, _) = daemon_with(&dir, seeded_catalog(), seeded_resolver());
    let status = daemon.status();
    assert!(status.state.last_sync.is_some());
    assert!(status.state.last_sync_result.unwrap().success);
}
