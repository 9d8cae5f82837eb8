//! Exercises the adapter against a scripted in-process MPD fake speaking the
//! real wire protocol over a Unix socket.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use ytmpmpd::MpdPlaylists;
use ytmpsource::MpdWire;

#[derive(Default)]
struct FakeMpdState {
    playlists: BTreeMap<String, Vec<String>>,
}

/// Splits an MPD command line into words, honoring double quotes and
/// backslash escapes the way the protocol encodes them.
fn split_args(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            ' ' if !in_quotes => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            _ => cur.push(c),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

fn start_fake_mpd(listener: UnixListener, state: Arc<Mutex<FakeMpdState>>) {
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            let state = state.clone();

            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut lines = BufReader::new(read_half).lines();

                if write_half.write_all(b"OK MPD 0.23.5\n").await.is_err() {
                    return;
                }

                while let Ok(Some(line)) = lines.next_line().await {
                    let args = split_args(&line);
                    let reply: String = match args.first().map(String::as_str) {
                        // The client parks in idle between commands; the
                        // reply is only sent once noidle arrives.
                        Some("idle") => continue,
                        Some("noidle") => "OK\n".to_string(),
                        Some("listplaylists") => {
                            let state = state.lock().unwrap();
                            let mut out = String::new();
                            for name in state.playlists.keys() {
                                out.push_str(&format!(
                                    "playlist: {name}\nLast-Modified: 2025-01-01T00:00:00Z\n"
                                ));
                            }
                            out.push_str("OK\n");
                            out
                        }
                        Some("rm") => {
                            let name = args.get(1).cloned().unwrap_or_default();
                            let mut state = state.lock().unwrap();
                            if state.playlists.remove(&name).is_some() {
                                "OK\n".to_string()
                            } else {
                                "ACK [50@0] {rm} No such playlist\n".to_string()
                            }
                        }
                        Some("playlistadd") => {
                            let name = args.get(1).cloned().unwrap_or_default();
                            let url = args.get(2).cloned().unwrap_or_default();
                            let mut state = state.lock().unwrap();
                            state.playlists.entry(name).or_default().push(url);
                            "OK\n".to_string()
                        }
                        _ => "OK\n".to_string(),
                    };

                    if write_half.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
}

fn setup() -> (TempDir, MpdPlaylists, Arc<Mutex<FakeMpdState>>) {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("mpd.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let state = Arc::new(Mutex::new(FakeMpdState::default()));
    start_fake_mpd(listener, state.clone());
    (dir, MpdPlaylists::new(socket), state)
}

#[tokio::test]
async fn replace_creates_playlist_with_ordered_entries() {
    let (_dir, mpd, state) = setup();

    let urls = vec![
        "http://localhost:8080/proxy/aaaaaaaaaaa".to_string(),
        "http://localhost:8080/proxy/bbbbbbbbbbb".to_string(),
        "http://localhost:8080/proxy/ccccccccccc".to_string(),
    ];
    mpd.replace_playlist("YT: chilax", &urls).await.unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.playlists["YT: chilax"], urls);
}

#[tokio::test]
async fn replace_overwrites_previous_contents() {
    let (_dir, mpd, state) = setup();

    state.lock().unwrap().playlists.insert(
        "YT: chilax".to_string(),
        vec!["http://localhost:8080/proxy/ooooooooooo".to_string()],
    );

    let urls = vec!["http://localhost:8080/proxy/aaaaaaaaaaa".to_string()];
    mpd.replace_playlist("YT: chilax", &urls).await.unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.playlists["YT: chilax"], urls);
}

#[tokio::test]
async fn list_playlists_returns_names() {
    let (_dir, mpd, state) = setup();

    {
        let mut state = state.lock().unwrap();
        state.playlists.insert("YT: chilax".to_string(), vec![]);
        state.playlists.insert("road trip".to_string(), vec![]);
    }

    let mut names = mpd.list_playlists().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["YT: chilax".to_string(), "road trip".to_string()]);
}

#[tokio::test]
async fn delete_missing_playlist_is_not_an_error() {
    let (_dir, mpd, _state) = setup();
    mpd.delete_playlist("never existed").await.unwrap();
}

#[tokio::test]
async fn unreachable_socket_maps_to_mpd_error() {
    let dir = tempfile::tempdir().unwrap();
    let mpd = MpdPlaylists::new(dir.path().join("absent.sock"));

    let err = mpd.list_playlists().await.unwrap_err();
    assert!(matches!(err, ytmpsource::SourceError::Mpd(_)));
}
