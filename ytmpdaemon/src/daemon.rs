//! The supervisor

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use ytmpconfig::Config;
use ytmpproxy::{IcyProxy, ProxySettings, ProxyState};
use ytmpsource::{CatalogClient, MpdWire, Playlist, RatingAction, RatingTransition, UrlResolver};
use ytmpstore::TrackStore;
use ytmpsync::{SyncEngine, SyncOptions};

use crate::command::CommandServer;
use crate::state::DaemonState;

/// Parallelism of URL resolution within one playlist.
const RESOLVE_CONCURRENCY: usize = 10;

/// How long shutdown waits for an in-flight sync.
const SYNC_GRACE: Duration = Duration::from_secs(30);

/// How long shutdown waits for the proxy to drain its streams.
const PROXY_GRACE: Duration = Duration::from_secs(5);

/// JSON-ready snapshot served by the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub sync_in_progress: bool,
    pub active_streams: usize,
    pub tracks_stored: u64,
    #[serde(flatten)]
    pub state: DaemonState,
}

struct DaemonInner {
    config: RwLock<Config>,
    store: Arc<TrackStore>,
    engine: Arc<SyncEngine>,
    catalog: Arc<dyn CatalogClient>,
    proxy_state: ProxyState,
    state: Mutex<DaemonState>,
    state_path: PathBuf,
    sync_in_progress: Mutex<bool>,
    current_sync: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// The ytmpd supervisor. Cheap to clone; all clones share one daemon.
#[derive(Clone)]
pub struct Daemon {
    inner: Arc<DaemonInner>,
}

impl Daemon {
    /// Wires the components together. Opening the track store is the one
    /// fatal step in here; everything later degrades instead of failing.
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogClient>,
        resolver: Arc<dyn UrlResolver>,
        mpd: Arc<dyn MpdWire>,
    ) -> Result<Self> {
        let state_path = config.config_dir().join("state.json");
        let state = DaemonState::load(&state_path);

        let store = Arc::new(
            TrackStore::open(&config.track_db_path)
                .with_context(|| format!("opening track store {}", config.track_db_path.display()))?,
        );

        let engine = Arc::new(SyncEngine::new(
            catalog.clone(),
            resolver.clone(),
            store.clone(),
            mpd,
        ));

        let proxy_state = ProxyState::new(
            store.clone(),
            resolver,
            config.max_concurrent_streams,
            proxy_settings(&config),
        );

        Ok(Self {
            inner: Arc::new(DaemonInner {
                config: RwLock::new(config),
                store,
                engine,
                catalog,
                proxy_state,
                state: Mutex::new(state),
                state_path,
                sync_in_progress: Mutex::new(false),
                current_sync: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Runs the daemon until `quit` or a termination signal, then tears the
    /// components down in order.
    pub async fn run(&self) -> Result<()> {
        let inner = &self.inner;

        // ========== Command socket ==========
        let socket_path = inner.config.read().unwrap().command_socket_path.clone();
        let command_server = CommandServer::bind(&socket_path)?;
        let command_task = tokio::spawn(
            command_server.run(self.clone(), inner.shutdown.clone()),
        );

        // ========== Proxy ==========
        let (proxy_enabled, proxy_host, proxy_port) = {
            let config = inner.config.read().unwrap();
            (
                config.proxy_enabled,
                config.proxy_host.clone(),
                config.proxy_port,
            )
        };
        let proxy_task = if proxy_enabled {
            let proxy = IcyProxy::bind(&proxy_host, proxy_port, inner.proxy_state.clone())
                .await
                .context("binding the stream proxy")?;

            let shutdown = inner.shutdown.clone();
            Some(tokio::spawn(async move { proxy.serve(shutdown).await }))
        } else {
            info!("Proxy disabled; playlists will carry upstream URLs");
            None
        };

        // ========== Scheduler ==========
        let scheduler_task = tokio::spawn(self.clone().scheduler());

        info!("ytmpd daemon running");

        // ========== Signals ==========
        let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                    break;
                }
                _ = sigint.recv() => {
                    info!("SIGINT received");
                    break;
                }
                _ = sighup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    self.reload_config();
                }
                _ = inner.shutdown.cancelled() => break,
            }
        }

        // ========== Graceful shutdown ==========
        info!("Shutting down");
        inner.shutdown.cancel();

        let in_flight = inner.current_sync.lock().unwrap().take();
        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                info!("Waiting for the in-flight sync");
                if timeout(SYNC_GRACE, handle).await.is_err() {
                    warn!("Sync did not finish within the grace period");
                }
            }
        }

        if let Some(task) = proxy_task {
            match timeout(PROXY_GRACE, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!(error = %e, "Proxy exited with an error"),
                Ok(Err(e)) => warn!(error = %e, "Proxy task panicked"),
                Err(_) => warn!("Proxy did not drain within the grace period"),
            }
        }

        scheduler_task.abort();
        let _ = command_task.await;

        if let Err(e) = inner.store.close() {
            warn!(error = %e, "Closing the track store failed");
        }

        info!("ytmpd daemon stopped");
        Ok(())
    }

    /// Periodic sync driver. An immediate pass on startup, then one per
    /// configured interval; the interval and the auto-sync switch are
    /// re-read every lap so a reload takes effect without restart.
    async fn scheduler(self) {
        let shutdown = self.inner.shutdown.clone();

        if self.auto_sync_enabled() {
            self.try_sync();
        }

        loop {
            let interval = self.inner.config.read().unwrap().sync_interval();
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    if self.auto_sync_enabled() {
                        self.try_sync();
                    }
                }
            }
        }
    }

    fn auto_sync_enabled(&self) -> bool {
        self.inner.config.read().unwrap().auto_sync_enabled
    }

    /// Starts a background sync unless one is already running. The gate
    /// covers the timer and manual triggers alike; a busy tick is skipped,
    /// never queued.
    pub fn try_sync(&self) -> bool {
        {
            let mut flag = self.inner.sync_in_progress.lock().unwrap();
            if *flag {
                warn!("Sync already in progress, skipping");
                return false;
            }
            *flag = true;
        }

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let options = sync_options(&inner.config.read().unwrap());
            let result = inner.engine.sync_all(&options).await;

            // Snapshot under the lock, write outside of it.
            let snapshot = {
                let mut state = inner.state.lock().unwrap();
                state.last_sync = Some(result.completed_at);
                state.last_sync_result = Some(result);
                state.clone()
            };
            if let Err(e) = snapshot.save(&inner.state_path) {
                error!(error = %e, "Persisting daemon state failed");
            }

            *inner.sync_in_progress.lock().unwrap() = false;
        });

        *self.inner.current_sync.lock().unwrap() = Some(handle);
        true
    }

    /// Snapshot for the `status` command.
    pub fn status(&self) -> StatusSnapshot {
        // Taken one at a time; the store query must not run under either
        // daemon lock.
        let sync_in_progress = *self.inner.sync_in_progress.lock().unwrap();
        let state = self.inner.state.lock().unwrap().clone();

        StatusSnapshot {
            sync_in_progress,
            active_streams: self.inner.proxy_state.active_streams(),
            tracks_stored: self.inner.store.count().unwrap_or(0),
            state,
        }
    }

    /// Catalog playlists, for the `list` command.
    pub async fn list_playlists(&self) -> ytmpsource::Result<Vec<Playlist>> {
        self.inner.catalog.list_playlists().await
    }

    /// Reads the current rating, runs the toggle, writes the result back.
    pub async fn rate(
        &self,
        video_id: &str,
        action: RatingAction,
    ) -> ytmpsource::Result<RatingTransition> {
        let current = self.inner.catalog.rating(video_id).await?;
        let transition = current.apply(action);
        self.inner
            .catalog
            .set_rating(video_id, transition.upstream)
            .await?;

        info!(
            video_id,
            ?current,
            new = ?transition.new_state,
            "Rating updated"
        );
        Ok(transition)
    }

    /// Triggers the shutdown path (the `quit` command).
    pub fn begin_shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Re-reads the configuration and applies the fields that are safe to
    /// change at runtime. Bind addresses and filesystem paths stay as they
    /// are until a restart.
    pub fn reload_config(&self) {
        let dir = {
            let config = self.inner.config.read().unwrap();
            config.config_dir().to_string_lossy().into_owned()
        };

        let fresh = match Config::load(&dir) {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "Configuration reload failed, keeping current settings");
                return;
            }
        };

        let mut config = self.inner.config.write().unwrap();

        if fresh.proxy_host != config.proxy_host
            || fresh.proxy_port != config.proxy_port
            || fresh.track_db_path != config.track_db_path
            || fresh.mpd_socket_path != config.mpd_socket_path
            || fresh.command_socket_path != config.command_socket_path
            || fresh.catalog_auth_path != config.catalog_auth_path
            || fresh.ytdlp_path != config.ytdlp_path
        {
            warn!("Ignoring changed bind addresses/paths until restart");
        }

        config.sync_interval_minutes = fresh.sync_interval_minutes;
        config.auto_sync_enabled = fresh.auto_sync_enabled;
        config.playlist_prefix = fresh.playlist_prefix;
        config.stream_cache_hours = fresh.stream_cache_hours;
        config.proxy_enabled = fresh.proxy_enabled;

        self.inner.proxy_state.update_settings(proxy_settings(&config));
        info!(
            interval_minutes = config.sync_interval_minutes,
            prefix = %config.playlist_prefix,
            "Configuration reloaded"
        );
    }
}

fn sync_options(config: &Config) -> SyncOptions {
    SyncOptions {
        playlist_prefix: config.playlist_prefix.clone(),
        proxy_base_url: config.proxy_base_url(),
        proxy_enabled: config.proxy_enabled,
        resolve_concurrency: RESOLVE_CONCURRENCY,
    }
}

fn proxy_settings(config: &Config) -> ProxySettings {
    ProxySettings {
        url_expiry: config.stream_cache(),
        ..ProxySettings::default()
    }
}
