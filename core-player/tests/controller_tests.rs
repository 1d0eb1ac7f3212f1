//! Device controller tests against a fake SDK and a scripted HTTP client.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::player::{
    PlayerConfig, PlayerHandle, PlayerSdk, PlayerSdkEvent, SdkPlaybackState, TokenSource,
};
use bridge_traits::time::SystemClock;
use bytes::Bytes;
use core_auth::session::SessionHandle;
use core_auth::token_store::TokenStore;
use core_player::{ControllerState, DeviceController, PlayerError};
use core_runtime::config::{CoreConfig, PlayerTiming};
use core_runtime::events::EventBus;
use provider_spotify::SpotifyClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// In-memory key-value store backing the token store.
struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl bridge_traits::storage::KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> BridgeResult<()> {
        self.values.lock().await.clear();
        Ok(())
    }
}

/// Scripted HTTP: maps a URL substring to a `(status, body)` response and
/// records every request.
struct ScriptedHttp {
    routes: Mutex<Vec<(&'static str, u16, String)>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    fn new(routes: Vec<(&'static str, u16, String)>) -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(routes),
            seen: Mutex::new(Vec::new()),
        })
    }

    async fn calls_to(&self, fragment: &str) -> usize {
        self.seen
            .lock()
            .await
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = request.url.clone();
        self.seen.lock().await.push(request);
        let routes = self.routes.lock().await;
        let (_, status, body) = routes
            .iter()
            .find(|(fragment, _, _)| url.contains(fragment))
            .expect("unscripted request");
        Ok(HttpResponse {
            status: *status,
            status_text: String::new(),
            headers: HashMap::new(),
            body: Bytes::from(body.clone()),
        })
    }
}

/// Fake SDK player with configurable connect/state behavior.
struct FakePlayer {
    connect_result: BridgeResult<bool>,
    state_result: Option<SdkPlaybackState>,
    events: broadcast::Sender<PlayerSdkEvent>,
    connects: Mutex<u32>,
}

impl FakePlayer {
    fn new(connect_result: BridgeResult<bool>, state_result: Option<SdkPlaybackState>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            connect_result,
            state_result,
            events,
            connects: Mutex::new(0),
        }
    }
}

#[async_trait]
impl PlayerHandle for FakePlayer {
    async fn connect(&self) -> BridgeResult<bool> {
        *self.connects.lock().await += 1;
        match &self.connect_result {
            Ok(v) => Ok(*v),
            Err(_) => Err(bridge_traits::BridgeError::OperationFailed(
                "connect refused".to_string(),
            )),
        }
    }

    async fn current_state(&self) -> BridgeResult<Option<SdkPlaybackState>> {
        Ok(self.state_result.clone())
    }

    async fn toggle_play(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn previous_track(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn next_track(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerSdkEvent> {
        self.events.subscribe()
    }
}

struct FakeSdk {
    player: Arc<FakePlayer>,
    loaded: bool,
}

impl PlayerSdk for FakeSdk {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn create_player(
        &self,
        _config: PlayerConfig,
        _tokens: Arc<dyn TokenSource>,
    ) -> BridgeResult<Arc<dyn PlayerHandle>> {
        Ok(self.player.clone())
    }
}

/// Timing shrunk so the resolution fallbacks run inside the test's paused
/// clock.
fn fast_timing() -> PlayerTiming {
    PlayerTiming {
        state_probe_delay: Duration::from_millis(5),
        api_fallback_delay: Duration::from_millis(20),
        sdk_poll_interval: Duration::from_millis(5),
    }
}

struct Harness {
    controller: DeviceController,
    session: SessionHandle,
    http: Arc<ScriptedHttp>,
    sdk: FakeSdk,
    _events: EventBus,
}

async fn harness(
    routes: Vec<(&'static str, u16, String)>,
    connect_result: BridgeResult<bool>,
    state_result: Option<SdkPlaybackState>,
) -> Harness {
    let http = ScriptedHttp::new(routes);
    let session = SessionHandle::new();
    session.install("tok", i64::MAX).await;

    let clock = Arc::new(SystemClock);
    let config = CoreConfig::builder()
        .client_id("client")
        .redirect_uri("http://127.0.0.1/cb")
        .timing(fast_timing())
        .build()
        .unwrap();

    let api = Arc::new(SpotifyClient::new(
        http.clone(),
        session.clone(),
        clock.clone(),
        config.api_base_url.clone(),
    ));
    let token_store = TokenStore::new(Arc::new(MemoryStore::new()), clock.clone());
    let events = EventBus::new(64);

    let controller = DeviceController::new(
        api,
        session.clone(),
        token_store,
        events.clone(),
        clock,
        config,
    );

    Harness {
        controller,
        session,
        http,
        sdk: FakeSdk {
            player: Arc::new(FakePlayer::new(connect_result, state_result)),
            loaded: true,
        },
        _events: events,
    }
}

fn two_devices() -> String {
    r#"{"devices":[
        {"id":"d-first","name":"Laptop","is_active":false},
        {"id":"d-active","name":"Phone","is_active":true}
    ]}"#
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn silent_sdk_falls_back_to_api_exactly_once_and_prefers_active() {
    // The SDK never fires ready and never reports a device id from state.
    let h = harness(
        vec![("/me/player/devices", 200, two_devices())],
        Ok(true),
        Some(SdkPlaybackState {
            paused: true,
            position_ms: 0,
            device_id: None,
            track: None,
        }),
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    // Run past both configured timeouts.
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.controller.device_id().await.as_deref(), Some("d-active"));
    assert_eq!(h.http.calls_to("/me/player/devices").await, 1);
    assert!(matches!(
        h.controller.state().await,
        ControllerState::Ready { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn api_fallback_uses_first_device_when_none_active() {
    let body = r#"{"devices":[
        {"id":"d-first","name":"Laptop","is_active":false},
        {"id":"d-second","name":"Phone","is_active":false}
    ]}"#
    .to_string();
    let h = harness(
        vec![("/me/player/devices", 200, body)],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.controller.device_id().await.as_deref(), Some("d-first"));
}

#[tokio::test(start_paused = true)]
async fn connect_false_goes_straight_to_api() {
    let h = harness(
        vec![("/me/player/devices", 200, two_devices())],
        Ok(false),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.controller.device_id().await.as_deref(), Some("d-active"));
}

#[tokio::test(start_paused = true)]
async fn state_query_supplies_the_device_before_any_api_call() {
    let h = harness(
        vec![("/me/player/devices", 200, two_devices())],
        Ok(true),
        Some(SdkPlaybackState {
            paused: true,
            position_ms: 0,
            device_id: Some("d-state".to_string()),
            track: None,
        }),
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.controller.device_id().await.as_deref(), Some("d-state"));
    assert_eq!(h.http.calls_to("/me/player/devices").await, 0);
}

#[tokio::test(start_paused = true)]
async fn ready_event_overrides_other_sources() {
    let h = harness(
        vec![("/me/player/devices", 200, two_devices())],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.controller.device_id().await.as_deref(), Some("d-active"));

    // The ready event is authoritative even after a fallback bound a
    // different id.
    h.sdk
        .player
        .events
        .send(PlayerSdkEvent::Ready {
            device_id: "d-ready".to_string(),
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.controller.device_id().await.as_deref(), Some("d-ready"));
}

#[tokio::test(start_paused = true)]
async fn empty_device_list_is_degraded_not_failed() {
    let h = harness(
        vec![("/me/player/devices", 200, r#"{"devices":[]}"#.to_string())],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(h.controller.device_id().await.is_none());
    // Still connecting, not failed: the absence of a device is recoverable.
    assert_eq!(h.controller.state().await, ControllerState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn play_404_is_device_lost_and_session_survives() {
    let h = harness(
        vec![
            ("/me/player/devices", 200, two_devices()),
            ("/me/player/play", 404, String::new()),
        ],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let err = h.controller.play("spotify:track:t1").await.unwrap_err();
    assert!(matches!(err, PlayerError::DeviceLost));
    // A stale device does not invalidate the bearer token.
    assert!(h.session.is_authenticated(0).await);
}

#[tokio::test(start_paused = true)]
async fn play_401_forces_logout() {
    let h = harness(
        vec![
            ("/me/player/devices", 200, two_devices()),
            ("/me/player/play", 401, String::new()),
        ],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let err = h.controller.play("spotify:track:t1").await.unwrap_err();
    assert!(matches!(
        err,
        PlayerError::Api(provider_spotify::ApiError::Unauthorized)
    ));
    assert!(!h.session.is_authenticated(0).await);
    assert_eq!(h.controller.state().await, ControllerState::Uninitialized);
}

#[tokio::test(start_paused = true)]
async fn play_re_resolves_before_giving_up() {
    // No devices anywhere: play must re-run resolution and then fail with
    // NoDeviceAvailable, leaving the session alone.
    let h = harness(
        vec![("/me/player/devices", 200, r#"{"devices":[]}"#.to_string())],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let calls_before = h.http.calls_to("/me/player/devices").await;

    let err = h.controller.play("spotify:track:t1").await.unwrap_err();
    assert!(matches!(err, PlayerError::NoDeviceAvailable));
    assert_eq!(
        h.http.calls_to("/me/player/devices").await,
        calls_before + 1
    );
    assert!(h.session.is_authenticated(0).await);
}

#[tokio::test(start_paused = true)]
async fn authentication_error_event_tears_the_session_down() {
    let h = harness(
        vec![("/me/player/devices", 200, two_devices())],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    h.sdk
        .player
        .events
        .send(PlayerSdkEvent::AuthenticationError {
            message: "token rejected".to_string(),
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!h.session.is_authenticated(0).await);
    assert_eq!(h.controller.state().await, ControllerState::Uninitialized);
}

#[tokio::test(start_paused = true)]
async fn account_error_fails_without_logout() {
    let h = harness(
        vec![("/me/player/devices", 200, two_devices())],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    h.sdk
        .player
        .events
        .send(PlayerSdkEvent::AccountError {
            message: "premium required".to_string(),
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.controller.state().await.is_failed());
    // Account errors do not invalidate the token.
    assert!(h.session.is_authenticated(0).await);
}

#[tokio::test(start_paused = true)]
async fn state_changed_updates_projection() {
    use bridge_traits::player::{SdkAlbum, SdkTrack};

    let h = harness(
        vec![("/me/player/devices", 200, two_devices())],
        Ok(true),
        None,
    )
    .await;

    h.controller.initialize(&h.sdk).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    h.sdk
        .player
        .events
        .send(PlayerSdkEvent::StateChanged(SdkPlaybackState {
            paused: false,
            position_ms: 60_000,
            device_id: None,
            track: Some(SdkTrack {
                name: "Da Funk".to_string(),
                uri: "spotify:track:df".to_string(),
                artists: vec!["Daft Punk".to_string()],
                album: SdkAlbum {
                    name: "Homework".to_string(),
                    images: vec![],
                },
                duration_ms: 240_000,
            }),
        }))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let now = h.controller.now_playing().await.unwrap();
    assert_eq!(now.track_name, "Da Funk");
    assert_eq!(now.glyph, "⏸");
    assert_eq!(now.elapsed, "1:00");
    assert!((now.progress_percent - 25.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn transport_controls_are_noops_without_a_player() {
    let h = harness(vec![], Ok(true), None).await;

    // No initialize: the player does not exist yet.
    h.controller.toggle_play().await.unwrap();
    h.controller.previous().await.unwrap();
    h.controller.next().await.unwrap();
}

#[tokio::test]
async fn play_without_initialize_is_not_initialized() {
    let h = harness(vec![], Ok(true), None).await;
    let err = h.controller.play("spotify:track:t1").await.unwrap_err();
    assert!(matches!(err, PlayerError::NotInitialized));
}

#[tokio::test]
async fn initialize_requires_authentication() {
    let h = harness(vec![], Ok(true), None).await;
    h.session.clear().await;

    let err = h.controller.initialize(&h.sdk).await.unwrap_err();
    assert!(matches!(err, PlayerError::NotAuthenticated));
}

#[tokio::test]
async fn initialize_requires_loaded_sdk() {
    let mut h = harness(vec![], Ok(true), None).await;
    h.sdk.loaded = false;

    let err = h.controller.initialize(&h.sdk).await.unwrap_err();
    assert!(matches!(err, PlayerError::SdkInitializationFailed(_)));
}
