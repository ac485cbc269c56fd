use crate::error::ApiResult;
use crate::services::playlist_materializer::{self, PlaylistPayload};
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;

// Server → Screen messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "playlist_update")]
    PlaylistUpdate { playlist: PlaylistPayload },
    #[serde(rename = "ping")]
    Ping,
    // Admin-supplied broadcast payload, forwarded as-is.
    #[serde(untagged)]
    Custom(serde_json::Value),
}

// Screen → Server messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ScreenMessage {
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "status_update")]
    StatusUpdate {
        #[serde(default)]
        status: serde_json::Value,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: serde_json::Value,
    },
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Path(screen_name): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, screen_name))
}

async fn handle_socket(socket: WebSocket, state: AppState, screen_name: String) {
    // Find or auto-register the screen record before accepting traffic.
    let screen = match mark_screen_online(&state, &screen_name).await {
        Ok(screen) => screen,
        Err(e) => {
            tracing::error!("Failed to register screen {}: {}", screen_name, e);
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerMessage>();

    // Forward messages from the registry channel to the WebSocket. When the
    // registry drops our sender (replacement by a newer connection), rx
    // drains and this task ends, tearing the session down.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // The registry owns the only sender; replacement closes the channel.
    let connection_id = state.registry.register(&screen_name, tx).await;

    // Push the current playlist immediately if one is assigned.
    if let Some(playlist_id) = screen.assigned_playlist_id {
        push_playlist_update(&state, &screen_name, playlist_id).await;
    }

    let state_clone = state.clone();
    let recv_screen_name = screen_name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                // Unrecognized message types fail to parse and are ignored.
                let Ok(screen_msg) = serde_json::from_str::<ScreenMessage>(&text) else {
                    continue;
                };
                match screen_msg {
                    ScreenMessage::Pong => {
                        if let Err(e) = touch_last_seen(&state_clone, &recv_screen_name).await {
                            tracing::error!(
                                "Failed to update last_seen for {}: {}",
                                recv_screen_name,
                                e
                            );
                        }
                    }
                    ScreenMessage::StatusUpdate { status } => {
                        tracing::info!("Status update from {}: {}", recv_screen_name, status);
                    }
                    ScreenMessage::Error { error } => {
                        tracing::warn!("Error reported by {}: {}", recv_screen_name, error);
                    }
                }
            }
        }
    });

    // Wait for either side to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    // Best-effort cleanup. Only the connection that still owns the registry
    // entry marks the screen offline; a superseded session must not clobber
    // the state of its replacement.
    if state.registry.unregister(&screen_name, connection_id).await {
        if let Err(e) = mark_screen_offline(&state, &screen_name).await {
            tracing::error!("Failed to mark screen {} offline: {}", screen_name, e);
        }
        tracing::info!("Screen {} disconnected", screen_name);
    } else {
        tracing::debug!("Screen {} session superseded, skipping offline mark", screen_name);
    }
}

/// Materializes and pushes the playlist to one screen. A screen that is not
/// currently registered simply misses the push; it will receive current
/// state on its next connect.
pub async fn push_playlist_update(state: &AppState, screen_name: &str, playlist_id: i32) {
    let payload = {
        let mut conn = match state.db.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Database connection error: {}", e);
                return;
            }
        };
        match playlist_materializer::materialize(&mut conn, playlist_id) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to materialize playlist {}: {}", playlist_id, e);
                return;
            }
        }
    };

    state
        .registry
        .send(screen_name, ServerMessage::PlaylistUpdate { playlist: payload })
        .await;
}

/// Pushes a fresh playlist payload to every screen the playlist is assigned
/// to, so admin edits propagate live.
pub async fn notify_playlist_screens(state: &AppState, playlist_id: i32) {
    use crate::schema::screens::dsl;

    let names: Vec<String> = {
        let Ok(mut conn) = state.db.get() else {
            tracing::error!("Database connection error while notifying screens");
            return;
        };
        match dsl::screens
            .filter(dsl::assigned_playlist_id.eq(playlist_id))
            .select(dsl::name)
            .load(&mut conn)
        {
            Ok(names) => names,
            Err(e) => {
                tracing::error!("Failed to load screens for playlist {}: {}", playlist_id, e);
                return;
            }
        }
    };

    for name in names {
        push_playlist_update(state, &name, playlist_id).await;
    }
}

async fn mark_screen_online(
    state: &AppState,
    screen_name: &str,
) -> Result<crate::models::Screen, String> {
    use crate::schema::screens::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| "Database connection error".to_string())?;

    let existing = dsl::screens
        .filter(dsl::name.eq(screen_name))
        .select(crate::models::Screen::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|e| e.to_string())?;

    let screen = match existing {
        Some(screen) => diesel::update(dsl::screens.filter(dsl::id.eq(screen.id)))
            .set((
                dsl::is_online.eq(true),
                dsl::last_seen.eq(Utc::now().naive_utc()),
            ))
            .returning(crate::models::Screen::as_select())
            .get_result(&mut conn)
            .map_err(|e| e.to_string())?,
        None => {
            tracing::info!("Auto-registering screen {}", screen_name);
            diesel::insert_into(dsl::screens)
                .values((
                    dsl::name.eq(screen_name),
                    dsl::location.eq("Auto-registered"),
                    dsl::is_active.eq(true),
                    dsl::is_online.eq(true),
                    dsl::last_seen.eq(Utc::now().naive_utc()),
                ))
                .returning(crate::models::Screen::as_select())
                .get_result(&mut conn)
                .map_err(|e| e.to_string())?
        }
    };

    Ok(screen)
}

async fn touch_last_seen(state: &AppState, screen_name: &str) -> Result<(), String> {
    use crate::schema::screens::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| "Database connection error".to_string())?;

    diesel::update(dsl::screens.filter(dsl::name.eq(screen_name)))
        .set(dsl::last_seen.eq(Utc::now().naive_utc()))
        .execute(&mut conn)
        .map_err(|e| e.to_string())?;

    Ok(())
}

async fn mark_screen_offline(state: &AppState, screen_name: &str) -> Result<(), String> {
    use crate::schema::screens::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| "Database connection error".to_string())?;

    diesel::update(dsl::screens.filter(dsl::name.eq(screen_name)))
        .set((
            dsl::is_online.eq(false),
            dsl::last_seen.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(|e| e.to_string())?;

    Ok(())
}

// Admin-facing push endpoints

#[derive(Serialize)]
pub struct BroadcastResponse {
    pub message: String,
    pub recipients: usize,
}

pub async fn broadcast_message(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Json<BroadcastResponse> {
    let recipients = state.registry.broadcast(ServerMessage::Custom(payload)).await;

    Json(BroadcastResponse {
        message: "Broadcast sent".to_string(),
        recipients,
    })
}

pub async fn reload_screen(
    State(state): State<AppState>,
    Path(screen_name): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    use crate::schema::screens::dsl;

    let screen: crate::models::Screen = {
        let mut conn = state.db.get()?;
        dsl::screens
            .filter(dsl::name.eq(&screen_name))
            .select(crate::models::Screen::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or(crate::error::ApiError::NotFound("screen"))?
    };

    match screen.assigned_playlist_id {
        Some(playlist_id) => {
            push_playlist_update(&state, &screen_name, playlist_id).await;
            Ok(Json(json!({
                "message": format!("Reload command sent to {}", screen_name)
            })))
        }
        None => Ok(Json(json!({ "message": "No playlist assigned to screen" }))),
    }
}

pub async fn connected_screens(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connected = state.registry.connected_screens().await;

    Json(json!({
        "count": connected.len(),
        "connected_screens": connected,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{NewContentItem, NewPlaylist, NewPlaylistItem, Playlist, Screen};
    use crate::registry::ConnectionRegistry;
    use std::sync::Arc;
    use tokio::sync::mpsc::unbounded_channel;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = crate::db::create_pool(db_path.to_str().unwrap()).unwrap();
        crate::db::run_migrations(&mut pool.get().unwrap()).unwrap();

        let config: Config = toml::from_str(Config::default_template()).unwrap();
        let state = AppState {
            db: pool,
            config: Arc::new(config),
            registry: ConnectionRegistry::new(),
        };
        (state, dir)
    }

    fn seed_playlist_with_item(state: &AppState) -> Playlist {
        use crate::schema::{content_items, playlist_items, playlists};

        let mut conn = state.db.get().unwrap();

        let playlist: Playlist = diesel::insert_into(playlists::table)
            .values(&NewPlaylist {
                name: "Lobby".to_string(),
                description: None,
                is_active: true,
                loop_enabled: true,
                shuffle: false,
                created_by: Some(1),
            })
            .returning(Playlist::as_select())
            .get_result(&mut conn)
            .unwrap();

        let content: crate::models::ContentItem = diesel::insert_into(content_items::table)
            .values(&NewContentItem {
                content_id: 1,
                item_number: 1,
                file_path: "/storage/uploads/pdf_1_page_1.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
                duration: 12,
            })
            .returning(crate::models::ContentItem::as_select())
            .get_result(&mut conn)
            .unwrap();

        diesel::insert_into(playlist_items::table)
            .values(&NewPlaylistItem {
                playlist_id: playlist.id,
                content_item_id: content.id,
                position: 0,
                duration_override: None,
            })
            .execute(&mut conn)
            .unwrap();

        playlist
    }

    fn load_screen(state: &AppState, screen_name: &str) -> Screen {
        use crate::schema::screens::dsl;

        let mut conn = state.db.get().unwrap();
        dsl::screens
            .filter(dsl::name.eq(screen_name))
            .select(Screen::as_select())
            .first(&mut conn)
            .unwrap()
    }

    #[tokio::test]
    async fn first_connect_auto_registers_screen_online() {
        let (state, _dir) = test_state();

        let screen = mark_screen_online(&state, "lobby-1").await.unwrap();
        assert!(screen.is_online);
        assert!(screen.last_seen.is_some());
        assert_eq!(screen.location.as_deref(), Some("Auto-registered"));
        // A freshly auto-registered screen has nothing assigned, so the
        // session handler sends no playlist push.
        assert_eq!(screen.assigned_playlist_id, None);

        // A reconnect reuses the record instead of creating a second one.
        let again = mark_screen_online(&state, "lobby-1").await.unwrap();
        assert_eq!(again.id, screen.id);
    }

    #[tokio::test]
    async fn assigning_playlist_pushes_update_to_connected_screen() {
        let (state, _dir) = test_state();

        mark_screen_online(&state, "lobby-1").await.unwrap();
        let (tx, mut rx) = unbounded_channel();
        state.registry.register("lobby-1", tx).await;
        assert!(rx.try_recv().is_err());

        let playlist = seed_playlist_with_item(&state);
        push_playlist_update(&state, "lobby-1", playlist.id).await;

        match rx.try_recv().unwrap() {
            ServerMessage::PlaylistUpdate { playlist: payload } => {
                assert_eq!(payload.id, playlist.id);
                assert_eq!(payload.items.len(), 1);
            }
            other => panic!("expected playlist_update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn disconnect_marks_screen_offline() {
        let (state, _dir) = test_state();

        mark_screen_online(&state, "lobby-1").await.unwrap();
        assert!(load_screen(&state, "lobby-1").is_online);

        mark_screen_offline(&state, "lobby-1").await.unwrap();

        let screen = load_screen(&state, "lobby-1");
        assert!(!screen.is_online);
        assert!(screen.last_seen.is_some());
    }

    #[test]
    fn server_messages_carry_type_tags() {
        let json = serde_json::to_value(&ServerMessage::Ping).unwrap();
        assert_eq!(json, json!({ "type": "ping" }));

        let custom = ServerMessage::Custom(json!({ "type": "maintenance", "at": "22:00" }));
        let json = serde_json::to_value(&custom).unwrap();
        assert_eq!(json["type"], "maintenance");
    }

    #[test]
    fn screen_messages_dispatch_by_type_tag() {
        let msg: ScreenMessage = serde_json::from_str(r#"{"type": "pong"}"#).unwrap();
        assert!(matches!(msg, ScreenMessage::Pong));

        let msg: ScreenMessage =
            serde_json::from_str(r#"{"type": "status_update", "status": {"playing": 3}}"#).unwrap();
        assert!(matches!(msg, ScreenMessage::StatusUpdate { .. }));

        // Unknown tags fail to parse; the session loop drops them silently.
        assert!(serde_json::from_str::<ScreenMessage>(r#"{"type": "selfie"}"#).is_err());
    }
}
