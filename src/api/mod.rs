pub mod content_api;
pub mod playlists_api;
pub mod screens_api;

use crate::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        // Screens
        .route("/screens", get(screens_api::list_screens))
        .route("/screens", post(screens_api::create_screen))
        .route(
            "/screens/:id",
            get(screens_api::get_screen)
                .put(screens_api::update_screen)
                .delete(screens_api::delete_screen),
        )
        .route("/screens/:id/status", get(screens_api::get_screen_status))
        // Playlists
        .route("/playlists", get(playlists_api::list_playlists))
        .route("/playlists", post(playlists_api::create_playlist))
        .route(
            "/playlists/:id",
            get(playlists_api::get_playlist)
                .put(playlists_api::update_playlist)
                .delete(playlists_api::delete_playlist),
        )
        .route("/playlists/:id/full", get(playlists_api::get_playlist_full))
        // Playlist items
        .route("/playlists/:id/items", post(playlists_api::add_item))
        .route(
            "/playlists/:id/items/:item_id",
            delete(playlists_api::remove_item),
        )
        .route(
            "/playlists/:id/items/reorder",
            put(playlists_api::reorder_items),
        )
        // Schedules
        .route(
            "/playlists/:id/schedules",
            get(playlists_api::list_schedules).post(playlists_api::create_schedule),
        )
        .route(
            "/playlists/:id/schedules/:schedule_id",
            put(playlists_api::update_schedule).delete(playlists_api::delete_schedule),
        )
        .route(
            "/playlists/:id/active-schedule",
            get(playlists_api::get_active_schedule),
        )
        // Content items (metadata only; upload/conversion lives elsewhere)
        .route("/content", get(content_api::list_content_items))
        .route("/content", post(content_api::create_content_item))
        .route(
            "/content/:id",
            get(content_api::get_content_item).delete(content_api::delete_content_item),
        )
}
