//! Assembles the denormalized playlist payload streamed to screens.
//!
//! Items are ordered by their position field; each one resolves to the
//! referenced content item with the duration override applied when present.
//! A playlist item whose content item has gone missing is skipped with a
//! warning rather than failing the whole payload.

use crate::db::DbConnection;
use crate::error::{ApiError, ApiResult};
use crate::models::{ContentItem, Playlist, PlaylistItem};
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistPayload {
    pub id: i32,
    pub name: String,
    #[serde(rename = "loop")]
    pub loop_enabled: bool,
    pub shuffle: bool,
    pub items: Vec<PayloadItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadItem {
    pub id: i32,
    pub order: i32,
    pub duration: i32,
    pub content: PayloadContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadContent {
    pub id: i32,
    pub content_id: i32,
    pub item_number: i32,
    pub file_path: String,
    pub content_type: String,
    pub mime_type: Option<String>,
}

pub fn materialize(conn: &mut DbConnection, playlist_id: i32) -> ApiResult<PlaylistPayload> {
    use crate::schema::{content_items, playlist_items};

    let playlist: Playlist = crate::schema::playlists::table
        .find(playlist_id)
        .select(Playlist::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("playlist"))?;

    let rows: Vec<(PlaylistItem, Option<ContentItem>)> = playlist_items::table
        .left_join(content_items::table)
        .filter(playlist_items::playlist_id.eq(playlist_id))
        .select((
            PlaylistItem::as_select(),
            Option::<ContentItem>::as_select(),
        ))
        .load(conn)?;

    Ok(build_payload(&playlist, rows))
}

/// Pure payload assembly; separated from the database load for testing.
pub fn build_payload(
    playlist: &Playlist,
    mut rows: Vec<(PlaylistItem, Option<ContentItem>)>,
) -> PlaylistPayload {
    rows.sort_by_key(|(item, _)| item.position);

    let items = rows
        .into_iter()
        .filter_map(|(item, content)| match content {
            Some(content) => Some(PayloadItem {
                id: item.id,
                order: item.position,
                duration: item.duration_override.unwrap_or(content.duration),
                content: PayloadContent {
                    id: content.id,
                    content_id: content.content_id,
                    item_number: content.item_number,
                    file_path: content.file_path,
                    // Screens receive rasterized images regardless of the
                    // original upload type.
                    content_type: "image".to_string(),
                    mime_type: content.mime_type,
                },
            }),
            None => {
                tracing::warn!(
                    "Playlist {} item {} references a missing content item {}, skipping",
                    playlist.id,
                    item.id,
                    item.content_item_id
                );
                None
            }
        })
        .collect();

    PlaylistPayload {
        id: playlist.id,
        name: playlist.name.clone(),
        loop_enabled: playlist.loop_enabled,
        shuffle: playlist.shuffle,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn playlist() -> Playlist {
        Playlist {
            id: 1,
            name: "Lobby".to_string(),
            description: None,
            is_active: true,
            loop_enabled: true,
            shuffle: false,
            created_by: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    fn item(id: i32, position: i32, duration_override: Option<i32>) -> PlaylistItem {
        PlaylistItem {
            id,
            playlist_id: 1,
            content_item_id: id * 10,
            position,
            duration_override,
        }
    }

    fn content(id: i32, duration: i32) -> ContentItem {
        ContentItem {
            id,
            content_id: 99,
            item_number: 1,
            file_path: format!("/storage/uploads/item_{}.jpg", id),
            mime_type: Some("image/jpeg".to_string()),
            duration,
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn items_are_sorted_by_position() {
        let rows = vec![
            (item(1, 2, None), Some(content(10, 10))),
            (item(2, 0, None), Some(content(20, 10))),
            (item(3, 1, None), Some(content(30, 10))),
        ];

        let payload = build_payload(&playlist(), rows);

        let orders: Vec<i32> = payload.items.iter().map(|i| i.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn duration_override_wins_over_intrinsic_duration() {
        let rows = vec![
            (item(1, 0, Some(25)), Some(content(10, 10))),
            (item(2, 1, None), Some(content(20, 15))),
        ];

        let payload = build_payload(&playlist(), rows);

        assert_eq!(payload.items[0].duration, 25);
        assert_eq!(payload.items[1].duration, 15);
    }

    #[test]
    fn orphan_items_are_skipped_not_fatal() {
        let rows = vec![
            (item(1, 0, None), Some(content(10, 10))),
            (item(2, 1, None), None),
            (item(3, 2, None), Some(content(30, 10))),
        ];

        let payload = build_payload(&playlist(), rows);

        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[0].id, 1);
        assert_eq!(payload.items[1].id, 3);
    }

    #[test]
    fn payload_serializes_loop_flag_under_wire_name() {
        let payload = build_payload(&playlist(), vec![]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["loop"], serde_json::Value::Bool(true));
        assert!(json.get("loop_enabled").is_none());
    }

    #[test]
    fn materializes_against_a_real_database() {
        use crate::models::{NewContentItem, NewPlaylist, NewPlaylistItem};
        use crate::schema::{content_items, playlist_items, playlists};

        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = crate::db::create_pool(db_path.to_str().unwrap()).unwrap();
        let mut conn = pool.get().unwrap();
        crate::db::run_migrations(&mut conn).unwrap();

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

        let content: ContentItem = diesel::insert_into(content_items::table)
            .values(&NewContentItem {
                content_id: 1,
                item_number: 1,
                file_path: "/storage/uploads/pdf_1_page_1.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
                duration: 12,
            })
            .returning(ContentItem::as_select())
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

        let payload = materialize(&mut conn, playlist.id).unwrap();
        assert_eq!(payload.name, "Lobby");
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].duration, 12);
        assert_eq!(payload.items[0].content.content_type, "image");

        let missing = materialize(&mut conn, playlist.id + 1);
        assert!(matches!(
            missing,
            Err(crate::error::ApiError::NotFound("playlist"))
        ));
    }
}
