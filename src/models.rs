use chrono::{NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Screen models
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::screens)]
pub struct Screen {
    pub id: i32,
    pub name: String,
    pub location: Option<String>,
    pub is_active: bool,
    pub is_online: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub assigned_playlist_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::screens)]
pub struct NewScreen {
    pub name: String,
    pub location: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::screens)]
pub struct UpdateScreen {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
    // Missing field leaves the assignment alone, explicit null clears it.
    #[serde(default)]
    pub assigned_playlist_id: Option<Option<i32>>,
}

// Playlist models
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::playlists)]
pub struct Playlist {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub loop_enabled: bool,
    pub shuffle: bool,
    // Owner reference into the external user service; opaque here.
    pub created_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::playlists)]
pub struct NewPlaylist {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub loop_enabled: bool,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub created_by: Option<i32>,
}

#[derive(Debug, Default, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::playlists)]
pub struct UpdatePlaylist {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub loop_enabled: Option<bool>,
    pub shuffle: Option<bool>,
}

// Playlist item models
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::playlist_items)]
pub struct PlaylistItem {
    pub id: i32,
    pub playlist_id: i32,
    pub content_item_id: i32,
    #[serde(rename = "order")]
    pub position: i32,
    pub duration_override: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::playlist_items)]
pub struct NewPlaylistItem {
    pub playlist_id: i32,
    pub content_item_id: i32,
    pub position: i32,
    pub duration_override: Option<i32>,
}

// Schedule models
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::playlist_schedules)]
pub struct PlaylistSchedule {
    pub id: i32,
    pub playlist_id: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub is_active: bool,
}

impl PlaylistSchedule {
    /// Day flags in weekday order, Monday = index 0 .. Sunday = index 6.
    pub fn day_flags(&self) -> [bool; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::playlist_schedules)]
pub struct NewPlaylistSchedule {
    pub playlist_id: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub is_active: bool,
}

// Content item models
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::content_items)]
pub struct ContentItem {
    pub id: i32,
    pub content_id: i32,
    pub item_number: i32,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub duration: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::content_items)]
pub struct NewContentItem {
    pub content_id: i32,
    pub item_number: i32,
    pub file_path: String,
    pub mime_type: Option<String>,
    #[serde(default = "default_duration")]
    pub duration: i32,
}

fn default_true() -> bool {
    true
}

fn default_duration() -> i32 {
    10
}
