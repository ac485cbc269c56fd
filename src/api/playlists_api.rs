use crate::error::{ApiError, ApiResult};
use crate::models::{
    ContentItem, NewPlaylist, NewPlaylistItem, NewPlaylistSchedule, Playlist, PlaylistItem,
    PlaylistSchedule, UpdatePlaylist,
};
use crate::services::schedule_resolver;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Local, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

pub async fn list_playlists(State(state): State<AppState>) -> ApiResult<Json<Vec<Playlist>>> {
    use crate::schema::playlists::dsl::*;

    let mut conn = state.db.get()?;

    let results = playlists.select(Playlist::as_select()).load(&mut conn)?;

    Ok(Json(results))
}

pub async fn create_playlist(
    State(state): State<AppState>,
    Json(new_playlist): Json<NewPlaylist>,
) -> ApiResult<(StatusCode, Json<Playlist>)> {
    use crate::schema::playlists;

    let mut conn = state.db.get()?;

    let playlist = diesel::insert_into(playlists::table)
        .values(&new_playlist)
        .returning(Playlist::as_select())
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(playlist)))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
) -> ApiResult<Json<Playlist>> {
    let mut conn = state.db.get()?;

    let playlist = find_playlist(&mut conn, playlist_id)?;

    Ok(Json(playlist))
}

#[derive(Serialize)]
pub struct PlaylistWithContent {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub items_detailed: Vec<DetailedItem>,
    pub schedules: Vec<PlaylistSchedule>,
}

#[derive(Serialize)]
pub struct DetailedItem {
    pub id: i32,
    pub order: i32,
    pub duration: i32,
    pub content_item: ContentItem,
}

pub async fn get_playlist_full(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
) -> ApiResult<Json<PlaylistWithContent>> {
    use crate::schema::{content_items, playlist_items, playlist_schedules};

    let mut conn = state.db.get()?;

    let playlist = find_playlist(&mut conn, playlist_id)?;

    let mut rows: Vec<(PlaylistItem, Option<ContentItem>)> = playlist_items::table
        .left_join(content_items::table)
        .filter(playlist_items::playlist_id.eq(playlist_id))
        .select((
            PlaylistItem::as_select(),
            Option::<ContentItem>::as_select(),
        ))
        .load(&mut conn)?;
    rows.sort_by_key(|(item, _)| item.position);

    let items_detailed = rows
        .into_iter()
        .filter_map(|(item, content)| {
            content.map(|content| DetailedItem {
                id: item.id,
                order: item.position,
                duration: item.duration_override.unwrap_or(content.duration),
                content_item: content,
            })
        })
        .collect();

    let schedules = playlist_schedules::table
        .filter(playlist_schedules::playlist_id.eq(playlist_id))
        .select(PlaylistSchedule::as_select())
        .load(&mut conn)?;

    Ok(Json(PlaylistWithContent {
        playlist,
        items_detailed,
        schedules,
    }))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
    Json(updates): Json<UpdatePlaylist>,
) -> ApiResult<Json<Playlist>> {
    use crate::schema::playlists::dsl::*;

    let playlist = {
        let mut conn = state.db.get()?;

        find_playlist(&mut conn, playlist_id)?;

        diesel::update(playlists.filter(id.eq(playlist_id)))
            .set(&updates)
            .returning(Playlist::as_select())
            .get_result::<Playlist>(&mut conn)?
    };

    // Loop/shuffle/name changes matter to playing screens.
    crate::websocket::notify_playlist_screens(&state, playlist_id).await;

    Ok(Json(playlist))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
) -> ApiResult<StatusCode> {
    use crate::schema::{playlist_items, playlist_schedules, playlists, screens};

    let mut conn = state.db.get()?;

    find_playlist(&mut conn, playlist_id)?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::update(screens::table.filter(screens::assigned_playlist_id.eq(playlist_id)))
            .set(screens::assigned_playlist_id.eq(None::<i32>))
            .execute(conn)?;
        diesel::delete(
            playlist_items::table.filter(playlist_items::playlist_id.eq(playlist_id)),
        )
        .execute(conn)?;
        diesel::delete(
            playlist_schedules::table.filter(playlist_schedules::playlist_id.eq(playlist_id)),
        )
        .execute(conn)?;
        diesel::delete(playlists::table.filter(playlists::id.eq(playlist_id))).execute(conn)?;
        Ok(())
    })?;

    Ok(StatusCode::NO_CONTENT)
}

// Playlist item management

#[derive(Deserialize)]
pub struct PlaylistItemCreate {
    pub content_item_id: i32,
    #[serde(rename = "order")]
    pub position: i32,
    pub duration_override: Option<i32>,
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
    Json(input): Json<PlaylistItemCreate>,
) -> ApiResult<(StatusCode, Json<PlaylistItem>)> {
    use crate::schema::{content_items, playlist_items};

    let item = {
        let mut conn = state.db.get()?;

        find_playlist(&mut conn, playlist_id)?;

        let content_exists: i64 = content_items::table
            .filter(content_items::id.eq(input.content_item_id))
            .count()
            .get_result(&mut conn)?;
        if content_exists == 0 {
            return Err(ApiError::NotFound("content item"));
        }

        diesel::insert_into(playlist_items::table)
            .values(&NewPlaylistItem {
                playlist_id,
                content_item_id: input.content_item_id,
                position: input.position,
                duration_override: input.duration_override,
            })
            .returning(PlaylistItem::as_select())
            .get_result::<PlaylistItem>(&mut conn)?
    };

    crate::websocket::notify_playlist_screens(&state, playlist_id).await;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((playlist_id, item_id)): Path<(i32, i32)>,
) -> ApiResult<StatusCode> {
    use crate::schema::playlist_items::dsl;

    {
        let mut conn = state.db.get()?;

        let deleted = diesel::delete(
            dsl::playlist_items
                .filter(dsl::id.eq(item_id))
                .filter(dsl::playlist_id.eq(playlist_id)),
        )
        .execute(&mut conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound("playlist item"));
        }
    }

    crate::websocket::notify_playlist_screens(&state, playlist_id).await;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ItemOrder {
    pub id: i32,
    pub order: i32,
}

pub async fn reorder_items(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
    Json(item_orders): Json<Vec<ItemOrder>>,
) -> ApiResult<Json<serde_json::Value>> {
    use crate::schema::playlist_items;

    {
        let mut conn = state.db.get()?;

        find_playlist(&mut conn, playlist_id)?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            for item_order in &item_orders {
                diesel::update(
                    playlist_items::table
                        .filter(playlist_items::id.eq(item_order.id))
                        .filter(playlist_items::playlist_id.eq(playlist_id)),
                )
                .set(playlist_items::position.eq(item_order.order))
                .execute(conn)?;
            }
            Ok(())
        })?;
    }

    crate::websocket::notify_playlist_screens(&state, playlist_id).await;

    Ok(Json(serde_json::json!({
        "message": "Playlist items reordered successfully"
    })))
}

// Schedule management

#[derive(Debug, Deserialize)]
pub struct ScheduleInput {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub monday: bool,
    #[serde(default)]
    pub tuesday: bool,
    #[serde(default)]
    pub wednesday: bool,
    #[serde(default)]
    pub thursday: bool,
    #[serde(default)]
    pub friday: bool,
    #[serde(default)]
    pub saturday: bool,
    #[serde(default)]
    pub sunday: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl ScheduleInput {
    fn day_flags(&self) -> [bool; 7] {
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

    fn parse_window(&self) -> ApiResult<(NaiveTime, NaiveTime)> {
        let start = schedule_resolver::parse_time_of_day(&self.start_time).ok_or_else(|| {
            ApiError::Validation(format!("Invalid start_time: {}", self.start_time))
        })?;
        let end = schedule_resolver::parse_time_of_day(&self.end_time)
            .ok_or_else(|| ApiError::Validation(format!("Invalid end_time: {}", self.end_time)))?;
        if start >= end {
            return Err(ApiError::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }
        Ok((start, end))
    }
}

pub async fn list_schedules(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
) -> ApiResult<Json<Vec<PlaylistSchedule>>> {
    let mut conn = state.db.get()?;

    find_playlist(&mut conn, playlist_id)?;
    let schedules = load_schedules(&mut conn, playlist_id)?;

    Ok(Json(schedules))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
    Json(input): Json<ScheduleInput>,
) -> ApiResult<(StatusCode, Json<PlaylistSchedule>)> {
    use crate::schema::playlist_schedules;

    let schedule = {
        let mut conn = state.db.get()?;

        find_playlist(&mut conn, playlist_id)?;
        let (start, end) = input.parse_window()?;

        // The overlap invariant is checked before any write; a rejected
        // schedule leaves existing state untouched.
        let existing = load_schedules(&mut conn, playlist_id)?;
        if schedule_resolver::has_overlap(&existing, start, end, &input.day_flags(), None) {
            return Err(ApiError::Conflict(
                "Schedule overlaps with existing schedule on same days and times".to_string(),
            ));
        }

        diesel::insert_into(playlist_schedules::table)
            .values(&NewPlaylistSchedule {
                playlist_id,
                start_time: start,
                end_time: end,
                monday: input.monday,
                tuesday: input.tuesday,
                wednesday: input.wednesday,
                thursday: input.thursday,
                friday: input.friday,
                saturday: input.saturday,
                sunday: input.sunday,
                is_active: input.is_active,
            })
            .returning(PlaylistSchedule::as_select())
            .get_result::<PlaylistSchedule>(&mut conn)?
    };

    crate::websocket::notify_playlist_screens(&state, playlist_id).await;

    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path((playlist_id, schedule_id)): Path<(i32, i32)>,
    Json(input): Json<ScheduleInput>,
) -> ApiResult<Json<PlaylistSchedule>> {
    use crate::schema::playlist_schedules::dsl;

    let schedule = {
        let mut conn = state.db.get()?;

        let exists: i64 = dsl::playlist_schedules
            .filter(dsl::id.eq(schedule_id))
            .filter(dsl::playlist_id.eq(playlist_id))
            .count()
            .get_result(&mut conn)?;
        if exists == 0 {
            return Err(ApiError::NotFound("schedule"));
        }

        let (start, end) = input.parse_window()?;

        let existing = load_schedules(&mut conn, playlist_id)?;
        if schedule_resolver::has_overlap(
            &existing,
            start,
            end,
            &input.day_flags(),
            Some(schedule_id),
        ) {
            return Err(ApiError::Conflict(
                "Schedule overlaps with existing schedule on same days and times".to_string(),
            ));
        }

        diesel::update(dsl::playlist_schedules.filter(dsl::id.eq(schedule_id)))
            .set((
                dsl::start_time.eq(start),
                dsl::end_time.eq(end),
                dsl::monday.eq(input.monday),
                dsl::tuesday.eq(input.tuesday),
                dsl::wednesday.eq(input.wednesday),
                dsl::thursday.eq(input.thursday),
                dsl::friday.eq(input.friday),
                dsl::saturday.eq(input.saturday),
                dsl::sunday.eq(input.sunday),
                dsl::is_active.eq(input.is_active),
            ))
            .returning(PlaylistSchedule::as_select())
            .get_result::<PlaylistSchedule>(&mut conn)?
    };

    crate::websocket::notify_playlist_screens(&state, playlist_id).await;

    Ok(Json(schedule))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path((playlist_id, schedule_id)): Path<(i32, i32)>,
) -> ApiResult<StatusCode> {
    use crate::schema::playlist_schedules::dsl;

    {
        let mut conn = state.db.get()?;

        let deleted = diesel::delete(
            dsl::playlist_schedules
                .filter(dsl::id.eq(schedule_id))
                .filter(dsl::playlist_id.eq(playlist_id)),
        )
        .execute(&mut conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound("schedule"));
        }
    }

    crate::websocket::notify_playlist_screens(&state, playlist_id).await;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct ActiveScheduleResponse {
    pub schedule: Option<PlaylistSchedule>,
    pub is_active: bool,
    pub current_time: String,
}

pub async fn get_active_schedule(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
) -> ApiResult<Json<ActiveScheduleResponse>> {
    let mut conn = state.db.get()?;

    find_playlist(&mut conn, playlist_id)?;
    let schedules = load_schedules(&mut conn, playlist_id)?;

    // Single operational timezone: the host's local clock.
    let now = Local::now();
    let current_time = now.time();

    let active =
        schedule_resolver::resolve_active(&schedules, now.weekday(), current_time).cloned();

    Ok(Json(ActiveScheduleResponse {
        is_active: active.is_some(),
        schedule: active,
        current_time: current_time.format("%H:%M:%S").to_string(),
    }))
}

fn find_playlist(conn: &mut crate::db::DbConnection, playlist_id: i32) -> ApiResult<Playlist> {
    use crate::schema::playlists::dsl::*;

    playlists
        .filter(id.eq(playlist_id))
        .select(Playlist::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("playlist"))
}

fn load_schedules(
    conn: &mut crate::db::DbConnection,
    playlist: i32,
) -> ApiResult<Vec<PlaylistSchedule>> {
    use crate::schema::playlist_schedules::dsl;

    let schedules = dsl::playlist_schedules
        .filter(dsl::playlist_id.eq(playlist))
        .select(PlaylistSchedule::as_select())
        .load(conn)?;

    Ok(schedules)
}
