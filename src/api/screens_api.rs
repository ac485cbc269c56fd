use crate::error::{ApiError, ApiResult};
use crate::models::{NewScreen, Screen, UpdateScreen};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Serialize)]
pub struct ScreenStatus {
    pub screen_id: i32,
    pub is_online: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub assigned_playlist: Option<i32>,
}

pub async fn list_screens(State(state): State<AppState>) -> ApiResult<Json<Vec<Screen>>> {
    use crate::schema::screens::dsl::*;

    let mut conn = state.db.get()?;

    let results = screens.select(Screen::as_select()).load(&mut conn)?;

    Ok(Json(results))
}

pub async fn create_screen(
    State(state): State<AppState>,
    Json(new_screen): Json<NewScreen>,
) -> ApiResult<(StatusCode, Json<Screen>)> {
    use crate::schema::screens::dsl::*;

    let mut conn = state.db.get()?;

    let exists: i64 = screens
        .filter(name.eq(&new_screen.name))
        .count()
        .get_result(&mut conn)?;
    if exists > 0 {
        return Err(ApiError::Conflict(
            "Screen with this name already exists".to_string(),
        ));
    }

    let screen = diesel::insert_into(screens)
        .values(&new_screen)
        .returning(Screen::as_select())
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(screen)))
}

pub async fn get_screen(
    State(state): State<AppState>,
    Path(screen_id): Path<i32>,
) -> ApiResult<Json<Screen>> {
    let mut conn = state.db.get()?;

    let screen = find_screen(&mut conn, screen_id)?;

    Ok(Json(screen))
}

pub async fn update_screen(
    State(state): State<AppState>,
    Path(screen_id): Path<i32>,
    Json(updates): Json<UpdateScreen>,
) -> ApiResult<Json<Screen>> {
    use crate::schema::screens::dsl::*;

    let (connected_name, screen) = {
        let mut conn = state.db.get()?;

        let current = find_screen(&mut conn, screen_id)?;

        if let Some(new_name) = &updates.name {
            if *new_name != current.name {
                let taken: i64 = screens
                    .filter(name.eq(new_name))
                    .count()
                    .get_result(&mut conn)?;
                if taken > 0 {
                    return Err(ApiError::Conflict(
                        "Screen with this name already exists".to_string(),
                    ));
                }
            }
        }

        let updated = diesel::update(screens.filter(id.eq(screen_id)))
            .set(&updates)
            .returning(Screen::as_select())
            .get_result::<Screen>(&mut conn)?;

        (current.name, updated)
    };

    // A new assignment takes effect live when the screen is connected;
    // otherwise the screen picks it up on its next connect. A live
    // connection is registered under the pre-update name, so the push
    // targets that even when the same request renames the screen.
    if let Some(Some(playlist_id)) = updates.assigned_playlist_id {
        crate::websocket::push_playlist_update(&state, &connected_name, playlist_id).await;
    }

    Ok(Json(screen))
}

pub async fn delete_screen(
    State(state): State<AppState>,
    Path(screen_id): Path<i32>,
) -> ApiResult<StatusCode> {
    use crate::schema::screens::dsl::*;

    let mut conn = state.db.get()?;

    let deleted = diesel::delete(screens.filter(id.eq(screen_id))).execute(&mut conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound("screen"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_screen_status(
    State(state): State<AppState>,
    Path(screen_id): Path<i32>,
) -> ApiResult<Json<ScreenStatus>> {
    let mut conn = state.db.get()?;

    let screen = find_screen(&mut conn, screen_id)?;

    Ok(Json(ScreenStatus {
        screen_id: screen.id,
        is_online: screen.is_online,
        last_seen: screen.last_seen,
        assigned_playlist: screen.assigned_playlist_id,
    }))
}

fn find_screen(conn: &mut crate::db::DbConnection, screen_id: i32) -> ApiResult<Screen> {
    use crate::schema::screens::dsl::*;

    screens
        .filter(id.eq(screen_id))
        .select(Screen::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("screen"))
}
