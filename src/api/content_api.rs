use crate::error::{ApiError, ApiResult};
use crate::models::{ContentItem, NewContentItem};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ContentItemFilter {
    pub content_id: Option<i32>,
}

pub async fn list_content_items(
    State(state): State<AppState>,
    Query(filter): Query<ContentItemFilter>,
) -> ApiResult<Json<Vec<ContentItem>>> {
    use crate::schema::content_items::dsl;

    let mut conn = state.db.get()?;

    let mut query = dsl::content_items.into_boxed();
    if let Some(parent_id) = filter.content_id {
        query = query.filter(dsl::content_id.eq(parent_id));
    }

    let results = query
        .order(dsl::item_number.asc())
        .select(ContentItem::as_select())
        .load(&mut conn)?;

    Ok(Json(results))
}

pub async fn create_content_item(
    State(state): State<AppState>,
    Json(new_item): Json<NewContentItem>,
) -> ApiResult<(StatusCode, Json<ContentItem>)> {
    use crate::schema::content_items;

    if new_item.duration <= 0 {
        return Err(ApiError::Validation(
            "duration must be positive".to_string(),
        ));
    }

    let mut conn = state.db.get()?;

    let item = diesel::insert_into(content_items::table)
        .values(&new_item)
        .returning(ContentItem::as_select())
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_content_item(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> ApiResult<Json<ContentItem>> {
    use crate::schema::content_items::dsl;

    let mut conn = state.db.get()?;

    let item = dsl::content_items
        .filter(dsl::id.eq(item_id))
        .select(ContentItem::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or(ApiError::NotFound("content item"))?;

    Ok(Json(item))
}

pub async fn delete_content_item(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> ApiResult<StatusCode> {
    use crate::schema::{content_items, playlist_items};

    let mut conn = state.db.get()?;

    // Playlist items pointing at this content become orphans and would be
    // silently skipped at materialization; drop them with it.
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(
            playlist_items::table.filter(playlist_items::content_item_id.eq(item_id)),
        )
        .execute(conn)?;
        diesel::delete(content_items::table.filter(content_items::id.eq(item_id))).execute(conn)
    })
    .map_err(ApiError::from)
    .and_then(|deleted| {
        if deleted == 0 {
            Err(ApiError::NotFound("content item"))
        } else {
            Ok(())
        }
    })?;

    Ok(StatusCode::NO_CONTENT)
}
