pub mod playlist_materializer;
pub mod schedule_resolver;
