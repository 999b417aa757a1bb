use axum::Router;

use crate::db::AppState;

mod dto;
pub mod handlers;
pub(crate) mod jwt;
mod password;
pub mod repo;
mod tokens;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
