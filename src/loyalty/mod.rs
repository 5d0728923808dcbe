pub mod catalog;
mod dto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod model;
mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
