//! API v1 routes.

mod hosts;
mod placement;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/hosts", hosts::routes())
        .nest("/placement", placement::routes())
}
