//! Entity routes keyed by slug, plus the model metadata dump.
//! Static segments (`/meta`, `/select-options`) take precedence over the slug and id parameters.

use crate::handlers::{create, delete as delete_handler, list, meta, read, select_options, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/meta", get(meta))
        .route("/:entity", get(list).post(create))
        .route("/:entity/select-options", get(select_options))
        .route(
            "/:entity/:id",
            get(read).put(update).patch(update).delete(delete_handler),
        )
        .with_state(state)
}
