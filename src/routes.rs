use super::{config::RPC_PREFIX, controllers, middleware, models, rpc};
use axum::{
    middleware::from_fn,
    routing::{get, post, Router},
};

/// HTML pages and fragments
#[rustfmt::skip]
fn page_routes() -> Router<models::AppState> {
    Router::new()
        .route("/", get(controllers::root))
        .route("/todos", get(controllers::list_todos))
        .route("/todos", post(controllers::add_todo))
        .route("/todos/:id/done", post(controllers::set_done))
        .layer(from_fn(middleware::html_headers))
}

/// JSON remote procedures
#[rustfmt::skip]
fn rpc_routes() -> Router<models::AppState> {
    Router::new()
        .route("/:procedures", get(rpc::query).post(rpc::mutation))
}

pub fn get_routes() -> Router<models::AppState> {
    page_routes().nest(RPC_PREFIX, rpc_routes())
}
