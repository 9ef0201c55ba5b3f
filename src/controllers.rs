use super::{
    components::{self, Component},
    errors::ServerError,
    htmx,
    models::{AppState, Done},
    procedures::Procedures,
    view::{Settled, TodoList},
};
use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;

const TITLE: &str = "Todos";

fn render<P: Procedures>(list: &TodoList<P>, headers: &HeaderMap) -> String {
    let view = components::TodoListView::of(list);
    if htmx::is_request(headers) {
        view.render()
    } else {
        components::Page {
            title: TITLE,
            children: Box::new(view),
        }
        .render()
    }
}

/// After a mutation the list on screen is replaced by the refetched one. If
/// the refetch itself failed there is nothing trustworthy to show, so we
/// error out and htmx leaves the old list in place.
fn render_settled<P: Procedures>(
    list: &TodoList<P>,
    settled: Settled,
    headers: &HeaderMap,
) -> Result<Response, ServerError> {
    if settled.is_rejected() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if list.query().error.is_some() {
        return Err(anyhow!("refetch after mutation failed").into());
    }
    Ok(render(list, headers).into_response())
}

/// The page is rendered with the list already in it, so there is no loading
/// state on first paint.
pub async fn root(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServerError> {
    let initial = state.get_todos().await?;
    let list = TodoList::seeded(state, initial);

    Ok(render(&list, &headers))
}

pub async fn list_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServerError> {
    let list = TodoList::load(state).await;
    if let Some(e) = &list.query().error {
        return Err(anyhow!("loading todos failed: {e}").into());
    }

    Ok(render(&list, &headers))
}

#[derive(Deserialize)]
pub struct AddForm {
    content: String,
}

pub async fn add_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(AddForm { content }): Form<AddForm>,
) -> Result<Response, ServerError> {
    let mut list = TodoList::seeded(state, Vec::new());
    list.set_content(content);
    let settled = list.add().await;

    render_settled(&list, settled, &headers)
}

#[derive(Deserialize)]
pub struct DoneForm {
    done: Done,
}

pub async fn set_done(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Form(DoneForm { done }): Form<DoneForm>,
) -> Result<Response, ServerError> {
    let mut list = TodoList::seeded(state, Vec::new());
    let settled = list.set_done(id, done).await;

    render_settled(&list, settled, &headers)
}
