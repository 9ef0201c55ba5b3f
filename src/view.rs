//! Client-side state for the todo list.
//!
//! The list is only ever replaced by a refetch; mutations never touch the
//! cached data directly. Every mutation is followed by exactly one refetch
//! once it settles, whether it succeeded or not.

use super::{
    models::{Done, Todo},
    procedures::{AddTodo, Procedures, SetDone},
};
use anyhow::{Error, Result};
use tokio::sync::watch;

/// `Mutating` from the moment a mutation is issued until it settles; the
/// refetch which follows runs in `Idle`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Mutating,
}

/// Outcome of a mutation issued by the list.
#[derive(Debug)]
pub enum Settled {
    /// Rejected before any call was made; nothing was refetched.
    Rejected,
    Succeeded,
    Failed(Error),
}

impl Settled {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Settled::Rejected)
    }
}

/// Cached result of the `getTodos` query.
#[derive(Debug, Default)]
pub struct TodoQuery {
    pub data: Vec<Todo>,
    /// How many times the query went to the server. Seeding does not count.
    pub fetches: usize,
    pub error: Option<Error>,
}

pub struct TodoList<P> {
    procedures: P,
    query: TodoQuery,
    content: String,
    phase: watch::Sender<Phase>,
}

impl<P: Procedures> TodoList<P> {
    /// Start from a list fetched elsewhere, e.g. while rendering the page on
    /// the server, so there is no loading state.
    pub fn seeded(procedures: P, initial: Vec<Todo>) -> Self {
        TodoList {
            procedures,
            query: TodoQuery {
                data: initial,
                ..Default::default()
            },
            content: String::new(),
            phase: watch::channel(Phase::Idle).0,
        }
    }

    pub async fn load(procedures: P) -> Self {
        let mut list = Self::seeded(procedures, Vec::new());
        list.refetch().await;
        list
    }

    pub fn todos(&self) -> &[Todo] {
        &self.query.data
    }

    pub fn query(&self) -> &TodoQuery {
        &self.query
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Follow phase changes while `add` or `set_done` holds the list.
    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Re-read the whole list. A failure keeps the previous data.
    pub async fn refetch(&mut self) {
        self.query.fetches += 1;
        match self.procedures.get_todos().await {
            Ok(todos) => {
                self.query.data = todos;
                self.query.error = None;
            }
            Err(e) => {
                tracing::warn!(error = ?e, "refetching todos failed");
                self.query.error = Some(e);
            }
        }
    }

    /// Add whatever is in the input field. The field is cleared as soon as
    /// the mutation is issued.
    pub async fn add(&mut self) -> Settled {
        let input = match AddTodo::parse(self.content.as_str()) {
            Ok(input) => input,
            Err(_) => return Settled::Rejected,
        };
        self.content.clear();
        self.phase.send_replace(Phase::Mutating);
        let result = self.procedures.add_todo(input).await;
        self.settle(result).await
    }

    /// Flip the flag of a todo as currently displayed.
    pub async fn toggle(&mut self, id: i64) -> Settled {
        let Some(todo) = self.query.data.iter().find(|t| t.id == id) else {
            return Settled::Rejected;
        };
        let done = todo.done.flipped();
        self.set_done(id, done).await
    }

    pub async fn set_done(&mut self, id: i64, done: Done) -> Settled {
        self.phase.send_replace(Phase::Mutating);
        let result = self.procedures.set_done(SetDone { id, done }).await;
        self.settle(result).await
    }

    async fn settle(&mut self, result: Result<()>) -> Settled {
        self.phase.send_replace(Phase::Idle);
        self.refetch().await;
        match result {
            Ok(()) => Settled::Succeeded,
            Err(e) => {
                tracing::warn!(error = ?e, "mutation failed");
                Settled::Failed(e)
            }
        }
    }
}
