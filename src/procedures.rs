//! The three remote procedures. Input is parsed into the types below before
//! any implementation sees it, so implementations only ever fail because
//! the store (or the network, for the client) did.

use super::{
    db_ops,
    models::{AppState, Done, Todo},
};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("content must not be empty")]
    EmptyContent,
    #[error("invalid input: {0}")]
    Malformed(String),
}

/// Input to `addTodo`; always non-empty. Serialized as a bare JSON string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddTodo(String);

impl AddTodo {
    pub fn parse(content: impl Into<String>) -> Result<Self, InputError> {
        let content = content.into();
        if content.is_empty() {
            Err(InputError::EmptyContent)
        } else {
            Ok(AddTodo(content))
        }
    }

    pub fn content(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AddTodo {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AddTodo::parse(value)
    }
}

impl From<AddTodo> for String {
    fn from(value: AddTodo) -> Self {
        value.0
    }
}

/// Input to `setDone`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDone {
    pub id: i64,
    pub done: Done,
}

#[async_trait]
pub trait Procedures: Send + Sync {
    async fn get_todos(&self) -> Result<Vec<Todo>>;
    async fn add_todo(&self, input: AddTodo) -> Result<()>;
    async fn set_done(&self, input: SetDone) -> Result<()>;
}

#[async_trait]
impl Procedures for AppState {
    async fn get_todos(&self) -> Result<Vec<Todo>> {
        db_ops::get_todos(&self.db).await
    }

    async fn add_todo(&self, input: AddTodo) -> Result<()> {
        let id = db_ops::add_todo(&self.db, input.content()).await?;
        tracing::debug!(id, "todo added");
        Ok(())
    }

    async fn set_done(&self, input: SetDone) -> Result<()> {
        let updated = db_ops::set_done(&self.db, input.id, input.done).await?;
        if updated {
            tracing::debug!(id = input.id, done = %input.done, "todo updated");
        } else {
            tracing::debug!(id = input.id, "set_done on missing todo ignored");
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Query,
    Mutation,
}

/// Procedure names as they appear in request paths.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Procedure {
    GetTodos,
    AddTodo,
    SetDone,
}

impl Procedure {
    pub fn name(self) -> &'static str {
        match self {
            Procedure::GetTodos => "getTodos",
            Procedure::AddTodo => "addTodo",
            Procedure::SetDone => "setDone",
        }
    }

    pub fn kind(self) -> Kind {
        match self {
            Procedure::GetTodos => Kind::Query,
            Procedure::AddTodo | Procedure::SetDone => Kind::Mutation,
        }
    }
}

#[derive(Debug, Error)]
#[error("no procedure named {0:?}")]
pub struct UnknownProcedure(pub String);

impl FromStr for Procedure {
    type Err = UnknownProcedure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getTodos" => Ok(Procedure::GetTodos),
            "addTodo" => Ok(Procedure::AddTodo),
            "setDone" => Ok(Procedure::SetDone),
            other => Err(UnknownProcedure(other.to_string())),
        }
    }
}

/// A procedure paired with its parsed input, ready to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    GetTodos,
    AddTodo(AddTodo),
    SetDone(SetDone),
}

impl Call {
    /// `getTodos` ignores whatever input it is given.
    pub fn parse(
        procedure: Procedure,
        input: Option<serde_json::Value>,
    ) -> Result<Self, InputError> {
        fn decode<T: serde::de::DeserializeOwned>(
            input: Option<serde_json::Value>,
        ) -> Result<T, InputError> {
            let input = input.ok_or_else(|| {
                InputError::Malformed("missing input".to_string())
            })?;
            serde_json::from_value(input)
                .map_err(|e| InputError::Malformed(e.to_string()))
        }

        Ok(match procedure {
            Procedure::GetTodos => Call::GetTodos,
            Procedure::AddTodo => {
                Call::AddTodo(AddTodo::parse(decode::<String>(input)?)?)
            }
            Procedure::SetDone => Call::SetDone(decode(input)?),
        })
    }

    pub fn procedure(&self) -> Procedure {
        match self {
            Call::GetTodos => Procedure::GetTodos,
            Call::AddTodo(_) => Procedure::AddTodo,
            Call::SetDone(_) => Procedure::SetDone,
        }
    }

    /// The input as it travels on the wire; `getTodos` has none.
    pub fn input(&self) -> Result<Option<serde_json::Value>> {
        Ok(match self {
            Call::GetTodos => None,
            Call::AddTodo(input) => Some(serde_json::to_value(input)?),
            Call::SetDone(input) => Some(serde_json::to_value(input)?),
        })
    }

    /// Run the call, returning the JSON `data` of the result, if any.
    pub async fn run<P: Procedures + ?Sized>(
        self,
        procedures: &P,
    ) -> Result<Option<serde_json::Value>> {
        Ok(match self {
            Call::GetTodos => {
                Some(serde_json::to_value(procedures.get_todos().await?)?)
            }
            Call::AddTodo(input) => {
                procedures.add_todo(input).await?;
                None
            }
            Call::SetDone(input) => {
                procedures.set_done(input).await?;
                None
            }
        })
    }
}
