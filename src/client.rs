//! Calls the remote procedures of a running server over HTTP. This is what
//! lets a [`TodoList`](crate::view::TodoList) live in a different process
//! from the store.

use super::{
    models::Todo,
    procedures::{AddTodo, Call, Kind, Procedure, Procedures, SetDone},
    rpc::Envelope,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use hyper::{client::HttpConnector, Body, Client, Method, Request, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug)]
pub struct RemoteProcedures {
    /// e.g. `http://127.0.0.1:3000/api/trpc`, without a trailing slash
    base_url: String,
    http: Client<HttpConnector>,
}

impl RemoteProcedures {
    pub fn new(base_url: impl Into<String>) -> Self {
        RemoteProcedures {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        request: Request<Body>,
    ) -> Result<(StatusCode, T)> {
        let response = self.http.request(request).await?;
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await?;
        let body = serde_json::from_slice(&bytes).map_err(|e| {
            anyhow!("{path} answered {status} with a malformed body: {e}")
        })?;

        Ok((status, body))
    }

    async fn send(
        &self,
        procedure: Procedure,
        request: Request<Body>,
    ) -> Result<Option<Value>> {
        let (status, envelope) = self.fetch(procedure.name(), request).await?;
        open(envelope, status)
    }

    /// Send several calls in one request, answered call by call. Queries and
    /// mutations use different methods, so a batch is all one or the other.
    pub async fn batch(
        &self,
        calls: &[Call],
    ) -> Result<Vec<Result<Option<Value>>>> {
        let Some(first) = calls.first() else {
            return Ok(Vec::new());
        };
        let kind = first.procedure().kind();
        if calls.iter().any(|c| c.procedure().kind() != kind) {
            bail!("queries and mutations cannot share a batch");
        }
        let names = calls
            .iter()
            .map(|c| c.procedure().name())
            .collect::<Vec<_>>()
            .join(",");
        let mut inputs = Map::new();
        for (i, call) in calls.iter().enumerate() {
            if let Some(input) = call.input()? {
                inputs.insert(i.to_string(), input);
            }
        }

        let uri = format!("{}/{names}?batch=1", self.base_url);
        let request = match kind {
            Kind::Query => {
                if !inputs.is_empty() {
                    bail!("query input is not sent in batches");
                }
                Request::builder()
                    .method(Method::GET)
                    .uri(uri)
                    .body(Body::empty())?
            }
            Kind::Mutation => Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&inputs)?))?,
        };

        let (status, envelopes): (_, Vec<Envelope>) =
            self.fetch(&names, request).await?;
        if envelopes.len() != calls.len() {
            bail!(
                "batch of {} calls answered with {} results",
                calls.len(),
                envelopes.len()
            );
        }

        Ok(envelopes
            .into_iter()
            .map(|envelope| open(envelope, status))
            .collect())
    }

    async fn query(&self, procedure: Procedure) -> Result<Option<Value>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("{}/{}", self.base_url, procedure.name()))
            .body(Body::empty())?;
        self.send(procedure, request).await
    }

    async fn mutate<I: Serialize>(
        &self,
        procedure: Procedure,
        input: &I,
    ) -> Result<()> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/{}", self.base_url, procedure.name()))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(input)?))?;
        self.send(procedure, request).await?;
        Ok(())
    }
}

fn open(envelope: Envelope, status: StatusCode) -> Result<Option<Value>> {
    match (envelope.result, envelope.error) {
        (_, Some(error)) => bail!(
            "{} failed with {}: {}",
            error.data.path,
            error.data.code,
            error.message
        ),
        (Some(result), None) => Ok(result.data),
        (None, None) => bail!("answered {status} with an empty envelope"),
    }
}

#[async_trait]
impl Procedures for RemoteProcedures {
    async fn get_todos(&self) -> Result<Vec<Todo>> {
        let data = self
            .query(Procedure::GetTodos)
            .await?
            .ok_or_else(|| anyhow!("getTodos answered without data"))?;
        Ok(serde_json::from_value(data)?)
    }

    async fn add_todo(&self, input: AddTodo) -> Result<()> {
        self.mutate(Procedure::AddTodo, &input).await
    }

    async fn set_done(&self, input: SetDone) -> Result<()> {
        self.mutate(Procedure::SetDone, &input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RPC_PREFIX,
        db_ops::test_pool,
        models::{AppState, Done},
        routes::get_routes,
        view::{Settled, TodoList},
    };
    use std::net::{SocketAddr, TcpListener};

    /// Serve the real router on an ephemeral port and return its rpc url.
    async fn serve() -> String {
        let app = get_routes().with_state(AppState {
            db: test_pool().await,
        });
        let listener =
            TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);
        format!("http://{addr}{RPC_PREFIX}")
    }

    #[tokio::test]
    async fn test_list_over_http() {
        let remote = RemoteProcedures::new(serve().await);
        let mut list = TodoList::load(remote).await;
        assert!(list.todos().is_empty());
        assert_eq!(list.query().fetches, 1);

        list.set_content("buy milk");
        assert!(matches!(list.add().await, Settled::Succeeded));
        list.set_content("call mom");
        assert!(matches!(list.add().await, Settled::Succeeded));
        assert_eq!(list.todos().len(), 2);
        assert_eq!(list.todos()[1].content, "call mom");
        assert_eq!(list.todos()[1].done, Done::Pending);

        assert!(matches!(list.toggle(1).await, Settled::Succeeded));
        assert_eq!(
            list.todos()[0],
            Todo {
                id: 1,
                content: "buy milk".to_string(),
                done: Done::Complete,
            }
        );
        assert_eq!(list.query().fetches, 4);
    }

    #[tokio::test]
    async fn test_batched_calls() {
        let remote = RemoteProcedures::new(serve().await);
        let results = remote
            .batch(&[
                Call::AddTodo(AddTodo::parse("buy milk").unwrap()),
                Call::AddTodo(AddTodo::parse("call mom").unwrap()),
                Call::SetDone(SetDone {
                    id: 1,
                    done: Done::Complete,
                }),
            ])
            .await
            .expect("batch is answered");
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(r, Ok(None))));

        let mut results = remote
            .batch(&[Call::GetTodos, Call::GetTodos])
            .await
            .expect("batch is answered");
        assert_eq!(results.len(), 2);
        let data = results.remove(0).expect("getTodos succeeds");
        let todos: Vec<Todo> =
            serde_json::from_value(data.expect("has data")).unwrap();
        assert_eq!(
            todos,
            vec![
                Todo {
                    id: 1,
                    content: "buy milk".to_string(),
                    done: Done::Complete,
                },
                Todo {
                    id: 2,
                    content: "call mom".to_string(),
                    done: Done::Pending,
                },
            ]
        );

        assert!(remote.batch(&[]).await.expect("nothing to send").is_empty());
        assert!(remote
            .batch(&[
                Call::GetTodos,
                Call::AddTodo(AddTodo::parse("x").unwrap())
            ])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_server_errors_surface() {
        let remote = RemoteProcedures::new(format!("{}/", serve().await));
        // the server validates input too, not just the list
        let err = remote
            .mutate(Procedure::AddTodo, &"")
            .await
            .expect_err("empty content is rejected");
        assert!(err.to_string().contains("BAD_REQUEST"));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_mutation_and_refetch() {
        // nothing listens on the discard port
        let remote = RemoteProcedures::new("http://127.0.0.1:9/api/trpc");
        let mut list = TodoList::seeded(remote, Vec::new());
        list.set_content("buy milk");

        assert!(matches!(list.add().await, Settled::Failed(_)));
        assert!(list.query().error.is_some());
        assert_eq!(list.query().fetches, 1);
    }
}
