//! A small todo list: three remote procedures over SQLite, and a list view
//! which refetches after every mutation. The view is served as htmx-driven
//! HTML, and [`client::RemoteProcedures`] lets it run in another process.

pub mod client;
pub mod components;
pub mod config;
pub mod controllers;
pub mod db_ops;
pub mod errors;
pub mod htmx;
pub mod middleware;
pub mod models;
pub mod procedures;
pub mod routes;
pub mod rpc;
pub mod view;
