// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod app;
pub mod auction;
pub mod auth;
pub mod budget;
pub mod config;
pub mod data;
pub mod db;
pub mod draft;
pub mod league;
pub mod ledger;
pub mod server;
