//! `refdesk` library crate.
//!
//! A financial reference-data desk: mock industry/ETF/stock datasets refreshed
//! on fixed intervals, a review queue fed by pull tasks, an HTTP API over both,
//! and a terminal console that drives the API.
//!
//! The binary (`refdesk`) is a thin wrapper around [`app::run`].

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
pub mod review;
pub mod scheduler;
pub mod server;
pub mod tasks;
pub mod tui;
