//! Freelance marketplace backend.
//!
//! Clients post projects, freelancers bid, the client accepts one bid, funds
//! escrow through the payment processor and releases it once the work is
//! delivered. Freelancers are matched to projects by skill overlap and text
//! similarity.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;
