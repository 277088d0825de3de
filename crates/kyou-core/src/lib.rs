//! kyou-core
//!
//! Core of kyou (今日), a personal task tracker built around three lists:
//! backlog, today and yesterday. Tasks are swiped between backlog and
//! today, toggled complete, and swept by a nightly rollover that carries
//! unfinished work into yesterday and pulls deadline work into the new day.
//!
//! # Layers
//! - [`domain`]: entities and pure rules (phase sum type, ranks, the
//!   completion log, the error taxonomy)
//! - [`ports`]: seams to the outside (task store, lock store, clock, IDs)
//! - [`app`]: services driving the domain through the ports (ordering
//!   engine, rollover batch, scheduler, distributed lock)
//! - [`impls`]: in-memory adapters for development and tests

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
