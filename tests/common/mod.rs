//! Common test utilities and fixtures for pivote-engine integration tests
//!
//! - `CommitFixture` builds a vote flush commit and renders it either as
//!   `git log -p` text or as a REST API commit object
//! - `journal_line` builds one vote journal entry

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
