//! Testing utilities for promptflow pipelines.
//!
//! This module provides:
//! - Mock language model tools (echo, scripted and failing)
//! - Pipeline fixtures used across tests and benchmarks

mod fixtures;
mod mocks;

pub use fixtures::{
    chain_pipeline, csv_foreach_pipeline, expecting_pipeline, greeting_pipeline, joker_pipeline,
    parameters, title_pipeline, CUSTOMERS_CSV,
};
pub use mocks::{FailingLlmTools, MockedEchoLlmTools, ScriptedLlmTools};
