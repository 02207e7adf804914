//! Core library functions for the hypergraph cluster analyzer

pub mod config;
pub mod error;
pub mod data;
pub mod views;
pub mod hypergraph;
pub mod cluster;
pub mod storage;

pub use anyhow::{Result, anyhow};
pub use error::AnalyzerError;
