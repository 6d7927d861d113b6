// src/lib.rs

//! Skyhub image ingestion library

pub mod error;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;
