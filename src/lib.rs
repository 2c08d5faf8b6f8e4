// src/lib.rs

//! Olympiad listing crawler library.
//!
//! Discovers live listing ids on olimpiada.ru (`probe`) and ingests each
//! listing into a keyed JSON artifact (`crawl`).

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
