//! # Khoj
//!
//! Find catalog products from a free-text query or from a photograph of a
//! dish.
//!
//! A photograph is sent to a visual-recognition service, which names the
//! dishes it sees and lists their ingredients. One ingredient keyword is
//! chosen and searched across the product index; the matching products are
//! returned together with every detected dish.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐
//! │  image   │──▶│ detection │──▶│ resolver │──▶│    query    │
//! └──────────┘   └───────────┘   └──────────┘   └──────┬──────┘
//!                                                      ▼
//! ┌──────────┐   ┌───────────┐                  ┌─────────────┐
//! │  client  │◀──│ pipeline  │◀─────────────────│    index    │
//! └──────────┘   └───────────┘                  └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Products, detections, responses |
//! | [`error`] | Pipeline error type |
//! | [`detection`] | Recognition service client |
//! | [`resolver`] | Keyword selection from detections |
//! | [`query`] | Multi-field product query |
//! | [`index`] | Product index backends |
//! | [`pipeline`] | Text and image search paths |
//! | [`server`] | HTTP server |
//! | [`telemetry`] | Logging setup |

pub mod config;
pub mod detection;
pub mod error;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod resolver;
pub mod server;
pub mod telemetry;
