//! # coursemate
//!
//! A retrieval-augmented course assistant. Course documents are parsed into
//! a catalog entry per course and embedded content chunks; questions are
//! answered by a generation model that decides, round by round, whether to
//! search course content, fetch a course outline, or answer directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ Course docs  │──▶│ Parse+Chunk  │──▶│  InMemoryIndex   │
//! │  (*.txt)     │   │  + Embed     │   │ catalog/content  │
//! └──────────────┘   └──────────────┘   └────────┬─────────┘
//!                                                │
//!                    ┌──────────────┐   ┌────────┴─────────┐
//!      query ───────▶│CourseAssistant│◀─▶│  ToolRegistry    │
//!                    │ (tool loop)  │   │ search / outline │
//!                    └──────┬───────┘   └──────────────────┘
//!                           ▼
//!               answer + citations + session id
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`embedding`] | OpenAI-compatible embedding client |
//! | [`store`] | Two-phase course retrieval facade |
//! | [`traits`] | Tool trait and registry |
//! | [`tools`] | Content search and course outline tools |
//! | [`sources`] | Per-query citation tracking |
//! | [`session`] | Bounded conversation history |
//! | [`llm`] | Generation model interface and Anthropic backend |
//! | [`assistant`] | The bounded tool-use loop |
//! | [`ingest`] | Course folder ingestion |
//! | [`server`] | HTTP API |
//! | [`app`] | Wiring from config to a running assistant |

pub mod app;
pub mod assistant;
pub mod config;
pub mod embedding;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod server;
pub mod session;
pub mod sources;
pub mod store;
pub mod tools;
pub mod traits;
