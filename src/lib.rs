//! # Daily Digest
//!
//! Report resolution and index synchronization for a daily news digest
//! site. Reports are Markdown files published per channel (`ai`, `crypto`,
//! `finance`) to an object storage bucket alongside a JSON index, or left in
//! local output directories when no bucket is configured.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐        ┌──────────────┐
//! │ Remote index │──┐  ┌─▶│   CLI        │
//! │ (index.json) │  │  │  │  (digest)    │
//! └──────────────┘  ▼  │  └──────────────┘
//!              ┌──────────┐
//!              │ Resolver │
//!              └──────────┘
//! ┌──────────────┐  ▲  │  ┌──────────────┐
//! │ Local output │──┘  └─▶│  HTTP API    │
//! │ directories  │        │  (axum)      │
//! └──────────────┘        └──────┬───────┘
//!                                │ delete
//!                         ┌──────▼───────┐
//!                         │ Synchronizer │──▶ bucket + index.json
//!                         └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! digest sources                     # where each channel is read from
//! digest list ai                     # newest AI reports
//! digest show <id> --channel crypto  # full report
//! digest delete "2024-05-02 - AI 日报.md"
//! digest serve                       # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`object_store`] | Signed OSS client and in-memory store |
//! | [`fetch`] | Cache-busted HTTP reads |
//! | [`index`] | Remote index document |
//! | [`local`] | Local report directories |
//! | [`resolver`] | Report listings and details |
//! | [`sync`] | Index maintenance on deletion |
//! | [`server`] | JSON HTTP API |
//! | [`sources`] | Per-channel source status |
//! | [`commands`] | CLI entry points |
//!
//! Pure logic (identifiers, channels, metadata extraction, data models)
//! lives in the `daily-digest-core` crate.

pub mod commands;
pub mod config;
pub mod fetch;
pub mod index;
pub mod local;
pub mod object_store;
pub mod resolver;
pub mod server;
pub mod sources;
pub mod sync;
