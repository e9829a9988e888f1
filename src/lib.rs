//! # Tributary
//!
//! A client for a shared-video feed: authenticated users share video
//! links with a group, and every member's view updates in near-real-time.
//!
//! ## Architecture
//!
//! ```text
//! NotificationListener ──signal──► Reconciler ──pull──► FeedFetcher
//!                                     │  ▲
//!                              batch  │  │ metadata
//!                                     ▼  │
//!                               MetadataEnricher
//!                                     │
//!                                snapshot ──► Presenter
//! ```
//!
//! The [`reconciler`] is the core: it owns the canonical feed, treats push
//! notifications purely as refresh signals, takes membership and order
//! from the authoritative pull, carries resolved metadata forward across
//! refreshes, and rejects stale enrichment responses by refresh epoch.
//!
//! ## Modules
//!
//! - [`app`]: application context and error types
//! - [`auth`]: credentials, sessions, and the sign-in boundary
//! - [`cli`]: command-line interface (`watch`, `share`, `pull`)
//! - [`config`]: TOML configuration under `~/.config/tributary/`
//! - [`domain`]: share records, enriched entries, feed state
//! - [`enricher`]: batched metadata lookup boundary
//! - [`fetcher`]: authoritative pull and share submission boundary
//! - [`listener`]: push subscription with reconnect
//! - [`reconciler`]: the feed synchronization engine

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires config and the HTTP/WebSocket
/// client implementations together.
pub mod app;

/// Credentials, sessions, and the authentication boundary.
pub mod auth;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads `~/.config/tributary/config.toml`; a commented default file is
/// created on first run.
pub mod config;

/// Core domain models.
///
/// - [`ShareEvent`](domain::ShareEvent): minimal share fact (push or pull)
/// - [`ShareRecord`](domain::ShareRecord) / [`EnrichedEntry`](domain::EnrichedEntry)
/// - [`FeedState`](domain::FeedState): epoch, dedupe, carry-forward
pub mod domain;

/// External metadata provider boundary (one batched lookup per cycle).
pub mod enricher;

/// Authoritative share-list pull and share submission over REST.
pub mod fetcher;

/// Push subscription: decode, drop-and-log malformed payloads, silent
/// reconnect with backoff.
pub mod listener;

/// The feed synchronization engine.
pub mod reconciler;
