//! Version algebra, metadata cache and registry resolution
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Resolver   │────▶│ NugetClient │────▶│CachedFetcher│
//! │ (batching)  │     │ (lookup)    │     │  (memoize)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │
//!                            ▼                   ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │ VersionRange│     │    Cache    │
//!                     │  (algebra)  │     │  (storage)  │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`nuget`]: NuGet version parsing and ordering
//! - [`range`]: Interval notation, membership and common minimum version
//! - [`cache`]: Directory-backed TTL cache with an SQLite index record
//! - [`fetcher`]: JSON fetch trait with HTTP and cached implementations
//! - [`registries`]: NuGet v3 registration client
//! - [`resolver`]: Parallel batch resolution
//! - [`types`]: NuGet v3 wire models
//! - [`error`]: Error types

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod nuget;
pub mod range;
pub mod registries;
pub mod resolver;
pub mod types;
