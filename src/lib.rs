//! Localization contribution metrics for a documentation site hosted on GitHub.
//!
//! - `github`: single authenticated requests with rate-limit reporting
//! - `pagination`: bounded page-by-page collection over listing endpoints
//! - `contributions`: every issue/PR labelled for a locale
//! - `metrics`: per-locale, per-release PR statistics and coverage
//! - `orchestrator`: sequential runs over locales and releases
//! - `output` / `accumulate`: JSON results and cumulative CSV series

pub mod accumulate;
pub mod config;
pub mod contributions;
pub mod github;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod pagination;
pub mod release;
