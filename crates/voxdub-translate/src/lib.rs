//! Translation pipeline for VoxDub.
//!
//! Providers turn text from one language into another; the resolver
//! wraps a primary and optional fallback provider behind validation,
//! an insertion-order cache and a per-caller rate limit.

pub mod cache;
pub mod provider;
pub mod providers;
pub mod rate_limit;
pub mod resolver;
pub mod types;

pub use cache::TranslationCache;
pub use provider::{ProviderFailure, TranslationProvider};
pub use providers::{GoogleWebProvider, OllamaProvider};
pub use rate_limit::RateLimiter;
pub use resolver::{Resolver, ResolverOptions};
pub use types::{TranslateError, Translation, TranslationRequest, MAX_TEXT_CHARS};
