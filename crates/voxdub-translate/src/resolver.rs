//! Resolver: validation, caching, rate limiting and provider fallback.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use voxdub_foundation::SharedClock;
use voxdub_telemetry::PipelineMetrics;

use crate::cache::TranslationCache;
use crate::provider::{ProviderFailure, TranslationProvider};
use crate::rate_limit::RateLimiter;
use crate::types::{TranslateError, Translation, TranslationRequest, MAX_TEXT_CHARS};

/// Provider name reported when source and target match and no
/// translation is needed.
const PASSTHROUGH: &str = "passthrough";

pub struct ResolverOptions {
    pub primary: Arc<dyn TranslationProvider>,
    pub fallback: Option<Arc<dyn TranslationProvider>>,
    pub cache_capacity: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub request_timeout: Duration,
    pub clock: SharedClock,
    pub metrics: PipelineMetrics,
}

/// Front door for all translation work.
///
/// Every call is checked against the caller's rate budget, validated,
/// and served from cache when possible before any provider is
/// contacted. Provider attempts run under a per-attempt timeout; when
/// the primary fails for any reason the fallback gets the exact same
/// input.
pub struct Resolver {
    primary: Arc<dyn TranslationProvider>,
    fallback: Option<Arc<dyn TranslationProvider>>,
    cache: Mutex<TranslationCache>,
    limiter: Mutex<RateLimiter>,
    clock: SharedClock,
    request_timeout: Duration,
    metrics: PipelineMetrics,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            primary: options.primary,
            fallback: options.fallback,
            cache: Mutex::new(TranslationCache::new(options.cache_capacity)),
            limiter: Mutex::new(RateLimiter::new(
                options.rate_limit_max,
                options.rate_limit_window,
            )),
            clock: options.clock,
            request_timeout: options.request_timeout,
            metrics: options.metrics,
        }
    }

    /// Translates one request on behalf of `caller`.
    ///
    /// The rate limit applies to every call, cache hits and rejected
    /// inputs included; it is the admission gate, not a provider-call
    /// budget.
    pub async fn translate(
        &self,
        caller: &str,
        request: TranslationRequest,
    ) -> Result<Translation, TranslateError> {
        {
            let mut limiter = self.limiter.lock();
            if !limiter.check(caller, self.clock.now()) {
                return Err(TranslateError::RateLimited {
                    caller: caller.to_string(),
                    limit: limiter.max_requests(),
                    window_secs: limiter.window().as_secs(),
                });
            }
        }

        let text = request.text.trim();
        if text.is_empty() {
            return Err(TranslateError::InvalidInput("text is empty".into()));
        }
        let chars = text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(TranslateError::InvalidInput(format!(
                "text is {chars} characters, limit is {MAX_TEXT_CHARS}"
            )));
        }
        // Trimmed text is canonical from here on, for providers and
        // cache keys alike.
        let request = TranslationRequest {
            text: text.to_string(),
            source: request.source,
            target: request.target,
        };

        self.metrics.translate_requests.fetch_add(1, Ordering::Relaxed);

        if !request.source.is_auto() && request.source == request.target {
            tracing::debug!(target: "translate", lang = %request.target, "source equals target, passing through");
            return Ok(Translation {
                text: request.text,
                provider: PASSTHROUGH,
            });
        }

        if let Some(hit) = self.cache.lock().get(&request).cloned() {
            self.metrics
                .translate_cache_hits
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target: "translate", provider = hit.provider, "cache hit");
            return Ok(hit);
        }

        let mut attempts: Vec<String> = Vec::new();

        match self.attempt(self.primary.as_ref(), &request).await {
            Ok(text) => {
                let translation = Translation {
                    text,
                    provider: self.primary.name(),
                };
                self.cache.lock().insert(request, translation.clone());
                return Ok(translation);
            }
            Err(failure) => {
                tracing::warn!(
                    target: "translate",
                    provider = self.primary.name(),
                    error = %failure,
                    "primary provider failed"
                );
                attempts.push(format!("{}: {}", self.primary.name(), failure));
            }
        }

        if let Some(fallback) = &self.fallback {
            self.metrics
                .translate_fallbacks
                .fetch_add(1, Ordering::Relaxed);
            match self.attempt(fallback.as_ref(), &request).await {
                Ok(text) => {
                    let translation = Translation {
                        text,
                        provider: fallback.name(),
                    };
                    self.cache.lock().insert(request, translation.clone());
                    return Ok(translation);
                }
                Err(failure) => {
                    tracing::warn!(
                        target: "translate",
                        provider = fallback.name(),
                        error = %failure,
                        "fallback provider failed"
                    );
                    attempts.push(format!("{}: {}", fallback.name(), failure));
                }
            }
        }

        self.metrics
            .translate_failures
            .fetch_add(1, Ordering::Relaxed);
        Err(TranslateError::Unavailable(attempts.join("; ")))
    }

    async fn attempt(
        &self,
        provider: &dyn TranslationProvider,
        request: &TranslationRequest,
    ) -> Result<String, ProviderFailure> {
        match tokio::time::timeout(
            self.request_timeout,
            provider.translate(&request.text, &request.source, &request.target),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderFailure::Timeout(self.request_timeout)),
        }
    }
}
