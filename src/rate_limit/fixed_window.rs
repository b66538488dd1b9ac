// src/rate_limit/fixed_window.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::rate_limit::{RateLimitAlgorithm, RateLimitStatus};

/// Counter for one provider's current window
#[derive(Debug)]
struct RateWindow {
    count: u64,
    started: Instant,
    config: RateLimitConfig,
}

impl RateWindow {
    fn new(config: RateLimitConfig, now: Instant) -> Self {
        Self {
            count: 0,
            started: now,
            config,
        }
    }

    /// Start a fresh window if the current one is stale.
    fn refresh(&mut self, now: Instant) {
        if now.duration_since(self.started) > self.config.window {
            self.count = 0;
            self.started = now;
        }
    }

    fn allowed(&self) -> bool {
        self.count < self.config.max_requests
    }

    fn reset_after(&self, now: Instant) -> Duration {
        self.config
            .window
            .saturating_sub(now.duration_since(self.started))
    }
}

/// Fixed Window rate limiting, one window per provider.
///
/// Windows are not driven by a timer: a window is reset the first time an
/// `allow` or `record_request` call observes that more than the window
/// duration has passed since it started. Each provider's window sits behind
/// its own mutex; the registry lock is held only long enough to look up or
/// insert the window handle.
#[derive(Debug)]
pub struct FixedWindow {
    windows: RwLock<HashMap<String, Arc<Mutex<RateWindow>>>>,
    /// Per-provider configuration
    overrides: RwLock<HashMap<String, RateLimitConfig>>,
    /// Applied to providers without an override
    default_config: RateLimitConfig,
}

impl FixedWindow {
    /// Creates a limiter applying `default_config` to every provider
    pub fn new(default_config: RateLimitConfig) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
            default_config,
        }
    }

    /// Use a dedicated window configuration for one provider
    pub fn with_provider(self, provider: &str, config: RateLimitConfig) -> Self {
        self.configure(provider, config);
        self
    }

    /// Change a provider's window configuration. The current count is
    /// kept; the new ceiling and duration apply from the next check.
    pub fn configure(&self, provider: &str, config: RateLimitConfig) {
        self.overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.to_string(), config);

        let existing = self
            .windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider)
            .cloned();
        if let Some(window) = existing {
            window.lock().unwrap_or_else(PoisonError::into_inner).config = config;
        }
    }

    fn config_for(&self, provider: &str) -> RateLimitConfig {
        self.overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider)
            .copied()
            .unwrap_or(self.default_config)
    }

    /// Look up the provider's window, creating it on first use
    fn window(&self, provider: &str) -> Arc<Mutex<RateWindow>> {
        {
            let windows = self.windows.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(window) = windows.get(provider) {
                return Arc::clone(window);
            }
        }

        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        let config = self.config_for(provider);
        let window = windows.entry(provider.to_string()).or_insert_with(|| {
            debug!(
                provider,
                max_requests = config.max_requests,
                window_ms = config.window.as_millis() as u64,
                "Created rate window"
            );
            Arc::new(Mutex::new(RateWindow::new(config, Instant::now())))
        });
        Arc::clone(window)
    }
}

impl RateLimitAlgorithm for FixedWindow {
    fn allow(&self, provider: &str) -> bool {
        let window = self.window(provider);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        window.refresh(Instant::now());

        let allowed = window.allowed();
        if !allowed {
            warn!(
                provider,
                count = window.count,
                limit = window.config.max_requests,
                "Rate limit reached"
            );
        }
        allowed
    }

    fn record_request(&self, provider: &str) {
        let window = self.window(provider);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        window.refresh(Instant::now());
        window.count += 1;
    }

    fn try_acquire(&self, provider: &str) -> bool {
        let window = self.window(provider);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        window.refresh(Instant::now());

        if !window.allowed() {
            warn!(
                provider,
                count = window.count,
                limit = window.config.max_requests,
                "Rate limit reached"
            );
            return false;
        }
        window.count += 1;
        true
    }

    fn status(&self, provider: &str) -> RateLimitStatus {
        let window = self.window(provider);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        window.refresh(now);

        RateLimitStatus {
            allowed: window.allowed(),
            remaining: window.config.max_requests.saturating_sub(window.count),
            limit: window.config.max_requests,
            reset_after: window.reset_after(now),
        }
    }

    fn reset(&self, provider: &str) {
        let window = self.window(provider);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        window.count = 0;
        window.started = Instant::now();
    }
}
