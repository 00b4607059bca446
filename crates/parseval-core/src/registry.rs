//! Explicit provider registry. Owns the gateway map and a TTL cache for
//! resolved model names, with an injected clock — no ambient global state.

use crate::providers::ProviderGateway;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct ProviderRegistry {
    gateways: HashMap<String, Arc<dyn ProviderGateway>>,
    model_cache: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
    cache_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ProviderRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            gateways: HashMap::new(),
            model_cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::minutes(10),
            clock,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn register(&mut self, gateway: Arc<dyn ProviderGateway>) {
        self.gateways
            .insert(gateway.provider_id().to_string(), gateway);
    }

    pub fn gateway(&self, provider_id: &str) -> Option<Arc<dyn ProviderGateway>> {
        self.gateways.get(provider_id).cloned()
    }

    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.gateways.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Resolve the model a cell will run with: an explicit override wins,
    /// otherwise the gateway's default, cached for the TTL window.
    pub fn resolve_model(&self, provider_id: &str, model_override: Option<&str>) -> Option<String> {
        if let Some(m) = model_override {
            return Some(m.to_string());
        }

        let now = self.clock.now();
        {
            let cache = self.model_cache.lock().unwrap();
            if let Some((model, cached_at)) = cache.get(provider_id) {
                if now - *cached_at < self.cache_ttl {
                    return Some(model.clone());
                }
            }
        }

        let model = self.gateways.get(provider_id)?.default_model().to_string();
        self.model_cache
            .lock()
            .unwrap()
            .insert(provider_id.to_string(), (model.clone(), now));
        Some(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fake::FakeGateway;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Utc::now()),
            })
        }

        fn advance(&self, d: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += d;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn override_wins_over_default_model() {
        let mut reg = ProviderRegistry::new(Arc::new(SystemClock));
        reg.register(Arc::new(FakeGateway::new("fake")));
        assert_eq!(
            reg.resolve_model("fake", Some("custom-model")).unwrap(),
            "custom-model"
        );
        assert_eq!(reg.resolve_model("fake", None).unwrap(), "fake-model");
    }

    #[test]
    fn unknown_provider_resolves_to_none() {
        let reg = ProviderRegistry::new(Arc::new(SystemClock));
        assert!(reg.resolve_model("nope", None).is_none());
        assert!(reg.gateway("nope").is_none());
    }

    #[test]
    fn model_cache_expires_after_ttl() {
        let clock = ManualClock::new();
        let mut reg =
            ProviderRegistry::new(clock.clone()).with_cache_ttl(Duration::minutes(5));
        reg.register(Arc::new(FakeGateway::new("fake")));

        assert_eq!(reg.resolve_model("fake", None).unwrap(), "fake-model");
        // Within TTL the cached entry is served.
        clock.advance(Duration::minutes(4));
        assert_eq!(reg.resolve_model("fake", None).unwrap(), "fake-model");
        // Past TTL the entry is refreshed rather than served stale.
        clock.advance(Duration::minutes(2));
        assert_eq!(reg.resolve_model("fake", None).unwrap(), "fake-model");
    }
}
