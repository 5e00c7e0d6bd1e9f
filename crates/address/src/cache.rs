//! Address resolution front door: LRU cache, history, change detection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use guia_cache::{CacheStats, LruCache, DEFAULT_CAPACITY, DEFAULT_TTL_MS};
use guia_events::{CallbackError, ObserverSubject, SubscriptionId};
use guia_timing::{ClockRef, PeriodicTask};
use serde::{Deserialize, Serialize};

use crate::address::{AddressField, StandardizedAddress};
use crate::callbacks::{AddressChange, CallbackRegistry, FieldCallback};
use crate::detector::AddressChangeDetector;
use crate::payload::{extract_address, GeocodePayload};
use crate::store::AddressDataStore;

/// Interval of the background expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressCacheConfig {
    pub capacity: usize,
    pub ttl_ms: i64,
    pub sweep_interval_ms: u64,
    /// Fields checked for changes after each fresh resolution.
    pub tracked_fields: Vec<AddressField>,
}

impl Default for AddressCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl_ms: DEFAULT_TTL_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            tracked_fields: AddressField::TRACKED_DEFAULT.to_vec(),
        }
    }
}

/// Sent to observers whenever a payload resolves to a freshly built address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressUpdatedEvent {
    pub address: StandardizedAddress,
    pub previous: Option<StandardizedAddress>,
    pub cache_key: String,
    pub changed_fields: Vec<AddressField>,
}

/// Outcome of [`AddressCache::resolve_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub address: StandardizedAddress,
    /// `None` when the payload had nothing to key on.
    pub cache_key: Option<String>,
    pub cache_hit: bool,
    /// Changes reported during this call, in tracked-field order.
    pub changes: Vec<AddressChange>,
    /// Field callbacks that failed while handling `changes`.
    pub callback_errors: Vec<CallbackError>,
}

#[derive(Debug, Clone)]
struct CachedAddress {
    address: StandardizedAddress,
    raw: serde_json::Value,
}

type SharedCache = Arc<Mutex<LruCache<String, CachedAddress>>>;

/// Turns raw geocoding payloads into [`StandardizedAddress`]es.
///
/// Fresh resolutions go through change detection: each tracked field that
/// changed since the previous address fires its registered callback once per
/// distinct transition, then observers receive an [`AddressUpdatedEvent`].
/// Cache hits return the stored address without either.
pub struct AddressCache {
    config: AddressCacheConfig,
    cache: SharedCache,
    store: AddressDataStore,
    detector: AddressChangeDetector,
    callbacks: CallbackRegistry,
    observers: ObserverSubject<AddressUpdatedEvent>,
    sweep: Option<PeriodicTask>,
}

impl AddressCache {
    pub fn new(config: AddressCacheConfig, clock: ClockRef) -> Self {
        let cache = LruCache::new(config.capacity, config.ttl_ms, clock);
        Self {
            config,
            cache: Arc::new(Mutex::new(cache)),
            store: AddressDataStore::new(),
            detector: AddressChangeDetector::new(),
            callbacks: CallbackRegistry::new(),
            observers: ObserverSubject::new("address_cache"),
            sweep: None,
        }
    }

    pub fn config(&self) -> &AddressCacheConfig {
        &self.config
    }

    /// Resolve a raw payload to a standardized address.
    pub fn resolve(&mut self, raw: &serde_json::Value) -> StandardizedAddress {
        self.resolve_detailed(raw).address
    }

    /// Resolve a raw payload, reporting how it was resolved.
    pub fn resolve_detailed(&mut self, raw: &serde_json::Value) -> Resolution {
        let payload = GeocodePayload::from_value(raw);

        let Some(key) = AddressDataStore::cache_key(&payload) else {
            tracing::debug!("payload has no cache key, resolving uncached");
            return Resolution {
                address: extract_address(&payload),
                cache_key: None,
                cache_hit: false,
                changes: Vec::new(),
                callback_errors: Vec::new(),
            };
        };

        let cached = lock(&self.cache).get(&key).cloned();
        if let Some(cached) = cached {
            tracing::debug!(key = %key, "address cache hit");
            if self.store.current_address() != Some(&cached.address) {
                self.store.update(cached.address.clone(), cached.raw);
            }
            return Resolution {
                address: cached.address,
                cache_key: Some(key),
                cache_hit: true,
                changes: Vec::new(),
                callback_errors: Vec::new(),
            };
        }

        let address = extract_address(&payload);
        tracing::debug!(key = %key, address = %address, "address cache miss");

        let evicted = lock(&self.cache).set(
            key.clone(),
            CachedAddress {
                address: address.clone(),
                raw: raw.clone(),
            },
        );
        if let Some(evicted) = evicted {
            tracing::debug!(key = %evicted, "evicted least recently used address");
        }

        self.store.update(address.clone(), raw.clone());
        let changes = self.detect_changes();

        // Failures are logged by the registry; remaining fields still run.
        let callback_errors: Vec<CallbackError> = changes
            .iter()
            .filter_map(|change| self.callbacks.execute(change).err())
            .collect();

        let event = AddressUpdatedEvent {
            address: address.clone(),
            previous: self.store.previous_address().cloned(),
            cache_key: key.clone(),
            changed_fields: changes.iter().map(|c| c.field).collect(),
        };
        self.observers.notify(&event);

        Resolution {
            address,
            cache_key: Some(key),
            cache_hit: false,
            changes,
            callback_errors,
        }
    }

    fn detect_changes(&mut self) -> Vec<AddressChange> {
        let Some(current) = self.store.current_address() else {
            return Vec::new();
        };
        let previous = self.store.previous_address();

        let mut changes = Vec::new();
        for field in &self.config.tracked_fields {
            if let Some(transition) = self.detector.detect(*field, previous, current) {
                changes.push(AddressChange {
                    field: transition.field,
                    from: transition.from,
                    to: transition.to,
                    current: current.clone(),
                    previous: previous.cloned().unwrap_or_default(),
                });
            }
        }
        changes
    }

    /// Register the change callback for `field`, replacing any previous one.
    pub fn on_field_change<F>(&mut self, field: AddressField, callback: F) -> Option<FieldCallback>
    where
        F: Fn(&AddressChange) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks.register(field, callback)
    }

    pub fn remove_field_callback(&mut self, field: AddressField) -> bool {
        self.callbacks.unregister(field)
    }

    pub fn subscribe_fn<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&AddressUpdatedEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.observers.subscribe_fn(callback)
    }

    pub fn subscribe(&mut self, observer: Arc<dyn guia_events::Observer<AddressUpdatedEvent>>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn current_address(&self) -> Option<&StandardizedAddress> {
        self.store.current_address()
    }

    pub fn previous_address(&self) -> Option<&StandardizedAddress> {
        self.store.previous_address()
    }

    pub fn store(&self) -> &AddressDataStore {
        &self.store
    }

    /// Drop expired entries now. Returns how many were removed.
    pub fn clean_expired(&self) -> usize {
        lock(&self.cache).clean_expired()
    }

    /// Start sweeping expired entries in the background.
    ///
    /// Must be called inside a tokio runtime. Restarting replaces the
    /// previous sweep.
    pub fn start_expiry_sweep(&mut self) {
        let cache = Arc::clone(&self.cache);
        let interval = Duration::from_millis(self.config.sweep_interval_ms.max(1));

        self.sweep = Some(PeriodicTask::spawn("address_cache_sweep", interval, move || {
            let removed = lock(&cache).clean_expired();
            if removed > 0 {
                tracing::debug!(removed, "swept expired addresses");
            }
        }));
    }

    pub fn stop_expiry_sweep(&mut self) {
        if let Some(sweep) = self.sweep.take() {
            sweep.cancel();
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep.as_ref().is_some_and(PeriodicTask::is_running)
    }

    pub fn len(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.cache).is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.cache).stats()
    }

    /// Empty the cache, keeping history, callbacks and observers.
    pub fn clear(&mut self) {
        lock(&self.cache).clear();
    }

    /// Stop the sweep and release everything.
    pub fn destroy(&mut self) {
        self.stop_expiry_sweep();
        lock(&self.cache).clear();
        self.store.clear();
        self.detector.reset();
        self.callbacks.clear();
        self.observers.clear();
        tracing::info!("address cache destroyed");
    }
}

impl std::fmt::Debug for AddressCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressCache")
            .field("config", &self.config)
            .field("entries", &self.len())
            .field("callbacks", &self.callbacks)
            .field("observers", &self.observers.len())
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
