//! Reverse-geocoded address handling.
//!
//! Raw provider payloads are mapped onto [`StandardizedAddress`] and memoized
//! in an LRU cache keyed by the payload's identifying components. Every fresh
//! resolution is compared against the previous address; tracked fields that
//! changed fire their callback once per distinct transition.
//!
//! ```text
//! payload ──► cache key ──► hit?  ──yes──► cached address
//!                            │
//!                            no
//!                            ▼
//!                  extract ─► store ─► detector ─► callbacks ─► observers
//! ```

mod address;
mod cache;
mod callbacks;
mod detector;
mod payload;
mod store;

pub use address::{AddressField, StandardizedAddress};
pub use cache::{
    AddressCache, AddressCacheConfig, AddressUpdatedEvent, Resolution, DEFAULT_SWEEP_INTERVAL_MS,
};
pub use callbacks::{AddressChange, CallbackRegistry, FieldCallback};
pub use detector::{AddressChangeDetector, FieldTransition};
pub use payload::{extract_address, state_code_for_name, GeocodePayload, ProviderAddress};
pub use store::{AddressDataStore, StoredAddress};
