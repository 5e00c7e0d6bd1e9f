//! Current/previous address history and cache key derivation.

use crate::address::StandardizedAddress;
use crate::payload::GeocodePayload;

/// One resolved address with the payload it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAddress {
    pub address: StandardizedAddress,
    pub raw: serde_json::Value,
}

/// Keeps the two most recent resolved addresses.
#[derive(Debug, Default)]
pub struct AddressDataStore {
    current: Option<StoredAddress>,
    previous: Option<StoredAddress>,
}

impl AddressDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `address` current, shifting the old current into previous.
    pub fn update(&mut self, address: StandardizedAddress, raw: serde_json::Value) {
        self.previous = self.current.take();
        self.current = Some(StoredAddress { address, raw });
    }

    pub fn current(&self) -> Option<&StoredAddress> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&StoredAddress> {
        self.previous.as_ref()
    }

    pub fn current_address(&self) -> Option<&StandardizedAddress> {
        self.current.as_ref().map(|s| &s.address)
    }

    pub fn previous_address(&self) -> Option<&StandardizedAddress> {
        self.previous.as_ref().map(|s| &s.address)
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.previous = None;
    }

    /// Stable key for a payload, or `None` when it carries nothing usable.
    ///
    /// Built from street, number, neighborhood, city, postcode and country
    /// code, using the first provider key present for each.
    pub fn cache_key(payload: &GeocodePayload) -> Option<String> {
        let address = payload.address.as_ref()?;
        let parts: Vec<&str> = [
            address.street(),
            address.house_number(),
            address.neighborhood(),
            address.city(),
            address.postcode(),
            address.country_code(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address(bairro: &str) -> StandardizedAddress {
        StandardizedAddress {
            bairro: Some(bairro.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_shifts_history() {
        let mut store = AddressDataStore::new();
        assert!(store.current().is_none());

        store.update(address("Centro"), json!({"n": 1}));
        assert_eq!(store.current_address(), Some(&address("Centro")));
        assert!(store.previous_address().is_none());

        store.update(address("Boa Vista"), json!({"n": 2}));
        assert_eq!(store.current_address(), Some(&address("Boa Vista")));
        assert_eq!(store.previous_address(), Some(&address("Centro")));
        assert_eq!(store.previous().map(|s| &s.raw), Some(&json!({"n": 1})));

        store.clear();
        assert!(store.current().is_none() && store.previous().is_none());
    }

    #[test]
    fn test_cache_key_uses_variant_keys() {
        let payload = GeocodePayload::from_value(&json!({
            "address": {
                "road": "Rua Direita",
                "house_number": "172",
                "suburb": "Milho Verde",
                "town": "Serro",
                "postcode": "39150-000",
                "country_code": "br",
                "state": "Minas Gerais"
            }
        }));

        assert_eq!(
            AddressDataStore::cache_key(&payload).as_deref(),
            Some("Rua Direita, 172, Milho Verde, Serro, 39150-000, br")
        );
    }

    #[test]
    fn test_cache_key_absent_without_components() {
        let no_address = GeocodePayload::from_value(&json!({"display_name": "somewhere"}));
        assert_eq!(AddressDataStore::cache_key(&no_address), None);

        // State alone does not identify a place.
        let state_only = GeocodePayload::from_value(&json!({"address": {"state": "Bahia"}}));
        assert_eq!(AddressDataStore::cache_key(&state_only), None);
    }
}
