//! Field-keyed change callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use guia_events::CallbackError;
use serde::Serialize;

use crate::address::{AddressField, StandardizedAddress};

/// Payload handed to a field callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressChange {
    pub field: AddressField,
    pub from: Option<String>,
    pub to: Option<String>,
    pub current: StandardizedAddress,
    pub previous: StandardizedAddress,
}

pub type FieldCallback = Arc<dyn Fn(&AddressChange) -> anyhow::Result<()> + Send + Sync>;

/// At most one callback per field; registering again replaces it.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<AddressField, FieldCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the callback that was replaced, if any.
    pub fn register<F>(&mut self, field: AddressField, callback: F) -> Option<FieldCallback>
    where
        F: Fn(&AddressChange) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks.insert(field, Arc::new(callback))
    }

    pub fn unregister(&mut self, field: AddressField) -> bool {
        self.callbacks.remove(&field).is_some()
    }

    pub fn get(&self, field: AddressField) -> Option<&FieldCallback> {
        self.callbacks.get(&field)
    }

    pub fn contains(&self, field: AddressField) -> bool {
        self.callbacks.contains_key(&field)
    }

    /// Run the callback for `change.field`.
    ///
    /// `Ok(false)` when nothing is registered. A failing callback is logged
    /// and returned as an error; it never propagates past the caller.
    pub fn execute(&self, change: &AddressChange) -> Result<bool, CallbackError> {
        let Some(callback) = self.callbacks.get(&change.field) else {
            return Ok(false);
        };

        callback(change).map(|()| true).map_err(|e| {
            let error = CallbackError::execution(change.field.as_str(), &e);
            tracing::warn!(field = %change.field, error = %error, "field change callback failed");
            error
        })
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<_> = self.callbacks.keys().collect();
        fields.sort();
        f.debug_struct("CallbackRegistry").field("fields", &fields).finish()
    }
}
