//! Per-field change detection with one-shot notification.

use std::collections::HashMap;

use crate::address::{AddressField, StandardizedAddress};

/// A detected change of one field between two addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTransition {
    pub field: AddressField,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Remembers, per field, the last transition that was reported so the same
/// change is never reported twice in a row.
#[derive(Debug, Default)]
pub struct AddressChangeDetector {
    notified: HashMap<AddressField, String>,
}

impl AddressChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition signature, `"<old>=><new>"` with absent values as empty.
    pub fn signature(from: Option<&str>, to: Option<&str>) -> String {
        format!("{}=>{}", from.unwrap_or_default(), to.unwrap_or_default())
    }

    /// Whether `field` differs between the two addresses.
    ///
    /// No previous address means there is nothing to compare against.
    pub fn has_changed(
        field: AddressField,
        previous: Option<&StandardizedAddress>,
        current: &StandardizedAddress,
    ) -> bool {
        previous.is_some_and(|previous| previous.field(field) != current.field(field))
    }

    /// Report the transition of `field` if it changed and this exact
    /// transition has not been reported already. Reporting records it.
    pub fn detect(
        &mut self,
        field: AddressField,
        previous: Option<&StandardizedAddress>,
        current: &StandardizedAddress,
    ) -> Option<FieldTransition> {
        if !Self::has_changed(field, previous, current) {
            return None;
        }

        let from = previous.and_then(|p| p.field(field));
        let to = current.field(field);
        let signature = Self::signature(from, to);

        if self.notified.get(&field) == Some(&signature) {
            tracing::debug!(field = %field, signature = %signature, "change already notified");
            return None;
        }

        tracing::debug!(field = %field, signature = %signature, "field changed");
        self.notified.insert(field, signature);

        Some(FieldTransition {
            field,
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        })
    }

    pub fn last_signature(&self, field: AddressField) -> Option<&str> {
        self.notified.get(&field).map(String::as_str)
    }

    pub fn reset_field(&mut self, field: AddressField) {
        self.notified.remove(&field);
    }

    pub fn reset(&mut self) {
        self.notified.clear();
    }
}
