//! What gets announced, and how urgently.

use std::collections::BTreeMap;

use guia_address::{AddressChange, AddressField};
use guia_geo::PositionEventKind;
use serde::{Deserialize, Serialize};

/// How the position update behind an address change was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Regular,
    Immediate,
}

impl UpdateKind {
    /// `None` for rejected samples, which never reach the geocoder.
    pub fn from_event_kind(kind: PositionEventKind) -> Option<Self> {
        match kind {
            PositionEventKind::Regular => Some(Self::Regular),
            PositionEventKind::Immediate => Some(Self::Immediate),
            PositionEventKind::Rejected => None,
        }
    }
}

/// Decides whether an address change is spoken, with which priority and text.
pub trait AnnouncementPolicy: Send + Sync {
    /// Queue priority for a change of `field`, or `None` to stay silent.
    fn priority(&self, field: AddressField, kind: UpdateKind) -> Option<i32>;

    /// Spoken text for `change`, or `None` to stay silent.
    fn text(&self, change: &AddressChange) -> Option<String>;
}

/// Priority given to every tracked field by [`PriorityTable::default`].
pub const DEFAULT_PRIORITY: i32 = 1;

/// Priorities of one field per update kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPriority {
    pub regular: Option<i32>,
    pub immediate: Option<i32>,
}

impl FieldPriority {
    pub fn flat(priority: i32) -> Self {
        Self {
            regular: Some(priority),
            immediate: Some(priority),
        }
    }
}

/// Table-driven [`AnnouncementPolicy`] with Portuguese phrasing.
///
/// Fields missing from the table are never announced. The default table gives
/// street, neighborhood and city the same priority for both update kinds, so
/// announcements are spoken in the order the changes were detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityTable {
    fields: BTreeMap<AddressField, FieldPriority>,
}

impl Default for PriorityTable {
    fn default() -> Self {
        AddressField::TRACKED_DEFAULT
            .into_iter()
            .fold(Self::empty(), |table, field| {
                table.with(field, FieldPriority::flat(DEFAULT_PRIORITY))
            })
    }
}

impl PriorityTable {
    pub fn empty() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: AddressField, priority: FieldPriority) -> Self {
        self.fields.insert(field, priority);
        self
    }

    pub fn get(&self, field: AddressField) -> Option<FieldPriority> {
        self.fields.get(&field).copied()
    }
}

impl AnnouncementPolicy for PriorityTable {
    fn priority(&self, field: AddressField, kind: UpdateKind) -> Option<i32> {
        let entry = self.fields.get(&field)?;
        match kind {
            UpdateKind::Regular => entry.regular,
            UpdateKind::Immediate => entry.immediate,
        }
    }

    fn text(&self, change: &AddressChange) -> Option<String> {
        let to = change.to.as_deref()?;
        match change.field {
            AddressField::Logradouro => Some(format!("Você está na {to}")),
            AddressField::Bairro => Some(format!("Você entrou no bairro {to}")),
            AddressField::Municipio => Some(format!("Você chegou em {to}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guia_address::StandardizedAddress;

    fn change(field: AddressField, to: Option<&str>) -> AddressChange {
        AddressChange {
            field,
            from: None,
            to: to.map(str::to_string),
            current: StandardizedAddress::default(),
            previous: StandardizedAddress::default(),
        }
    }

    #[test]
    fn test_default_phrasing() {
        let table = PriorityTable::default();
        assert_eq!(
            table.text(&change(AddressField::Logradouro, Some("Rua Direita"))).as_deref(),
            Some("Você está na Rua Direita")
        );
        assert_eq!(
            table.text(&change(AddressField::Bairro, Some("Boa Vista"))).as_deref(),
            Some("Você entrou no bairro Boa Vista")
        );
        assert_eq!(
            table.text(&change(AddressField::Municipio, Some("Serro"))).as_deref(),
            Some("Você chegou em Serro")
        );
        assert_eq!(table.text(&change(AddressField::Bairro, None)), None);
        assert_eq!(table.text(&change(AddressField::Cep, Some("39150-000"))), None);
    }

    #[test]
    fn test_default_table_is_flat() {
        let table = PriorityTable::default();
        for field in AddressField::TRACKED_DEFAULT {
            for kind in [UpdateKind::Regular, UpdateKind::Immediate] {
                assert_eq!(table.priority(field, kind), Some(DEFAULT_PRIORITY));
            }
        }
        assert_eq!(table.priority(AddressField::Cep, UpdateKind::Regular), None);
    }

    #[test]
    fn test_table_from_json() {
        let table: PriorityTable = serde_json::from_str(
            r#"{"bairro": {"regular": 4}, "municipio": {"regular": 9, "immediate": 9}}"#,
        )
        .unwrap();

        assert_eq!(table.priority(AddressField::Bairro, UpdateKind::Regular), Some(4));
        // Neighborhood changes during immediate updates are silenced here.
        assert_eq!(table.priority(AddressField::Bairro, UpdateKind::Immediate), None);
        assert_eq!(table.priority(AddressField::Logradouro, UpdateKind::Regular), None);
        assert_eq!(table.get(AddressField::Municipio), Some(FieldPriority::flat(9)));
    }

    #[test]
    fn test_update_kind_from_event_kind() {
        assert_eq!(
            UpdateKind::from_event_kind(PositionEventKind::Immediate),
            Some(UpdateKind::Immediate)
        );
        assert_eq!(UpdateKind::from_event_kind(PositionEventKind::Rejected), None);
    }
}
