//! Standardized Brazilian address model.

use serde::{Deserialize, Serialize};

/// Field of a [`StandardizedAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressField {
    #[serde(rename = "logradouro")]
    Logradouro,
    #[serde(rename = "numero")]
    Numero,
    #[serde(rename = "bairro")]
    Bairro,
    #[serde(rename = "municipio")]
    Municipio,
    #[serde(rename = "regiaoMetropolitana")]
    RegiaoMetropolitana,
    #[serde(rename = "uf")]
    Uf,
    #[serde(rename = "siglaUF")]
    SiglaUf,
    #[serde(rename = "cep")]
    Cep,
    #[serde(rename = "pais")]
    Pais,
}

impl AddressField {
    pub const ALL: [AddressField; 9] = [
        Self::Logradouro,
        Self::Numero,
        Self::Bairro,
        Self::Municipio,
        Self::RegiaoMetropolitana,
        Self::Uf,
        Self::SiglaUf,
        Self::Cep,
        Self::Pais,
    ];

    /// Fields whose changes are announced by default.
    pub const TRACKED_DEFAULT: [AddressField; 3] = [Self::Logradouro, Self::Bairro, Self::Municipio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logradouro => "logradouro",
            Self::Numero => "numero",
            Self::Bairro => "bairro",
            Self::Municipio => "municipio",
            Self::RegiaoMetropolitana => "regiaoMetropolitana",
            Self::Uf => "uf",
            Self::SiglaUf => "siglaUF",
            Self::Cep => "cep",
            Self::Pais => "pais",
        }
    }
}

impl std::fmt::Display for AddressField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address in the Brazilian postal vocabulary.
///
/// Built once from a provider payload and shared by value afterwards; nothing
/// in the pipeline mutates an address after extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedAddress {
    /// Street.
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    /// Neighborhood.
    pub bairro: Option<String>,
    /// City.
    pub municipio: Option<String>,
    pub regiao_metropolitana: Option<String>,
    /// Full state name.
    pub uf: Option<String>,
    /// Two-letter state code.
    #[serde(rename = "siglaUF")]
    pub sigla_uf: Option<String>,
    /// Postal code.
    pub cep: Option<String>,
    pub pais: Option<String>,
}

impl StandardizedAddress {
    pub fn field(&self, field: AddressField) -> Option<&str> {
        let value = match field {
            AddressField::Logradouro => &self.logradouro,
            AddressField::Numero => &self.numero,
            AddressField::Bairro => &self.bairro,
            AddressField::Municipio => &self.municipio,
            AddressField::RegiaoMetropolitana => &self.regiao_metropolitana,
            AddressField::Uf => &self.uf,
            AddressField::SiglaUf => &self.sigla_uf,
            AddressField::Cep => &self.cep,
            AddressField::Pais => &self.pais,
        };
        value.as_deref()
    }

    /// True when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        AddressField::ALL.iter().all(|f| self.field(*f).is_none())
    }

    /// "Rua Direita, 172", or just the street when there is no number.
    pub fn street_line(&self) -> Option<String> {
        let street = self.logradouro.as_deref()?;
        Some(match self.numero.as_deref() {
            Some(numero) => format!("{street}, {numero}"),
            None => street.to_string(),
        })
    }
}

impl std::fmt::Display for StandardizedAddress {
    /// Single-line postal form: street, number, neighborhood, city, state, CEP.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let street = self.street_line();
        let state = self.sigla_uf.as_deref().or(self.uf.as_deref());
        let parts: Vec<&str> = [
            street.as_deref(),
            self.bairro.as_deref(),
            self.municipio.as_deref(),
            state,
            self.cep.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        f.write_str(&parts.join(", "))
    }
}
