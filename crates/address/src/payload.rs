//! Reverse-geocoding payloads and their mapping onto [`StandardizedAddress`].

use serde::Deserialize;

use crate::address::StandardizedAddress;

/// Top level of a Nominatim-style reverse-geocoding response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeocodePayload {
    #[serde(default)]
    pub address: Option<ProviderAddress>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// The `address` object of a reverse-geocoding response.
///
/// Providers fill different keys depending on the kind of place, so every
/// concept has several candidate keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderAddress {
    pub road: Option<String>,
    pub street: Option<String>,
    pub pedestrian: Option<String>,
    pub house_number: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub quarter: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub municipality: Option<String>,
    pub village: Option<String>,
    pub county: Option<String>,
    pub state_district: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    pub iso3166_2_lvl4: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

impl GeocodePayload {
    /// Read a payload from arbitrary JSON.
    ///
    /// Anything that does not have the expected shape yields a payload with
    /// no address rather than an error.
    pub fn from_value(raw: &serde_json::Value) -> Self {
        match serde_json::from_value(raw.clone()) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(error = %error, "unrecognized geocode payload shape");
                Self::default()
            }
        }
    }
}

impl ProviderAddress {
    pub fn street(&self) -> Option<&str> {
        first_present(&[&self.road, &self.street, &self.pedestrian])
    }

    pub fn neighborhood(&self) -> Option<&str> {
        first_present(&[&self.neighbourhood, &self.suburb, &self.quarter])
    }

    /// Metropolitan region, if the provider reported one.
    ///
    /// Brazilian `county` and `state_district` values are usually IBGE
    /// geographic regions ("Região Geográfica Imediata de ..."), which are
    /// not metropolitan regions and are ignored.
    pub fn metropolitan_region(&self) -> Option<&str> {
        [&self.county, &self.state_district]
            .into_iter()
            .filter_map(present)
            .find(|value| value.to_lowercase().starts_with(METROPOLITAN_PREFIX))
    }

    pub fn city(&self) -> Option<&str> {
        first_present(&[&self.city, &self.town, &self.municipality, &self.village])
    }

    pub fn house_number(&self) -> Option<&str> {
        present(&self.house_number)
    }

    pub fn postcode(&self) -> Option<&str> {
        present(&self.postcode)
    }

    pub fn country_code(&self) -> Option<&str> {
        present(&self.country_code)
    }

    /// Two-letter state code, from the explicit code, the ISO subdivision,
    /// or the state name, in that order.
    pub fn state_code(&self) -> Option<String> {
        if let Some(code) = present(&self.state_code) {
            return Some(code.to_uppercase());
        }
        if let Some(iso) = present(&self.iso3166_2_lvl4) {
            if let Some((_, code)) = iso.rsplit_once('-') {
                if !code.is_empty() {
                    return Some(code.to_uppercase());
                }
            }
        }
        present(&self.state)
            .and_then(state_code_for_name)
            .map(str::to_string)
    }
}

/// Map a provider payload onto the standardized vocabulary.
pub fn extract_address(payload: &GeocodePayload) -> StandardizedAddress {
    let Some(address) = payload.address.as_ref() else {
        return StandardizedAddress::default();
    };

    let owned = |value: Option<&str>| value.map(str::to_string);

    StandardizedAddress {
        logradouro: owned(address.street()),
        numero: owned(address.house_number()),
        bairro: owned(address.neighborhood()),
        municipio: owned(address.city()),
        regiao_metropolitana: owned(address.metropolitan_region()),
        uf: owned(present(&address.state)),
        sigla_uf: address.state_code(),
        cep: owned(address.postcode()),
        pais: owned(present(&address.country)),
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates.iter().copied().find_map(present)
}

const METROPOLITAN_PREFIX: &str = "região metropolitana";

const BRAZILIAN_STATES: [(&str, &str); 27] = [
    ("Acre", "AC"),
    ("Alagoas", "AL"),
    ("Amapá", "AP"),
    ("Amazonas", "AM"),
    ("Bahia", "BA"),
    ("Ceará", "CE"),
    ("Distrito Federal", "DF"),
    ("Espírito Santo", "ES"),
    ("Goiás", "GO"),
    ("Maranhão", "MA"),
    ("Mato Grosso", "MT"),
    ("Mato Grosso do Sul", "MS"),
    ("Minas Gerais", "MG"),
    ("Pará", "PA"),
    ("Paraíba", "PB"),
    ("Paraná", "PR"),
    ("Pernambuco", "PE"),
    ("Piauí", "PI"),
    ("Rio de Janeiro", "RJ"),
    ("Rio Grande do Norte", "RN"),
    ("Rio Grande do Sul", "RS"),
    ("Rondônia", "RO"),
    ("Roraima", "RR"),
    ("Santa Catarina", "SC"),
    ("São Paulo", "SP"),
    ("Sergipe", "SE"),
    ("Tocantins", "TO"),
];

/// Two-letter code of a Brazilian state given its full name.
pub fn state_code_for_name(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    BRAZILIAN_STATES
        .iter()
        .find(|(state, _)| state.to_lowercase() == name)
        .map(|(_, code)| *code)
}
