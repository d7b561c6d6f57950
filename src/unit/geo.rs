use crate::unit::{sanitize_label, UnitKey, WorkUnit};

/// A city-like geographic point walked through the explore listing
///
/// Latitude and longitude are kept as the literal strings from the input
/// file: they are the unit's identity and are re-encoded into every request,
/// so no float round-trip may alter them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeoPoint {
    pub name: String,
    pub country: String,
    pub lat: String,
    pub lng: String,
}

impl GeoPoint {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        lat: impl Into<String>,
        lng: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            lat: lat.into(),
            lng: lng.into(),
        }
    }

    /// Checks that every identity field is present and the coordinates are numeric
    pub fn is_valid(&self) -> bool {
        let present = [&self.name, &self.country, &self.lat, &self.lng]
            .iter()
            .all(|field| !field.trim().is_empty());

        present
            && self.lat.trim().parse::<f64>().is_ok()
            && self.lng.trim().parse::<f64>().is_ok()
            && self.key().is_storable()
    }
}

impl WorkUnit for GeoPoint {
    fn key(&self) -> UnitKey {
        UnitKey::new(self.lat.clone(), self.lng.clone())
    }

    /// City name plus coordinates; two cities may share a name
    fn label(&self) -> String {
        format!("{}_{}_{}", sanitize_label(&self.name), self.lat, self.lng)
    }
}
