/// Census summary level of an areal unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoType {
    Tract,      // Tract -> County
    Group,      // Group -> Tract
}

impl GeoType {
    pub fn to_str(&self) -> &'static str {
        match self {
            GeoType::Tract => "tract",
            GeoType::Group => "group",
        }
    }

    /// Length of a full GEOID at this level (state + county + tract [+ group]).
    pub fn id_len(&self) -> usize {
        match self {
            GeoType::Tract => 11,
            GeoType::Group => 12,
        }
    }

    /// Infer the level from the length of a GEOID.
    pub fn from_id_len(len: usize) -> Option<GeoType> {
        match len {
            11 => Some(GeoType::Tract),
            12 => Some(GeoType::Group),
            _ => None,
        }
    }
}
