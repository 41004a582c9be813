/// How a unit's raw measure was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureStatus {
    #[default]
    Pending,
    Measured,
    FetchFailed,    // Feature fetch failed; measure defaulted to 0
    Unmatched,      // No population row for this unit
}

/// Derived values attached to a unit during a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitRecord {
    pub status: MeasureStatus,
    pub measure: Option<f64>,   // Raw count, entropy or population
    pub area: Option<f64>,      // Area the measure was normalized by
    pub density: Option<f64>,
    pub index: Option<f64>,
}

impl UnitRecord {
    #[inline] pub fn is_measured(&self) -> bool { self.status == MeasureStatus::Measured }
}
