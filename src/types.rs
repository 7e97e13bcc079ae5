//! Domain primitives: sources, consumers, allocations, and the source kinds
//! recognized by bootstrap (§3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Energy amounts, capacities, and demands use `f64` throughout; all
/// equality comparisons against this type must go through `Config::numeric_tolerance`.
pub type Energy = f64;

/// A source identifier, as stored in `energy_sources.id`.
pub type SourceId = String;

/// A consumer identifier, as stored in `energy_consumers.id`.
pub type ConsumerId = String;

/// Closed enumeration of source kinds recognized at bootstrap (§3, §6).
/// An `energy_sources.source_type` value outside this set is a
/// [`crate::Error::Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Photovoltaic generation
    Solar,
    /// Wind turbines
    Wind,
    /// Hydroelectric generation
    Hydro,
    /// Nuclear fission plants
    Nuclear,
    /// Coal-fired plants
    Coal,
    /// Natural gas turbines
    NaturalGas,
    /// Geothermal generation
    Geothermal,
    /// Biomass generation
    Biomass,
    /// Grid-scale battery storage
    Battery,
}

impl SourceKind {
    /// All recognized kinds, in canonical enumeration order.
    pub const ALL: &'static [SourceKind] = &[
        SourceKind::Solar,
        SourceKind::Wind,
        SourceKind::Hydro,
        SourceKind::Nuclear,
        SourceKind::Coal,
        SourceKind::NaturalGas,
        SourceKind::Geothermal,
        SourceKind::Biomass,
        SourceKind::Battery,
    ];

    /// Parse a `source_type` column value, case-insensitively, accepting
    /// either "natural_gas" or "natural gas".
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALL.iter().copied().find(|k| k.as_str() == normalized)
    }

    /// Canonical snake_case string form.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Solar => "solar",
            SourceKind::Wind => "wind",
            SourceKind::Hydro => "hydro",
            SourceKind::Nuclear => "nuclear",
            SourceKind::Coal => "coal",
            SourceKind::NaturalGas => "natural_gas",
            SourceKind::Geothermal => "geothermal",
            SourceKind::Biomass => "biomass",
            SourceKind::Battery => "battery",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A producing source (§3).
///
/// Mutated only through [`crate::index::AllocationIndex`]; never construct
/// one with `load` already set from outside bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Unique identifier
    pub id: SourceId,
    /// Generation kind
    pub kind: SourceKind,
    /// Nameplate capacity (energy units)
    pub capacity: Energy,
    /// Current load, i.e. energy committed to allocations
    pub load: Energy,
    /// Whether the source is currently producing
    pub active: bool,
}

impl Source {
    /// Construct a new, fully active source at zero load.
    pub fn new(id: impl Into<SourceId>, kind: SourceKind, capacity: Energy) -> Self {
        Self {
            id: id.into(),
            kind,
            capacity,
            load: 0.0,
            active: true,
        }
    }

    /// Available capacity = capacity − load, or 0.0 if inactive.
    pub fn available(&self) -> Energy {
        if self.active {
            (self.capacity - self.load).max(0.0)
        } else {
            0.0
        }
    }
}

/// A consuming load (§3).
///
/// `allocated` is derived from the set of allocations that target this
/// consumer; never mutate it directly outside [`crate::index::AllocationIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    /// Unique identifier
    pub id: ConsumerId,
    /// Priority level; 1 is highest importance
    pub priority: u32,
    /// Requested demand (energy units)
    pub demand: Energy,
    /// Currently allocated energy
    pub allocated: Energy,
}

impl Consumer {
    /// Construct a new consumer with zero allocation.
    pub fn new(id: impl Into<ConsumerId>, priority: u32, demand: Energy) -> Self {
        Self {
            id: id.into(),
            priority,
            demand,
            allocated: 0.0,
        }
    }

    /// Remaining demand = demand − allocated.
    pub fn remaining(&self) -> Energy {
        (self.demand - self.allocated).max(0.0)
    }

    /// True once remaining demand is within `tolerance` of zero.
    pub fn is_satisfied(&self, tolerance: Energy) -> bool {
        self.remaining() <= tolerance
    }
}

/// A single (source, consumer, amount) allocation triple, used in
/// observation snapshots (§3, §6). The authoritative amount lives on the
/// graph edge's flow; this is an owned copy taken at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Source identifier
    pub source_id: SourceId,
    /// Consumer identifier
    pub consumer_id: ConsumerId,
    /// Allocated amount
    pub amount: Energy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds() {
        assert_eq!(SourceKind::parse("solar"), Some(SourceKind::Solar));
        assert_eq!(SourceKind::parse("Natural Gas"), Some(SourceKind::NaturalGas));
        assert_eq!(SourceKind::parse("NATURAL_GAS"), Some(SourceKind::NaturalGas));
        assert_eq!(SourceKind::parse("dilithium"), None);
    }

    #[test]
    fn available_capacity_respects_active_flag() {
        let mut s = Source::new("S1", SourceKind::Solar, 100.0);
        s.load = 40.0;
        assert_eq!(s.available(), 60.0);
        s.active = false;
        assert_eq!(s.available(), 0.0);
    }

    #[test]
    fn remaining_demand_never_negative() {
        let mut c = Consumer::new("C1", 1, 100.0);
        c.allocated = 150.0; // shouldn't happen, but remaining() must clamp
        assert_eq!(c.remaining(), 0.0);
    }
}
