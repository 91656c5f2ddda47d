//! Hash-rate units and conversion to the common "MH" unit.
//!
//! Every speed reading is converted to MH (10^6 hashes/sec) before it is
//! summed, so rigs mixing SHA-256 ASICs (TH) with GPU algorithms (MH, kH)
//! still produce one comparable aggregate.

/// Hash-rate unit suffix as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashUnit {
    H,
    KH,
    MH,
    GH,
    TH,
    PH,
    EH,
}

/// All supported units, smallest first.
pub const ALL_UNITS: &[HashUnit] = &[
    HashUnit::H,
    HashUnit::KH,
    HashUnit::MH,
    HashUnit::GH,
    HashUnit::TH,
    HashUnit::PH,
    HashUnit::EH,
];

impl HashUnit {
    /// Parse a display suffix such as `"kH"`, `"TH"` or `"MH/s"`.
    ///
    /// Matching is case-insensitive and tolerates a trailing `/s`.
    /// Returns `None` for anything outside the table.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let trimmed = suffix.trim();
        let bare = trimmed
            .strip_suffix("/s")
            .or_else(|| trimmed.strip_suffix("/S"))
            .unwrap_or(trimmed);
        match bare.to_ascii_uppercase().as_str() {
            "H" => Some(HashUnit::H),
            "KH" => Some(HashUnit::KH),
            "MH" => Some(HashUnit::MH),
            "GH" => Some(HashUnit::GH),
            "TH" => Some(HashUnit::TH),
            "PH" => Some(HashUnit::PH),
            "EH" => Some(HashUnit::EH),
            _ => None,
        }
    }

    /// Canonical suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            HashUnit::H => "H",
            HashUnit::KH => "kH",
            HashUnit::MH => "MH",
            HashUnit::GH => "GH",
            HashUnit::TH => "TH",
            HashUnit::PH => "PH",
            HashUnit::EH => "EH",
        }
    }
}

/// Convert `value` expressed in `unit` to MH.
///
/// Units below MH divide, units above multiply, so `1 kH` is exactly
/// `0.001 MH` and `1 TH` is exactly `1_000_000 MH`.
pub fn to_mh(value: f64, unit: HashUnit) -> f64 {
    match unit {
        HashUnit::H => value / 1_000_000.0,
        HashUnit::KH => value / 1_000.0,
        HashUnit::MH => value,
        HashUnit::GH => value * 1_000.0,
        HashUnit::TH => value * 1_000_000.0,
        HashUnit::PH => value * 1_000_000_000.0,
        HashUnit::EH => value * 1_000_000_000_000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_round_trips_through_as_str() {
        for &unit in ALL_UNITS {
            assert_eq!(HashUnit::from_suffix(unit.as_str()), Some(unit));
        }
    }

    #[test]
    fn suffix_accepts_per_second_and_case() {
        assert_eq!(HashUnit::from_suffix("MH/s"), Some(HashUnit::MH));
        assert_eq!(HashUnit::from_suffix("kh"), Some(HashUnit::KH));
        assert_eq!(HashUnit::from_suffix(" Th "), Some(HashUnit::TH));
        assert_eq!(HashUnit::from_suffix("Sol"), None);
        assert_eq!(HashUnit::from_suffix(""), None);
    }
}
