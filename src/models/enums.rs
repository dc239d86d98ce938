use crate::db::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(RecordType {
    Lab => "LAB",
    Vital => "VITAL",
    Medication => "MEDICATION",
    Condition => "CONDITION",
    Allergy => "ALLERGY",
    Immunization => "IMMUNIZATION",
    Encounter => "ENCOUNTER",
    Note => "NOTE",
});

str_enum!(Metric {
    Average => "average",
    Maximum => "maximum",
    Minimum => "minimum",
    Count => "count",
    Trend => "trend",
    List => "list",
});

str_enum!(FilterCondition {
    Abnormal => "abnormal",
    Active => "active",
    Recent => "recent",
});

str_enum!(SortOrder {
    Asc => "ASC",
    Desc => "DESC",
});

impl Default for SortOrder {
    fn default() -> Self {
        Self::Desc
    }
}

impl Metric {
    /// Capitalized form used in insight titles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Average => "Average",
            Self::Maximum => "Maximum",
            Self::Minimum => "Minimum",
            Self::Count => "Count",
            Self::Trend => "Trend",
            Self::List => "List",
        }
    }

    /// Average, maximum and minimum collapse rows into one numeric value.
    pub fn is_numeric_aggregate(&self) -> bool {
        matches!(self, Self::Average | Self::Maximum | Self::Minimum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn record_type_round_trip() {
        for (variant, s) in [
            (RecordType::Lab, "LAB"),
            (RecordType::Vital, "VITAL"),
            (RecordType::Medication, "MEDICATION"),
            (RecordType::Condition, "CONDITION"),
            (RecordType::Allergy, "ALLERGY"),
            (RecordType::Immunization, "IMMUNIZATION"),
            (RecordType::Encounter, "ENCOUNTER"),
            (RecordType::Note, "NOTE"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(RecordType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn metric_serializes_lowercase() {
        let json = serde_json::to_string(&Metric::Average).unwrap();
        assert_eq!(json, "\"average\"");
        let back: Metric = serde_json::from_str("\"maximum\"").unwrap();
        assert_eq!(back, Metric::Maximum);
    }

    #[test]
    fn sort_order_defaults_to_descending() {
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }

    #[test]
    fn only_value_metrics_are_numeric_aggregates() {
        assert!(Metric::Average.is_numeric_aggregate());
        assert!(Metric::Minimum.is_numeric_aggregate());
        assert!(!Metric::Count.is_numeric_aggregate());
        assert!(!Metric::Trend.is_numeric_aggregate());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(RecordType::from_str("lab").is_err());
        assert!(FilterCondition::from_str("unknown").is_err());
        assert!(SortOrder::from_str("").is_err());
    }
}
