//! Ordered vocabulary tables driving intent extraction.
//!
//! Every table is scanned front to back and the first containment match wins,
//! so entry order decides ambiguous questions ("blood pressure test" is a LAB
//! question because "test" precedes "blood pressure"). Reordering an entry is a
//! behavior change.

use crate::models::{Metric, RecordType};

/// How far back a time phrase reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    Unbounded,
}

pub static RECORD_TYPE_SYNONYMS: &[(&str, RecordType)] = &[
    // Lab tests
    ("lab", RecordType::Lab),
    ("labs", RecordType::Lab),
    ("lab test", RecordType::Lab),
    ("lab result", RecordType::Lab),
    ("lab results", RecordType::Lab),
    ("laboratory", RecordType::Lab),
    ("test", RecordType::Lab),
    ("results", RecordType::Lab),
    // Vitals
    ("vital", RecordType::Vital),
    ("vitals", RecordType::Vital),
    ("vital sign", RecordType::Vital),
    ("vital signs", RecordType::Vital),
    ("blood pressure", RecordType::Vital),
    ("bp", RecordType::Vital),
    ("heart rate", RecordType::Vital),
    ("hr", RecordType::Vital),
    ("temperature", RecordType::Vital),
    ("temp", RecordType::Vital),
    ("oxygen", RecordType::Vital),
    ("resp rate", RecordType::Vital),
    // Medications
    ("medication", RecordType::Medication),
    ("medications", RecordType::Medication),
    ("med", RecordType::Medication),
    ("meds", RecordType::Medication),
    ("drug", RecordType::Medication),
    ("drugs", RecordType::Medication),
    ("prescription", RecordType::Medication),
    ("prescriptions", RecordType::Medication),
    // Conditions
    ("condition", RecordType::Condition),
    ("conditions", RecordType::Condition),
    ("diagnosis", RecordType::Condition),
    ("diagnoses", RecordType::Condition),
    ("problem", RecordType::Condition),
    ("problems", RecordType::Condition),
    // Allergies
    ("allergy", RecordType::Allergy),
    ("allergies", RecordType::Allergy),
    ("sensitivity", RecordType::Allergy),
    ("sensitivities", RecordType::Allergy),
    // Immunizations
    ("immunization", RecordType::Immunization),
    ("immunizations", RecordType::Immunization),
    ("vaccine", RecordType::Immunization),
    ("vaccines", RecordType::Immunization),
    ("shot", RecordType::Immunization),
    ("shots", RecordType::Immunization),
    // Encounters
    ("encounter", RecordType::Encounter),
    ("encounters", RecordType::Encounter),
    ("visit", RecordType::Encounter),
    ("visits", RecordType::Encounter),
    ("appointment", RecordType::Encounter),
    ("appointments", RecordType::Encounter),
    // Notes
    ("note", RecordType::Note),
    ("notes", RecordType::Note),
    ("clinical note", RecordType::Note),
    ("doctor note", RecordType::Note),
    // Lab analytes, checked last so they never shadow an explicit record word
    ("blood glucose", RecordType::Lab),
    ("blood sugar", RecordType::Lab),
    ("glucose", RecordType::Lab),
    ("cholesterol", RecordType::Lab),
    ("triglycerides", RecordType::Lab),
    ("a1c", RecordType::Lab),
    ("tsh", RecordType::Lab),
    ("thyroid", RecordType::Lab),
    ("hemoglobin", RecordType::Lab),
    ("creatinine", RecordType::Lab),
    ("blood urea nitrogen", RecordType::Lab),
];

pub static METRIC_SYNONYMS: &[(Metric, &[&str])] = &[
    (Metric::Average, &["average", "avg", "mean"]),
    (Metric::Maximum, &["maximum", "max", "highest"]),
    (Metric::Minimum, &["minimum", "min", "lowest"]),
    (Metric::Count, &["count", "how many", "number of"]),
    (Metric::Trend, &["trend", "change", "improvement"]),
    (Metric::List, &["list", "show", "display", "get"]),
];

pub static TIME_PERIODS: &[(&str, Lookback)] = &[
    ("today", Lookback::Days(0)),
    ("yesterday", Lookback::Days(1)),
    ("last week", Lookback::Days(7)),
    ("last 7 days", Lookback::Days(7)),
    ("last 2 weeks", Lookback::Days(14)),
    ("last month", Lookback::Days(30)),
    ("last 30 days", Lookback::Days(30)),
    ("last 3 months", Lookback::Days(90)),
    ("last 6 months", Lookback::Days(180)),
    ("last year", Lookback::Days(365)),
    ("last 12 months", Lookback::Days(365)),
    ("this year", Lookback::Days(365)),
    ("past year", Lookback::Days(365)),
    ("all time", Lookback::Unbounded),
];

/// Canonical attribute key → literal test names that indicate it.
pub static ATTRIBUTE_GROUPS: &[(&str, &[&str])] = &[
    ("glucose", &["Glucose", "Fasting Glucose", "Blood Sugar"]),
    ("cholesterol", &["Cholesterol", "Total Cholesterol", "LDL", "HDL", "Triglycerides"]),
    ("ldl", &["LDL", "Low-density lipoprotein"]),
    ("hdl", &["HDL", "High-density lipoprotein"]),
    ("triglycerides", &["Triglycerides"]),
    ("a1c", &["A1C", "HbA1c", "Hemoglobin A1c"]),
    ("thyroid", &["TSH", "T3", "T4", "Free T4"]),
    ("hemoglobin", &["Hemoglobin", "Hgb", "CBC"]),
    ("creatinine", &["Creatinine", "Kidney Function"]),
    ("bun", &["BUN", "Blood Urea Nitrogen"]),
];

pub static ATTRIBUTE_UNITS: &[(&str, &str)] = &[
    ("glucose", "mg/dL"),
    ("bp", "mmHg"),
    ("blood pressure", "mmHg"),
    ("heart rate", "bpm"),
    ("temperature", "°F"),
    ("cholesterol", "mg/dL"),
    ("ldl", "mg/dL"),
    ("hdl", "mg/dL"),
    ("triglycerides", "mg/dL"),
    ("a1c", "%"),
    ("hemoglobin", "g/dL"),
    ("creatinine", "mg/dL"),
    ("bun", "mg/dL"),
];

/// First record type whose synonym occurs in `text` (already lowercased).
pub fn match_record_type(text: &str) -> Option<RecordType> {
    RECORD_TYPE_SYNONYMS
        .iter()
        .find(|(synonym, _)| text.contains(synonym))
        .map(|(_, record_type)| *record_type)
}

pub fn match_metric(text: &str) -> Option<Metric> {
    METRIC_SYNONYMS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| text.contains(p)))
        .map(|(metric, _)| *metric)
}

/// The matched phrase itself; day-count resolution is left to the compiler.
pub fn match_time_period(text: &str) -> Option<&'static str> {
    TIME_PERIODS
        .iter()
        .find(|(phrase, _)| text.contains(phrase))
        .map(|(phrase, _)| *phrase)
}

pub fn match_attribute(text: &str) -> Option<&'static str> {
    ATTRIBUTE_GROUPS
        .iter()
        .find(|(_, names)| names.iter().any(|name| text.contains(&name.to_lowercase())))
        .map(|(key, _)| *key)
}

/// Resolve a time phrase to its lookback. `None` for phrases outside the table.
pub fn lookback_for(phrase: &str) -> Option<Lookback> {
    TIME_PERIODS
        .iter()
        .find(|(p, _)| *p == phrase)
        .map(|(_, lookback)| *lookback)
}

/// Display unit for a canonical attribute, case-insensitive.
pub fn unit_for(attribute: &str) -> Option<&'static str> {
    let key = attribute.to_lowercase();
    ATTRIBUTE_UNITS
        .iter()
        .find(|(attr, _)| *attr == key)
        .map(|(_, unit)| *unit)
}
