use super::types::{NormalizedRecord, RawValue, Record, TEXT_FIELD};

/// Canonical string form of a raw value, before case-folding.
pub fn stringify(value: &RawValue) -> String {
    match value {
        RawValue::Text(s) => s.clone(),
        RawValue::Int(i) => i.to_string(),
        RawValue::Bool(b) => b.to_string(),
        // Integral floats print without a fraction, as spreadsheets show them.
        RawValue::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        RawValue::Float(f) => f.to_string(),
    }
}

fn fold(value: &str) -> String {
    value.to_uppercase()
}

/// Stringify and uppercase every value; keys pass through untouched.
pub fn normalize(record: &Record) -> NormalizedRecord {
    let fields = match record {
        Record::Tabular(fields) => fields
            .iter()
            .map(|(key, value)| (key.clone(), fold(&stringify(value))))
            .collect(),
        Record::TextLine(line) => vec![(TEXT_FIELD.to_string(), fold(line))],
    };
    NormalizedRecord::new(fields)
}

pub fn normalize_all(records: &[Record]) -> Vec<NormalizedRecord> {
    records.iter().map(normalize).collect()
}
