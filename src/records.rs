use polars::prelude::{AnyValue, DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

pub const ID_COLUMN: &str = "id";
pub const GENDER_COLUMN: &str = "Gender";

pub const OHE_COLUMNS: [&str; 1] = [GENDER_COLUMN];

pub const ORD_COLUMNS: [&str; 3] = [
    "Stress Level",
    "Physical Activity Days Per Week",
    "Sleep Hours Per Day",
];

pub const NUM_COLUMNS: [&str; 21] = [
    "Age",
    "Cholesterol",
    "Heart rate",
    "Exercise Hours Per Week",
    "Sedentary Hours Per Day",
    "Income",
    "BMI",
    "Triglycerides",
    "Blood sugar",
    "CK-MB",
    "Troponin",
    "Systolic blood pressure",
    "Diastolic blood pressure",
    "Diabetes",
    "Family History",
    "Smoking",
    "Obesity",
    "Alcohol Consumption",
    "Diet",
    "Previous Heart Problems",
    "Medication Use",
];

pub struct HeartRecord {
}

impl HeartRecord {
    /// Dtype overrides applied when reading an upload. Everything not listed
    /// here is inferred by the reader.
    pub fn raw_schema() -> Schema {
        Schema::from_iter(
            vec![
                Field::new(GENDER_COLUMN, DataType::Utf8),
            ])
    }

    /// All feature columns the heart-attack pipeline expects, grouped as
    /// one-hot, ordinal then numeric.
    pub fn feature_columns() -> Vec<&'static str> {
        OHE_COLUMNS
            .iter()
            .chain(ORD_COLUMNS.iter())
            .chain(NUM_COLUMNS.iter())
            .copied()
            .collect()
    }
}

/// One output row of `/predict`. `id` is copied from the input row in
/// whatever type the reader gave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Value,
    pub prediction: u8,
}

/// Converts one cell of the `id` column to JSON without coercing its type.
pub fn id_value(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Bool(v),
        AnyValue::Utf8(v) => Value::String(v.to_string()),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number),
        AnyValue::Float64(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        other => Value::String(other.to_string()),
    }
}
