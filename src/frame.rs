use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use polars::frame::DataFrame;
use polars::prelude::*;
use polars_io::parquet::ParquetReader;

use crate::records::{HeartRecord, GENDER_COLUMN};

lazy_static! {
    static ref RAW_SCHEMA: SchemaRef = Arc::new(HeartRecord::raw_schema());
}

pub fn read_parquet<P: AsRef<Path>>(path: P) -> PolarsResult<DataFrame> {
    let file = File::open(path)?;

    ParquetReader::new(file).finish()
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> PolarsResult<DataFrame> {
    let file = File::open(path)?;

    CsvReader::new(file)
        .has_header(true)
        .with_dtypes(Some(RAW_SCHEMA.clone()))
        .finish()
}

/// Reads an uploaded table, picking the reader from the file extension.
/// Anything that is not `.parquet` is treated as CSV.
pub fn read_upload<P: AsRef<Path>>(path: P) -> PolarsResult<DataFrame> {
    let is_parquet = path
        .as_ref()
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("parquet"))
        .unwrap_or(false);

    if is_parquet {
        read_parquet(path)
    } else {
        read_csv(path)
    }
}

/// Maps the numeric gender codes to the labels the pipeline was fitted on.
pub fn substitute_gender(value: &str) -> &str {
    match value {
        "1.0" => "Male",
        "0.0" => "Female",
        other => other,
    }
}

/// Rewrites the gender column in place. Values other than the two numeric
/// codes, nulls included, are left as they are.
pub fn apply_gender_substitution(df: &mut DataFrame) -> PolarsResult<()> {
    let gender = df.column(GENDER_COLUMN)?.cast(&DataType::Utf8)?;
    let substituted: Utf8Chunked = gender
        .utf8()?
        .into_iter()
        .map(|value| value.map(substitute_gender))
        .collect();

    let mut series = substituted.into_series();
    series.rename(GENDER_COLUMN);
    df.with_column(series)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars_io::parquet::ParquetWriter;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn numeric_codes_become_labels() {
        assert_eq!(substitute_gender("1.0"), "Male");
        assert_eq!(substitute_gender("0.0"), "Female");
    }

    #[test]
    fn other_values_pass_through() {
        for value in ["Male", "Female", "1", "0", "2.0", "", " 1.0"] {
            assert_eq!(substitute_gender(value), value);
        }
    }

    #[test]
    fn substitution_keeps_nulls_and_order() {
        let mut df = DataFrame::new(vec![
            Series::new("id", &[1i64, 2, 3, 4]),
            Series::new(GENDER_COLUMN, &[Some("1.0"), None, Some("0.0"), Some("Male")]),
        ])
        .unwrap();

        apply_gender_substitution(&mut df).unwrap();

        let gender: Vec<Option<&str>> = df
            .column(GENDER_COLUMN)
            .unwrap()
            .utf8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(gender, vec![Some("Male"), None, Some("Female"), Some("Male")]);
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn csv_gender_codes_are_read_as_text() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,Gender,Age").unwrap();
        writeln!(file, "10,1.0,0.5").unwrap();
        writeln!(file, "11,0.0,0.7").unwrap();

        let mut df = read_upload(file.path()).unwrap();
        assert_eq!(df.column(GENDER_COLUMN).unwrap().dtype(), &DataType::Utf8);

        apply_gender_substitution(&mut df).unwrap();
        let gender: Vec<Option<&str>> = df
            .column(GENDER_COLUMN)
            .unwrap()
            .utf8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(gender, vec![Some("Male"), Some("Female")]);
    }

    #[test]
    fn parquet_uploads_are_read_and_substituted() {
        let mut source = DataFrame::new(vec![
            Series::new("id", &[10i64, 11]),
            Series::new(GENDER_COLUMN, &[1.0f64, 0.0]),
            Series::new("Age", &[0.5f64, 0.7]),
        ])
        .unwrap();
        let mut file = Builder::new().suffix(".parquet").tempfile().unwrap();
        ParquetWriter::new(&mut file).finish(&mut source).unwrap();

        let mut df = read_upload(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column(GENDER_COLUMN).unwrap().dtype(), &DataType::Float64);

        apply_gender_substitution(&mut df).unwrap();
        let gender: Vec<Option<&str>> = df
            .column(GENDER_COLUMN)
            .unwrap()
            .utf8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(gender, vec![Some("Male"), Some("Female")]);
    }

    #[test]
    fn missing_gender_column_is_an_error() {
        let mut df = DataFrame::new(vec![Series::new("id", &[1i64])]).unwrap();
        assert!(apply_gender_substitution(&mut df).is_err());
    }
}
