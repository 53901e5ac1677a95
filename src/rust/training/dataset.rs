use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::TrainingError;

/// Text columns concatenated, in order, into a record's text.
pub const TEXT_COLUMNS: [&str; 5] = ["title", "company_profile", "description", "requirements", "benefits"];
pub const LABEL_COLUMN: &str = "fraudulent";

/// One labelled historical posting. `label` is 1 for fraudulent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub text: String,
    pub label: u8,
}

impl TrainingRecord {
    pub fn new(text: impl Into<String>, label: u8) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<TrainingRecord>, TrainingError> {
    let path = path.as_ref();
    info!("Loading training data from {:?}", path);
    load_dataset_from_reader(File::open(path)?)
}

/// Reads a headered CSV with the posting columns and a `fraudulent` column.
///
/// Extra columns are ignored and missing or short cells read as empty
/// strings. A header without one of the required columns fails with
/// `InsufficientData`; a label other than `0` or `1` fails with
/// `InvalidLabel` naming the 1-based data row.
pub fn load_dataset_from_reader<R: Read>(reader: R) -> Result<Vec<TrainingRecord>, TrainingError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| TrainingError::InsufficientData(format!("dataset has no '{}' column", name)))
    };
    let text_columns = TEXT_COLUMNS.iter().map(|&name| column(name)).collect::<Result<Vec<_>, _>>()?;
    let label_column = column(LABEL_COLUMN)?;

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let text = text_columns
            .iter()
            .map(|&c| row.get(c).unwrap_or("").trim())
            .collect::<Vec<_>>()
            .join(" ");

        let raw_label = row.get(label_column).unwrap_or("").trim();
        let label = match raw_label {
            "0" => 0,
            "1" => 1,
            other => {
                return Err(TrainingError::InvalidLabel {
                    row: index + 1,
                    value: other.to_string(),
                })
            }
        };
        records.push(TrainingRecord { text, label });
    }

    debug!("Loaded {} training records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "job_id,title,company_profile,description,requirements,benefits,fraudulent\n";

    #[test]
    fn test_columns_are_concatenated() {
        let data = format!(
            "{}1,Engineer,Acme builds things,Write code,Rust,Dental,0\n2,Agent,,Earn cash fast,,,1\n",
            HEADER
        );
        let records = load_dataset_from_reader(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], TrainingRecord::new("Engineer Acme builds things Write code Rust Dental", 0));
        assert_eq!(records[1].label, 1);
        assert_eq!(records[1].text, "Agent  Earn cash fast  ");
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let data = "fraudulent,title,company_profile,description,requirements,benefits\n1,Agent\n";
        let records = load_dataset_from_reader(data.as_bytes()).unwrap();
        assert_eq!(records[0].label, 1);
        assert_eq!(records[0].text.trim(), "Agent");
    }

    #[test]
    fn test_missing_column() {
        let data = "title,description,fraudulent\nEngineer,Write code,0\n";
        let err = load_dataset_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, TrainingError::InsufficientData(ref msg) if msg.contains("company_profile")));
    }

    #[test]
    fn test_invalid_label() {
        let data = format!("{}1,Engineer,,,,,0\n2,Agent,,,,,yes\n", HEADER);
        let err = load_dataset_from_reader(data.as_bytes()).unwrap_err();
        match err {
            TrainingError::InvalidLabel { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "yes");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), format!("{}1,Engineer,,,,,0\n", HEADER)).unwrap();
        let records = load_dataset(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(load_dataset("/no/such/jobcheck.csv"), Err(TrainingError::Io(_))));
    }
}
