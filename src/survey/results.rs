use crate::survey::*;

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;

/// One response record per product view. The column set and order match
/// the study's results sheet.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub participant_number: String,
    pub group: String,
    pub group_key: String,
    pub product_number: usize,
    pub total_products: usize,
    pub image_file: String,
    /// Seconds between the stimulus appearing and the participant reacting,
    /// rounded to milliseconds.
    pub reaction_time: f64,
    /// 7-point price-fairness scale.
    pub price_fairness: u8,
    /// Free-numeric willingness-to-pay value.
    pub max_price: f64,
    /// 7-point purchase-probability scale.
    pub purchase_probability: u8,
    pub timestamp: String,
}

pub fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Appends response records to a CSV file, writing the header only when
/// the file is new or empty.
///
/// Every record is flushed as soon as it is appended: a session that is
/// interrupted keeps the answers already given.
pub struct CsvResultsWriter {
    path: String,
}

impl CsvResultsWriter {
    pub fn new(path: &str) -> CsvResultsWriter {
        CsvResultsWriter {
            path: path.to_string(),
        }
    }

    pub fn append(&mut self, record: &ResponseRecord) -> SurveyResult<()> {
        let write_header = match fs::metadata(&self.path) {
            Result::Ok(m) => m.len() == 0,
            Result::Err(_) => true,
        };
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(OpeningResultsSnafu {
                path: self.path.clone(),
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record).context(WritingResultsSnafu {
            path: self.path.clone(),
        })?;
        writer.flush().context(FlushingResultsSnafu {
            path: self.path.clone(),
        })?;
        debug!(
            "append: product {} for participant {} written to {}",
            record.product_number, record.participant_number, self.path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(product_number: usize) -> ResponseRecord {
        ResponseRecord {
            participant_number: "12".to_string(),
            group: "Premium".to_string(),
            group_key: "premium".to_string(),
            product_number,
            total_products: 2,
            image_file: format!("product_{}.png", product_number),
            reaction_time: 1.234,
            price_fairness: 5,
            max_price: 1500.0,
            purchase_probability: 6,
            timestamp: "2024-01-01 12:00:00".to_string(),
        }
    }

    #[test]
    fn appends_header_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut writer = CsvResultsWriter::new(path.to_str().unwrap());
        writer.append(&record(1)).unwrap();
        writer.append(&record(2)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let header_lines = contents
            .lines()
            .filter(|l| l.starts_with("participant_number"))
            .count();
        assert_eq!(header_lines, 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn written_records_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut writer = CsvResultsWriter::new(path.to_str().unwrap());
        writer.append(&record(1)).unwrap();
        writer.append(&record(2)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<ResponseRecord> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], record(1));
        assert_eq!(rows[1].image_file, "product_2.png");
    }

    #[test]
    fn timestamp_has_the_expected_shape() {
        let ts = timestamp_now();
        // e.g. 2024-01-01 12:00:00
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }
}
