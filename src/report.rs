use crate::{PredictionReport, PredictionResult};
use anyhow::Result;
use csv::Writer;
use serde::Serialize;
use std::io;

pub const SMILES_COLUMN: &str = "canonical_smiles";
pub const PIC50_COLUMN: &str = "activity (pIC50)";
pub const IC50_COLUMN: &str = "activity (IC50) nM";

/// One CSV row, with the column names the results table uses.
#[derive(Serialize)]
struct CsvRow<'a> {
    row: usize,
    #[serde(rename = "canonical_smiles")]
    smiles: &'a str,
    formula: &'a str,
    #[serde(rename = "activity (pIC50)")]
    pic50: f64,
    #[serde(rename = "activity (IC50) nM")]
    ic50_nm: f64,
}

impl<'a> From<&'a PredictionResult> for CsvRow<'a> {
    fn from(result: &'a PredictionResult) -> Self {
        Self {
            row: result.row,
            smiles: &result.smiles,
            formula: &result.formula,
            pic50: result.pic50,
            ic50_nm: result.ic50_nm,
        }
    }
}

/// Write the successful rows as CSV with a header line.
pub fn write_csv<W: io::Write>(report: &PredictionReport, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    if report.results.is_empty() {
        // serialize() only writes headers along with the first row.
        wtr.write_record(["row", SMILES_COLUMN, "formula", PIC50_COLUMN, IC50_COLUMN])?;
    }
    for result in &report.results {
        wtr.serialize(CsvRow::from(result))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(report: &PredictionReport) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(report, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Human-readable pIC50 with three decimals.
pub fn format_pic50(pic50: f64) -> String {
    format!("{pic50:.3}")
}

/// IC50 in nM: two decimals below 1000 nM, whole numbers above.
pub fn format_ic50(ic50_nm: f64) -> String {
    if ic50_nm < 1000.0 {
        format!("{ic50_nm:.2}")
    } else {
        format!("{ic50_nm:.0}")
    }
}

/// Render the report as aligned plain-text tables for the terminal.
pub fn to_text_table(report: &PredictionReport) -> String {
    let header = ["row", SMILES_COLUMN, "formula", PIC50_COLUMN, IC50_COLUMN];
    let rows: Vec<[String; 5]> = report
        .results
        .iter()
        .map(|r| {
            [
                r.row.to_string(),
                r.smiles.clone(),
                r.formula.clone(),
                format_pic50(r.pic50),
                format_ic50(r.ic50_nm),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Prediction results ({}):\n", report.model));
    let line = |out: &mut String, cells: &[&str]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    };
    line(&mut out, &header);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        line(&mut out, &cells);
    }
    if rows.is_empty() {
        out.push_str("(no molecules could be scored)\n");
    }

    if !report.failures.is_empty() {
        out.push_str("\nFailed rows:\n");
        for failure in &report.failures {
            out.push_str(&format!("  row {}: {}\n", failure.row, failure.reason));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelId, RowFailure};

    fn report() -> PredictionReport {
        PredictionReport {
            model: ModelId::Xgb,
            results: vec![PredictionResult {
                row: 1,
                smiles: "CCO".to_string(),
                formula: "C2H6O".to_string(),
                heavy_atoms: 3,
                pic50: 6.0,
                ic50_nm: 1000.0,
            }],
            failures: vec![RowFailure {
                row: 2,
                smiles: "invalid_garbage".to_string(),
                reason: "Invalid SMILES 'invalid_garbage'".to_string(),
            }],
        }
    }

    #[test]
    fn test_csv() {
        let csv = to_csv_string(&report()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("row,canonical_smiles,formula,activity (pIC50),activity (IC50) nM")
        );
        assert_eq!(lines.next(), Some("1,CCO,C2H6O,6.0,1000.0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_without_results_still_has_header() {
        let mut empty = report();
        empty.results.clear();
        let csv = to_csv_string(&empty).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("row,canonical_smiles"));
    }

    #[test]
    fn test_text_table() {
        let table = to_text_table(&report());
        assert!(table.starts_with("Prediction results (xgb_model):"));
        assert!(table.contains("CCO"));
        assert!(table.contains("6.000"));
        assert!(table.contains("1000"));
        assert!(table.contains("row 2: Invalid SMILES"));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_pic50(6.12345), "6.123");
        assert_eq!(format_ic50(12.346), "12.35");
        assert_eq!(format_ic50(10_000.4), "10000");
    }
}
