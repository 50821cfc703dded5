use crate::InputError;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::*;

/// Column names people tend to leave at the top of a SMILES file.
const HEADER_NAMES: [&str; 3] = ["smiles", "canonical_smiles", "smile"];

/// One molecule submitted for prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoleculeRecord {
    /// 1-based line of the upload the molecule came from (1 for typed input).
    pub row: usize,
    pub smiles: String,
}

impl MoleculeRecord {
    pub fn new(row: usize, smiles: impl Into<String>) -> Self {
        Self {
            row,
            smiles: smiles.into(),
        }
    }
}

/// Pick the molecules to predict.
///
/// Typed text wins over an upload when both are present; whitespace-only text
/// counts as absent. Fails with [`InputError::NoInput`] when there is nothing to do.
pub fn resolve_input(
    text: Option<&str>,
    upload: Option<&[u8]>,
    max_rows: usize,
) -> Result<Vec<MoleculeRecord>, InputError> {
    let records = match (text.map(str::trim).filter(|t| !t.is_empty()), upload) {
        (Some(smiles), _) => {
            if upload.is_some() {
                debug!("Both a SMILES string and an upload were given; using the SMILES string");
            }
            vec![MoleculeRecord::new(1, smiles)]
        }
        (None, Some(bytes)) => parse_upload(bytes)?,
        (None, None) => return Err(InputError::NoInput),
    };

    if records.len() > max_rows {
        return Err(InputError::BatchTooLarge {
            rows: records.len(),
            limit: max_rows,
        });
    }
    Ok(records)
}

/// Maps record offsets to 1-based line numbers, scanning forward only.
struct LineCounter<'a> {
    bytes: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            line: 1,
        }
    }

    /// Line of the record csv reports at `offset`. Offsets must not decrease
    /// between calls.
    fn line_at(&mut self, offset: usize) -> usize {
        // The offset may point at line terminators csv skipped before the record.
        let mut end = offset.min(self.bytes.len());
        while matches!(self.bytes.get(end), Some(b'\r' | b'\n')) {
            end += 1;
        }
        while self.offset < end {
            match self.bytes[self.offset] {
                b'\n' => self.line += 1,
                // A bare carriage return also ends a line.
                b'\r' if self.bytes.get(self.offset + 1) != Some(&b'\n') => self.line += 1,
                _ => {}
            }
            self.offset += 1;
        }
        self.line
    }
}

/// Parse an uploaded file: tab-delimited, no header, a single column of SMILES.
///
/// Blank lines are skipped. A trailing empty column (a stray tab) is tolerated,
/// a second populated column is not.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<MoleculeRecord>, InputError> {
    if std::str::from_utf8(bytes).is_err() {
        return Err(InputError::MalformedUpload);
    }

    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(bytes);

    let mut records = Vec::new();
    let mut lines = LineCounter::new(bytes);
    for result in rdr.records() {
        let record: StringRecord = result.map_err(|e| {
            warn!("Failed to read uploaded file: {e}");
            InputError::MalformedUpload
        })?;
        // csv's own line count skips blank lines, so count from the byte offset.
        let line = match record.position() {
            Some(position) => lines.line_at(position.byte() as usize),
            None => records.len() + 1,
        };

        let fields: Vec<&str> = record.iter().filter(|field| !field.is_empty()).collect();
        let smiles = match fields.as_slice() {
            [] => continue,
            [smiles] => *smiles,
            _ => {
                return Err(InputError::TooManyColumns {
                    line,
                    columns: fields.len(),
                })
            }
        };

        if records.is_empty() && HEADER_NAMES.contains(&smiles.to_ascii_lowercase().as_str()) {
            return Err(InputError::UnexpectedHeader(smiles.to_owned()));
        }
        records.push(MoleculeRecord::new(line, smiles));
    }

    if records.is_empty() {
        return Err(InputError::EmptyUpload);
    }
    info!("Read {} SMILES strings from upload", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_wins_over_upload() {
        let records = resolve_input(Some(" CCO "), Some(b"c1ccccc1\n"), 10).unwrap();
        assert_eq!(records, vec![MoleculeRecord::new(1, "CCO")]);
    }

    #[test]
    fn test_blank_text_falls_back_to_upload() {
        let records = resolve_input(Some("   "), Some(b"c1ccccc1\nCCN\n"), 10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], MoleculeRecord::new(2, "CCN"));
    }

    #[test]
    fn test_no_input() {
        assert_eq!(resolve_input(None, None, 10), Err(InputError::NoInput));
        assert_eq!(resolve_input(Some(""), None, 10), Err(InputError::NoInput));
    }

    #[test]
    fn test_upload_rows_keep_their_lines() {
        let upload = b"CCO\n\ninvalid_garbage\r\nc1ccccc1\t\n";
        let records = parse_upload(upload).unwrap();
        assert_eq!(
            records,
            vec![
                MoleculeRecord::new(1, "CCO"),
                MoleculeRecord::new(3, "invalid_garbage"),
                MoleculeRecord::new(4, "c1ccccc1"),
            ]
        );
    }

    #[test]
    fn test_blank_lines_do_not_shift_rows() {
        let upload = b"\n\nCCO\r\n\r\nCCN\n\n\nCCC\tmol-3\n";
        assert_eq!(
            parse_upload(upload),
            Err(InputError::TooManyColumns { line: 8, columns: 2 })
        );
        let records = parse_upload(b"\n\nCCO\r\n\r\nCCN\n").unwrap();
        let rows: Vec<usize> = records.iter().map(|record| record.row).collect();
        assert_eq!(rows, vec![3, 5]);
    }

    #[test]
    fn test_upload_validation() {
        assert_eq!(
            parse_upload(b"CCO\nCCN\tmol-2\n"),
            Err(InputError::TooManyColumns { line: 2, columns: 2 })
        );
        assert_eq!(
            parse_upload(b"canonical_smiles\nCCO\n"),
            Err(InputError::UnexpectedHeader("canonical_smiles".to_string()))
        );
        assert_eq!(parse_upload(b"\n  \n"), Err(InputError::EmptyUpload));
        assert_eq!(parse_upload(&[0x43, 0xff, 0x0a]), Err(InputError::MalformedUpload));
    }

    #[test]
    fn test_batch_limit() {
        let upload = b"C\nCC\nCCC\n";
        assert_eq!(
            resolve_input(None, Some(upload), 2),
            Err(InputError::BatchTooLarge { rows: 3, limit: 2 })
        );
        assert_eq!(resolve_input(None, Some(upload), 3).unwrap().len(), 3);
    }
}
