// CSV/TSV import/export

use std::io::{Read, Write};
use std::path::Path;

use log::debug;

use crate::cell::Cell;
use crate::dataset::{Dataset, Record};
use crate::error::IoError;

/// Load a delimited file; the first line holds the headers
pub fn import(path: &Path) -> Result<Dataset, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    debug!("csv: {} delimiter {:?}", path.display(), delimiter as char);
    parse(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = match counts.first() {
            Some(&n) if n > 1 => n,
            _ => continue,
        };

        // Lines agreeing with the header width, weighted by width
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |source| IoError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            debug!("csv: {} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Parse delimited text. Short rows are padded with blanks; extra fields get
/// generated headers.
pub fn parse(content: &str, delimiter: u8) -> Result<Dataset, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let mut headers: Vec<String> = match records.next() {
        Some(header) => header?
            .iter()
            .enumerate()
            .map(|(i, h)| header_name(h, i))
            .collect(),
        None => return Ok(Dataset::default()),
    };

    let mut rows = Vec::new();
    for (id, result) in records.enumerate() {
        let record = result?;
        let cells: Vec<Cell> = record.iter().map(Cell::parse).collect();
        while headers.len() < cells.len() {
            let i = headers.len();
            headers.push(header_name("", i));
        }
        rows.push(Record::new(id, cells));
    }

    for row in &mut rows {
        row.cells.resize(headers.len(), Cell::Blank);
    }

    Ok(Dataset::new(headers, rows))
}

/// Write headers and rows as CSV
pub fn write<W: Write>(headers: &[String], rows: &[Record], out: W) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.cells.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn header_name(raw: &str, index: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("column{}", index + 1)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
        assert_eq!(sniff_delimiter("a,b\n1,2\n"), b',');
        assert_eq!(sniff_delimiter("single\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_parse_pads_and_extends() {
        let data = parse("name,power\nBatman,50\nRobin\nAlfred,1,extra\n", b',').unwrap();
        assert_eq!(data.headers, vec!["name", "power", "column3"]);
        assert_eq!(data.rows.len(), 3);
        assert_eq!(data.rows[1].cells, vec![Cell::Text("Robin".into()), Cell::Blank, Cell::Blank]);
        assert_eq!(data.rows[2].cell(2), &Cell::Text("extra".into()));
        assert_eq!(data.rows[2].id, 2);
    }

    #[test]
    fn test_import_windows_1252() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "café" with 0xE9
        fs::write(&path, b"name;n\ncaf\xe9;1\n").unwrap();

        let data = import(&path).unwrap();
        assert_eq!(data.rows[0].cell(0), &Cell::Text("café".into()));
        assert_eq!(data.rows[0].cell(1), &Cell::Number(1.0));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = import(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }

    #[test]
    fn test_write() {
        let data = parse("a,b\n1,x\n,TRUE\n", b',').unwrap();
        let mut out = Vec::new();
        write(&data.headers, &data.rows, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n1,x\n,TRUE\n");
    }
}
