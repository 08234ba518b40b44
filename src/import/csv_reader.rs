//! Minimal RFC 4180 reader for the archive export files.
//!
//! Fields may be quoted; quoted fields can hold separators, doubled quotes
//! and line breaks. A UTF-8 byte order mark before the header is dropped.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const BOM: char = '\u{feff}';

/// Streams records out of a CSV source, one `Vec<String>` per record.
pub struct CsvRecords<R: BufRead> {
    reader: R,
    line_number: usize,
    finished: bool,
}

impl<R: BufRead> CsvRecords<R> {
    pub fn new(reader: R) -> Self {
        CsvRecords {
            reader,
            line_number: 0,
            finished: false,
        }
    }

    /// Line on which the last returned record ended.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn read_line(&mut self, buf: &mut String) -> Result<bool> {
        let read = self.reader.read_line(buf)?;
        if read == 0 {
            return Ok(false);
        }
        if self.line_number == 0 && buf.starts_with(BOM) {
            buf.replace_range(..BOM.len_utf8(), "");
        }
        self.line_number += 1;
        Ok(true)
    }

    fn next_record(&mut self) -> Result<Option<Vec<String>>> {
        let mut line = String::new();
        loop {
            line.clear();
            if !self.read_line(&mut line)? {
                return Ok(None);
            }
            if !line.trim_end_matches(['\r', '\n']).is_empty() {
                break;
            }
        }

        let start_line = self.line_number;
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut field_was_quoted = false;

        loop {
            let mut chars = line.chars().peekable();
            while let Some(c) = chars.next() {
                if in_quotes {
                    if c == '"' {
                        if chars.peek() == Some(&'"') {
                            chars.next();
                            field.push('"');
                        } else {
                            in_quotes = false;
                        }
                    } else {
                        field.push(c);
                    }
                    continue;
                }
                match c {
                    '"' if field.is_empty() && !field_was_quoted => {
                        in_quotes = true;
                        field_was_quoted = true;
                    }
                    ',' => {
                        fields.push(std::mem::take(&mut field));
                        field_was_quoted = false;
                    }
                    '\r' if chars.peek() == Some(&'\n') => {}
                    '\n' => {}
                    other => field.push(other),
                }
            }

            if !in_quotes {
                break;
            }
            line.clear();
            if !self.read_line(&mut line)? {
                bail!("Unterminated quoted field starting on line {}", start_line);
            }
        }

        fields.push(field);
        Ok(Some(fields))
    }
}

impl<R: BufRead> Iterator for CsvRecords<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// A data row addressed by header name.
#[derive(Debug)]
pub struct CsvRow<'a> {
    columns: &'a HashMap<String, usize>,
    values: Vec<String>,
    pub line_number: usize,
}

impl CsvRow<'_> {
    /// Trimmed value of `column`; None when the column is missing or blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|index| self.values.get(*index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(|value| value.parse().ok())
    }
}

/// A CSV file whose first record names the columns.
pub struct CsvTable<R: BufRead> {
    columns: HashMap<String, usize>,
    records: CsvRecords<R>,
}

impl CsvTable<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("File not found: {:?}", path))?;
        CsvTable::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read header of {:?}", path))
    }
}

impl<R: BufRead> CsvTable<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut records = CsvRecords::new(reader);
        let header = records.next().context("Missing header row")??;
        let columns = header
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect();
        Ok(CsvTable { columns, records })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Reads the next data row.
    pub fn next_row(&mut self) -> Option<Result<CsvRow<'_>>> {
        let values = match self.records.next()? {
            Ok(values) => values,
            Err(err) => return Some(Err(err)),
        };
        Some(Ok(CsvRow {
            columns: &self.columns,
            values,
            line_number: self.records.line_number(),
        }))
    }
}
