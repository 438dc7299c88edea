// crates/arbor-dataset/src/lib.rs

//! Tabular datasets behind the `#` header.
//!
//! Both bodies share the header line `# [format] <n_rows> <n_cols>`; a
//! two-field header implies CSV. Format 0 (CSV) stores `label,x1,…,xn` per
//! row; format 1 (binary) stores a fixed 32-byte NUL-padded label followed
//! by `n_cols` little-endian `f64` values per row. Labels are bounded at
//! 32 bytes in both formats.
//!
//! Features are kept row-major in one allocation; rows are borrowed slices.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Fixed label field width of the binary body, and the CSV label bound.
pub const LABEL_WIDTH: usize = 32;

/// On-disk body layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetFormat {
    /// `label,x1,…,xn` text rows.
    Csv,
    /// Fixed-width label + little-endian `f64` rows.
    Binary,
}

/// Labeled samples with a shared feature dimension.
#[derive(Clone, Debug)]
pub struct Dataset {
    labels: Vec<String>,
    data: Vec<f64>,
    n_cols: usize,
}

impl Dataset {
    /// Dataset from parallel labels and row-major feature data.
    ///
    /// # Errors
    /// Fails when the data length is not `labels.len() * n_cols` or a label
    /// exceeds [`LABEL_WIDTH`] bytes.
    pub fn new(labels: Vec<String>, data: Vec<f64>, n_cols: usize) -> Result<Self> {
        if data.len() != labels.len() * n_cols {
            bail!(
                "{} feature values do not fill {} rows of {} columns",
                data.len(),
                labels.len(),
                n_cols
            );
        }
        for (i, label) in labels.iter().enumerate() {
            if label.len() > LABEL_WIDTH {
                bail!("label of row {i} exceeds {LABEL_WIDTH} bytes");
            }
        }
        Ok(Self {
            labels,
            data,
            n_cols,
        })
    }

    /// Number of samples.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset has no samples.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature-space dimension.
    #[inline]
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Feature row `i`.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Ground-truth label of row `i`.
    #[inline]
    #[must_use]
    pub fn label(&self, i: usize) -> &str {
        &self.labels[i]
    }
}

/// Header fields: format, row count, column count.
fn parse_header(line: &str) -> Result<(DatasetFormat, usize, usize)> {
    let mut fields = line.split_whitespace();
    if fields.next() != Some("#") {
        bail!("dataset header must start with '#'");
    }
    let nums: Vec<usize> = fields
        .map(|t| t.parse().with_context(|| format!("header field {t:?}")))
        .collect::<Result<_>>()?;
    match nums.as_slice() {
        // A two-field header predates the format id and means CSV.
        [rows, cols] => Ok((DatasetFormat::Csv, *rows, *cols)),
        [0, rows, cols] => Ok((DatasetFormat::Csv, *rows, *cols)),
        [1, rows, cols] => Ok((DatasetFormat::Binary, *rows, *cols)),
        [other, _, _] => bail!("unknown dataset format id {other}"),
        _ => bail!("dataset header needs 2 or 3 fields, found {}", nums.len()),
    }
}

fn parse_csv(body: &str, n_rows: usize, n_cols: usize) -> Result<Dataset> {
    let mut labels = Vec::with_capacity(n_rows);
    let mut data = Vec::with_capacity(n_rows * n_cols);

    let mut rows = body.lines().filter(|l| !l.trim().is_empty());
    for i in 0..n_rows {
        let line = rows
            .next()
            .with_context(|| format!("row {i}: dataset truncated after {i} rows"))?;
        let mut fields = line.split(',');
        let label = fields
            .next()
            .with_context(|| format!("row {i}: missing label"))?
            .trim();
        if label.len() > LABEL_WIDTH {
            bail!("row {i}: label exceeds {LABEL_WIDTH} bytes");
        }
        labels.push(label.to_owned());

        let mut n_values = 0;
        for field in fields {
            let value: f64 = field
                .trim()
                .parse()
                .with_context(|| format!("row {i}: invalid value {field:?}"))?;
            data.push(value);
            n_values += 1;
        }
        if n_values != n_cols {
            bail!("row {i}: found {n_values} values, expected {n_cols}");
        }
    }

    Dataset::new(labels, data, n_cols)
}

fn parse_binary(body: &[u8], n_rows: usize, n_cols: usize) -> Result<Dataset> {
    let record = LABEL_WIDTH + n_cols * 8;
    if body.len() < n_rows * record {
        bail!(
            "binary body holds {} bytes, {n_rows} rows of {record} bytes expected",
            body.len()
        );
    }

    let mut labels = Vec::with_capacity(n_rows);
    let mut data = Vec::with_capacity(n_rows * n_cols);
    for i in 0..n_rows {
        let row = &body[i * record..(i + 1) * record];
        let raw = &row[..LABEL_WIDTH];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(LABEL_WIDTH);
        let label = std::str::from_utf8(&raw[..end])
            .with_context(|| format!("row {i}: label is not UTF-8"))?;
        labels.push(label.to_owned());

        for j in 0..n_cols {
            let at = LABEL_WIDTH + j * 8;
            let bytes: [u8; 8] = row[at..at + 8].try_into().expect("8-byte slice");
            data.push(f64::from_le_bytes(bytes));
        }
    }

    Dataset::new(labels, data, n_cols)
}

/// Parse a dataset from raw file bytes.
///
/// # Errors
/// Fails on header mismatches, truncated rows, malformed values, or labels
/// over the width bound.
pub fn parse_dataset(bytes: &[u8]) -> Result<Dataset> {
    let header_end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .context("dataset has no header line")?;
    let header = std::str::from_utf8(&bytes[..header_end]).context("header is not UTF-8")?;
    let (format, n_rows, n_cols) = parse_header(header)?;

    let body = &bytes[header_end + 1..];
    match format {
        DatasetFormat::Csv => {
            let text = std::str::from_utf8(body).context("CSV body is not UTF-8")?;
            parse_csv(text, n_rows, n_cols)
        }
        DatasetFormat::Binary => parse_binary(body, n_rows, n_cols),
    }
}

/// Read and parse a dataset file.
///
/// # Errors
/// Propagates I/O failures and parse errors with the path as context.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("read dataset {}", path.display()))?;
    parse_dataset(&bytes).with_context(|| format!("parse dataset {}", path.display()))
}

/// Serialize a dataset in the requested format.
///
/// # Errors
/// Propagates writer failures.
pub fn write_dataset<W: Write>(w: &mut W, dataset: &Dataset, format: DatasetFormat) -> Result<()> {
    match format {
        DatasetFormat::Csv => {
            writeln!(w, "# 0 {} {}", dataset.len(), dataset.n_cols())?;
            for i in 0..dataset.len() {
                write!(w, "{}", dataset.label(i))?;
                for value in dataset.row(i) {
                    write!(w, ",{value}")?;
                }
                writeln!(w)?;
            }
        }
        DatasetFormat::Binary => {
            writeln!(w, "# 1 {} {}", dataset.len(), dataset.n_cols())?;
            for i in 0..dataset.len() {
                let mut field = [0u8; LABEL_WIDTH];
                let label = dataset.label(i).as_bytes();
                field[..label.len()].copy_from_slice(label);
                w.write_all(&field)?;
                for value in dataset.row(i) {
                    w.write_all(&value.to_le_bytes())?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_explicit_format_id() {
        let text = "# 0 2 3\nsetosa,5.1,3.5,1.4\nversicolor,7.0,3.2,4.7\n";
        let d = parse_dataset(text.as_bytes()).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.n_cols(), 3);
        assert_eq!(d.label(1), "versicolor");
        assert_eq!(d.row(0), &[5.1, 3.5, 1.4]);
    }

    #[test]
    fn csv_with_two_field_header() {
        let text = "# 1 2\nyes,0.25,0.75\n";
        let d = parse_dataset(text.as_bytes()).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.row(0), &[0.25, 0.75]);
    }

    #[test]
    fn binary_round_trips_through_the_writer() {
        let d = Dataset::new(
            vec!["a".to_owned(), "b".to_owned()],
            vec![1.0, -2.5, 0.0, 42.0],
            2,
        )
        .unwrap();

        let mut bytes = Vec::new();
        write_dataset(&mut bytes, &d, DatasetFormat::Binary).unwrap();
        let back = parse_dataset(&bytes).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.label(0), "a");
        assert_eq!(back.row(1), &[0.0, 42.0]);
    }

    #[test]
    fn binary_layout_is_fixed() {
        let mut bytes = b"# 1 1 1\n".to_vec();
        let mut label = [0u8; LABEL_WIDTH];
        label[..2].copy_from_slice(b"ok");
        bytes.extend_from_slice(&label);
        bytes.extend_from_slice(&0.5f64.to_le_bytes());

        let d = parse_dataset(&bytes).unwrap();
        assert_eq!(d.label(0), "ok");
        assert_eq!(d.row(0), &[0.5]);
    }

    #[test]
    fn truncation_and_bad_headers_are_rejected() {
        assert!(parse_dataset(b"# 0 2 2\na,1,2\n").is_err());
        assert!(parse_dataset(b"# 7 1 1\nx,1\n").is_err());
        assert!(parse_dataset(b"no header\n").is_err());
        assert!(parse_dataset(b"# 0 1 2\na,1\n").is_err());
    }

    #[test]
    fn long_labels_are_rejected() {
        let long = "x".repeat(LABEL_WIDTH + 1);
        let text = format!("# 0 1 1\n{long},1.0\n");
        assert!(parse_dataset(text.as_bytes()).is_err());
    }
}
