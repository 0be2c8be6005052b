//! Tab separated reference tables and count tables.

use ndarray::{Array2, ArrayView2};
use npyz::WriterBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::errors::{AsesimError, Result};

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|_| AsesimError::MissingInput(path.display().to_string()))
}

fn tsv_reader<R: Read>(reader: R, has_headers: bool) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_headers)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader)
}

/// Read transcript identifiers from the first column. Row order defines the index.
pub fn read_transcripts(path: &Path) -> Result<Vec<String>> {
    transcripts_from_reader(open(path)?)
}

pub fn transcripts_from_reader<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut transcripts = Vec::new();
    for record in tsv_reader(reader, false).records() {
        let record = record?;
        match record.get(0) {
            Some(transcript) if !transcript.is_empty() => transcripts.push(transcript.to_string()),
            _ => continue,
        }
    }
    Ok(transcripts)
}

/// Read gene groups: gene identifier followed by its member transcripts.
pub fn read_groups(path: &Path) -> Result<Vec<(String, Vec<String>)>> {
    groups_from_reader(open(path)?)
}

pub fn groups_from_reader<R: Read>(reader: R) -> Result<Vec<(String, Vec<String>)>> {
    let mut groups = Vec::new();
    for record in tsv_reader(reader, false).records() {
        let record = record?;
        let mut fields = record.iter().filter(|field| !field.is_empty());
        if let Some(gene) = fields.next() {
            groups.push((gene.to_string(), fields.map(str::to_string).collect()));
        }
    }
    Ok(groups)
}

/// Read sequence lengths keyed by `<transcript>_<haplotype>`.
pub fn read_lengths(path: &Path) -> Result<HashMap<String, usize>> {
    lengths_from_reader(open(path)?)
}

pub fn lengths_from_reader<R: Read>(reader: R) -> Result<HashMap<String, usize>> {
    let mut lengths = HashMap::new();
    for record in tsv_reader(reader, false).records() {
        let record = record?;
        match (record.get(0), record.get(1)) {
            (Some(name), Some(length)) => {
                let length = length.trim().parse::<usize>().map_err(|_| {
                    AsesimError::ReadError(format!("Invalid length {length} for {name}"))
                })?;
                lengths.insert(name.to_string(), length);
            }
            _ => {
                return Err(AsesimError::ReadError(format!(
                    "Length record at line {} has less than two fields",
                    record.position().map_or(0, |p| p.line())
                )));
            }
        }
    }
    Ok(lengths)
}

/// Name of a sequence in the pooled transcriptome.
pub fn sequence_name(transcript: &str, haplotype: &str) -> String {
    format!("{transcript}_{haplotype}")
}

/// Number of valid read start positions per transcript and haplotype.
///
/// Missing lengths count as zero, so that no read can be drawn from them.
pub fn sampling_windows(
    lengths: &HashMap<String, usize>,
    transcripts: &[String],
    haplotypes: &[String],
    read_length: usize,
) -> Array2<i64> {
    let mut missing = 0;
    let windows = Array2::from_shape_fn((transcripts.len(), haplotypes.len()), |(t, h)| {
        match lengths.get(&sequence_name(&transcripts[t], &haplotypes[h])) {
            Some(&length) => length as i64 - read_length as i64 + 1,
            None => {
                missing += 1;
                0
            }
        }
    });
    if missing > 0 {
        log::warn!("No length available for {missing} transcript haplotype pairs.");
    }
    windows
}

/// Expected read counts per transcript (rows) and haplotype (columns).
#[derive(Clone, Debug, PartialEq)]
pub struct ExpectedCounts {
    pub transcripts: Vec<String>,
    pub haplotypes: Vec<String>,
    pub counts: Array2<f64>,
}

impl ExpectedCounts {
    pub fn read(path: &Path) -> Result<Self> {
        Self::from_reader(open(path)?)
    }

    /// Parse a parameter table.
    ///
    /// The header holds an ignored locus column, the haplotype names and an
    /// optional trailing column that is ignored as well. Every row holds a
    /// transcript and one count per haplotype; anything after that is ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = tsv_reader(reader, true);
        let header = reader.headers()?.clone();
        let columns: Vec<&str> = header.iter().skip(1).collect();
        let haplotypes: Vec<String> = match columns.split_last() {
            Some((_, haplotypes)) if columns.len() > 1 => {
                haplotypes.iter().map(|h| h.to_string()).collect()
            }
            _ => columns.iter().map(|h| h.to_string()).collect(),
        };
        if haplotypes.is_empty() {
            return Err(AsesimError::ReadError(
                "Parameter header does not name any haplotype".to_string(),
            ));
        }

        let mut transcripts = Vec::new();
        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            let transcript = match record.get(0) {
                Some(transcript) if !transcript.is_empty() => transcript,
                _ => continue,
            };
            if record.len() <= haplotypes.len() {
                return Err(AsesimError::ReadError(format!(
                    "Expected {} counts for {transcript}, found {}",
                    haplotypes.len(),
                    record.len() - 1
                )));
            }
            for field in record.iter().skip(1).take(haplotypes.len()) {
                let value = field.trim().parse::<f64>().map_err(|_| {
                    AsesimError::ReadError(format!("Invalid count {field} for {transcript}"))
                })?;
                if !value.is_finite() || value < 0. {
                    return Err(AsesimError::ReadError(format!(
                        "Expected count {value} for {transcript} is not a non-negative number"
                    )));
                }
                values.push(value);
            }
            transcripts.push(transcript.to_string());
        }

        let counts = Array2::from_shape_vec((transcripts.len(), haplotypes.len()), values)
            .map_err(|err| AsesimError::ReadError(format!("{err}")))?;
        Ok(Self {
            transcripts,
            haplotypes,
            counts,
        })
    }

    /// Reorder rows to follow `transcripts`. Absent transcripts get zero counts.
    pub fn align(&self, transcripts: &[String]) -> Result<Array2<f64>> {
        let index: HashMap<&str, usize> = transcripts
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let mut aligned = Array2::<f64>::zeros((transcripts.len(), self.haplotypes.len()));
        let mut seen = vec![false; transcripts.len()];
        for (row, transcript) in self.transcripts.iter().enumerate() {
            let &target = index.get(transcript.as_str()).ok_or_else(|| {
                AsesimError::ReadError(format!("Unknown transcript {transcript} in parameters"))
            })?;
            if seen[target] {
                return Err(AsesimError::ReadError(format!(
                    "Transcript {transcript} is listed more than once in parameters"
                )));
            }
            seen[target] = true;
            aligned.row_mut(target).assign(&self.counts.row(row));
        }

        let absent = seen.iter().filter(|&&present| !present).count();
        if absent > 0 {
            log::info!("{absent} transcripts without parameters are not expressed.");
        }
        Ok(aligned)
    }
}

/// Write a count table with header `ID` followed by the haplotype names.
pub fn write_count_table<W: Write>(
    writer: W,
    ids: &[String],
    haplotypes: &[String],
    counts: ArrayView2<u64>,
) -> Result<()> {
    if ids.len() != counts.nrows() {
        return Err(AsesimError::DimensionMismatch {
            expected: ids.len(),
            found: counts.nrows(),
        });
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    let header = std::iter::once("ID").chain(haplotypes.iter().map(String::as_str));
    writer
        .write_record(header)
        .map_err(|err| AsesimError::IoError(err.into()))?;
    for (id, row) in ids.iter().zip(counts.rows()) {
        let record = std::iter::once(id.clone()).chain(row.iter().map(|c| c.to_string()));
        writer
            .write_record(record)
            .map_err(|err| AsesimError::IoError(err.into()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a count matrix as `.npy` array.
pub fn write_count_matrix_npy<W: Write>(writer: W, counts: ArrayView2<u64>) -> Result<()> {
    let shape = &[counts.nrows() as u64, counts.ncols() as u64];
    let mut npy_writer = npyz::WriteOptions::new()
        .default_dtype()
        .shape(shape)
        .writer(writer)
        .begin_nd()?;
    npy_writer.extend(counts.iter().copied())?;
    npy_writer.finish()?;
    Ok(())
}
