//! Access to the pooled haplotype transcriptome.
//!
//! Sequences are addressed by their FASTA header, `<transcript>_<haplotype>`
//! for the pooled transcriptome. `IndexedFasta` reads windows directly from
//! disk using a samtools style `.fai` index, `InMemoryFasta` keeps all
//! sequences in memory.

use bio::io::fasta::IndexedReader;
use seq_io::fasta;
use seq_io::fasta::Record;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use crate::encoding::normalize_sequence;
use crate::errors::{AsesimError, Result};

pub trait SequenceStore {
    /// Fetch the upper-cased window `[start, end)` of sequence `name`.
    fn fetch(&mut self, name: &str, start: usize, end: usize) -> Result<Vec<u8>>;

    /// Length of sequence `name`, if present.
    fn length(&self, name: &str) -> Option<usize>;
}

fn check_window(name: &str, start: usize, end: usize, length: usize) -> Result<()> {
    if start > end || end > length {
        return Err(AsesimError::SequenceError(format!(
            "Window {start}..{end} is outside of {name} with length {length}"
        )));
    }
    Ok(())
}

pub struct IndexedFasta<R: Read + Seek> {
    reader: IndexedReader<R>,
    lengths: HashMap<String, usize>,
}

impl IndexedFasta<File> {
    /// Open `path` together with its index at `<path>.fai`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let index_path = Self::index_path(path);
        let file = File::open(path)
            .map_err(|_| AsesimError::MissingInput(path.display().to_string()))?;
        let index_file = File::open(&index_path)
            .map_err(|_| AsesimError::MissingInput(index_path.display().to_string()))?;
        let store = Self::new(file, index_file)?;
        log::info!(
            "Loaded index of {} sequences from {}",
            store.lengths.len(),
            index_path.display()
        );
        Ok(store)
    }

    pub fn index_path(path: &Path) -> PathBuf {
        let mut index_path = path.as_os_str().to_owned();
        index_path.push(".fai");
        PathBuf::from(index_path)
    }
}

impl<R: Read + Seek> IndexedFasta<R> {
    pub fn new<I: Read>(fasta: R, index: I) -> Result<Self> {
        let reader = IndexedReader::new(fasta, index)
            .map_err(|err| AsesimError::ReadError(format!("Invalid FASTA index: {err}")))?;
        let lengths = reader
            .index
            .sequences()
            .into_iter()
            .map(|sequence| (sequence.name, sequence.len as usize))
            .collect();
        Ok(Self { reader, lengths })
    }
}

impl<R: Read + Seek> SequenceStore for IndexedFasta<R> {
    fn fetch(&mut self, name: &str, start: usize, end: usize) -> Result<Vec<u8>> {
        let length = self
            .length(name)
            .ok_or_else(|| AsesimError::SequenceError(format!("Unknown sequence {name}")))?;
        check_window(name, start, end, length)?;
        if start == end {
            return Ok(Vec::new());
        }

        let mut sequence = Vec::with_capacity(end - start);
        self.reader
            .fetch(name, start as u64, end as u64)
            .and_then(|()| self.reader.read(&mut sequence))
            .map_err(|err| {
                AsesimError::SequenceError(format!("Unable to read {name} at {start}..{end}: {err}"))
            })?;

        let sequence = normalize_sequence(&sequence);
        if sequence.len() != end - start {
            return Err(AsesimError::SequenceError(format!(
                "Index does not match sequence {name} at {start}..{end}"
            )));
        }
        Ok(sequence)
    }

    fn length(&self, name: &str) -> Option<usize> {
        self.lengths.get(name).copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryFasta {
    sequences: HashMap<String, Vec<u8>>,
}

impl InMemoryFasta {
    pub fn new(sequences: HashMap<String, Vec<u8>>) -> Self {
        let sequences = sequences
            .into_iter()
            .map(|(name, sequence)| (name, normalize_sequence(&sequence)))
            .collect();
        Self { sequences }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|_| AsesimError::MissingInput(path.display().to_string()))?;
        let store = Self::from_reader(file)?;
        log::info!(
            "Loaded {} sequences from {}",
            store.sequences.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = fasta::Reader::new(reader);
        let mut sequences = HashMap::new();
        while let Some(record) = reader.next() {
            let record = record.map_err(|err| AsesimError::ReadError(format!("{err}")))?;
            let name = record
                .id()
                .map_err(|err| AsesimError::ReadError(format!("{err}")))?
                .to_string();
            sequences.insert(name, normalize_sequence(record.seq()));
        }
        Ok(Self { sequences })
    }
}

impl SequenceStore for InMemoryFasta {
    fn fetch(&mut self, name: &str, start: usize, end: usize) -> Result<Vec<u8>> {
        let sequence = self
            .sequences
            .get(name)
            .ok_or_else(|| AsesimError::SequenceError(format!("Unknown sequence {name}")))?;
        check_window(name, start, end, sequence.len())?;
        Ok(sequence[start..end].to_vec())
    }

    fn length(&self, name: &str) -> Option<usize> {
        self.sequences.get(name).map(|sequence| sequence.len())
    }
}

/// Open the pooled transcriptome, through its index if one exists.
pub fn open_sequence_store(path: &Path) -> Result<Box<dyn SequenceStore>> {
    if !path.exists() {
        return Err(AsesimError::MissingInput(path.display().to_string()));
    }
    let index_path = IndexedFasta::index_path(path);
    if index_path.exists() {
        Ok(Box::new(IndexedFasta::from_path(path)?))
    } else {
        log::warn!(
            "No index at {}, loading all sequences into memory.",
            index_path.display()
        );
        Ok(Box::new(InMemoryFasta::from_path(path)?))
    }
}
