//! Generation of FASTA reads from simulated counts.

use indicatif::ProgressBar;
use itertools::Itertools;
use ndarray::ArrayView2;
use rand::prelude::*;
use seq_io::fasta::{OwnedRecord, Record};
use std::io::Write;

use super::sequences::SequenceStore;
use super::tables::sequence_name;
use crate::core::mutation::{MutationEngine, Substitution};
use crate::errors::{AsesimError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadIdFormat {
    /// `r<id>`
    Short,
    /// `r<id>|<transcript>|<haplotype>|<start>-<end>|<mutations>`
    Long,
}

/// Origin of a simulated read, 1-based inclusive coordinates.
#[derive(Clone, Debug)]
struct ReadOrigin<'a> {
    transcript: &'a str,
    haplotype: &'a str,
    start: usize,
    end: usize,
}

pub struct ReadEmitter {
    read_length: usize,
    mutation_engine: MutationEngine,
    id_format: ReadIdFormat,
    id_width: usize,
}

impl ReadEmitter {
    /// Read identifiers are padded to the number of digits in `total_reads`.
    pub fn new(
        read_length: usize,
        mutation_engine: MutationEngine,
        id_format: ReadIdFormat,
        total_reads: u64,
    ) -> Result<Self> {
        if read_length == 0 {
            return Err(AsesimError::InvalidParameter(
                "Read length must be positive".to_string(),
            ));
        }
        Ok(Self {
            read_length,
            mutation_engine,
            id_format,
            id_width: total_reads.to_string().len(),
        })
    }

    fn head(&self, id: u64, origin: &ReadOrigin, substitutions: &[Substitution]) -> String {
        match self.id_format {
            ReadIdFormat::Short => format!("r{id:0width$}", width = self.id_width),
            ReadIdFormat::Long => format!(
                "r{id:0width$}|{}|{}|{}-{}|{}",
                origin.transcript,
                origin.haplotype,
                origin.start,
                origin.end,
                substitutions.iter().join(";"),
                width = self.id_width
            ),
        }
    }

    /// Write `counts[t, h]` reads for every transcript and haplotype.
    ///
    /// Pairs without a valid sampling window are skipped. Returns the number
    /// of reads written.
    #[allow(clippy::too_many_arguments)]
    pub fn emit<R: Rng + ?Sized>(
        &self,
        counts: ArrayView2<u64>,
        windows: ArrayView2<i64>,
        transcripts: &[String],
        haplotypes: &[String],
        store: &mut dyn SequenceStore,
        writer: &mut dyn Write,
        rng: &mut R,
        progress: Option<&ProgressBar>,
    ) -> Result<u64> {
        if counts.dim() != windows.dim() {
            return Err(AsesimError::DimensionMismatch {
                expected: windows.nrows(),
                found: counts.nrows(),
            });
        }
        if counts.dim() != (transcripts.len(), haplotypes.len()) {
            return Err(AsesimError::DimensionMismatch {
                expected: transcripts.len(),
                found: counts.nrows(),
            });
        }

        let mut read_id: u64 = 0;
        for ((t, h), &n_reads) in counts.indexed_iter() {
            if n_reads == 0 {
                continue;
            }
            let window = windows[[t, h]];
            if window <= 0 {
                log::warn!(
                    "Skipping {n_reads} reads of {} shorter than the read length.",
                    sequence_name(&transcripts[t], &haplotypes[h])
                );
                continue;
            }

            let name = sequence_name(&transcripts[t], &haplotypes[h]);
            for _ in 0..n_reads {
                let start = rng.random_range(0..window as usize);
                let end = start + self.read_length;
                let sequence = store.fetch(&name, start, end)?;
                let (sequence, substitutions) = self.mutation_engine.mutate(&sequence, rng);

                read_id += 1;
                let origin = ReadOrigin {
                    transcript: &transcripts[t],
                    haplotype: &haplotypes[h],
                    start: start + 1,
                    end,
                };
                let record = OwnedRecord {
                    head: self.head(read_id, &origin, &substitutions).into_bytes(),
                    seq: sequence,
                };
                record.write(&mut *writer)?;

                if let Some(bar) = progress {
                    bar.inc(1);
                }
            }
        }
        log::info!("Wrote {read_id} reads.");
        Ok(read_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readwrite::sequences::InMemoryFasta;
    use ndarray::array;
    use rand::rngs::StdRng;
    use seq_io::fasta;
    use std::collections::HashMap;

    fn store() -> InMemoryFasta {
        let mut sequences = HashMap::new();
        sequences.insert("t0_A".to_string(), b"ACGTACGTACGT".to_vec());
        sequences.insert("t0_B".to_string(), b"TTTTGGGGCCCC".to_vec());
        sequences.insert("t1_A".to_string(), b"ACG".to_vec());
        sequences.insert("t1_B".to_string(), b"ACGTA".to_vec());
        InMemoryFasta::new(sequences)
    }

    fn names() -> (Vec<String>, Vec<String>) {
        (
            vec!["t0".to_string(), "t1".to_string()],
            vec!["A".to_string(), "B".to_string()],
        )
    }

    fn parse(buffer: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut reader = fasta::Reader::new(buffer);
        let mut records = Vec::new();
        while let Some(record) = reader.next() {
            let record = record.unwrap();
            records.push((
                String::from_utf8(record.head().to_vec()).unwrap(),
                record.seq().to_vec(),
            ));
        }
        records
    }

    #[test]
    fn short_ids_and_window_skip() {
        let (transcripts, haplotypes) = names();
        let counts: ndarray::Array2<u64> = array![[3, 2], [4, 1]];
        let windows: ndarray::Array2<i64> = array![[8, 8], [-1, 1]];
        let emitter =
            ReadEmitter::new(5, MutationEngine::new(0.).unwrap(), ReadIdFormat::Short, 10)
                .unwrap();

        let mut buffer = Vec::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut store = store();
        let written = emitter
            .emit(
                counts.view(),
                windows.view(),
                &transcripts,
                &haplotypes,
                &mut store,
                &mut buffer,
                &mut rng,
                None,
            )
            .unwrap();

        // t1_A is shorter than the read length
        assert_eq!(written, 6);
        let records = parse(&buffer);
        let heads: Vec<&str> = records.iter().map(|(head, _)| head.as_str()).collect();
        assert_eq!(heads, vec!["r01", "r02", "r03", "r04", "r05", "r06"]);
        for (_, seq) in &records {
            assert_eq!(seq.len(), 5);
        }
        // the last read covers all of t1_B
        assert_eq!(records[5].1, b"ACGTA".to_vec());
    }

    #[test]
    fn long_ids() {
        let (transcripts, haplotypes) = names();
        let counts: ndarray::Array2<u64> = array![[0, 20], [0, 0]];
        let windows: ndarray::Array2<i64> = array![[8, 8], [-1, 1]];
        let emitter =
            ReadEmitter::new(5, MutationEngine::new(2.).unwrap(), ReadIdFormat::Long, 1000)
                .unwrap();

        let mut buffer = Vec::new();
        let mut rng = StdRng::seed_from_u64(21);
        let mut store = store();
        emitter
            .emit(
                counts.view(),
                windows.view(),
                &transcripts,
                &haplotypes,
                &mut store,
                &mut buffer,
                &mut rng,
                None,
            )
            .unwrap();

        let reference = b"TTTTGGGGCCCC";
        let records = parse(&buffer);
        assert_eq!(records.len(), 20);
        for (idx, (head, seq)) in records.iter().enumerate() {
            let fields: Vec<&str> = head.split('|').collect();
            assert_eq!(fields.len(), 5);
            assert_eq!(fields[0], format!("r{:04}", idx + 1));
            assert_eq!(fields[1], "t0");
            assert_eq!(fields[2], "B");

            let (start, end) = fields[3].split_once('-').unwrap();
            let start: usize = start.parse().unwrap();
            let end: usize = end.parse().unwrap();
            assert!(start >= 1 && end <= reference.len());
            assert_eq!(end - start + 1, 5);

            let source = &reference[start - 1..end];
            let differing: Vec<usize> = (0..5).filter(|&i| seq[i] != source[i]).collect();
            let annotated: Vec<usize> = fields[4]
                .split(';')
                .filter(|m| !m.is_empty())
                .map(|m| m[1..m.find(']').unwrap()].parse().unwrap())
                .collect();
            assert_eq!(differing, annotated);
        }
    }

    #[test]
    fn dimension_mismatch() {
        let (transcripts, haplotypes) = names();
        let counts: ndarray::Array2<u64> = array![[1, 1]];
        let windows: ndarray::Array2<i64> = array![[8, 8], [1, 1]];
        let emitter =
            ReadEmitter::new(5, MutationEngine::new(0.).unwrap(), ReadIdFormat::Short, 2)
                .unwrap();
        let mut buffer = Vec::new();
        let result = emitter.emit(
            counts.view(),
            windows.view(),
            &transcripts,
            &haplotypes,
            &mut store(),
            &mut buffer,
            &mut StdRng::seed_from_u64(0),
            None,
        );
        assert!(matches!(result, Err(AsesimError::DimensionMismatch { .. })));
        assert!(buffer.is_empty());
    }

    #[test]
    fn zero_read_length() {
        assert!(
            ReadEmitter::new(0, MutationEngine::new(0.).unwrap(), ReadIdFormat::Short, 2).is_err()
        );
    }
}
