use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use rand::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::config::Parameters;
use crate::core::{Annotation, MutationEngine, simulate_read_counts};
use crate::errors::AsesimError;
use crate::readwrite::tables::{read_groups, read_lengths, read_transcripts};
use crate::readwrite::{
    ExpectedCounts, ReadEmitter, ReadIdFormat, SequenceStore, open_sequence_store,
    sampling_windows, write_count_matrix_npy, write_count_table,
};

pub const TRANSCRIPTS_FILE: &str = "emase.transcripts.info";
pub const GROUPS_FILE: &str = "emase.gene2transcripts.tsv";
pub const SEQUENCES_FILE: &str = "emase.pooled.transcripts.fa";
pub const LENGTHS_FILE: &str = "emase.pooled.transcripts.info";

/// Paths of the files written for one replicate.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputPaths {
    pub genes: PathBuf,
    pub isoforms: PathBuf,
    pub reads: PathBuf,
    pub npy: PathBuf,
}

impl OutputPaths {
    /// Replicates are only numbered when more than one is simulated.
    pub fn new(outbase: &str, replicate: usize, num_sims: usize) -> Self {
        let base = match num_sims {
            1 => outbase.to_string(),
            _ => format!("{outbase}.{replicate:03}"),
        };
        Self {
            genes: PathBuf::from(format!("{base}.genes.tsv")),
            isoforms: PathBuf::from(format!("{base}.isoforms.tsv")),
            reads: PathBuf::from(format!("{base}.fa")),
            npy: PathBuf::from(format!("{base}.isoforms.npy")),
        }
    }
}

/// Command line flags whose values differ from the loaded settings.
fn overridden_flags(parameters: &Parameters, args: &Args) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if u8::from(parameters.model) != args.model {
        flags.push("--model");
    }
    if parameters.total_reads != args.num_reads {
        flags.push("--num-reads");
    }
    if parameters.num_sims != args.num_sims {
        flags.push("--num-sims");
    }
    if parameters.read_length != args.read_length {
        flags.push("--read-length");
    }
    if parameters.error_rate != args.error_rate {
        flags.push("--error-rate");
    }
    if parameters.long_id != args.long_id {
        flags.push("--long-id");
    }
    if args.seed.is_some() && parameters.seed != args.seed {
        flags.push("--seed");
    }
    flags
}

pub struct Runner {
    args: Args,
    parameters: Parameters,
    annotation: Annotation,
    haplotypes: Vec<String>,
    expected_counts: Array2<f64>,
    windows: Array2<i64>,
    store: Box<dyn SequenceStore>,
    rng: StdRng,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        Self::setup_logger(&args);
        Self::load(args)
    }

    /// Load all inputs. Nothing is written until every input has been read.
    pub fn load(args: Args) -> Result<Runner> {
        let mut parameters = Self::load_parameters(&args)?;

        let reference_dir = Path::new(&args.reference_dir);
        let hybrid_dir = Path::new(&args.hybrid_dir);
        let transcripts_path = reference_dir.join(TRANSCRIPTS_FILE);
        let groups_path = reference_dir.join(GROUPS_FILE);
        let sequences_path = hybrid_dir.join(SEQUENCES_FILE);
        let lengths_path = hybrid_dir.join(LENGTHS_FILE);
        let param_path = PathBuf::from(&args.param_file);
        for path in [
            &transcripts_path,
            &groups_path,
            &sequences_path,
            &lengths_path,
            &param_path,
        ] {
            if !path.exists() {
                return Err(AsesimError::MissingInput(path.display().to_string()).into());
            }
        }

        let transcripts = read_transcripts(&transcripts_path)?;
        log::info!("Loaded {} transcripts.", transcripts.len());
        let groups = read_groups(&groups_path)?;
        log::info!("Loaded {} genes.", groups.len());
        let annotation = Annotation::from_named_groups(transcripts, groups)?;

        let expected = ExpectedCounts::read(&param_path)
            .with_context(|| format!("Unable to load parameters from {}", param_path.display()))?;
        let expected_counts = expected.align(annotation.transcripts())?;
        log::info!(
            "Loaded expected counts for {} transcripts and haplotypes {:?}.",
            expected.transcripts.len(),
            expected.haplotypes
        );

        let lengths = read_lengths(&lengths_path)?;
        let windows = sampling_windows(
            &lengths,
            annotation.transcripts(),
            &expected.haplotypes,
            parameters.read_length,
        );
        let store = open_sequence_store(&sequences_path)?;

        let seed = parameters.seed.unwrap_or_else(|| rand::rng().random());
        parameters.seed = Some(seed);
        log::info!("Using seed {seed}.");

        Ok(Self {
            args,
            parameters,
            annotation,
            haplotypes: expected.haplotypes,
            expected_counts,
            windows,
            store,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn start(&mut self) -> Result<()> {
        self.write_parameters()?;
        for replicate in 1..=self.parameters.num_sims {
            log::info!(
                "Simulating replicate {replicate} of {}...",
                self.parameters.num_sims
            );
            self.run_replicate(replicate)?;
        }
        log::info!("Finished simulation.");
        Ok(())
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level).unwrap_or_else(|_| {
            eprintln!("Unable to open log file.");
            std::process::exit(1);
        });
    }

    /// Load parameters from settings or command line.
    fn load_parameters(args: &Args) -> Result<Parameters> {
        let parameters = match &args.settings {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(AsesimError::MissingInput(path.clone()).into());
                }
                let parameters = Parameters::read_from_file(path)
                    .with_context(|| format!("Unable to load settings from {path}"))?;
                let overridden = overridden_flags(&parameters, args);
                if !overridden.is_empty() {
                    log::warn!(
                        "Settings from {path} override command line values of {}.",
                        overridden.join(", ")
                    );
                }
                parameters
            }
            None => Parameters::try_from(args)?,
        };
        parameters.validate()?;
        log::info!("Loaded parameters\n{}", parameters);
        Ok(parameters)
    }

    fn write_parameters(&self) -> Result<()> {
        let path = format!("{}.settings.yaml", self.args.outbase);
        if let Some(parent) = Path::new(&path).parent() {
            fs::create_dir_all(parent)?;
        }
        self.parameters
            .write_to_file(&path)
            .with_context(|| format!("Unable to write settings to {path}"))?;
        Ok(())
    }

    fn create_progress_bar(&self) -> Option<ProgressBar> {
        if self.args.disable_progress_bar {
            return None;
        }
        let bar = ProgressBar::new(self.parameters.total_reads);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40}] {pos:>10}/{len:10} [{elapsed_precise} / {duration_precise}] {msg}")
                .expect("Unable to create template.")
                .progress_chars("=> "),
        );
        Some(bar)
    }

    fn run_replicate(&mut self, replicate: usize) -> Result<()> {
        let paths = OutputPaths::new(&self.args.outbase, replicate, self.parameters.num_sims);

        let counts = simulate_read_counts(
            self.parameters.total_reads,
            self.parameters.model,
            self.expected_counts.view(),
            &self.annotation,
            &mut self.rng,
        )?;
        let gene_counts = self.annotation.aggregate_to_genes(counts.view())?;

        log::info!("Writing gene counts to {}", paths.genes.display());
        write_count_table(
            io::BufWriter::new(fs::File::create(&paths.genes)?),
            self.annotation.genes(),
            &self.haplotypes,
            gene_counts.view(),
        )?;
        log::info!("Writing isoform counts to {}", paths.isoforms.display());
        write_count_table(
            io::BufWriter::new(fs::File::create(&paths.isoforms)?),
            self.annotation.transcripts(),
            &self.haplotypes,
            counts.view(),
        )?;
        if self.args.npy {
            write_count_matrix_npy(
                io::BufWriter::new(fs::File::create(&paths.npy)?),
                counts.view(),
            )?;
        }

        log::info!("Writing reads to {}", paths.reads.display());
        let id_format = match self.parameters.long_id {
            true => ReadIdFormat::Long,
            false => ReadIdFormat::Short,
        };
        let emitter = ReadEmitter::new(
            self.parameters.read_length,
            MutationEngine::new(self.parameters.error_rate)?,
            id_format,
            self.parameters.total_reads,
        )?;
        let bar = self.create_progress_bar();
        let mut reads_file = io::BufWriter::new(fs::File::create(&paths.reads)?);
        emitter.emit(
            counts.view(),
            self.windows.view(),
            self.annotation.transcripts(),
            &self.haplotypes,
            self.store.as_mut(),
            &mut reads_file,
            &mut self.rng,
            bar.as_ref(),
        )?;
        io::Write::flush(&mut reads_file)?;

        if let Some(bar) = bar {
            bar.finish_with_message("Done.");
        }
        Ok(())
    }
}
