use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Directory with the transcript list and gene grouping.
    #[clap(short, long)]
    pub reference_dir: String,

    /// Directory with the pooled haplotype transcriptome and its lengths.
    #[clap(short = 'H', long)]
    pub hybrid_dir: String,

    /// Expected read counts per transcript and haplotype.
    #[clap(short, long)]
    pub param_file: String,

    /// Simulation model (1: gene>allele>isoform, 2: gene>isoform>allele,
    /// 3: gene>allele*isoform, 4: flat).
    #[clap(short, long, default_value_t = 1)]
    pub model: u8,

    /// Total number of reads per replicate.
    #[clap(short = 'N', long, default_value_t = 10_000_000)]
    pub num_reads: u64,

    /// Number of independent replicates.
    #[clap(long, default_value_t = 1)]
    pub num_sims: usize,

    /// Read length.
    #[clap(short = 'k', long, default_value_t = 100)]
    pub read_length: usize,

    /// Mean number of substitutions per read.
    #[clap(short, long, default_value_t = 0.1)]
    pub error_rate: f64,

    /// Base path of all output files.
    #[clap(short, long, default_value = "asesim")]
    pub outbase: String,

    /// Encode origin and mutations in the read identifiers.
    #[clap(long)]
    pub long_id: bool,

    /// Seed for the random number generator.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Path to settings (yaml). Overrides the simulation options above.
    #[clap(long)]
    pub settings: Option<String>,

    /// Also store the simulated isoform counts as npy array.
    #[clap(long)]
    pub npy: bool,

    /// Verbosity level.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to log file.
    #[clap(long, default_value = "asesim.log")]
    pub log_file: String,

    /// Disable the progress bar.
    #[clap(long)]
    pub disable_progress_bar: bool,
}
