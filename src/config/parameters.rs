use serde::{Deserialize, Serialize};
use std::fs;

use crate::args::Args;
use crate::core::SimulationModel;
use crate::errors::{AsesimError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameters {
    /// The order in which genes, haplotypes and isoforms are sampled.
    pub model: SimulationModel,

    /// The total number of reads simulated for each replicate.
    pub total_reads: u64,

    /// The number of independent replicates.
    #[serde(default = "default_num_sims")]
    pub num_sims: usize,

    /// The length of every simulated read.
    pub read_length: usize,

    /// The mean number of substitutions per read.
    pub error_rate: f64,

    /// Whether read identifiers encode origin and substitutions.
    #[serde(default)]
    pub long_id: bool,

    /// Seed of the random number generator. Drawn at random if missing.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_sims() -> usize {
    1
}

#[derive(Debug)]
pub enum ParametersError {
    IoError(std::io::Error),
    YamlError(serde_yaml::Error),
}

impl std::error::Error for ParametersError {}

impl std::fmt::Display for ParametersError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParametersError::IoError(error) => write!(formatter, "IO error: {}", error),
            ParametersError::YamlError(error) => write!(formatter, "YAML error: {}", error),
        }
    }
}

impl std::fmt::Display for Parameters {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{}", String::from_utf8_lossy(&output))
    }
}

impl TryFrom<&Args> for Parameters {
    type Error = AsesimError;

    fn try_from(args: &Args) -> Result<Self> {
        Ok(Self {
            model: SimulationModel::try_from(args.model)?,
            total_reads: args.num_reads,
            num_sims: args.num_sims,
            read_length: args.read_length,
            error_rate: args.error_rate,
            long_id: args.long_id,
            seed: args.seed,
        })
    }
}

impl Parameters {
    pub fn write(&self, writer: &mut dyn std::io::Write) -> std::result::Result<(), ParametersError> {
        serde_yaml::to_writer(writer, self).map_err(ParametersError::YamlError)
    }

    pub fn read(reader: &mut dyn std::io::Read) -> std::result::Result<Parameters, ParametersError> {
        serde_yaml::from_reader(reader).map_err(ParametersError::YamlError)
    }

    pub fn write_to_file(&self, filename: &str) -> std::result::Result<(), ParametersError> {
        let file = fs::File::create(filename).map_err(ParametersError::IoError)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    pub fn read_from_file(filename: &str) -> std::result::Result<Parameters, ParametersError> {
        let file = fs::File::open(filename).map_err(ParametersError::IoError)?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }

    /// Check ranges that the type system does not enforce.
    pub fn validate(&self) -> Result<()> {
        if self.read_length == 0 {
            return Err(AsesimError::InvalidParameter(
                "read_length must be positive".to_string(),
            ));
        }
        if self.num_sims == 0 {
            return Err(AsesimError::InvalidParameter(
                "num_sims must be positive".to_string(),
            ));
        }
        if !self.error_rate.is_finite() || self.error_rate < 0. {
            return Err(AsesimError::InvalidParameter(format!(
                "error_rate must be a non-negative number, got {}",
                self.error_rate
            )));
        }
        Ok(())
    }
}
