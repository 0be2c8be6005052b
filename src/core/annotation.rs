//! Transcript to gene membership.
//!
//! The `Annotation` holds the transcript and gene identifiers, the member
//! transcripts of each gene and the transcript × gene incidence matrix. It is
//! built once from the reference tables and never changes afterwards.

use ndarray::{Array2, ArrayView2, LinalgScalar};
use sprs::{CsMat, TriMat};
use std::collections::HashMap;

use crate::errors::{AsesimError, Result};

#[derive(Clone, Debug)]
pub struct Annotation {
    transcripts: Vec<String>,
    genes: Vec<String>,
    groups: Vec<Vec<usize>>,
    incidence: CsMat<u8>,
}

impl Annotation {
    /// Build the annotation from gene groups of transcript indices.
    pub fn new(
        transcripts: Vec<String>,
        genes: Vec<String>,
        groups: Vec<Vec<usize>>,
    ) -> Result<Self> {
        if genes.len() != groups.len() {
            return Err(AsesimError::DimensionMismatch {
                expected: genes.len(),
                found: groups.len(),
            });
        }

        let mut triplets = TriMat::new((transcripts.len(), genes.len()));
        let mut memberships = vec![0usize; transcripts.len()];
        for (gene, members) in groups.iter().enumerate() {
            if members.is_empty() {
                return Err(AsesimError::ReadError(format!(
                    "Gene {} has no transcripts",
                    genes[gene]
                )));
            }
            for &transcript in members {
                if transcript >= transcripts.len() {
                    return Err(AsesimError::ReadError(format!(
                        "Gene {} refers to transcript index {transcript} out of {}",
                        genes[gene],
                        transcripts.len()
                    )));
                }
                triplets.add_triplet(transcript, gene, 1u8);
                memberships[transcript] += 1;
            }
        }

        let shared = memberships.iter().filter(|&&m| m > 1).count();
        if shared > 0 {
            log::warn!("{shared} transcripts belong to more than one gene.");
        }
        let orphans = memberships.iter().filter(|&&m| m == 0).count();
        if orphans > 0 {
            log::warn!("{orphans} transcripts do not belong to any gene.");
        }

        Ok(Self {
            transcripts,
            genes,
            groups,
            incidence: triplets.to_csr(),
        })
    }

    /// Build the annotation from gene names and member transcript names.
    pub fn from_named_groups(
        transcripts: Vec<String>,
        named_groups: Vec<(String, Vec<String>)>,
    ) -> Result<Self> {
        let index: HashMap<&str, usize> = transcripts
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let mut genes = Vec::with_capacity(named_groups.len());
        let mut groups = Vec::with_capacity(named_groups.len());
        for (gene, members) in named_groups {
            let members = members
                .iter()
                .map(|member| {
                    index.get(member.as_str()).copied().ok_or_else(|| {
                        AsesimError::ReadError(format!(
                            "Gene {gene} lists unknown transcript {member}"
                        ))
                    })
                })
                .collect::<Result<Vec<usize>>>()?;
            genes.push(gene);
            groups.push(members);
        }

        Self::new(transcripts, genes, groups)
    }

    pub fn transcripts(&self) -> &[String] {
        &self.transcripts
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn incidence(&self) -> &CsMat<u8> {
        &self.incidence
    }

    pub fn n_transcripts(&self) -> usize {
        self.incidence.rows()
    }

    pub fn n_genes(&self) -> usize {
        self.incidence.cols()
    }

    /// Aggregate a transcript × haplotype matrix to gene × haplotype.
    ///
    /// Computes `incidenceᵀ · counts`.
    pub fn aggregate_to_genes<T>(&self, counts: ArrayView2<T>) -> Result<Array2<T>>
    where
        T: LinalgScalar + From<u8>,
    {
        if counts.nrows() != self.n_transcripts() {
            return Err(AsesimError::DimensionMismatch {
                expected: self.n_transcripts(),
                found: counts.nrows(),
            });
        }

        let mut genes = Array2::<T>::zeros((self.n_genes(), counts.ncols()));
        for (transcript, row) in self.incidence.outer_iterator().enumerate() {
            for (gene, &weight) in row.iter() {
                let weight = T::from(weight);
                for (haplotype, &count) in counts.row(transcript).iter().enumerate() {
                    genes[[gene, haplotype]] = genes[[gene, haplotype]] + count * weight;
                }
            }
        }
        Ok(genes)
    }
}
