//! Hierarchical read count simulation.
//!
//! A total read budget is decomposed down the gene, haplotype and isoform
//! levels with nested multinomial draws. Each child draw uses the count drawn
//! for its parent as number of trials, so the budget is conserved exactly at
//! every level. The four models differ only in the order in which the levels
//! are split.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::annotation::Annotation;
use super::multinomial::multinomial;
use super::proportions::{normalize, normalize_rows, row_totals};
use crate::errors::{AsesimError, Result};

/// Order in which the hierarchy is decomposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SimulationModel {
    /// Gene, then haplotype, then isoform.
    GeneAlleleIsoform,
    /// Gene, then isoform, then haplotype.
    GeneIsoformAllele,
    /// Gene, then isoform and haplotype jointly.
    GeneJoint,
    /// All isoforms and haplotypes jointly.
    Flat,
}

impl TryFrom<u8> for SimulationModel {
    type Error = AsesimError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(SimulationModel::GeneAlleleIsoform),
            2 => Ok(SimulationModel::GeneIsoformAllele),
            3 => Ok(SimulationModel::GeneJoint),
            4 => Ok(SimulationModel::Flat),
            _ => Err(AsesimError::InvalidModel(tag)),
        }
    }
}

impl From<SimulationModel> for u8 {
    fn from(model: SimulationModel) -> Self {
        match model {
            SimulationModel::GeneAlleleIsoform => 1,
            SimulationModel::GeneIsoformAllele => 2,
            SimulationModel::GeneJoint => 3,
            SimulationModel::Flat => 4,
        }
    }
}

impl fmt::Display for SimulationModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let description = match self {
            SimulationModel::GeneAlleleIsoform => "gene > allele > isoform",
            SimulationModel::GeneIsoformAllele => "gene > isoform > allele",
            SimulationModel::GeneJoint => "gene > allele * isoform",
            SimulationModel::Flat => "allele * isoform",
        };
        write!(f, "{} ({description})", u8::from(*self))
    }
}

/// Simulate a transcript × haplotype matrix of read counts.
///
/// The returned counts sum to `total_reads`. `expected_counts` is only read;
/// it can be reused for any number of replicates.
pub fn simulate_read_counts<R: Rng + ?Sized>(
    total_reads: u64,
    model: SimulationModel,
    expected_counts: ArrayView2<f64>,
    annotation: &Annotation,
    rng: &mut R,
) -> Result<Array2<u64>> {
    if expected_counts.nrows() != annotation.n_transcripts() {
        return Err(AsesimError::DimensionMismatch {
            expected: annotation.n_transcripts(),
            found: expected_counts.nrows(),
        });
    }
    if expected_counts.ncols() == 0 {
        return Err(AsesimError::InvalidParameter(
            "Expected counts have no haplotypes".to_string(),
        ));
    }

    log::debug!("Simulating {total_reads} reads with model {model}");
    match model {
        SimulationModel::GeneAlleleIsoform => {
            simulate_gene_allele_isoform(total_reads, expected_counts, annotation, rng)
        }
        SimulationModel::GeneIsoformAllele => {
            simulate_gene_isoform_allele(total_reads, expected_counts, annotation, rng)
        }
        SimulationModel::GeneJoint => {
            simulate_gene_joint(total_reads, expected_counts, annotation, rng)
        }
        SimulationModel::Flat => simulate_flat(total_reads, expected_counts, rng),
    }
}

/// Draw the number of reads per gene from the gene share of expected reads.
fn draw_gene_totals<R: Rng + ?Sized>(
    total_reads: u64,
    gene_expected: &Array1<f64>,
    rng: &mut R,
) -> Result<Vec<u64>> {
    if gene_expected.is_empty() {
        return Err(AsesimError::InvalidParameter(
            "Annotation contains no genes".to_string(),
        ));
    }
    let theta = normalize(&gene_expected.to_vec());
    multinomial(rng, total_reads, &theta)
}

fn simulate_gene_allele_isoform<R: Rng + ?Sized>(
    total_reads: u64,
    expected_counts: ArrayView2<f64>,
    annotation: &Annotation,
    rng: &mut R,
) -> Result<Array2<u64>> {
    let n_haplotypes = expected_counts.ncols();
    let gene_haplotype_expected = annotation.aggregate_to_genes(expected_counts)?;
    let gene_expected = row_totals(gene_haplotype_expected.view());
    let gene_totals = draw_gene_totals(total_reads, &gene_expected, rng)?;
    log::debug!("Drew gene totals for {} genes", gene_totals.len());

    // gene -> haplotype
    let haplotype_proportions =
        normalize_rows(gene_haplotype_expected.view(), gene_expected.view());
    let mut gene_haplotype_counts = Array2::<u64>::zeros(gene_haplotype_expected.dim());
    for (gene, &gene_total) in gene_totals.iter().enumerate() {
        if gene_total == 0 {
            continue;
        }
        let proportions = haplotype_proportions.row(gene).to_vec();
        let draw = multinomial(rng, gene_total, &proportions)?;
        gene_haplotype_counts
            .row_mut(gene)
            .assign(&Array1::from(draw));
    }

    // haplotype -> isoform
    let mut counts = Array2::<u64>::zeros(expected_counts.dim());
    for haplotype in 0..n_haplotypes {
        for (gene, members) in annotation.groups().iter().enumerate() {
            let reads = gene_haplotype_counts[[gene, haplotype]];
            if reads == 0 {
                continue;
            }
            let member_expected: Vec<f64> = members
                .iter()
                .map(|&transcript| expected_counts[[transcript, haplotype]])
                .collect();
            let draw = multinomial(rng, reads, &normalize(&member_expected))?;
            for (&transcript, count) in members.iter().zip(draw) {
                counts[[transcript, haplotype]] += count;
            }
        }
    }
    Ok(counts)
}

fn simulate_gene_isoform_allele<R: Rng + ?Sized>(
    total_reads: u64,
    expected_counts: ArrayView2<f64>,
    annotation: &Annotation,
    rng: &mut R,
) -> Result<Array2<u64>> {
    let gene_expected = row_totals(annotation.aggregate_to_genes(expected_counts)?.view());
    let gene_totals = draw_gene_totals(total_reads, &gene_expected, rng)?;
    log::debug!("Drew gene totals for {} genes", gene_totals.len());

    // gene -> isoform
    let isoform_expected = row_totals(expected_counts);
    let mut isoform_counts = vec![0u64; expected_counts.nrows()];
    for (members, &gene_total) in annotation.groups().iter().zip(gene_totals.iter()) {
        if gene_total == 0 {
            continue;
        }
        let member_expected: Vec<f64> = members
            .iter()
            .map(|&transcript| isoform_expected[transcript])
            .collect();
        let draw = multinomial(rng, gene_total, &normalize(&member_expected))?;
        for (&transcript, count) in members.iter().zip(draw) {
            isoform_counts[transcript] += count;
        }
    }

    // isoform -> haplotype
    let haplotype_proportions = normalize_rows(expected_counts, isoform_expected.view());
    let mut counts = Array2::<u64>::zeros(expected_counts.dim());
    for (transcript, &reads) in isoform_counts.iter().enumerate() {
        if reads == 0 {
            continue;
        }
        let proportions = haplotype_proportions.row(transcript).to_vec();
        let draw = multinomial(rng, reads, &proportions)?;
        counts.row_mut(transcript).assign(&Array1::from(draw));
    }
    Ok(counts)
}

fn simulate_gene_joint<R: Rng + ?Sized>(
    total_reads: u64,
    expected_counts: ArrayView2<f64>,
    annotation: &Annotation,
    rng: &mut R,
) -> Result<Array2<u64>> {
    let n_haplotypes = expected_counts.ncols();
    let gene_expected = row_totals(annotation.aggregate_to_genes(expected_counts)?.view());
    let gene_totals = draw_gene_totals(total_reads, &gene_expected, rng)?;
    log::debug!("Drew gene totals for {} genes", gene_totals.len());

    let mut counts = Array2::<u64>::zeros(expected_counts.dim());
    for (members, &gene_total) in annotation.groups().iter().zip(gene_totals.iter()) {
        if gene_total == 0 {
            continue;
        }
        // flatten isoform x haplotype block row major
        let block: Vec<f64> = expected_counts
            .select(Axis(0), members)
            .iter()
            .copied()
            .collect();
        let draw = multinomial(rng, gene_total, &normalize(&block))?;
        for (cell, count) in draw.into_iter().enumerate() {
            let transcript = members[cell / n_haplotypes];
            counts[[transcript, cell % n_haplotypes]] += count;
        }
    }
    Ok(counts)
}

fn simulate_flat<R: Rng + ?Sized>(
    total_reads: u64,
    expected_counts: ArrayView2<f64>,
    rng: &mut R,
) -> Result<Array2<u64>> {
    let cells: Vec<f64> = expected_counts.iter().copied().collect();
    let draw = multinomial(rng, total_reads, &normalize(&cells))?;
    Array2::from_shape_vec(expected_counts.dim(), draw)
        .map_err(|err| AsesimError::InvalidParameter(format!("{err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotation::tests::small_annotation;
    use ndarray::array;
    use rand::rngs::StdRng;

    const MODELS: [SimulationModel; 4] = [
        SimulationModel::GeneAlleleIsoform,
        SimulationModel::GeneIsoformAllele,
        SimulationModel::GeneJoint,
        SimulationModel::Flat,
    ];

    fn expected_counts() -> Array2<f64> {
        array![
            [10., 30.],
            [5., 0.],
            [0., 0.],
            [100., 50.],
            [0., 20.],
            [1., 1.],
        ]
    }

    #[test]
    fn model_tags() {
        for (tag, model) in (1u8..=4).zip(MODELS) {
            assert_eq!(SimulationModel::try_from(tag).unwrap(), model);
            assert_eq!(u8::from(model), tag);
        }
        assert!(matches!(
            SimulationModel::try_from(0),
            Err(AsesimError::InvalidModel(0))
        ));
        assert!(matches!(
            SimulationModel::try_from(5),
            Err(AsesimError::InvalidModel(5))
        ));
    }

    #[test]
    fn conserves_total_reads() {
        let annotation = small_annotation();
        let expected = expected_counts();
        for model in MODELS {
            for seed in 0..20 {
                let mut rng = StdRng::seed_from_u64(seed);
                for total_reads in [0, 1, 17, 10_000] {
                    let counts = simulate_read_counts(
                        total_reads,
                        model,
                        expected.view(),
                        &annotation,
                        &mut rng,
                    )
                    .unwrap();
                    assert_eq!(counts.dim(), (6, 2));
                    assert_eq!(counts.sum(), total_reads, "model {model}, seed {seed}");
                }
            }
        }
    }

    #[test]
    fn zero_expression_gets_no_reads() {
        let annotation = small_annotation();
        let expected = expected_counts();
        for model in MODELS {
            let mut rng = StdRng::seed_from_u64(5);
            let counts =
                simulate_read_counts(50_000, model, expected.view(), &annotation, &mut rng)
                    .unwrap();
            assert_eq!(counts[[1, 1]], 0, "model {model}");
            assert_eq!(counts[[2, 0]], 0, "model {model}");
            assert_eq!(counts[[2, 1]], 0, "model {model}");
            assert_eq!(counts[[4, 0]], 0, "model {model}");
        }
    }

    #[test]
    fn gene_totals_match_aggregate() {
        let annotation = small_annotation();
        let expected = expected_counts();
        let gene_expected = row_totals(
            annotation
                .aggregate_to_genes(expected.view())
                .unwrap()
                .view(),
        );
        for model in &MODELS[..3] {
            // replay the gene level draw with the same seed
            let mut rng = StdRng::seed_from_u64(99);
            let counts =
                simulate_read_counts(1000, *model, expected.view(), &annotation, &mut rng)
                    .unwrap();
            let mut rng = StdRng::seed_from_u64(99);
            let gene_totals = draw_gene_totals(1000, &gene_expected, &mut rng).unwrap();

            let genes = annotation.aggregate_to_genes(counts.view()).unwrap();
            let drawn: Vec<u64> = genes.sum_axis(Axis(1)).to_vec();
            assert_eq!(drawn, gene_totals, "model {model}");
        }
    }

    #[test]
    fn cell_means_follow_expected_proportions() {
        let annotation = small_annotation();
        let expected = expected_counts();
        let proportions = &expected / expected.sum();
        let total_reads = 10_000;
        let replicates = 200;
        for model in MODELS {
            let mut rng = StdRng::seed_from_u64(21);
            let mut sums = Array2::<u64>::zeros(expected.dim());
            for _ in 0..replicates {
                sums += &simulate_read_counts(
                    total_reads,
                    model,
                    expected.view(),
                    &annotation,
                    &mut rng,
                )
                .unwrap();
            }
            let draws = (total_reads * replicates) as f64;
            for ((t, h), &sum) in sums.indexed_iter() {
                let observed = sum as f64 / draws;
                assert!(
                    (observed - proportions[[t, h]]).abs() < 0.005,
                    "model {model}, cell ({t}, {h}): {observed} vs {}",
                    proportions[[t, h]]
                );
            }
        }
    }

    #[test]
    fn flat_model_two_transcripts() {
        let transcripts = vec!["t0".to_string(), "t1".to_string()];
        let annotation =
            Annotation::new(transcripts, vec!["g0".to_string()], vec![vec![0, 1]]).unwrap();
        let expected = array![[3.], [1.]];

        let mut rng = StdRng::seed_from_u64(1);
        let counts = simulate_read_counts(
            4,
            SimulationModel::Flat,
            expected.view(),
            &annotation,
            &mut rng,
        )
        .unwrap();
        assert_eq!(counts.sum(), 4);

        let mut first = 0;
        for _ in 0..1000 {
            let counts = simulate_read_counts(
                4,
                SimulationModel::Flat,
                expected.view(),
                &annotation,
                &mut rng,
            )
            .unwrap();
            first += counts[[0, 0]];
        }
        let fraction = first as f64 / 4000.;
        assert!((fraction - 0.75).abs() < 0.03);
    }

    #[test]
    fn unexpressed_annotation_is_uniform() {
        let annotation = small_annotation();
        let expected = Array2::<f64>::zeros((6, 2));
        for model in MODELS {
            let mut rng = StdRng::seed_from_u64(3);
            let counts =
                simulate_read_counts(600, model, expected.view(), &annotation, &mut rng)
                    .unwrap();
            assert_eq!(counts.sum(), 600);
        }
    }

    #[test]
    fn reproducible_with_seed() {
        let annotation = small_annotation();
        let expected = expected_counts();
        for model in MODELS {
            let a = simulate_read_counts(
                500,
                model,
                expected.view(),
                &annotation,
                &mut StdRng::seed_from_u64(8),
            )
            .unwrap();
            let b = simulate_read_counts(
                500,
                model,
                expected.view(),
                &annotation,
                &mut StdRng::seed_from_u64(8),
            )
            .unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn dimension_mismatch() {
        let annotation = small_annotation();
        let expected = Array2::<f64>::ones((4, 2));
        let mut rng = StdRng::seed_from_u64(0);
        let result = simulate_read_counts(
            10,
            SimulationModel::GeneAlleleIsoform,
            expected.view(),
            &annotation,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(AsesimError::DimensionMismatch {
                expected: 6,
                found: 4
            })
        ));
    }

    #[test]
    fn model_serde() {
        let yaml = serde_yaml::to_string(&SimulationModel::GeneJoint).unwrap();
        assert_eq!(yaml.trim(), "3");
        let model: SimulationModel = serde_yaml::from_str("2").unwrap();
        assert_eq!(model, SimulationModel::GeneIsoformAllele);
        assert!(serde_yaml::from_str::<SimulationModel>("7").is_err());
    }
}
