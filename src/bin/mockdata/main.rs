//! Generate a small mock dataset for trying out the report templates:
//! - `counts.csv`: negative binomial counts, gene x sample
//! - `samples.csv`: sample sheet with a `condition` column (`ctrl` / `trt`)
//! - `ranked.tsv`: gene and a noisy log2 fold change, sorted descending
//! - `gene_sets.gmt`: gene sets mixing changed and unchanged genes
//!
//! The same seed always yields the same files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma, LogNormal, Normal, Poisson};
use tap::Pipe;

#[derive(Debug, Parser)]
#[command(
    name = "mockdata",
    about = "Write a mock count matrix, sample sheet, ranked list and GMT file for diffex.",
    version = env!("CARGO_PKG_VERSION")
)]
struct MockArgs {
    /// Number of genes
    #[arg(short, long, default_value_t = 2000)]
    genes: usize,
    /// Replicates per condition
    #[arg(short, long, default_value_t = 3)]
    replicates: usize,
    /// Fraction of genes that change between conditions
    #[arg(long, default_value_t = 0.1)]
    de_fraction: f64,
    /// Negative binomial dispersion
    #[arg(long, default_value_t = 0.1)]
    dispersion: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Output directory
    #[arg(short, long, default_value = "sim_data")]
    outdir: PathBuf,
}

#[derive(Debug, Clone)]
struct MockGene {
    name: String,
    base_mean: f64,
    log2_fold_change: f64,
}

fn main() -> Result<()> {
    let args = MockArgs::parse();
    ensure!(args.genes > 0, "--genes must be at least 1");
    ensure!(args.replicates > 0, "--replicates must be at least 1");
    ensure!(
        (0.0..=1.0).contains(&args.de_fraction),
        "--de-fraction must be between 0 and 1"
    );
    ensure!(args.dispersion > 0.0, "--dispersion must be positive");

    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("creating {}", args.outdir.display()))?;

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let genes = simulate_genes(args.genes, args.de_fraction, &mut rng)?;
    let samples = sample_names(args.replicates);

    write_counts(&args.outdir.join("counts.csv"), &genes, &samples, args.dispersion, &mut rng)?;
    write_samples(&args.outdir.join("samples.csv"), &samples)?;
    write_ranked(&args.outdir.join("ranked.tsv"), &genes, &mut rng)?;
    write_gene_sets(&args.outdir.join("gene_sets.gmt"), &genes, &mut rng)?;

    println!(
        "✅ Mock data for {} genes x {} samples written to {}",
        genes.len(),
        samples.len(),
        args.outdir.display()
    );
    Ok(())
}

fn simulate_genes(n: usize, de_fraction: f64, rng: &mut ChaCha8Rng) -> Result<Vec<MockGene>> {
    let base_mean = LogNormal::new(5.0, 1.5)?;
    let effect = Normal::new(0.0, 1.5)?;

    let genes = (1..=n)
        .map(|i| {
            let log2_fold_change = if rng.random_bool(de_fraction) {
                // changed genes move by at least 0.5 log2 units
                let lfc: f64 = effect.sample(rng);
                lfc.signum() * lfc.abs().max(0.5)
            } else {
                0.0
            };
            MockGene {
                name: format!("GENE{:05}", i),
                base_mean: base_mean.sample(rng),
                log2_fold_change,
            }
        })
        .collect();
    Ok(genes)
}

fn sample_names(replicates: usize) -> Vec<(String, &'static str)> {
    ["ctrl", "trt"]
        .iter()
        .flat_map(|condition| (1..=replicates).map(move |r| (format!("{}_{}", condition, r), *condition)))
        .collect()
}

/// Gamma-Poisson mixture: mean `mu`, variance `mu + dispersion * mu^2`.
fn negative_binomial(mu: f64, dispersion: f64, rng: &mut ChaCha8Rng) -> Result<u64> {
    let shape = 1.0 / dispersion;
    let lambda = Gamma::new(shape, mu / shape)?.sample(rng);
    if lambda <= 0.0 {
        return Ok(0);
    }
    Ok(Poisson::new(lambda)?.sample(rng) as u64)
}

fn write_counts(
    path: &Path,
    genes: &[MockGene],
    samples: &[(String, &'static str)],
    dispersion: f64,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let header = std::iter::once("gene".to_string())
        .chain(samples.iter().map(|(name, _)| name.clone()))
        .collect::<Vec<_>>();
    wtr.write_record(&header)?;

    for gene in genes {
        let mut row = vec![gene.name.clone()];
        for (_, condition) in samples {
            let mu = if *condition == "trt" {
                gene.base_mean * 2f64.powf(gene.log2_fold_change)
            } else {
                gene.base_mean
            };
            row.push(negative_binomial(mu, dispersion, rng)?.to_string());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_samples(path: &Path, samples: &[(String, &'static str)]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["sample", "condition"])?;
    for (name, condition) in samples {
        wtr.write_record([name.as_str(), *condition])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_ranked(path: &Path, genes: &[MockGene], rng: &mut ChaCha8Rng) -> Result<()> {
    let noise = Normal::new(0.0, 0.3)?;
    let ranked = genes
        .iter()
        .map(|gene| (gene.name.as_str(), gene.log2_fold_change + noise.sample(rng)))
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .collect::<Vec<_>>();

    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    wtr.write_record(["gene", "score"])?;
    for (gene, score) in ranked {
        wtr.write_record([gene.to_string(), format!("{:.4}", score)])?;
    }
    wtr.flush()?;
    Ok(())
}

fn names<'a>(pool: &[&'a MockGene], n: usize) -> Vec<&'a str> {
    pool.iter().take(n).map(|gene| gene.name.as_str()).collect()
}

fn write_gene_sets(path: &Path, genes: &[MockGene], rng: &mut ChaCha8Rng) -> Result<()> {
    let mut up = genes.iter().filter(|gene| gene.log2_fold_change > 0.0).collect::<Vec<_>>();
    let mut down = genes.iter().filter(|gene| gene.log2_fold_change < 0.0).collect::<Vec<_>>();
    let mut unchanged = genes.iter().filter(|gene| gene.log2_fold_change == 0.0).collect::<Vec<_>>();
    up.shuffle(rng);
    down.shuffle(rng);
    unchanged.shuffle(rng);

    let size = (genes.len() / 20).clamp(15, 200);
    let sets = vec![
        ("MOCK_UP_REGULATED", names(&up, size)),
        ("MOCK_DOWN_REGULATED", names(&down, size)),
        ("MOCK_UNCHANGED", names(&unchanged, size)),
    ];

    let mut out = File::create(path)?.pipe(BufWriter::new);
    for (name, members) in sets.into_iter().filter(|(_, members)| !members.is_empty()) {
        writeln!(out, "{}\tmock gene set\t{}", name, members.iter().join("\t"))?;
    }
    out.flush()?;
    Ok(())
}
