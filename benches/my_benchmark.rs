use std::fs;

use criterion::{Criterion, criterion_group, criterion_main};
use diffex::io::{validate_counts, validate_gmt};
use diffex::params::{apply_overrides, parse_override, to_mapping, write_params_file, DegParams};
use diffex::config::{Commands, InputConfig};
use clap::Parser;
use tempfile::TempDir;

// typical bulk RNA-seq size: 20k genes, 12 samples
fn mock_counts(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("counts.csv");
    let mut content = String::from("gene");
    for s in 1..=12 {
        content.push_str(&format!(",s{}", s));
    }
    content.push('\n');
    for g in 1..=20_000 {
        content.push_str(&format!("GENE{:05}", g));
        for s in 1..=12 {
            content.push_str(&format!(",{}", (g * s) % 997));
        }
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

fn mock_gmt(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("sets.gmt");
    let content = (1..=50)
        .map(|i| {
            let genes = (1..=200).map(|g| format!("GENE{:05}", i * g)).collect::<Vec<_>>().join("\t");
            format!("SET_{}\tmock\t{}\n", i, genes)
        })
        .collect::<String>();
    fs::write(&path, content).unwrap();
    path
}

fn bench_params(dir: &TempDir) {
    let config = InputConfig::try_parse_from([
        "diffex", "deg", "-c", "counts.csv", "-m", "samples.csv", "--padj", "0.01",
    ])
    .unwrap();
    let Commands::Deg(args) = config.command else {
        unreachable!()
    };
    let params = DegParams::from_args(&args, dir.path()).unwrap();
    let mut mapping = to_mapping(&params).unwrap();
    apply_overrides(&mut mapping, &[parse_override("top_n=50").unwrap()]);
    write_params_file(&mapping, &dir.path().join("deg_params.yaml")).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let counts = mock_counts(&dir);
    let gmt = mock_gmt(&dir);

    c.bench_function("Count header", |b| b.iter(|| validate_counts(&counts).unwrap()));
    c.bench_function("GMT scan", |b| b.iter(|| validate_gmt(&gmt).unwrap()));
    c.bench_function("Params YAML", |b| b.iter(|| bench_params(&dir)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
