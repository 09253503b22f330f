use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{DiffexError, DiffexResult};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TableFormat {
    Csv,
    Tsv,
}

impl TableFormat {
    pub fn delimiter(&self) -> u8 {
        match self {
            TableFormat::Csv => b',',
            TableFormat::Tsv => b'\t',
        }
    }
}

pub fn determine_table_format(file_path: &Path) -> DiffexResult<TableFormat> {
    let file_name = file_path
        .file_name()
        .ok_or_else(|| {
            DiffexError::InvalidInput(format!("Invalid file path: {}", file_path.display()))
        })?
        .to_string_lossy()
        .to_lowercase();

    if file_name.ends_with(".csv") {
        Ok(TableFormat::Csv)
    } else if file_name.ends_with(".tsv")
        || file_name.ends_with(".txt")
        || file_name.ends_with(".tab")
    {
        Ok(TableFormat::Tsv)
    } else if file_name.ends_with(".gz") {
        Err(DiffexError::InvalidInput(format!(
            "Compressed input {} is not supported, please decompress it first",
            file_name
        )))
    } else {
        Err(DiffexError::InvalidInput(format!(
            "Unsupported format of input file {}, expected .csv, .tsv, .txt or .tab",
            file_name
        )))
    }
}

pub fn ensure_exists(file_path: &Path) -> DiffexResult<()> {
    if file_path.is_file() {
        Ok(())
    } else {
        Err(DiffexError::InputNotFound {
            path: file_path.to_path_buf(),
        })
    }
}

/// Read failures stay IO errors; anything the parser rejects is bad content.
fn table_error(file_path: &Path, err: csv::Error) -> DiffexError {
    if err.is_io_error() {
        DiffexError::Csv(err)
    } else {
        DiffexError::InvalidInput(format!("{} could not be parsed: {}", file_path.display(), err))
    }
}

/// First row of a delimited table, with surrounding whitespace trimmed.
pub fn read_header(file_path: &Path) -> DiffexResult<Vec<String>> {
    ensure_exists(file_path)?;
    let format = determine_table_format(file_path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(true)
        .flexible(true)
        .from_path(file_path)
        .map_err(|e| table_error(file_path, e))?;
    let header = reader
        .headers()
        .map_err(|e| table_error(file_path, e))?
        .iter()
        .map(|field| field.trim().to_string())
        .collect::<Vec<_>>();

    if header.iter().all(|field| field.is_empty()) {
        return Err(DiffexError::InvalidInput(format!(
            "{} is empty or has no header row",
            file_path.display()
        )));
    }
    Ok(header)
}

/// Count matrix: a gene identifier column followed by at least one sample.
pub fn validate_counts(file_path: &Path) -> DiffexResult<Vec<String>> {
    let header = read_header(file_path)?;
    if header.len() < 2 {
        return Err(DiffexError::InvalidInput(format!(
            "Count matrix {} needs a gene column and at least one sample column, found {} column(s)",
            file_path.display(),
            header.len()
        )));
    }
    Ok(header[1..].to_vec())
}

/// Sample sheet: must carry the column the contrast is defined on.
pub fn validate_metadata(file_path: &Path, condition: &str) -> DiffexResult<()> {
    let header = read_header(file_path)?;
    if !header.iter().any(|column| column == condition) {
        return Err(DiffexError::InvalidInput(format!(
            "Sample sheet {} has no '{}' column (columns: {})",
            file_path.display(),
            condition,
            header.join(", ")
        )));
    }
    Ok(())
}

/// Ranked gene list. A two-column file is read as (gene, score) whatever the
/// header says; wider files must name the rank column.
pub fn validate_ranked(file_path: &Path, rank_column: &str) -> DiffexResult<()> {
    let header = read_header(file_path)?;
    match header.len() {
        0 | 1 => Err(DiffexError::InvalidInput(format!(
            "Ranked list {} needs a gene column and a score column",
            file_path.display()
        ))),
        2 => Ok(()),
        _ if header.iter().any(|column| column == rank_column) => Ok(()),
        _ => Err(DiffexError::InvalidInput(format!(
            "Ranked list {} has no '{}' column (columns: {})",
            file_path.display(),
            rank_column,
            header.join(", ")
        ))),
    }
}

/// GMT: `name<TAB>description<TAB>gene...`, one set per line.
pub fn validate_gmt(file_path: &Path) -> DiffexResult<usize> {
    ensure_exists(file_path)?;
    let reader = BufReader::new(File::open(file_path)?);
    let mut sets = 0;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => DiffexError::InvalidInput(format!(
                "{} line {} is not valid UTF-8",
                file_path.display(),
                line_number + 1
            )),
            _ => DiffexError::Io(e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        if line.split('\t').count() < 3 {
            return Err(DiffexError::InvalidInput(format!(
                "{} line {}: expected set name, description and at least one gene separated by tabs",
                file_path.display(),
                line_number + 1
            )));
        }
        sets += 1;
    }
    if sets == 0 {
        return Err(DiffexError::InvalidInput(format!(
            "{} contains no gene sets",
            file_path.display()
        )));
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_determine_table_format() {
        assert_eq!(determine_table_format(Path::new("counts.csv")).unwrap(), TableFormat::Csv);
        assert_eq!(determine_table_format(Path::new("counts.TSV")).unwrap(), TableFormat::Tsv);
        assert_eq!(determine_table_format(Path::new("ranks.txt")).unwrap(), TableFormat::Tsv);
        assert_eq!(determine_table_format(Path::new("ranks.tab")).unwrap(), TableFormat::Tsv);
        assert!(determine_table_format(Path::new("counts.csv.gz")).is_err());
        assert!(determine_table_format(Path::new("counts.xlsx")).is_err());
    }

    #[test]
    fn test_validate_counts() {
        let dir = TempDir::new().unwrap();
        let counts = write(&dir, "counts.csv", "gene,s1,s2\nTP53,10,12\n");
        assert_eq!(validate_counts(&counts).unwrap(), vec!["s1", "s2"]);

        let narrow = write(&dir, "narrow.tsv", "gene\nTP53\n");
        assert!(matches!(validate_counts(&narrow), Err(DiffexError::InvalidInput(_))));

        let missing = dir.path().join("missing.csv");
        assert!(matches!(validate_counts(&missing), Err(DiffexError::InputNotFound { .. })));
    }

    #[test]
    fn test_non_utf8_header_is_bad_content() {
        let dir = TempDir::new().unwrap();
        let counts = dir.path().join("latin1.csv");
        fs::write(&counts, b"gene,s\xff1,s2\nTP53,10,12\n").unwrap();
        let err = validate_counts(&counts).unwrap_err();
        assert!(matches!(err, DiffexError::InvalidInput(_)));
        assert_eq!(err.exit_code(), 65);
        assert!(err.to_string().contains("latin1.csv"));

        let gmt = dir.path().join("latin1.gmt");
        fs::write(&gmt, b"P53\tna\tTP\xff53\n").unwrap();
        assert_eq!(validate_gmt(&gmt).unwrap_err().exit_code(), 65);
    }

    #[test]
    fn test_validate_metadata() {
        let dir = TempDir::new().unwrap();
        let meta = write(&dir, "samples.tsv", "sample\tcondition\tbatch\ns1\tctrl\t1\n");
        assert!(validate_metadata(&meta, "condition").is_ok());
        let err = validate_metadata(&meta, "treatment").unwrap_err();
        assert!(err.to_string().contains("'treatment'"));
    }

    #[test]
    fn test_validate_ranked() {
        let dir = TempDir::new().unwrap();
        let two = write(&dir, "ranks.tsv", "gene\tscore\nTP53\t3.2\n");
        assert!(validate_ranked(&two, "stat").is_ok());

        let wide = write(&dir, "deg.csv", "gene,log2FoldChange,stat,padj\nTP53,1.2,4.5,0.01\n");
        assert!(validate_ranked(&wide, "stat").is_ok());
        assert!(validate_ranked(&wide, "rank").is_err());
    }

    #[test]
    fn test_validate_gmt() {
        let dir = TempDir::new().unwrap();
        let gmt = write(
            &dir,
            "sets.gmt",
            "HALLMARK_P53\tna\tTP53\tMDM2\n\nHALLMARK_MYC\tna\tMYC\n",
        );
        assert_eq!(validate_gmt(&gmt).unwrap(), 2);

        let bad = write(&dir, "bad.gmt", "HALLMARK_P53 TP53 MDM2\n");
        assert!(validate_gmt(&bad).is_err());

        let empty = write(&dir, "empty.gmt", "\n");
        assert!(validate_gmt(&empty).is_err());
    }
}
