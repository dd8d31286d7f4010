//! Flat text record of one network:
//!
//! ```text
//! line 1      generation
//! lines 2-21  input→hidden weights, hidden-major
//! lines 22-26 hidden→output weights
//! ```
//!
//! No header, no checksum, no versioning.

use crate::nn::NeuralNet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_PATH: &str = "network.dat";

/// Lines in a complete record.
pub const RECORD_LINES: usize = 1 + NeuralNet::WEIGHT_COUNT;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("record ends before line {line} of {}", RECORD_LINES)]
    MissingLine { line: usize },
    #[error("line {line}: {value:?} is not a valid number")]
    Parse { line: usize, value: String },
    #[error("unexpected data after line {} (line {line})", RECORD_LINES)]
    TrailingData { line: usize },
    #[error("line {line} is not valid UTF-8")]
    Encoding { line: usize },
}

impl PersistenceError {
    /// True for malformed records, false for i/o failures.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, PersistenceError::Io(_))
    }
}

/// Write `generation` followed by every weight of `net`.
pub fn write_record<W: Write>(
    sink: &mut W,
    generation: u32,
    net: &NeuralNet,
) -> Result<(), PersistenceError> {
    writeln!(sink, "{generation}")?;
    for w in net.weights_in_hidden().iter().chain(net.weights_hidden_out()) {
        writeln!(sink, "{w}")?;
    }
    sink.flush()?;
    Ok(())
}

/// Undecodable bytes are a malformed record, not a failed read.
fn decode_line(line: usize, read: io::Result<String>) -> Result<String, PersistenceError> {
    match read {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            Err(PersistenceError::Encoding { line })
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse a complete record. Nothing is returned unless every line parses.
pub fn read_record<R: BufRead>(source: R) -> Result<(u32, NeuralNet), PersistenceError> {
    let mut lines = source.lines();
    let mut next_line = |line: usize| -> Result<String, PersistenceError> {
        match lines.next() {
            Some(read) => Ok(decode_line(line, read)?.trim().to_string()),
            None => Err(PersistenceError::MissingLine { line }),
        }
    };

    let text = next_line(1)?;
    let generation = text
        .parse::<u32>()
        .map_err(|_| PersistenceError::Parse { line: 1, value: text })?;

    let mut weights = Vec::with_capacity(NeuralNet::WEIGHT_COUNT);
    for line in 2..=RECORD_LINES {
        let text = next_line(line)?;
        let value = text
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(PersistenceError::Parse { line, value: text })?;
        weights.push(value);
    }

    let mut line = RECORD_LINES;
    for extra in lines {
        line += 1;
        if !decode_line(line, extra)?.trim().is_empty() {
            return Err(PersistenceError::TrailingData { line });
        }
    }

    Ok((generation, NeuralNet::from_weights(weights.into_iter())))
}

pub fn save(path: impl AsRef<Path>, generation: u32, net: &NeuralNet) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let mut sink = BufWriter::new(File::create(path)?);
    write_record(&mut sink, generation, net)?;
    log::debug!("saved generation {generation} network to {}", path.display());
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<(u32, NeuralNet), PersistenceError> {
    let path = path.as_ref();
    let record = read_record(BufReader::new(File::open(path)?))?;
    log::debug!("loaded generation {} network from {}", record.0, path.display());
    Ok(record)
}

/// Like [`load`], but reads `fallback` when `path` does not exist.
pub fn load_or<R: BufRead>(
    path: impl AsRef<Path>,
    fallback: R,
) -> Result<(u32, NeuralNet), PersistenceError> {
    let path = path.as_ref();
    if path.exists() {
        load(path)
    } else {
        log::debug!("{} not found, reading fallback record", path.display());
        read_record(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use std::io::Cursor;

    fn sample_record(generation: u32) -> String {
        let mut text = format!("{generation}\n");
        for i in 0..NeuralNet::WEIGHT_COUNT {
            text.push_str(&format!("{}\n", i as f32 * 0.25 - 3.0));
        }
        text
    }

    #[test]
    fn round_trip_is_exact() {
        let mut rng = ChaCha12Rng::seed_from_u64(17);
        let net = NeuralNet::random(&mut rng);
        let mut buf = Vec::new();
        write_record(&mut buf, 37, &net).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.lines().count(), RECORD_LINES);
        assert_eq!(text.lines().next(), Some("37"));

        let (generation, loaded) = read_record(Cursor::new(buf)).unwrap();
        assert_eq!(generation, 37);
        assert_eq!(loaded.to_weight_vec(), net.to_weight_vec());
    }

    #[test]
    fn weights_are_written_hidden_major_then_output() {
        let net = NeuralNet::from_weights((0..NeuralNet::WEIGHT_COUNT).map(|i| i as f32));
        let mut buf = Vec::new();
        write_record(&mut buf, 0, &net).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "0");
        assert_eq!(lines[20], "19");
        assert_eq!(lines[21], "20");
        assert_eq!(lines[25], "24");
    }

    #[test]
    fn padded_lines_and_trailing_blank_lines_are_accepted() {
        let text = sample_record(4)
            .lines()
            .map(|l| format!("  {l} \r\n"))
            .collect::<String>()
            + "\n\n";
        let (generation, net) = read_record(Cursor::new(text)).unwrap();
        assert_eq!(generation, 4);
        assert_eq!(net.weights_in_hidden()[0], -3.0);
        assert_eq!(net.weights_hidden_out()[4], 3.0);
    }

    #[test]
    fn short_record_is_a_format_error() {
        let text: String = sample_record(1).lines().take(10).map(|l| format!("{l}\n")).collect();
        let err = read_record(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, PersistenceError::MissingLine { line: 11 }));
        assert!(err.is_format_error());
    }

    #[test]
    fn non_numeric_weight_is_a_format_error() {
        let text = sample_record(1).replacen("-2.75", "abc", 1);
        let err = read_record(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, PersistenceError::Parse { line: 3, ref value } if value == "abc"));
    }

    #[test]
    fn invalid_utf8_is_a_format_error() {
        let mut bytes = b"3\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        for _ in 0..NeuralNet::WEIGHT_COUNT - 1 {
            bytes.extend_from_slice(b"0.5\n");
        }
        let err = read_record(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, PersistenceError::Encoding { line: 2 }));
        assert!(err.is_format_error());
    }

    #[test]
    fn non_numeric_generation_is_a_format_error() {
        let text = sample_record(1).replacen("1\n", "one\n", 1);
        let err = read_record(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, PersistenceError::Parse { line: 1, .. }));
    }

    #[test]
    fn extra_values_are_a_format_error() {
        let text = sample_record(1) + "0.5\n";
        let err = read_record(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, PersistenceError::TrailingData { line: 27 }));
    }

    #[test]
    fn file_round_trip_and_fallback() {
        let dir = std::env::temp_dir().join(format!("neural-flappy-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("network.dat");
        let _ = std::fs::remove_file(&path);

        let (fallback_gen, _) = load_or(&path, Cursor::new(sample_record(9))).unwrap();
        assert_eq!(fallback_gen, 9);

        let mut rng = ChaCha12Rng::seed_from_u64(23);
        let net = NeuralNet::random(&mut rng);
        save(&path, 12, &net).unwrap();
        let (generation, loaded) = load_or(&path, Cursor::new(sample_record(9))).unwrap();
        assert_eq!(generation, 12);
        assert_eq!(loaded.to_weight_vec(), net.to_weight_vec());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load("/nonexistent/neural-flappy/network.dat").unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
        assert!(!err.is_format_error());
    }
}
