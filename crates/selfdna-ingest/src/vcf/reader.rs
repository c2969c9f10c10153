// VCF line reader and record parser

use super::{RecordResult, Result, VariantSource, VcfError, REQUIRED_FIELDS};
use flate2::read::MultiGzDecoder;
use selfdna_common::types::{VariantRecord, MISSING_VALUE};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const HEADER_PREFIX: char = '#';
const SAMPLE_HEADER_PREFIX: &str = "#CHROM";
/// CHROM..INFO plus FORMAT precede the sample columns
const SAMPLE_COLUMN_OFFSET: usize = 9;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where the bytes of a variant file come from
enum Origin {
    /// Re-opened for every pass
    File { path: PathBuf, gzip: bool },
    /// Held in memory for streams that cannot be rewound
    Buffered(Vec<u8>),
}

impl Origin {
    fn reader(&self) -> Result<Box<dyn BufRead + Send + '_>> {
        let reader: Box<dyn BufRead + Send + '_> = match self {
            Origin::File { path, gzip: false } => Box::new(BufReader::new(File::open(path)?)),
            Origin::File { path, gzip: true } => {
                Box::new(BufReader::new(MultiGzDecoder::new(File::open(path)?)))
            },
            Origin::Buffered(bytes) => Box::new(Cursor::new(bytes.as_slice())),
        };
        Ok(reader)
    }
}

/// A variant call file opened for reading
pub struct VcfSource {
    origin: Origin,
    samples: Vec<String>,
}

impl VcfSource {
    /// Open a VCF (plain or gzip/bgzip compressed) by path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let gzip = has_gzip_magic(&path)?;
        let origin = Origin::File { path, gzip };
        let samples = read_samples(origin.reader()?)?;

        if let Origin::File { path, gzip } = &origin {
            info!(
                path = %path.display(),
                gzip = gzip,
                samples = samples.len(),
                "Opened VCF file"
            );
        }

        Ok(Self { origin, samples })
    }

    /// Buffer a whole stream in memory so it can be read twice
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if bytes.starts_with(&GZIP_MAGIC) {
            let mut decoded = Vec::new();
            MultiGzDecoder::new(bytes.as_slice()).read_to_end(&mut decoded)?;
            bytes = decoded;
        }

        debug!(bytes = bytes.len(), "Buffered VCF stream");

        let origin = Origin::Buffered(bytes);
        let samples = read_samples(origin.reader()?)?;
        Ok(Self { origin, samples })
    }

    /// Path of a file-backed source
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::File { path, .. } => Some(path),
            Origin::Buffered(_) => None,
        }
    }
}

impl VariantSource for VcfSource {
    fn samples(&self) -> &[String] {
        &self.samples
    }

    fn count_records(&self) -> Result<u64> {
        let mut count = 0u64;
        for line in self.origin.reader()?.lines() {
            if is_data_line(&line?) {
                count += 1;
            }
        }
        debug!(count = count, "Counted VCF data lines");
        Ok(count)
    }

    fn records(&self) -> Result<VcfRecords<'_>> {
        Ok(VcfRecords {
            lines: self.origin.reader()?.lines(),
            line_number: 0,
        })
    }
}

/// Lazy sequence of parsed data lines
pub struct VcfRecords<'a> {
    lines: std::io::Lines<Box<dyn BufRead + Send + 'a>>,
    line_number: usize,
}

impl Iterator for VcfRecords<'_> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;

            if is_data_line(&line) {
                return Some(parse_line(&line, self.line_number));
            }
        }
    }
}

/// Parse one data line. `line_number` is 1-based and only used for errors.
pub fn parse_line(line: &str, line_number: usize) -> Result<VariantRecord> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.splitn(REQUIRED_FIELDS + 1, '\t').collect();

    if fields.len() < REQUIRED_FIELDS {
        return Err(VcfError::MalformedLine {
            line: line_number,
            found: fields.len(),
        });
    }

    Ok(VariantRecord {
        chromosome: fields[0].to_string(),
        position: parse_position(fields[1], line_number)?,
        identifier: fields[2].to_string(),
        reference: fields[3].to_string(),
        alternate: fields[4].to_string(),
        quality: parse_quality(fields[5], line_number)?,
        filter: fields[6].to_string(),
        info: fields[7].to_string(),
    })
}

/// Blank lines are data lines too, so they fail to parse instead of vanishing
fn is_data_line(line: &str) -> bool {
    !line.starts_with(HEADER_PREFIX)
}

/// Positions are stored as SQLite INTEGER, so they must also fit in i64
fn parse_position(value: &str, line: usize) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(pos) if pos > 0 && i64::try_from(pos).is_ok() => Ok(pos),
        _ => Err(VcfError::InvalidPosition {
            line,
            value: value.to_string(),
        }),
    }
}

fn parse_quality(value: &str, line: usize) -> Result<Option<f64>> {
    let value = value.trim();
    if value == MISSING_VALUE {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(qual) if qual.is_finite() => Ok(Some(qual)),
        _ => Err(VcfError::InvalidQuality {
            line,
            value: value.to_string(),
        }),
    }
}

fn read_samples(reader: Box<dyn BufRead + Send + '_>) -> Result<Vec<String>> {
    for line in reader.lines() {
        let line = line?;
        if line.starts_with(SAMPLE_HEADER_PREFIX) {
            return Ok(line
                .trim_end_matches(['\r', '\n'])
                .split('\t')
                .skip(SAMPLE_COLUMN_OFFSET)
                .map(str::to_string)
                .collect());
        }
        if !line.starts_with(HEADER_PREFIX) {
            break;
        }
    }
    Ok(Vec::new())
}

fn has_gzip_magic(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < magic.len() {
        let n = file.read(&mut magic[read..])?;
        if n == 0 {
            return Ok(false);
        }
        read += n;
    }
    Ok(magic == GZIP_MAGIC)
}
