use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::{info, warn};
use needletail::parse_fastx_file;
use needletail::parser::Format;

/// Bytes inspected when sniffing a file's format
pub const SNIFF_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

impl fmt::Display for SequenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SequenceFormat::Fasta => write!(f, "fasta"),
            SequenceFormat::Fastq => write!(f, "fastq"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SequenceError {
    ReadError,
    /// Input is not text at all
    BinaryInput,
    /// Text, but not recognisably FASTA or FASTQ
    UnknownFormat,
    /// Recognised format differs from the expected one
    WrongFormat,
    /// A record failed to parse
    InvalidRecord,
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SequenceError::ReadError => write!(f, "sequence file could not be read"),
            SequenceError::BinaryInput => write!(f, "sequence file contains binary data"),
            SequenceError::UnknownFormat => {
                write!(f, "sequence file does not look like DNA FASTA or FASTQ")
            }
            SequenceError::WrongFormat => {
                write!(f, "sequence file is not in the expected format")
            }
            SequenceError::InvalidRecord => write!(f, "sequence file has a malformed record"),
        }
    }
}

impl std::error::Error for SequenceError {}

/// Classify a stream by inspecting a fixed-size prefix.
///
/// The stream position is reset to the start after peeking. Binary input is
/// rejected before classification.
pub fn sniff_format<R: Read + Seek>(input: &mut R) -> Result<SequenceFormat, SequenceError> {
    let mut buf = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..]).map_err(|err| {
            warn!("Can't read sequence stream: {err}");
            SequenceError::ReadError
        })?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    input
        .seek(SeekFrom::Start(0))
        .map_err(|_| SequenceError::ReadError)?;

    let prefix = &buf[..filled];
    if prefix.is_empty() {
        return Err(SequenceError::UnknownFormat);
    }
    if prefix.contains(&0) {
        return Err(SequenceError::BinaryInput);
    }
    // A truncated multi-byte sequence at the end of the window is still
    // binary as far as these formats are concerned: both are ASCII.
    let text = std::str::from_utf8(prefix).map_err(|_| SequenceError::BinaryInput)?;
    classify_prefix(text)
}

fn classify_prefix(text: &str) -> Result<SequenceFormat, SequenceError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let first = lines.next().ok_or(SequenceError::UnknownFormat)?;
    if first.starts_with('>') {
        return Ok(SequenceFormat::Fasta);
    }
    if first.starts_with('@') {
        // FASTQ interleaves a `+` separator as the third line of each record
        let separator = lines.nth(1);
        return match separator {
            Some(line) if line.starts_with('+') => Ok(SequenceFormat::Fastq),
            // Window ended inside the first record; the header is enough
            None => Ok(SequenceFormat::Fastq),
            Some(_) => Err(SequenceError::UnknownFormat),
        };
    }
    Err(SequenceError::UnknownFormat)
}

/// Sniff the file, require `expected`, then parse every record
pub fn validate(path: &Path, expected: SequenceFormat) -> Result<(), SequenceError> {
    let mut file = File::open(path).map_err(|err| {
        warn!("Can't open sequence file {}: {err}", path.display());
        SequenceError::ReadError
    })?;
    let sniffed = sniff_format(&mut file)?;
    if sniffed != expected {
        warn!(
            "{} looks like {sniffed}, expected {expected}",
            path.display()
        );
        return Err(SequenceError::WrongFormat);
    }
    drop(file);

    let mut reader = parse_fastx_file(path).map_err(|err| {
        warn!("Can't parse {}: {err}", path.display());
        SequenceError::InvalidRecord
    })?;
    let mut records: u64 = 0;
    while let Some(record) = reader.next() {
        let record = record.map_err(|err| {
            warn!("Malformed record in {}: {err}", path.display());
            SequenceError::InvalidRecord
        })?;
        let format = match record.format() {
            Format::Fasta => SequenceFormat::Fasta,
            Format::Fastq => SequenceFormat::Fastq,
        };
        if format != expected {
            return Err(SequenceError::WrongFormat);
        }
        records += 1;
    }
    info!(
        "{} validated as {expected} ({records} records)",
        path.display()
    );
    Ok(())
}

pub fn validate_fasta(path: &Path) -> Result<(), SequenceError> {
    validate(path, SequenceFormat::Fasta)
}

pub fn validate_fastq(path: &Path) -> Result<(), SequenceError> {
    validate(path, SequenceFormat::Fastq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    const FASTA: &str = ">seq1 test record\nACGTACGTACGT\n>seq2\nTTTTACGT\n";
    const FASTQ: &str = "@read1\nACGT\n+\nIIII\n@read2\nTTGA\n+\nIIII\n";

    #[test]
    fn sniffs_fasta() {
        let mut cursor = Cursor::new(FASTA.as_bytes().to_vec());
        assert_eq!(sniff_format(&mut cursor).unwrap(), SequenceFormat::Fasta);
        // position reset after peeking
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn sniffs_fastq() {
        let mut cursor = Cursor::new(FASTQ.as_bytes().to_vec());
        assert_eq!(sniff_format(&mut cursor).unwrap(), SequenceFormat::Fastq);
    }

    #[test]
    fn rejects_binary_input() {
        let mut cursor = Cursor::new(vec![0x1f, 0x8b, 0x08, 0x00, 0x42]);
        assert_eq!(
            sniff_format(&mut cursor).unwrap_err(),
            SequenceError::BinaryInput
        );
        let mut with_nul = Cursor::new(b">seq\nAC\0GT\n".to_vec());
        assert_eq!(
            sniff_format(&mut with_nul).unwrap_err(),
            SequenceError::BinaryInput
        );
    }

    #[test]
    fn rejects_plain_text() {
        let mut cursor = Cursor::new(b"hello world\nnot a sequence\n".to_vec());
        assert_eq!(
            sniff_format(&mut cursor).unwrap_err(),
            SequenceError::UnknownFormat
        );
    }

    #[test]
    fn rejects_empty_input() {
        let mut cursor = Cursor::new(Vec::new());
        assert_eq!(
            sniff_format(&mut cursor).unwrap_err(),
            SequenceError::UnknownFormat
        );
    }

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn validates_fasta_file() {
        let file = write_temp(FASTA);
        assert!(validate_fasta(file.path()).is_ok());
    }

    #[test]
    fn validates_fastq_file() {
        let file = write_temp(FASTQ);
        assert!(validate_fastq(file.path()).is_ok());
    }

    #[test]
    fn fasta_is_not_fastq() {
        let file = write_temp(FASTA);
        assert_eq!(
            validate_fastq(file.path()).unwrap_err(),
            SequenceError::WrongFormat
        );
    }

    #[test]
    fn truncated_fastq_record_fails() {
        let file = write_temp("@read1\nACGT\n+\nII");
        assert_eq!(
            validate_fastq(file.path()).unwrap_err(),
            SequenceError::InvalidRecord
        );
    }
}
