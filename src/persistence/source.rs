//! Reading record streams from disk

use super::store::is_part_file;
use super::StoreResult;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the raw edge list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeSource {
    /// Edge lines already in memory
    Lines(Vec<String>),
    /// A plain or gzip file, or a directory of part files
    File(PathBuf),
}

impl EdgeSource {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EdgeSource::Lines(lines.into_iter().map(Into::into).collect())
    }

    pub fn load(self) -> StoreResult<Vec<String>> {
        match self {
            EdgeSource::Lines(lines) => Ok(lines),
            EdgeSource::File(path) => {
                let lines = read_records(&path)?;
                info!("Loaded {} edge records from {:?}", lines.len(), path);
                Ok(lines)
            }
        }
    }
}

impl From<PathBuf> for EdgeSource {
    fn from(path: PathBuf) -> Self {
        EdgeSource::File(path)
    }
}

/// Read every line of a record stream.
///
/// A directory is read as its `part-*` files in name order; a `.gz` file is
/// decompressed; anything else is read as plain text.
pub fn read_records(path: impl AsRef<Path>) -> StoreResult<Vec<String>> {
    let path = path.as_ref();
    if path.is_dir() {
        let mut parts: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_part_file(p))
            .collect();
        parts.sort();
        debug!("Reading {} part files from {:?}", parts.len(), path);

        let mut lines = Vec::new();
        for part in parts {
            lines.extend(read_lines(File::open(&part)?)?);
        }
        return Ok(lines);
    }

    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        read_lines(GzDecoder::new(file))
    } else {
        read_lines(file)
    }
}

/// Split a stream into lines without failing on invalid UTF-8.
///
/// Undecodable bytes become U+FFFD, which no vertex token accepts, so such a
/// line reaches the mappers as an ordinary malformed record.
fn read_lines(reader: impl Read) -> StoreResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut undecodable = 0usize;
    for line in BufReader::new(reader).split(b'\n') {
        let mut bytes = line?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        match String::from_utf8(bytes) {
            Ok(line) => lines.push(line),
            Err(err) => {
                undecodable += 1;
                lines.push(String::from_utf8_lossy(err.as_bytes()).into_owned());
            }
        }
    }
    if undecodable > 0 {
        warn!("{} lines are not valid UTF-8", undecodable);
    }
    Ok(lines)
}
