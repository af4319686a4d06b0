//! Stage directories and part files

use super::{read_records, StoreError, StoreResult};
use crate::engine::{Partitioner, RecordKey, RecordValue, ShuffleOutput, StageOutput};
use crate::stages::TriangleReport;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REPORT_FILE: &str = "report.txt";
pub const REPORT_JSON_FILE: &str = "report.json";
const COUNTERS_FILE: &str = "counters.json";

/// Part file name of reducer `index`
fn part_name(index: usize) -> String {
    format!("part-{:05}", index)
}

pub(super) fn is_part_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("part-"))
}

/// Remove a file or directory tree, ignoring one that does not exist
fn remove_path(path: &Path) -> StoreResult<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

/// Write one `part-NNNNN` file per partition into `dir`, creating it.
///
/// Part files already in `dir` are removed first, so the directory never
/// holds more parts than were written.
pub fn write_parts(dir: impl AsRef<Path>, parts: &[Vec<String>]) -> StoreResult<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut stale = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_part_file(&path) {
            fs::remove_file(&path)?;
            stale += 1;
        }
    }
    if stale > 0 {
        debug!("Removed {} stale part files from {:?}", stale, dir);
    }
    for (index, lines) in parts.iter().enumerate() {
        let mut writer = BufWriter::new(File::create(dir.join(part_name(index)))?);
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
    }
    debug!("Wrote {} part files to {:?}", parts.len(), dir);
    Ok(())
}

/// Route lines to partitions by their first whitespace-separated token
pub fn partition_lines<I, S>(lines: I, partitioner: &Partitioner) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parts: Vec<Vec<String>> = (0..partitioner.reducers()).map(|_| Vec::new()).collect();
    for line in lines {
        let line = line.into();
        let key = line.split_whitespace().next().unwrap_or_default();
        let index = partitioner.partition(key);
        parts[index].push(line);
    }
    parts
}

/// Work directory holding the materialized output of every stage
#[derive(Debug, Clone)]
pub struct StageStore {
    root: PathBuf,
}

impl StageStore {
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("Stage store at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.root.join(stage)
    }

    pub fn has_stage(&self, stage: &str) -> bool {
        self.stage_dir(stage).is_dir()
    }

    /// Materialize a complete stage output, replacing any earlier run of it
    pub fn write(&self, output: &StageOutput) -> StoreResult<PathBuf> {
        let dir = self.stage_dir(output.stage());
        let tmp = self.root.join(format!(".{}.tmp", output.stage()));
        if tmp.exists() {
            fs::remove_dir_all(&tmp)?;
        }

        write_parts(&tmp, output.parts())?;
        let counters = serde_json::to_vec_pretty(output.counters())?;
        fs::write(tmp.join(COUNTERS_FILE), counters)?;

        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::rename(&tmp, &dir)?;
        info!(
            "Stage {}: materialized {} records in {} parts at {:?}",
            output.stage(),
            output.counters().output_records,
            output.parts().len(),
            dir
        );
        Ok(dir)
    }

    /// Dump a stage's intermediate map output, one part file per reducer
    pub fn write_shuffle<K: RecordKey, V: RecordValue>(
        &self,
        shuffle: &ShuffleOutput<K, V>,
    ) -> StoreResult<PathBuf> {
        let dir = self.root.join(format!("{}.shuffle", shuffle.stage()));
        self.clear_shuffle(shuffle.stage())?;
        write_parts(&dir, &shuffle.render())?;
        Ok(dir)
    }

    /// All records of a materialized stage, in part order
    pub fn read(&self, stage: &str) -> StoreResult<Vec<String>> {
        let dir = self.stage_dir(stage);
        if !dir.is_dir() {
            return Err(StoreError::MissingStage {
                stage: stage.to_string(),
                path: dir,
            });
        }
        read_records(&dir)
    }

    /// Remove everything an earlier run left for `stages`, plus its report.
    ///
    /// Called before a run starts, so an aborted run never sits next to a
    /// previous run's later stages or report.
    pub fn clear_run(&self, stages: &[&str]) -> StoreResult<()> {
        for stage in stages {
            remove_path(&self.stage_dir(stage))?;
            remove_path(&self.root.join(format!(".{}.tmp", stage)))?;
            self.clear_shuffle(stage)?;
        }
        for file in [REPORT_FILE, REPORT_JSON_FILE] {
            let path = self.root.join(file);
            remove_path(&path)?;
            remove_path(&path.with_extension("tmp"))?;
        }
        debug!("Cleared earlier run output under {:?}", self.root);
        Ok(())
    }

    /// Remove the intermediate dump of `stage`
    pub fn clear_shuffle(&self, stage: &str) -> StoreResult<()> {
        remove_path(&self.root.join(format!("{}.shuffle", stage)))
    }

    /// Write the text and JSON report; called only after every stage succeeded
    pub fn write_report(&self, report: &TriangleReport) -> StoreResult<PathBuf> {
        let path = self.root.join(REPORT_FILE);
        write_atomic(&path, report.to_string().as_bytes())?;
        write_atomic(
            &self.root.join(REPORT_JSON_FILE),
            &serde_json::to_vec_pretty(report)?,
        )?;
        info!("Report written to {:?}", path);
        Ok(path)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
