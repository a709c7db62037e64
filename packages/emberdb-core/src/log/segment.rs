//! Segmented append-only log: a directory of files named by decimal
//! segment index, the highest-indexed file being the active tail.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::actions::Action;
use crate::config::FlushPolicy;
use crate::error::DbResult;

use super::record::Record;

struct ActiveSegment {
    index: u64,
    writer: BufWriter<File>,
    size: u64,
}

pub struct Log {
    dir: PathBuf,
    active: ActiveSegment,
    max_seg_size: u64,
    flush_policy: FlushPolicy,
}

fn segment_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(index.to_string())
}

fn list_segment_indices(dir: &Path) -> DbResult<Vec<u64>> {
    let mut indices = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(idx) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) {
            indices.push(idx);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

impl Log {
    pub fn open(dir: impl AsRef<Path>, max_seg_size: u64, flush_policy: FlushPolicy) -> DbResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let indices = list_segment_indices(&dir)?;
        let active_index = indices.last().copied().unwrap_or(0);
        if indices.is_empty() {
            // create-new + rename avoids leaving a partially-initialized
            // segment visible to a concurrent `open`.
            let tmp = dir.join(format!(".{active_index}.tmp"));
            File::create(&tmp)?;
            fs::rename(&tmp, segment_path(&dir, active_index))?;
        }
        let path = segment_path(&dir, active_index);
        let size = fs::metadata(&path)?.len();
        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Log {
            dir,
            active: ActiveSegment { index: active_index, writer: BufWriter::new(file), size },
            max_seg_size,
            flush_policy,
        })
    }

    fn seal_and_roll(&mut self) -> DbResult<()> {
        self.active.writer.flush()?;
        let next_index = self.active.index + 1;
        let path = segment_path(&self.dir, next_index);
        let tmp = self.dir.join(format!(".{next_index}.tmp"));
        File::create(&tmp)?;
        fs::rename(&tmp, &path)?;
        let file = OpenOptions::new().append(true).open(&path)?;
        self.active = ActiveSegment { index: next_index, writer: BufWriter::new(file), size: 0 };
        Ok(())
    }

    pub fn append(&mut self, action: Action) -> DbResult<()> {
        let record = Record::new(action);
        let framed = record.encode()?;
        if self.active.size > 0 && self.active.size + framed.len() as u64 > self.max_seg_size {
            self.seal_and_roll()?;
        }
        self.active.writer.write_all(&framed)?;
        self.active.size += framed.len() as u64;
        match self.flush_policy {
            FlushPolicy::NoFlush => {}
            FlushPolicy::EveryWrite => {
                self.active.writer.flush()?;
                self.active.writer.get_ref().sync_data()?;
            }
            FlushPolicy::EveryNMillis(_) => {
                self.active.writer.flush()?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> DbResult<()> {
        self.active.writer.flush()?;
        Ok(())
    }

    /// Iterates every record across every segment, in segment-index then
    /// intra-segment order -- i.e. commit order.
    pub fn iter_records(&self) -> DbResult<LogIterator> {
        let mut indices = list_segment_indices(&self.dir)?;
        indices.sort_unstable();
        LogIterator::new(self.dir.clone(), indices)
    }

    pub fn active_index(&self) -> u64 {
        self.active.index
    }
}

pub struct LogIterator {
    dir: PathBuf,
    indices: Vec<u64>,
    cursor: usize,
    reader: Option<BufReader<File>>,
}

impl LogIterator {
    fn new(dir: PathBuf, indices: Vec<u64>) -> DbResult<Self> {
        Ok(LogIterator { dir, indices, cursor: 0, reader: None })
    }

    fn open_next(&mut self) -> DbResult<bool> {
        if self.cursor >= self.indices.len() {
            return Ok(false);
        }
        let path = segment_path(&self.dir, self.indices[self.cursor]);
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(0))?;
        self.reader = Some(BufReader::new(file));
        self.cursor += 1;
        Ok(true)
    }
}

impl Iterator for LogIterator {
    type Item = DbResult<Action>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.reader.is_none() {
                match self.open_next() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }
            let reader = self.reader.as_mut().unwrap();
            match Record::read_from(reader) {
                Ok(Some(record)) => return Some(Ok(record.action)),
                Ok(None) => {
                    self.reader = None;
                    continue;
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_then_iterate_round_trip() {
        let dir = tempdir().unwrap();
        let mut log = Log::open(dir.path(), 20 * 1024 * 1024, FlushPolicy::NoFlush).unwrap();
        log.append(Action::SetString { key: "a".to_string(), value: vec![1] }).unwrap();
        log.append(Action::SetString { key: "b".to_string(), value: vec![2] }).unwrap();
        log.flush().unwrap();

        let actions: Vec<Action> = log.iter_records().unwrap().collect::<DbResult<_>>().unwrap();
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn seals_segment_once_max_size_exceeded() {
        let dir = tempdir().unwrap();
        let mut log = Log::open(dir.path(), 64, FlushPolicy::NoFlush).unwrap();
        for i in 0..50 {
            log.append(Action::SetString { key: format!("k{i}"), value: vec![0; 20] }).unwrap();
        }
        log.flush().unwrap();
        let indices = list_segment_indices(dir.path()).unwrap();
        assert!(indices.len() > 1);
        let actions: Vec<Action> = log.iter_records().unwrap().collect::<DbResult<_>>().unwrap();
        assert_eq!(actions.len(), 50);
    }

    #[test]
    fn reopen_continues_on_same_active_segment() {
        let dir = tempdir().unwrap();
        {
            let mut log = Log::open(dir.path(), 20 * 1024 * 1024, FlushPolicy::EveryWrite).unwrap();
            log.append(Action::SetString { key: "a".to_string(), value: vec![1] }).unwrap();
        }
        let mut log = Log::open(dir.path(), 20 * 1024 * 1024, FlushPolicy::NoFlush).unwrap();
        log.append(Action::SetString { key: "b".to_string(), value: vec![2] }).unwrap();
        log.flush().unwrap();
        let actions: Vec<Action> = log.iter_records().unwrap().collect::<DbResult<_>>().unwrap();
        assert_eq!(actions.len(), 2);
    }
}
