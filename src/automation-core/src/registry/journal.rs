//! Append-only persistence for registry and subscription records.
//!
//! Stores append a record before applying it in memory and rebuild themselves by replaying
//! the journal in order.

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::AutomationError;

pub trait Journal<R>: Send {
    fn append(&mut self, record: &R) -> Result<(), AutomationError>;

    /// Every record appended so far, oldest first.
    fn records(&self) -> Result<Vec<R>, AutomationError>;
}

#[derive(Clone, Debug)]
pub struct MemoryJournal<R> {
    records: Vec<R>,
}

impl<R> Default for MemoryJournal<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R: Clone + Send> Journal<R> for MemoryJournal<R> {
    fn append(&mut self, record: &R) -> Result<(), AutomationError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<R>, AutomationError> {
        Ok(self.records.clone())
    }
}

/// JSON-lines file journal, one record per line.
#[derive(Debug)]
pub struct FileJournal<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> FileJournal<R> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref().to_path_buf();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| journal_err(&path, e))?;
        Ok(Self {
            path,
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Serialize + DeserializeOwned> Journal<R> for FileJournal<R> {
    fn append(&mut self, record: &R) -> Result<(), AutomationError> {
        let mut line =
            serde_json::to_string(record).map_err(|e| AutomationError::Journal(e.to_string()))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| journal_err(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| journal_err(&self.path, e))
    }

    fn records(&self) -> Result<Vec<R>, AutomationError> {
        let file = File::open(&self.path).map_err(|e| journal_err(&self.path, e))?;
        let mut out = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| journal_err(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                AutomationError::Journal(format!("{}:{}: {e}", self.path.display(), n + 1))
            })?;
            out.push(record);
        }
        Ok(out)
    }
}

fn journal_err(path: &Path, err: std::io::Error) -> AutomationError {
    AutomationError::Journal(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Rec {
        id: u64,
        name: String,
    }

    #[test]
    fn file_journal_replays_in_order() {
        let path = std::env::temp_dir().join(format!(
            "automation-journal-{}-{}.jsonl",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);

        let mut journal = FileJournal::<Rec>::open(&path).unwrap();
        let a = Rec { id: 0, name: "a".into() };
        let b = Rec { id: 1, name: "b".into() };
        journal.append(&a).unwrap();
        journal.append(&b).unwrap();

        let reopened = FileJournal::<Rec>::open(&path).unwrap();
        assert_eq!(reopened.records().unwrap(), vec![a, b]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn memory_journal_keeps_records() {
        let mut journal = MemoryJournal::default();
        journal.append(&7u64).unwrap();
        assert_eq!(journal.records().unwrap(), vec![7u64]);
    }
}
