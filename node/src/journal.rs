//! Append-only audit log of every delivered message, in arrival order.
//!
//! One JSON object per line. Component errors caught by the validator loop are
//! journaled as diagnostics alongside the messages they interleave with.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use dirchain_messages::Message;
use dirchain_types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::NodeError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum JournalRecord {
    Message {
        seq: u64,
        arrival_ms: u64,
        /// Height being built when the message arrived.
        height: u32,
        local: bool,
        /// Hex of the marshalled message.
        message: String,
    },
    Diagnostic {
        seq: u64,
        arrival_ms: u64,
        component: String,
        error: String,
    },
}

impl JournalRecord {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Message { seq, .. } | Self::Diagnostic { seq, .. } => *seq,
        }
    }

    /// Decode a message record back into a [`Message`], restoring its local
    /// flag. Diagnostics yield `None`.
    pub fn decode_message(&self) -> Result<Option<(u32, Message)>, NodeError> {
        let Self::Message {
            height,
            local,
            message,
            ..
        } = self
        else {
            return Ok(None);
        };
        let raw = hex::decode(message)
            .map_err(|e| NodeError::Journal(format!("record {}: {e}", self.seq())))?;
        let msg = Message::unmarshal(&raw)?.with_local(*local);
        Ok(Some((*height, msg)))
    }
}

enum Sink {
    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
    Memory(Vec<JournalRecord>),
    Disabled,
}

pub struct Journal {
    sink: Sink,
    next_seq: u64,
}

impl Journal {
    /// Open (or create) a journal file for appending. Sequence numbers
    /// continue after the last record already in the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref().to_path_buf();
        let next_seq = if path.exists() {
            read_journal(&path)?.last().map_or(0, |r| r.seq() + 1)
        } else {
            0
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), next_seq, "journal opened");
        Ok(Self {
            sink: Sink::File {
                path,
                writer: BufWriter::new(file),
            },
            next_seq,
        })
    }

    /// Journal kept in memory, for tests.
    pub fn memory() -> Self {
        Self {
            sink: Sink::Memory(Vec::new()),
            next_seq: 0,
        }
    }

    pub fn disabled() -> Self {
        Self {
            sink: Sink::Disabled,
            next_seq: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.sink, Sink::Disabled)
    }

    pub fn record_message(
        &mut self,
        message: &Message,
        arrival: Timestamp,
        height: u32,
    ) -> Result<u64, NodeError> {
        let seq = self.next_seq;
        self.append(JournalRecord::Message {
            seq,
            arrival_ms: arrival.as_millis(),
            height,
            local: message.local,
            message: hex::encode(message.marshal()),
        })?;
        Ok(seq)
    }

    pub fn record_diagnostic(
        &mut self,
        component: &str,
        error: &str,
        arrival: Timestamp,
    ) -> Result<u64, NodeError> {
        let seq = self.next_seq;
        self.append(JournalRecord::Diagnostic {
            seq,
            arrival_ms: arrival.as_millis(),
            component: component.to_string(),
            error: error.to_string(),
        })?;
        Ok(seq)
    }

    /// Records held by an in-memory journal; empty for other sinks.
    pub fn records(&self) -> &[JournalRecord] {
        match &self.sink {
            Sink::Memory(records) => records,
            _ => &[],
        }
    }

    pub fn flush(&mut self) -> Result<(), NodeError> {
        if let Sink::File { writer, .. } = &mut self.sink {
            writer.flush()?;
        }
        Ok(())
    }

    fn append(&mut self, record: JournalRecord) -> Result<(), NodeError> {
        match &mut self.sink {
            Sink::File { path, writer } => {
                let line = serde_json::to_string(&record)
                    .map_err(|e| NodeError::Journal(e.to_string()))?;
                writeln!(writer, "{line}")
                    .and_then(|()| writer.flush())
                    .map_err(|e| NodeError::Journal(format!("{}: {e}", path.display())))?;
            }
            Sink::Memory(records) => records.push(record),
            Sink::Disabled => return Ok(()),
        }
        self.next_seq += 1;
        Ok(())
    }
}

/// Read every record of a journal file in order.
pub fn read_journal(path: impl AsRef<Path>) -> Result<Vec<JournalRecord>, NodeError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            NodeError::Journal(format!("{}:{}: {e}", path.display(), n + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirchain_messages::MessageBody;
    use dirchain_types::{Hash32, NetworkId};

    fn message(raw: u8) -> Message {
        Message::new(
            NetworkId::Local,
            Timestamp::from_millis(5),
            Hash32::ZERO,
            MessageBody::FactoidTransaction { raw: vec![raw] },
        )
    }

    #[test]
    fn file_journal_round_trips_and_continues_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let mut journal = Journal::open(&path).unwrap();
        journal
            .record_message(&message(1).with_local(true), Timestamp::from_millis(10), 0)
            .unwrap();
        journal
            .record_diagnostic("timer", "boom", Timestamp::from_millis(11))
            .unwrap();
        drop(journal);

        let mut journal = Journal::open(&path).unwrap();
        let seq = journal
            .record_message(&message(2), Timestamp::from_millis(12), 1)
            .unwrap();
        assert_eq!(seq, 2);
        drop(journal);

        let records = read_journal(&path).unwrap();
        assert_eq!(records.len(), 3);
        let (height, first) = records[0].decode_message().unwrap().unwrap();
        assert_eq!(height, 0);
        assert!(first.local);
        assert_eq!(first, message(1).with_local(true));
        assert!(records[1].decode_message().unwrap().is_none());
        assert!(matches!(records[1], JournalRecord::Diagnostic { ref component, .. } if component == "timer"));
    }

    #[test]
    fn corrupt_line_is_a_journal_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();
        assert!(matches!(read_journal(&path), Err(NodeError::Journal(_))));
    }

    #[test]
    fn disabled_journal_records_nothing() {
        let mut journal = Journal::disabled();
        journal
            .record_message(&message(1), Timestamp::from_millis(1), 0)
            .unwrap();
        assert!(journal.records().is_empty());
        assert!(!journal.is_enabled());
    }
}
