use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot};

use crate::engine::EngineError;
use crate::limits::MAX_JOURNAL_RECORD_LEN;
use crate::model::EnrollmentEvent;

/// Frame one event as `[u32 len][bincode payload][u32 crc32]`.
/// Events that would not fit in a record are refused here, so every record on disk is readable.
fn frame_event(event: &EnrollmentEvent) -> io::Result<Vec<u8>> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_JOURNAL_RECORD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("journal record of {} bytes exceeds limit", payload.len()),
        ));
    }
    let mut frame = Vec::with_capacity(payload.len() + 8);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(frame)
}

/// Which audit records a query returns. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub course_id: Option<String>,
    pub student_id: Option<String>,
}

impl AuditFilter {
    pub fn course(course_id: impl Into<String>) -> Self {
        Self {
            course_id: Some(course_id.into()),
            student_id: None,
        }
    }

    pub fn student(student_id: impl Into<String>) -> Self {
        Self {
            course_id: None,
            student_id: Some(student_id.into()),
        }
    }

    pub fn matches(&self, event: &EnrollmentEvent) -> bool {
        if let Some(course_id) = &self.course_id
            && event.course_id() != course_id
        {
            return false;
        }
        match &self.student_id {
            Some(student_id) => event.student_id() == Some(student_id.as_str()),
            None => true,
        }
    }
}

/// Sequential reader over journal records. Stops cleanly at the end of the file
/// or at the first truncated, oversized or corrupt record.
struct RecordReader<R> {
    inner: R,
}

impl<R: Read> RecordReader<R> {
    fn new(inner: R) -> Self {
        Self { inner }
    }

    /// `Ok(false)` when the stream ended before `buf` was filled.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn next_event(&mut self) -> io::Result<Option<EnrollmentEvent>> {
        let mut len_buf = [0u8; 4];
        if !self.fill(&mut len_buf)? {
            return Ok(None);
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_JOURNAL_RECORD_LEN {
            tracing::warn!("journal record claims {len} bytes; treating as corrupt tail");
            return Ok(None);
        }

        let mut payload = vec![0u8; len];
        let mut crc_buf = [0u8; 4];
        if !self.fill(&mut payload)? || !self.fill(&mut crc_buf)? {
            return Ok(None);
        }
        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
            return Ok(None);
        }
        Ok(bincode::deserialize(&payload).ok())
    }
}

/// Append-only audit journal of enrollment decisions.
///
/// Each record is one `EnrollmentEvent`, framed by `frame_event`. A crash can leave a
/// partial last record; readers drop it. The engine never replays the journal: it is
/// the audit trail that `query` answers from, not a source of state.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends: u64,
}

impl Journal {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends: 0,
        })
    }

    /// Open the journal and hand it to a background group-commit writer.
    /// Must be called from within a Tokio runtime.
    pub fn spawn(path: &Path) -> io::Result<JournalHandle> {
        let journal = Self::open(path)?;
        let (tx, rx) = mpsc::channel(4096);
        tokio::spawn(writer_loop(journal, rx));
        Ok(JournalHandle { tx })
    }

    #[cfg(test)]
    pub fn append(&mut self, event: &EnrollmentEvent) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Buffer one record; durable only after `flush_sync`.
    pub fn append_buffered(&mut self, event: &EnrollmentEvent) -> io::Result<()> {
        self.writer.write_all(&frame_event(event)?)?;
        self.appends += 1;
        Ok(())
    }

    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle since it was opened.
    pub fn appends(&self) -> u64 {
        self.appends
    }

    /// Every readable record, oldest first. A missing file is an empty journal.
    pub fn read_all(path: &Path) -> io::Result<Vec<EnrollmentEvent>> {
        Self::query(path, &AuditFilter::default())
    }

    /// Records matching `filter`, oldest first.
    pub fn query(path: &Path, filter: &AuditFilter) -> io::Result<Vec<EnrollmentEvent>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut reader = RecordReader::new(BufReader::new(file));
        let mut events = Vec::new();
        while let Some(event) = reader.next_event()? {
            if filter.matches(&event) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

type PendingAppend = (EnrollmentEvent, oneshot::Sender<io::Result<()>>);

/// Cloneable sender side of the background journal writer.
#[derive(Clone)]
pub struct JournalHandle {
    tx: mpsc::Sender<PendingAppend>,
}

impl JournalHandle {
    /// Resolves once the event is durably on disk.
    pub async fn append(&self, event: EnrollmentEvent) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send((event, tx))
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }
}

/// Background task that owns the journal and batches appends for group commit.
/// 1. Block until the first append arrives.
/// 2. Drain all immediately available appends (the batch window).
/// 3. Single flush_sync for the whole batch.
/// 4. Respond to all senders.
async fn writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<PendingAppend>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        metrics::histogram!(crate::observability::JOURNAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = flush_batch(&mut journal, &batch);
        metrics::histogram!(crate::observability::JOURNAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());

        for (_, tx) in batch {
            let r = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            };
            let _ = tx.send(r);
        }
    }
    tracing::debug!("journal writer for {} stopped", journal.path().display());
}

fn flush_batch(journal: &mut Journal, batch: &[PendingAppend]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = journal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush, even on append error, so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = journal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}
