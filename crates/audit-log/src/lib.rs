//! Tamper-evident audit journal.
//!
//! Entries are appended to a line-delimited JSON file and chained by
//! `hash = SHA256(previousHash ‖ canonical(entry without hash))`, the first
//! entry anchored at the 64-zero genesis hash. Deleting, reordering or
//! editing any past line breaks recomputation and is caught by
//! [`AuditLog::verify_full`].
//!
//! Failure discipline: a failed file write never corrupts the in-memory
//! chain. The entry is kept in memory, the failure is logged at `warn`, and
//! the log reports itself degraded via [`AuditLog::is_degraded`]. A
//! malformed line encountered while opening aborts construction with an
//! error rather than silently restarting the chain.

#![deny(unsafe_code)]

use qanun_core::canon::{chain_hash, GENESIS_HASH};
use qanun_core::ids;
use qanun_core::report::ComplianceReport;
use qanun_core::types::{Action, Decision, Rule};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// Errors emitted by the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("journal io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal entry could not be encoded: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("malformed journal line {line}")]
    MalformedLine { line: usize },
}

/// One link in the hash chain. Field order matches the journal layout:
/// `id, timestamp, input, output, rule, previousHash, hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    /// ISO-8601 UTC with millisecond precision.
    pub timestamp: String,
    /// The facts as seen by the engine.
    pub input: Value,
    /// The decision taken.
    pub output: Decision,
    /// Snapshot of the matched rule, if any.
    pub rule: Option<Rule>,
    /// 64-hex chain pointer; genesis is all zeros.
    pub previous_hash: String,
    /// 64-hex SHA-256 over `previousHash ‖ canonical(entry without hash)`.
    pub hash: String,
    /// Attached after append by the compliance layer; never part of the
    /// hash pre-image or the journal line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceReport>,
}

impl AuditEntry {
    /// The hash pre-image: every persisted field except `hash`, in
    /// canonical order.
    #[must_use]
    pub fn pre_image(&self) -> Value {
        json!({
            "id": self.id,
            "timestamp": self.timestamp,
            "input": self.input,
            "output": self.output,
            "rule": self.rule,
            "previousHash": self.previous_hash,
        })
    }
}

/// Conjunctive filter for [`AuditLog::query`] and
/// [`AuditLog::query_from_disk`]. Date bounds are inclusive ISO-8601
/// strings; absent fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub result: Option<Action>,
}

impl AuditFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(start) = &self.start_date {
            if entry.timestamp < *start {
                return false;
            }
        }
        if let Some(end) = &self.end_date {
            if entry.timestamp > *end {
                return false;
            }
        }
        if let Some(result) = self.result {
            if entry.output.result != result {
                return false;
            }
        }
        true
    }
}

/// Outcome of a chain verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub valid: bool,
    pub entries: usize,
    /// Zero-based index of the first entry that breaks the chain.
    pub first_invalid: Option<usize>,
}

struct ChainState {
    previous_hash: String,
    entries: Vec<AuditEntry>,
    degraded: bool,
}

/// Hash-chained append-only journal. Single writer, multiple readers: the
/// chain pointer and the file append are guarded by one mutex so entries
/// land on disk in chain order.
pub struct AuditLog {
    path: PathBuf,
    state: Mutex<ChainState>,
}

impl AuditLog {
    /// Open (or create) a journal at `path` without loading history into
    /// memory; only the tail hash is read so the chain resumes where the
    /// previous process left off.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        Self::open_with_preload(path, false)
    }

    /// Open a journal. With `preload`, every line is parsed into the
    /// in-memory list; otherwise only the last line's hash seeds the chain
    /// pointer.
    pub fn open_with_preload<P: AsRef<Path>>(path: P, preload: bool) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut entries = Vec::new();
        let mut previous_hash = GENESIS_HASH.to_string();
        if path.exists() {
            if preload {
                entries = read_entries(&path)?;
                if let Some(last) = entries.last() {
                    previous_hash = last.hash.clone();
                }
            } else if let Some(tail) = last_line_hash(&path)? {
                previous_hash = tail;
            }
        }
        Ok(Self {
            path,
            state: Mutex::new(ChainState { previous_hash, entries, degraded: false }),
        })
    }

    /// Append a decision with the facts it was taken over. The entry id is
    /// the decision's audit id (or a fresh one when absent), the hash
    /// chains onto the current pointer, and the line is written before the
    /// pointer advances. A failed write keeps the entry in memory and
    /// marks the log degraded.
    pub fn append(&self, decision: &Decision, input: &Value) -> AuditEntry {
        let mut state = self.state.lock().expect("audit chain lock poisoned");
        let id = if decision.audit_id.is_empty() {
            ids::new_audit_id()
        } else {
            decision.audit_id.clone()
        };
        let mut entry = AuditEntry {
            id,
            timestamp: ids::now_iso(),
            input: input.clone(),
            output: decision.clone(),
            rule: decision.matched_rule.clone(),
            previous_hash: state.previous_hash.clone(),
            hash: String::new(),
            compliance: None,
        };
        entry.hash = chain_hash(&entry.previous_hash, &entry.pre_image());

        if let Err(e) = self.write_line(&entry) {
            warn!(error = %e, path = %self.path.display(), "journal append failed; audit log degraded");
            state.degraded = true;
        }
        state.previous_hash = entry.hash.clone();
        state.entries.push(entry.clone());
        entry
    }

    fn write_line(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }

    /// Attach a compliance report to the in-memory copy of an entry. The
    /// journal line is already written and the report is outside the hash
    /// pre-image, so chain verification is unaffected.
    pub fn attach_compliance(&self, audit_id: &str, report: ComplianceReport) {
        let mut state = self.state.lock().expect("audit chain lock poisoned");
        if let Some(entry) = state.entries.iter_mut().rev().find(|e| e.id == audit_id) {
            entry.compliance = Some(report);
        }
    }

    /// Filter the in-memory entries.
    #[must_use]
    pub fn query(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        let state = self.state.lock().expect("audit chain lock poisoned");
        state.entries.iter().filter(|e| filter.matches(e)).cloned().collect()
    }

    /// Filter the journal as it exists on disk, independent of in-memory
    /// state. Parses the whole file on every call.
    pub fn query_from_disk(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut entries = read_entries(&self.path)?;
        entries.retain(|e| filter.matches(e));
        Ok(entries)
    }

    /// In-memory continuity check, anchored at the first in-memory entry's
    /// `previousHash` (which is not genesis after a restart). Vacuously
    /// true when empty. [`verify_full`](Self::verify_full) is the
    /// authoritative genesis-anchored check.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.verify_report().valid
    }

    /// Diagnostic form of [`verify`](Self::verify).
    #[must_use]
    pub fn verify_report(&self) -> ChainReport {
        let state = self.state.lock().expect("audit chain lock poisoned");
        let anchor = state
            .entries
            .first()
            .map_or_else(|| GENESIS_HASH.to_string(), |e| e.previous_hash.clone());
        verify_chain(&state.entries, &anchor)
    }

    /// Authoritative integrity check: parse the journal from disk and
    /// verify every entry from genesis. Returns `false` when the file
    /// cannot be read or parsed.
    #[must_use]
    pub fn verify_full(&self) -> bool {
        self.verify_full_report().map(|r| r.valid).unwrap_or(false)
    }

    /// Diagnostic form of [`verify_full`](Self::verify_full): the entry
    /// count and the index of the first broken link, if any.
    pub fn verify_full_report(&self) -> Result<ChainReport, AuditError> {
        if !self.path.exists() {
            return Ok(ChainReport { valid: true, entries: 0, first_invalid: None });
        }
        let entries = read_entries(&self.path)?;
        Ok(verify_chain(&entries, GENESIS_HASH))
    }

    /// CSV export of the in-memory entries. The reason column is quoted
    /// with embedded quotes doubled.
    #[must_use]
    pub fn export_csv(&self) -> String {
        let state = self.state.lock().expect("audit chain lock poisoned");
        csv_from_entries(&state.entries)
    }

    /// Number of in-memory entries.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().expect("audit chain lock poisoned").entries.len()
    }

    /// True after any journal write has failed for this log instance.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.state.lock().expect("audit chain lock poisoned").degraded
    }

    /// Journal location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render entries as CSV with the fixed header
/// `id,timestamp,result,rule,reason,score,hash`.
#[must_use]
pub fn csv_from_entries(entries: &[AuditEntry]) -> String {
    let mut out = String::from("id,timestamp,result,rule,reason,score,hash\n");
    for e in entries {
        let rule_name = e.rule.as_ref().map_or("", |r| r.name.as_str());
        let reason = e.output.reason.replace('"', "\"\"");
        out.push_str(&format!(
            "{},{},{},{},\"{}\",{},{}\n",
            e.id, e.timestamp, e.output.result, rule_name, reason, e.output.score, e.hash
        ));
    }
    out
}

fn verify_chain(entries: &[AuditEntry], anchor: &str) -> ChainReport {
    let mut previous = anchor.to_string();
    for (i, entry) in entries.iter().enumerate() {
        let recomputed = chain_hash(&entry.previous_hash, &entry.pre_image());
        if entry.previous_hash != previous || entry.hash != recomputed {
            return ChainReport { valid: false, entries: entries.len(), first_invalid: Some(i) };
        }
        previous = entry.hash.clone();
    }
    ChainReport { valid: true, entries: entries.len(), first_invalid: None }
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>, AuditError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry =
            serde_json::from_str(&line).map_err(|_| AuditError::MalformedLine { line: i + 1 })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// The `hash` of the last non-empty line, or `None` for an empty file.
fn last_line_hash(path: &Path) -> Result<Option<String>, AuditError> {
    let reader = BufReader::new(File::open(path)?);
    let mut tail: Option<(usize, String)> = None;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if !line.trim().is_empty() {
            tail = Some((i + 1, line));
        }
    }
    let Some((line_no, line)) = tail else { return Ok(None) };
    let value: Value =
        serde_json::from_str(&line).map_err(|_| AuditError::MalformedLine { line: line_no })?;
    value
        .get("hash")
        .and_then(Value::as_str)
        .map(|h| Some(h.to_string()))
        .ok_or(AuditError::MalformedLine { line: line_no })
}
