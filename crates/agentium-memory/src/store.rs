use crate::types::{MemoryEntry, ParsedSignal, SignalType};
use agentium_core::{AgentiumError, AgentiumResult};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default cap on the number of retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;
/// Default budget, in bytes, for rendered context.
pub const DEFAULT_CONTEXT_BUDGET: usize = 3000;

/// Cross-iteration memory for a session, persisted as JSON under
/// `<workDir>/.agentium/memory.json`.
///
/// Append-only from the outside; every update applies resolve-pending
/// (a STEP_DONE removes matching task-scoped STEP_PENDING entries) and
/// then prunes oldest-first down to the entry cap.
pub struct MemoryStore {
    path: PathBuf,
    max_entries: usize,
    context_budget: usize,
    entries: RwLock<Vec<MemoryEntry>>,
}

impl MemoryStore {
    /// Create a store rooted at the session working directory.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self::with_limits(work_dir, DEFAULT_MAX_ENTRIES, DEFAULT_CONTEXT_BUDGET)
    }

    /// Create a store with explicit entry and context budgets.
    pub fn with_limits(
        work_dir: impl AsRef<Path>,
        max_entries: usize,
        context_budget: usize,
    ) -> Self {
        Self {
            path: work_dir.as_ref().join(".agentium").join("memory.json"),
            max_entries,
            context_budget,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// The on-disk location of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured context budget, in bytes.
    pub fn context_budget(&self) -> usize {
        self.context_budget
    }

    /// Append parsed signals for one iteration of a task.
    pub async fn update(
        &self,
        task_id: &str,
        global_iteration: u32,
        phase_iteration: u32,
        signals: &[ParsedSignal],
    ) {
        if signals.is_empty() {
            return;
        }
        let mut entries = self.entries.write().await;

        // Resolve-pending: a STEP_DONE removes matching STEP_PENDING
        // entries for the same task and content.
        for signal in signals {
            if signal.signal_type == SignalType::StepDone {
                entries.retain(|e| {
                    !(e.signal_type == SignalType::StepPending
                        && e.task_id == task_id
                        && e.content == signal.content)
                });
            }
        }

        for signal in signals {
            entries.push(MemoryEntry::new(
                signal.signal_type,
                signal.content.clone(),
                task_id,
                global_iteration,
                phase_iteration,
            ));
        }

        Self::prune(&mut entries, self.max_entries);
    }

    /// Append a single entry produced by the controller itself (review
    /// feedback, judge directives, phase results).
    pub async fn record(
        &self,
        signal_type: SignalType,
        content: impl Into<String>,
        task_id: &str,
        global_iteration: u32,
        phase_iteration: u32,
    ) {
        self.update(
            task_id,
            global_iteration,
            phase_iteration,
            &[ParsedSignal {
                signal_type,
                content: content.into(),
            }],
        )
        .await;
    }

    /// Remove EVAL_FEEDBACK entries for a task from phase iterations
    /// before the given one. Used when the pipeline regresses so stale
    /// review feedback does not leak into the fresh phase.
    pub async fn clear_stale_eval_feedback(&self, task_id: &str, current_phase_iteration: u32) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| {
            !(e.signal_type == SignalType::EvalFeedback
                && e.task_id == task_id
                && e.phase_iteration < current_phase_iteration)
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(task_id, removed, "Cleared stale eval feedback");
        }
    }

    /// Number of retained entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of all entries, in arrival order.
    pub async fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.read().await.clone()
    }

    /// Snapshot of the entries for one task, in arrival order.
    pub async fn entries_for_task(&self, task_id: &str) -> Vec<MemoryEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }

    fn prune(entries: &mut Vec<MemoryEntry>, max_entries: usize) {
        if entries.len() > max_entries {
            let excess = entries.len() - max_entries;
            entries.drain(..excess);
        }
    }

    /// Persist the store atomically (write temp file, then rename).
    pub async fn save(&self) -> AgentiumResult<()> {
        let snapshot = {
            let entries = self.entries.read().await;
            serde_json::to_string_pretty(&*entries)?
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, snapshot.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Load the persisted document. A missing file starts empty; a
    /// malformed one starts empty with a warning.
    pub async fn load(&self) -> AgentiumResult<()> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(AgentiumError::Io(e)),
        };

        match serde_json::from_str::<Vec<MemoryEntry>>(&data) {
            Ok(mut loaded) => {
                Self::prune(&mut loaded, self.max_entries);
                let mut entries = self.entries.write().await;
                *entries = loaded;
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt memory document, starting empty");
                let mut entries = self.entries.write().await;
                entries.clear();
                Ok(())
            }
        }
    }
}
