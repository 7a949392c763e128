use crate::types::{
    DocsOutput, ImplementOutput, IssueContext, PlanOutput, TaskRecord, VerifyOutput,
};
use agentium_core::{AgentiumError, AgentiumResult, Phase};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Thread-safe mapping from task ID to per-task phase outputs, persisted as
/// a single JSON document under `<workDir>/.agentium/handoff.json`.
///
/// Writes replace any prior output for the phase. The in-memory map remains
/// authoritative: a failed save is logged by the caller and does not abort
/// the phase.
pub struct HandoffStore {
    path: PathBuf,
    records: RwLock<HashMap<String, TaskRecord>>,
}

impl HandoffStore {
    /// Create a store rooted at the session working directory.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            path: work_dir.as_ref().join(".agentium").join("handoff.json"),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// The on-disk location of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seed the issue context for a task.
    pub async fn set_issue_context(&self, task_id: &str, issue: IssueContext) {
        let mut records = self.records.write().await;
        records.entry(task_id.to_string()).or_default().issue = Some(issue);
    }

    /// Fetch the issue context for a task.
    pub async fn issue_context(&self, task_id: &str) -> Option<IssueContext> {
        let records = self.records.read().await;
        records.get(task_id).and_then(|r| r.issue.clone())
    }

    /// Store a PLAN output, replacing any prior one.
    pub async fn set_plan_output(&self, task_id: &str, output: PlanOutput) {
        let mut records = self.records.write().await;
        records.entry(task_id.to_string()).or_default().plan = Some(output);
    }

    /// Store an IMPLEMENT output, replacing any prior one.
    pub async fn set_implement_output(&self, task_id: &str, output: ImplementOutput) {
        let mut records = self.records.write().await;
        records.entry(task_id.to_string()).or_default().implement = Some(output);
    }

    /// Store a DOCS output, replacing any prior one.
    pub async fn set_docs_output(&self, task_id: &str, output: DocsOutput) {
        let mut records = self.records.write().await;
        records.entry(task_id.to_string()).or_default().docs = Some(output);
    }

    /// Store a VERIFY output, replacing any prior one.
    pub async fn set_verify_output(&self, task_id: &str, output: VerifyOutput) {
        let mut records = self.records.write().await;
        records.entry(task_id.to_string()).or_default().verify = Some(output);
    }

    /// Fetch the PLAN output for a task.
    pub async fn plan_output(&self, task_id: &str) -> Option<PlanOutput> {
        let records = self.records.read().await;
        records.get(task_id).and_then(|r| r.plan.clone())
    }

    /// Fetch the IMPLEMENT output for a task.
    pub async fn implement_output(&self, task_id: &str) -> Option<ImplementOutput> {
        let records = self.records.read().await;
        records.get(task_id).and_then(|r| r.implement.clone())
    }

    /// Fetch the DOCS output for a task.
    pub async fn docs_output(&self, task_id: &str) -> Option<DocsOutput> {
        let records = self.records.read().await;
        records.get(task_id).and_then(|r| r.docs.clone())
    }

    /// Fetch the VERIFY output for a task.
    pub async fn verify_output(&self, task_id: &str) -> Option<VerifyOutput> {
        let records = self.records.read().await;
        records.get(task_id).and_then(|r| r.verify.clone())
    }

    /// Whether a typed output exists for the given task and phase.
    pub async fn has_phase_output(&self, task_id: &str, phase: Phase) -> bool {
        let records = self.records.read().await;
        records
            .get(task_id)
            .map(|r| r.has_phase_output(phase))
            .unwrap_or(false)
    }

    /// Erase the given phase and all downstream phases for a task, leaving
    /// upstream outputs and the issue context intact.
    pub async fn clear_from_phase(&self, task_id: &str, phase: Phase) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(task_id) {
            for p in phase.from_here_on() {
                record.clear_phase(p);
            }
            info!(task_id, phase = %phase, "Cleared hand-off from phase onward");
        }
    }

    /// A snapshot of the full record for a task.
    pub async fn record(&self, task_id: &str) -> Option<TaskRecord> {
        let records = self.records.read().await;
        records.get(task_id).cloned()
    }

    /// One-line progress summary for a task.
    pub async fn summary(&self, task_id: &str) -> String {
        let records = self.records.read().await;
        match records.get(task_id) {
            None => format!("{task_id}: no record"),
            Some(rec) => {
                let done: Vec<String> = Phase::ALL
                    .iter()
                    .filter(|p| rec.has_phase_output(**p))
                    .map(|p| p.to_string())
                    .collect();
                if done.is_empty() {
                    format!("{task_id}: no phase outputs")
                } else {
                    format!("{task_id}: {}", done.join(", "))
                }
            }
        }
    }

    /// Persist the store as a single JSON document, atomically
    /// (write temp file, then rename).
    pub async fn save(&self) -> AgentiumResult<()> {
        let snapshot = {
            let records = self.records.read().await;
            serde_json::to_string_pretty(&*records)?
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

        match serde_json::from_str::<HashMap<String, TaskRecord>>(&data) {
            Ok(loaded) => {
                let mut records = self.records.write().await;
                *records = loaded;
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt hand-off document, starting empty");
                let mut records = self.records.write().await;
                records.clear();
                Ok(())
            }
        }
    }
}
