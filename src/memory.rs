//! Conversation memory: which workflow steps a conversation has finished,
//! what they produced, and what is still blocked.
//!
//! The workflow is linear (website, ICPs, value propositions, then the
//! assets). Re-running a step invalidates everything downstream of it.
//! Persistence goes through [`MemoryStore`] so tests can stay in memory.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStep {
    Website,
    IdealCustomerProfiles,
    ValuePropositions,
    EmailSequence,
    LinkedInPosts,
    LandingPage,
    BrandGuide,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 7] = [
        WorkflowStep::Website,
        WorkflowStep::IdealCustomerProfiles,
        WorkflowStep::ValuePropositions,
        WorkflowStep::EmailSequence,
        WorkflowStep::LinkedInPosts,
        WorkflowStep::LandingPage,
        WorkflowStep::BrandGuide,
    ];

    /// Steps that must be complete before this one can run.
    pub fn prerequisites(self) -> &'static [WorkflowStep] {
        match self {
            WorkflowStep::Website => &[],
            WorkflowStep::IdealCustomerProfiles => &[WorkflowStep::Website],
            WorkflowStep::ValuePropositions => &[WorkflowStep::IdealCustomerProfiles],
            WorkflowStep::EmailSequence
            | WorkflowStep::LinkedInPosts
            | WorkflowStep::LandingPage
            | WorkflowStep::BrandGuide => &[WorkflowStep::ValuePropositions],
        }
    }

    /// True if `other` is a direct or transitive prerequisite of `self`.
    pub fn depends_on(self, other: WorkflowStep) -> bool {
        self.prerequisites()
            .iter()
            .any(|&p| p == other || p.depends_on(other))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStep::Website => "website",
            WorkflowStep::IdealCustomerProfiles => "ideal-customer-profiles",
            WorkflowStep::ValuePropositions => "value-propositions",
            WorkflowStep::EmailSequence => "email-sequence",
            WorkflowStep::LinkedInPosts => "linked-in-posts",
            WorkflowStep::LandingPage => "landing-page",
            WorkflowStep::BrandGuide => "brand-guide",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: WorkflowStep,
    pub value: Value,
    pub completed_at: DateTime<Utc>,
}

/// Persisted state of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub conversation_id: String,
    pub steps: Vec<StepRecord>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationMemory {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            steps: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_complete(&self, step: WorkflowStep) -> bool {
        self.steps.iter().any(|r| r.step == step)
    }

    pub fn value(&self, step: WorkflowStep) -> Option<&Value> {
        self.steps.iter().find(|r| r.step == step).map(|r| &r.value)
    }

    pub fn missing_prerequisites(&self, step: WorkflowStep) -> Vec<WorkflowStep> {
        step.prerequisites()
            .iter()
            .copied()
            .filter(|&p| !self.is_complete(p))
            .collect()
    }

    /// First step of the workflow not yet completed.
    pub fn next_step(&self) -> Option<WorkflowStep> {
        WorkflowStep::ALL.into_iter().find(|&s| !self.is_complete(s))
    }
}

/// Storage for conversation memory blobs.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>>;
    async fn save(&self, memory: &ConversationMemory) -> Result<()>;
    async fn delete(&self, conversation_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, ConversationMemory>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>> {
        Ok(self.entries.get(conversation_id).map(|e| e.value().clone()))
    }

    async fn save(&self, memory: &ConversationMemory) -> Result<()> {
        self.entries
            .insert(memory.conversation_id.clone(), memory.clone());
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.entries.remove(conversation_id);
        Ok(())
    }
}

/// One JSON file per conversation under `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, conversation_id: &str) -> Result<PathBuf> {
        let valid = !conversation_id.is_empty()
            && conversation_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(GatewayError::InvalidInput(format!(
                "invalid conversation id: {conversation_id:?}"
            )));
        }
        Ok(self.dir.join(format!("{conversation_id}.json")))
    }
}

#[async_trait]
impl MemoryStore for FileStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>> {
        let path = self.path_for(conversation_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, memory: &ConversationMemory) -> Result<()> {
        let path = self.path_for(&memory.conversation_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(memory)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let path = self.path_for(conversation_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

pub struct MemoryManager {
    store: Arc<dyn MemoryStore>,
    // serializes read-modify-write cycles in `record`
    write_lock: Mutex<()>,
}

impl MemoryManager {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Stored memory for the conversation, or an empty one.
    pub async fn memory(&self, conversation_id: &str) -> Result<ConversationMemory> {
        Ok(self
            .store
            .load(conversation_id)
            .await?
            .unwrap_or_else(|| ConversationMemory::new(conversation_id)))
    }

    pub async fn missing_prerequisites(
        &self,
        conversation_id: &str,
        step: WorkflowStep,
    ) -> Result<Vec<WorkflowStep>> {
        Ok(self.memory(conversation_id).await?.missing_prerequisites(step))
    }

    pub async fn can_start(&self, conversation_id: &str, step: WorkflowStep) -> Result<bool> {
        Ok(self
            .missing_prerequisites(conversation_id, step)
            .await?
            .is_empty())
    }

    pub async fn next_step(&self, conversation_id: &str) -> Result<Option<WorkflowStep>> {
        Ok(self.memory(conversation_id).await?.next_step())
    }

    /// Store the output of `step`. Everything that depends on `step` is
    /// cleared, since it was derived from the previous value.
    pub async fn record(
        &self,
        conversation_id: &str,
        step: WorkflowStep,
        value: Value,
    ) -> Result<ConversationMemory> {
        let _guard = self.write_lock.lock().await;
        let mut memory = self.memory(conversation_id).await?;

        let missing = memory.missing_prerequisites(step);
        if !missing.is_empty() {
            return Err(GatewayError::MissingPrerequisites { step, missing });
        }

        let dependents = memory
            .steps
            .iter()
            .filter(|r| r.step.depends_on(step))
            .count();
        memory
            .steps
            .retain(|r| r.step != step && !r.step.depends_on(step));

        let now = Utc::now();
        memory.steps.push(StepRecord {
            step,
            value,
            completed_at: now,
        });
        memory.updated_at = now;
        self.store.save(&memory).await?;

        info!(conversation_id, %step, "recorded workflow step");
        if dependents > 0 {
            debug!(conversation_id, %step, dependents, "cleared dependent steps");
        }
        Ok(memory)
    }

    pub async fn reset(&self, conversation_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(conversation_id).await
    }
}
