use crate::domain::chat::{ChatRole, ChatTurn};
use crate::domain::checklist::Checklist;
use crate::domain::diagnosis::Diagnosis;
use crate::domain::goal::Goal;
use crate::domain::plan::FinancialPlan;
use crate::domain::profile::Profile;
use crate::storage::ArtifactStore;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Process-local store for service tests. Writes can be made to fail selectively.
#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<Uuid, Profile>>,
    diagnoses: Mutex<Vec<(Uuid, Diagnosis)>>,
    plans: Mutex<Vec<(Uuid, FinancialPlan)>>,
    goals: Mutex<Vec<(Uuid, Goal)>>,
    checklists: Mutex<Vec<(Uuid, Checklist)>>,
    chat: Mutex<Vec<(Uuid, ChatTurn)>>,
    failing_goal_names: Mutex<Vec<String>>,
    failing_chat_role: Mutex<Option<ChatRole>>,
    fail_artifact_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_goal_insert(self, name: &str) -> Self {
        self.failing_goal_names.lock().unwrap().push(name.to_string());
        self
    }

    pub fn fail_chat_append(self, role: ChatRole) -> Self {
        *self.failing_chat_role.lock().unwrap() = Some(role);
        self
    }

    /// Diagnosis, plan and checklist inserts fail.
    pub fn fail_artifact_writes(self) -> Self {
        *self.fail_artifact_writes.lock().unwrap() = true;
        self
    }

    pub fn diagnosis_count(&self) -> usize {
        self.diagnoses.lock().unwrap().len()
    }

    pub fn plan_count(&self) -> usize {
        self.plans.lock().unwrap().len()
    }

    pub fn checklist_count(&self) -> usize {
        self.checklists.lock().unwrap().len()
    }

    fn check_artifact_write(&self, table: &str) -> anyhow::Result<()> {
        if *self.fail_artifact_writes.lock().unwrap() {
            anyhow::bail!("insert {table} failed: connection reset");
        }
        Ok(())
    }
}

fn latest<T: Clone>(rows: &[(Uuid, T)], user_id: Uuid) -> Option<T> {
    rows.iter()
        .rev()
        .find(|(owner, _)| *owner == user_id)
        .map(|(_, row)| row.clone())
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    async fn save_profile(&self, user_id: Uuid, profile: &Profile) -> anyhow::Result<()> {
        self.profiles.lock().unwrap().insert(user_id, profile.clone());
        Ok(())
    }

    async fn load_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn save_diagnosis(&self, user_id: Uuid, diagnosis: &Diagnosis) -> anyhow::Result<Uuid> {
        self.check_artifact_write("diagnoses")?;
        self.diagnoses.lock().unwrap().push((user_id, diagnosis.clone()));
        Ok(Uuid::new_v4())
    }

    async fn latest_diagnosis(&self, user_id: Uuid) -> anyhow::Result<Option<Diagnosis>> {
        Ok(latest(&self.diagnoses.lock().unwrap(), user_id))
    }

    async fn save_plan(&self, user_id: Uuid, plan: &FinancialPlan) -> anyhow::Result<Uuid> {
        self.check_artifact_write("financial_plans")?;
        self.plans.lock().unwrap().push((user_id, plan.clone()));
        Ok(Uuid::new_v4())
    }

    async fn latest_plan(&self, user_id: Uuid) -> anyhow::Result<Option<FinancialPlan>> {
        Ok(latest(&self.plans.lock().unwrap(), user_id))
    }

    async fn insert_goal(&self, user_id: Uuid, goal: &Goal) -> anyhow::Result<Goal> {
        if self
            .failing_goal_names
            .lock()
            .unwrap()
            .iter()
            .any(|n| *n == goal.name)
        {
            anyhow::bail!("insert goals failed (name={})", goal.name);
        }
        let saved = Goal {
            id: Some(Uuid::new_v4()),
            ..goal.clone()
        };
        self.goals.lock().unwrap().push((user_id, saved.clone()));
        Ok(saved)
    }

    async fn list_goals(&self, user_id: Uuid) -> anyhow::Result<Vec<Goal>> {
        Ok(self
            .goals
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, g)| g.clone())
            .collect())
    }

    async fn update_goal_saved(
        &self,
        goal_id: Uuid,
        saved_amount: f64,
    ) -> anyhow::Result<Option<Goal>> {
        let mut goals = self.goals.lock().unwrap();
        let Some((_, goal)) = goals.iter_mut().find(|(_, g)| g.id == Some(goal_id)) else {
            return Ok(None);
        };
        *goal = goal.clone().with_saved_amount(saved_amount);
        Ok(Some(goal.clone()))
    }

    async fn save_checklist(&self, user_id: Uuid, checklist: &Checklist) -> anyhow::Result<Uuid> {
        self.check_artifact_write("checklists")?;
        self.checklists.lock().unwrap().push((user_id, checklist.clone()));
        Ok(Uuid::new_v4())
    }

    async fn latest_checklist(&self, user_id: Uuid) -> anyhow::Result<Option<Checklist>> {
        Ok(latest(&self.checklists.lock().unwrap(), user_id))
    }

    async fn append_chat(&self, user_id: Uuid, turn: &ChatTurn) -> anyhow::Result<()> {
        if *self.failing_chat_role.lock().unwrap() == Some(turn.role) {
            anyhow::bail!("insert chat_messages failed (role={})", turn.role);
        }
        self.chat.lock().unwrap().push((user_id, turn.clone()));
        Ok(())
    }

    async fn chat_history(&self, user_id: Uuid) -> anyhow::Result<Vec<ChatTurn>> {
        Ok(self
            .chat
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, t)| t.clone())
            .collect())
    }
}
