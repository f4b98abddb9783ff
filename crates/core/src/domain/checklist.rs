use serde::{Deserialize, Serialize};

pub const DAILY_ACTIONS: usize = 2;
pub const WEEKLY_ACTIONS: usize = 3;
pub const MONTHLY_ACTIONS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub daily_actions: Vec<String>,
    pub weekly_actions: Vec<String>,
    pub monthly_actions: Vec<String>,
    pub one_time_action: String,
}

impl Checklist {
    pub fn is_blank(&self) -> bool {
        self.daily_actions.is_empty()
            && self.weekly_actions.is_empty()
            && self.monthly_actions.is_empty()
            && self.one_time_action.trim().is_empty()
    }
}
