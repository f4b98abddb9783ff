pub mod chat;
pub mod checklist;
pub mod contract;
pub mod diagnosis;
pub mod goal;
pub mod plan;
pub mod profile;
