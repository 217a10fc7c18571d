use crate::models::types::{FormId, Position, RefId, Scope};
use serde::{Deserialize, Serialize};

/// How strongly a quest is attached to a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestStatus {
    #[default]
    None,
    /// Filled into a quest alias but not flagged
    Referenced,
    /// Carries the quest item flag
    Flagged,
}

impl QuestStatus {
    pub fn is_quest_item(&self, require_full_flags: bool) -> bool {
        match self {
            QuestStatus::None => false,
            QuestStatus::Referenced => !require_full_flags,
            QuestStatus::Flagged => true,
        }
    }
}

/// Snapshot of a placed reference handed to the decision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub id: RefId,
    pub base: FormId,
    #[serde(default = "default_scope")]
    pub scope: Scope,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dynamic: bool,                  // spawned at runtime, id may be reused
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub owner: Option<FormId>,
    #[serde(default)]
    pub player_owned: bool,
    #[serde(default)]
    pub off_limits: bool,               // taking it is a crime
    #[serde(default)]
    pub fired_projectile: bool,
    #[serde(default)]
    pub quest: QuestStatus,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub boss_container: bool,
    #[serde(default)]
    pub animated: bool,                 // has an open/close animation controller
    #[serde(default)]
    pub place: Option<FormId>,
    #[serde(default)]
    pub position: Option<Position>,
}

fn default_scope() -> Scope {
    Scope::ItemObjects
}

fn default_count() -> u32 {
    1
}

impl ObjectRef {
    pub fn new(id: RefId, base: FormId, scope: Scope) -> Self {
        Self {
            id,
            base,
            scope,
            name: String::new(),
            dynamic: false,
            count: 1,
            owner: None,
            player_owned: false,
            off_limits: false,
            fired_projectile: false,
            quest: QuestStatus::None,
            locked: false,
            boss_container: false,
            animated: false,
            place: None,
            position: None,
        }
    }

    pub fn is_container_like(&self) -> bool {
        matches!(self.scope, Scope::Containers | Scope::DeadBodies)
    }
}

/// One stack inside a container or a dead body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerItem {
    pub form: FormId,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub player_enchanted: bool,
    #[serde(default)]
    pub quest_item: bool,
}

impl ContainerItem {
    pub fn new(form: FormId, count: u32) -> Self {
        Self { form, count, player_enchanted: false, quest_item: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_quest_flags() {
        assert!(!QuestStatus::None.is_quest_item(false));
        assert!(QuestStatus::Referenced.is_quest_item(false));
        assert!(!QuestStatus::Referenced.is_quest_item(true));
        assert!(QuestStatus::Flagged.is_quest_item(true));
    }

    #[test]
    fn t_ref_defaults() {
        let r: ObjectRef = serde_json::from_str(r#"{"id": 4096, "base": 16}"#).unwrap();
        assert_eq!(r.scope, Scope::ItemObjects);
        assert_eq!(r.count, 1);
        assert!(!r.is_container_like());
    }
}
