use crate::collections::condition::{ConditionMatcher, ConditionTree};
use crate::models::lootability::CollectibleHandling;
use crate::models::types::{FormId, Position, RefId, Scope};
use crate::world::FormCatalog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionPolicy {
    pub action: CollectibleHandling,
    pub notify: bool,
    pub repeat: bool,           // false: collectible at most once per collection
}

impl CollectionPolicy {
    pub fn new(action: CollectibleHandling, notify: bool, repeat: bool) -> Self {
        Self { action, notify, repeat }
    }
}

/// First sighting of a member, kept until the next game reload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionEntry {
    pub form: FormId,
    pub game_time: f32,
    pub place: Option<FormId>,
    pub first_seen: Option<RefId>,
    pub position: Option<Position>,
    pub recorded_at: DateTime<Utc>,
}

impl CollectionEntry {
    pub fn new(form: FormId, game_time: f32, place: Option<FormId>) -> Self {
        Self { form, game_time, place, first_seen: None, position: None, recorded_at: Utc::now() }
    }
}

#[derive(Debug)]
pub struct Collection {
    name: String,
    description: String,
    policy: CollectionPolicy,
    overrides_group: bool,
    root_filter: ConditionTree,
    scopes: BTreeSet<Scope>,
    members: HashSet<FormId>,
    observed: HashMap<FormId, CollectionEntry>,
}

impl Collection {
    pub fn new(
        name: &str,
        description: &str,
        policy: CollectionPolicy,
        overrides_group: bool,
        root_filter: ConditionTree,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            policy,
            overrides_group,
            root_filter,
            scopes: BTreeSet::new(),
            members: HashSet::new(),
            observed: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn policy(&self) -> &CollectionPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut CollectionPolicy {
        &mut self.policy
    }

    /// True when the collection carries its own policy instead of the group's.
    pub fn overrides_group(&self) -> bool {
        self.overrides_group
    }

    pub fn scopes(&self) -> &BTreeSet<Scope> {
        &self.scopes
    }

    pub fn add_member_id(&mut self, id: FormId) -> bool {
        self.members.insert(id)
    }

    pub fn is_member_of(&self, id: FormId) -> bool {
        self.members.contains(&id)
    }

    pub fn is_observed(&self, id: FormId) -> bool {
        self.observed.contains_key(&id)
    }

    /// Member, in scope (when the collection is scoped and a scope is asked for), and
    /// either repeatable or not yet observed.
    pub fn in_scope_and_collectible_for(&self, id: FormId, scope: Option<Scope>) -> bool {
        if let Some(s) = scope
            && !self.scopes.is_empty()
            && !self.scopes.contains(&s)
        {
            tracing::trace!(form = %id, scope = %s, collection = %self.name, "out of scope");
            return false;
        }
        (self.policy.repeat || !self.observed.contains_key(&id)) && self.is_member_of(id)
    }

    /// Evaluates the root filter. A match adds the form as a member and merges the
    /// scopes the filter tested.
    pub fn matches_filter(&mut self, matcher: &mut ConditionMatcher<'_>) -> bool {
        if self.root_filter.matches(matcher) {
            let id = matcher.form().id;
            self.add_member_id(id);
            self.scopes.extend(matcher.take_scopes_seen());
            return true;
        }
        false
    }

    /// First write wins. Returns true only when the entry is new.
    pub fn record_item(&mut self, entry: CollectionEntry) -> bool {
        if self.observed.contains_key(&entry.form) {
            return false;
        }
        tracing::debug!(form = %entry.form, collection = %self.name, "collected");
        self.observed.insert(entry.form, entry);
        true
    }

    pub fn observed(&self, id: FormId) -> Option<&CollectionEntry> {
        self.observed.get(&id)
    }

    pub fn reset(&mut self) {
        self.observed.clear();
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "policy": self.policy,
            "rootFilter": self.root_filter.to_json(),
        })
    }

    pub fn print_definition(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }

    pub fn print_members(&self, catalog: &dyn FormCatalog) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} members", self.members.len());
        if !self.scopes.is_empty() {
            let scopes: Vec<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
            let _ = writeln!(out, "Scope: {}", scopes.join(", "));
        }
        let mut members: Vec<&FormId> = self.members.iter().collect();
        members.sort();
        for m in members {
            match catalog.form(*m) {
                Some(f) if !f.name.is_empty() => {
                    let _ = writeln!(out, "  {m}:{}", f.name);
                }
                _ => {
                    let _ = writeln!(out, "  {m}");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::condition::{Condition, Operator, ScopeCondition, SignatureCondition};
    use crate::models::form::Form;
    use crate::models::object_type::ObjectType;
    use crate::models::types::Signature;

    fn ingredients(repeat: bool, scopes: Option<Vec<Scope>>) -> Collection {
        let mut root = ConditionTree::new(Operator::And, 0);
        root.push(Condition::Signature(SignatureCondition::new([Signature::Ingredient])));
        if let Some(s) = scopes {
            root.push(Condition::Scope(ScopeCondition::new(s)));
        }
        Collection::new(
            "Ingredients",
            "",
            CollectionPolicy::new(CollectibleHandling::Glow, true, repeat),
            false,
            root,
        )
    }

    #[test]
    fn t_matches_filter_adds_member() {
        let mut c = ingredients(true, None);
        let ingr = Form::new(FormId(1), Signature::Ingredient, ObjectType::Ingredient);
        let misc = Form::new(FormId(2), Signature::Misc, ObjectType::Clutter);
        assert!(c.matches_filter(&mut ConditionMatcher::new(&ingr)));
        assert!(!c.matches_filter(&mut ConditionMatcher::new(&misc)));
        assert!(c.is_member_of(FormId(1)));
        assert!(!c.is_member_of(FormId(2)));
        assert_eq!(c.member_count(), 1);
    }

    #[test]
    fn t_repeat_false_hides_observed_member() {
        let mut c = ingredients(false, None);
        c.add_member_id(FormId(1));
        assert!(c.in_scope_and_collectible_for(FormId(1), None));
        assert!(c.record_item(CollectionEntry::new(FormId(1), 1.5, None)));
        assert!(!c.in_scope_and_collectible_for(FormId(1), None));
        assert!(c.is_member_of(FormId(1)));
    }

    #[test]
    fn t_record_item_first_write_wins() {
        let mut c = ingredients(true, None);
        assert!(c.record_item(CollectionEntry::new(FormId(1), 1.0, Some(FormId(10)))));
        assert!(!c.record_item(CollectionEntry::new(FormId(1), 2.0, Some(FormId(20)))));
        let e = c.observed(FormId(1)).unwrap();
        assert_eq!(e.game_time, 1.0);
        assert_eq!(e.place, Some(FormId(10)));
        // repeat=true stays collectible
        c.add_member_id(FormId(1));
        assert!(c.in_scope_and_collectible_for(FormId(1), None));
    }

    #[test]
    fn t_scope_gating() {
        let mut c = ingredients(true, Some(vec![Scope::ItemObjects]));
        let ingr = Form::new(FormId(1), Signature::Ingredient, ObjectType::Ingredient);
        assert!(c.matches_filter(&mut ConditionMatcher::new(&ingr)));
        assert_eq!(c.scopes().iter().copied().collect::<Vec<_>>(), vec![Scope::ItemObjects]);
        assert!(c.in_scope_and_collectible_for(FormId(1), Some(Scope::ItemObjects)));
        assert!(!c.in_scope_and_collectible_for(FormId(1), Some(Scope::Containers)));
        assert!(c.is_member_of(FormId(1)));
    }

    #[test]
    fn t_reset_clears_observed_only() {
        let mut c = ingredients(false, None);
        c.add_member_id(FormId(1));
        c.record_item(CollectionEntry::new(FormId(1), 0.0, None));
        c.reset();
        assert_eq!(c.observed_count(), 0);
        assert!(c.in_scope_and_collectible_for(FormId(1), None));
    }

    #[test]
    fn t_definition_json() {
        let c = ingredients(false, None);
        let v = c.to_json();
        assert_eq!(v["name"], "Ingredients");
        assert_eq!(v["policy"]["action"], "glow");
        assert_eq!(v["rootFilter"]["operator"], "and");
        assert!(c.print_definition().contains("\"INGR\""));
    }
}
