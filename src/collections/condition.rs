use crate::models::form::Form;
use crate::models::types::{FormId, Scope, Signature};
use crate::world::{FormCatalog, LoadOrder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};

/// Evaluation context for one form. Scope conditions write every scope they test into
/// `scopes_seen`, so a collection can learn which scopes it cares about.
#[derive(Debug)]
pub struct ConditionMatcher<'a> {
    form: &'a Form,
    scope: Option<Scope>,
    scopes_seen: BTreeSet<Scope>,
}

impl<'a> ConditionMatcher<'a> {
    /// Matcher with no scope filtering, as used while resolving membership.
    pub fn new(form: &'a Form) -> Self {
        Self { form, scope: None, scopes_seen: BTreeSet::new() }
    }

    pub fn with_scope(form: &'a Form, scope: Scope) -> Self {
        Self { form, scope: Some(scope), scopes_seen: BTreeSet::new() }
    }

    pub fn form(&self) -> &Form {
        self.form
    }

    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    pub fn scopes_seen(&self) -> &BTreeSet<Scope> {
        &self.scopes_seen
    }

    pub fn take_scopes_seen(&mut self) -> BTreeSet<Scope> {
        std::mem::take(&mut self.scopes_seen)
    }

    fn record_scope(&mut self, scope: Scope) {
        self.scopes_seen.insert(scope);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[serde(alias = "AND", alias = "And")]
    And,
    #[serde(alias = "OR", alias = "Or")]
    Or,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

// ============================================================================
// LEAF CONDITIONS
// ============================================================================

/// Form was defined by one of the named plugins.
#[derive(Debug, Clone)]
pub struct PluginCondition {
    plugins: Vec<String>,
    masks: HashSet<u32>,
}

impl PluginCondition {
    pub fn new(plugins: Vec<String>, load_order: &LoadOrder) -> Self {
        let mut masks = HashSet::new();
        for p in &plugins {
            match load_order.mask(p) {
                Some(m) => {
                    masks.insert(m);
                }
                None => tracing::debug!(plugin = %p, "plugin not in load order, contributes no members"),
            }
        }
        Self { plugins, masks }
    }

    fn matches(&self, form: &Form) -> bool {
        self.masks.contains(&LoadOrder::owner_mask(form.id))
    }
}

/// A form list referenced by plugin and plugin-local id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRef {
    pub plugin: String,
    pub local_id: u32,
}

/// Explicit forms, given by plugin and plugin-local ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormsRef {
    pub plugin: String,
    pub local_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    Lists(Vec<ListRef>),
    Forms(Vec<FormsRef>),
}

/// Form belongs to a (possibly nested) form list, or to an explicit set of forms.
#[derive(Debug, Clone)]
pub struct FormListCondition {
    source: ListSource,
    members: HashSet<FormId>,
}

impl FormListCondition {
    pub fn new(source: ListSource, catalog: &dyn FormCatalog) -> Self {
        let load_order = catalog.load_order();
        let mut members = HashSet::new();
        match &source {
            ListSource::Lists(lists) => {
                for l in lists {
                    let Some(list_id) = load_order.form_id(&l.plugin, l.local_id) else {
                        tracing::debug!(plugin = %l.plugin, "form list plugin not loaded");
                        continue;
                    };
                    if catalog.form_list(list_id).is_none() {
                        tracing::debug!(list = %list_id, "form list not found");
                        continue;
                    }
                    let mut visited = HashSet::new();
                    flatten_list(catalog, list_id, &mut visited, &mut members);
                }
            }
            ListSource::Forms(forms) => {
                for f in forms {
                    for local in &f.local_ids {
                        match load_order.form_id(&f.plugin, *local) {
                            Some(id) => {
                                members.insert(id);
                            }
                            None => tracing::debug!(plugin = %f.plugin, "forms plugin not loaded"),
                        }
                    }
                }
            }
        }
        Self { source, members }
    }

    pub fn members(&self) -> &HashSet<FormId> {
        &self.members
    }

    fn matches(&self, form: &Form) -> bool {
        self.members.contains(&form.id)
    }
}

/// Collects the leaves of a list, descending into nested lists once each.
fn flatten_list(catalog: &dyn FormCatalog, list: FormId, visited: &mut HashSet<FormId>, out: &mut HashSet<FormId>) {
    if !visited.insert(list) {
        return;
    }
    let Some(entries) = catalog.form_list(list) else {
        return;
    };
    for entry in entries {
        if catalog.form_list(entry).is_some() {
            flatten_list(catalog, entry, visited, out);
        } else {
            out.insert(entry);
        }
    }
}

/// Form carries at least one of the keywords.
#[derive(Debug, Clone)]
pub struct KeywordCondition {
    names: Vec<String>,
    keywords: HashSet<FormId>,
}

impl KeywordCondition {
    pub fn new(names: Vec<String>, catalog: &dyn FormCatalog) -> Self {
        let mut keywords = HashSet::new();
        for n in &names {
            match catalog.keyword(n) {
                Some(k) => {
                    keywords.insert(k);
                }
                None => tracing::debug!(keyword = %n, "keyword not found"),
            }
        }
        Self { names, keywords }
    }

    fn matches(&self, form: &Form) -> bool {
        form.keywords.iter().any(|k| self.keywords.contains(k))
    }
}

#[derive(Debug, Clone)]
pub struct SignatureCondition {
    signatures: BTreeSet<Signature>,
}

impl SignatureCondition {
    pub fn new(signatures: impl IntoIterator<Item = Signature>) -> Self {
        Self { signatures: signatures.into_iter().collect() }
    }

    fn matches(&self, form: &Form) -> bool {
        self.signatures.contains(&form.signature)
    }
}

#[derive(Debug, Clone)]
pub struct ScopeCondition {
    scopes: Vec<Scope>,
}

impl ScopeCondition {
    pub fn new(scopes: Vec<Scope>) -> Self {
        Self { scopes }
    }

    fn matches(&self, matcher: &mut ConditionMatcher<'_>) -> bool {
        for s in &self.scopes {
            matcher.record_scope(*s);
        }
        match matcher.scope() {
            None => true,
            Some(requested) => self.scopes.contains(&requested),
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConditionTree {
    operator: Operator,
    children: Vec<Condition>,
    depth: usize,
}

impl ConditionTree {
    pub fn new(operator: Operator, depth: usize) -> Self {
        Self { operator, children: Vec::new(), depth }
    }

    pub fn push(&mut self, child: Condition) {
        self.children.push(child);
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn children(&self) -> &[Condition] {
        &self.children
    }

    /// Left to right with short circuit. Empty AND is true, empty OR is false.
    pub fn matches(&self, matcher: &mut ConditionMatcher<'_>) -> bool {
        match self.operator {
            Operator::And => {
                for c in &self.children {
                    if !c.matches(matcher) {
                        return false;
                    }
                }
                true
            }
            Operator::Or => {
                for c in &self.children {
                    if c.matches(matcher) {
                        return true;
                    }
                }
                false
            }
        }
    }

    pub fn to_json(&self) -> Value {
        let mut condition = serde_json::Map::new();
        let mut sub_filters = Vec::new();
        for c in &self.children {
            match c {
                Condition::Tree(t) => sub_filters.push(t.to_json()),
                leaf => {
                    if let Some((key, value)) = leaf.leaf_json() {
                        condition.insert(key.to_string(), value);
                    }
                }
            }
        }
        if !sub_filters.is_empty() {
            condition.insert("subFilter".to_string(), Value::Array(sub_filters));
        }
        json!({ "operator": self.operator.as_str(), "condition": condition })
    }
}

// ============================================================================
// CONDITION
// ============================================================================

#[derive(Debug, Clone)]
pub enum Condition {
    Plugin(PluginCondition),
    FormList(FormListCondition),
    Keyword(KeywordCondition),
    Signature(SignatureCondition),
    Scope(ScopeCondition),
    Tree(ConditionTree),
}

impl Condition {
    pub fn matches(&self, matcher: &mut ConditionMatcher<'_>) -> bool {
        match self {
            Condition::Plugin(c) => c.matches(matcher.form()),
            Condition::FormList(c) => c.matches(matcher.form()),
            Condition::Keyword(c) => c.matches(matcher.form()),
            Condition::Signature(c) => c.matches(matcher.form()),
            Condition::Scope(c) => c.matches(matcher),
            Condition::Tree(t) => t.matches(matcher),
        }
    }

    fn leaf_json(&self) -> Option<(&'static str, Value)> {
        match self {
            Condition::Plugin(c) => Some(("plugin", json!(c.plugins))),
            Condition::FormList(c) => Some(match &c.source {
                ListSource::Lists(lists) => (
                    "formList",
                    Value::Array(
                        lists
                            .iter()
                            .map(|l| json!({ "listPlugin": l.plugin, "formID": format!("{:08x}", l.local_id) }))
                            .collect(),
                    ),
                ),
                ListSource::Forms(forms) => (
                    "forms",
                    Value::Array(
                        forms
                            .iter()
                            .map(|f| {
                                let ids: Vec<String> = f.local_ids.iter().map(|i| format!("{i:08x}")).collect();
                                json!({ "plugin": f.plugin, "form": ids })
                            })
                            .collect(),
                    ),
                ),
            }),
            Condition::Keyword(c) => Some(("keyword", json!(c.names))),
            Condition::Signature(c) => {
                let sigs: Vec<&str> = c.signatures.iter().map(|s| s.as_str()).collect();
                Some(("signature", json!(sigs)))
            }
            Condition::Scope(c) => {
                let scopes: Vec<&str> = c.scopes.iter().map(|s| s.as_str()).collect();
                Some(("scope", json!(scopes)))
            }
            Condition::Tree(_) => None,
        }
    }
}
