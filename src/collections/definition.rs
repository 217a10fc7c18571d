use crate::collections::condition::{
    Condition, ConditionTree, FormListCondition, FormsRef, KeywordCondition, ListRef, ListSource, Operator,
    PluginCondition, ScopeCondition, SignatureCondition,
};
use crate::collections::collection::CollectionPolicy;
use crate::error::DefinitionError;
use crate::hardening::{ALLOW_SYMLINKS, MAX_DEFINITION_FILES, MAX_FILE_BYTES, MAX_FILTER_DEPTH, MAX_TOTAL_BYTES};
use crate::models::types::{parse_form_number, Scope, Signature};
use crate::world::FormCatalog;
use anyhow::{Context, ensure};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// `<prefix>.Collections.<group>.json`, the group name comes from the file name.
static FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[^.]+\.Collections\.(?P<group>[A-Za-z0-9_\- ]+)\.json$").unwrap());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GroupDefinition {
    #[serde(rename = "$comment", default)]
    pub comment: Option<String>,
    pub group_policy: CollectionPolicy,
    #[serde(rename = "useMCM", default)]
    pub use_mcm: bool,
    pub collections: Vec<CollectionDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub policy: Option<CollectionPolicy>,
    pub root_filter: FilterDefinition,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDefinition {
    pub operator: Operator,
    pub condition: ConditionDefinition,
}

/// At least one key must be present. Present lists must not be empty.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConditionDefinition {
    #[serde(default)]
    pub form_list: Option<Vec<FormListDefinition>>,
    #[serde(default)]
    pub forms: Option<Vec<FormsDefinition>>,
    #[serde(default)]
    pub keyword: Option<Vec<String>>,
    #[serde(default)]
    pub plugin: Option<Vec<String>>,
    #[serde(default)]
    pub scope: Option<Vec<String>>,
    #[serde(default)]
    pub signature: Option<Vec<String>>,
    #[serde(default)]
    pub sub_filter: Option<Vec<FilterDefinition>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormListDefinition {
    pub list_plugin: String,
    #[serde(rename = "formID")]
    pub form_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormsDefinition {
    pub plugin: String,
    pub form: Vec<String>,
}

/// Group name encoded in a definition file name.
pub fn group_from_file_name(file_name: &str) -> Option<String> {
    FILE_RE
        .captures(file_name)
        .and_then(|c| c.name("group"))
        .map(|g| g.as_str().to_string())
}

/// A group file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFile {
    pub path: PathBuf,
    pub name: String,
    pub group: String,
}

/// Group files in `dir`, in name order. Names that do not match the pattern are ignored.
/// The count and size limits fail the whole load.
pub fn discover_files(dir: &Path) -> anyhow::Result<Vec<DefinitionFile>> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading definitions directory {}", dir.display()))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(group) = group_from_file_name(&name) else {
            continue;
        };
        let path = entry.path();
        let mut meta = fs::symlink_metadata(&path).with_context(|| format!("stat {name}"))?;
        if meta.file_type().is_symlink() {
            if !ALLOW_SYMLINKS {
                tracing::debug!(file = %name, "skip symlinked definition file");
                continue;
            }
            meta = fs::metadata(&path).with_context(|| format!("stat {name}"))?;
        }
        if meta.is_file() {
            found.push((DefinitionFile { path, name, group }, meta.len()));
        }
    }

    ensure!(
        found.len() <= MAX_DEFINITION_FILES,
        "{} definition files, at most {MAX_DEFINITION_FILES} are read",
        found.len()
    );
    let mut total = 0u64;
    for (file, len) in &found {
        ensure!(*len <= MAX_FILE_BYTES as u64, "{} is {len} bytes, limit is {MAX_FILE_BYTES}", file.name);
        total += len;
    }
    ensure!(total <= MAX_TOTAL_BYTES as u64, "definition files total {total} bytes, limit is {MAX_TOTAL_BYTES}");

    let mut files: Vec<DefinitionFile> = found.into_iter().map(|(f, _)| f).collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Parses and validates one definition file. Any violation rejects the whole file.
pub fn parse_group(file: &str, contents: &str) -> Result<GroupDefinition, DefinitionError> {
    let group: GroupDefinition =
        serde_json::from_str(contents).map_err(|source| DefinitionError::Malformed { file: file.to_string(), source })?;
    validate_group(file, &group)?;
    Ok(group)
}

fn invalid(file: &str, path: &str, message: impl Into<String>) -> DefinitionError {
    DefinitionError::Invalid { file: file.to_string(), path: path.to_string(), message: message.into() }
}

fn validate_group(file: &str, group: &GroupDefinition) -> Result<(), DefinitionError> {
    if group.collections.is_empty() {
        return Err(invalid(file, "collections", "must contain at least one collection"));
    }
    for (i, c) in group.collections.iter().enumerate() {
        let path = format!("collections[{i}]");
        if c.name.trim().is_empty() {
            return Err(invalid(file, &path, "name is empty"));
        }
        if c.name.contains('/') {
            return Err(invalid(file, &path, "name must not contain '/'"));
        }
        validate_filter(file, &format!("{path}.rootFilter"), &c.root_filter, 0)?;
    }
    Ok(())
}

fn validate_filter(file: &str, path: &str, filter: &FilterDefinition, depth: usize) -> Result<(), DefinitionError> {
    if depth > MAX_FILTER_DEPTH {
        return Err(invalid(file, path, format!("filter nesting exceeds {MAX_FILTER_DEPTH}")));
    }
    let c = &filter.condition;
    let path = format!("{path}.condition");

    let mut keys = 0usize;
    if let Some(lists) = &c.form_list {
        keys += 1;
        non_empty(file, &path, "formList", lists.len())?;
        for l in lists {
            parse_form_number(&l.form_id).map_err(|e| invalid(file, &path, e.to_string()))?;
        }
    }
    if let Some(forms) = &c.forms {
        keys += 1;
        non_empty(file, &path, "forms", forms.len())?;
        for f in forms {
            non_empty(file, &path, "forms.form", f.form.len())?;
            for id in &f.form {
                parse_form_number(id).map_err(|e| invalid(file, &path, e.to_string()))?;
            }
        }
    }
    if let Some(keywords) = &c.keyword {
        keys += 1;
        non_empty(file, &path, "keyword", keywords.len())?;
    }
    if let Some(plugins) = &c.plugin {
        keys += 1;
        non_empty(file, &path, "plugin", plugins.len())?;
    }
    if let Some(scopes) = &c.scope {
        keys += 1;
        non_empty(file, &path, "scope", scopes.len())?;
        for s in scopes {
            s.parse::<Scope>().map_err(|e| invalid(file, &path, e.to_string()))?;
        }
    }
    if let Some(sigs) = &c.signature {
        keys += 1;
        non_empty(file, &path, "signature", sigs.len())?;
        for s in sigs {
            let sig = s.parse::<Signature>().map_err(|e| invalid(file, &path, e.to_string()))?;
            if !sig.is_collectible() {
                return Err(invalid(file, &path, format!("signature {sig} cannot be collected")));
            }
        }
    }
    if let Some(subs) = &c.sub_filter {
        keys += 1;
        non_empty(file, &path, "subFilter", subs.len())?;
        for (i, sub) in subs.iter().enumerate() {
            validate_filter(file, &format!("{path}.subFilter[{i}]"), sub, depth + 1)?;
        }
    }
    if keys == 0 {
        return Err(invalid(file, &path, "condition has no criteria"));
    }
    Ok(())
}

fn non_empty(file: &str, path: &str, key: &str, len: usize) -> Result<(), DefinitionError> {
    if len == 0 {
        return Err(invalid(file, &format!("{path}.{key}"), "must not be empty"));
    }
    Ok(())
}

/// Builds the condition tree for a validated filter. Children follow key order:
/// formList, forms, keyword, plugin, scope, signature, then sub-filters.
pub fn build_tree(filter: &FilterDefinition, depth: usize, catalog: &dyn FormCatalog) -> ConditionTree {
    let mut tree = ConditionTree::new(filter.operator, depth);
    let c = &filter.condition;

    if let Some(lists) = &c.form_list {
        let refs = lists
            .iter()
            .filter_map(|l| {
                parse_form_number(&l.form_id).ok().map(|local_id| ListRef { plugin: l.list_plugin.clone(), local_id })
            })
            .collect();
        tree.push(Condition::FormList(FormListCondition::new(ListSource::Lists(refs), catalog)));
    }
    if let Some(forms) = &c.forms {
        let refs = forms
            .iter()
            .map(|f| FormsRef {
                plugin: f.plugin.clone(),
                local_ids: f.form.iter().filter_map(|id| parse_form_number(id).ok()).collect(),
            })
            .collect();
        tree.push(Condition::FormList(FormListCondition::new(ListSource::Forms(refs), catalog)));
    }
    if let Some(keywords) = &c.keyword {
        tree.push(Condition::Keyword(KeywordCondition::new(keywords.clone(), catalog)));
    }
    if let Some(plugins) = &c.plugin {
        tree.push(Condition::Plugin(PluginCondition::new(plugins.clone(), catalog.load_order())));
    }
    if let Some(scopes) = &c.scope {
        let scopes = scopes.iter().filter_map(|s| s.parse::<Scope>().ok()).collect();
        tree.push(Condition::Scope(ScopeCondition::new(scopes)));
    }
    if let Some(sigs) = &c.signature {
        let sigs: Vec<Signature> = sigs.iter().filter_map(|s| s.parse::<Signature>().ok()).collect();
        tree.push(Condition::Signature(SignatureCondition::new(sigs)));
    }
    if let Some(subs) = &c.sub_filter {
        for sub in subs {
            tree.push(Condition::Tree(build_tree(sub, depth + 1, catalog)));
        }
    }
    tree
}
