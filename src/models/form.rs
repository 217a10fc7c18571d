use crate::models::object_type::ObjectType;
use crate::models::types::{FormId, Signature};
use serde::{Deserialize, Serialize};

/// Template ("base") object as the catalog reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: FormId,
    pub signature: Signature,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub editor_id: Option<String>,
    #[serde(default)]
    pub keywords: Vec<FormId>,
    #[serde(default = "default_object_type")]
    pub object_type: ObjectType,
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_playable")]
    pub playable: bool,
}

fn default_object_type() -> ObjectType {
    ObjectType::Unknown
}

fn default_playable() -> bool {
    true
}

impl Form {
    pub fn new(id: FormId, signature: Signature, object_type: ObjectType) -> Self {
        Self {
            id,
            signature,
            name: String::new(),
            editor_id: None,
            keywords: Vec::new(),
            object_type,
            value: 0,
            weight: 0.0,
            playable: true,
        }
    }

    pub fn has_keyword(&self, keyword: FormId) -> bool {
        self.keywords.contains(&keyword)
    }

    /// Worth per unit of weight, None for weightless items.
    pub fn value_per_weight(&self) -> Option<f64> {
        if self.weight > 0.0 {
            Some(f64::from(self.value) / self.weight)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> String {
        if self.name.is_empty() { self.id.to_string() } else { self.name.clone() }
    }
}
