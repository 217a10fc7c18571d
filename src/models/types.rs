use crate::error::DomainError;
use serde::{Deserialize, Serialize};

#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Copy,
            Clone,
            Debug,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[repr(transparent)]
        #[serde(transparent)] // JSON = plain integer
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }
            #[inline]
            pub const fn raw(&self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "0x{:08x}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = $crate::error::DomainError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::models::types::parse_form_number(s).map(Self)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }
        impl From<$name> for u32 {
            fn from(v: $name) -> u32 {
                v.0
            }
        }
    };
}

// Template objects, keywords, form lists, locations
define_id!(FormId);
// Placed references in the world
define_id!(RefId);

/// Parses a hex form number, with or without a "0x" prefix.
pub fn parse_form_number(s: &str) -> Result<u32, DomainError> {
    let t = s.trim();
    let digits = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")).unwrap_or(t);
    if digits.is_empty() || digits.len() > 8 {
        return Err(DomainError::InvalidFormId(s.to_string()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| DomainError::InvalidFormId(s.to_string()))
}

/// Query context a lookup is made for. Collections learn which of these they care about
/// while resolving membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "deadBody")]
    DeadBodies,
    #[serde(rename = "container")]
    Containers,
    #[serde(rename = "looseItem")]
    ItemObjects,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::DeadBodies => "deadBody",
            Scope::Containers => "container",
            Scope::ItemObjects => "looseItem",
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deadBody" => Ok(Scope::DeadBodies),
            "container" => Ok(Scope::Containers),
            "looseItem" => Ok(Scope::ItemObjects),
            other => Err(DomainError::InvalidScope(other.to_string())),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record type signature of a template object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signature {
    #[serde(rename = "ACTI")]
    Activator,
    #[serde(rename = "ALCH")]
    Alchemy,
    #[serde(rename = "AMMO")]
    Ammo,
    #[serde(rename = "ARMO")]
    Armor,
    #[serde(rename = "BOOK")]
    Book,
    #[serde(rename = "CONT")]
    Container,
    #[serde(rename = "FLOR")]
    Flora,
    #[serde(rename = "INGR")]
    Ingredient,
    #[serde(rename = "KEYM")]
    Key,
    #[serde(rename = "LIGH")]
    Light,
    #[serde(rename = "MISC")]
    Misc,
    #[serde(rename = "NPC_")]
    Npc,
    #[serde(rename = "SCRL")]
    Scroll,
    #[serde(rename = "SLGM")]
    SoulGem,
    #[serde(rename = "TREE")]
    Tree,
    #[serde(rename = "WEAP")]
    Weapon,
}

/// Signatures whose forms can be members of a collection.
pub const COLLECTIBLE_SIGNATURES: &[Signature] = &[
    Signature::Alchemy,
    Signature::Ammo,
    Signature::Armor,
    Signature::Book,
    Signature::Ingredient,
    Signature::Key,
    Signature::Light,
    Signature::Misc,
    Signature::Scroll,
    Signature::SoulGem,
    Signature::Weapon,
];

impl Signature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signature::Activator => "ACTI",
            Signature::Alchemy => "ALCH",
            Signature::Ammo => "AMMO",
            Signature::Armor => "ARMO",
            Signature::Book => "BOOK",
            Signature::Container => "CONT",
            Signature::Flora => "FLOR",
            Signature::Ingredient => "INGR",
            Signature::Key => "KEYM",
            Signature::Light => "LIGH",
            Signature::Misc => "MISC",
            Signature::Npc => "NPC_",
            Signature::Scroll => "SCRL",
            Signature::SoulGem => "SLGM",
            Signature::Tree => "TREE",
            Signature::Weapon => "WEAP",
        }
    }

    pub fn is_collectible(&self) -> bool {
        COLLECTIBLE_SIGNATURES.contains(self)
    }
}

impl std::str::FromStr for Signature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sig = match s {
            "ACTI" => Signature::Activator,
            "ALCH" => Signature::Alchemy,
            "AMMO" => Signature::Ammo,
            "ARMO" => Signature::Armor,
            "BOOK" => Signature::Book,
            "CONT" => Signature::Container,
            "FLOR" => Signature::Flora,
            "INGR" => Signature::Ingredient,
            "KEYM" => Signature::Key,
            "LIGH" => Signature::Light,
            "MISC" => Signature::Misc,
            "NPC_" => Signature::Npc,
            "SCRL" => Signature::Scroll,
            "SLGM" => Signature::SoulGem,
            "TREE" => Signature::Tree,
            "WEAP" => Signature::Weapon,
            other => return Err(DomainError::InvalidSignature(other.to_string())),
        };
        Ok(sig)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// World-space position of a reference when it was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}
