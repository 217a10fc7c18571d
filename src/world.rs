//! Ports to the game engine binding layer.
//!
//! The engine owns every world object. The core only ever sees identities and attribute
//! snapshots through these traits, so nothing here holds a long-lived pointer into the game.

pub mod load_order;
pub mod memory;

use crate::models::form::Form;
use crate::models::reference::{ContainerItem, ObjectRef};
use crate::models::types::{FormId, RefId, Signature};
use std::sync::Arc;

pub use load_order::LoadOrder;
pub use memory::{MemoryWorld, WorldSnapshot};

/// Read-only view of the loaded template data.
pub trait FormCatalog: Send + Sync {
    fn load_order(&self) -> &LoadOrder;
    fn form(&self, id: FormId) -> Option<Form>;
    fn forms_with_signature(&self, signature: Signature) -> Vec<FormId>;
    /// Keyword form by editor id
    fn keyword(&self, editor_id: &str) -> Option<FormId>;
    /// Direct entries of a form list, nested lists included as ids
    fn form_list(&self, id: FormId) -> Option<Vec<FormId>>;
    /// Whether any reference to this template is placed in the world
    fn is_placed_object(&self, id: FormId) -> bool;
}

/// Where the player currently is.
pub trait LocationState: Send + Sync {
    fn player_place(&self) -> Option<FormId>;
    fn in_whitelisted_place(&self) -> bool;
    fn in_restricted_settlement(&self) -> bool;
    fn in_friendly_cell(&self) -> bool;
    /// False while a cell transition is in progress
    fn is_stable(&self) -> bool;
}

pub trait PlayerInventory: Send + Sync {
    fn inventory_forms(&self) -> Vec<FormId>;
}

/// Container contents and item transfer to the player.
pub trait ContainerAccess: Send + Sync {
    fn contents(&self, container: RefId) -> Vec<ContainerItem>;
    /// Moves the whole stack to the player. Returns the count the engine reported moving.
    fn take_all(&self, container: RefId, item: &ContainerItem, inline: bool) -> u32;
    /// Adds copies straight into the player inventory.
    fn make_copies(&self, item: FormId, count: u32);
}

/// Spatial query for references around the player.
pub trait ReferenceSource: Send + Sync {
    fn nearby_references(&self) -> Vec<ObjectRef>;
}

#[derive(Clone)]
pub struct WorldPorts {
    pub catalog: Arc<dyn FormCatalog>,
    pub location: Arc<dyn LocationState>,
    pub inventory: Arc<dyn PlayerInventory>,
    pub containers: Arc<dyn ContainerAccess>,
    pub references: Arc<dyn ReferenceSource>,
}

impl WorldPorts {
    pub fn from_memory(world: Arc<MemoryWorld>) -> Self {
        Self {
            catalog: world.clone(),
            location: world.clone(),
            inventory: world.clone(),
            containers: world.clone(),
            references: world,
        }
    }
}
