pub mod form;
pub mod lootability;
pub mod object_type;
pub mod reference;
pub mod types;
