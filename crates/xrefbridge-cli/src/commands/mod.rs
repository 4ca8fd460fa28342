pub mod attributes;
pub mod capabilities;
pub mod datasources;
pub mod exists;
pub mod map;
pub mod organisms;
pub mod search;
