pub mod document;
pub mod presence;
pub mod registry;
