pub mod document;
pub mod items;
pub mod package;
pub mod rels;
pub mod xml;
