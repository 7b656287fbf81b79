pub mod annotations;
pub mod document;
