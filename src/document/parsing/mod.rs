//! The two extraction passes: the streaming container pass over the raw XML
//! parts and the docx-rs content pass over the object model.

pub(crate) mod body;
pub mod container;
pub mod content;
pub(crate) mod drawing;
pub(crate) mod formatting;
pub mod numbering;
pub(crate) mod xml;

pub use container::extract_container;
pub use content::extract_content;
