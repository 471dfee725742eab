//! Document sources.

pub mod file;
pub mod html;
pub mod memory;

pub use file::HtmlFileSource;
pub use html::HtmlDocument;
pub use memory::MemoryDocumentSource;
