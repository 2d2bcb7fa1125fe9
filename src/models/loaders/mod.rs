pub mod document_loader;
pub mod seed_loader;

pub use document_loader::{load_document, load_documents};
pub use seed_loader::{load_seed_file, SeedCatalog};
