pub mod directory;
pub mod registry;
pub mod types;

pub use directory::PatentDirectory;
pub use registry::PatentRegistry;
pub use types::*;
