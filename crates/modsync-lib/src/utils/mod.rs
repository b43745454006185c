pub mod fs;
pub mod version;

pub use version::{compare_versions, Version};
