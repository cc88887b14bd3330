pub mod analytics;
pub mod content;
pub mod search;

pub use analytics::*;
pub use content::*;
pub use search::*;
