pub mod catalog;
pub mod category;
pub mod error;

pub use catalog::WordCatalog;
pub use category::{route, Category, Route, ROUTES};
pub use error::{CatalogError, Result};
