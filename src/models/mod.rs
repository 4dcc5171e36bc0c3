//! Value types shared by the data layer.

pub mod page;
pub mod param;

pub use page::{DEFAULT_PAGE_SIZE, Direction, Page, PageRequest, Sort};
pub use param::{NullKind, SqlParam};
