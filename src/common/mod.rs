pub mod data;
pub mod query;
pub mod util;
