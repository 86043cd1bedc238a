pub mod catalog;
pub mod check;
pub mod fetcher;

pub use check::{check_existence, ResourceStatus};
pub use fetcher::ResourceFetcher;
