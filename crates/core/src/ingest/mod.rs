pub mod provider;
pub mod stub;
pub mod types;

pub use provider::{LichessClient, RatingDataSource};
pub use stub::StubDataSource;
