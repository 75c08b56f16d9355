pub mod rating;
pub mod series;

pub use rating::{RatingPoint, RatingSeries};
pub use series::RatingSeriesBuilder;
