pub mod window;

pub use window::{display_label, resolve_today, window_dates, window_start, DEFAULT_WINDOW_DAYS};
