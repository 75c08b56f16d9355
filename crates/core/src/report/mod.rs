//! Leaderboard-level views built on top of single-player rating series.

pub mod csv;
pub mod leaderboard;

pub use self::csv::{top_players_csv, CsvExport};
pub use leaderboard::{top_player_history, top_player_names, TopPlayerHistory};
