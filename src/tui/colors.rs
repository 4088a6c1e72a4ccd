//! Color constants for the Gantt view.

use ratatui::style::Color;

use crate::fields::Status;

/// Completed bars
pub const DARK_GREEN: Color = Color::Rgb(0, 120, 0);
/// In-progress bars
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Paused bars
pub const DARK_RED: Color = Color::Rgb(150, 0, 0);
/// Milestone separators
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
/// Today marker
pub const TODAY: Color = Color::Rgb(0, 170, 200);

// Native Color::Blue is used for not started, DarkGray for excluded.

pub fn status_color(status: Status) -> Color {
    match status {
        Status::NotStarted => Color::Blue,
        Status::InProgress => GOLD,
        Status::Completed => DARK_GREEN,
        Status::Paused => DARK_RED,
    }
}
