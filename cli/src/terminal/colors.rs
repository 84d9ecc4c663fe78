use colored::Color;

pub const PRIMARY: Color = Color::BrightCyan;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const IDENTIFIER: Color = Color::BrightBlue;

pub const CRITICAL: Color = Color::BrightMagenta;
pub const HIGH: Color = Color::BrightRed;
pub const MEDIUM: Color = Color::Yellow;
pub const LOW: Color = Color::Cyan;
pub const INFORMATIONAL: Color = Color::BrightBlack;

pub const ADDED: Color = Color::BrightRed;
pub const REMOVED: Color = Color::BrightGreen;
pub const CHANGED: Color = Color::BrightYellow;
