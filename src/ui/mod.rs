pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, section, status, success, summary_row, warn};
pub use table::{failures_table, TableBuilder};
pub use theme::{error_theme, theme, Theme};
