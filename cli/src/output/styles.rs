//! Terminal stylesheet built on `owo_colors::Style`.

use owo_colors::Style;

/// Styles for every marker and text role the CLI prints.
///
/// `Styles::default()` is the plain stylesheet used when colour is off.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Marker for steps that were not needed.
    pub skipped: Style,
    pub dim: Style,
    pub header: Style,
}

impl Styles {
    /// The coloured stylesheet.
    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red(),
            info: Style::new().blue(),
            skipped: Style::new().yellow().dimmed(),
            dim: Style::new().dimmed(),
            header: Style::new().bold().cyan(),
        }
    }
}
