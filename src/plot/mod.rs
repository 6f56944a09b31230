//! Figure rendering for mooring analyses.
//!
//! Four static PNG figures summarize an analysis:
//!
//! | Figure | Content |
//! |--------|---------|
//! | 1 | Absolute salinity observations, M2 fit and residuals |
//! | 2 | U and V velocity observations, M2 fits and residuals |
//! | 3 | Tidal current hodograph with the fitted ellipse and major axis |
//! | 4 | Absolute salinity before and after boxcar filtering |
//!
//! Files are named `ex3fig{n}-<identifier>-<course>.png` by [`FigureNaming`].
//! Drawing requires the `plotting` feature; naming is always available so
//! that configurations can be validated without a drawing backend.

#[cfg(feature = "plotting")]
mod figures;

#[cfg(feature = "plotting")]
pub use figures::{plot_ctd_fit, plot_filtering, plot_tidal_ellipse, plot_velocity_fit};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Identifier left in place by the exercise template.
const TEMPLATE_IDENTIFIER: &str = "YourName";

/// Error type for figure rendering.
#[derive(Debug, Error)]
pub enum PlotError {
    /// IO error creating the output directory
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Identifier or course not usable in a file name
    #[error("Invalid figure name component: {0}")]
    InvalidName(String),

    /// Nothing to draw
    #[error("Empty series: {0}")]
    EmptySeries(&'static str),

    /// Backend failure while drawing
    #[error("Drawing error: {0}")]
    Drawing(String),
}

/// The four analysis figures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Figure {
    CtdFit,
    VelocityFit,
    TidalEllipse,
    Filtering,
}

impl Figure {
    /// All figures in output order.
    pub const ALL: [Figure; 4] = [
        Figure::CtdFit,
        Figure::VelocityFit,
        Figure::TidalEllipse,
        Figure::Filtering,
    ];

    /// Figure number used in the file name.
    pub fn number(self) -> u8 {
        match self {
            Figure::CtdFit => 1,
            Figure::VelocityFit => 2,
            Figure::TidalEllipse => 3,
            Figure::Filtering => 4,
        }
    }
}

/// Output file naming, `ex3fig{n}-<identifier>-<course>.png`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FigureNaming {
    identifier: String,
    course: String,
}

impl FigureNaming {
    /// Create a naming scheme.
    ///
    /// # Errors
    ///
    /// Rejects empty components, the template placeholder `YourName`, and
    /// anything containing whitespace, path separators or `-`.
    pub fn new(identifier: impl Into<String>, course: impl Into<String>) -> Result<Self, PlotError> {
        let identifier = identifier.into();
        let course = course.into();

        for component in [&identifier, &course] {
            validate_component(component)?;
        }
        if identifier == TEMPLATE_IDENTIFIER {
            return Err(PlotError::InvalidName(format!(
                "'{}' is the template placeholder",
                identifier
            )));
        }

        Ok(Self { identifier, course })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    /// File name for a figure.
    pub fn file_name(&self, figure: Figure) -> String {
        format!(
            "ex3fig{}-{}-{}.png",
            figure.number(),
            self.identifier,
            self.course
        )
    }

    /// Full path of a figure inside `dir`.
    pub fn path_in(&self, dir: &Path, figure: Figure) -> PathBuf {
        dir.join(self.file_name(figure))
    }
}

fn validate_component(component: &str) -> Result<(), PlotError> {
    if component.is_empty() {
        return Err(PlotError::InvalidName("empty".to_string()));
    }
    if component
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '-'))
    {
        return Err(PlotError::InvalidName(format!(
            "'{}' contains whitespace, '-' or a path separator",
            component
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let naming = FigureNaming::new("Hansen", "Messfern").unwrap();
        let names: Vec<String> = Figure::ALL.iter().map(|&f| naming.file_name(f)).collect();
        assert_eq!(
            names,
            vec![
                "ex3fig1-Hansen-Messfern.png",
                "ex3fig2-Hansen-Messfern.png",
                "ex3fig3-Hansen-Messfern.png",
                "ex3fig4-Hansen-Messfern.png",
            ]
        );

        let path = naming.path_in(Path::new("figures"), Figure::TidalEllipse);
        assert_eq!(path, Path::new("figures/ex3fig3-Hansen-Messfern.png"));
    }

    #[test]
    fn test_rejects_bad_components() {
        assert!(FigureNaming::new("", "Messfern").is_err());
        assert!(FigureNaming::new("Hansen", "").is_err());
        assert!(FigureNaming::new("YourName", "Messfern").is_err());
        assert!(FigureNaming::new("A B", "Messfern").is_err());
        assert!(FigureNaming::new("../x", "Messfern").is_err());
        assert!(FigureNaming::new("Hansen", "Mess-fern").is_err());
    }
}
