//! Error types for the tornado-figures crate.
use std::path::PathBuf;
use thiserror::Error;

/// Error type for the sounding and grid analysis routines.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum AnalysisError {
    /// A profile that is required for this analysis is missing.
    #[error("Missing profile required for the analysis.")]
    MissingProfile,
    /// A value (surface value, index, location, etc) that is required is not available.
    #[error("Missing value required for analysis.")]
    MissingValue,
    /// Not enough data available for anlaysis
    #[error("Not enough data available for analysis.")]
    NotEnoughData,
    /// There is no data available that meets the requirements.
    #[error("Profile is full of missing values, cannot do analysis.")]
    NoDataProfile,
    /// Bad or invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),
    /// Missing data during interpolation, or it would have been extrapolation
    #[error("None value encountered during interpolation.")]
    InterpolationError,
    /// A formula from the metfor crate returned no value.
    #[error("Error bubbled up from metfor crate.")]
    MetForError,
    /// A variable that was requested from a dataset is not there.
    #[error("Variable not found: {0}")]
    MissingVariable(String),
    /// A coordinate value (time, level) that was requested from a dataset is not there.
    #[error("Selection failed: {0}")]
    Selection(String),
}

/// Shorthand for results.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error type for loading data and producing figures.
#[derive(Debug, Error)]
pub enum FigureError {
    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The NetCDF library reported an error.
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// A shapefile could not be read.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// A derived field could not be computed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// An invalid combination of arguments was passed to a drawing call.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Data that cannot be downloaded automatically is not present.
    #[error("{0}")]
    LicensedDataMissing(String),

    /// An input file must be supplied by hand.
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Retrieving a missing dataset failed.
    #[error("Retrieval failed: {0}")]
    Fetch(String),

    /// A text input file is malformed.
    #[error("Parse error in {file} line {line}: {message}")]
    Parse {
        /// Name of the file being parsed.
        file: String,
        /// Line number, starting at 1.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Drawing the figure failed.
    #[error("Render error: {0}")]
    Render(String),

    /// The configuration file could not be understood.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Shorthand for results of loading and figure functions.
pub type FigureResult<T> = std::result::Result<T, FigureError>;
