use thiserror::Error;
/// Why a single text line could not become a sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line is empty")]
    Empty,
    #[error("column {column} is not a number: {field:?}")]
    InvalidField { column: usize, field: String },
    #[error("column {column} is not a finite number")]
    NonFinite { column: usize },
}
#[derive(Debug, Error)]
pub enum PlotterError {
    #[error("max data points must be between {min} and {max}, got {actual}")]
    InvalidCapacity {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("no serial port selected")]
    NoPortSelected,
    #[error("failed to open {port} after {attempts} attempts: {source}")]
    Open {
        port: String,
        attempts: usize,
        #[source]
        source: serialport::Error,
    },
    #[error("not connected")]
    NotConnected,
    #[error("serial read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to open csv file {path}: {source}")]
    CsvOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write csv row: {0}")]
    CsvWrite(#[source] std::io::Error),
    #[error("failed to save settings: {0}")]
    Settings(String),
}
impl From<serde_json::Error> for PlotterError {
    fn from(value: serde_json::Error) -> Self {
        PlotterError::Settings(value.to_string())
    }
}
