use crate::drivers::error::ParseError;
/// One parsed line: a fixed-width tuple of channel values.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    values: Vec<f64>,
}
impl Sample {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    pub fn width(&self) -> usize {
        self.values.len()
    }
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }
}
/// Parse a comma-separated line into a [`Sample`].
///
/// Every field must be a finite number; a single bad field rejects the whole line.
/// Whitespace around fields (and a trailing `\r\n`) is ignored.
pub fn parse_sample(line: &str) -> Result<Sample, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut values = Vec::with_capacity(line.matches(',').count() + 1);
    for (column, raw) in line.split(',').enumerate() {
        let field = raw.trim();
        let value: f64 = field.parse().map_err(|_| ParseError::InvalidField {
            column,
            field: field.to_owned(),
        })?;
        if !value.is_finite() {
            return Err(ParseError::NonFinite { column });
        }
        values.push(value);
    }
    Ok(Sample::new(values))
}
