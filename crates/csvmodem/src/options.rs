use crate::error::LoadError;

/// Options for the quoted, comma separated format.
///
/// # Examples
///
/// ```rust
/// use csvmodem::CsvOptions;
///
/// let options = CsvOptions {
///     delimiter: "|".into(),
///     header: true,
/// };
/// assert!(options.validate().is_ok());
/// ```
///
/// # Default
///
/// A single comma delimiter and no header record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CsvOptions {
    /// Field delimiter. May be longer than one byte.
    ///
    /// # Default
    ///
    /// `","`
    pub delimiter: String,

    /// Whether the first record names the columns and must be skipped.
    ///
    /// # Default
    ///
    /// `false`
    pub header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".into(),
            header: false,
        }
    }
}

impl CsvOptions {
    /// Checks that the delimiter can be told apart from quotes and line
    /// breaks.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidOptions`] describing the first problem.
    pub fn validate(&self) -> Result<(), LoadError> {
        validate_delimiter(&self.delimiter)?;
        if self.delimiter.contains('"') {
            return Err(LoadError::InvalidOptions(
                "CSV delimiter cannot contain a quote",
            ));
        }
        Ok(())
    }
}

/// Options for the unquoted, delimiter separated text format.
///
/// # Default
///
/// A tab delimiter, `\N` as the NULL marker and no header line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TabularOptions {
    /// Field delimiter.
    ///
    /// # Default
    ///
    /// `"\t"`
    pub delimiter: String,

    /// A field equal to this text is NULL.
    ///
    /// # Default
    ///
    /// `"\\N"`
    pub null_marker: String,

    /// Whether the first line names the columns and must be skipped.
    ///
    /// # Default
    ///
    /// `false`
    pub header: bool,
}

impl Default for TabularOptions {
    fn default() -> Self {
        Self {
            delimiter: "\t".into(),
            null_marker: "\\N".into(),
            header: false,
        }
    }
}

impl TabularOptions {
    /// Checks that the delimiter and NULL marker cannot be confused with each
    /// other or with line breaks.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidOptions`] describing the first problem.
    pub fn validate(&self) -> Result<(), LoadError> {
        validate_delimiter(&self.delimiter)?;
        if self.null_marker.contains(['\n', '\r']) {
            return Err(LoadError::InvalidOptions(
                "NULL marker cannot contain a line break",
            ));
        }
        if self.null_marker.contains(self.delimiter.as_str()) {
            return Err(LoadError::InvalidOptions(
                "NULL marker cannot contain the delimiter",
            ));
        }
        Ok(())
    }
}

fn validate_delimiter(delimiter: &str) -> Result<(), LoadError> {
    if delimiter.is_empty() {
        return Err(LoadError::InvalidOptions("delimiter cannot be empty"));
    }
    if delimiter.contains(['\n', '\r']) {
        return Err(LoadError::InvalidOptions(
            "delimiter cannot contain a line break",
        ));
    }
    Ok(())
}
