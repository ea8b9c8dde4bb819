use core::iter::FusedIterator;

/// One parsed record: an ordered sequence of fields, each either NULL or a
/// (possibly empty) byte string.
///
/// Field values are stored back to back in a single buffer. For the CSV
/// record `a,"b","c""d",e` the buffer holds `abc"de` and the field ends are
/// `[1, 2, 5, 6]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    buffer: Vec<u8>,
    ends: Vec<usize>,
    nulls: Vec<bool>,
    line: u64,
    end_of_data: bool,
}

impl Record {
    /// Builds a record from explicit field values.
    ///
    /// ```rust
    /// use csvmodem::Record;
    ///
    /// let record = Record::from_fields([Some("1"), None, Some("")]);
    /// assert_eq!(record.len(), 3);
    /// assert_eq!(record.get(1), Some(None));
    /// assert_eq!(record.get(2), Some(Some(&b""[..])));
    /// ```
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut record = Self::default();
        for field in fields {
            match field {
                Some(text) => {
                    record.extend_value(text.as_bytes());
                    record.end_field(false);
                }
                None => record.end_field(true),
            }
        }
        record
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Returns `true` if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// The field at `index`: `None` when out of range, `Some(None)` for NULL.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Option<&[u8]>> {
        let end = *self.ends.get(index)?;
        if self.nulls[index] {
            return Some(None);
        }
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        Some(Some(&self.buffer[start..end]))
    }

    /// Iterates over the fields in order.
    #[must_use]
    pub fn iter(&self) -> Fields<'_> {
        Fields {
            record: self,
            index: 0,
        }
    }

    /// Line on which the record begins (1-based, counting from the start of
    /// the stream).
    #[must_use]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns `true` for the `\.` end-of-data marker.
    #[must_use]
    pub fn is_end_of_data(&self) -> bool {
        self.end_of_data
    }

    pub(crate) fn extend_value(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub(crate) fn push_value_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    /// Closes the current field at the end of the buffer.
    pub(crate) fn end_field(&mut self, null: bool) {
        self.ends.push(self.buffer.len());
        self.nulls.push(null);
    }

    pub(crate) fn set_line(&mut self, line: u64) {
        self.line = line;
    }

    pub(crate) fn mark_end_of_data(&mut self) {
        self.end_of_data = true;
    }
}

impl<'r> IntoIterator for &'r Record {
    type Item = Option<&'r [u8]>;
    type IntoIter = Fields<'r>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the fields of a [`Record`].
#[derive(Debug, Clone)]
pub struct Fields<'r> {
    record: &'r Record,
    index: usize,
}

impl<'r> Iterator for Fields<'r> {
    type Item = Option<&'r [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let field = self.record.get(self.index)?;
        self.index += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.record.len() - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Fields<'_> {}

impl FusedIterator for Fields<'_> {}
