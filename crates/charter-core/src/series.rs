//! TimeSeries container for indicator output.

/// A series of optional values aligned one-to-one with a candle slice.
///
/// `None` marks a position where the value is not (yet) computable.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    values: Vec<Option<T>>,
}

impl<T> TimeSeries<T> {
    /// Creates a new empty TimeSeries.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Creates an empty series with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// A series of `len` undefined entries.
    pub fn undefined(len: usize) -> Self {
        let mut values = Vec::with_capacity(len);
        values.resize_with(len, || None);
        Self { values }
    }

    /// Wraps already-aligned values.
    pub fn from_options(values: Vec<Option<T>>) -> Self {
        Self { values }
    }

    /// Appends the entry for the next candle.
    pub fn push(&mut self, value: Option<T>) {
        self.values.push(value);
    }

    /// Returns the number of entries (defined or not).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the value at the given candle index, if defined.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    /// Index of the first defined entry.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    /// Returns an iterator over (index, value) pairs of defined entries.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|val| (i, val)))
    }

    /// Returns the underlying values slice.
    pub fn values(&self) -> &[Option<T>] {
        &self.values
    }

    /// Consumes the series, returning the aligned values.
    pub fn into_values(self) -> Vec<Option<T>> {
        self.values
    }
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<Option<T>> for TimeSeries<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
