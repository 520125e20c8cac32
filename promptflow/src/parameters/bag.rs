//! Immutable parameter bag.

use super::Parameters;
use crate::errors::PromptflowError;
use std::sync::Arc;

/// An append-only set of parameter values.
///
/// The bag is never mutated in place: [`ParameterBag::with_parameter`]
/// returns a new bag and leaves every snapshot handed out earlier intact.
/// Clones share storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBag {
    values: Arc<Parameters>,
}

impl ParameterBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bag from existing values.
    #[must_use]
    pub fn from_parameters(values: Parameters) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Checks if a name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns a new bag with one more value.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedError` if the name is already present.
    pub fn with_parameter(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, PromptflowError> {
        let name = name.into();

        if self.values.contains_key(&name) {
            return Err(PromptflowError::unexpected(format!(
                "Parameter `{{{name}}}` is already defined and can not be set twice"
            )));
        }

        let mut values = Parameters::clone(&self.values);
        values.insert(name, value.into());
        Ok(Self::from_parameters(values))
    }

    /// Iterates over names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Borrows the underlying map.
    #[must_use]
    pub fn as_parameters(&self) -> &Parameters {
        &self.values
    }

    /// Returns a copy of all values.
    #[must_use]
    pub fn to_parameters(&self) -> Parameters {
        Parameters::clone(&self.values)
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_parameters(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
