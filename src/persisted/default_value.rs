use std::fmt;

/// Value used when nothing is stored under a binding's key.
///
/// `Factory` defers expensive defaults; it is consumed on resolution, so it
/// runs at most once per binding.
pub enum DefaultValue<T> {
    Value(T),
    Factory(Box<dyn FnOnce() -> T>),
}

impl<T> DefaultValue<T> {
    /// Defer the default to a closure called only if no entry is stored.
    pub fn lazy<F>(factory: F) -> Self
    where
        F: FnOnce() -> T + 'static,
    {
        DefaultValue::Factory(Box::new(factory))
    }

    pub(crate) fn resolve(self) -> T {
        match self {
            DefaultValue::Value(value) => value,
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl<T> From<T> for DefaultValue<T> {
    fn from(value: T) -> Self {
        DefaultValue::Value(value)
    }
}

impl<T: Default> Default for DefaultValue<T> {
    fn default() -> Self {
        DefaultValue::Value(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for DefaultValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
