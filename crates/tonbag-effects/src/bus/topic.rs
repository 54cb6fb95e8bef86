use std::fmt;
use std::marker::PhantomData;

/// A named channel carrying payloads of type `T`.
///
/// Topics are meant to be declared as constants:
///
/// ```
/// use tonbag_effects::Topic;
///
/// pub const TICK: Topic<u64> = Topic::new("tick");
/// assert_eq!(TICK.name(), "tick");
/// ```
pub struct Topic<T> {
    name: &'static str,
    _payload: PhantomData<fn(T)>,
}

impl<T> Topic<T> {
    /// Declare a topic.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    /// Channel name, used for logging and registry keys.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls: the derives would demand `T: Clone` etc.
impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Topic<T> {}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Topic").field(&self.name).finish()
    }
}
