/// Outcome of one asynchronous fetch.
///
/// Exactly one state holds at a time, so a consumer never has to decide
/// which of several fields wins.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T, E> {
    Loading,
    Succeeded(T),
    Failed(E),
}

impl<T, E> Envelope<T, E> {
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(payload) => Envelope::Succeeded(payload),
            Err(err) => Envelope::Failed(err),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Envelope::Loading)
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Envelope::Succeeded(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Envelope::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U, E> {
        match self {
            Envelope::Loading => Envelope::Loading,
            Envelope::Succeeded(payload) => Envelope::Succeeded(f(payload)),
            Envelope::Failed(err) => Envelope::Failed(err),
        }
    }

    /// `None` while still loading.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Envelope::Loading => None,
            Envelope::Succeeded(payload) => Some(Ok(payload)),
            Envelope::Failed(err) => Some(Err(err)),
        }
    }
}

impl<T, E> From<Result<T, E>> for Envelope<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Self::from_result(result)
    }
}
