/// Successful result of [`crate::RestClient::execute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome<T> {
    /// HTTP status of the resolving attempt.
    pub status: u16,
    /// Response body decoded from JSON.
    pub value: T,
}

impl<T> Outcome<T> {
    pub fn into_parts(self) -> (u16, T) {
        (self.status, self.value)
    }
}
