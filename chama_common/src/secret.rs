use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A value that must never end up in logs or error messages, such as API keys and shared proxy secrets.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default + AsRef<[u8]>> Secret<T> {
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().is_empty()
    }

    /// Compares the secret against a candidate value without short-circuiting on the first differing byte.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        let secret = self.value.as_ref();
        if secret.len() != candidate.len() {
            return false;
        }
        secret.iter().zip(candidate).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::Secret;

    #[test]
    fn secrets_are_masked() {
        let s = Secret::new("sk_test_abc".to_string());
        assert_eq!(format!("{s}"), "****");
        assert_eq!(format!("{s:?}"), "****");
        assert_eq!(s.reveal(), "sk_test_abc");
    }

    #[test]
    fn matching() {
        let s = Secret::new("proxy-secret".to_string());
        assert!(s.matches(b"proxy-secret"));
        assert!(!s.matches(b"proxy-secreT"));
        assert!(!s.matches(b"proxy"));
        assert!(!s.matches(b""));
        assert!(Secret::<String>::default().is_empty());
    }
}
