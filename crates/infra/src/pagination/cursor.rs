use core::fmt;

use serde::{Deserialize, Serialize};

use feedline_core::RecordId;

use super::PaginationError;

/// Opaque position token handed to clients.
///
/// Clients must treat the contents as meaningless; only [`CursorCodec`]
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Bidirectional mapping between record ids and cursors.
///
/// The encoding is the canonical decimal form of the id. Decoding accepts only
/// that canonical form, so every string `encode` cannot produce is rejected.
pub struct CursorCodec;

impl CursorCodec {
    pub fn encode(id: RecordId) -> Cursor {
        Cursor(id.get().to_string())
    }

    pub fn decode(cursor: impl AsRef<str>) -> Result<RecordId, PaginationError> {
        let raw = cursor.as_ref();
        let invalid = || PaginationError::InvalidCursor(raw.to_string());

        let canonical = !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && !raw.starts_with('0');
        if !canonical {
            return Err(invalid());
        }

        let value: u64 = raw.parse().map_err(|_| invalid())?;
        RecordId::new(value).map_err(|_| invalid())
    }
}

impl AsRef<str> for Cursor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_decimal() {
        let id = RecordId::new(42).unwrap();
        assert_eq!(CursorCodec::encode(id).as_str(), "42");
        assert_eq!(CursorCodec::decode("42").unwrap(), id);
    }

    #[test]
    fn rejects_non_canonical_strings() {
        for raw in [
            "",
            "0",
            "007",
            "+7",
            "-7",
            " 7",
            "7 ",
            "1e3",
            "abc",
            "١٢",
            "18446744073709551616",
        ] {
            assert!(
                matches!(CursorCodec::decode(raw), Err(PaginationError::InvalidCursor(ref s)) if s == raw),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_max_id() {
        let max = u64::MAX.to_string();
        assert_eq!(CursorCodec::decode(&max).unwrap().get(), u64::MAX);
    }

    proptest! {
        #[test]
        fn round_trips(raw in 1u64..=u64::MAX) {
            let id = RecordId::new(raw).unwrap();
            prop_assert_eq!(CursorCodec::decode(CursorCodec::encode(id)).unwrap(), id);
        }

        #[test]
        fn decoded_strings_re_encode_identically(s in "\\PC{0,24}") {
            if let Ok(id) = CursorCodec::decode(&s) {
                let encoded = CursorCodec::encode(id);
                prop_assert_eq!(encoded.as_str(), s.as_str());
            }
        }
    }
}
