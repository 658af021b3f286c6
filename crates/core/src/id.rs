// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate identifiers.
//!
//! Corruption aggregate ids are hyphenated UUID v4 strings. They appear in
//! log lines, event rows, and in-memory maps constantly, so they are kept
//! in a fixed-size inline buffer instead of a heap `String`: 36 bytes of
//! id plus a length, `Copy`, and usable as a `&str` map key.

/// Byte capacity of an inline id: the length of a hyphenated UUID.
pub const ID_MAX_LEN: usize = 36;

/// Returns a string slice truncated to at most `n` characters. Used for
/// the abbreviated ids in log output.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Inline ASCII id buffer. Always at most [`ID_MAX_LEN`] bytes, `Copy`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdBuf {
    len: u8,
    bytes: [u8; ID_MAX_LEN],
}

impl IdBuf {
    pub const fn empty() -> Self {
        Self { len: 0, bytes: [0; ID_MAX_LEN] }
    }

    pub fn new(s: &str) -> Self {
        debug_assert!(
            s.len() <= ID_MAX_LEN,
            "id {:?} is {} bytes, capacity is {}",
            s,
            s.len(),
            ID_MAX_LEN,
        );
        let len = s.len().min(ID_MAX_LEN);
        let mut bytes = [0u8; ID_MAX_LEN];
        bytes[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { len: len as u8, bytes }
    }

    pub fn as_str(&self) -> &str {
        // Construction copies from a &str, so the active bytes are always
        // valid UTF-8.
        match std::str::from_utf8(&self.bytes[..self.len as usize]) {
            Ok(s) => s,
            Err(_) => unreachable!("IdBuf holds non-UTF-8 bytes"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// Hash/Borrow agree with str so a HashMap<IdBuf, _> can be queried with a
// plain &str key.
impl std::hash::Hash for IdBuf {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl std::borrow::Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for IdBuf {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IdBuf {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.len() > ID_MAX_LEN {
            return Err(serde::de::Error::custom(format!(
                "id {:?} exceeds {} bytes",
                s, ID_MAX_LEN
            )));
        }
        Ok(IdBuf::new(&s))
    }
}

/// Define a newtype id over [`IdBuf`].
///
/// `new()` draws a fresh UUID v4; `from_string()` wraps an id read back
/// from storage or an event payload. The usual reference conversions
/// (`Display`, `From<&str>`/`From<String>`, `PartialEq<str>`,
/// `Borrow<str>`, `Deref<Target = str>`) come along so the id slots into
/// string-keyed maps and log macros without ceremony.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $crate::id::IdBuf);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self($crate::id::IdBuf::new(&uuid::Uuid::new_v4().to_string()))
            }

            /// Wrap an id read back from storage or an event payload.
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self($crate::id::IdBuf::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// At most the first `n` characters, for log output.
            pub fn short(&self, n: usize) -> &str {
                $crate::id::short(self.0.as_str(), n)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl From<&String> for $name {
            fn from(s: &String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0.as_str() == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier for a corruption aggregate.
    ///
    /// One corruption aggregate tracks the remediation lifecycle of a single
    /// corrupted media file; the id doubles as the event-log `aggregate_id`.
    pub struct CorruptionId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
