//! Buyer and seller identity keys.
//!
//! Identities arrive from an upstream authentication proxy as opaque strings
//! (see the `x-buyer-id` / `x-seller-id` headers in the server). They are
//! trusted as-is; this module only guarantees they are usable as keys.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an identity key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The input is empty (or whitespace only).
    #[error("identity cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("identity must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains control characters.
    #[error("identity must not contain control characters")]
    ControlCharacter,
}

/// Maximum length of an identity key.
const MAX_IDENTITY_LENGTH: usize = 128;

fn validate(s: &str) -> Result<&str, IdentityError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::Empty);
    }
    if trimmed.chars().count() > MAX_IDENTITY_LENGTH {
        return Err(IdentityError::TooLong {
            max: MAX_IDENTITY_LENGTH,
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(IdentityError::ControlCharacter);
    }
    Ok(trimmed)
}

macro_rules! define_identity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Maximum length of the key.
            pub const MAX_LENGTH: usize = MAX_IDENTITY_LENGTH;

            /// Parse a key, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns an error if the trimmed input is empty, longer than
            /// [`Self::MAX_LENGTH`] characters, or contains control characters.
            pub fn parse(s: &str) -> Result<Self, IdentityError> {
                validate(s).map(|v| Self(v.to_owned()))
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdentityError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentityError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(Self::parse(&s)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_identity!(
    /// Identity of a buyer, as asserted by the upstream auth layer.
    BuyerId
);

define_identity!(
    /// Identity of a seller, as asserted by the upstream auth layer.
    SellerId
);
