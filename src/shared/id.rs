//! Prefixed entity identifiers.
//!
//! Every entity is addressed at the API boundary as `<prefix>-<uuid>`
//! (for example `bus-550e8400-e29b-41d4-a716-446655440000`). The database
//! column is a plain `UUID`; the prefix only exists on the wire.
//!
//! Parsing accepts either the prefixed form or a bare UUID. A string carrying
//! another entity's prefix is rejected, so a consumer ID can never be passed
//! where a business ID is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Errors produced when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("expected an id with prefix `{expected}`, got `{found}`")]
    WrongPrefix {
        expected: &'static str,
        found: String,
    },

    #[error("malformed id `{0}`")]
    Malformed(String),

    #[error("`{0}` is not a business or consumer id")]
    UnknownOwner(String),
}

fn parse_prefixed(prefix: &'static str, value: &str) -> Result<Uuid, IdError> {
    if let Ok(uuid) = Uuid::parse_str(value) {
        return Ok(uuid);
    }

    let (found, rest) = value
        .split_once('-')
        .ok_or_else(|| IdError::Malformed(value.to_string()))?;

    if found != prefix {
        return Err(IdError::WrongPrefix {
            expected: prefix,
            found: found.to_string(),
        });
    }

    Uuid::parse_str(rest).map_err(|_| IdError::Malformed(value.to_string()))
}

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                parse_prefixed(Self::PREFIX, value).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

prefixed_id!(
    /// Identifier of a business customer.
    BusinessId,
    "bus"
);
prefixed_id!(
    /// Identifier of a consumer (individual) customer.
    ConsumerId,
    "con"
);
prefixed_id!(BankAccountId, "bac");
prefixed_id!(CardId, "crd");
prefixed_id!(DocumentId, "doc");
prefixed_id!(NoteId, "note");
prefixed_id!(SubscriptionId, "sub");
prefixed_id!(InvoiceId, "inv");
prefixed_id!(PaymentId, "pay");

/// The customer an account, document or note belongs to.
///
/// Stored as two nullable columns (`business_id`, `consumer_id`) with a
/// check constraint that exactly one is set. On the wire it is whichever
/// prefixed id applies; a bare UUID is ambiguous and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerId {
    Business(BusinessId),
    Consumer(ConsumerId),
}

impl OwnerId {
    pub fn business_id(&self) -> Option<BusinessId> {
        match self {
            Self::Business(id) => Some(*id),
            Self::Consumer(_) => None,
        }
    }

    pub fn consumer_id(&self) -> Option<ConsumerId> {
        match self {
            Self::Consumer(id) => Some(*id),
            Self::Business(_) => None,
        }
    }

    /// Rebuild from the pair of owner columns of a row.
    pub fn from_columns(business: Option<BusinessId>, consumer: Option<ConsumerId>) -> Option<Self> {
        match (business, consumer) {
            (Some(id), None) => Some(Self::Business(id)),
            (None, Some(id)) => Some(Self::Consumer(id)),
            _ => None,
        }
    }

    pub const fn as_uuid(&self) -> &Uuid {
        match self {
            Self::Business(id) => id.as_uuid(),
            Self::Consumer(id) => id.as_uuid(),
        }
    }
}

impl From<BusinessId> for OwnerId {
    fn from(id: BusinessId) -> Self {
        Self::Business(id)
    }
}

impl From<ConsumerId> for OwnerId {
    fn from(id: ConsumerId) -> Self {
        Self::Consumer(id)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Business(id) => id.fmt(f),
            Self::Consumer(id) => id.fmt(f),
        }
    }
}

impl FromStr for OwnerId {
    type Err = IdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once('-') {
            Some((BusinessId::PREFIX, _)) => value.parse().map(Self::Business),
            Some((ConsumerId::PREFIX, _)) => value.parse().map(Self::Consumer),
            _ => Err(IdError::UnknownOwner(value.to_string())),
        }
    }
}

impl Serialize for OwnerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OwnerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RAW: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[rstest]
    #[case::prefixed("bus-550e8400-e29b-41d4-a716-446655440000")]
    #[case::bare(RAW)]
    fn business_id_accepts_prefixed_and_bare(#[case] input: &str) {
        let id: BusinessId = input.parse().unwrap();
        assert_eq!(id.as_uuid(), &Uuid::parse_str(RAW).unwrap());
        assert_eq!(id.to_string(), format!("bus-{RAW}"));
    }

    #[rstest]
    fn foreign_prefix_is_rejected() {
        let err = format!("con-{RAW}").parse::<BusinessId>().unwrap_err();
        assert_eq!(
            err,
            IdError::WrongPrefix {
                expected: "bus",
                found: "con".to_string()
            }
        );
    }

    #[rstest]
    #[case("bus-not-a-uuid")]
    #[case("garbage")]
    #[case("")]
    fn malformed_ids_are_rejected(#[case] input: &str) {
        assert!(input.parse::<BusinessId>().is_err());
    }

    #[rstest]
    fn multi_part_prefix_round_trips_through_json() {
        let id = NoteId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.starts_with("\"note-"));
        let back: NoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[rstest]
    fn owner_id_dispatches_on_prefix() {
        let business: OwnerId = format!("bus-{RAW}").parse().unwrap();
        let consumer: OwnerId = format!("con-{RAW}").parse().unwrap();

        assert!(business.business_id().is_some());
        assert!(consumer.consumer_id().is_some());
        assert!(matches!(
            RAW.parse::<OwnerId>(),
            Err(IdError::UnknownOwner(_))
        ));
    }

    #[rstest]
    fn owner_id_from_columns_requires_exactly_one() {
        let business = BusinessId::new();
        let consumer = ConsumerId::new();

        assert_eq!(
            OwnerId::from_columns(Some(business), None),
            Some(OwnerId::Business(business))
        );
        assert_eq!(OwnerId::from_columns(Some(business), Some(consumer)), None);
        assert_eq!(OwnerId::from_columns(None, None), None);
    }
}
