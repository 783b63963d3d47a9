//! Text-backed enumerations stored in `TEXT` columns.
//!
//! Row structs decode these with `#[sqlx(try_from = "String")]` and queries
//! bind `as_str()`, so the database keeps plain strings and Rust keeps a
//! closed set of variants.

use std::fmt;

/// A column held a value that is not one of the enum's variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum!(
    /// Know-your-customer verification state of a business or consumer.
    KycStatus {
        NotStarted => "notStarted",
        Submitted => "submitted",
        Review => "review",
        Approved => "approved",
        Declined => "declined",
    }
);

impl KycStatus {
    /// Whether a customer may move from `self` to `next`.
    ///
    /// Submission starts the workflow; compliance review can escalate to
    /// manual review and then decide; a declined customer may resubmit.
    pub fn can_transition_to(self, next: KycStatus) -> bool {
        use KycStatus::*;

        matches!(
            (self, next),
            (NotStarted, Submitted)
                | (Declined, Submitted)
                | (Submitted, Review)
                | (Submitted, Approved)
                | (Submitted, Declined)
                | (Review, Approved)
                | (Review, Declined)
        )
    }

    /// Outcomes a compliance reviewer may record.
    pub fn is_review_decision(self) -> bool {
        matches!(self, Self::Review | Self::Approved | Self::Declined)
    }
}

text_enum!(EntityType {
    Llc => "llc",
    Corporation => "corporation",
    SoleProprietor => "soleProprietor",
    Partnership => "partnership",
    NonProfit => "nonProfit",
});

text_enum!(AccountStatus {
    Active => "active",
    Closed => "closed",
});

text_enum!(
    /// Card lifecycle. `Canceled` is terminal.
    CardStatus {
        Active => "active",
        Blocked => "blocked",
        Canceled => "canceled",
    }
);

text_enum!(DocumentType {
    Identity => "identity",
    ProofOfAddress => "proofOfAddress",
    ArticlesOfIncorporation => "articlesOfIncorporation",
    BankStatement => "bankStatement",
    TaxReturn => "taxReturn",
    Other => "other",
});

text_enum!(DocumentStatus {
    Pending => "pending",
    Uploaded => "uploaded",
});

text_enum!(SubscriptionStatus {
    Active => "active",
    Canceled => "canceled",
});

text_enum!(BillingInterval {
    Monthly => "monthly",
    Yearly => "yearly",
});

text_enum!(InvoiceStatus {
    Draft => "draft",
    Open => "open",
    Paid => "paid",
    Void => "void",
});

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(KycStatus::NotStarted, KycStatus::Submitted, true)]
    #[case(KycStatus::Declined, KycStatus::Submitted, true)]
    #[case(KycStatus::Submitted, KycStatus::Review, true)]
    #[case(KycStatus::Submitted, KycStatus::Approved, true)]
    #[case(KycStatus::Review, KycStatus::Declined, true)]
    #[case(KycStatus::NotStarted, KycStatus::Approved, false)]
    #[case(KycStatus::Approved, KycStatus::Declined, false)]
    #[case(KycStatus::Approved, KycStatus::Submitted, false)]
    #[case(KycStatus::Review, KycStatus::Review, false)]
    fn kyc_transitions(#[case] from: KycStatus, #[case] to: KycStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[rstest]
    fn text_round_trips_through_serde_and_strings() {
        let json = serde_json::to_string(&KycStatus::NotStarted).unwrap();
        assert_eq!(json, "\"notStarted\"");
        assert_eq!("soleProprietor".parse::<EntityType>().unwrap(), EntityType::SoleProprietor);
        assert_eq!(CardStatus::try_from("blocked".to_string()).unwrap(), CardStatus::Blocked);
    }

    #[rstest]
    fn unknown_text_names_the_enum() {
        let err = "frozen".parse::<CardStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown CardStatus `frozen`");
    }
}
