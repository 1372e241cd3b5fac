//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up the router's own order ids, the ids the venue
//! assigns, and the strategy correlation ids carried on each command.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

macro_rules! define_numeric_id {
    ($name:ident, $inner:ty, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Create a new identifier from its raw value.
            #[must_use]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Get the raw value.
            #[must_use]
            pub const fn value(&self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

define_numeric_id!(OrderId, u64, "Identifier of an order command (router side).");
define_numeric_id!(VenueOrderId, i64, "Identifier the venue assigned to a resting order.");
define_numeric_id!(StrategyId, i64, "Correlation id of the strategy that issued the order.");

/// Client-side order id sent to the venue with every placement.
///
/// Derived deterministically from the command so a redelivered Place reuses
/// the same id and the venue rejects the duplicate. Replacement ids also
/// carry the venue id of the order they replace, so repeated edits of one
/// order never collide.
///
/// Ids that would exceed [`ClientOrderId::MAX_LEN`] in readable form are
/// replaced by a digest of that form under the `ox-` prefix. The digest keeps
/// every input bit, so the step suffix is never lost to truncation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Maximum length the venue accepts for a client order id.
    pub const MAX_LEN: usize = 36;

    const DIGEST_PREFIX: &'static str = "ox-";

    /// Client id for the initial placement of an order.
    #[must_use]
    pub fn for_place(strategy_id: StrategyId, order_id: OrderId) -> Self {
        Self::derive(strategy_id, order_id, "p")
    }

    /// Client id for the replacement leg of an edit of the order resting as
    /// `replaced`.
    #[must_use]
    pub fn for_replacement(
        strategy_id: StrategyId,
        order_id: OrderId,
        replaced: VenueOrderId,
    ) -> Self {
        Self::derive(strategy_id, order_id, &format!("e{replaced}"))
    }

    fn derive(strategy_id: StrategyId, order_id: OrderId, step: &str) -> Self {
        let readable = format!("or-{strategy_id}-{order_id}-{step}");
        if readable.len() <= Self::MAX_LEN {
            return Self(readable);
        }

        let digest = hex::encode(Sha256::digest(readable.as_bytes()));
        let keep = Self::MAX_LEN - Self::DIGEST_PREFIX.len();
        Self(format!("{}{}", Self::DIGEST_PREFIX, &digest[..keep]))
    }

    /// Create from an arbitrary string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
