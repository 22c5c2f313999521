//! Identifier types for portfolio entities.
//!
//! Newtypes keep trade, counterparty and netting set identifiers from being
//! mixed up. All of them serialise as plain strings and order
//! lexicographically, which fixes the trade order of a portfolio.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier for a trade; also the cube row key.
    ///
    /// ```
    /// use pricer_amc::portfolio::TradeId;
    ///
    /// let id = TradeId::new("TRADE001");
    /// assert_eq!(id.as_str(), "TRADE001");
    /// ```
    TradeId
);

string_id!(
    /// Identifier of a counterparty.
    CounterpartyId
);

string_id!(
    /// Identifier of a netting set, used to aggregate exposures.
    NettingSetId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_id_conversions() {
        let a = TradeId::from("T1");
        let b = TradeId::from("T1".to_string());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "T1");
        assert_eq!(a.as_ref(), "T1");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids = vec![TradeId::new("T10"), TradeId::new("T2"), TradeId::new("T1")];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(TradeId::as_str).collect();
        assert_eq!(names, vec!["T1", "T10", "T2"]);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&NettingSetId::new("NS1")).unwrap();
        assert_eq!(json, "\"NS1\"");
        let back: CounterpartyId = serde_json::from_str("\"CP7\"").unwrap();
        assert_eq!(back.as_str(), "CP7");
    }
}
