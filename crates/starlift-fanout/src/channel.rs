//! # Channel Specs
//!
//! Clients subscribe by channel spec string:
//!
//! - `tree:{force}` — tree snapshots for one force
//! - `transfer:{transferId}` / `transfer:*` — transfer state updates
//! - `log:{transferId}` / `log:*` — transaction-log events

use starlift_core::TransferId;

/// A channel spec that failed to parse.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChannelError {
    /// No `prefix:argument` structure.
    #[error("channel spec '{0}' is missing a ':' separator")]
    MissingSeparator(String),
    /// Unknown channel prefix.
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
    /// The argument part was empty.
    #[error("channel spec '{0}' has an empty argument")]
    EmptyArgument(String),
}

/// A parsed client subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionPattern {
    /// Tree snapshots for one force.
    Tree {
        /// The force whose tree to follow.
        force: String,
    },
    /// Transfer updates; `None` is the wildcard.
    Transfer(Option<TransferId>),
    /// Transaction-log events; `None` is the wildcard.
    Log(Option<TransferId>),
}

impl SubscriptionPattern {
    /// Whether this pattern covers the tree channel of `force`.
    pub fn matches_tree(&self, force: &str) -> bool {
        matches!(self, Self::Tree { force: f } if f == force)
    }

    /// Whether this pattern covers the transfer channel of `id`.
    pub fn matches_transfer(&self, id: &TransferId) -> bool {
        match self {
            Self::Transfer(None) => true,
            Self::Transfer(Some(subscribed)) => subscribed == id,
            _ => false,
        }
    }

    /// Whether this pattern covers the log channel of `id`.
    pub fn matches_log(&self, id: &TransferId) -> bool {
        match self {
            Self::Log(None) => true,
            Self::Log(Some(subscribed)) => subscribed == id,
            _ => false,
        }
    }
}

impl std::str::FromStr for SubscriptionPattern {
    type Err = ChannelError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (prefix, arg) = spec
            .split_once(':')
            .ok_or_else(|| ChannelError::MissingSeparator(spec.to_string()))?;
        if arg.is_empty() {
            return Err(ChannelError::EmptyArgument(spec.to_string()));
        }
        match prefix {
            "tree" => Ok(Self::Tree {
                force: arg.to_string(),
            }),
            "transfer" if arg == "*" => Ok(Self::Transfer(None)),
            "transfer" => Ok(Self::Transfer(Some(
                TransferId::new(arg).map_err(|_| ChannelError::EmptyArgument(spec.to_string()))?,
            ))),
            "log" if arg == "*" => Ok(Self::Log(None)),
            "log" => Ok(Self::Log(Some(
                TransferId::new(arg).map_err(|_| ChannelError::EmptyArgument(spec.to_string()))?,
            ))),
            _ => Err(ChannelError::UnknownChannel(spec.to_string())),
        }
    }
}

impl std::fmt::Display for SubscriptionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree { force } => write!(f, "tree:{force}"),
            Self::Transfer(None) => f.write_str("transfer:*"),
            Self::Transfer(Some(id)) => write!(f, "transfer:{id}"),
            Self::Log(None) => f.write_str("log:*"),
            Self::Log(Some(id)) => write!(f, "log:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_channel_kinds() {
        assert_eq!(
            "tree:player".parse::<SubscriptionPattern>().unwrap(),
            SubscriptionPattern::Tree {
                force: "player".to_string()
            }
        );
        assert_eq!(
            "transfer:*".parse::<SubscriptionPattern>().unwrap(),
            SubscriptionPattern::Transfer(None)
        );
        assert_eq!(
            "log:transfer_1_aa".parse::<SubscriptionPattern>().unwrap(),
            SubscriptionPattern::Log(Some(TransferId::new("transfer_1_aa").unwrap()))
        );
    }

    #[test]
    fn rejects_malformed_specs() {
        assert_eq!(
            "tree".parse::<SubscriptionPattern>(),
            Err(ChannelError::MissingSeparator("tree".to_string()))
        );
        assert_eq!(
            "tree:".parse::<SubscriptionPattern>(),
            Err(ChannelError::EmptyArgument("tree:".to_string()))
        );
        assert_eq!(
            "topic:x".parse::<SubscriptionPattern>(),
            Err(ChannelError::UnknownChannel("topic:x".to_string()))
        );
    }

    #[test]
    fn display_round_trips() {
        for spec in ["tree:player", "transfer:*", "transfer:transfer_1_aa", "log:*"] {
            let pattern: SubscriptionPattern = spec.parse().unwrap();
            assert_eq!(pattern.to_string(), spec);
        }
    }

    #[test]
    fn matching_is_exact_or_wildcard() {
        let id = TransferId::new("transfer_1_aa").unwrap();
        let other = TransferId::new("transfer_2_bb").unwrap();

        assert!(SubscriptionPattern::Transfer(None).matches_transfer(&id));
        assert!(SubscriptionPattern::Transfer(Some(id.clone())).matches_transfer(&id));
        assert!(!SubscriptionPattern::Transfer(Some(other)).matches_transfer(&id));
        // Transfer patterns never match log channels and vice versa.
        assert!(!SubscriptionPattern::Transfer(None).matches_log(&id));
        assert!(!SubscriptionPattern::Log(None).matches_transfer(&id));
    }
}
