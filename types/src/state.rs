//! Closed enumerations for the trust and transfer state machines.
//!
//! Raw strings arriving from the API layer are parsed exactly once, at the
//! boundary, through `FromStr`. Anything outside the fixed set is an
//! [`CanopyError::InvalidArgument`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CanopyError;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every member of the set, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CanopyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(CanopyError::InvalidArgument(format!(
                        "{} must be one of {}, got `{}`",
                        $label,
                        [$($wire),+].join(","),
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum!(
    /// The authority a trust edge grants. Also the capability the
    /// authorization evaluator is asked about.
    TrustType, "trust type" {
        Send => "send",
        Manage => "manage",
        Deduct => "deduct",
    }
);

/// A capability one wallet may hold over another.
pub type Capability = TrustType;

wire_enum!(
    /// Lifecycle state of a trust relationship row.
    TrustState, "trust state" {
        /// Created by `request()`, awaiting the target's answer.
        Requested => "requested",
        /// Cancelled by the entity that made the request.
        CancelledByOriginator => "cancelled_by_originator",
        /// Cancelled by the entity the request was addressed to.
        CancelledByActor => "cancelled_by_actor",
        /// Accepted; authority is in force.
        Trusted => "trusted",
    }
);

impl TrustState {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::CancelledByOriginator | Self::CancelledByActor)
    }

    /// Whether a cancel may still be applied.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Requested | Self::Trusted)
    }
}

wire_enum!(
    /// The kind of request that produced a trust relationship.
    TrustRequestType, "trust request type" {
        Send => "send",
        Received => "received",
        Manage => "manage",
        Yield => "yield",
        Deduct => "deduct",
        Release => "release",
    }
);

impl TrustRequestType {
    /// The capability a request of this type concerns.
    ///
    /// Each capability has a forward request type and its inverse:
    /// send/received, manage/yield, deduct/release.
    pub fn trust_type(&self) -> TrustType {
        match self {
            Self::Send | Self::Received => TrustType::Send,
            Self::Manage | Self::Yield => TrustType::Manage,
            Self::Deduct | Self::Release => TrustType::Deduct,
        }
    }
}

wire_enum!(
    /// Lifecycle state of a transfer.
    TransferState, "transfer state" {
        Pending => "pending",
        Completed => "completed",
        Voided => "voided",
    }
);

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

wire_enum!(
    /// Kind of custody movement. Only plain sends exist today.
    TransferType, "transfer type" {
        Send => "send",
    }
);
