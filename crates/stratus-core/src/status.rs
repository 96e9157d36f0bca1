//! Lifecycle status enums for every reconciled resource kind.
//!
//! Each kind carries its own closed enumeration. The string forms are what the
//! relational store persists, so `as_str`/`FromStr` must round-trip exactly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A status string read from the store did not match the kind's enumeration.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {kind} status: {value}")]
pub struct InvalidStatus {
    /// Resource kind whose enumeration was consulted.
    pub kind: &'static str,
    /// The offending stored value.
    pub value: String,
}

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Stored string form of this status.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Every value of the enumeration, for exhaustive table checks.
            pub const ALL: &'static [$name] = &[$(Self::$variant,)+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(InvalidStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

status_enum! {
    /// Lifecycle status of a cluster.
    ///
    /// BYOH clusters pass through the bootstrap states before installation;
    /// managed clusters go straight from `Pending` to `Installing`.
    ClusterStatus, "cluster" {
        Pending => "PENDING",
        Bootstrapping => "BOOTSTRAPPING",
        Bootstrapped => "BOOTSTRAPPED",
        BootstrapError => "BOOTSTRAP_ERROR",
        Installing => "INSTALLING",
        Running => "RUNNING",
        Stopped => "STOPPED",
        InstallError => "INSTALL_ERROR",
        Deleting => "DELETING",
        Deleted => "DELETED",
        DeleteError => "DELETE_ERROR",
    }
}

status_enum! {
    /// Lifecycle status of an application group deployed onto a cluster.
    AppGroupStatus, "app_group" {
        Pending => "PENDING",
        Installing => "INSTALLING",
        Running => "RUNNING",
        InstallError => "INSTALL_ERROR",
        Deleting => "DELETING",
        Deleted => "DELETED",
        DeleteError => "DELETE_ERROR",
    }
}

status_enum! {
    /// Lifecycle status of a cloud account (provider credentials plus IAM role).
    CloudAccountStatus, "cloud_account" {
        Pending => "PENDING",
        Creating => "CREATING",
        Created => "CREATED",
        CreateError => "CREATE_ERROR",
        Deleting => "DELETING",
        Deleted => "DELETED",
        DeleteError => "DELETE_ERROR",
    }
}

status_enum! {
    /// Lifecycle status of an organization.
    ///
    /// Organizations keep a single generic error state rather than per-phase
    /// error states.
    OrganizationStatus, "organization" {
        Pending => "PENDING",
        Creating => "CREATING",
        Created => "CREATED",
        Error => "ERROR",
        Deleting => "DELETING",
        Deleted => "DELETED",
    }
}

status_enum! {
    /// Lifecycle status of a stack (a cluster plus its standard app groups).
    StackStatus, "stack" {
        Pending => "PENDING",
        Installing => "INSTALLING",
        Running => "RUNNING",
        InstallError => "INSTALL_ERROR",
        Deleting => "DELETING",
        Deleted => "DELETED",
        DeleteError => "DELETE_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_status_round_trips() {
        for status in ClusterStatus::ALL {
            let parsed: ClusterStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "EXPLODING".parse::<ClusterStatus>().unwrap_err();
        assert_eq!(err.kind, "cluster");
        assert_eq!(err.value, "EXPLODING");
    }

    #[test]
    fn serde_uses_stored_form() {
        let json = serde_json::to_string(&AppGroupStatus::InstallError).unwrap();
        assert_eq!(json, "\"INSTALL_ERROR\"");
        let back: AppGroupStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AppGroupStatus::InstallError);
    }

    #[test]
    fn all_kinds_round_trip() {
        for status in AppGroupStatus::ALL {
            assert_eq!(status.as_str().parse::<AppGroupStatus>().unwrap(), *status);
        }
        for status in CloudAccountStatus::ALL {
            assert_eq!(
                status.as_str().parse::<CloudAccountStatus>().unwrap(),
                *status
            );
        }
        for status in OrganizationStatus::ALL {
            assert_eq!(
                status.as_str().parse::<OrganizationStatus>().unwrap(),
                *status
            );
        }
        for status in StackStatus::ALL {
            assert_eq!(status.as_str().parse::<StackStatus>().unwrap(), *status);
        }
    }
}
