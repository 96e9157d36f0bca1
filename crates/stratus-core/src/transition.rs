//! Status transition tables.
//!
//! The single source of truth for per-kind lifecycle business logic. Each kind
//! declares its in-flight statuses and a table of
//! `(current status, workflow phase) -> new status` rows; the reconcile loop
//! only ever consults the table, it never encodes transitions in control flow.
//! A missing row means "no change this cycle".

use crate::status::{
    AppGroupStatus, CloudAccountStatus, ClusterStatus, OrganizationStatus, StackStatus,
};
use crate::workflow::{WorkflowPhase, WorkflowSnapshot};

/// Explicit transition table for one resource kind.
#[derive(Debug)]
pub struct TransitionTable<S: 'static> {
    entries: &'static [(S, WorkflowPhase, S)],
}

impl<S: Copy + PartialEq> TransitionTable<S> {
    pub const fn new(entries: &'static [(S, WorkflowPhase, S)]) -> Self {
        Self { entries }
    }

    /// Looks up the transition for the current status under the given phase.
    ///
    /// Returns `None` when the table has no row, meaning the stored status
    /// stays untouched this cycle.
    pub fn apply(&self, current: S, phase: WorkflowPhase) -> Option<S> {
        self.entries
            .iter()
            .find(|(from, on, _)| *from == current && *on == phase)
            .map(|(_, _, to)| *to)
    }

    /// All rows of the table, for exhaustiveness checks in tests.
    pub fn rows(&self) -> &'static [(S, WorkflowPhase, S)] {
        self.entries
    }
}

/// What to do with an in-flight resource whose workflow reference is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyRunPolicy<S> {
    /// Leave the resource untouched; something outside the reconciler is
    /// expected to attach a run later (the cluster bootstrap path).
    Skip,
    /// Flag the resource immediately with the kind's error status.
    MarkError {
        status: S,
        message: &'static str,
    },
}

/// One reconciled resource kind: its status type, transition table, in-flight
/// set, and empty-run-reference policy.
pub trait ReconcileKind {
    type Status: Copy
        + PartialEq
        + Eq
        + std::fmt::Debug
        + std::fmt::Display
        + Send
        + Sync
        + 'static;

    /// Kind name used in logs.
    const NAME: &'static str;

    fn transitions() -> &'static TransitionTable<Self::Status>;

    /// Statuses the store adapter selects as "operation in progress".
    fn in_flight() -> &'static [Self::Status];

    fn empty_run_policy() -> EmptyRunPolicy<Self::Status>;

    /// Translates one snapshot into the resulting status.
    ///
    /// Default is a plain table lookup; kinds that react to more than the
    /// phase (cluster suspension) override this.
    fn translate(current: Self::Status, snapshot: &WorkflowSnapshot) -> Option<Self::Status> {
        Self::transitions().apply(current, snapshot.phase)
    }
}

const MISSING_RUN_REF: &str = "missing workflow reference";

use AppGroupStatus as Ag;
use CloudAccountStatus as Ca;
use ClusterStatus as Cl;
use OrganizationStatus as Org;
use StackStatus as St;
use WorkflowPhase as P;

static CLUSTER_TRANSITIONS: TransitionTable<ClusterStatus> = TransitionTable::new(&[
    (Cl::Bootstrapping, P::Running, Cl::Bootstrapping),
    (Cl::Bootstrapping, P::Succeeded, Cl::Bootstrapped),
    (Cl::Bootstrapping, P::Failed, Cl::BootstrapError),
    (Cl::Bootstrapping, P::Error, Cl::BootstrapError),
    (Cl::Installing, P::Running, Cl::Installing),
    (Cl::Installing, P::Stopped, Cl::Stopped),
    (Cl::Installing, P::Succeeded, Cl::Running),
    (Cl::Installing, P::Failed, Cl::InstallError),
    (Cl::Installing, P::Error, Cl::InstallError),
    (Cl::Deleting, P::Running, Cl::Deleting),
    (Cl::Deleting, P::Succeeded, Cl::Deleted),
    (Cl::Deleting, P::Failed, Cl::DeleteError),
    (Cl::Deleting, P::Error, Cl::DeleteError),
]);

static APP_GROUP_TRANSITIONS: TransitionTable<AppGroupStatus> = TransitionTable::new(&[
    (Ag::Installing, P::Running, Ag::Installing),
    (Ag::Installing, P::Succeeded, Ag::Running),
    (Ag::Installing, P::Failed, Ag::InstallError),
    (Ag::Installing, P::Error, Ag::InstallError),
    (Ag::Deleting, P::Running, Ag::Deleting),
    (Ag::Deleting, P::Succeeded, Ag::Deleted),
    (Ag::Deleting, P::Failed, Ag::DeleteError),
    (Ag::Deleting, P::Error, Ag::DeleteError),
]);

static CLOUD_ACCOUNT_TRANSITIONS: TransitionTable<CloudAccountStatus> = TransitionTable::new(&[
    (Ca::Creating, P::Running, Ca::Creating),
    (Ca::Creating, P::Succeeded, Ca::Created),
    (Ca::Creating, P::Failed, Ca::CreateError),
    (Ca::Creating, P::Error, Ca::CreateError),
    (Ca::Deleting, P::Running, Ca::Deleting),
    (Ca::Deleting, P::Succeeded, Ca::Deleted),
    (Ca::Deleting, P::Failed, Ca::DeleteError),
    (Ca::Deleting, P::Error, Ca::DeleteError),
]);

static ORGANIZATION_TRANSITIONS: TransitionTable<OrganizationStatus> = TransitionTable::new(&[
    (Org::Creating, P::Running, Org::Creating),
    (Org::Creating, P::Succeeded, Org::Created),
    (Org::Creating, P::Failed, Org::Error),
    (Org::Creating, P::Error, Org::Error),
    (Org::Deleting, P::Running, Org::Deleting),
    (Org::Deleting, P::Succeeded, Org::Deleted),
    (Org::Deleting, P::Failed, Org::Error),
    (Org::Deleting, P::Error, Org::Error),
]);

static STACK_TRANSITIONS: TransitionTable<StackStatus> = TransitionTable::new(&[
    (St::Installing, P::Running, St::Installing),
    (St::Installing, P::Succeeded, St::Running),
    (St::Installing, P::Failed, St::InstallError),
    (St::Installing, P::Error, St::InstallError),
    (St::Deleting, P::Running, St::Deleting),
    (St::Deleting, P::Succeeded, St::Deleted),
    (St::Deleting, P::Failed, St::DeleteError),
    (St::Deleting, P::Error, St::DeleteError),
]);

/// Clusters, including the BYOH bootstrap states.
pub struct Clusters;

impl ReconcileKind for Clusters {
    type Status = ClusterStatus;

    const NAME: &'static str = "cluster";

    fn transitions() -> &'static TransitionTable<ClusterStatus> {
        &CLUSTER_TRANSITIONS
    }

    fn in_flight() -> &'static [ClusterStatus] {
        &[Cl::Bootstrapping, Cl::Installing, Cl::Deleting]
    }

    // BYOH clusters sit in BOOTSTRAPPED with no run attached until the
    // bootstrap watcher kicks off installation, so an empty reference is
    // normal here.
    fn empty_run_policy() -> EmptyRunPolicy<ClusterStatus> {
        EmptyRunPolicy::Skip
    }

    fn translate(current: ClusterStatus, snapshot: &WorkflowSnapshot) -> Option<ClusterStatus> {
        if current == Cl::Installing && snapshot.phase == P::Running && snapshot.suspended {
            return Some(Cl::Stopped);
        }
        Self::transitions().apply(current, snapshot.phase)
    }
}

/// Application groups.
pub struct AppGroups;

impl ReconcileKind for AppGroups {
    type Status = AppGroupStatus;

    const NAME: &'static str = "app_group";

    fn transitions() -> &'static TransitionTable<AppGroupStatus> {
        &APP_GROUP_TRANSITIONS
    }

    fn in_flight() -> &'static [AppGroupStatus] {
        &[Ag::Installing, Ag::Deleting]
    }

    fn empty_run_policy() -> EmptyRunPolicy<AppGroupStatus> {
        EmptyRunPolicy::MarkError {
            status: Ag::InstallError,
            message: MISSING_RUN_REF,
        }
    }
}

/// Cloud accounts.
pub struct CloudAccounts;

impl ReconcileKind for CloudAccounts {
    type Status = CloudAccountStatus;

    const NAME: &'static str = "cloud_account";

    fn transitions() -> &'static TransitionTable<CloudAccountStatus> {
        &CLOUD_ACCOUNT_TRANSITIONS
    }

    fn in_flight() -> &'static [CloudAccountStatus] {
        &[Ca::Creating, Ca::Deleting]
    }

    fn empty_run_policy() -> EmptyRunPolicy<CloudAccountStatus> {
        EmptyRunPolicy::MarkError {
            status: Ca::CreateError,
            message: MISSING_RUN_REF,
        }
    }
}

/// Organizations.
pub struct Organizations;

impl ReconcileKind for Organizations {
    type Status = OrganizationStatus;

    const NAME: &'static str = "organization";

    fn transitions() -> &'static TransitionTable<OrganizationStatus> {
        &ORGANIZATION_TRANSITIONS
    }

    fn in_flight() -> &'static [OrganizationStatus] {
        &[Org::Creating, Org::Deleting]
    }

    fn empty_run_policy() -> EmptyRunPolicy<OrganizationStatus> {
        EmptyRunPolicy::MarkError {
            status: Org::Error,
            message: MISSING_RUN_REF,
        }
    }
}

/// Stacks.
pub struct Stacks;

impl ReconcileKind for Stacks {
    type Status = StackStatus;

    const NAME: &'static str = "stack";

    fn transitions() -> &'static TransitionTable<StackStatus> {
        &STACK_TRANSITIONS
    }

    fn in_flight() -> &'static [StackStatus] {
        &[St::Installing, St::Deleting]
    }

    fn empty_run_policy() -> EmptyRunPolicy<StackStatus> {
        EmptyRunPolicy::MarkError {
            status: St::InstallError,
            message: MISSING_RUN_REF,
        }
    }
}
