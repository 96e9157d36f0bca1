//! Side effects fired after a status write lands.
//!
//! Hooks run after the write and are never rolled back; a failed hook is
//! logged by the reconciler and the next cycle does not retry it (the row is
//! no longer in flight). Both current hooks are idempotent writes, so a crash
//! between status update and hook only costs the side effect.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use stratus_core::{CloudAccountStatus, OrganizationStatus};
use stratus_store::{CloudAccountStore, OrganizationStore, UserStore};

/// Post-transition side effect for one resource kind.
#[async_trait]
pub trait TransitionHook<S: Send + Sync>: Send + Sync {
    async fn applied(&self, id: &str, previous: S, current: S) -> anyhow::Result<()>;
}

/// Flags the account's IAM resources as provisioned once creation completes.
pub struct CloudAccountIamHook<S: CloudAccountStore> {
    store: Arc<S>,
}

impl<S: CloudAccountStore> CloudAccountIamHook<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: CloudAccountStore> TransitionHook<CloudAccountStatus> for CloudAccountIamHook<S> {
    async fn applied(
        &self,
        id: &str,
        _previous: CloudAccountStatus,
        current: CloudAccountStatus,
    ) -> anyhow::Result<()> {
        if current != CloudAccountStatus::Created {
            return Ok(());
        }
        self.store.set_iam_created(id, true).await?;
        info!(cloud_account_id = %id, "Marked IAM resources created");
        Ok(())
    }
}

/// Records the organization's admin user once creation completes.
pub struct OrganizationAdminHook<O: OrganizationStore, U: UserStore> {
    organizations: Arc<O>,
    users: Arc<U>,
}

impl<O: OrganizationStore, U: UserStore> OrganizationAdminHook<O, U> {
    pub fn new(organizations: Arc<O>, users: Arc<U>) -> Self {
        Self {
            organizations,
            users,
        }
    }
}

#[async_trait]
impl<O: OrganizationStore, U: UserStore> TransitionHook<OrganizationStatus>
    for OrganizationAdminHook<O, U>
{
    async fn applied(
        &self,
        id: &str,
        _previous: OrganizationStatus,
        current: OrganizationStatus,
    ) -> anyhow::Result<()> {
        if current != OrganizationStatus::Created {
            return Ok(());
        }

        match self.users.organization_admin(id).await? {
            Some(admin) => {
                self.organizations.set_admin(id, admin.id).await?;
                info!(
                    organization_id = %id,
                    admin = %admin.account_id,
                    "Recorded organization admin"
                );
            }
            None => {
                warn!(organization_id = %id, "Organization has no admin user yet");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use stratus_store::{
        OrganizationRecord, ResourceRow, Result as StoreResult, StatusStore, StoreError,
        UserRecord,
    };

    use super::*;

    #[derive(Default)]
    struct FakeCloudAccounts {
        iam_flags: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl StatusStore for FakeCloudAccounts {
        type Status = CloudAccountStatus;

        async fn list_transitional(&self) -> StoreResult<Vec<ResourceRow<CloudAccountStatus>>> {
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            _id: &str,
            _status: CloudAccountStatus,
            _status_desc: &str,
            _workflow_ref: &str,
        ) -> StoreResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl CloudAccountStore for FakeCloudAccounts {
        async fn set_iam_created(&self, id: &str, created: bool) -> StoreResult<()> {
            self.iam_flags.lock().unwrap().push((id.to_string(), created));
            Ok(())
        }
    }

    #[tokio::test]
    async fn iam_flag_set_on_created_only() {
        let store = Arc::new(FakeCloudAccounts::default());
        let hook = CloudAccountIamHook::new(store.clone());

        hook.applied("ca-1", CloudAccountStatus::Creating, CloudAccountStatus::Created)
            .await
            .unwrap();
        hook.applied("ca-2", CloudAccountStatus::Deleting, CloudAccountStatus::Deleted)
            .await
            .unwrap();

        assert_eq!(
            *store.iam_flags.lock().unwrap(),
            vec![("ca-1".to_string(), true)]
        );
    }

    #[derive(Default)]
    struct FakeOrganizations {
        admins: Mutex<Vec<(String, Uuid)>>,
    }

    #[async_trait]
    impl StatusStore for FakeOrganizations {
        type Status = OrganizationStatus;

        async fn list_transitional(&self) -> StoreResult<Vec<ResourceRow<OrganizationStatus>>> {
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            _id: &str,
            _status: OrganizationStatus,
            _status_desc: &str,
            _workflow_ref: &str,
        ) -> StoreResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl OrganizationStore for FakeOrganizations {
        async fn get(&self, id: &str) -> StoreResult<OrganizationRecord> {
            Err(StoreError::not_found("organization", id))
        }

        async fn set_admin(&self, id: &str, admin_id: Uuid) -> StoreResult<()> {
            self.admins.lock().unwrap().push((id.to_string(), admin_id));
            Ok(())
        }
    }

    struct FakeUsers {
        admin: Option<UserRecord>,
    }

    #[async_trait]
    impl UserStore for FakeUsers {
        async fn organization_admin(
            &self,
            _organization_id: &str,
        ) -> StoreResult<Option<UserRecord>> {
            Ok(self.admin.clone())
        }
    }

    #[tokio::test]
    async fn admin_recorded_on_created() {
        let organizations = Arc::new(FakeOrganizations::default());
        let admin_id = Uuid::new_v4();
        let users = Arc::new(FakeUsers {
            admin: Some(UserRecord {
                id: admin_id,
                account_id: "admin".into(),
            }),
        });

        let hook = OrganizationAdminHook::new(organizations.clone(), users);
        hook.applied("o-1", OrganizationStatus::Creating, OrganizationStatus::Created)
            .await
            .unwrap();

        assert_eq!(
            *organizations.admins.lock().unwrap(),
            vec![("o-1".to_string(), admin_id)]
        );
    }

    #[tokio::test]
    async fn missing_admin_is_tolerated() {
        let organizations = Arc::new(FakeOrganizations::default());
        let users = Arc::new(FakeUsers { admin: None });

        let hook = OrganizationAdminHook::new(organizations.clone(), users);
        hook.applied("o-1", OrganizationStatus::Creating, OrganizationStatus::Created)
            .await
            .unwrap();

        assert!(organizations.admins.lock().unwrap().is_empty());
    }
}
