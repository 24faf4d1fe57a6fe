//! User administration.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::AdminError;
use crate::domain::account::{User, UserUpdate};
use crate::domain::billing::{UserCredits, UserSubscription};
use crate::domain::foundation::{
    AuthenticatedUser, DomainError, ErrorCode, Timestamp, UserId, UserRole,
};
use crate::domain::usage::DailyUsage;
use crate::ports::{BillingRepository, Page, PageRequest, UsageRepository, UserRepository};

#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub email: String,
    pub display_name: Option<String>,
    pub role: UserRole,
}

/// A user record with today's activity and billing state.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub usage_today: DailyUsage,
    pub credits: UserCredits,
    pub subscription: Option<UserSubscription>,
}

pub struct UserAdminHandler {
    users: Arc<dyn UserRepository>,
    usage: Arc<dyn UsageRepository>,
    billing: Arc<dyn BillingRepository>,
}

fn user_not_found() -> DomainError {
    DomainError::new(ErrorCode::UserNotFound, "User not found")
}

impl UserAdminHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        usage: Arc<dyn UsageRepository>,
        billing: Arc<dyn BillingRepository>,
    ) -> Self {
        Self { users, usage, billing }
    }

    pub async fn list(
        &self,
        page: PageRequest,
        search: Option<&str>,
    ) -> Result<Page<User>, AdminError> {
        Ok(self.users.list(page, search).await?)
    }

    pub async fn get(&self, id: &UserId) -> Result<UserDetail, AdminError> {
        let user = self.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
        let now = Timestamp::now();
        Ok(UserDetail {
            usage_today: self.usage.get_for_day(id, now.date()).await?,
            credits: self.billing.credits(id).await?,
            subscription: self.billing.current_subscription(id, now).await?,
            user,
        })
    }

    pub async fn create(&self, cmd: CreateUserCommand) -> Result<User, AdminError> {
        let user = User::new(&cmd.email, cmd.display_name, cmd.role)?;
        if self.users.find_by_email(&user.email).await?.is_some() {
            return Err(
                DomainError::new(ErrorCode::AlreadyExists, "Email already registered").into(),
            );
        }
        self.users.create(&user).await?;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: &UserId,
        update: UserUpdate,
    ) -> Result<User, AdminError> {
        if &actor.id == id && update.locks_out_self() {
            return Err(AdminError::SelfModification("deactivate or demote"));
        }
        let mut user = self.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
        user.apply(update)?;
        self.users.update(&user).await?;
        info!(actor = %actor.id, user_id = %user.id, "user updated");
        Ok(user)
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: &UserId) -> Result<(), AdminError> {
        if &actor.id == id {
            return Err(AdminError::SelfModification("delete"));
        }
        if !self.users.delete(id).await? {
            return Err(user_not_found().into());
        }
        info!(actor = %actor.id, user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryBillingRepository, InMemoryUsageRepository, InMemoryUserRepository,
    };

    struct Fixture {
        users: InMemoryUserRepository,
        handler: UserAdminHandler,
        admin: AuthenticatedUser,
    }

    async fn fixture() -> Fixture {
        let users = InMemoryUserRepository::new();
        let admin = User::new("admin@example.com", None, UserRole::Admin).unwrap();
        users.insert(admin.clone()).await;
        let handler = UserAdminHandler::new(
            Arc::new(users.clone()),
            Arc::new(InMemoryUsageRepository::new()),
            Arc::new(InMemoryBillingRepository::new()),
        );
        Fixture {
            users,
            handler,
            admin: admin.to_authenticated().unwrap(),
        }
    }

    fn create(email: &str) -> CreateUserCommand {
        CreateUserCommand {
            email: email.into(),
            display_name: Some("New".into()),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn create_normalizes_and_rejects_duplicates() {
        let f = fixture().await;

        let user = f.handler.create(create(" New@Example.com ")).await.unwrap();
        assert_eq!(user.email, "new@example.com");

        let err = f.handler.create(create("new@example.com")).await.unwrap_err();
        assert!(matches!(err, AdminError::Domain(ref e) if e.code == ErrorCode::AlreadyExists));
    }

    #[tokio::test]
    async fn list_searches_by_email() {
        let f = fixture().await;
        f.handler.create(create("alice@example.com")).await.unwrap();
        f.handler.create(create("bob@example.com")).await.unwrap();

        let page = f.handler.list(PageRequest::default(), Some("ALICE")).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].email, "alice@example.com");
    }

    #[tokio::test]
    async fn admin_cannot_lock_themselves_out() {
        let f = fixture().await;
        let own = f.admin.id;

        let demote = UserUpdate {
            role: Some(UserRole::User),
            ..UserUpdate::default()
        };
        assert!(matches!(
            f.handler.update(&f.admin, &own, demote).await,
            Err(AdminError::SelfModification(_))
        ));

        let deactivate = UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        };
        assert!(matches!(
            f.handler.update(&f.admin, &own, deactivate).await,
            Err(AdminError::SelfModification(_))
        ));
        assert!(matches!(
            f.handler.delete(&f.admin, &own).await,
            Err(AdminError::SelfModification("delete"))
        ));

        let rename = UserUpdate {
            display_name: Some(Some("Root".into())),
            ..UserUpdate::default()
        };
        let updated = f.handler.update(&f.admin, &own, rename).await.unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Root"));
    }

    #[tokio::test]
    async fn other_users_can_be_deactivated_and_deleted() {
        let f = fixture().await;
        let target = f.handler.create(create("target@example.com")).await.unwrap();

        let update = UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        };
        let updated = f.handler.update(&f.admin, &target.id, update).await.unwrap();
        assert!(!updated.is_active);

        f.handler.delete(&f.admin, &target.id).await.unwrap();
        assert!(f.users.find_by_id(&target.id).await.unwrap().is_none());
        assert!(f.handler.delete(&f.admin, &target.id).await.is_err());
    }

    #[tokio::test]
    async fn get_includes_usage_and_credits() {
        let f = fixture().await;
        let detail = f.handler.get(&f.admin.id).await.unwrap();
        assert_eq!(detail.user.email, "admin@example.com");
        assert_eq!(detail.usage_today.message_count, 0);
        assert_eq!(detail.credits.balance, 0);
        assert!(f.handler.get(&UserId::new()).await.is_err());
    }
}
