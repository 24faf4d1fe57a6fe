//! In-memory user repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::account::User;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{Page, PageRequest, UserRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user, replacing any existing record with the same id.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub(crate) async fn all(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(
        &self,
        page: PageRequest,
        search: Option<&str>,
    ) -> Result<Page<User>, DomainError> {
        let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        let mut matching: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| match &needle {
                Some(n) => {
                    u.email.contains(n.as_str())
                        || u.display_name
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(n.as_str()))
                }
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(Page::new(items, total, page))
    }

    async fn create(&self, user: &User) -> Result<(), DomainError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DomainError::new(
                ErrorCode::AlreadyExists,
                format!("A user with email {} already exists", user.email),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), DomainError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(DomainError::new(ErrorCode::UserNotFound, "User not found")),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DomainError> {
        Ok(self.users.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserRole;

    fn user(email: &str, name: Option<&str>) -> User {
        User::new(email, name.map(str::to_string), UserRole::User).unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create(&user("a@example.com", None)).await.unwrap();

        let err = repo.create(&user("A@example.com", None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
    }

    #[tokio::test]
    async fn list_searches_email_and_name() {
        let repo = InMemoryUserRepository::new();
        repo.create(&user("alice@example.com", Some("Alice"))).await.unwrap();
        repo.create(&user("bob@example.com", Some("Robert"))).await.unwrap();

        let page = repo.list(PageRequest::default(), Some("rob")).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].email, "bob@example.com");

        let all = repo.list(PageRequest::new(1, 1), None).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items.len(), 1);
    }

    #[tokio::test]
    async fn find_by_email_is_case_insensitive() {
        let repo = InMemoryUserRepository::new();
        repo.create(&user("carol@example.com", None)).await.unwrap();
        assert!(repo.find_by_email("Carol@Example.com").await.unwrap().is_some());
    }
}
