//! Dashboard aggregates computed over the in-memory stores.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::domain::chat::{MessageRole, ProviderKind};
use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::{AnalyticsReader, DailyUsagePoint, ModelUsage, TopUser, UsageOverview};

use super::{InMemoryConversationRepository, InMemoryUsageRepository, InMemoryUserRepository};

#[derive(Debug, Clone)]
pub struct InMemoryAnalyticsReader {
    users: InMemoryUserRepository,
    conversations: InMemoryConversationRepository,
    usage: InMemoryUsageRepository,
}

impl InMemoryAnalyticsReader {
    pub fn new(
        users: InMemoryUserRepository,
        conversations: InMemoryConversationRepository,
        usage: InMemoryUsageRepository,
    ) -> Self {
        Self {
            users,
            conversations,
            usage,
        }
    }
}

#[async_trait]
impl AnalyticsReader for InMemoryAnalyticsReader {
    async fn overview(&self, today: NaiveDate) -> Result<UsageOverview, DomainError> {
        let users = self.users.all().await;
        let (conversations, messages) = self.conversations.snapshot().await;
        let usage = self.usage.all().await;

        let mut overview = UsageOverview {
            total_users: users.len() as u64,
            active_users: users.iter().filter(|u| u.is_active).count() as u64,
            total_conversations: conversations.len() as u64,
            total_messages: messages.len() as u64,
            ..UsageOverview::default()
        };

        for day in &usage {
            overview.total_tokens += day.total_tokens();
            overview.total_cost_usd += day.cost_usd;
            if day.date == today && day.message_count > 0 {
                overview.users_active_today += 1;
                overview.messages_today += u64::from(day.message_count);
                overview.tokens_today += day.total_tokens();
                overview.cost_today_usd += day.cost_usd;
            }
        }
        Ok(overview)
    }

    async fn daily_usage(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsagePoint>, DomainError> {
        let mut points: BTreeMap<NaiveDate, DailyUsagePoint> = BTreeMap::new();
        for day in self.usage.all().await {
            if day.date < from || day.date > to {
                continue;
            }
            let point = points.entry(day.date).or_insert_with(|| DailyUsagePoint {
                date: day.date,
                messages: 0,
                prompt_tokens: 0,
                completion_tokens: 0,
                cost_usd: 0.0,
                active_users: 0,
            });
            point.messages += u64::from(day.message_count);
            point.prompt_tokens += day.prompt_tokens;
            point.completion_tokens += day.completion_tokens;
            point.cost_usd += day.cost_usd;
            if day.message_count > 0 {
                point.active_users += 1;
            }
        }
        Ok(points.into_values().collect())
    }

    async fn top_users(&self, from: NaiveDate, limit: u32) -> Result<Vec<TopUser>, DomainError> {
        let emails: HashMap<UserId, String> = self
            .users
            .all()
            .await
            .into_iter()
            .map(|u| (u.id, u.email))
            .collect();

        let mut totals: HashMap<UserId, TopUser> = HashMap::new();
        for day in self.usage.all().await.into_iter().filter(|d| d.date >= from) {
            let Some(email) = emails.get(&day.user_id) else {
                continue;
            };
            let entry = totals.entry(day.user_id).or_insert_with(|| TopUser {
                user_id: day.user_id,
                email: email.clone(),
                messages: 0,
                tokens: 0,
                cost_usd: 0.0,
            });
            entry.messages += u64::from(day.message_count);
            entry.tokens += day.total_tokens();
            entry.cost_usd += day.cost_usd;
        }

        let mut ranked: Vec<TopUser> = totals.into_values().collect();
        ranked.sort_by(|a, b| b.messages.cmp(&a.messages).then_with(|| a.email.cmp(&b.email)));
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn usage_by_model(&self, from: NaiveDate) -> Result<Vec<ModelUsage>, DomainError> {
        let (conversations, messages) = self.conversations.snapshot().await;
        let routes: HashMap<ConversationId, (ProviderKind, String)> = conversations
            .into_iter()
            .map(|c| (c.id, (c.provider, c.model)))
            .collect();

        let mut grouped: HashMap<(ProviderKind, String), ModelUsage> = HashMap::new();
        let replies = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant && m.created_at.date() >= from);
        for message in replies {
            let Some((provider, model)) = routes.get(&message.conversation_id) else {
                continue;
            };
            let entry = grouped
                .entry((*provider, model.clone()))
                .or_insert_with(|| ModelUsage {
                    provider: *provider,
                    model: model.clone(),
                    messages: 0,
                    prompt_tokens: 0,
                    completion_tokens: 0,
                    cost_usd: 0.0,
                });
            entry.messages += 1;
            entry.prompt_tokens += u64::from(message.prompt_tokens);
            entry.completion_tokens += u64::from(message.completion_tokens);
            entry.cost_usd += message.cost_usd;
        }

        let mut usage: Vec<ModelUsage> = grouped.into_values().collect();
        usage.sort_by(|a, b| b.messages.cmp(&a.messages).then_with(|| a.model.cmp(&b.model)));
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::User;
    use crate::domain::chat::{ChatMessage, Conversation};
    use crate::domain::foundation::{today, UserRole};
    use crate::domain::usage::UsageDelta;
    use crate::ports::{ConversationRepository, UsageRepository, UserRepository};

    struct Fixture {
        users: InMemoryUserRepository,
        conversations: InMemoryConversationRepository,
        usage: InMemoryUsageRepository,
        reader: InMemoryAnalyticsReader,
    }

    fn fixture() -> Fixture {
        let users = InMemoryUserRepository::new();
        let conversations = InMemoryConversationRepository::new();
        let usage = InMemoryUsageRepository::new();
        let reader =
            InMemoryAnalyticsReader::new(users.clone(), conversations.clone(), usage.clone());
        Fixture {
            users,
            conversations,
            usage,
            reader,
        }
    }

    async fn add_user(f: &Fixture, email: &str) -> User {
        let user = User::new(email, None, UserRole::User).unwrap();
        f.users.create(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn overview_counts_today_separately() {
        let f = fixture();
        let alice = add_user(&f, "alice@example.com").await;
        let bob = add_user(&f, "bob@example.com").await;
        let today = today();
        let yesterday = today.pred_opt().unwrap();

        f.usage.record(&alice.id, today, UsageDelta::exchange(10, 5, 0.01)).await.unwrap();
        f.usage.record(&bob.id, yesterday, UsageDelta::exchange(100, 50, 0.1)).await.unwrap();

        let overview = f.reader.overview(today).await.unwrap();
        assert_eq!(overview.total_users, 2);
        assert_eq!(overview.active_users, 2);
        assert_eq!(overview.users_active_today, 1);
        assert_eq!(overview.messages_today, 1);
        assert_eq!(overview.tokens_today, 15);
        assert_eq!(overview.total_tokens, 165);
        assert!((overview.total_cost_usd - 0.11).abs() < 1e-9);
    }

    #[tokio::test]
    async fn daily_usage_groups_by_day() {
        let f = fixture();
        let a = add_user(&f, "a@example.com").await;
        let b = add_user(&f, "b@example.com").await;
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let next = day.succ_opt().unwrap();

        f.usage.record(&a.id, day, UsageDelta::exchange(1, 1, 0.0)).await.unwrap();
        f.usage.record(&b.id, day, UsageDelta::exchange(1, 1, 0.0)).await.unwrap();
        f.usage.record(&a.id, next, UsageDelta::exchange(1, 1, 0.0)).await.unwrap();

        let points = f.reader.daily_usage(day, next).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, day);
        assert_eq!(points[0].messages, 2);
        assert_eq!(points[0].active_users, 2);
        assert_eq!(points[1].messages, 1);
    }

    #[tokio::test]
    async fn top_users_ranked_by_messages() {
        let f = fixture();
        let light = add_user(&f, "light@example.com").await;
        let heavy = add_user(&f, "heavy@example.com").await;
        let today = today();

        f.usage.record(&light.id, today, UsageDelta::exchange(1, 1, 0.0)).await.unwrap();
        for _ in 0..3 {
            f.usage.record(&heavy.id, today, UsageDelta::exchange(1, 1, 0.0)).await.unwrap();
        }

        let top = f.reader.top_users(today, 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].email, "heavy@example.com");
        assert_eq!(top[0].messages, 3);
    }

    #[tokio::test]
    async fn usage_by_model_counts_assistant_replies() {
        let f = fixture();
        let user = add_user(&f, "m@example.com").await;
        let conv =
            Conversation::start(user.id, "hi", ProviderKind::OpenRouter, "openai/gpt-4o-mini");
        f.conversations.create(&conv).await.unwrap();
        f.conversations.append_message(&ChatMessage::user(conv.id, "hi", 1)).await.unwrap();
        f.conversations
            .append_message(&ChatMessage::assistant(conv.id, "hello", 12, 3, 0.002))
            .await
            .unwrap();

        let usage = f.reader.usage_by_model(today()).await.unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].provider, ProviderKind::OpenRouter);
        assert_eq!(usage[0].messages, 1);
        assert_eq!(usage[0].prompt_tokens, 12);
    }
}
