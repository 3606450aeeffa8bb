//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use reactive_repository::prelude::*;

#[reactive_repositories]
pub mod store {
    use reactive_repository::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Entity, Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[entity(name = "users")]
    pub struct User {
        pub id: Option<u64>,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub age: u32,
        pub active: bool,
    }

    #[derive(Entity, Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Tag {
        #[id]
        pub label: String,
        pub uses: u64,
    }

    pub trait UserRepository: ReactiveRepository<User, u64> {
        /// Every user, in identifier order
        fn find_all(&self) -> RepoFuture<'_, Vec<User>>;

        fn find_by_email(&self, email: String) -> RepoFuture<'_, Option<User>>;

        fn find_by_email_ignore_case(&self, email: String) -> RepoFuture<'_, Option<User>>;

        fn find_by_last_name_order_by_age_desc(&self, last_name: String) -> RepoFuture<'_, Vec<User>>;

        fn find_by_first_name_or_last_name(
            &self,
            first_name: String,
            last_name: String,
        ) -> RepoFuture<'_, Vec<User>>;

        fn find_by_age_between(&self, low: u32, high: u32) -> RepoFuture<'_, Vec<User>>;

        fn find_by_age_in(&self, ages: Vec<u32>) -> RepoFuture<'_, Vec<User>>;

        fn find_top2_by_active_true_order_by_age_asc(&self) -> RepoFuture<'_, Vec<User>>;

        fn count_by_active_true(&self) -> RepoFuture<'_, u64>;

        fn count_all(&self) -> RepoFuture<'_, usize>;

        fn exists_by_email(&self, email: String) -> RepoFuture<'_, bool>;

        fn delete_by_active_false(&self) -> RepoFuture<'_, u64>;

        #[query("first_name = :name or last_name = :name order by age")]
        fn find_named(&self, name: String) -> RepoFuture<'_, Vec<User>>;

        #[query("age >= :min_age and active = :active")]
        fn count_adults(&self, min_age: u32, active: bool) -> RepoFuture<'_, u32>;

        fn find_by_active_true(&self, sort: Sort, page: Pagination) -> RepoFuture<'_, Vec<User>>;

        fn count_by_age_less_than(&self, age: u32) -> RepoFuture<'_, i8>;

        /// Users of at least 21, youngest first
        fn adults(&self) -> RepoFuture<'_, Vec<User>> {
            self.select(
                Query::filtered(Filter::all().and(Condition::new(
                    "age",
                    Comparator::GreaterThanEqual,
                    Operand::single(21u32),
                )))
                .order_by(Order::asc("age")),
            )
        }

        fn oldest(&self) -> RepoFuture<'_, Option<User>> {
            self.select_one(Query::new().order_by(Order::desc("age")))
        }
    }

    #[repository(Tag, String)]
    pub trait TagRepository {
        fn find_by_label_starting_with(&self, prefix: String) -> RepoFuture<'_, Vec<Tag>>;
    }
}

pub use store::{Tag, TagRepository, TagRepositoryImpl, User, UserRepository, UserRepositoryImpl};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn user(email: &str, first_name: &str, last_name: &str, age: u32, active: bool) -> User {
    User {
        id: None,
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        age,
        active,
    }
}

/// Saves a small, varied set of users and returns them with their ids.
pub async fn seed<R: ReactiveRepository<User, u64>>(repository: &R) -> SessionResult<Vec<User>> {
    repository
        .save_all(vec![
            user("ada@example.com", "Ada", "Lovelace", 36, true),
            user("alan@example.com", "Alan", "Turing", 41, true),
            user("grace@example.com", "Grace", "Hopper", 85, false),
            user("edith@example.com", "Edith", "Lovelace", 19, true),
        ])
        .await
}
