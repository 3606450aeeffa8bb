//! Generated repositories over the sled session.

#![cfg(feature = "sled")]

mod common;

use std::sync::Arc;

use common::{UserRepository, UserRepositoryImpl, user};
use reactive_repository::config::SledConfig;
use reactive_repository::prelude::*;

#[tokio::test]
async fn test_crud_on_temporary_database() -> SessionResult<()> {
    common::init_logging();
    let repository = UserRepositoryImpl::new(Arc::new(SledSession::temp()?));

    let saved = common::seed(&repository).await?;
    assert!(saved.iter().all(|u| u.id.is_some()));
    assert_eq!(repository.count_all().await?, 4);

    let ada = repository.find_by_email("ada@example.com".to_string()).await?;
    assert_eq!(ada.as_ref().and_then(|u| u.id), saved[0].id);

    repository.delete_by_id(saved[0].id.unwrap()).await?;
    assert_eq!(repository.find_by_id(saved[0].id.unwrap()).await?, None);
    assert_eq!(repository.delete_by_active_false().await?, 1);
    assert_eq!(UserRepository::find_all(&repository).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_data_survives_reopen() -> SessionResult<()> {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = SledConfig::builder()
        .path(dir.path().join("users"))
        .flush_on_write(true)
        .build();

    let id = {
        let repository = UserRepositoryImpl::new(Arc::new(SledSession::open(config.clone())?));
        let saved = repository
            .save(user("alan@example.com", "Alan", "Turing", 41, true))
            .await?;
        repository.session().flush().await?;
        saved.id.unwrap()
    };

    let repository = UserRepositoryImpl::new(Arc::new(SledSession::open(config)?));
    let found = repository.find_by_id(id).await?.unwrap();
    assert_eq!(found.last_name, "Turing");

    let next = repository
        .save(user("grace@example.com", "Grace", "Hopper", 85, false))
        .await?;
    assert_ne!(next.id, Some(id));
    Ok(())
}
