use std::fs;

use reactive_repository_deployment::{Generator, TypeIndex};

const MODELS: &str = r#"
pub struct User {
    #[id]
    pub id: Option<u64>,
    pub email: String,
    pub age: u32,
}
"#;

const REPOSITORIES: &str = r#"
use crate::models::User;

pub trait UserRepository: ReactiveRepository<User, u64> {
    fn find_by_email(&self, email: &str) -> RepoFuture<'_, Option<User>>;
    fn find_top_10_by_age_greater_than_order_by_age_desc(&self, age: u32) -> RepoFuture<'_, Vec<User>>;
    fn count_by_age_between(&self, low: u32, high: u32) -> RepoFuture<'_, u64>;
}
"#;

#[test]
fn test_rendering_is_byte_identical() {
    let file: syn::File = syn::parse_str(&format!("{MODELS}{REPOSITORIES}")).unwrap();
    let index = TypeIndex::from_file(&file).unwrap();
    let generator = Generator::default();
    let first = generator.render_source(&index).unwrap();
    let second = generator.render_source(&index).unwrap();
    assert_eq!(first, second);
    assert!(first.starts_with("// @generated"));
}

#[test]
fn test_source_order_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("models.rs");
    let repositories = dir.path().join("repositories.rs");
    fs::write(&models, MODELS).unwrap();
    fs::write(&repositories, REPOSITORIES).unwrap();

    let generator = Generator::default();
    let forward = generator
        .generate_sources(&[models.clone(), repositories.clone()])
        .unwrap();
    let backward = generator.generate_sources(&[repositories, models]).unwrap();
    assert_eq!(forward, backward);
    assert!(forward.replace(' ', "").contains("crate::models::User"));
}

#[test]
fn test_write_to_creates_an_includable_file() {
    let dir = tempfile::tempdir().unwrap();
    let file: syn::File = syn::parse_str(&format!("{MODELS}{REPOSITORIES}")).unwrap();
    let index = TypeIndex::from_file(&file).unwrap();
    let out = dir.path().join("repositories.rs");

    Generator::default().write_to(&index, &out).unwrap();
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written, Generator::default().render_source(&index).unwrap());
    assert!(syn::parse_file(&written).is_ok());
}

#[test]
fn test_missing_source_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.rs");
    let error = TypeIndex::from_sources(&[missing]).unwrap_err();
    assert!(error.to_string().contains("missing.rs"));
}

#[test]
fn test_nested_modules_keep_their_paths() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("models")).unwrap();
    fs::create_dir_all(src.join("store/users")).unwrap();
    fs::write(src.join("models/mod.rs"), MODELS).unwrap();
    fs::write(src.join("store/users/repository.rs"), REPOSITORIES).unwrap();

    let code = Generator::default()
        .generate_sources(&[
            src.join("store/users/repository.rs"),
            src.join("models/mod.rs"),
        ])
        .unwrap()
        .replace(' ', "");
    assert!(code.contains("ReactiveRepository<crate::models::User,u64>forUserRepositoryImpl"));
    assert!(code.contains("select::<crate::models::User>"));
    assert!(code.contains("crate::store::users::repository::UserRepositoryforUserRepositoryImpl"));

    let index = TypeIndex::from_sources_under(&src, &[src.join("models/mod.rs")]).unwrap();
    assert_eq!(index.declarations()[0].qualified_name, "models::User");
}
