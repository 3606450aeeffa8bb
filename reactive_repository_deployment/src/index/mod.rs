//! The type index: an immutable snapshot of the declarations the generator
//! may consult.
//!
//! The index is built once per pipeline run and then threaded through every
//! later stage by reference. Nothing in it is mutated after construction.

mod declaration;
mod visitor;

use std::path::{Component, Path, PathBuf};

use syn::{Item, ItemMod, visit::Visit};

pub use declaration::{
    FieldDeclaration, Marker, MethodDeclaration, ParamDeclaration, TypeDeclaration, TypeKind,
};
use visitor::IndexVisitor;

use crate::error::{GenerationError, GenerationResult};

#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    declarations: Vec<TypeDeclaration>,
}

impl TypeIndex {
    /// Index the inline contents of a module. Qualified names start with the
    /// module's own name.
    pub fn from_module(module: &ItemMod) -> GenerationResult<Self> {
        let Some((_, items)) = &module.content else {
            return Err(syn::Error::new_spanned(
                module,
                "repository modules must have inline content",
            )
            .into());
        };
        let mut visitor = IndexVisitor::new(vec![module.ident.to_string()], Vec::new());
        for item in items {
            visitor.visit_item(item);
        }
        Self::finish(visitor)
    }

    pub fn from_file(file: &syn::File) -> GenerationResult<Self> {
        Self::from_items(&file.items)
    }

    pub fn from_items(items: &[Item]) -> GenerationResult<Self> {
        let mut visitor = IndexVisitor::new(Vec::new(), Vec::new());
        for item in items {
            visitor.visit_item(item);
        }
        Self::finish(visitor)
    }

    /// Index a set of source files. Files are visited in sorted path order so
    /// the resulting index does not depend on the order the caller lists them.
    ///
    /// Module paths are taken relative to the nearest `src` directory shared
    /// by every file, or to the files' common parent directory when there is
    /// none. Use [`TypeIndex::from_sources_under`] to name the root.
    pub fn from_sources<P: AsRef<Path>>(paths: &[P]) -> GenerationResult<Self> {
        let sorted = sorted_paths(paths);
        let root = source_root(&sorted);
        Self::index_sources(&root, &sorted)
    }

    /// Index source files whose module paths are relative to `root`, the
    /// directory holding the crate's `lib.rs` or `main.rs`.
    pub fn from_sources_under<R, P>(root: R, paths: &[P]) -> GenerationResult<Self>
    where
        R: AsRef<Path>,
        P: AsRef<Path>,
    {
        Self::index_sources(root.as_ref(), &sorted_paths(paths))
    }

    fn index_sources(root: &Path, sorted: &[PathBuf]) -> GenerationResult<Self> {
        let mut declarations = Vec::new();
        for path in sorted {
            let source = std::fs::read_to_string(path).map_err(|source| GenerationError::Io {
                path: path.clone(),
                source,
            })?;
            let file = syn::parse_file(&source)?;
            let modules = module_path(root, path);
            let emit_prefix = std::iter::once("crate".to_string())
                .chain(modules.iter().cloned())
                .collect();
            let mut visitor = IndexVisitor::new(modules, emit_prefix);
            visitor.visit_file(&file);
            log::debug!(
                "indexed {} declarations from {}",
                visitor.declarations.len(),
                path.display()
            );
            declarations.extend(Self::finish(visitor)?.declarations);
        }
        Ok(Self { declarations })
    }

    fn finish(visitor: IndexVisitor) -> GenerationResult<Self> {
        if let Some(error) = visitor.error {
            return Err(error.into());
        }
        log::debug!("indexed {} declarations", visitor.declarations.len());
        Ok(Self {
            declarations: visitor.declarations,
        })
    }

    /// Every declaration in index order.
    pub fn declarations(&self) -> &[TypeDeclaration] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Look up a declaration by qualified name, or by simple name when that
    /// name is unique in the index.
    pub fn get(&self, name: &str) -> Option<&TypeDeclaration> {
        if let Some(found) = self.declarations.iter().find(|d| d.qualified_name == name) {
            return Some(found);
        }
        let simple = name.rsplit("::").next()?;
        unique(self.declarations.iter().filter(|d| d.ident == simple))
    }

    /// Resolve a type path as written in source. `crate`, `self` and `super`
    /// prefixes are ignored; an ambiguous simple name resolves only when the
    /// written path disambiguates it.
    pub fn resolve(&self, path: &syn::Path) -> Option<&TypeDeclaration> {
        let segments: Vec<String> = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .filter(|segment| !matches!(segment.as_str(), "crate" | "self" | "super"))
            .collect();
        let last = segments.last()?;
        let written = segments.join("::");

        let candidates: Vec<&TypeDeclaration> = self
            .declarations
            .iter()
            .filter(|d| d.ident == last.as_str())
            .collect();
        if candidates.len() == 1 {
            return candidates.first().copied();
        }
        unique(candidates.into_iter().filter(|d| {
            d.qualified_name == written || d.qualified_name.ends_with(&format!("::{written}"))
        }))
    }

    pub fn structs(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.of_kind(TypeKind::Struct)
    }

    pub fn traits(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.of_kind(TypeKind::Trait)
    }

    fn of_kind(&self, kind: TypeKind) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations.iter().filter(move |d| d.kind == kind)
    }
}

fn unique<'a>(mut matches: impl Iterator<Item = &'a TypeDeclaration>) -> Option<&'a TypeDeclaration> {
    let first = matches.next()?;
    matches.next().is_none().then_some(first)
}

fn sorted_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut sorted: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
    sorted.sort();
    sorted.dedup();
    sorted
}

fn source_root(paths: &[PathBuf]) -> PathBuf {
    let Some(first) = paths.first() else {
        return PathBuf::new();
    };
    let contains_all = |dir: &Path| paths.iter().all(|path| path.starts_with(dir));
    let src = first
        .ancestors()
        .skip(1)
        .find(|dir| dir.file_name().is_some_and(|name| name == "src") && contains_all(dir));
    if let Some(src) = src {
        return src.to_path_buf();
    }
    first
        .ancestors()
        .skip(1)
        .find(|dir| contains_all(dir))
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Module path of a source file below `root`: `models.rs` and
/// `models/mod.rs` are both `models`, `models/user.rs` is `models::user`,
/// and the crate roots `lib.rs` and `main.rs` are empty.
fn module_path(root: &Path, path: &Path) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut segments: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|component| match component {
            Component::Normal(name) => name.to_str().map(str::to_string),
            _ => None,
        })
        .collect();
    match relative.file_stem().and_then(|stem| stem.to_str()) {
        None | Some("mod") => {}
        Some("lib" | "main") if segments.is_empty() => {}
        Some(stem) => segments.push(stem.to_string()),
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn sample() -> TypeIndex {
        let module: ItemMod = parse_quote! {
            mod app {
                #[derive(Entity)]
                pub struct User {
                    #[id]
                    pub id: Option<u64>,
                    pub email: String,
                    #[entity(skip)]
                    pub cache: Vec<u8>,
                }

                pub enum Role { Admin, Member }

                pub trait UserRepository: ReactiveRepository<User, u64> {
                    fn find_by_email(&self, email: &str) -> RepoFuture<'_, Option<User>>;

                    #[query("email = :email")]
                    fn lookup(&self, email: String) -> RepoFuture<'_, Vec<User>>;

                    fn helper(&self) -> usize { 1 }
                }

                pub mod audit {
                    pub struct User { pub id: u64 }
                }

                fn not_indexed() {
                    struct Hidden;
                }
            }
        };
        TypeIndex::from_module(&module).unwrap()
    }

    #[test]
    fn test_collects_every_nameable_declaration() {
        let index = sample();
        let names: Vec<_> = index
            .declarations()
            .iter()
            .map(|d| d.qualified_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["app::User", "app::Role", "app::UserRepository", "app::audit::User"]
        );
        assert_eq!(index.structs().count(), 2);
        let nested = index.get("app::audit::User").unwrap();
        let path = &nested.path;
        assert_eq!(quote::quote!(#path).to_string(), "audit :: User");
        assert_eq!(index.traits().count(), 1);
    }

    #[test]
    fn test_records_fields_and_markers() {
        let index = sample();
        let user = index.get("app::User").unwrap();
        assert_eq!(user.kind, TypeKind::Struct);
        assert!(user.marker("derive").is_some());
        assert!(user.fields[0].is_id);
        assert!(user.fields[2].skipped);
        let properties: Vec<_> = user.properties().map(|f| f.name.to_string()).collect();
        assert_eq!(properties, vec!["id", "email"]);
    }

    #[test]
    fn test_records_methods() {
        let index = sample();
        let repository = index.get("UserRepository").unwrap();
        assert_eq!(repository.supertraits.len(), 1);
        assert_eq!(repository.methods.len(), 3);

        let find = &repository.methods[0];
        assert!(find.receiver.is_some());
        assert_eq!(find.params[0].name, "email");
        assert!(!find.has_default_body);

        let lookup = &repository.methods[1];
        assert_eq!(lookup.marker("query").unwrap().args.to_string(), "\"email = :email\"");

        assert!(repository.methods[2].has_default_body);
    }

    #[test]
    fn test_ambiguous_simple_names_need_a_path() {
        let index = sample();
        assert!(index.get("User").is_none());
        let nested: syn::Path = parse_quote!(audit::User);
        assert_eq!(index.resolve(&nested).unwrap().qualified_name, "app::audit::User");
        let top: syn::Path = parse_quote!(crate::app::User);
        assert_eq!(index.resolve(&top).unwrap().qualified_name, "app::User");
        let role: syn::Path = parse_quote!(self::Role);
        assert_eq!(index.resolve(&role).unwrap().kind, TypeKind::Enum);
    }

    #[test]
    fn test_module_paths_follow_the_directory_layout() {
        let root = Path::new("/work/app/src");
        let path = |relative: &str| module_path(root, &root.join(relative));
        assert!(path("lib.rs").is_empty());
        assert!(path("main.rs").is_empty());
        assert_eq!(path("models.rs"), vec!["models"]);
        assert_eq!(path("models/mod.rs"), vec!["models"]);
        assert_eq!(path("models/user.rs"), vec!["models", "user"]);
        assert_eq!(path("a/b/lib.rs"), vec!["a", "b", "lib"]);
    }

    #[test]
    fn test_source_root_prefers_src() {
        let paths = vec![
            PathBuf::from("/work/app/src/models/mod.rs"),
            PathBuf::from("/work/app/src/repos.rs"),
        ];
        assert_eq!(source_root(&paths), PathBuf::from("/work/app/src"));

        let loose = vec![
            PathBuf::from("/tmp/gen/models/mod.rs"),
            PathBuf::from("/tmp/gen/repos.rs"),
        ];
        assert_eq!(source_root(&loose), PathBuf::from("/tmp/gen"));
    }

    #[test]
    fn test_malformed_entity_attribute_is_reported() {
        let module: ItemMod = parse_quote! {
            mod app {
                pub struct User {
                    pub id: u64,
                    #[entity(skipp)]
                    pub cache: Vec<u8>,
                }
            }
        };
        assert!(matches!(
            TypeIndex::from_module(&module),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn test_module_without_content_is_rejected() {
        let module: ItemMod = parse_quote!(mod elsewhere;);
        assert!(matches!(
            TypeIndex::from_module(&module),
            Err(GenerationError::Parse(_))
        ));
    }
}
