extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod binding;
pub(crate) mod bloom;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod inject;
pub(crate) mod injector;
pub(crate) mod inquirer;
pub(crate) mod instantiator;
pub(crate) mod loader;
pub(crate) mod module;
pub(crate) mod module_ref;
pub(crate) mod provider;
pub(crate) mod scope;
pub(crate) mod token;

pub mod utils;

pub use any::{Instance, Instances, TypeInfo};
pub use binding::{create_binding, create_resolved_binding, Binding};
pub use config::Config;
pub use container::ModuleContainer;
pub use context::{Context, ContextKey};
pub use dependency_resolver::{Dependencies, DependencyResolver};
pub use errors::{CyclePath, InstantiateErrorKind, InstantiatorErrorKind, LoaderErrorKind, ResolveErrorKind};
pub use inject::{Inject, InjectAll};
pub use injector::{Injector, ResolveOptions};
pub use inquirer::InquirerContext;
pub use instantiator::{Constructible, Instantiator};
pub use loader::{resolve_root_module, ModuleLoader};
pub use module::{ComponentDecl, DynamicModule, Export, Import, Module, ModuleDefinition, ModuleId, ModuleKey, ModuleMetadata};
pub use module_ref::{ComponentRef, ModuleRef};
pub use provider::{Provider, ProviderKey};
pub use scope::{InjectableDef, Lifetime, ProvidedIn};
pub use token::{Injectable, InjectionToken, Token};
