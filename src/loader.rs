use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    vec::Vec,
};
use tracing::{debug, error, info, info_span, Instrument as _};

use crate::{
    binding::BindingFactory,
    config::Config,
    container::ModuleContainer,
    errors::{CyclePath, LoaderErrorKind},
    injector::Injector,
    module::{Export, Import, Module, ModuleDefinition, ModuleId, ModuleKey, ModuleMetadata},
    module_ref::ModuleRef,
    provider::{Provider, ProviderKey},
    utils::future::BoxFuture,
};

/// Resolves a module graph into module references.
///
/// Providers registered on the loader are bound by the application injector,
/// the parent of the root module injector.
#[derive(Debug, Default)]
pub struct ModuleLoader {
    config: Config,
    providers: Vec<Provider>,
}

impl ModuleLoader {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Registers an application-wide provider
    #[inline]
    #[must_use]
    pub fn register(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    #[inline]
    #[must_use]
    pub fn register_all(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Scans the graph of `M`, resolves exports of every module and builds the injectors
    ///
    /// # Errors
    /// - Returns [`LoaderErrorKind::CircularDependency`] if modules import each other
    /// - Returns [`LoaderErrorKind::DynamicModuleResolution`] if a dynamic import yields no module
    /// - Returns [`LoaderErrorKind::UnresolvedExport`] or [`LoaderErrorKind::UnresolvedExportedModule`]
    ///   if a module exports something it neither declares nor imports
    pub async fn resolve_root_module<M: Module>(self) -> Result<ModuleRef, LoaderErrorKind> {
        self.resolve_root(ModuleKey::of::<M>()).await
    }

    /// See [`Self::resolve_root_module`]
    ///
    /// # Errors
    /// See [`Self::resolve_root_module`]
    pub async fn resolve_root(self, root: ModuleKey) -> Result<ModuleRef, LoaderErrorKind> {
        let span = info_span!("resolve_root_module", module = %root.id);

        async move {
            let mut scanner = Scanner::default();
            scanner.scan(root.id, (root.metadata)()).await?;
            debug!(modules = scanner.definitions.len(), "Module graph scanned");

            let mut exports = Exports::new(&scanner.definitions);
            let mut effective = BTreeMap::new();
            for id in scanner.definitions.keys() {
                // The root has no importer, so its exports are checked here too
                exports.exported(*id)?;
                effective.insert(*id, exports.effective(*id)?);
            }
            debug!("Exports resolved");

            let mut composer = Composer {
                definitions: scanner.definitions,
                effective,
                config: self.config,
                factory: BindingFactory::default(),
                container: Arc::new(ModuleContainer::new()),
                built: BTreeMap::new(),
                order: Vec::new(),
            };

            let application = Injector::new(
                None,
                None,
                false,
                self.config,
                self.providers.iter().map(|provider| composer.factory.create_binding(provider)).collect::<Vec<_>>(),
            );
            let root = composer.build(root.id, &application)?;
            composer.assign_hosts();

            let Composer { factory, container, .. } = composer;
            container.set_bindings(factory.into_bindings());
            info!(modules = container.len(), "Root module resolved");

            Ok(root)
        }
        .instrument(span)
        .await
    }
}

/// Resolves the graph of `M` with the default config and no application-wide providers
///
/// # Errors
/// See [`ModuleLoader::resolve_root_module`]
pub async fn resolve_root_module<M: Module>() -> Result<ModuleRef, LoaderErrorKind> {
    ModuleLoader::new().resolve_root_module::<M>().await
}

/// Metadata of an import, static metadata is only built when the module is first reached
enum Pending {
    Static(fn() -> ModuleMetadata),
    Resolved(ModuleMetadata),
}

impl Pending {
    fn into_metadata(self) -> ModuleMetadata {
        match self {
            Pending::Static(metadata) => metadata(),
            Pending::Resolved(metadata) => metadata,
        }
    }
}

/// Collects module definitions depth-first, in import declaration order
#[derive(Default)]
struct Scanner {
    definitions: BTreeMap<ModuleId, ModuleDefinition>,
    stack: Vec<ModuleId>,
}

impl Scanner {
    fn scan(&mut self, id: ModuleId, metadata: ModuleMetadata) -> BoxFuture<'_, Result<(), LoaderErrorKind>> {
        Box::pin(async move {
            debug!(module = %id, "Scanning module");
            self.stack.push(id);

            let ModuleMetadata {
                imports,
                providers,
                components,
                exports,
            } = metadata;

            let mut import_ids = Vec::with_capacity(imports.len());
            for import in imports {
                let (target, pending) = match import {
                    Import::Static(key) => (key.id, Pending::Static(key.metadata)),
                    Import::Dynamic(future) => {
                        let Some(module) = future.await else {
                            let err = LoaderErrorKind::DynamicModuleResolution { importer: id.to_string() };
                            error!("{}", err);
                            return Err(err);
                        };
                        debug!(module = %module.module, importer = %id, "Dynamic module resolved");
                        (module.module, Pending::Resolved(module.metadata))
                    }
                };

                if let Some(position) = self.stack.iter().position(|module| *module == target) {
                    let path = self.stack[position..]
                        .iter()
                        .chain(core::iter::once(&target))
                        .map(ToString::to_string)
                        .collect();
                    let err = LoaderErrorKind::CircularDependency { path: CyclePath(path) };
                    error!("{}", err);
                    return Err(err);
                }

                if self.definitions.contains_key(&target) {
                    debug!(module = %target, "Module already resolved");
                } else {
                    self.scan(target, pending.into_metadata()).await?;
                }
                import_ids.push(target);
            }

            self.stack.pop();
            self.definitions.insert(
                id,
                ModuleDefinition {
                    id,
                    imports: import_ids,
                    providers,
                    components,
                    exports,
                },
            );

            Ok(())
        })
    }
}

/// Keeps the first provider of every declaration
fn dedup(providers: impl IntoIterator<Item = Provider>) -> Vec<Provider> {
    let mut seen = BTreeSet::<ProviderKey>::new();
    providers.into_iter().filter(|provider| seen.insert(provider.key())).collect()
}

/// Resolves what each module exports and which providers its injector binds
struct Exports<'a> {
    definitions: &'a BTreeMap<ModuleId, ModuleDefinition>,
    memo: BTreeMap<ModuleId, Vec<Provider>>,
}

impl<'a> Exports<'a> {
    fn new(definitions: &'a BTreeMap<ModuleId, ModuleDefinition>) -> Self {
        Self {
            definitions,
            memo: BTreeMap::new(),
        }
    }

    fn definition(&self, id: ModuleId) -> Result<&'a ModuleDefinition, LoaderErrorKind> {
        let definitions = self.definitions;
        definitions.get(&id).ok_or_else(|| {
            let err = LoaderErrorKind::MissingModuleDefinition { module: id.to_string() };
            error!("{}", err);
            err
        })
    }

    /// Providers visible to importers of `id`, in export declaration order
    fn exported(&mut self, id: ModuleId) -> Result<Vec<Provider>, LoaderErrorKind> {
        if let Some(providers) = self.memo.get(&id) {
            return Ok(providers.clone());
        }

        let definition = self.definition(id)?;
        let mut providers = Vec::new();
        for export in &definition.exports {
            match export {
                Export::Module(module) if *module == id => providers.extend(definition.providers.iter().cloned()),
                Export::Module(module) => {
                    if !definition.imports_module(module) {
                        let err = LoaderErrorKind::UnresolvedExportedModule {
                            module: id.to_string(),
                            export: module.to_string(),
                        };
                        error!("{}", err);
                        return Err(err);
                    }
                    self.definition(*module)?;
                    providers.extend(self.exported(*module)?);
                }
                Export::Token(token) => {
                    let own = definition.providers_of(token).cloned().collect::<Vec<_>>();
                    if !own.is_empty() {
                        providers.extend(own);
                        continue;
                    }

                    let mut found = false;
                    for import in &definition.imports {
                        for provider in self.exported(*import)? {
                            if provider.token() == token {
                                providers.push(provider);
                                found = true;
                            }
                        }
                    }
                    if !found {
                        let err = LoaderErrorKind::UnresolvedExport {
                            module: id.to_string(),
                            export: token.to_string(),
                        };
                        error!("{}", err);
                        return Err(err);
                    }
                }
            }
        }

        let providers = dedup(providers);
        debug!(module = %id, exported = providers.len(), "Exports resolved");
        self.memo.insert(id, providers.clone());

        Ok(providers)
    }

    /// Providers bound by the injector of `id`: exports of its imports in import order, then its own providers
    fn effective(&mut self, id: ModuleId) -> Result<Vec<Provider>, LoaderErrorKind> {
        let definition = self.definition(id)?;
        let mut providers = Vec::new();
        for import in &definition.imports {
            providers.extend(self.exported(*import)?);
        }
        providers.extend(definition.providers.iter().cloned());

        Ok(dedup(providers))
    }
}

/// Builds module references top-down, each import parented to its first importer
struct Composer {
    definitions: BTreeMap<ModuleId, ModuleDefinition>,
    effective: BTreeMap<ModuleId, Vec<Provider>>,
    config: Config,
    factory: BindingFactory,
    container: Arc<ModuleContainer>,
    built: BTreeMap<ModuleId, ModuleRef>,
    /// Modules in the order they were built: top-down, imports in declaration order
    order: Vec<ModuleId>,
}

impl Composer {
    fn build(&mut self, id: ModuleId, parent: &Injector) -> Result<ModuleRef, LoaderErrorKind> {
        if let Some(module) = self.built.get(&id) {
            debug!(module = %id, "Reused module injector");
            return Ok(module.clone());
        }

        let Some(definition) = self.definitions.get(&id).cloned() else {
            let err = LoaderErrorKind::MissingModuleDefinition { module: id.to_string() };
            error!("{}", err);
            return Err(err);
        };
        let bindings = match self.effective.get(&id) {
            Some(providers) => providers.iter().map(|provider| self.factory.create_binding(provider)).collect(),
            None => Vec::new(),
        };

        let module = ModuleRef::new(
            definition.clone(),
            parent,
            self.config,
            bindings,
            &mut self.factory,
            self.container.clone(),
        );
        self.container.register(&module);
        self.built.insert(id, module.clone());
        self.order.push(id);

        let mut imports = Vec::with_capacity(definition.imports.len());
        for import in &definition.imports {
            imports.push(self.build(*import, module.injector())?);
        }
        module.set_imports(imports);

        Ok(module)
    }

    /// Makes the injector of the declaring module the host of each binding.
    /// A provider declared by several modules is hosted by the first one built.
    /// Aliases stay unhosted and resolve their target where they are bound.
    fn assign_hosts(&self) {
        let mut declared = BTreeMap::new();
        for id in &self.order {
            let Some(definition) = self.definitions.get(id) else {
                continue;
            };
            for provider in &definition.providers {
                declared.entry(provider.key()).or_insert(definition.id);
            }
        }

        for binding in self.factory.bindings().iter().filter(|binding| !binding.is_alias()) {
            let host = binding
                .provider_key()
                .and_then(|key| declared.get(&key))
                .and_then(|module| self.built.get(module));
            if let Some(host) = host {
                binding.set_host(host.injector());
            }
        }
    }
}
