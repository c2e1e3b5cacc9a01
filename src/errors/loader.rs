use alloc::string::String;

use super::resolve::CyclePath;

#[derive(thiserror::Error, Debug)]
pub enum LoaderErrorKind {
    #[error("Circular module import. {path}")]
    CircularDependency { path: CyclePath },
    #[error("Could not find an import for the exported provider {export} in {module}")]
    UnresolvedExport { module: String, export: String },
    #[error("Module {module} exports {export}, but doesn't import it")]
    UnresolvedExportedModule { module: String, export: String },
    #[error("Could not find module definition for {module}")]
    MissingModuleDefinition { module: String },
    #[error("The dynamic module imported by {importer} did not return module metadata")]
    DynamicModuleResolution { importer: String },
}
