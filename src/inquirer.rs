use crate::{module::ModuleId, token::Token};

/// Describes who is asking for a dependency.
///
/// Any provider can depend on [`InquirerContext`]. It isn't bound anywhere:
/// the injector hands out the context of the current resolution instead.
#[derive(Debug, Clone, Default)]
pub struct InquirerContext {
    inquirer: Option<Token>,
    module: Option<ModuleId>,
}

injectable!(InquirerContext);

impl InquirerContext {
    #[inline]
    #[must_use]
    pub const fn new(inquirer: Option<Token>, module: Option<ModuleId>) -> Self {
        Self { inquirer, module }
    }

    /// Token whose construction requested the dependency, `None` for a top-level `get`
    #[inline]
    #[must_use]
    pub fn inquirer(&self) -> Option<&Token> {
        self.inquirer.as_ref()
    }

    /// Module of the injector that builds the inquirer
    #[inline]
    #[must_use]
    pub fn module(&self) -> Option<ModuleId> {
        self.module
    }
}
