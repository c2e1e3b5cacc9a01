mod instantiate;
mod instantiator;
mod loader;
mod resolve;

pub use instantiate::InstantiateErrorKind;
pub use instantiator::InstantiatorErrorKind;
pub use loader::LoaderErrorKind;
pub use resolve::{CyclePath, ResolveErrorKind};
