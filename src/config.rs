/// Config of a module loader and of every injector it creates
/// ## Fields
/// - `bloom_filter`:
///   If `true`, injectors consult a bloom filter of their tokens before the binding map
///   and go straight to the parent on a negative answer.
///
/// - `max_depth`:
///   Maximum length of a dependency path.
///   Resolution fails with [`crate::ResolveErrorKind::ResolutionTooDeep`] past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub bloom_filter: bool,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bloom_filter: true,
            max_depth: 64,
        }
    }
}
