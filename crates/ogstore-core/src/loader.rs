use std::sync::{OnceLock, RwLock};

/// Opaque tag grouping analyzers and processors registered by a single
/// ingestion backend. Obtained from `register_loader`; never constructed
/// directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(u32);

fn registry() -> &'static RwLock<Vec<&'static str>> {
    static REGISTRY: OnceLock<RwLock<Vec<&'static str>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Vec::new()))
}

/// Registers a new loader under `name`, returning a stable `LoaderId`.
/// Intended to be called once per ingestion backend at process start
/// (typically from a `static`/`OnceLock` in the loader's own module); the
/// registry is treated as immutable once ingestion begins.
pub fn register_loader(name: &'static str) -> LoaderId {
    let mut reg = registry().write().expect("loader registry poisoned");
    reg.push(name);
    LoaderId(u32::try_from(reg.len() - 1).expect("loader count overflowed u32"))
}

#[must_use]
pub fn loader_name(id: LoaderId) -> &'static str {
    registry().read().expect("loader registry poisoned")[id.0 as usize]
}
