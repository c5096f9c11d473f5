use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use ogstore_core::{AttributeSchema, LoaderId};

use crate::object::Object;
use crate::objectset::ObjectSet;

/// Ordering bucket for registered processors, split into the pre-merge
/// ("Preprocessing") and post-merge ("Postprocessing") halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    PreprocessingEarly,
    PreprocessingNormal,
    PreprocessingLate,
    PostprocessingEarly,
    PostprocessingNormal,
    PostprocessingLate,
}

/// A derived-attribute computation run over one object at a time, in a
/// whole-collection pass triggered explicitly via [`process`] — not an
/// automatic per-object hook. Unlike an analyzer, a processor may freely
/// mutate the object it's handed.
pub type ProcessorFn<S> = fn(&ObjectSet<S>, &Arc<Object<S>>);

struct Entry<S: AttributeSchema> {
    loader: LoaderId,
    priority: Priority,
    func: ProcessorFn<S>,
}

static PROCESSORS: OnceLock<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>> {
    PROCESSORS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `processor` to run for `loader`'s ingestion whenever a
/// whole-collection pass at `priority` is triggered via [`process`].
/// Registration order is preserved and is the order processors run in
/// within a single `(loader, priority)` phase.
pub fn add_processor<S: AttributeSchema>(loader: LoaderId, priority: Priority, processor: ProcessorFn<S>) {
    let mut guard = registry().write();
    let entry = guard
        .entry(TypeId::of::<S>())
        .or_insert_with(|| Box::new(Vec::<Entry<S>>::new()));
    entry
        .downcast_mut::<Vec<Entry<S>>>()
        .expect("registry entry type mismatch for this TypeId")
        .push(Entry { loader, priority, func: processor });
}

fn processors_for<S: AttributeSchema>(loader: LoaderId, priority: Priority) -> Vec<ProcessorFn<S>> {
    let guard = registry().read();
    guard
        .get(&TypeId::of::<S>())
        .and_then(|b| b.downcast_ref::<Vec<Entry<S>>>())
        .map(|entries| {
            entries
                .iter()
                .filter(|e| e.loader == loader && e.priority == priority)
                .map(|e| e.func)
                .collect()
        })
        .unwrap_or_default()
}

/// Runs every processor registered for `loader` at `priority` over every
/// object currently in `set`, in registration order, sequentially
/// (processors run with threadsafe mode off by convention — the caller is
/// expected to have already left any bulk-ingest phase before calling
/// this). `progress(done, total)` is invoked once per object.
pub fn process<S: AttributeSchema>(
    set: &ObjectSet<S>,
    loader: LoaderId,
    priority: Priority,
    mut progress: impl FnMut(usize, usize),
) {
    let funcs = processors_for::<S>(loader, priority);
    if funcs.is_empty() {
        return;
    }
    let objects = set.slice();
    let total = objects.len();
    for (done, obj) in objects.iter().enumerate() {
        for f in &funcs {
            f(set, obj);
        }
        progress(done + 1, total);
    }
}
