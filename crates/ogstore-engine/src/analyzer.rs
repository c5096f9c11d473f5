use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use ogstore_core::{AttributeSchema, LoaderId};

use crate::object::Object;
use crate::objectset::ObjectSet;

/// A read-only pass over one object, run once the full object set has
/// finished ingesting. Analyzers may look up other objects in `set` (every
/// index is real-locked for the duration of the run) but must not mutate
/// `set`'s membership — only the attributes of the object they were handed.
pub type AnalyzerFn<S> = fn(&ObjectSet<S>, &Arc<Object<S>>);

struct Entry<S: AttributeSchema> {
    loader: LoaderId,
    func: AnalyzerFn<S>,
}

static ANALYZERS: OnceLock<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>> {
    ANALYZERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `analyzer` to run for `loader` whenever [`analyze`] is called
/// for this schema and loader.
pub fn add_analyzer<S: AttributeSchema>(loader: LoaderId, analyzer: AnalyzerFn<S>) {
    let mut guard = registry().write();
    let entry = guard
        .entry(TypeId::of::<S>())
        .or_insert_with(|| Box::new(Vec::<Entry<S>>::new()));
    entry
        .downcast_mut::<Vec<Entry<S>>>()
        .expect("registry entry type mismatch for this TypeId")
        .push(Entry { loader, func: analyzer });
}

fn analyzers_for<S: AttributeSchema>(loader: LoaderId) -> Vec<AnalyzerFn<S>> {
    let guard = registry().read();
    guard
        .get(&TypeId::of::<S>())
        .and_then(|b| b.downcast_ref::<Vec<Entry<S>>>())
        .map(|entries| entries.iter().filter(|e| e.loader == loader).map(|e| e.func).collect())
        .unwrap_or_default()
}

/// Runs every analyzer registered for `loader` over every object in `set`,
/// one native thread per analyzer, each thread sweeping the full snapshot
/// with its own analyzer. `set` (and every index and object it owns) is
/// switched to real locking for the duration of the run and back to
/// single-threaded mode once every worker has joined.
///
/// `progress(done, total)` is called, from whichever worker thread crosses
/// it, every time the combined done-count across all workers advances by
/// `total / 1000` (or every object, if fewer than 1000 total steps exist);
/// `total` is `objects.len() * analyzers.len()`. Returns one elapsed
/// duration per analyzer, in registration order.
pub fn analyze<S: AttributeSchema>(set: &ObjectSet<S>, loader: LoaderId, progress: impl Fn(usize, usize) + Sync) -> Vec<Duration> {
    let analyzers = analyzers_for::<S>(loader);
    if analyzers.is_empty() {
        return Vec::new();
    }
    let objects = set.slice();
    if objects.is_empty() {
        return vec![Duration::ZERO; analyzers.len()];
    }

    let total = objects.len() * analyzers.len();
    let tick = (total / 1000).max(1);

    set.set_threadsafe(true);
    let done = AtomicUsize::new(0);
    let progress = &progress;
    let objects = &objects;
    let timings = std::thread::scope(|scope| {
        let handles: Vec<_> = analyzers
            .iter()
            .map(|&analyzer| {
                let done = &done;
                scope.spawn(move || {
                    let start = Instant::now();
                    for obj in objects.iter() {
                        analyzer(set, obj);
                        let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if count % tick == 0 {
                            progress(count, total);
                        }
                    }
                    start.elapsed()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("analyzer worker panicked")).collect::<Vec<_>>()
    });
    set.set_threadsafe(false);

    let final_count = done.load(Ordering::Relaxed);
    if final_count % tick != 0 {
        progress(final_count, total);
    }
    timings
}
