//! Concurrent-ingestion stress test: several native threads race to insert
//! and merge objects into one `ObjectSet`, followed by a threaded analyzer
//! pass, to exercise the store's race-safety guarantees under load.

use std::sync::Arc;
use std::time::Instant;

use ogstore_core::AttributeValue;
use ogstore_engine::analyzer;
use ogstore_engine::demo_schema::DemoSchema;
use ogstore_engine::object::{FlexInit, Object};
use ogstore_engine::objectset::ObjectSet;

const WORKERS: usize = 8;
const OBJECTS_PER_WORKER: usize = 5_000;

fn touch_member_of(_set: &ObjectSet<DemoSchema>, obj: &Arc<Object<DemoSchema>>) {
    let _ = obj.attr(DemoSchema::MEMBER_OF);
}

fn main() {
    tracing_subscriber::fmt::init();

    let set: Arc<ObjectSet<DemoSchema>> = Arc::new(ObjectSet::new());
    let start = Instant::now();

    std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let set = Arc::clone(&set);
            scope.spawn(move || {
                for i in 0..OBJECTS_PER_WORKER {
                    let dn = format!("CN=Stress-{worker}-{i},DC=example,DC=com");
                    let incoming = Arc::new(Object::<DemoSchema>::with_flex(
                        0,
                        &[
                            FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, AttributeValue::Str(dn)),
                            FlexInit::Attr(DemoSchema::MEMBER_OF, AttributeValue::Str(format!("worker-{worker}"))),
                        ],
                    ));
                    // Every object has a unique DN here, so merge() always
                    // misses and add_merge() falls through to a plain insert;
                    // this still exercises the find-or-create race path all
                    // contending threads take.
                    set.add_merge(&[DemoSchema::DISTINGUISHED_NAME], vec![incoming]);
                }
            });
        }
    });

    let ingest_elapsed = start.elapsed();
    println!("ingested {} objects across {WORKERS} threads in {ingest_elapsed:?}", set.len());
    assert_eq!(set.len(), WORKERS * OBJECTS_PER_WORKER, "lost or duplicated an object under concurrent insert");

    let loader = ogstore_core::loader::register_loader("ogstore-cli-stress");
    analyzer::add_analyzer::<DemoSchema>(loader, touch_member_of);

    let analyze_start = Instant::now();
    let timings = analyzer::analyze(&set, loader, |done, total| {
        if done == total {
            tracing::debug!(done, total, "analyzer pass complete");
        }
    });
    println!("analyzer pass over {} objects took {:?} ({timings:?} per worker)", set.len(), analyze_start.elapsed());
}
