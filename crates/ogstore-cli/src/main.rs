use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ogstore_core::{AttributeSchema, AttributeValue};
use ogstore_engine::demo_schema::DemoSchema;
use ogstore_engine::object::{FlexInit, Object};
use ogstore_engine::objectset::ObjectSet;

/// Command-line front end for exercising an in-memory object store built
/// over the bundled demo attribute schema.
#[derive(Parser)]
#[command(name = "ogstore", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a small synthetic directory tree and report statistics.
    Demo {
        /// Number of leaf objects to generate under the synthetic tree.
        #[arg(long, default_value_t = 1000)]
        count: usize,
    },
    /// Look up an object by distinguished name in a freshly generated tree.
    Find {
        #[arg(long, default_value_t = 1000)]
        count: usize,
        /// Distinguished name to look up, e.g. "CN=User-42,DC=example,DC=com".
        dn: String,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Demo { count } => demo(count),
        Command::Find { count, dn } => find(count, &dn),
    }
}

fn build_tree(count: usize) -> ObjectSet<DemoSchema> {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    let root = set.add_new(&[FlexInit::Attr(
        DemoSchema::DISTINGUISHED_NAME,
        AttributeValue::Str("DC=example,DC=com".into()),
    )]);
    set.set_root(root.clone());

    for i in 0..count {
        let dn = format!("CN=User-{i},DC=example,DC=com");
        let user = set.add_new(&[
            FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, AttributeValue::Str(dn)),
            FlexInit::Attr(DemoSchema::WHEN_CREATED, AttributeValue::Int(i as i64)),
            FlexInit::Attr(
                DemoSchema::OBJECT_CATEGORY_SIMPLE,
                AttributeValue::Str("Person".into()),
            ),
        ]);
        user.set_parent(&root);
    }
    set
}

static PEOPLE_SEEN: AtomicUsize = AtomicUsize::new(0);

fn count_people(_set: &ObjectSet<DemoSchema>, obj: &Arc<Object<DemoSchema>>) {
    if obj.one_attr_string(DemoSchema::OBJECT_CATEGORY_SIMPLE) == "Person" {
        PEOPLE_SEEN.fetch_add(1, Ordering::Relaxed);
    }
}

fn demo(count: usize) {
    let set = build_tree(count);
    tracing::info!(objects = set.len(), "built synthetic tree");

    let loader = ogstore_core::loader::register_loader("ogstore-cli-demo");
    ogstore_engine::analyzer::add_analyzer::<DemoSchema>(loader, count_people);
    let timings = ogstore_engine::analyzer::analyze(&set, loader, |done, total| {
        tracing::debug!(done, total, "analyzer progress");
    });
    tracing::info!(?timings, seen = PEOPLE_SEEN.load(Ordering::Relaxed), "analysis complete");

    let stats = set.statistics();
    println!("total objects: {}", set.len());
    println!("people:        {}", stats[DemoSchema::classify(&AttributeValue::Str("Person".into())) as usize]);

    if let Some(root) = set.root() {
        let subs = set.subordinates(&root);
        println!("root children: {}", subs.len());
    }
}

fn find(count: usize, dn: &str) {
    let set = build_tree(count);
    match set.find(DemoSchema::DISTINGUISHED_NAME, &AttributeValue::Str(dn.to_string())) {
        Some(obj) => println!("found object id={}", obj.id()),
        None => {
            println!("no object with dn {dn}");
            std::process::exit(1);
        }
    }
}
