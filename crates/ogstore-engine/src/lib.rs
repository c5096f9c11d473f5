#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]

pub mod analyzer;
pub mod demo_schema;
pub mod flexlock;
pub mod global;
pub mod index;
pub mod merge;
pub mod object;
pub mod objectset;
pub mod processor;

pub use analyzer::{add_analyzer, analyze, AnalyzerFn};
pub use flexlock::FlexLock;
pub use global::config;
pub use index::Index;
pub use merge::{add_merge_approver, ApproverFn, MergeDecision};
pub use object::{FlexInit, Object};
pub use objectset::ObjectSet;
pub use processor::{add_processor, process, Priority, ProcessorFn};
