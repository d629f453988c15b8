//! linker-pipeline
//!
//! Concurrent record pipeline: archive reading, per-record processing into a
//! shared job table, and the flush daemon that drains finished records to a
//! sink. `orchestrator::Pipeline` wires these together for one run.
pub mod flush;
pub mod gazetteer;
pub mod html;
pub mod job_table;
pub mod orchestrator;
pub mod processor;
pub mod sink;
pub mod warc;

pub use flush::{FlushDaemon, FlushPass, FlushSummary};
pub use job_table::{JobEntry, JobTable};
pub use orchestrator::{Pipeline, RunReport};
pub use processor::{RecordOutcome, RecordProcessor};
pub use sink::{Sink, TsvSink};
