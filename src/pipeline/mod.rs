pub mod audit;
pub mod batch;
pub mod classify;
pub mod config;
pub mod output;
pub mod results;
pub mod rules;

pub use batch::{collect_inputs, process_file, run_batch, BatchOptions, BatchSummary};
pub use classify::Classifier;
pub use config::{init_default_config, ParserConfig};
pub use results::{project, FieldResults, ProfileRecord};
pub use rules::{Rule, RuleTable};
