// Adapters layer: concrete collaborators and batch file IO.

pub mod csv_reports;
pub mod precomputed;

pub use csv_reports::{load_requests, read_reports_csv, write_results_csv, BatchReport};
pub use precomputed::{ChannelMeanExtractor, PrecomputedDisasterClassifier, PrecomputedTextClassifier};
