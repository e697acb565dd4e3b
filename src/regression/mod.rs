// Benchmark regression detection
//
// Pipeline: the newest entry of a suite is compared, benchmark by benchmark,
// against the trailing baseline window of the same suite.
//
// - statistics: median-based baseline center (robust to one noisy run)
// - verdict: uncertainty-aware comparator (Noise before threshold checks)
// - evaluator: two-tier roll-up (soft threshold warns, hard threshold fails)
// - config: thresholds, window size, minimum baseline, direction
//
// The comparator and evaluator are pure functions over borrowed history;
// nothing in this module performs I/O.

mod config;
mod evaluator;
mod statistics;
mod verdict;

pub use config::{parse_threshold, ComparatorConfig, ConfigError, Direction, RegressionConfig};
pub use evaluator::{evaluate, BenchmarkReport, Overall, RemovedBenchmark, SuiteReport};
pub use statistics::{coefficient_of_variation, mean, median};
pub use verdict::{compare, Change, ChangeBasis, Comparison, UnitMismatchError, Verdict};
