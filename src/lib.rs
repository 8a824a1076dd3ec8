pub mod aggregation;
pub mod display;
pub mod error;
pub mod interval;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod types;

// Re-exports for library users
pub use aggregation::{fold, scan, Aggregator};
pub use error::{EngineError, Result};
pub use pipeline::Pipeline;
pub use store::{ColumnType, FieldValue, RowStore};
pub use types::{
    unstruct, Config, DataSource, EventRecord, GenerativeModel, Interval, Observation, Operator,
    OutputRow, ResampledSeries, SeriesPoint, WindowRow, DEFAULT_INITIAL_ROWS, STREAMING_BUFFER_SIZE,
};
