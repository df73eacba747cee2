//! External-boundary adapters: capability ports the engines are
//! injected with, plus source-schema conversions into canonical domain
//! types. Grounded on `original_source/.../infrastructure/adapters` —
//! the original imports these concretely from call sites; here each
//! boundary is a trait the job fabric supplies an implementation for.

pub mod feed;
pub mod name_resolver;
pub mod ports;

pub use feed::{FeedParser, FeedParseError};
pub use name_resolver::{NameResolver, StaticNameResolver};
pub use ports::{ChartRenderer, KeypointDetector, LlmAnalysisAdapter, MultiObjectTracker, ObjectDetector, RagIndexPort};
