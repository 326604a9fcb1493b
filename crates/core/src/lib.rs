//! Size-constrained media conversion.
//!
//! A [`Dispatcher`] classifies each [`ConversionRequest`] by its destination
//! extension and routes it to one of the encoder adapters in [`converter`].
//! Requests that carry a size target run through the [`SearchEngine`], which
//! walks a [`CandidateLadder`] until an output fits.

pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod events;
pub mod jobs;
pub mod ladder;
pub mod metrics;
pub mod options;
pub mod request;
pub mod search;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig, StorageConfig,
};
pub use converter::{
    AudioParams, Bitrate, ConverterConfig, DocumentParams, EncodeError, Encoder,
    EncoderCapabilities, GpuVendor, ImageParams, MediaCategory, Resolution, VideoParams,
};
pub use dispatcher::{ConversionOutcome, Dispatcher};
pub use events::{
    create_event_system, ConversionEvent, EventFilter, EventHandle, EventRecord, EventSink,
    EventStore, MemoryEventStore, NullSink, Strategy,
};
pub use jobs::{JobError, JobId, JobRecord, JobRunner, JobStatus, JobsConfig};
pub use ladder::{CandidateLadder, LadderError, ParameterValue};
pub use options::{OptionError, OptionsRecord, RawOptions};
pub use request::{classify_extension, ConversionRequest, EXTENSION_CATEGORIES};
pub use search::{SearchEngine, SearchOutcome};
