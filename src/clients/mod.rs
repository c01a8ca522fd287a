pub mod browser;
pub mod influx;
pub mod llm;
pub mod reader;

pub use browser::{ChromeRenderer, PageRenderer};
pub use influx::{InfluxSink, MetricSink, StoreConfig};
pub use llm::{OpenAiExtractor, PropertyExtractor};
pub use reader::{ContentReader, FetchPolicy, ReaderClient};
