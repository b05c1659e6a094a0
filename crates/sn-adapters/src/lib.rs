//! External adapter traits (C3) and their concrete HTTP-backed
//! implementations: `Ingestor`, `Transcriber`, `Suggester`, `Analyzer`,
//! `Crawler`, each wrapped by a shared retry/backoff policy.

pub mod analyzer;
pub mod crawler;
pub mod http;
pub mod ingestor;
pub mod retry;
pub mod suggester;
pub mod transcriber;

pub use analyzer::{AnalyzeRequest, AnalyzeResult, Analyzer, OpenAiAnalyzer};
pub use crawler::{Crawler, CrawlResult, HttpCrawler};
pub use ingestor::{Ingestor, PodcastIngestor, RssIngestor};
pub use retry::{with_retry, AdapterError};
pub use suggester::{ExistingHypothesis, HypothesisSuggestion, OpenAiSuggester, Suggester};
pub use transcriber::{AssemblyTranscriber, OpenAiTranscriber, TranscribeRequest, TranscribeResult, Transcriber};
