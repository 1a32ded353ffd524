//! # teleclass-orchestrator
//!
//! Runs the TELEClass pipeline end to end:
//! generative enrichment (or its cached output), corpus enrichment, term
//! merge, classifier construction, then classification of document batches
//! into taxonomy leaves.
//!
//! ```no_run
//! # async fn demo() -> Result<(), teleclass_orchestrator::TeleClassError> {
//! use teleclass_orchestrator::TeleClass;
//! use teleclass_types::{DocumentSource, Settings};
//!
//! let settings = Settings::load(Some("teleclass.toml"))?;
//! let mut teleclass = TeleClass::builder().settings(settings).build()?;
//! let result = teleclass
//!     .classify_documents(&DocumentSource::json_file("sensors.json"))
//!     .await?;
//! println!("{} leaves", result.classification_result.len());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod loader;
pub mod logging;
mod pipeline;

pub use error::TeleClassError;
pub use loader::{load_documents, DocumentLoader, JsonFileLoader, LoaderError, RecordLoader};
pub use logging::init_logging;
pub use pipeline::{TeleClass, TeleClassBuilder};
