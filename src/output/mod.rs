//! Output formatters for scan results.
//!
//! - [`text`]: human-readable report, optionally colored
//! - [`json`]: machine-readable document for scripting
//!
//! # Example
//!
//! ```no_run
//! use duplicut::duplicates::DuplicateFinder;
//! use duplicut::error::ExitCode;
//! use duplicut::output::JsonOutput;
//! use duplicut::scanner::HashAlgorithm;
//! use duplicut::signal::CancelToken;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let outcome = finder
//!     .find_duplicates(&[PathBuf::from(".")], &CancelToken::new())
//!     .unwrap();
//!
//! let output = JsonOutput::new(
//!     outcome.groups(),
//!     outcome.summary(),
//!     HashAlgorithm::Sha256,
//!     ExitCode::for_outcome(&outcome),
//! );
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextReport;
