pub mod browser;
pub mod config;
pub mod element;
pub mod error;
pub mod field;
pub mod filler;
pub mod inspect;
pub mod locator;
pub mod mapping;
pub mod page;
pub mod rows;
pub mod runlog;
pub mod runner;
pub mod submit;
pub mod surface;
pub mod values;

pub use browser::FormBrowser;
pub use config::{BrowserBuilder, BrowserConfig, FillSettings};
pub use element::Element;
pub use error::{Error, Result};
pub use field::{FieldKind, FieldSpec, FieldValue, FormConfig, PageSettings};
pub use filler::FillOutcome;
pub use page::{FormField, Page};
pub use submit::SuccessSignal;
pub use surface::{Control, Surface};
