//! # rusty-forms-types
//!
//! The value model shared by every rusty-forms crate:
//!
//! - [`FieldValue`] - the nested form value tree (records, sequences, scalars)
//! - [`FieldPath`] - dotted/indexed locations such as `social.twitter` or `phNumbers.0.number`
//! - [`path`] - copy-on-write `get`/`set` access into the tree
//!
//! ```rust
//! use rusty_forms_types::{path, FieldPath, FieldValue};
//!
//! let root = FieldValue::from(serde_json::json!({ "social": { "twitter": "old" } }));
//! let twitter = FieldPath::parse("social.twitter").unwrap();
//!
//! let updated = path::set(&root, &twitter, "new".into()).unwrap();
//! assert_eq!(path::get(&updated, &twitter).unwrap(), FieldValue::from("new"));
//! assert_eq!(path::get(&root, &twitter).unwrap(), FieldValue::from("old"));
//! ```

pub mod error;
pub mod path;
pub mod value;

pub use error::PathError;
pub use path::{FieldPath, Segment};
pub use value::{FieldMap, FieldValue, DATE_FORMAT};
