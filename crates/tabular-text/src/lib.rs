//! tabular-text: Table document model and text codec for ParamsDB dumps
//!
//! This crate contains the pure table logic with NO generator dependencies:
//! - Cell values (`Value`) with explicit printed-form rules
//! - Tables, named-column row access (`ColumnIndex`, `Record`)
//! - Ordered `Document` of tables
//! - Line-oriented reader for the JSON-like dump (`parse`)
//! - Deterministic, column-aligned writer (`serialize`)
//! - In-place re-alignment of an existing dump (`realign`)
//!
//! The dump looks like JSON but is written one row per line with every
//! column padded to a common width:
//!
//! ```text
//! {
//!   "DevVarTypes": {
//!     "columns": ["Variable_type", "C_type" ],
//!     "rows": [
//!       [         "tint8u        ", "uint8_t" ],
//!       [         "tfloat        ", "float  " ]
//!     ]
//!   }
//! }
//! ```

pub mod document;
pub mod error;
pub mod parse;
pub mod realign;
pub mod serialize;
pub mod table;
pub mod tokenize;
pub mod value;

// Re-export commonly used types
pub use document::Document;
pub use error::{CodecError, FormatIssue, LiteralError};
pub use parse::{parse, Parsed};
pub use realign::{realign, Realigned};
pub use serialize::{serialize, AlignmentPolicy};
pub use table::{ColumnIndex, MissingColumn, Record, Row, Table, TableBody};
pub use tokenize::{split_top_level, tokenize_row, RowLine};
pub use value::Value;
