//! Dynamic attribute schemas
//!
//! Resolves a category's bound attributes and turns raw values into their
//! canonical, storable form:
//! - `resolver`: category → ordered bindings, indexed by id and name
//! - `validator`: per-type coercion and pattern checks
//! - `codec`: canonical value ⇄ stored text

mod codec;
mod errors;
mod resolver;
mod types;
mod validator;

pub use codec::{
    codec_for, decode_value, encode_value, BooleanCodec, NumberCodec, PassthroughCodec,
    StorageCodec, StructuredCodec, TextCodec,
};
pub use errors::{CoercionError, CoercionResult};
pub use resolver::{resolve, AttributeRef, CategorySchema, SchemaEntry};
pub use types::DataType;
pub use validator::{coerce, compile_pattern, display_string, is_iso_date, is_iso_datetime};
