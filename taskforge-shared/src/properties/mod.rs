/// Custom property schema and value rules
///
/// - `options`: the `choices` list and its per-type constraints
/// - `value`: type-directed validation of values before they are stored
///
/// Storage lives in `models::custom_property` / `models::property_value`;
/// the authorized operations live in `services::custom_properties`.

pub mod options;
pub mod value;

pub use options::PropertyOptions;
pub use value::{validate_value, ValidatedValue};
