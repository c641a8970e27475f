pub mod auth;
pub mod response;
pub mod settings;
pub mod tag;
pub mod task;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that may be absent, `null`, or a value, so patches
/// can tell "leave unchanged" (`None`) from "clear" (`Some(None)`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
