//! A JSON object model and bounded parser. This is a from-scratch
//! implementation rather than a
//! `serde_json::Value` wrapper: the model needs an ownership discipline
//! (`lock`, `invalidate`) safe for key material and signatures that a
//! generic JSON library does not provide.

mod object;
mod parser;
mod value;

pub use object::Object;
pub use parser::{parse, parse_object, Limits};
pub use value::{Arr, Numeral, Value};
