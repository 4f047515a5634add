//! Dependency descriptors.
//!
//! A descriptor list is read from `deps.txt` (an indentation-based line
//! format) or, when that fails, from `deps.json`. Both produce the same
//! ordered sequence of [`RawRecord`]s.
//!
//! ```text
//! # comment
//! - zlib
//! type : cmake
//! src : https://example.com/zlib-1.3.tar.gz
//! options :
//!     ZLIB_BUILD_EXAMPLES OFF
//! options+!windows :
//!     CMAKE_C_FLAGS -fPIC
//! ```

mod json;
mod load;
mod text;
mod types;

pub use json::parse_json;
pub use load::{DescriptorSource, LoadOutcome, LoadedDescriptors, load_descriptors, load_json_format, load_line_format};
pub use text::{parse_descriptors, write_descriptors};
pub use types::{AttrValue, DescriptorError, ParseError, ParseErrorKind, RawRecord};
