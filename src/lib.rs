extern crate byteorder;
extern crate failure;
extern crate normalize_line_endings;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate sha2;
extern crate smush;
extern crate uuid;
#[macro_use]
extern crate log;

pub mod encoding;
pub mod error;
pub mod identity;
pub mod material;
pub mod utilities;

pub use crate::error::{pretty_error, Error, ErrorKind, Result};
pub use crate::material::{
    BlendMode, FlagMap, Pass, PlatformBitset, Shader, ShaderBlob, ShaderPlatform, ShaderStage,
    SupportedPlatforms, Variant, VariantRecord,
};
