//! The pass record of a compiled material and the pieces it is built from.

/// Declares a closed enumeration with numeric wire codes and symbolic names.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $what:literal {
            $($variant:ident = $code:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn code(self) -> u16 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn from_code(code: u16) -> crate::error::Result<$name> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(crate::error::Error::unknown_code(format!(
                        "{} code {}",
                        $what, code
                    ))),
                }
            }

            pub fn from_name(name: &str) -> Option<$name> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub mod blend_mode;
pub mod flags;
pub mod pass;
pub mod platform;
pub mod stage;
pub mod supported_platforms;
pub mod variant;

pub use self::blend_mode::BlendMode;
pub use self::flags::FlagMap;
pub use self::pass::Pass;
pub use self::platform::ShaderPlatform;
pub use self::stage::ShaderStage;
pub use self::supported_platforms::{PlatformBitset, SupportedPlatforms};
pub use self::variant::{Shader, ShaderBlob, Variant, VariantRecord};
