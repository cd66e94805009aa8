use crate::error::{Error, Result};
use crate::material::ShaderPlatform;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const WIDTH_KEY: &str = "width";

/// A platform mask as stored in a pass record.
pub trait PlatformBitset: Sized {
    fn from_bit_string(bits: &str) -> Result<Self>;
    fn get_bit_string(&self) -> String;
    fn serialize(&self) -> Value;
    /// Apply a descriptor object; keys that are absent keep their current value.
    fn load(&mut self, object: &Value) -> Result<()>;
}

/// Set of platforms a pass may run on, encoded on the wire as a string of
/// '0'/'1' characters where the last character is platform code 0.
///
/// The descriptor form lists every platform by name plus a `width` entry so a
/// record survives unpack and repack with its original bit string.
#[derive(Clone, Debug)]
pub struct SupportedPlatforms {
    enabled: BTreeSet<ShaderPlatform>,
    width: usize,
}

impl Default for SupportedPlatforms {
    fn default() -> Self {
        SupportedPlatforms {
            enabled: ShaderPlatform::ALL.iter().cloned().collect(),
            width: ShaderPlatform::ALL.len(),
        }
    }
}

impl PartialEq for SupportedPlatforms {
    fn eq(&self, other: &SupportedPlatforms) -> bool {
        self.enabled == other.enabled
    }
}

impl Eq for SupportedPlatforms {}

impl SupportedPlatforms {
    pub fn none() -> Self {
        SupportedPlatforms {
            enabled: BTreeSet::new(),
            width: ShaderPlatform::ALL.len(),
        }
    }

    pub fn is_supported(&self, platform: ShaderPlatform) -> bool {
        self.enabled.contains(&platform)
    }

    pub fn set(&mut self, platform: ShaderPlatform, supported: bool) {
        if supported {
            self.enabled.insert(platform);
        } else {
            self.enabled.remove(&platform);
        }
    }

    pub fn platforms(&self) -> impl Iterator<Item = ShaderPlatform> + '_ {
        self.enabled.iter().cloned()
    }
}

impl PlatformBitset for SupportedPlatforms {
    fn from_bit_string(bits: &str) -> Result<Self> {
        let mut enabled = BTreeSet::new();
        for (position, bit) in bits.chars().rev().enumerate() {
            match bit {
                '0' => {}
                '1' => {
                    let platform = if position <= u16::max_value() as usize {
                        ShaderPlatform::from_code(position as u16).ok()
                    } else {
                        None
                    };
                    let platform = platform.ok_or_else(|| {
                        Error::unknown_code(format!("platform bit {} in {:?}", position, bits))
                    })?;
                    enabled.insert(platform);
                }
                _ => {
                    return Err(Error::unknown_code(format!(
                        "platform bit string {:?} contains {:?}",
                        bits, bit
                    )));
                }
            }
        }

        Ok(SupportedPlatforms {
            enabled,
            width: bits.chars().count(),
        })
    }

    fn get_bit_string(&self) -> String {
        (0..self.width)
            .rev()
            .map(|position| {
                let enabled = ShaderPlatform::from_code(position as u16)
                    .map(|platform| self.enabled.contains(&platform))
                    .unwrap_or(false);
                if enabled {
                    '1'
                } else {
                    '0'
                }
            })
            .collect()
    }

    fn serialize(&self) -> Value {
        let mut object = Map::new();
        for platform in ShaderPlatform::ALL {
            object.insert(
                platform.name().to_string(),
                Value::Bool(self.enabled.contains(platform)),
            );
        }
        object.insert(WIDTH_KEY.to_string(), Value::from(self.width as u64));
        Value::Object(object)
    }

    fn load(&mut self, object: &Value) -> Result<()> {
        let object = object
            .as_object()
            .ok_or_else(|| Error::schema("supported_platforms must be an object"))?;
        for (name, value) in object {
            if name == WIDTH_KEY {
                let width = value
                    .as_u64()
                    .ok_or_else(|| Error::schema("supported_platforms.width must be a number"))?;
                if width > u16::max_value() as u64 {
                    return Err(Error::schema(format!(
                        "supported_platforms.width {} is too large",
                        width
                    )));
                }
                self.width = width as usize;
                continue;
            }
            let platform = ShaderPlatform::from_name(name)
                .ok_or_else(|| Error::unknown_code(format!("platform name {:?}", name)))?;
            let supported = value.as_bool().ok_or_else(|| {
                Error::schema(format!("supported_platforms.{} must be a boolean", name))
            })?;
            self.set(platform, supported);
        }
        // A mask narrower than the highest enabled platform cannot encode it.
        if let Some(highest) = self.enabled.iter().next_back() {
            let needed = highest.code() as usize + 1;
            if self.width < needed {
                self.width = needed;
            }
        }
        Ok(())
    }
}
