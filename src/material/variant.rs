use crate::encoding::{
    read_bool, read_bytes, read_string, read_u16, read_u8, write_bool, write_bytes, write_count,
    write_string, write_u8,
};
use crate::error::{Error, ErrorKind, Result};
use crate::identity::compute_data_identity;
use crate::material::{FlagMap, ShaderPlatform, ShaderStage};
use crate::utilities::read_file;
use failure::ResultExt;
use serde_json::Value;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

/// A shader object whose payload can be written out on its own.
pub trait ShaderBlob {
    /// Unique, stable file name of this shader within its pass directory.
    fn file_name(&self, variant_index: usize) -> String;
    fn payload(&self) -> &[u8];
}

/// Capabilities a pass needs from the records it stores as variants.
pub trait VariantRecord {
    type Shader: ShaderBlob;

    fn read<R: Read>(&mut self, reader: &mut R) -> Result<()>;
    fn write<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// Descriptor form; `index` is the position of the variant within its pass.
    fn serialize_properties(&self, index: usize) -> Value;
    /// Apply a descriptor, reading shader payloads relative to `path`.
    fn load(&mut self, object: &Value, path: &Path) -> Result<()>;

    fn label(&mut self, material_name: &str, pass_name: &str, index: usize);
    fn merge(&mut self, other: Self);

    fn platforms(&self) -> HashSet<ShaderPlatform>;
    fn stages(&self) -> HashSet<ShaderStage>;
    fn add_platforms(&mut self, platforms: &HashSet<ShaderPlatform>);
    fn remove_platforms(&mut self, platforms: &HashSet<ShaderPlatform>);

    fn flags(&self) -> &FlagMap;
    fn flags_mut(&mut self) -> &mut FlagMap;
    fn shaders(&self) -> &[Self::Shader];
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shader {
    pub stage: ShaderStage,
    pub platform: ShaderPlatform,
    pub bytes: Vec<u8>,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShaderEntry {
    stage: String,
    platform: String,
    file_name: String,
    identity: Option<String>,
}

impl Shader {
    pub fn new(stage: ShaderStage, platform: ShaderPlatform, bytes: Vec<u8>) -> Self {
        Shader {
            stage,
            platform,
            bytes,
            label: None,
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Shader> {
        let stage_name = read_string(reader)?;
        let platform_name = read_string(reader)?;
        let stage = ShaderStage::from_code(read_u8(reader)? as u16)?;
        let platform = ShaderPlatform::from_code(read_u8(reader)? as u16)?;
        if stage.name() != stage_name || platform.name() != platform_name {
            return Err(Error::decode(format!(
                "shader header names {}/{} disagree with codes {}/{}",
                stage_name, platform_name, stage, platform
            )));
        }
        let bytes = read_bytes(reader)?;
        Ok(Shader::new(stage, platform, bytes))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_string(writer, self.stage.name())?;
        write_string(writer, self.platform.name())?;
        write_u8(writer, self.stage.code() as u8)?;
        write_u8(writer, self.platform.code() as u8)?;
        write_bytes(writer, &self.bytes)
    }

    pub fn identity_as_string(&self) -> String {
        match compute_data_identity(&self.bytes) {
            Ok(identity) => identity.txt,
            Err(_) => String::from("NO_IDENTITY"),
        }
    }

    fn serialize_properties(&self, variant_index: usize) -> Value {
        json!({
            "stage": self.stage.name(),
            "platform": self.platform.name(),
            "file_name": self.file_name(variant_index),
            "identity": self.identity_as_string(),
        })
    }

    fn load(object: &Value, path: &Path) -> Result<Shader> {
        let entry: ShaderEntry = serde_json::from_value(object.clone())
            .map_err(|err| Error::schema(format!("invalid shader entry: {}", err)))?;
        let stage = ShaderStage::from_name(&entry.stage)
            .ok_or_else(|| Error::unknown_code(format!("shader stage {:?}", entry.stage)))?;
        let platform = ShaderPlatform::from_name(&entry.platform).ok_or_else(|| {
            Error::unknown_code(format!("shader platform {:?}", entry.platform))
        })?;

        let shader_path = path.join(&entry.file_name);
        let bytes = read_file(&shader_path).with_context(|_| ErrorKind::path(&shader_path))?;
        let shader = Shader::new(stage, platform, bytes);

        if let Some(expected) = entry.identity {
            let actual = shader.identity_as_string();
            if expected != actual {
                warn!(
                    "Shader {:?} does not match its recorded identity ({} != {})",
                    shader_path, actual, expected
                );
            }
        }
        Ok(shader)
    }
}

impl ShaderBlob for Shader {
    fn file_name(&self, variant_index: usize) -> String {
        match self.label {
            Some(ref label) => format!("{}.{}.{}.bin", label, self.platform, self.stage),
            None => format!("{}.{}.{}.bin", variant_index, self.platform, self.stage),
        }
    }

    fn payload(&self) -> &[u8] {
        &self.bytes
    }
}

/// One flag combination of a pass and its compiled shaders.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub is_supported: bool,
    pub flags: FlagMap,
    pub shaders: Vec<Shader>,
}

impl Variant {
    pub fn new(flags: FlagMap) -> Self {
        Variant {
            is_supported: true,
            flags,
            shaders: Vec::new(),
        }
    }

    pub fn shader(&self, platform: ShaderPlatform, stage: ShaderStage) -> Option<&Shader> {
        self.shaders
            .iter()
            .find(|shader| shader.platform == platform && shader.stage == stage)
    }
}

impl VariantRecord for Variant {
    type Shader = Shader;

    fn read<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.is_supported = read_bool(reader)?;
        let flag_count = read_u16(reader)?;
        let shader_count = read_u16(reader)?;

        self.flags = FlagMap::new();
        for _ in 0..flag_count {
            let key = read_string(reader)?;
            let value = read_string(reader)?;
            self.flags.insert(key, value);
        }

        self.shaders = Vec::with_capacity(shader_count as usize);
        for _ in 0..shader_count {
            self.shaders.push(Shader::read(reader)?);
        }
        trace!(
            "Read variant {} with {} shaders",
            self.flags,
            self.shaders.len()
        );
        Ok(())
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_bool(writer, self.is_supported)?;
        write_count(writer, self.flags.len(), "flag")?;
        write_count(writer, self.shaders.len(), "shader")?;
        for (key, value) in self.flags.iter() {
            write_string(writer, key)?;
            write_string(writer, value)?;
        }
        for shader in &self.shaders {
            shader.write(writer)?;
        }
        Ok(())
    }

    fn serialize_properties(&self, index: usize) -> Value {
        let shaders: Vec<Value> = self
            .shaders
            .iter()
            .map(|shader| shader.serialize_properties(index))
            .collect();
        json!({
            "is_supported": self.is_supported,
            "flags": self.flags,
            "shaders": shaders,
        })
    }

    fn load(&mut self, object: &Value, path: &Path) -> Result<()> {
        let object = object
            .as_object()
            .ok_or_else(|| Error::schema("variant must be an object"))?;

        if let Some(is_supported) = object.get("is_supported") {
            self.is_supported = is_supported
                .as_bool()
                .ok_or_else(|| Error::schema("is_supported must be a boolean"))?;
        }

        if let Some(flags) = object.get("flags") {
            self.flags = serde_json::from_value(flags.clone())
                .map_err(|err| Error::schema(format!("invalid variant flags: {}", err)))?;
        }

        if let Some(shaders) = object.get("shaders") {
            let shaders = shaders
                .as_array()
                .ok_or_else(|| Error::schema("shaders must be an array"))?;
            self.shaders = shaders
                .iter()
                .map(|shader| Shader::load(shader, path))
                .collect::<Result<Vec<_>>>()?;
        }
        Ok(())
    }

    fn label(&mut self, material_name: &str, pass_name: &str, index: usize) {
        let label = format!("{}.{}.{}", material_name, pass_name, index);
        for shader in &mut self.shaders {
            shader.label = Some(label.clone());
        }
    }

    fn merge(&mut self, other: Variant) {
        self.is_supported |= other.is_supported;
        for shader in other.shaders {
            let existing = self
                .shaders
                .iter_mut()
                .find(|s| s.platform == shader.platform && s.stage == shader.stage);
            match existing {
                Some(existing) => *existing = shader,
                None => self.shaders.push(shader),
            }
        }
    }

    fn platforms(&self) -> HashSet<ShaderPlatform> {
        self.shaders.iter().map(|shader| shader.platform).collect()
    }

    fn stages(&self) -> HashSet<ShaderStage> {
        self.shaders.iter().map(|shader| shader.stage).collect()
    }

    fn add_platforms(&mut self, platforms: &HashSet<ShaderPlatform>) {
        let present = VariantRecord::platforms(self);
        let mut stages: Vec<ShaderStage> = VariantRecord::stages(self).into_iter().collect();
        stages.sort();

        let mut added: Vec<ShaderPlatform> = platforms.difference(&present).cloned().collect();
        added.sort();
        for platform in added {
            for stage in &stages {
                self.shaders.push(Shader::new(*stage, platform, Vec::new()));
            }
        }
    }

    fn remove_platforms(&mut self, platforms: &HashSet<ShaderPlatform>) {
        self.shaders
            .retain(|shader| !platforms.contains(&shader.platform));
    }

    fn flags(&self) -> &FlagMap {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut FlagMap {
        &mut self.flags
    }

    fn shaders(&self) -> &[Shader] {
        &self.shaders
    }
}
