use crate::encoding::{
    read_bool, read_string, read_u16, write_bool, write_count, write_string, write_u16,
};
use crate::error::{Error, ErrorKind, Result};
use crate::material::{
    BlendMode, FlagMap, PlatformBitset, ShaderBlob, ShaderPlatform, ShaderStage,
    SupportedPlatforms, Variant, VariantRecord,
};
use crate::utilities::write_file;
use failure::ResultExt;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// One named technique of a material together with all of its compiled
/// flag combinations.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Pass<V = Variant, P = SupportedPlatforms> {
    pub name: String,
    pub supported_platforms: P,
    /// Pass used in place of this one when it is unsupported; may be empty.
    pub fallback_pass: String,
    /// `None` when no blend mode is specified.
    pub default_blend_mode: Option<BlendMode>,
    pub default_variant: FlagMap,
    pub variants: Vec<V>,
}

impl<V, P> Pass<V, P>
where
    V: VariantRecord + Default,
    P: PlatformBitset,
{
    /// Decode a pass record. On failure `self` may be partially populated.
    pub fn read<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.name = read_string(reader)?;
        self.supported_platforms = P::from_bit_string(&read_string(reader)?)?;
        self.fallback_pass = read_string(reader)?;

        self.default_blend_mode = if read_bool(reader)? {
            Some(BlendMode::from_code(read_u16(reader)?)?)
        } else {
            None
        };

        self.default_variant = FlagMap::new();
        let default_flag_count = read_u16(reader)?;
        for _ in 0..default_flag_count {
            let key = read_string(reader)?;
            let value = read_string(reader)?;
            self.default_variant.insert(key, value);
        }

        let variant_count = read_u16(reader)?;
        self.variants = Vec::with_capacity(variant_count as usize);
        for _ in 0..variant_count {
            let mut variant = V::default();
            variant.read(reader)?;
            self.variants.push(variant);
        }

        debug!(
            "Read pass {:?} with {} variants",
            self.name,
            self.variants.len()
        );
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_string(writer, &self.name)?;
        write_string(writer, &self.supported_platforms.get_bit_string())?;
        write_string(writer, &self.fallback_pass)?;

        write_bool(writer, self.default_blend_mode.is_some())?;
        if let Some(mode) = self.default_blend_mode {
            write_u16(writer, mode.code())?;
        }

        write_count(writer, self.default_variant.len(), "default flag")?;
        for (key, value) in self.default_variant.iter() {
            write_string(writer, key)?;
            write_string(writer, value)?;
        }

        write_count(writer, self.variants.len(), "variant")?;
        for variant in &self.variants {
            variant.write(writer)?;
        }
        Ok(())
    }

    /// The name as a single path component under a store root.
    fn file_stem(&self) -> Result<&str> {
        let name = self.name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(&['/', '\\'][..]) {
            return Err(Error::schema(format!(
                "pass name {:?} cannot be used as a file name",
                name
            )));
        }
        Ok(name)
    }

    pub fn serialize_properties(&self) -> Value {
        let mut object = Map::new();
        object.insert("name".to_string(), Value::from(self.name.as_str()));
        object.insert(
            "supported_platforms".to_string(),
            self.supported_platforms.serialize(),
        );
        object.insert(
            "fallback_pass".to_string(),
            Value::from(self.fallback_pass.as_str()),
        );
        object.insert(
            "default_blend_mode".to_string(),
            Value::from(self.default_blend_mode.map_or("", |mode| mode.name())),
        );
        object.insert("default_variant".to_string(), json!(self.default_variant));
        object.insert(
            "variants".to_string(),
            Value::Array(
                self.variants
                    .iter()
                    .enumerate()
                    .map(|(index, variant)| variant.serialize_properties(index))
                    .collect(),
            ),
        );
        Value::Object(object)
    }

    /// Write `{root}/{name}.json` and, unless skipped, every shader payload
    /// into `{root}/{name}/`. The shader directory must not exist yet.
    pub fn store(&self, root: &Path, skip_shaders: bool) -> Result<()> {
        let name = self.file_stem()?;
        let descriptor_path = root.join(format!("{}.json", name));
        {
            let descriptor_file = File::create(&descriptor_path)
                .with_context(|_| ErrorKind::path(&descriptor_path))?;
            let mut descriptor_writer = BufWriter::new(descriptor_file);
            let formatter = PrettyFormatter::with_indent(b"    ");
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut descriptor_writer, formatter);
            self.serialize_properties().serialize(&mut serializer)?;
            descriptor_writer
                .flush()
                .with_context(|_| ErrorKind::path(&descriptor_path))?;
        }
        info!("Wrote pass descriptor {:?}", descriptor_path);

        if skip_shaders {
            return Ok(());
        }

        let pass_dir = root.join(name);
        std::fs::create_dir(&pass_dir).with_context(|_| ErrorKind::path(&pass_dir))?;

        let mut shader_count = 0;
        for (index, variant) in self.variants.iter().enumerate() {
            for shader in variant.shaders() {
                let shader_path = pass_dir.join(shader.file_name(index));
                trace!("Writing shader {:?}", shader_path);
                write_file(&shader_path, shader.payload())
                    .with_context(|_| ErrorKind::path(&shader_path))?;
                shader_count += 1;
            }
        }
        info!("Wrote {} shaders to {:?}", shader_count, pass_dir);
        Ok(())
    }

    /// Apply a descriptor. Absent keys keep their current value; a present
    /// `variants` array replaces the whole list, with shader payloads read from
    /// `path/{name}`.
    pub fn load(&mut self, object: &Value, path: &Path) -> Result<()> {
        let object = object
            .as_object()
            .ok_or_else(|| Error::schema("pass descriptor must be an object"))?;

        if let Some(name) = object.get("name") {
            self.name = expect_string(name, "name")?;
        }
        if let Some(platforms) = object.get("supported_platforms") {
            self.supported_platforms.load(platforms)?;
        }
        if let Some(fallback_pass) = object.get("fallback_pass") {
            self.fallback_pass = expect_string(fallback_pass, "fallback_pass")?;
        }
        match object.get("default_blend_mode") {
            None | Some(Value::Null) => {}
            Some(Value::String(mode)) if mode.is_empty() => self.default_blend_mode = None,
            Some(Value::String(mode)) => {
                self.default_blend_mode = Some(BlendMode::parse(mode)?);
            }
            Some(_) => return Err(Error::schema("default_blend_mode must be a string")),
        }
        if let Some(default_variant) = object.get("default_variant") {
            self.default_variant = serde_json::from_value(default_variant.clone())
                .map_err(|err| Error::schema(format!("invalid default_variant: {}", err)))?;
        }

        if let Some(variants) = object.get("variants") {
            let variants = variants
                .as_array()
                .ok_or_else(|| Error::schema("variants must be an array"))?;
            let variant_path = path.join(self.file_stem()?);
            self.variants = variants
                .iter()
                .map(|object| {
                    let mut variant = V::default();
                    variant.load(object, &variant_path)?;
                    Ok(variant)
                })
                .collect::<Result<Vec<V>>>()?;
        }

        debug!(
            "Loaded pass {:?} with {} variants",
            self.name,
            self.variants.len()
        );
        Ok(())
    }

    /// Hand every variant its fully qualified name and current position.
    pub fn label(&mut self, material_name: &str) {
        for (index, variant) in self.variants.iter_mut().enumerate() {
            variant.label(material_name, &self.name, index);
        }
    }

    /// Canonical ordering: flags sorted by key, variants by their sorted flags.
    pub fn sort_variants(&mut self) {
        self.default_variant.sort();
        for variant in &mut self.variants {
            variant.flags_mut().sort();
        }
        self.variants
            .sort_by_cached_key(|variant| variant.flags().to_string());
    }

    /// Fold the variants of `other` into this pass. Variants with identical
    /// flags are merged, the rest are appended in `other`'s order. Defaults of
    /// `other` are ignored.
    pub fn merge_variants(&mut self, other: Pass<V, P>) {
        let mut merged = 0;
        let mut appended = 0;
        for other_variant in other.variants {
            let matching = self
                .variants
                .iter_mut()
                .find(|variant| variant.flags() == other_variant.flags());
            match matching {
                Some(variant) => {
                    variant.merge(other_variant);
                    merged += 1;
                }
                None => {
                    self.variants.push(other_variant);
                    appended += 1;
                }
            }
        }
        info!(
            "Merged {} and appended {} variants into pass {:?}",
            merged, appended, self.name
        );
    }

    /// Every flag key mapped to all of the values it takes in this pass.
    pub fn flag_definitions(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut definitions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let flags = self
            .default_variant
            .iter()
            .chain(self.variants.iter().flat_map(|variant| variant.flags().iter()));
        for (key, value) in flags {
            definitions
                .entry(key.to_string())
                .or_insert_with(BTreeSet::new)
                .insert(value.to_string());
        }
        definitions
    }

    pub fn platforms(&self) -> HashSet<ShaderPlatform> {
        self.variants
            .iter()
            .flat_map(|variant| variant.platforms())
            .collect()
    }

    pub fn stages(&self) -> HashSet<ShaderStage> {
        self.variants
            .iter()
            .flat_map(|variant| variant.stages())
            .collect()
    }

    pub fn add_platforms(&mut self, platforms: &HashSet<ShaderPlatform>) {
        for variant in &mut self.variants {
            variant.add_platforms(platforms);
        }
    }

    pub fn remove_platforms(&mut self, platforms: &HashSet<ShaderPlatform>) {
        for variant in &mut self.variants {
            variant.remove_platforms(platforms);
        }
    }
}

fn expect_string(value: &Value, key: &str) -> Result<String> {
    value
        .as_str()
        .map(|value| value.to_string())
        .ok_or_else(|| Error::schema(format!("{} must be a string", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Shader;
    use std::io::Cursor;

    fn flags(pairs: &[(&str, &str)]) -> FlagMap {
        pairs.iter().cloned().collect()
    }

    fn variant(pairs: &[(&str, &str)], platform: ShaderPlatform, payload: &[u8]) -> Variant {
        let mut variant = Variant::new(flags(pairs));
        variant.shaders.push(Shader::new(
            ShaderStage::Vertex,
            platform,
            payload.to_vec(),
        ));
        variant.shaders.push(Shader::new(
            ShaderStage::Fragment,
            platform,
            payload.to_vec(),
        ));
        variant
    }

    fn sample() -> Pass {
        Pass {
            name: "Transparent".to_string(),
            supported_platforms: SupportedPlatforms::from_bit_string("1100000000").unwrap(),
            fallback_pass: "Fallback".to_string(),
            default_blend_mode: Some(BlendMode::AlphaBlend),
            default_variant: flags(&[("Fancy", "On"), ("Emissive", "Off")]),
            variants: vec![
                variant(
                    &[("Fancy", "On"), ("Emissive", "On")],
                    ShaderPlatform::Essl300,
                    &[1, 2],
                ),
                variant(
                    &[("Fancy", "Off"), ("Emissive", "Off")],
                    ShaderPlatform::Essl300,
                    &[3],
                ),
            ],
        }
    }

    fn encode(pass: &Pass) -> Vec<u8> {
        let mut data = Vec::new();
        pass.write(&mut data).unwrap();
        data
    }

    fn decode(data: &[u8]) -> Pass {
        let mut pass: Pass = Pass::default();
        pass.read(&mut Cursor::new(data)).unwrap();
        pass
    }

    #[test]
    fn binary_round_trip_is_byte_exact() {
        let original = sample();
        let data = encode(&original);
        let decoded = decode(&data);
        assert_eq!(decoded, original);
        assert_eq!(encode(&decoded), data);
        assert_eq!(decoded.supported_platforms.get_bit_string(), "1100000000");
    }

    #[test]
    fn binary_header_layout() {
        let mut pass: Pass = Pass::default();
        pass.name = "A".to_string();
        pass.supported_platforms = SupportedPlatforms::from_bit_string("01").unwrap();
        pass.default_blend_mode = Some(BlendMode::Additive);

        let data = encode(&pass);
        assert_eq!(
            data,
            vec![
                1, 0, b'A', // name
                2, 0, b'0', b'1', // supported platforms
                0, 0, // fallback pass
                1, 6, 0, // blend mode present, Additive
                0, 0, // default variant
                0, 0, // variants
            ]
        );
    }

    #[test]
    fn unspecified_blend_mode_has_no_code() {
        let mut pass = sample();
        pass.default_blend_mode = None;
        pass.variants.clear();
        pass.default_variant = FlagMap::new();

        let data = encode(&pass);
        // name, bit string, fallback, flag byte, two zero counts
        let header = 2 + 11 + 2 + 10 + 2 + 8;
        assert_eq!(data.len(), header + 1 + 2 + 2);
        assert_eq!(data[header], 0);
        assert_eq!(decode(&data).default_blend_mode, None);
        assert_eq!(pass.serialize_properties()["default_blend_mode"], json!(""));
    }

    #[test]
    fn unknown_blend_mode_code_is_rejected() {
        let mut pass = sample();
        pass.variants.clear();
        let mut data = encode(&pass);
        let header = 2 + 11 + 2 + 10 + 2 + 8;
        data[header + 1] = 99;

        let mut decoded: Pass = Pass::default();
        let err = decoded.read(&mut Cursor::new(&data)).unwrap_err();
        match err.kind() {
            ErrorKind::UnknownCode(_) => {}
            kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn truncated_record_is_rejected() {
        let data = encode(&sample());
        for length in &[0, 5, data.len() / 2, data.len() - 1] {
            let mut pass: Pass = Pass::default();
            let err = pass.read(&mut Cursor::new(&data[..*length])).unwrap_err();
            match err.kind() {
                ErrorKind::Decode(_) => {}
                kind => panic!("unexpected error kind at {}: {:?}", length, kind),
            }
        }
    }

    #[test]
    fn consecutive_records_share_a_cursor() {
        let first = sample();
        let mut second = sample();
        second.name = "Opaque".to_string();

        let mut data = encode(&first);
        data.extend(encode(&second));

        let mut cursor = Cursor::new(&data);
        let mut a: Pass = Pass::default();
        let mut b: Pass = Pass::default();
        a.read(&mut cursor).unwrap();
        b.read(&mut cursor).unwrap();
        assert_eq!(a.name, "Transparent");
        assert_eq!(b.name, "Opaque");
        assert_eq!(cursor.position() as usize, data.len());
    }

    #[test]
    fn descriptor_has_stable_key_order() {
        let tree = sample().serialize_properties();
        let keys: Vec<&str> = tree
            .as_object()
            .unwrap()
            .keys()
            .map(|key| key.as_str())
            .collect();
        assert_eq!(
            keys,
            vec![
                "name",
                "supported_platforms",
                "fallback_pass",
                "default_blend_mode",
                "default_variant",
                "variants",
            ]
        );
        assert_eq!(tree["default_blend_mode"], json!("AlphaBlend"));
        assert_eq!(
            tree["default_variant"],
            json!({ "Fancy": "On", "Emissive": "Off" })
        );
        assert_eq!(
            tree["variants"][1]["shaders"][0]["file_name"],
            json!("1.ESSL_300.Vertex.bin")
        );
    }

    #[test]
    fn loading_empty_object_changes_nothing() {
        let mut pass = sample();
        pass.load(&json!({}), Path::new("unused")).unwrap();
        assert_eq!(pass, sample());
    }

    #[test]
    fn load_applies_present_fields() {
        let mut pass = sample();
        pass.load(
            &json!({
                "name": "Opaque",
                "fallback_pass": "",
                "default_blend_mode": "",
                "default_variant": { "Fancy": "Off" },
                "variants": [],
            }),
            Path::new("unused"),
        )
        .unwrap();

        assert_eq!(pass.name, "Opaque");
        assert_eq!(pass.fallback_pass, "");
        assert_eq!(pass.default_blend_mode, None);
        assert_eq!(pass.default_variant, flags(&[("Fancy", "Off")]));
        assert!(pass.variants.is_empty());
        assert_eq!(pass.supported_platforms, sample().supported_platforms);
    }

    #[test]
    fn load_rejects_shader_directory_outside_root() {
        let mut pass = sample();
        let err = pass
            .load(
                &json!({ "name": "../Transparent", "variants": [] }),
                Path::new("unused"),
            )
            .unwrap_err();
        match err.kind() {
            ErrorKind::Schema(_) => {}
            kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn load_rejects_unknown_blend_mode() {
        let mut pass = sample();
        let err = pass
            .load(&json!({ "default_blend_mode": "Glow" }), Path::new("unused"))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownBlendMode("Glow".to_string()));

        pass.load(&json!({ "default_blend_mode": "Multiply" }), Path::new("unused"))
            .unwrap();
        assert_eq!(pass.default_blend_mode, Some(BlendMode::Multiply));
    }

    #[test]
    fn load_rejects_wrong_types() {
        let mut pass = sample();
        for tree in &[
            json!([]),
            json!({ "name": 3 }),
            json!({ "default_variant": { "Fancy": true } }),
            json!({ "variants": {} }),
        ] {
            match pass.load(tree, Path::new("unused")).unwrap_err().kind() {
                ErrorKind::Schema(_) => {}
                kind => panic!("unexpected error kind for {}: {:?}", tree, kind),
            }
        }
    }

    #[test]
    fn sort_is_canonical_and_idempotent() {
        let mut a = sample();
        let mut b = sample();
        b.variants.reverse();
        b.default_variant = flags(&[("Emissive", "Off"), ("Fancy", "On")]);
        for variant in &mut b.variants {
            let pairs: Vec<(String, String)> = variant
                .flags
                .iter()
                .rev()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            variant.flags = pairs.into_iter().collect();
        }
        assert_ne!(encode(&a), encode(&b));

        a.sort_variants();
        b.sort_variants();
        assert_eq!(encode(&a), encode(&b));
        assert_eq!(a.default_variant.iter().next(), Some(("Emissive", "Off")));
        assert_eq!(a.variants[0].flags.get("Fancy"), Some("Off"));

        let once = encode(&a);
        a.sort_variants();
        assert_eq!(encode(&a), once);
    }

    #[test]
    fn merge_matches_on_flags() {
        let mut a: Pass = Pass::default();
        a.variants
            .push(variant(&[("x", "1")], ShaderPlatform::Essl300, &[1]));

        let mut b: Pass = Pass::default();
        b.default_blend_mode = Some(BlendMode::Replace);
        b.variants.push(variant(&[("x", "1")], ShaderPlatform::Metal, &[2]));
        b.variants.push(variant(&[("x", "2")], ShaderPlatform::Metal, &[3]));

        a.merge_variants(b);
        assert_eq!(a.variants.len(), 2);
        assert_eq!(a.variants[0].flags, flags(&[("x", "1")]));
        assert_eq!(a.variants[0].shaders.len(), 4);
        assert_eq!(a.variants[1].flags, flags(&[("x", "2")]));
        assert_eq!(a.default_blend_mode, None);

        let platforms: HashSet<_> = vec![ShaderPlatform::Essl300, ShaderPlatform::Metal]
            .into_iter()
            .collect();
        assert_eq!(a.platforms(), platforms);
    }

    #[test]
    fn flag_definitions_cover_defaults_and_variants() {
        let mut pass: Pass = Pass::default();
        pass.default_variant = flags(&[("a", "0")]);
        pass.variants.push(Variant::new(flags(&[("a", "1"), ("b", "2")])));

        let definitions = pass.flag_definitions();
        assert_eq!(definitions.len(), 2);
        let a: BTreeSet<String> = vec!["0".to_string(), "1".to_string()]
            .into_iter()
            .collect();
        let b: BTreeSet<String> = vec!["2".to_string()].into_iter().collect();
        assert_eq!(definitions["a"], a);
        assert_eq!(definitions["b"], b);
    }

    #[test]
    fn empty_pass_has_no_platforms_or_stages() {
        let pass: Pass = Pass::default();
        assert!(pass.platforms().is_empty());
        assert!(pass.stages().is_empty());
    }

    #[test]
    fn stages_and_platform_broadcast() {
        let mut pass = sample();
        let stages: HashSet<_> = vec![ShaderStage::Vertex, ShaderStage::Fragment]
            .into_iter()
            .collect();
        assert_eq!(pass.stages(), stages);

        let metal: HashSet<_> = vec![ShaderPlatform::Metal].into_iter().collect();
        pass.add_platforms(&metal);
        assert!(pass.platforms().contains(&ShaderPlatform::Metal));
        assert!(pass.variants.iter().all(|variant| variant.shaders.len() == 4));

        let essl: HashSet<_> = vec![ShaderPlatform::Essl300].into_iter().collect();
        pass.remove_platforms(&essl);
        assert_eq!(pass.platforms(), metal);
    }

    #[test]
    fn label_follows_current_positions() {
        let mut pass = sample();
        pass.label("RenderChunk");
        assert_eq!(
            pass.variants[1].shaders[0].file_name(1),
            "RenderChunk.Transparent.1.ESSL_300.Vertex.bin"
        );

        pass.variants.swap(0, 1);
        pass.label("RenderChunk");
        assert_eq!(
            pass.variants[0].shaders[0].file_name(0),
            "RenderChunk.Transparent.0.ESSL_300.Vertex.bin"
        );
    }
}
