code_enum! {
    /// Pipeline stage of a shader blob.
    pub enum ShaderStage: "shader stage" {
        Vertex = 0 => "Vertex",
        Fragment = 1 => "Fragment",
        Compute = 2 => "Compute",
        Unknown = 3 => "Unknown",
    }
}
