code_enum! {
    /// Target graphics backend a shader blob was compiled for.
    pub enum ShaderPlatform: "shader platform" {
        Direct3dSm40 = 0 => "Direct3D_SM40",
        Direct3dSm50 = 1 => "Direct3D_SM50",
        Direct3dSm60 = 2 => "Direct3D_SM60",
        Direct3dSm65 = 3 => "Direct3D_SM65",
        Direct3dXb1 = 4 => "Direct3D_XB1",
        Direct3dXbx = 5 => "Direct3D_XBX",
        Glsl120 = 6 => "GLSL_120",
        Glsl430 = 7 => "GLSL_430",
        Essl100 = 8 => "ESSL_100",
        Essl300 = 9 => "ESSL_300",
        Essl310 = 10 => "ESSL_310",
        Metal = 11 => "Metal",
        Vulkan = 12 => "Vulkan",
        Nvn = 13 => "Nvn",
        Pssl = 14 => "Pssl",
    }
}
