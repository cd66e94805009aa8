use crate::error::{Error, Result};

code_enum! {
    /// How the output of a pass combines with the framebuffer.
    pub enum BlendMode: "blend mode" {
        NoneMode = 0 => "NoneMode",
        Replace = 1 => "Replace",
        AlphaBlend = 2 => "AlphaBlend",
        ColorBlendAlphaAdd = 3 => "ColorBlendAlphaAdd",
        PreMultiplied = 4 => "PreMultiplied",
        InvertColor = 5 => "InvertColor",
        Additive = 6 => "Additive",
        AdditiveAlpha = 7 => "AdditiveAlpha",
        Multiply = 8 => "Multiply",
        MultiplyBoth = 9 => "MultiplyBoth",
        InverseSrcAlpha = 10 => "InverseSrcAlpha",
        SrcAlpha = 11 => "SrcAlpha",
    }
}

impl BlendMode {
    /// Reverse name lookup used by the descriptor form.
    pub fn parse(name: &str) -> Result<BlendMode> {
        BlendMode::from_name(name).ok_or_else(|| Error::unknown_blend_mode(name))
    }
}
