use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub raw: Vec<u8>,
    pub txt: String,
}

/// Base58 encoded SHA-256 of a shader payload.
pub fn compute_data_identity(data: &[u8]) -> Result<Identity> {
    let mut hasher = Sha256::default();
    hasher.input(data);

    let output_raw = hasher.result().to_vec();
    let output_b58 = smush::encode(
        &output_raw,
        smush::Encoding::Base58,
        smush::Quality::Default,
    )
    .map_err(|err| Error::bug(format!("failed to base58 encode identity: {:?}", err)))?;
    let output_txt = String::from_utf8(output_b58)
        .map_err(|err| Error::bug(format!("identity is not valid UTF-8: {:?}", err)))?;

    Ok(Identity {
        raw: output_raw,
        txt: output_txt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stable() {
        let a = compute_data_identity(b"DXBC").unwrap();
        let b = compute_data_identity(b"DXBC").unwrap();
        let c = compute_data_identity(b"SPIR").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.txt, c.txt);
        assert_eq!(a.raw.len(), 32);
        assert!(!a.txt.is_empty());
    }
}
