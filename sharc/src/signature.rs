use crate::error::VerifyError;
use crate::logger;
use sharc_sys::{ArchiveHeader, BinaryArchiveHeader};
use std::fmt;

/// A four character tag identifying an archive kind.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Signature(pub u32);

impl Signature {
    pub const fn from_tag(tag: [u8; 4]) -> Self {
        Signature(sharc_sys::signature_word(tag))
    }

    pub fn tag(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.tag() {
            let c = if byte.is_ascii_graphic() { byte as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(\"{self}\")")
    }
}

/// A header carrying a signature and version that must match this build.
pub trait Signed: bytemuck::Pod {
    const NAME: &'static str;
    const SIGNATURE: Signature;
    const VERSION: u32;

    fn signature(&self) -> Signature;
    fn version(&self) -> u32;
}

impl Signed for ArchiveHeader {
    const NAME: &'static str = "ShaderArchive";
    const SIGNATURE: Signature = Signature(sharc_sys::SHADER_ARCHIVE_SIGNATURE);
    const VERSION: u32 = sharc_sys::SHADER_ARCHIVE_VERSION;

    fn signature(&self) -> Signature {
        Signature(self.signature)
    }

    fn version(&self) -> u32 {
        self.version
    }
}

impl Signed for BinaryArchiveHeader {
    const NAME: &'static str = "BinaryShaderArchive";
    const SIGNATURE: Signature = Signature(sharc_sys::BINARY_SHADER_ARCHIVE_SIGNATURE);
    const VERSION: u32 = sharc_sys::BINARY_SHADER_ARCHIVE_VERSION;

    fn signature(&self) -> Signature {
        Signature(self.signature)
    }

    fn version(&self) -> u32 {
        self.version
    }
}

/// Compares the signature, then the version, against the compiled constants.
pub fn check<T: Signed>(header: &T) -> Result<(), VerifyError> {
    if header.signature() != T::SIGNATURE {
        return Err(VerifyError::Signature {
            expected: T::SIGNATURE,
            actual: header.signature(),
        });
    }

    if header.version() != T::VERSION {
        return Err(VerifyError::Version {
            expected: T::VERSION,
            actual: header.version(),
        });
    }

    Ok(())
}

/// Like [`check`], but a mismatch is fatal.
///
/// # Panics
/// If the archive was built for a different signature or version.
#[track_caller]
pub fn verify<T: Signed>(header: &T) {
    if let Err(error) = check(header) {
        logger::fatal_verify(T::NAME, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_displays_tag() {
        assert_eq!(Signature::from_tag(*b"SHAA").to_string(), "SHAA");
        assert_eq!(Signature::from_tag([b'S', 0, b'A', 0xff]).to_string(), "S.A.");
    }

    #[test]
    fn check_reports_signature_before_version() {
        let header = ArchiveHeader {
            signature: Signature::from_tag(*b"NOPE").0,
            version: 3,
            ..Default::default()
        };

        assert_eq!(
            check(&header),
            Err(VerifyError::Signature {
                expected: ArchiveHeader::SIGNATURE,
                actual: Signature::from_tag(*b"NOPE"),
            })
        );
    }

    #[test]
    fn check_reports_version() {
        let header = BinaryArchiveHeader {
            signature: sharc_sys::BINARY_SHADER_ARCHIVE_SIGNATURE,
            version: 9,
            ..Default::default()
        };

        assert_eq!(
            check(&header),
            Err(VerifyError::Version {
                expected: sharc_sys::BINARY_SHADER_ARCHIVE_VERSION,
                actual: 9,
            })
        );
    }

    #[test]
    #[should_panic(expected = "Wrong binary. [XXXX]")]
    fn verify_is_fatal() {
        let header = ArchiveHeader {
            signature: Signature::from_tag(*b"XXXX").0,
            version: sharc_sys::SHADER_ARCHIVE_VERSION,
            ..Default::default()
        };

        verify(&header);
    }
}
