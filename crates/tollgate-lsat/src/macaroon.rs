//! The macaroon: an immutable signed core plus an append-only sequence of
//! first-party caveats, chained under HMAC-SHA256.
//!
//! The signature chain is the classic construction: the root signature is
//! `HMAC(root_key, identifier)`, and each appended caveat folds in as
//! `sig = HMAC(sig, caveat)`. Verification recomputes the chain from the
//! root key and compares in constant time, so flipping any byte of the
//! identifier, a caveat or the signature fails the whole credential.

use crate::caveat::Caveat;
use crate::error::LsatError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Size of the macaroon signature in bytes.
pub const SIG_SIZE: usize = 32;

/// Serialization format version byte.
const FORMAT_VERSION: u8 = 0;

/// A bearer credential with chained, append-only caveats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macaroon {
    location: String,
    identifier: Vec<u8>,
    caveats: Vec<Caveat>,
    signature: [u8; SIG_SIZE],
}

fn hmac(key: &[u8], message: &[u8]) -> [u8; SIG_SIZE] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

impl Macaroon {
    /// Mint a caveat-free macaroon keyed with the given root secret.
    pub fn new(root_key: &[u8; 32], location: impl Into<String>, identifier: &[u8]) -> Self {
        let identifier = identifier.to_vec();
        let signature = hmac(root_key, &identifier);
        Self {
            location: location.into(),
            identifier,
            caveats: Vec::new(),
            signature,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// The opaque identifier payload (an encoded [`crate::Identifier`]).
    pub fn identifier(&self) -> &[u8] {
        &self.identifier
    }

    pub fn caveats(&self) -> &[Caveat] {
        &self.caveats
    }

    pub fn signature(&self) -> &[u8; SIG_SIZE] {
        &self.signature
    }

    /// Append a first-party caveat, folding it into the signature chain.
    /// Requires no key material, so any holder of the bytes can attenuate;
    /// the result can only be narrower than what it started from.
    pub fn add_first_party_caveat(&mut self, caveat: Caveat) {
        self.signature = hmac(&self.signature, caveat.to_string().as_bytes());
        self.caveats.push(caveat);
    }

    /// Recompute the signature chain from the root key and compare against
    /// the carried signature in constant time.
    pub fn verify(&self, root_key: &[u8; 32]) -> Result<(), LsatError> {
        let mut mac = HmacSha256::new_from_slice(root_key).expect("HMAC accepts keys of any size");
        mac.update(&self.identifier);
        for caveat in &self.caveats {
            let sig: [u8; SIG_SIZE] = mac.finalize().into_bytes().into();
            mac = HmacSha256::new_from_slice(&sig).expect("HMAC accepts keys of any size");
            mac.update(caveat.to_string().as_bytes());
        }

        // verify_slice compares in constant time
        mac.verify_slice(&self.signature)
            .map_err(|_| LsatError::SignatureMismatch)
    }

    /// Serialize to the stable length-prefixed binary layout.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            1 + 2 + self.location.len() + 2 + self.identifier.len() + 2 + SIG_SIZE,
        );
        buf.push(FORMAT_VERSION);
        push_field(&mut buf, self.location.as_bytes());
        push_field(&mut buf, &self.identifier);
        buf.extend_from_slice(&(self.caveats.len() as u16).to_be_bytes());
        for caveat in &self.caveats {
            push_field(&mut buf, caveat.to_string().as_bytes());
        }
        buf.extend_from_slice(&self.signature);
        buf
    }

    /// Deserialize from the binary layout, validating framing strictly.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, LsatError> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor.take_u8()?;
        if version != FORMAT_VERSION {
            return Err(LsatError::Decode(format!(
                "unknown credential format version {version}"
            )));
        }

        let location = String::from_utf8(cursor.take_field()?.to_vec())
            .map_err(|_| LsatError::Decode("location is not valid UTF-8".into()))?;
        let identifier = cursor.take_field()?.to_vec();

        let caveat_count = cursor.take_u16()?;
        let mut caveats = Vec::with_capacity(caveat_count as usize);
        for _ in 0..caveat_count {
            let raw = String::from_utf8(cursor.take_field()?.to_vec())
                .map_err(|_| LsatError::Decode("caveat is not valid UTF-8".into()))?;
            caveats.push(Caveat::decode(&raw)?);
        }

        let sig_bytes = cursor.take(SIG_SIZE)?;
        let mut signature = [0u8; SIG_SIZE];
        signature.copy_from_slice(sig_bytes);

        if !cursor.is_empty() {
            return Err(LsatError::Decode("trailing bytes after signature".into()));
        }

        Ok(Self {
            location,
            identifier,
            caveats,
            signature,
        })
    }

    /// Serialize to URL-safe base64 for header transport.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.serialize())
    }

    /// Parse a credential from its base64 transport encoding.
    pub fn from_base64(encoded: &str) -> Result<Self, LsatError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| LsatError::Decode(format!("invalid base64: {e}")))?;
        Self::deserialize(&bytes)
    }
}

fn push_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u16).to_be_bytes());
    buf.extend_from_slice(field);
}

/// Minimal strict reader over the serialized credential.
struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LsatError> {
        if self.bytes.len() < n {
            return Err(LsatError::Decode("credential truncated".into()));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn take_u8(&mut self) -> Result<u8, LsatError> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16, LsatError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn take_field(&mut self) -> Result<&'a [u8], LsatError> {
        let len = self.take_u16()? as usize;
        self.take(len)
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
