//! # Header Signature Block
//!
//! RFC 9421 style signing of method, path and the `signify-*` headers under
//! the label `signify`:
//!
//! ```text
//! Signature-Input: signify=("@method" "@path" "signify-resource" "signify-timestamp");created=1700000000;keyid="EAbc...";alg="ed25519"
//! Signature: indexed="?0";signify="0B..."
//! ```
//!
//! The signature base is one `"<component>": <value>` line per covered
//! component followed by the `"@signature-params"` line carrying the
//! Signature-Input member verbatim.

use crate::domain::entities::Identity;
use crate::domain::errors::AsxError;
use crate::domain::headers::{
    header_str, signing_path, RESOURCE_HEADER, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER,
    TIMESTAMP_HEADER,
};
use http::{HeaderMap, HeaderValue, Method};
use shared_crypto::{Ed25519PublicKey, Ed25519Signature};

/// Label of the signature this protocol produces and checks.
pub const SIGNATURE_LABEL: &str = "signify";

/// Algorithm identifier carried in `alg`.
pub const ALGORITHM: &str = "ed25519";

/// Components every signature must cover.
pub const REQUIRED_COMPONENTS: [&str; 4] = ["@method", "@path", RESOURCE_HEADER, TIMESTAMP_HEADER];

/// Parsed `signify` member of a Signature-Input header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureParams {
    /// Covered components in signing order
    pub components: Vec<String>,
    /// Creation time, seconds since the epoch
    pub created: i64,
    /// Signer identifier
    pub keyid: String,
    /// Member text after `signify=`, used verbatim in the signature base
    raw: String,
}

impl SignatureParams {
    /// Parameters for a new signature over [`REQUIRED_COMPONENTS`].
    pub fn new(created: i64, keyid: &str) -> Self {
        let components: Vec<String> = REQUIRED_COMPONENTS.iter().map(|c| c.to_string()).collect();
        let inner = components
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(" ");
        let raw = format!(
            "({});created={};keyid=\"{}\";alg=\"{}\"",
            inner, created, keyid, ALGORITHM
        );

        Self {
            components,
            created,
            keyid: keyid.to_string(),
            raw,
        }
    }

    /// Find and parse the `signify` member of a Signature-Input value.
    pub fn parse(header_value: &str) -> Result<Self, AsxError> {
        let prefix = format!("{}=", SIGNATURE_LABEL);
        let member = header_value
            .split(',')
            .map(str::trim)
            .find_map(|m| m.strip_prefix(prefix.as_str()))
            .ok_or_else(|| malformed("no signify member in signature-input"))?;

        let after_open = member
            .strip_prefix('(')
            .ok_or_else(|| malformed("component list must start with '('"))?;
        let (inner, params) = after_open
            .split_once(')')
            .ok_or_else(|| malformed("unterminated component list"))?;

        let components = inner
            .split_whitespace()
            .map(|c| {
                c.strip_prefix('"')
                    .and_then(|c| c.strip_suffix('"'))
                    .map(str::to_string)
                    .ok_or_else(|| malformed("component identifiers must be quoted"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut created = None;
        let mut keyid = None;
        for param in params.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| malformed("signature parameter without value"))?;
            match name {
                "created" => {
                    created = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| malformed("created is not an integer"))?,
                    )
                }
                "keyid" => keyid = Some(unquote(value)?.to_string()),
                "alg" => {
                    if unquote(value)? != ALGORITHM {
                        return Err(malformed("unsupported signature algorithm"));
                    }
                }
                _ => {}
            }
        }

        let params = Self {
            components,
            created: created.ok_or_else(|| malformed("missing created parameter"))?,
            keyid: keyid.ok_or_else(|| malformed("missing keyid parameter"))?,
            raw: member.to_string(),
        };

        if let Some(missing) = REQUIRED_COMPONENTS
            .iter()
            .find(|required| !params.components.iter().any(|c| c == *required))
        {
            return Err(malformed(&format!("signature does not cover {}", missing)));
        }

        Ok(params)
    }

    /// Header value form, `signify=<member>`.
    pub fn to_header_value(&self) -> String {
        format!("{}={}", SIGNATURE_LABEL, self.raw)
    }
}

fn malformed(reason: &str) -> AsxError {
    AsxError::MalformedSignatureHeaders(reason.to_string())
}

fn unquote(value: &str) -> Result<&str, AsxError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| malformed("parameter value must be quoted"))
}

/// Build the signature base for `params` over this message.
pub fn signature_base(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    params: &SignatureParams,
) -> Result<String, AsxError> {
    let mut base = String::new();

    for component in &params.components {
        let value = match component.as_str() {
            "@method" => method.as_str(),
            "@path" => signing_path(path),
            name => header_str(headers, name)
                .ok_or_else(|| malformed(&format!("covered header {} is absent", name)))?,
        };
        base.push_str(&format!("\"{}\": {}\n", component, value.trim()));
    }

    base.push_str(&format!("\"@signature-params\": {}", params.raw));
    Ok(base)
}

/// Raw Signature header value (the fingerprint input).
pub fn signature_header(headers: &HeaderMap) -> Result<&str, AsxError> {
    header_str(headers, SIGNATURE_HEADER)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| malformed("missing signature header"))
}

/// Extract the `signify` signature from a Signature header value.
fn parse_signature_value(header_value: &str) -> Result<Ed25519Signature, AsxError> {
    let prefix = format!("{}=", SIGNATURE_LABEL);
    let quoted = header_value
        .split([';', ','])
        .map(str::trim)
        .find_map(|item| item.strip_prefix(prefix.as_str()))
        .ok_or_else(|| malformed("no signify entry in signature header"))?;

    Ed25519Signature::from_qb64(unquote(quoted)?)
        .map_err(|e| malformed(&format!("signature value: {}", e)))
}

/// Sign method, path and the `signify-*` headers already present in `headers`,
/// adding `Signature-Input` and `Signature`.
///
/// # Errors
///
/// `MalformedSignatureHeaders` if a covered header is missing from `headers`.
pub fn sign_headers(
    identity: &Identity,
    method: &Method,
    path: &str,
    headers: &mut HeaderMap,
    created: i64,
) -> Result<(), AsxError> {
    let params = SignatureParams::new(created, identity.resource_id().as_str());
    let base = signature_base(method, path, headers, &params)?;
    let signature = identity.keys().sign(base.as_bytes());

    let input_value = HeaderValue::from_str(&params.to_header_value())
        .map_err(|e| AsxError::Internal(format!("signature-input header: {}", e)))?;
    let signature_value = HeaderValue::from_str(&format!(
        "indexed=\"?0\";{}=\"{}\"",
        SIGNATURE_LABEL,
        signature.to_qb64()
    ))
    .map_err(|e| AsxError::Internal(format!("signature header: {}", e)))?;

    headers.insert(SIGNATURE_INPUT_HEADER, input_value);
    headers.insert(SIGNATURE_HEADER, signature_value);
    Ok(())
}

/// Verify the header signature block against `key`.
///
/// `expected_signer` is the header-declared sender; a `keyid` naming anyone
/// else is treated as a failed signature.
pub fn verify_headers(
    key: &Ed25519PublicKey,
    expected_signer: &str,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> Result<(), AsxError> {
    let input = header_str(headers, SIGNATURE_INPUT_HEADER)
        .ok_or_else(|| malformed("missing signature-input header"))?;
    let params = SignatureParams::parse(input)?;
    let signature = parse_signature_value(signature_header(headers)?)?;
    let base = signature_base(method, path, headers, &params)?;

    if params.keyid != expected_signer {
        return Err(AsxError::InvalidHeaderSignature);
    }

    key.verify(base.as_bytes(), &signature)
        .map_err(|_| AsxError::InvalidHeaderSignature)
}
