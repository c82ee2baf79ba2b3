//! Share tokens: a self-describing, URL-safe encoding of a graded result.
//!
//! Layout: `v1.` followed by unpadded base64url of a small JSON object
//! `{"s": score, "g": grade, "t": tier, "n": name, "d": differentiator}`.
//! Nothing is stored server-side; the token is the whole record.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::grading::rubric::{grade_for, tier_for};
use crate::grading::{GradingResult, MAX_DIFFERENTIATOR_CHARS};

const VERSION_PREFIX: &str = "v1.";
const MAX_NAME_CHARS: usize = 100;

/// The slice of a result that travels in shared links and preview images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareProjection {
    pub score: u8,
    pub grade: String,
    pub tier: String,
    pub name: String,
    pub differentiator: String,
}

impl From<&GradingResult> for ShareProjection {
    fn from(result: &GradingResult) -> Self {
        Self {
            score: result.score,
            grade: result.grade.clone(),
            tier: result.tier.clone(),
            name: result.name.clone(),
            differentiator: result.differentiator.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireV1 {
    s: u64,
    g: String,
    t: String,
    n: String,
    d: String,
}

pub fn encode(result: &GradingResult) -> String {
    encode_projection(&ShareProjection::from(result))
}

pub fn encode_projection(projection: &ShareProjection) -> String {
    let wire = WireV1 {
        s: projection.score as u64,
        g: projection.grade.clone(),
        t: projection.tier.clone(),
        n: projection.name.clone(),
        d: projection.differentiator.clone(),
    };
    // Serializing plain strings and an integer cannot fail.
    let json = serde_json::to_vec(&wire).unwrap_or_default();
    format!("{}{}", VERSION_PREFIX, URL_SAFE_NO_PAD.encode(json))
}

/// Decode a share token. Anything malformed or inconsistent is `None`.
pub fn decode(token: &str) -> Option<ShareProjection> {
    let result = decode_inner(token.trim());
    if result.is_none() {
        debug!("Rejected share token ({} bytes)", token.len());
    }
    result
}

fn decode_inner(token: &str) -> Option<ShareProjection> {
    let body = token.strip_prefix(VERSION_PREFIX)?;
    let bytes = URL_SAFE_NO_PAD.decode(body).ok()?;
    let wire: WireV1 = serde_json::from_slice(&bytes).ok()?;

    if wire.s > 100 {
        return None;
    }
    let score = wire.s as u8;

    // Grade and tier are functions of the score; a mismatch means an edited token.
    if wire.g != grade_for(score) || wire.t != tier_for(score) {
        return None;
    }

    let name_len = wire.n.chars().count();
    if name_len == 0 || name_len > MAX_NAME_CHARS {
        return None;
    }
    if wire.d.chars().count() > MAX_DIFFERENTIATOR_CHARS {
        return None;
    }

    Some(ShareProjection {
        score,
        grade: wire.g,
        tier: wire.t,
        name: wire.n,
        differentiator: wire.d,
    })
}
