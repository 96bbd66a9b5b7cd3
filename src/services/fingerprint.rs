//! 64-bit simhash of a problem's text, stored as lowercase hex.
//!
//! Near-identical problems produce fingerprints a few bits apart.

use sha2::{Digest, Sha256};

const SHINGLE_WIDTH: usize = 4;

/// Fingerprints the statement followed by every question's statement and answer.
pub(crate) fn problem_fingerprint<'a>(
    statement: &str,
    questions: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut text = String::from(statement);
    for (question, answer) in questions {
        text.push(' ');
        text.push_str(question);
        text.push(' ');
        text.push_str(answer);
    }
    format!("{:x}", simhash(&text))
}

fn simhash(text: &str) -> u64 {
    let normalized: Vec<char> = text
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_')
        .collect();

    let mut weights = [0i64; 64];
    for shingle in shingles(&normalized) {
        let hash = feature_hash(&shingle);
        for (bit, weight) in weights.iter_mut().enumerate() {
            if hash & (1 << bit) != 0 {
                *weight += 1;
            } else {
                *weight -= 1;
            }
        }
    }

    weights
        .iter()
        .enumerate()
        .filter(|(_, weight)| **weight > 0)
        .fold(0u64, |acc, (bit, _)| acc | (1 << bit))
}

fn shingles(chars: &[char]) -> Vec<String> {
    if chars.len() <= SHINGLE_WIDTH {
        return vec![chars.iter().collect()];
    }
    chars.windows(SHINGLE_WIDTH).map(|window| window.iter().collect()).collect()
}

fn feature_hash(feature: &str) -> u64 {
    let digest = Sha256::digest(feature.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
