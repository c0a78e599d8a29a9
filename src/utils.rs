use crate::models::{is_error_placeholder, Algorithm, DigestMap, VerificationStatus};

/// Pull the first plausible digest out of pasted text or a checksum file.
/// Accepted line shapes:
/// - a single hex token
/// - "<hash>  <file>" (coreutils style)
/// - "<file> <hash>"
///
/// A token counts only if it is all hex and its length matches the hex length
/// of some supported algorithm.
pub fn parse_first_hash_from_text(s: &str) -> Option<String> {
    s.lines()
        .flat_map(str::split_whitespace)
        .map(|tok| tok.trim_start_matches('*'))
        .find(|tok| looks_like_digest(tok))
        .map(str::to_ascii_lowercase)
}

fn looks_like_digest(tok: &str) -> bool {
    !tok.is_empty()
        && tok.chars().all(|c| c.is_ascii_hexdigit())
        && Algorithm::all().iter().any(|a| a.digest_len() * 2 == tok.len())
}

/// First algorithm (in map order) whose digest equals `candidate`, ignoring
/// case and surrounding whitespace. Error placeholders never match.
pub fn find_matching_algorithm(digests: &DigestMap, candidate: &str) -> Option<Algorithm> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    digests
        .iter()
        .filter(|(_, value)| !is_error_placeholder(value))
        .find(|(_, value)| value.eq_ignore_ascii_case(candidate))
        .map(|(&algorithm, _)| algorithm)
}

pub fn check_hash(digests: &DigestMap, candidate: &str) -> VerificationStatus {
    match find_matching_algorithm(digests, candidate) {
        Some(algorithm) => VerificationStatus::Match(algorithm),
        None => VerificationStatus::NoMatch,
    }
}
