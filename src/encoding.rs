//! Nucleotide encoding and the substitution table used to mutate reads.

use phf::phf_map;

/// Possible replacements of each canonical base. A base never maps to itself.
pub static SUBSTITUTES: phf::Map<u8, [u8; 3]> = phf_map! {
    b'A' => [b'T', b'G', b'C'],
    b'C' => [b'A', b'T', b'G'],
    b'G' => [b'A', b'T', b'C'],
    b'T' => [b'A', b'G', b'C'],
};

/// Get the replacements for `base`, or `None` if it is not a canonical base.
#[inline]
pub fn substitutes(base: u8) -> Option<&'static [u8; 3]> {
    SUBSTITUTES.get(&base.to_ascii_uppercase())
}

/// Normalize raw sequence bytes: drop line breaks and upper-case the rest.
pub fn normalize_sequence(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .filter(|&&enc| enc != b'\n' && enc != b'\r')
        .map(|enc| enc.to_ascii_uppercase())
        .collect()
}
