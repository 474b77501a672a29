//! Seed derivation.
//!
//! Every independent random stream in a run is seeded from the base seed
//! through BLAKE3, so streams never overlap and never depend on how many
//! values another stream consumed:
//! - songs of an album (`derive_song_seed`)
//! - retry attempts of the structure sampler (`derive_attempt_seed`)
//! - named components such as tempo and key selection (`derive_component_seed`)

/// Domain tags mixed into the hash so the three derivations never collide.
const SONG_DOMAIN: &[u8] = b"song";
const ATTEMPT_DOMAIN: &[u8] = b"attempt";

fn hash_to_u64(input: &[u8]) -> u64 {
    let hash = blake3::hash(input);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Derives the seed for an album track.
///
/// Track 0 uses the base seed unchanged, so generating a single song and
/// generating track 0 of an album with the same seed agree.
///
/// ```text
/// song_seed = index == 0 ? base : truncate_u64(BLAKE3("song" || base || index))
/// ```
///
/// # Example
/// ```
/// use songsmith_spec::hash::derive_song_seed;
///
/// assert_eq!(derive_song_seed(42, 0), 42);
/// assert_ne!(derive_song_seed(42, 1), derive_song_seed(42, 2));
/// ```
pub fn derive_song_seed(base_seed: u64, index: u32) -> u64 {
    if index == 0 {
        return base_seed;
    }
    let mut input = Vec::with_capacity(SONG_DOMAIN.len() + 12);
    input.extend_from_slice(SONG_DOMAIN);
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(&index.to_le_bytes());
    hash_to_u64(&input)
}

/// Derives the seed for a retry of the structure sampler.
///
/// Attempt 0 uses the song seed itself; later attempts get perturbed
/// sub-streams.
pub fn derive_attempt_seed(song_seed: u64, attempt: u32) -> u64 {
    if attempt == 0 {
        return song_seed;
    }
    let mut input = Vec::with_capacity(ATTEMPT_DOMAIN.len() + 12);
    input.extend_from_slice(ATTEMPT_DOMAIN);
    input.extend_from_slice(&song_seed.to_le_bytes());
    input.extend_from_slice(&attempt.to_le_bytes());
    hash_to_u64(&input)
}

/// Derives a seed for a named component of a song.
///
/// ```text
/// component_seed = truncate_u64(BLAKE3(seed || key))
/// ```
///
/// # Example
/// ```
/// use songsmith_spec::hash::derive_component_seed;
///
/// assert_ne!(derive_component_seed(7, "tempo"), derive_component_seed(7, "key"));
/// ```
pub fn derive_component_seed(seed: u64, key: &str) -> u64 {
    let mut input = Vec::with_capacity(8 + key.len());
    input.extend_from_slice(&seed.to_le_bytes());
    input.extend_from_slice(key.as_bytes());
    hash_to_u64(&input)
}

/// Computes a BLAKE3 hash of arbitrary data as lowercase hex.
pub fn blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
