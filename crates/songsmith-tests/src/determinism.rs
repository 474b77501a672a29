//! Determinism verification.
//!
//! Runs a generation closure several times and compares the outputs byte by
//! byte. Song artifacts are compared as their serialized JSON, so a
//! difference in any field, float formatting included, is caught.

use std::fmt;

/// Result of a determinism verification.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether all runs produced identical output.
    pub is_deterministic: bool,
    /// Number of runs performed.
    pub runs: usize,
    /// Size of the output in bytes.
    pub output_size: usize,
    /// BLAKE3 hash of the first run's output.
    pub hash: String,
    /// If non-deterministic, the first difference found.
    pub diff_info: Option<DiffInfo>,
}

/// First byte difference found between runs.
#[derive(Debug, Clone)]
pub struct DiffInfo {
    pub offset: usize,
    /// Byte from the first run, `None` past its end.
    pub expected: Option<u8>,
    /// Byte from the differing run, `None` past its end.
    pub actual: Option<u8>,
    /// Which run (0-indexed) produced the differing output.
    pub run_index: usize,
    /// Text of the first run around the difference.
    pub context: String,
}

impl fmt::Display for DiffInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |b: Option<u8>| match b {
            Some(b) => format!("0x{:02X}", b),
            None => "end of output".to_string(),
        };
        write!(
            f,
            "Difference at byte {}: expected {}, got {} (run {})\n  Context: {:?}",
            self.offset,
            show(self.expected),
            show(self.actual),
            self.run_index,
            self.context
        )
    }
}

impl DeterminismResult {
    /// Panic with a detailed message if not deterministic.
    pub fn assert_deterministic(&self) {
        if let Some(diff) = &self.diff_info {
            panic!(
                "Non-deterministic output detected!\n\
                 Runs: {}\n\
                 Output size: {} bytes\n\
                 Hash: {}\n\
                 {}",
                self.runs, self.output_size, self.hash, diff
            );
        }
    }
}

/// Run generation `runs` times and verify all outputs are identical.
pub fn verify_determinism<F, O>(generate_fn: F, runs: usize) -> DeterminismResult
where
    F: Fn() -> O,
    O: AsRef<[u8]>,
{
    assert!(runs >= 2, "Must run at least 2 times to verify determinism");

    let reference = generate_fn();
    let reference = reference.as_ref();
    let hash = compute_hash(reference);

    for run_index in 1..runs {
        let output = generate_fn();
        if let Some(diff) = find_first_difference(reference, output.as_ref(), run_index) {
            return DeterminismResult {
                is_deterministic: false,
                runs,
                output_size: reference.len(),
                hash,
                diff_info: Some(diff),
            };
        }
    }

    DeterminismResult {
        is_deterministic: true,
        runs,
        output_size: reference.len(),
        hash,
        diff_info: None,
    }
}

/// Find the first difference between two outputs, length included.
pub(crate) fn find_first_difference(
    expected: &[u8],
    actual: &[u8],
    run_index: usize,
) -> Option<DiffInfo> {
    let offset = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())))?;

    let start = offset.saturating_sub(24);
    let end = (offset + 24).min(expected.len());
    Some(DiffInfo {
        offset,
        expected: expected.get(offset).copied(),
        actual: actual.get(offset).copied(),
        run_index,
        context: String::from_utf8_lossy(&expected[start.min(end)..end]).into_owned(),
    })
}

/// True if every hash equals the first.
pub fn verify_hash_determinism(hashes: &[String]) -> bool {
    hashes.windows(2).all(|w| w[0] == w[1])
}

/// Compute BLAKE3 hash of data.
pub fn compute_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Panics unless `generate_fn` is deterministic over `runs` runs.
pub fn assert_deterministic<F>(runs: usize, generate_fn: F)
where
    F: Fn() -> Vec<u8>,
{
    verify_determinism(&generate_fn, runs).assert_deterministic();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_identical_outputs() {
        let result = verify_determinism(|| b"verse chorus outro".to_vec(), 3);
        assert!(result.is_deterministic);
        assert_eq!(result.output_size, 18);
        assert_eq!(result.hash, compute_hash(b"verse chorus outro"));
    }

    #[test]
    fn test_detects_changed_byte() {
        let calls = Cell::new(0u8);
        let result = verify_determinism(
            || {
                calls.set(calls.get() + 1);
                vec![1, 2, calls.get()]
            },
            2,
        );
        assert!(!result.is_deterministic);
        let diff = result.diff_info.unwrap();
        assert_eq!(diff.offset, 2);
        assert_eq!(diff.expected, Some(1));
        assert_eq!(diff.actual, Some(2));
        assert_eq!(diff.run_index, 1);
    }

    #[test]
    fn test_detects_length_change() {
        let diff = find_first_difference(b"abc", b"abcd", 4).unwrap();
        assert_eq!(diff.offset, 3);
        assert_eq!(diff.expected, None);
        assert_eq!(diff.actual, Some(b'd'));
        assert!(diff.to_string().contains("end of output"));
    }

    #[test]
    fn test_hash_determinism() {
        let h = compute_hash(b"x");
        assert!(verify_hash_determinism(&[h.clone(), h.clone()]));
        assert!(!verify_hash_determinism(&[h, compute_hash(b"y")]));
        assert!(verify_hash_determinism(&[]));
    }

    #[test]
    #[should_panic(expected = "Non-deterministic output detected")]
    fn test_assert_deterministic_panics() {
        let calls = Cell::new(0u8);
        assert_deterministic(2, || {
            calls.set(calls.get() + 1);
            vec![calls.get()]
        });
    }
}
