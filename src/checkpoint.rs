//! # Checkpoint — Resumable Watermark + Term-Table Snapshot
//!
//! Spec §6 mandates a plain-ASCII wire format: `watermark=<u64>` on the
//! first line, `termCount=<u32>` on the second, then one surviving term per
//! line. This keeps the teacher's atomic-write-plus-rotation idiom (temp
//! file + rename, up to [`GENERATIONS`] rotated backups so a crash mid-write
//! never leaves the operator without a usable checkpoint) but drops its
//! JSON envelope and SHA-256 integrity check: a truncated or malformed
//! plain-text checkpoint fails the `termCount` line count instead, which is
//! enough to detect it and fall back a generation.
//!
//! Term keys have no type tag in the file itself — parsing needs the
//! resuming family's [`TermKeyShape`] to know whether a line is one number
//! or two.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SieveError;
use crate::family::{TermKey, TermKeyShape};

/// Number of backup generations to keep.
const GENERATIONS: usize = 3;

pub struct CheckpointData {
    pub watermark: u64,
    pub alive_terms: Vec<TermKey>,
}

/// Return the path for generation `gen` (0 = current, 1 = .1, 2 = .2, ...).
fn generation_path(base: &Path, gen: usize) -> PathBuf {
    if gen == 0 {
        base.to_path_buf()
    } else {
        let mut p = base.as_os_str().to_os_string();
        p.push(format!(".{gen}"));
        PathBuf::from(p)
    }
}

/// Save a checkpoint with rotating generations (current → .1 → .2, oldest
/// discarded), written atomically via a `.tmp` file plus rename.
pub fn save(path: &Path, data: &CheckpointData) -> Result<(), SieveError> {
    for gen in (1..GENERATIONS).rev() {
        let src = generation_path(path, gen - 1);
        let dst = generation_path(path, gen);
        if src.exists() {
            let _ = fs::rename(&src, &dst);
        }
    }

    let mut out = String::with_capacity(32 + data.alive_terms.len() * 12);
    out.push_str(&format!("watermark={}\n", data.watermark));
    out.push_str(&format!("termCount={}\n", data.alive_terms.len()));
    for key in &data.alive_terms {
        out.push_str(&key.to_string());
        out.push('\n');
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &out)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the newest checkpoint generation that parses cleanly, falling back
/// to older generations if the current one is truncated or malformed.
pub fn load(path: &Path, shape: TermKeyShape) -> Option<CheckpointData> {
    for gen in 0..GENERATIONS {
        let p = generation_path(path, gen);
        if let Some(data) = load_single(&p, shape) {
            if gen > 0 {
                tracing::warn!(generation = gen, path = %p.display(), "recovered checkpoint from older generation");
            }
            return Some(data);
        }
    }
    None
}

fn load_single(path: &Path, shape: TermKeyShape) -> Option<CheckpointData> {
    let raw = fs::read_to_string(path).ok()?;
    let mut lines = raw.lines();
    let watermark: u64 = lines.next()?.strip_prefix("watermark=")?.parse().ok()?;
    let term_count: usize = lines.next()?.strip_prefix("termCount=")?.parse().ok()?;

    let mut alive_terms = Vec::with_capacity(term_count);
    for line in lines {
        if line.is_empty() {
            continue;
        }
        alive_terms.push(parse_term_key(line, shape)?);
    }
    if alive_terms.len() != term_count {
        tracing::warn!(path = %path.display(), expected = term_count, found = alive_terms.len(), "checkpoint termCount mismatch, treating as corrupt");
        return None;
    }
    Some(CheckpointData { watermark, alive_terms })
}

fn parse_term_key(line: &str, shape: TermKeyShape) -> Option<TermKey> {
    match shape {
        TermKeyShape::N => line.parse().ok().map(TermKey::N),
        TermKeyShape::K => line.parse().ok().map(TermKey::K),
        TermKeyShape::NC => {
            let (a, b) = line.split_once(',')?;
            Some(TermKey::NC(a.parse().ok()?, b.parse().ok()?))
        }
        TermKeyShape::KN => {
            let (a, b) = line.split_once(',')?;
            Some(TermKey::KN(a.parse().ok()?, b.parse().ok()?))
        }
    }
}

/// Clear all checkpoint files (current + all generations + any leftover
/// `.tmp`), used when starting a fresh run rather than resuming.
pub fn clear(path: &Path) {
    for gen in 0..GENERATIONS {
        let _ = fs::remove_file(generation_path(path, gen));
    }
    let _ = fs::remove_file(path.with_extension("tmp"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_load_roundtrip_k_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sieve.checkpoint");
        let data = CheckpointData { watermark: 12_345, alive_terms: vec![TermKey::K(1), TermKey::K(7), TermKey::K(900)] };
        save(&path, &data).unwrap();
        let loaded = load(&path, TermKeyShape::K).unwrap();
        assert_eq!(loaded.watermark, 12_345);
        assert_eq!(loaded.alive_terms, data.alive_terms);
    }

    #[test]
    fn save_load_roundtrip_nc_shape_with_negative_c() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sieve.checkpoint");
        let data = CheckpointData { watermark: 42, alive_terms: vec![TermKey::NC(10, -8), TermKey::NC(10, 3)] };
        save(&path, &data).unwrap();
        let loaded = load(&path, TermKeyShape::NC).unwrap();
        assert_eq!(loaded.alive_terms, data.alive_terms);
    }

    #[test]
    fn wire_format_matches_spec_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sieve.checkpoint");
        let data = CheckpointData { watermark: 7, alive_terms: vec![TermKey::N(3)] };
        save(&path, &data).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(lines.next(), Some("watermark=7"));
        assert_eq!(lines.next(), Some("termCount=1"));
        assert_eq!(lines.next(), Some("3"));
    }

    #[test]
    fn rotation_keeps_previous_generation_on_second_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sieve.checkpoint");
        save(&path, &CheckpointData { watermark: 1, alive_terms: vec![TermKey::K(1)] }).unwrap();
        save(&path, &CheckpointData { watermark: 2, alive_terms: vec![TermKey::K(1)] }).unwrap();
        assert!(generation_path(&path, 1).exists());
        let loaded = load(&path, TermKeyShape::K).unwrap();
        assert_eq!(loaded.watermark, 2);
    }

    #[test]
    fn corrupt_termcount_falls_back_to_older_generation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sieve.checkpoint");
        save(&path, &CheckpointData { watermark: 1, alive_terms: vec![TermKey::K(5)] }).unwrap();
        save(&path, &CheckpointData { watermark: 2, alive_terms: vec![TermKey::K(5)] }).unwrap();
        fs::write(&path, "watermark=3\ntermCount=5\n5\n").unwrap();
        let loaded = load(&path, TermKeyShape::K).unwrap();
        assert_eq!(loaded.watermark, 2);
    }

    #[test]
    fn clear_removes_all_generations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sieve.checkpoint");
        save(&path, &CheckpointData { watermark: 1, alive_terms: vec![] }).unwrap();
        save(&path, &CheckpointData { watermark: 2, alive_terms: vec![] }).unwrap();
        clear(&path);
        assert!(!path.exists());
        assert!(!generation_path(&path, 1).exists());
    }

    #[test]
    fn missing_checkpoint_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        assert!(load(&path, TermKeyShape::K).is_none());
    }
}
