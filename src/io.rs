//! # Io — Term-List and Factor-Log File Interfaces
//!
//! Spec §1 names file I/O for reading the initial term list and writing the
//! factor log as an external collaborator, not part of the sieve's core
//! engineering. This module stays thin accordingly: it loads
//! [`FamilyParameters`] from a JSON descriptor (reusing the family's own
//! `Serialize`/`Deserialize` derive rather than hand-rolling each family's
//! original ASCII header grammar) and appends factor records to the
//! plain-text log spec §6 describes.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::SieveError;
use crate::family::{FactorRecord, FamilyParameters, TermKey};

pub fn load_family_parameters(path: &Path) -> Result<FamilyParameters, SieveError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| SieveError::Domain(format!("malformed term-list descriptor {}: {e}", path.display())))
}

/// Render one factor as the spec §6 factor-log line: `p | expression(term)`.
pub fn format_factor_line(params: &FamilyParameters, record: &FactorRecord) -> String {
    format!("{} | {}", record.prime, expression(params, record))
}

fn expression(params: &FamilyParameters, record: &FactorRecord) -> String {
    match (params, record.term) {
        (FamilyParameters::MultiFactorial { multi, .. }, TermKey::N(n)) => {
            let sign = if record.sign_or_c < 0 { '-' } else { '+' };
            format!("{n}!{multi}{sign}1")
        }
        (FamilyParameters::AlternatingFactorial { .. }, TermKey::N(n)) => format!("af({n})"),
        (FamilyParameters::Smarandache { .. }, TermKey::N(n)) => format!("S({n})"),
        (FamilyParameters::FixedKBN { k, base, n, .. }, TermKey::NC(_, c)) => format!("{k}*{base}^{n}{c:+}"),
        (FamilyParameters::FixedBNC { base, n, .. }, TermKey::K(k)) => {
            let sign = if record.sign_or_c < 0 { '-' } else { '+' };
            format!("{k}*{base}^{n}{sign}1")
        }
        (FamilyParameters::DMDivisor { n, .. }, TermKey::K(k)) => format!("2*{k}*(2^{n}-1)+1"),
        (FamilyParameters::SierpinskiRiesel { .. }, TermKey::KN(k, n)) => {
            let sign = if record.sign_or_c < 0 { '-' } else { '+' };
            format!("{k}*2^{n}{sign}1")
        }
        (_, term) => format!("{term:?}"),
    }
}

/// Append-only factor log writer. Deduplication already happened in
/// `FactorSink`; this just serializes an already-sorted flushed batch.
pub fn append_factors(path: &Path, params: &FamilyParameters, records: &[FactorRecord]) -> Result<(), SieveError> {
    if records.is_empty() {
        return Ok(());
    }
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    for record in records {
        writeln!(file, "{}", format_factor_line(params, record))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn multi_factorial_expression_shows_sign() {
        let params = FamilyParameters::MultiFactorial { multi: 3, min_n: 1, max_n: 100, bases: vec![] };
        let rec = FactorRecord { prime: 7, term: TermKey::N(10), sign_or_c: -1 };
        assert_eq!(format_factor_line(&params, &rec), "7 | 10!3-1");
    }

    #[test]
    fn fixed_kbn_expression_embeds_c() {
        let params = FamilyParameters::FixedKBN { k: 3, base: 2, n: 10, min_c: -500, max_c: 500 };
        let rec = FactorRecord { prime: 11, term: TermKey::NC(10, -8), sign_or_c: -8 };
        assert_eq!(format_factor_line(&params, &rec), "11 | 3*2^10-8");
    }

    #[test]
    fn dm_divisor_expression() {
        let params = FamilyParameters::DMDivisor { n: 7, min_k: 1, max_k: 1000 };
        let rec = FactorRecord { prime: 13, term: TermKey::K(5), sign_or_c: 1 };
        assert_eq!(format_factor_line(&params, &rec), "13 | 2*5*(2^7-1)+1");
    }

    #[test]
    fn append_factors_is_append_only_across_calls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("factors.log");
        let params = FamilyParameters::DMDivisor { n: 7, min_k: 1, max_k: 1000 };
        let rec1 = FactorRecord { prime: 13, term: TermKey::K(5), sign_or_c: 1 };
        let rec2 = FactorRecord { prime: 17, term: TermKey::K(6), sign_or_c: 1 };
        append_factors(&path, &params, &[rec1]).unwrap();
        append_factors(&path, &params, &[rec2]).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn load_family_parameters_roundtrips_through_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("family.json");
        let params = FamilyParameters::DMDivisor { n: 31, min_k: 1, max_k: 5000 };
        fs::write(&path, serde_json::to_string(&params).unwrap()).unwrap();
        let loaded = load_family_parameters(&path).unwrap();
        assert_eq!(loaded.name(), "dm_divisor");
    }

    #[test]
    fn load_family_parameters_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("family.json");
        fs::write(&path, "not json").unwrap();
        assert!(load_family_parameters(&path).is_err());
    }
}
