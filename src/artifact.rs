use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use dipole_sim::{ArtifactError, AsymptoticEstimate, Basis, CouplingArtifact};

/// Basis components closer than this are the same lattice.
const BASIS_TOLERANCE: f32 = 1e-6;

/// `J(∞)` cache as a small CSV file:
///
/// ```text
/// <J11(inf)>
/// basis, ax, ay, az, bx, by, bz
/// R, 1/R, N, J(R)
/// 10, 0.1, 312, 4.8731
/// ...
/// ```
///
/// The value and the basis line are read back; the table is a diagnostic of
/// the fit. A file without a basis line, or with a different basis, is
/// reported as [`ArtifactError::BasisMismatch`] and gets re-estimated.
pub struct CsvArtifact {
    path: PathBuf,
}

impl CsvArtifact {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn malformed(&self, what: String) -> ArtifactError {
        ArtifactError::Malformed(format!("{}: {what}", self.path.display()))
    }

    fn parse_basis(&self, line: &str) -> Result<Option<[f32; 6]>, ArtifactError> {
        let mut fields = line.split(',').map(str::trim);
        if fields.next() != Some("basis") {
            return Ok(None);
        }
        let values = fields
            .map(|f| f.parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| self.malformed(format!("bad basis line '{line}'")))?;
        let components: [f32; 6] = values
            .try_into()
            .map_err(|_| self.malformed(format!("basis line '{line}' needs 6 components")))?;
        Ok(Some(components))
    }
}

fn components(basis: &Basis) -> [f32; 6] {
    [
        basis.a.x, basis.a.y, basis.a.z, basis.b.x, basis.b.y, basis.b.z,
    ]
}

impl CouplingArtifact for CsvArtifact {
    fn load(&self, basis: &Basis) -> Result<Option<f64>, ArtifactError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut lines = text.lines();
        let first = lines
            .next()
            .ok_or_else(|| self.malformed("empty file".to_string()))?;
        let value: f64 = first
            .trim()
            .parse()
            .map_err(|_| self.malformed(format!("first line '{first}' is not a number")))?;
        if !value.is_finite() {
            return Err(self.malformed(format!("non-finite value {value}")));
        }

        let stored = match lines.next() {
            Some(line) => self.parse_basis(line)?,
            None => None,
        };
        let expected = components(basis);
        match stored {
            Some(c)
                if c.iter()
                    .zip(&expected)
                    .all(|(s, e)| (s - e).abs() <= BASIS_TOLERANCE) =>
            {
                Ok(Some(value))
            }
            Some(c) => Err(ArtifactError::BasisMismatch(format!(
                "{} holds basis {c:?}, wanted {expected:?}",
                self.path.display()
            ))),
            None => Err(ArtifactError::BasisMismatch(format!(
                "{} has no basis line",
                self.path.display()
            ))),
        }
    }

    fn store(&self, basis: &Basis, estimate: &AsymptoticEstimate) -> Result<(), ArtifactError> {
        let mut w = BufWriter::new(File::create(&self.path)?);
        writeln!(w, "{}", estimate.j_inf)?;
        let [ax, ay, az, bx, by, bz] = components(basis);
        writeln!(w, "basis, {ax}, {ay}, {az}, {bx}, {by}, {bz}")?;
        writeln!(w, "R, 1/R, N, J(R)")?;
        for s in &estimate.samples {
            writeln!(w, "{}, {}, {}, {}", s.radius, s.inv_radius, s.count, s.value)?;
        }
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dipole_sim::coupling::RadiusSample;
    use dipole_sim::geometry::{square, triangular, Vec3};
    use dipole_sim::{resolve_j_infinity, NullProgress};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rbm_{}_{name}", std::process::id()))
    }

    /// Only the chain `n·a` lies within `R = 300`, so estimating is cheap.
    fn chain() -> Basis {
        Basis::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1000.0, 0.0))
    }

    fn estimate() -> AsymptoticEstimate {
        AsymptoticEstimate {
            j_inf: 5.517_3,
            slope: -12.0,
            samples: vec![
                RadiusSample {
                    radius: 10,
                    inv_radius: 0.1,
                    count: 362,
                    value: 4.3,
                },
                RadiusSample {
                    radius: 20,
                    inv_radius: 0.05,
                    count: 1450,
                    value: 4.9,
                },
            ],
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let a = CsvArtifact::new(temp_path("missing.csv"));
        assert!(matches!(a.load(&triangular()), Ok(None)));
    }

    #[test]
    fn test_store_layout_and_reload() {
        let path = temp_path("store.csv");
        let a = CsvArtifact::new(&path);
        a.store(&square(), &estimate()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "5.5173");
        assert_eq!(lines[1], "basis, 1, 0, 0, 0, 1, 0");
        assert_eq!(lines[2], "R, 1/R, N, J(R)");
        assert_eq!(lines[3], "10, 0.1, 362, 4.3");
        assert_eq!(lines.len(), 5);

        assert_eq!(a.load(&square()).unwrap(), Some(5.5173));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_triangular_reloads_exactly() {
        let path = temp_path("triangular.csv");
        let a = CsvArtifact::new(&path);
        a.store(&triangular(), &estimate()).unwrap();
        assert_eq!(a.load(&triangular()).unwrap(), Some(5.5173));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_value_for_another_basis_is_not_reused() {
        let path = temp_path("other_basis.csv");
        let a = CsvArtifact::new(&path);
        a.store(&triangular(), &estimate()).unwrap();

        assert!(matches!(
            a.load(&square()),
            Err(ArtifactError::BasisMismatch(_))
        ));

        let j = resolve_j_infinity(&a, &chain(), false, &NullProgress).unwrap();
        assert!((j + 2.0 * 1.202_056_9).abs() < 2e-3);
        assert_eq!(a.load(&chain()).unwrap(), Some(j));
        assert!(matches!(
            a.load(&triangular()),
            Err(ArtifactError::BasisMismatch(_))
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_without_basis_line_is_stale() {
        let path = temp_path("legacy.csv");
        fs::write(&path, "5.5173\nR, 1/R, N, J(R)\n").unwrap();
        let a = CsvArtifact::new(&path);
        assert!(matches!(
            a.load(&triangular()),
            Err(ArtifactError::BasisMismatch(_))
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_garbage_is_malformed() {
        let path = temp_path("garbage.csv");
        fs::write(&path, "J = ?\n").unwrap();
        let a = CsvArtifact::new(&path);
        assert!(matches!(a.load(&square()), Err(ArtifactError::Malformed(_))));

        fs::write(&path, "5.5\nbasis, 1, 0, x\n").unwrap();
        assert!(matches!(a.load(&square()), Err(ArtifactError::Malformed(_))));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unwritable_artifact_still_resolves() {
        // Parent directory does not exist, so every store fails.
        let a = CsvArtifact::new(temp_path("no_such_dir").join("J_inf.csv"));
        let j = resolve_j_infinity(&a, &chain(), false, &NullProgress).unwrap();
        assert!((j + 2.0 * 1.202_056_9).abs() < 2e-3);
        assert!(matches!(a.load(&chain()), Ok(None)));
    }
}
