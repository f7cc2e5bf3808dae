use std::f32::consts::{PI, TAU};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::error::WigError;
use crate::strand::RootPoint;

/// Root points on disk, either as explicit points or as the two vertex
/// attribute arrays of a mesh.
#[derive(Clone, Debug, Deserialize)]
pub struct RootDocument {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    layout: RootLayout,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RootLayout {
    Points {
        points: Vec<RootPoint>,
    },
    Mesh {
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
    },
}

impl RootDocument {
    /// Load a root document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open roots file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Deserialize a root document from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("invalid roots json")
    }

    pub fn into_roots(self) -> Result<Vec<RootPoint>> {
        let roots = match self.layout {
            RootLayout::Points { points } => points,
            RootLayout::Mesh { positions, normals } => {
                ensure!(
                    positions.len() == normals.len(),
                    WigError::MeshAttributeMismatch {
                        positions: positions.len(),
                        normals: normals.len(),
                    }
                );
                positions
                    .into_iter()
                    .zip(normals)
                    .map(|(position, normal)| RootPoint::new(position, normal))
                    .collect()
            }
        };
        ensure!(!roots.is_empty(), WigError::EmptyRoots);
        Ok(roots)
    }
}

/// Where a wig gets its root points from.
#[derive(Clone, Debug, PartialEq)]
pub enum RootSource {
    File(PathBuf),
    Grid {
        columns: u32,
        rows: u32,
        spacing: f32,
    },
    Sphere {
        rings: u32,
        sectors: u32,
        radius: f32,
    },
    Scatter {
        count: u32,
        radius: f32,
        seed: u64,
    },
}

impl RootSource {
    pub fn load(&self) -> Result<Vec<RootPoint>> {
        let roots = match self {
            RootSource::File(path) => return RootDocument::load_from_path(path)?.into_roots(),
            RootSource::Grid {
                columns,
                rows,
                spacing,
            } => grid(*columns, *rows, *spacing),
            RootSource::Sphere {
                rings,
                sectors,
                radius,
            } => sphere(*rings, *sectors, *radius),
            RootSource::Scatter {
                count,
                radius,
                seed,
            } => scatter(*count, *radius, *seed),
        };
        ensure!(!roots.is_empty(), WigError::EmptyRoots);
        Ok(roots)
    }
}

/// Flat patch in the XZ plane centred on the origin, growing along +Y.
pub fn grid(columns: u32, rows: u32, spacing: f32) -> Vec<RootPoint> {
    let half_x = (columns.saturating_sub(1)) as f32 * spacing * 0.5;
    let half_z = (rows.saturating_sub(1)) as f32 * spacing * 0.5;
    let mut roots = Vec::with_capacity(grid_capacity(columns, rows));
    for z in 0..rows {
        for x in 0..columns {
            let position = Vec3::new(x as f32 * spacing - half_x, 0.0, z as f32 * spacing - half_z);
            roots.push(RootPoint::new(position, Vec3::Y));
        }
    }
    roots
}

fn grid_capacity(columns: u32, rows: u32) -> usize {
    columns as usize * rows as usize
}

/// UV sphere with outward normals: both poles plus `rings - 1` latitude
/// rings of `sectors` points each.
pub fn sphere(rings: u32, sectors: u32, radius: f32) -> Vec<RootPoint> {
    if rings < 2 || sectors == 0 {
        return Vec::new();
    }
    let mut roots = Vec::with_capacity((rings as usize - 1) * sectors as usize + 2);
    roots.push(RootPoint::new(Vec3::Y * radius, Vec3::Y));
    for ring in 1..rings {
        let theta = PI * ring as f32 / rings as f32;
        for sector in 0..sectors {
            let phi = TAU * sector as f32 / sectors as f32;
            let normal = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            roots.push(RootPoint::new(normal * radius, normal));
        }
    }
    roots.push(RootPoint::new(Vec3::NEG_Y * radius, Vec3::NEG_Y));
    roots
}

/// `count` points spread uniformly over a sphere, reproducible per `seed`.
pub fn scatter(count: u32, radius: f32, seed: u64) -> Vec<RootPoint> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let z: f32 = rng.gen_range(-1.0..=1.0);
            let phi: f32 = rng.gen_range(0.0..TAU);
            let r = (1.0 - z * z).max(0.0).sqrt();
            let normal = Vec3::new(r * phi.cos(), r * phi.sin(), z);
            RootPoint::new(normal * radius, normal)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_roots_deserialize() {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let roots_dir = manifest_dir.join("testdata/roots");
        for (name, expected) in [("tetra.json", 4), ("pair.json", 2)] {
            let path = roots_dir.join(name);
            let roots = RootSource::File(path.clone())
                .load()
                .unwrap_or_else(|err| panic!("failed to load {:?}: {}", path, err));
            assert_eq!(roots.len(), expected, "root count for {:?}", path);
        }
    }

    #[test]
    fn mesh_layout_requires_matching_attributes() {
        let json = r#"{"positions": [[0, 0, 0], [1, 0, 0]], "normals": [[0, 1, 0]]}"#;
        let err = RootDocument::from_reader(json.as_bytes())
            .expect("document parses")
            .into_roots()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<WigError>(),
            Some(&WigError::MeshAttributeMismatch {
                positions: 2,
                normals: 1
            })
        );
    }

    #[test]
    fn empty_point_list_is_rejected() {
        let err = RootDocument::from_reader(r#"{"points": []}"#.as_bytes())
            .expect("document parses")
            .into_roots()
            .unwrap_err();
        assert_eq!(err.downcast_ref::<WigError>(), Some(&WigError::EmptyRoots));
    }

    #[test]
    fn grid_is_centred() {
        let roots = grid(3, 2, 0.5);
        assert_eq!(roots.len(), 6);
        assert_eq!(roots[0].position, Vec3::new(-0.5, 0.0, -0.25));
        assert_eq!(roots[5].position, Vec3::new(0.5, 0.0, 0.25));
        assert!(roots.iter().all(|root| root.normal == Vec3::Y));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn grid_capacity_is_computed_past_u32() {
        assert_eq!(grid_capacity(70_000, 70_000), 4_900_000_000);
        assert!(grid(70_000, 0, 0.1).is_empty());
    }

    #[test]
    fn sphere_normals_point_outward() {
        let roots = sphere(6, 8, 2.0);
        assert_eq!(roots.len(), 5 * 8 + 2);
        for root in &roots {
            assert!((root.position.length() - 2.0).abs() < 1e-5);
            assert!((root.position.normalize() - root.normal).length() < 1e-5);
        }
    }

    #[test]
    fn scatter_is_reproducible() {
        assert_eq!(scatter(32, 1.0, 9), scatter(32, 1.0, 9));
        assert_ne!(scatter(32, 1.0, 9), scatter(32, 1.0, 10));
        assert!(scatter(32, 1.5, 9)
            .iter()
            .all(|root| (root.position.length() - 1.5).abs() < 1e-4));
    }
}
