//! Mesh-Puffer der Szene-Objekte.
//!
//! Das Vertex-Layout ist `bytemuck::Pod`, damit der Host die Puffer ohne
//! Kopie auf die GPU laden kann. Pro Material entsteht genau ein `MeshPart`.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use indexmap::IndexMap;

use crate::shared::spline_geometry::safe_normalize;

/// GPU-Vertex: Position, Normale, UV.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Dreiecksliste für genau ein Material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPart {
    pub material: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshPart {
    /// Vertex-Puffer als Byte-Slice (GPU-Upload).
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index-Puffer als Byte-Slice (GPU-Upload).
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Eine Detailstufe eines Objekts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LodMesh {
    /// 0 = höchste Auflösung
    pub level: u8,
    pub parts: Vec<MeshPart>,
}

impl LodMesh {
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(MeshPart::triangle_count).sum()
    }

    /// Alle Vertex-Positionen aller Materialien.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.parts
            .iter()
            .flat_map(|p| p.vertices.iter().map(|v| Vec3::from_array(v.position)))
    }
}

/// Sammelt Dreiecke und packt sie pro Material.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    parts: IndexMap<String, MeshPart>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.values().all(|p| p.indices.is_empty())
    }

    fn part(&mut self, material: &str) -> &mut MeshPart {
        self.parts
            .entry(material.to_string())
            .or_insert_with(|| MeshPart {
                material: material.to_string(),
                ..Default::default()
            })
    }

    /// Viereck `a → b → c → d` (a/b vorne links/rechts, d/c hinten links/rechts).
    ///
    /// Die Normale ergibt sich aus `(d - a) × (b - a)`; bei einer Fahrbahn mit
    /// a/b quer zur Fahrtrichtung zeigt sie nach oben.
    pub fn add_quad(&mut self, material: &str, corners: [Vec3; 4], uv: [[f32; 2]; 4]) {
        let [a, b, c, d] = corners;
        let mut normal = safe_normalize((d - a).cross(b - a));
        if normal == Vec3::ZERO {
            normal = safe_normalize((c - b).cross(a - b));
        }
        if normal == Vec3::ZERO {
            return;
        }
        let part = self.part(material);
        let base = part.vertices.len() as u32;
        for (position, uv) in corners.iter().zip(uv) {
            part.vertices.push(Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
                uv,
            });
        }
        part.indices
            .extend_from_slice(&[base, base + 3, base + 1, base + 1, base + 3, base + 2]);
    }

    /// Wie [`MeshBuilder::add_quad`], richtet die Normale aber nach `facing` aus.
    pub fn add_quad_facing(
        &mut self,
        material: &str,
        corners: [Vec3; 4],
        uv: [[f32; 2]; 4],
        facing: Vec3,
    ) {
        let [a, b, c, d] = corners;
        if (d - a).cross(b - a).dot(facing) < 0.0 {
            self.add_quad(material, [b, a, d, c], [uv[1], uv[0], uv[3], uv[2]]);
        } else {
            self.add_quad(material, corners, uv);
        }
    }

    /// Dreiecksfächer um `center` über den Randpunkten `rim` (geschlossen).
    pub fn add_fan(&mut self, material: &str, center: Vec3, rim: &[Vec3]) {
        if rim.len() < 3 {
            return;
        }
        let part = self.part(material);
        let base = part.vertices.len() as u32;
        part.vertices.push(Vertex {
            position: center.to_array(),
            normal: Vec3::Y.to_array(),
            uv: [0.5, 0.5],
        });
        for p in rim {
            let offset = *p - center;
            part.vertices.push(Vertex {
                position: p.to_array(),
                normal: Vec3::Y.to_array(),
                uv: [offset.x * 0.1 + 0.5, offset.z * 0.1 + 0.5],
            });
        }
        let count = rim.len() as u32;
        for i in 0..count {
            let current = base + 1 + i;
            let next = base + 1 + (i + 1) % count;
            part.indices.extend_from_slice(&[base, next, current]);
        }
    }

    /// Liefert die gepackten Teile in Einfüge-Reihenfolge der Materialien.
    pub fn finish(self) -> Vec<MeshPart> {
        self.parts
            .into_values()
            .filter(|p| !p.indices.is_empty())
            .collect()
    }
}
