//! Template primitives instanced by the indirect draw.
//!
//! The template mesh carries no real geometry: a single origin vertex for
//! point clouds, a unit segment for line swarms. The draw shader positions
//! every instance from the particle buffer, so the template only has to give
//! the rasterizer something to instance.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Topology of the instanced primitive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// One particle record per instance, drawn as a point.
    Points,
    /// Two particle records per instance, drawn as a segment.
    Lines,
}

impl PrimitiveKind {
    /// Particle records consumed per instance.
    pub fn vertices_per_instance(self) -> u32 {
        match self {
            PrimitiveKind::Points => 1,
            PrimitiveKind::Lines => 2,
        }
    }

    pub fn wgpu_topology(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveKind::Points => wgpu::PrimitiveTopology::PointList,
            PrimitiveKind::Lines => wgpu::PrimitiveTopology::LineList,
        }
    }
}

/// Template vertex: position plus an up normal, matching the draw shader's
/// vertex layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const fn new(position: [f32; 3]) -> Self {
        Self { position, normal: [0.0, 1.0, 0.0] }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// The base primitive handed to the render backend for instancing.
#[derive(Clone, Debug)]
pub struct PrimitiveMesh {
    kind: PrimitiveKind,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl PrimitiveMesh {
    /// Build the template for the given topology.
    pub fn new(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Points => Self {
                kind,
                vertices: vec![Vertex::new([0.0, 0.0, 0.0])],
                indices: vec![0],
            },
            PrimitiveKind::Lines => Self {
                kind,
                vertices: vec![Vertex::new([0.0, 0.0, 0.0]), Vertex::new([1.0, 0.0, 0.0])],
                indices: vec![0, 1],
            },
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Index count fed into the indirect draw arguments.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_template_is_a_single_origin_vertex() {
        let mesh = PrimitiveMesh::new(PrimitiveKind::Points);
        assert_eq!(mesh.index_count(), 1);
        assert_eq!(mesh.vertices().len(), 1);
        assert_eq!(mesh.vertices()[0].position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn line_template_is_a_unit_segment() {
        let mesh = PrimitiveMesh::new(PrimitiveKind::Lines);
        assert_eq!(mesh.index_count(), 2);
        assert_eq!(mesh.vertices()[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.indices(), &[0, 1]);
    }

    #[test]
    fn vertices_per_instance_matches_topology() {
        assert_eq!(PrimitiveKind::Points.vertices_per_instance(), 1);
        assert_eq!(PrimitiveKind::Lines.vertices_per_instance(), 2);
    }
}
