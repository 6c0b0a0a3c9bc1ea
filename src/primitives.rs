//! Built-in demo meshes.
//!
//! Vertices are interleaved `position: vec3f, color_or_normal: vec3f`
//! (24-byte stride), matching [`POSITION_COLOR`].

use wgpu::VertexFormat;

/// Attribute formats of every primitive here, for
/// [`VertexBufferLayout::packed`](crate::VertexBufferLayout::packed).
pub const POSITION_COLOR: [VertexFormat; 2] = [VertexFormat::Float32x3, VertexFormat::Float32x3];

/// Three axis lines from the origin, colored red/green/blue for x/y/z.
/// Draw as a line list of 6 vertices.
#[must_use]
pub fn gnomon(scale: f32) -> Vec<f32> {
    let s = scale;
    #[rustfmt::skip]
    let data = vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
        s,   0.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        0.0, s,   0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        0.0, 0.0, s,   0.0, 0.0, 1.0,
    ];
    data
}

/// Axis-aligned cube of half-extent `scale`: 24 vertices with face normals,
/// 36 indices.
#[must_use]
pub fn cube(scale: f32) -> (Vec<f32>, Vec<u16>) {
    let s = scale;
    #[rustfmt::skip]
    let vertices = vec![
         s,  s, -s,  1.0,  0.0,  0.0,
         s,  s,  s,  1.0,  0.0,  0.0,
         s, -s,  s,  1.0,  0.0,  0.0,
         s, -s, -s,  1.0,  0.0,  0.0,
        -s,  s,  s, -1.0,  0.0,  0.0,
        -s,  s, -s, -1.0,  0.0,  0.0,
        -s, -s, -s, -1.0,  0.0,  0.0,
        -s, -s,  s, -1.0,  0.0,  0.0,
        -s,  s,  s,  0.0,  1.0,  0.0,
         s,  s,  s,  0.0,  1.0,  0.0,
         s,  s, -s,  0.0,  1.0,  0.0,
        -s,  s, -s,  0.0,  1.0,  0.0,
        -s, -s, -s,  0.0, -1.0,  0.0,
         s, -s, -s,  0.0, -1.0,  0.0,
         s, -s,  s,  0.0, -1.0,  0.0,
        -s, -s,  s,  0.0, -1.0,  0.0,
         s,  s,  s,  0.0,  0.0,  1.0,
        -s,  s,  s,  0.0,  0.0,  1.0,
        -s, -s,  s,  0.0,  0.0,  1.0,
         s, -s,  s,  0.0,  0.0,  1.0,
        -s,  s, -s,  0.0,  0.0, -1.0,
         s,  s, -s,  0.0,  0.0, -1.0,
         s, -s, -s,  0.0,  0.0, -1.0,
        -s, -s, -s,  0.0,  0.0, -1.0,
    ];
    let indices = (0..6u16)
        .flat_map(|face| {
            let b = face * 4;
            [b, b + 1, b + 2, b, b + 2, b + 3]
        })
        .collect();
    (vertices, indices)
}
