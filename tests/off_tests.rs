//! OFF Reader Tests
//!
//! Tests for:
//! - Reading an OFF file from disk
//! - Fan triangulation of mixed faces
//! - Normalization into the unit cube
//! - Feeding a parsed mesh into 16-bit index buffers

use std::io::Write;

use glam::Vec3;

use ember::{Buffer, Context, EmberError, OffMesh, RecordingBackend, indices_u16};

const PYRAMID: &str = "\
NOFF
# square pyramid
5 2 0

-1 0 -1
 1 0 -1
 1 0  1
-1 0  1
 0 2  0   # apex
4 0 1 2 3
3 0 1 4
";

#[test]
fn reads_from_disk() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("ember-off-{}.off", std::process::id()));
    std::fs::File::create(&path)?.write_all(PYRAMID.as_bytes())?;

    let mesh = OffMesh::read(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(mesh.positions.len(), 5);
    assert_eq!(mesh.positions[4], Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3], [0, 1, 4]]);
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = OffMesh::read("/definitely/not/here.off").unwrap_err();
    assert!(matches!(err, EmberError::IoError(_)));
}

#[test]
fn normalized_mesh_fits_the_unit_cube() {
    let mut mesh = OffMesh::parse(PYRAMID).unwrap();
    mesh.normalize();
    let extent = mesh
        .positions
        .iter()
        .map(|p| p.abs().max_element())
        .fold(0.0f32, f32::max);
    assert!((extent - 1.0).abs() < 1e-6);
    assert_eq!(mesh.triangles.len(), 3);
}

#[test]
fn parsed_mesh_uploads_as_uint16() {
    let ctx = Context::from_backend(RecordingBackend::new(
        64,
        64,
        wgpu::TextureFormat::Bgra8UnormSrgb,
    ));
    let mesh = OffMesh::parse(PYRAMID).unwrap();
    let indices = indices_u16(&mesh.indices()).unwrap();
    let index_buffer = Buffer::index(&ctx, Some("pyramid"), &indices).unwrap();
    let vertex_buffer = Buffer::vertex(&ctx, Some("pyramid"), &mesh.vertex_data()).unwrap();

    assert_eq!(index_buffer.requested_size(), 9 * 2);
    assert_eq!(index_buffer.size(), 20);
    assert_eq!(vertex_buffer.size(), 5 * 12);
}
