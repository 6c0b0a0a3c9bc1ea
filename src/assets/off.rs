//! OFF Mesh Reader
//!
//! Reads the Object File Format used by the mesh viewer:
//!
//! ```text
//! OFF                 # header: OFF, NOFF or COFF
//! 4 2 0               # vertex count, face count, edge count (optional)
//! 0 0 0               # one vertex per line, >= 3 numbers, extras ignored
//! 1 0 0
//! 1 1 0
//! 0 1 0
//! 3 0 1 2             # valence followed by that many indices
//! 3 0 2 3
//! ```
//!
//! Blank lines and `#` comments are skipped anywhere. Faces with more than
//! three vertices are fan-triangulated around their first vertex.

use std::path::Path;

use glam::Vec3;

use crate::errors::{EmberError, Result};

/// A triangle mesh read from an OFF file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl OffMesh {
    /// Reads and parses the file at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mesh = Self::parse(&text)?;
        log::info!(
            "Loaded {}: {} vertices, {} triangles",
            path.display(),
            mesh.positions.len(),
            mesh.triangles.len()
        );
        Ok(mesh)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, strip_comment(line)))
            .filter(|(_, line)| !line.is_empty());

        let (line_no, header) = lines.next().ok_or_else(|| parse_error(1, "empty file"))?;
        let mut header_tokens = header.split_whitespace();
        let keyword = header_tokens.next().unwrap_or_default();
        if !["OFF", "NOFF", "COFF"].iter().any(|k| keyword.starts_with(k)) {
            return Err(parse_error(
                line_no,
                format!("header should be OFF, NOFF or COFF, not {keyword:?}"),
            ));
        }

        // Counts may share the header line.
        let rest: Vec<&str> = header_tokens.collect();
        let (line_no, counts) = if rest.is_empty() {
            let (n, line) = lines.next().ok_or_else(|| parse_error(line_no, "missing counts"))?;
            (n, line.split_whitespace().collect())
        } else {
            (line_no, rest)
        };
        if counts.len() < 2 {
            return Err(parse_error(line_no, "expected vertex and face counts"));
        }
        let vertex_count: usize = parse_number(line_no, counts[0])?;
        let face_count: usize = parse_number(line_no, counts[1])?;

        // Counts come from the file, so they only bound the loops.
        let mut last_line = line_no;
        let mut positions = Vec::new();
        while positions.len() < vertex_count {
            let (line_no, line) = lines.next().ok_or_else(|| {
                parse_error(
                    last_line,
                    format!("expected {vertex_count} vertices, found {}", positions.len()),
                )
            })?;
            last_line = line_no;
            let coords = line
                .split_whitespace()
                .take(3)
                .map(|t| parse_number::<f32>(line_no, t))
                .collect::<Result<Vec<_>>>()?;
            if coords.len() < 3 {
                return Err(parse_error(line_no, "vertex needs at least 3 coordinates"));
            }
            positions.push(Vec3::new(coords[0], coords[1], coords[2]));
        }

        let mut triangles = Vec::new();
        for face in 0..face_count {
            let (line_no, line) = lines
                .next()
                .ok_or_else(|| parse_error(last_line, format!("expected {face_count} faces, found {face}")))?;
            last_line = line_no;
            let mut tokens = line.split_whitespace();
            let valence: usize = parse_number(line_no, tokens.next().unwrap_or_default())?;
            let indices = tokens
                .take(valence)
                .map(|t| parse_number::<u32>(line_no, t))
                .collect::<Result<Vec<_>>>()?;
            if indices.len() < valence {
                return Err(parse_error(
                    line_no,
                    format!("face lists {} of {valence} indices", indices.len()),
                ));
            }
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(parse_error(
                    line_no,
                    format!("index {bad} out of range for {vertex_count} vertices"),
                ));
            }
            if valence < 3 {
                log::warn!("OFF line {line_no}: skipping degenerate face of valence {valence}");
                continue;
            }
            triangles.extend(indices.windows(2).skip(1).map(|w| [indices[0], w[0], w[1]]));
        }

        Ok(Self {
            positions,
            triangles,
        })
    }

    /// Centers on the mean vertex and divides by the largest remaining
    /// absolute coordinate, fitting the mesh into `[-1, 1]³`.
    pub fn normalize(&mut self) {
        if self.positions.is_empty() {
            return;
        }
        let mean = self.positions.iter().copied().sum::<Vec3>() / self.positions.len() as f32;
        let extent = self
            .positions
            .iter()
            .map(|p| (*p - mean).abs().max_element())
            .fold(0.0f32, f32::max);
        let scale = if extent > 0.0 { 1.0 / extent } else { 1.0 };
        for p in &mut self.positions {
            *p = (*p - mean) * scale;
        }
    }

    /// Positions as a flat `x, y, z` array.
    #[must_use]
    pub fn vertex_data(&self) -> Vec<f32> {
        self.positions.iter().flat_map(|p| p.to_array()).collect()
    }

    /// Triangle indices as a flat list.
    #[must_use]
    pub fn indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

fn parse_error(line: usize, reason: impl Into<String>) -> EmberError {
    EmberError::OffParse {
        line,
        reason: reason.into(),
    }
}

fn parse_number<T: std::str::FromStr>(line: usize, token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid number {token:?}")))
}
