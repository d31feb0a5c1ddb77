/// Parametric surface tessellation over a UV domain
use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::geometry::{IndexedMesh, MeshBuilder, Triangle, Vertex, VertexLayout, RED};

/// A point of the UV domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uv {
    pub u: f64,
    pub v: f64,
}

impl Uv {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// A triangle of the UV domain, only alive while a mesh is being built
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTriangle {
    pub a: Uv,
    pub b: Uv,
    pub c: Uv,
}

impl UvTriangle {
    pub fn new(a: Uv, b: Uv, c: Uv) -> Self {
        Self { a, b, c }
    }

    fn corners(&self) -> [Uv; 3] {
        [self.a, self.b, self.c]
    }
}

/// Regular triangulation of the unit square: each cell is split into two triangles.
///
/// Winding is chosen so that `cross(dP/du, dP/dv)` surfaces face outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UvGrid {
    pub u_steps: usize,
    pub v_steps: usize,
}

impl UvGrid {
    pub fn new(u_steps: usize, v_steps: usize) -> Self {
        Self {
            u_steps: u_steps.max(1),
            v_steps: v_steps.max(1),
        }
    }

    pub fn triangles(&self) -> Vec<UvTriangle> {
        let mut triangles = Vec::with_capacity(self.u_steps * self.v_steps * 2);
        let du = 1.0 / self.u_steps as f64;
        let dv = 1.0 / self.v_steps as f64;

        for i in 0..self.u_steps {
            let u0 = i as f64 * du;
            let u1 = (i + 1) as f64 * du;
            for j in 0..self.v_steps {
                let v0 = j as f64 * dv;
                let v1 = (j + 1) as f64 * dv;

                triangles.push(UvTriangle::new(
                    Uv::new(u0, v0),
                    Uv::new(u1, v0),
                    Uv::new(u0, v1),
                ));
                triangles.push(UvTriangle::new(
                    Uv::new(u1, v0),
                    Uv::new(u1, v1),
                    Uv::new(u0, v1),
                ));
            }
        }

        triangles
    }
}

impl Default for UvGrid {
    fn default() -> Self {
        Self::new(18, 36)
    }
}

/// Build an indexed mesh from a UV triangulation.
///
/// `position` maps a domain point to 3D, `normal` receives the domain point and the
/// (already rounded) position. Every unique vertex is colored opaque red; callers that need
/// other colors recolor the result.
pub fn tessellate<P, N>(domain: &[UvTriangle], position: P, normal: N) -> IndexedMesh
where
    P: Fn(f64, f64) -> Point3<f32>,
    N: Fn(f64, f64, &Point3<f32>) -> Vector3<f32>,
{
    let mut builder =
        MeshBuilder::with_capacity(VertexLayout::PositionNormal, domain.len(), domain.len() * 3);

    for triangle in domain {
        let [a, b, c] = triangle.corners().map(|uv| {
            let p = position(uv.u, uv.v);
            let n = normal(uv.u, uv.v, &p);
            Vertex::from_parts(p, n)
        });
        builder.push_triangle(&Triangle::new(a, b, c), RED);
    }

    builder.finish()
}

/// Latitude in `[-pi/2, pi/2]`
fn alpha(u: f64) -> f64 {
    u * PI - PI / 2.0
}

/// Longitude in `[0, 2pi]`
fn beta(v: f64) -> f64 {
    v * 2.0 * PI
}

/// Point of an origin-centered sphere, computed in f64 and stored as f32
pub fn sphere_position(radius: f64, u: f64, v: f64) -> Point3<f32> {
    let (a, b) = (alpha(u), beta(v));
    Point3::new(
        (radius * a.cos() * b.cos()) as f32,
        (radius * a.sin()) as f32,
        (radius * a.cos() * b.sin()) as f32,
    )
}

/// UV sphere centered at the origin; normals are the normalized positions
pub fn sphere(radius: f32, grid: &UvGrid) -> IndexedMesh {
    let radius = f64::from(radius);
    tessellate(
        &grid.triangles(),
        |u, v| sphere_position(radius, u, v),
        |_, _, p| p.coords.normalize(),
    )
}
