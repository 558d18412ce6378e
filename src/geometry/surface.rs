// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Surface primitives and their affine transforms
//!
//! Every surface is stored in an implicit form whose sense convention is
//! f(x, y, z) < 0 on the negative side. Typed primitives (planes, spheres,
//! cylinders, cones, tori) keep their defining parameters; anything that a
//! rotation knocks off the coordinate axes degrades to a general quadric,
//! except the torus, which has no quadric form.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::region::Region;

/// Slack when deciding whether a rotated axis still lies on a coordinate axis.
const AXIS_ALIGNMENT_TOLERANCE: f64 = 1e-9;

/// Coordinate axis of an axis-aligned primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Component index into a coordinate triple.
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Indices of the two transverse components, in coordinate order.
    pub const fn transverse(self) -> [usize; 2] {
        match self {
            Axis::X => [1, 2],
            Axis::Y => [0, 2],
            Axis::Z => [0, 1],
        }
    }

    /// Unit vector along the axis.
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

/// Particle behavior at a surface crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    Transmission,
    Reflective,
    Vacuum,
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary::Transmission
    }
}

/// Macrobody expansion: member surfaces plus the region naming its interior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSurface {
    /// Ids of the member surfaces, in expansion order.
    pub components: Vec<u32>,
    /// Interior volume expressed over the member surfaces.
    pub interior: Region,
}

/// Geometric form of a surface.
///
/// Quadric coefficients follow the order
/// `a x^2 + b y^2 + c z^2 + d xy + e yz + f zx + g x + h y + j z + k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// General plane `a x + b y + c z = d`.
    Plane { a: f64, b: f64, c: f64, d: f64 },
    /// Plane perpendicular to a coordinate axis at the given offset.
    AxisPlane { axis: Axis, offset: f64 },
    Sphere {
        center: Vector3<f64>,
        radius: f64,
    },
    /// Infinite circular cylinder parallel to a coordinate axis. The stored
    /// center always has a zero component along the axis.
    Cylinder {
        axis: Axis,
        center: Vector3<f64>,
        radius: f64,
    },
    /// Two-sided cone opening along a coordinate axis; `r2` is the squared
    /// slope of the lateral surface.
    Cone {
        axis: Axis,
        apex: Vector3<f64>,
        r2: f64,
    },
    Quadric { coefficients: [f64; 10] },
    /// Axis-aligned torus with major radius `a` and ellipse half-axes `b`
    /// (along the axis) and `c` (radial).
    Torus {
        axis: Axis,
        center: Vector3<f64>,
        a: f64,
        b: f64,
        c: f64,
    },
    Composite(CompositeSurface),
}

/// Bucket key for surface deduplication. All plane forms share one class so
/// that candidate pairs are scanned together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SurfaceClass {
    Plane,
    Sphere,
    Cylinder(Axis),
    Cone(Axis),
    Quadric,
    Torus(Axis),
}

impl SurfaceKind {
    /// Cylinder with the center projected onto the transverse plane.
    pub fn cylinder(axis: Axis, center: Vector3<f64>, radius: f64) -> Self {
        let mut center = center;
        center[axis.index()] = 0.0;
        SurfaceKind::Cylinder {
            axis,
            center,
            radius,
        }
    }

    /// The surface displaced by `shift`.
    pub fn translated(&self, shift: &Vector3<f64>) -> Self {
        match self {
            SurfaceKind::Plane { a, b, c, d } => {
                let normal = Vector3::new(*a, *b, *c);
                SurfaceKind::Plane {
                    a: *a,
                    b: *b,
                    c: *c,
                    d: d + normal.dot(shift),
                }
            }
            SurfaceKind::AxisPlane { axis, offset } => SurfaceKind::AxisPlane {
                axis: *axis,
                offset: offset + shift[axis.index()],
            },
            SurfaceKind::Sphere { center, radius } => SurfaceKind::Sphere {
                center: center + shift,
                radius: *radius,
            },
            SurfaceKind::Cylinder {
                axis,
                center,
                radius,
            } => SurfaceKind::cylinder(*axis, center + shift, *radius),
            SurfaceKind::Cone { axis, apex, r2 } => SurfaceKind::Cone {
                axis: *axis,
                apex: apex + shift,
                r2: *r2,
            },
            SurfaceKind::Quadric { coefficients } => {
                let (quad, linear, constant) = quadric_parts(coefficients);
                let linear_shifted = linear - 2.0 * quad * shift;
                let constant_shifted = constant + (quad * shift).dot(shift) - linear.dot(shift);
                SurfaceKind::Quadric {
                    coefficients: quadric_coefficients(&quad, &linear_shifted, constant_shifted),
                }
            }
            SurfaceKind::Torus {
                axis,
                center,
                a,
                b,
                c,
            } => SurfaceKind::Torus {
                axis: *axis,
                center: center + shift,
                a: *a,
                b: *b,
                c: *c,
            },
            // Member surfaces are table entries and are displaced one by one.
            SurfaceKind::Composite(composite) => SurfaceKind::Composite(composite.clone()),
        }
    }

    /// The surface rotated by `rotation` about `pivot`. Returns `None` for a
    /// torus whose axis leaves the coordinate axes; every other form falls
    /// back to a general quadric.
    pub fn rotated(&self, rotation: &Matrix3<f64>, pivot: &Vector3<f64>) -> Option<Self> {
        let rotate_point = |point: &Vector3<f64>| rotation * (point - pivot) + pivot;
        match self {
            SurfaceKind::Plane { a, b, c, d } => {
                let (normal, plane_d) = rotate_plane(&Vector3::new(*a, *b, *c), *d, rotation, pivot);
                Some(SurfaceKind::Plane {
                    a: normal.x,
                    b: normal.y,
                    c: normal.z,
                    d: plane_d,
                })
            }
            SurfaceKind::AxisPlane { axis, offset } => {
                let (normal, plane_d) = rotate_plane(&axis.unit(), *offset, rotation, pivot);
                Some(SurfaceKind::Plane {
                    a: normal.x,
                    b: normal.y,
                    c: normal.z,
                    d: plane_d,
                })
            }
            SurfaceKind::Sphere { center, radius } => Some(SurfaceKind::Sphere {
                center: rotate_point(center),
                radius: *radius,
            }),
            SurfaceKind::Cylinder {
                axis,
                center,
                radius,
            } => match mapped_axis(rotation, *axis) {
                Some((new_axis, _)) => Some(SurfaceKind::cylinder(
                    new_axis,
                    rotate_point(center),
                    *radius,
                )),
                None => {
                    let coefficients = cylinder_quadric(*axis, center, *radius);
                    Some(SurfaceKind::Quadric {
                        coefficients: rotate_quadric(&coefficients, rotation, pivot),
                    })
                }
            },
            SurfaceKind::Cone { axis, apex, r2 } => match mapped_axis(rotation, *axis) {
                Some((new_axis, _)) => Some(SurfaceKind::Cone {
                    axis: new_axis,
                    apex: rotate_point(apex),
                    r2: *r2,
                }),
                None => {
                    let coefficients = cone_quadric(*axis, apex, *r2);
                    Some(SurfaceKind::Quadric {
                        coefficients: rotate_quadric(&coefficients, rotation, pivot),
                    })
                }
            },
            SurfaceKind::Quadric { coefficients } => Some(SurfaceKind::Quadric {
                coefficients: rotate_quadric(coefficients, rotation, pivot),
            }),
            SurfaceKind::Torus {
                axis,
                center,
                a,
                b,
                c,
            } => mapped_axis(rotation, *axis).map(|(new_axis, _)| SurfaceKind::Torus {
                axis: new_axis,
                center: rotate_point(center),
                a: *a,
                b: *b,
                c: *c,
            }),
            SurfaceKind::Composite(composite) => Some(SurfaceKind::Composite(composite.clone())),
        }
    }

    /// Retype a general plane as an axis plane when its normal is a
    /// bitwise-exact unit vector, as written by hand in decks.
    pub fn reduced(&self) -> Option<Self> {
        if let SurfaceKind::Plane { a, b, c, d } = self {
            let axis = match (*a, *b, *c) {
                (1.0, 0.0, 0.0) => Axis::X,
                (0.0, 1.0, 0.0) => Axis::Y,
                (0.0, 0.0, 1.0) => Axis::Z,
                _ => return None,
            };
            return Some(SurfaceKind::AxisPlane { axis, offset: *d });
        }
        None
    }

    /// Class bucket and coefficient vector used by duplicate detection.
    /// Composites do not participate.
    pub fn comparison_key(&self) -> Option<(SurfaceClass, Vec<f64>)> {
        match self {
            SurfaceKind::Plane { a, b, c, d } => Some((SurfaceClass::Plane, vec![*a, *b, *c, *d])),
            SurfaceKind::AxisPlane { offset, .. } => Some((SurfaceClass::Plane, vec![*offset])),
            SurfaceKind::Sphere { center, radius } => Some((
                SurfaceClass::Sphere,
                vec![center.x, center.y, center.z, *radius],
            )),
            SurfaceKind::Cylinder {
                axis,
                center,
                radius,
            } => {
                let [t0, t1] = axis.transverse();
                Some((
                    SurfaceClass::Cylinder(*axis),
                    vec![center[t0], center[t1], *radius],
                ))
            }
            SurfaceKind::Cone { axis, apex, r2 } => Some((
                SurfaceClass::Cone(*axis),
                vec![apex.x, apex.y, apex.z, *r2],
            )),
            SurfaceKind::Quadric { coefficients } => {
                Some((SurfaceClass::Quadric, coefficients.to_vec()))
            }
            SurfaceKind::Torus {
                axis,
                center,
                a,
                b,
                c,
            } => Some((
                SurfaceClass::Torus(*axis),
                vec![center.x, center.y, center.z, *a, *b, *c],
            )),
            SurfaceKind::Composite(_) => None,
        }
    }
}

/// A surface with its id and boundary condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub id: u32,
    pub boundary: Boundary,
    pub kind: SurfaceKind,
}

impl Surface {
    pub fn new(id: u32, kind: SurfaceKind) -> Self {
        Surface {
            id,
            boundary: Boundary::default(),
            kind,
        }
    }

    pub fn translate(&mut self, shift: &Vector3<f64>) {
        self.kind = self.kind.translated(shift);
    }

    pub fn rotate(
        &mut self,
        rotation: &Matrix3<f64>,
        pivot: &Vector3<f64>,
    ) -> crate::error::Result<()> {
        match self.kind.rotated(rotation, pivot) {
            Some(kind) => {
                self.kind = kind;
                Ok(())
            }
            None => Err(crate::error::ConvertError::unsupported(format!(
                "rotation of torus surface {} off the coordinate axes",
                self.id
            ))),
        }
    }
}

/// Split quadric coefficients into the symmetric matrix, linear vector and
/// constant of `x^T A x + b . x + k`.
fn quadric_parts(coefficients: &[f64; 10]) -> (Matrix3<f64>, Vector3<f64>, f64) {
    let [a, b, c, d, e, f, g, h, j, k] = *coefficients;
    let quad = Matrix3::new(
        a,
        d / 2.0,
        f / 2.0,
        d / 2.0,
        b,
        e / 2.0,
        f / 2.0,
        e / 2.0,
        c,
    );
    (quad, Vector3::new(g, h, j), k)
}

/// Reassemble the coefficient array from matrix form.
fn quadric_coefficients(quad: &Matrix3<f64>, linear: &Vector3<f64>, constant: f64) -> [f64; 10] {
    [
        quad[(0, 0)],
        quad[(1, 1)],
        quad[(2, 2)],
        2.0 * quad[(0, 1)],
        2.0 * quad[(1, 2)],
        2.0 * quad[(0, 2)],
        linear.x,
        linear.y,
        linear.z,
        constant,
    ]
}

/// Quadric coefficients of an axis-aligned cylinder.
fn cylinder_quadric(axis: Axis, center: &Vector3<f64>, radius: f64) -> [f64; 10] {
    let unit = axis.unit();
    let quad = Matrix3::identity() - unit * unit.transpose();
    let linear = -2.0 * quad * center;
    let constant = (quad * center).dot(center) - radius * radius;
    quadric_coefficients(&quad, &linear, constant)
}

/// Quadric coefficients of an axis-aligned two-sided cone.
fn cone_quadric(axis: Axis, apex: &Vector3<f64>, r2: f64) -> [f64; 10] {
    let unit = axis.unit();
    let quad = Matrix3::identity() - (1.0 + r2) * unit * unit.transpose();
    let linear = -2.0 * quad * apex;
    let constant = (quad * apex).dot(apex);
    quadric_coefficients(&quad, &linear, constant)
}

/// Rotate a quadric about `pivot`. Substituting the inverse motion
/// `x = R^T x' + t` with `t = p - R^T p` keeps the implicit form exact.
fn rotate_quadric(
    coefficients: &[f64; 10],
    rotation: &Matrix3<f64>,
    pivot: &Vector3<f64>,
) -> [f64; 10] {
    let (quad, linear, constant) = quadric_parts(coefficients);
    let back = rotation.transpose() * pivot;
    let t = pivot - back;
    let quad_rotated = rotation * quad * rotation.transpose();
    let linear_rotated = rotation * (2.0 * quad * t + linear);
    let constant_rotated = (quad * t).dot(&t) + linear.dot(&t) + constant;
    quadric_coefficients(&quad_rotated, &linear_rotated, constant_rotated)
}

/// Rotate the plane `n . x = d` about `pivot`.
fn rotate_plane(
    normal: &Vector3<f64>,
    d: f64,
    rotation: &Matrix3<f64>,
    pivot: &Vector3<f64>,
) -> (Vector3<f64>, f64) {
    let rotated = rotation * normal;
    (rotated, d - normal.dot(pivot) + rotated.dot(pivot))
}

/// The coordinate axis (with sign) that `rotation` carries `axis` onto, if
/// the image still lies on one.
fn mapped_axis(rotation: &Matrix3<f64>, axis: Axis) -> Option<(Axis, f64)> {
    let image = rotation * axis.unit();
    for candidate in [Axis::X, Axis::Y, Axis::Z] {
        for sign in [1.0, -1.0] {
            if (image - sign * candidate.unit()).norm() < AXIS_ALIGNMENT_TOLERANCE {
                return Some((candidate, sign));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_relative_eq, relative_eq};
    use nalgebra::Rotation3;
    use std::f64::consts::FRAC_PI_2;

    fn evaluate_quadric(coefficients: &[f64; 10], point: &Vector3<f64>) -> f64 {
        let (quad, linear, constant) = quadric_parts(coefficients);
        (quad * point).dot(point) + linear.dot(point) + constant
    }

    #[test]
    fn test_translated_quadric() {
        // Unit sphere at the origin shifted to x = 1.
        let sphere = SurfaceKind::Quadric {
            coefficients: [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0],
        };
        let shifted = sphere.translated(&Vector3::new(1.0, 0.0, 0.0));
        let SurfaceKind::Quadric { coefficients } = shifted else {
            panic!("expected quadric");
        };
        let expected = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0, 0.0];
        for (got, want) in coefficients.iter().zip(expected.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cylinder_rotation_between_axes() {
        let cylinder = SurfaceKind::cylinder(Axis::Z, Vector3::new(1.0, 2.0, 0.0), 0.5);
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2).into_inner();
        let rotated = cylinder.rotated(&rotation, &Vector3::zeros()).unwrap();
        let SurfaceKind::Cylinder {
            axis,
            center,
            radius,
        } = rotated
        else {
            panic!("expected cylinder, got {rotated:?}");
        };
        assert_eq!(axis, Axis::Y);
        assert_relative_eq!(center, Vector3::new(1.0, 0.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(radius, 0.5);
    }

    #[test]
    fn test_cylinder_rotation_off_axis() {
        let cylinder = SurfaceKind::cylinder(Axis::Z, Vector3::zeros(), 1.0);
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.25).into_inner();
        let rotated = cylinder.rotated(&rotation, &Vector3::zeros()).unwrap();
        let SurfaceKind::Quadric { coefficients } = rotated else {
            panic!("expected quadric, got {rotated:?}");
        };
        // A point on the original cylinder must land on the rotated surface.
        let moved = rotation * Vector3::new(1.0, 0.0, 3.0);
        assert_relative_eq!(
            evaluate_quadric(&coefficients, &moved),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_cone_rotation_off_axis() {
        let cone = SurfaceKind::Cone {
            axis: Axis::Z,
            apex: Vector3::new(0.0, 0.0, 1.0),
            r2: 1.0,
        };
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), 0.7).into_inner();
        let pivot = Vector3::new(1.0, 0.0, 0.0);
        let rotated = cone.rotated(&rotation, &pivot).unwrap();
        let SurfaceKind::Quadric { coefficients } = rotated else {
            panic!("expected quadric, got {rotated:?}");
        };
        // (2, 0, 3) satisfies x^2 + y^2 = (z - 1)^2.
        let moved = rotation * (Vector3::new(2.0, 0.0, 3.0) - pivot) + pivot;
        assert_relative_eq!(
            evaluate_quadric(&coefficients, &moved),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_axis_plane_rotation_becomes_plane() {
        let plane = SurfaceKind::AxisPlane {
            axis: Axis::X,
            offset: 2.0,
        };
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2).into_inner();
        let rotated = plane.rotated(&rotation, &Vector3::zeros()).unwrap();
        let SurfaceKind::Plane { a, b, c, d } = rotated else {
            panic!("expected plane, got {rotated:?}");
        };
        assert_relative_eq!(a, 0.0, epsilon = 1e-12);
        assert_relative_eq!(b, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c, 0.0, epsilon = 1e-12);
        assert_relative_eq!(d, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_rotation_about_pivot() {
        let sphere = SurfaceKind::Sphere {
            center: Vector3::new(2.0, 0.0, 0.0),
            radius: 1.0,
        };
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2).into_inner();
        let pivot = Vector3::new(1.0, 0.0, 0.0);
        let rotated = sphere.rotated(&rotation, &pivot).unwrap();
        let SurfaceKind::Sphere { center, radius } = rotated else {
            panic!("expected sphere");
        };
        assert_relative_eq!(center, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(radius, 1.0);
    }

    #[test]
    fn test_torus_off_axis_rotation_fails() {
        let torus = SurfaceKind::Torus {
            axis: Axis::Z,
            center: Vector3::zeros(),
            a: 5.0,
            b: 1.0,
            c: 1.0,
        };
        let tilt = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.3).into_inner();
        assert!(torus.rotated(&tilt, &Vector3::zeros()).is_none());

        let quarter = Rotation3::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2).into_inner();
        let rotated = torus.rotated(&quarter, &Vector3::zeros()).unwrap();
        assert!(matches!(rotated, SurfaceKind::Torus { axis: Axis::Y, .. }));
    }

    #[test]
    fn test_reduced_retypes_exact_unit_planes() {
        let plane = SurfaceKind::Plane {
            a: 0.0,
            b: 0.0,
            c: 1.0,
            d: -3.0,
        };
        assert_eq!(
            plane.reduced(),
            Some(SurfaceKind::AxisPlane {
                axis: Axis::Z,
                offset: -3.0
            })
        );
        let skew = SurfaceKind::Plane {
            a: 0.999_999,
            b: 0.0,
            c: 0.0,
            d: 1.0,
        };
        assert_eq!(skew.reduced(), None);
    }

    #[test]
    fn test_comparison_keys() {
        let cylinder = SurfaceKind::cylinder(Axis::Y, Vector3::new(1.0, 9.0, 2.0), 3.0);
        let (class, coeffs) = cylinder.comparison_key().unwrap();
        assert_eq!(class, SurfaceClass::Cylinder(Axis::Y));
        assert!(coeffs
            .iter()
            .zip([1.0, 2.0, 3.0].iter())
            .all(|(a, b)| relative_eq!(a, b)));

        let composite = SurfaceKind::Composite(CompositeSurface {
            components: vec![1, 2],
            interior: Region::halfspace(-1),
        });
        assert!(composite.comparison_key().is_none());
    }
}
