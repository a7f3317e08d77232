use glam::{Affine3A, Mat3A, Quat, Vec3A};
use serde::{Deserialize, Serialize};

/// Points closer than this are considered coincident.
pub const DISTANCE_EPSILON: f32 = 1e-4;

/// Collision shape of a primitive, centered on the primitive's local origin.
///
/// Capsules run along the local Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3A },
    Capsule { radius: f32, half_height: f32 },
}

impl Shape {
    /// Closest point on the surface of the shape, in local space.
    /// Points inside the shape are returned as-is together with `inside = true`.
    pub fn closest_point_local(&self, p: Vec3A) -> (Vec3A, bool) {
        match *self {
            Shape::Sphere { radius } => clamp_to_sphere(p, Vec3A::ZERO, radius),
            Shape::Box { half_extents } => {
                let clamped = p.clamp(-half_extents, half_extents);
                (clamped, clamped == p)
            }
            Shape::Capsule {
                radius,
                half_height,
            } => {
                let center = Vec3A::new(0.0, p.y.clamp(-half_height, half_height), 0.0);
                clamp_to_sphere(p, center, radius)
            }
        }
    }

    pub fn local_bounds(&self) -> Aabb {
        let half = match *self {
            Shape::Sphere { radius } => Vec3A::splat(radius),
            Shape::Box { half_extents } => half_extents,
            Shape::Capsule {
                radius,
                half_height,
            } => Vec3A::new(radius, half_height + radius, radius),
        };
        Aabb::new(-half, half)
    }

    /// Local-space ray intersection. `dir` does not need to be normalized;
    /// the returned parameter is in units of `dir`.
    pub fn raycast_local(&self, origin: Vec3A, dir: Vec3A) -> Option<(f32, Vec3A)> {
        match *self {
            Shape::Sphere { radius } => ray_sphere(origin, dir, Vec3A::ZERO, radius),
            Shape::Box { half_extents } => ray_box(origin, dir, half_extents),
            Shape::Capsule {
                radius,
                half_height,
            } => ray_capsule(origin, dir, radius, half_height),
        }
    }
}

fn clamp_to_sphere(p: Vec3A, center: Vec3A, radius: f32) -> (Vec3A, bool) {
    let offset = p - center;
    let dist = offset.length();
    if dist <= radius {
        return (p, true);
    }
    (center + offset * (radius / dist), false)
}

fn ray_sphere(origin: Vec3A, dir: Vec3A, center: Vec3A, radius: f32) -> Option<(f32, Vec3A)> {
    let oc = origin - center;
    let a = dir.length_squared();
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    if a < f32::EPSILON || c <= 0.0 {
        // degenerate ray, or starting inside
        return None;
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / a;
    if t < 0.0 {
        return None;
    }
    let normal = (oc + dir * t) / radius;
    Some((t, normal))
}

fn ray_box(origin: Vec3A, dir: Vec3A, half: Vec3A) -> Option<(f32, Vec3A)> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    let mut axis = 0usize;

    for i in 0..3 {
        if dir[i].abs() < f32::EPSILON {
            if origin[i] < -half[i] || origin[i] > half[i] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir[i];
        let mut t0 = (-half[i] - origin[i]) * inv;
        let mut t1 = (half[i] - origin[i]) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_near {
            t_near = t0;
            axis = i;
        }
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }

    if t_near < 0.0 {
        return None;
    }

    let mut normal = Vec3A::ZERO;
    normal[axis] = -dir[axis].signum();
    Some((t_near, normal))
}

fn ray_capsule(origin: Vec3A, dir: Vec3A, radius: f32, half_height: f32) -> Option<(f32, Vec3A)> {
    let mut best: Option<(f32, Vec3A)> = None;
    let mut keep = |hit: Option<(f32, Vec3A)>| {
        if let Some(hit) = hit {
            if best.map_or(true, |b| hit.0 < b.0) {
                best = Some(hit);
            }
        }
    };

    // side wall, infinite cylinder around Y
    let a = dir.x * dir.x + dir.z * dir.z;
    if a > f32::EPSILON {
        let b = origin.x * dir.x + origin.z * dir.z;
        let c = origin.x * origin.x + origin.z * origin.z - radius * radius;
        let disc = b * b - a * c;
        if c > 0.0 && disc >= 0.0 {
            let t = (-b - disc.sqrt()) / a;
            let p = origin + dir * t;
            if t >= 0.0 && p.y.abs() <= half_height {
                keep(Some((t, Vec3A::new(p.x, 0.0, p.z) / radius)));
            }
        }
    }

    keep(ray_sphere(origin, dir, Vec3A::Y * half_height, radius));
    keep(ray_sphere(origin, dir, Vec3A::NEG_Y * half_height, radius));

    best
}

/// Closest point on a transformed shape to a world-space point.
///
/// Returns the world-space closest point and its distance to `point`; a point
/// inside the shape is its own closest point at distance zero.
pub fn closest_point_on_shape(shape: &Shape, transform: &Affine3A, point: Vec3A) -> (Vec3A, f32) {
    let local = transform.inverse().transform_point3a(point);
    let (closest_local, inside) = shape.closest_point_local(local);
    if inside {
        return (point, 0.0);
    }
    let closest = transform.transform_point3a(closest_local);
    (closest, closest.distance(point))
}

/// World-space ray intersection with a transformed shape.
/// `dir` is expected to be normalized; returns `(distance, point, normal)`.
pub fn raycast_shape(
    shape: &Shape,
    transform: &Affine3A,
    origin: Vec3A,
    dir: Vec3A,
    max_distance: f32,
) -> Option<(f32, Vec3A, Vec3A)> {
    let inv = transform.inverse();
    let local_origin = inv.transform_point3a(origin);
    let local_dir = inv.transform_vector3a(dir);

    let (t, local_normal) = shape.raycast_local(local_origin, local_dir)?;
    if t > max_distance {
        return None;
    }

    let normal_matrix: Mat3A = transform.matrix3.inverse().transpose();
    let normal = safe_normal(normal_matrix * local_normal, -dir);
    Some((t, origin + dir * t, normal))
}

/// Outward surface normal for a focus query: from the closest point toward the
/// query point, or from `center` when the query point lies inside the shape.
pub fn outward_normal(point: Vec3A, closest: Vec3A, center: Vec3A) -> Vec3A {
    let dir = if point.distance_squared(closest) > DISTANCE_EPSILON * DISTANCE_EPSILON {
        point - closest
    } else {
        point - center
    };
    safe_normal(dir, Vec3A::X)
}

pub fn safe_normal(v: Vec3A, fallback: Vec3A) -> Vec3A {
    v.try_normalize().unwrap_or(fallback)
}

/// Rotation taking direction `a` onto direction `b`.
/// Identity when either vector is too short to define a direction.
pub fn find_between(a: Vec3A, b: Vec3A) -> Quat {
    match (a.try_normalize(), b.try_normalize()) {
        (Some(a), Some(b)) => Quat::from_rotation_arc(a.into(), b.into()).normalize(),
        _ => Quat::IDENTITY,
    }
}

/// Rotation whose local +Z points along `forward` with local +Y as close to `up` as possible.
pub fn look_rotation(forward: Vec3A, up: Vec3A) -> Option<Quat> {
    let col_z = forward.try_normalize()?;
    let col_x = up.cross(col_z).try_normalize()?;
    let col_y = col_z.cross(col_x).normalize();
    Some(Quat::from_mat3a(&Mat3A::from_cols(col_x, col_y, col_z)).normalize())
}

/// Axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3A,
    pub max: Vec3A,
}

impl Aabb {
    pub fn new(min: Vec3A, max: Vec3A) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn center(&self) -> Vec3A {
        (self.min + self.max) * 0.5
    }

    /// Half size along each axis.
    pub fn extents(&self) -> Vec3A {
        (self.max - self.min) * 0.5
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand_by(&self, margin: Vec3A) -> Aabb {
        Aabb::new(self.min - margin, self.max + margin)
    }

    pub fn corners(&self) -> [Vec3A; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3A::new(a.x, a.y, a.z),
            Vec3A::new(b.x, a.y, a.z),
            Vec3A::new(a.x, b.y, a.z),
            Vec3A::new(b.x, b.y, a.z),
            Vec3A::new(a.x, a.y, b.z),
            Vec3A::new(b.x, a.y, b.z),
            Vec3A::new(a.x, b.y, b.z),
            Vec3A::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after transforming all eight corners.
    pub fn transformed(&self, transform: &Affine3A) -> Aabb {
        let corners = self.corners().map(|c| transform.transform_point3a(c));
        let mut out = Aabb {
            min: corners[0],
            max: corners[0],
        };
        for c in &corners[1..] {
            out.min = out.min.min(*c);
            out.max = out.max.max(*c);
        }
        out
    }
}

/// Combined bounds of shapes placed by world transforms, measured in the space
/// given by `world_to_local`.
pub fn hierarchy_bounds<'a>(
    shapes: impl IntoIterator<Item = (&'a Shape, &'a Affine3A)>,
    world_to_local: &Affine3A,
) -> Option<Aabb> {
    shapes
        .into_iter()
        .map(|(shape, transform)| {
            shape
                .local_bounds()
                .transformed(&(*world_to_local * *transform))
        })
        .reduce(|acc, b| acc.union(&b))
}

pub fn lerp_transform(a: &Affine3A, b: &Affine3A, t: f32) -> Affine3A {
    let (sa, ra, ta) = a.to_scale_rotation_translation();
    let (sb, rb, tb) = b.to_scale_rotation_translation();
    Affine3A::from_scale_rotation_translation(sa.lerp(sb, t), ra.slerp(rb, t), ta.lerp(tb, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn closest_point_sphere_outside_and_inside() {
        let shape = Shape::Sphere { radius: 1.0 };
        let transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, 5.0));

        let (p, d) = closest_point_on_shape(&shape, &transform, Vec3A::ZERO);
        assert!(p.abs_diff_eq(Vec3A::new(0.0, 0.0, 4.0), 1e-5));
        assert!((d - 4.0).abs() < 1e-5);

        let inner = Vec3A::new(0.0, 0.2, 5.1);
        let (p, d) = closest_point_on_shape(&shape, &transform, inner);
        assert_eq!(p, inner);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn closest_point_rotated_box() {
        let shape = Shape::Box {
            half_extents: Vec3A::new(1.0, 0.5, 0.5),
        };
        let transform = Affine3A::from_rotation_y(std::f32::consts::FRAC_PI_2);
        // local X now runs along world -Z
        let (p, d) = closest_point_on_shape(&shape, &transform, Vec3A::new(3.0, 0.0, 0.0));
        assert!(p.abs_diff_eq(Vec3A::new(0.5, 0.0, 0.0), 1e-5));
        assert!((d - 2.5).abs() < 1e-5);
    }

    #[test]
    fn closest_point_capsule_cap() {
        let shape = Shape::Capsule {
            radius: 0.5,
            half_height: 1.0,
        };
        let (p, _) = closest_point_on_shape(&shape, &Affine3A::IDENTITY, Vec3A::new(0.0, 4.0, 0.0));
        assert!(p.abs_diff_eq(Vec3A::new(0.0, 1.5, 0.0), 1e-5));
    }

    #[test]
    fn outward_normal_falls_back_to_center_then_forward() {
        let n = outward_normal(Vec3A::new(0.0, 2.0, 0.0), Vec3A::new(0.0, 1.0, 0.0), Vec3A::ZERO);
        assert!(n.abs_diff_eq(Vec3A::Y, 1e-6));

        let inside = Vec3A::new(0.0, 0.0, 0.3);
        let n = outward_normal(inside, inside, Vec3A::ZERO);
        assert!(n.abs_diff_eq(Vec3A::Z, 1e-6));

        let n = outward_normal(Vec3A::ZERO, Vec3A::ZERO, Vec3A::ZERO);
        assert_eq!(n, Vec3A::X);
    }

    #[test]
    fn raycast_hits_box_front_face() {
        let shape = Shape::Box {
            half_extents: Vec3A::splat(0.5),
        };
        let transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, -3.0));
        let (t, point, normal) =
            raycast_shape(&shape, &transform, Vec3A::ZERO, Vec3A::NEG_Z, 10.0).unwrap();
        assert!((t - 2.5).abs() < 1e-5);
        assert!(point.abs_diff_eq(Vec3A::new(0.0, 0.0, -2.5), 1e-5));
        assert!(normal.abs_diff_eq(Vec3A::Z, 1e-5));

        assert!(raycast_shape(&shape, &transform, Vec3A::ZERO, Vec3A::NEG_Z, 2.0).is_none());
        assert!(raycast_shape(&shape, &transform, Vec3A::ZERO, Vec3A::Z, 10.0).is_none());
    }

    #[test]
    fn raycast_sphere_and_capsule() {
        let sphere = Shape::Sphere { radius: 1.0 };
        let transform = Affine3A::from_translation(Vec3::new(4.0, 0.0, 0.0));
        let (t, _, normal) =
            raycast_shape(&sphere, &transform, Vec3A::ZERO, Vec3A::X, 10.0).unwrap();
        assert!((t - 3.0).abs() < 1e-5);
        assert!(normal.abs_diff_eq(Vec3A::NEG_X, 1e-5));

        let capsule = Shape::Capsule {
            radius: 0.25,
            half_height: 1.0,
        };
        let (t, _, _) = raycast_shape(
            &capsule,
            &transform,
            Vec3A::new(0.0, 0.9, 0.0),
            Vec3A::X,
            10.0,
        )
        .unwrap();
        assert!((t - 3.75).abs() < 1e-4);

        let (t, _, normal) = raycast_shape(
            &capsule,
            &transform,
            Vec3A::new(4.0, 5.0, 0.0),
            Vec3A::NEG_Y,
            10.0,
        )
        .unwrap();
        assert!((t - 3.75).abs() < 1e-4);
        assert!(normal.abs_diff_eq(Vec3A::Y, 1e-4));
    }

    #[test]
    fn find_between_degenerate_is_identity() {
        assert_eq!(find_between(Vec3A::ZERO, Vec3A::X), Quat::IDENTITY);
        assert_eq!(find_between(Vec3A::X, Vec3A::ZERO), Quat::IDENTITY);

        let q = find_between(Vec3A::X, Vec3A::Y * 3.0);
        assert!((q * Vec3A::X).abs_diff_eq(Vec3A::Y, 1e-5));
    }

    #[test]
    fn look_rotation_basis() {
        let q = look_rotation(Vec3A::X, Vec3A::Y).unwrap();
        assert!((q * Vec3A::Z).abs_diff_eq(Vec3A::X, 1e-5));
        assert!((q * Vec3A::Y).abs_diff_eq(Vec3A::Y, 1e-5));
        assert!(look_rotation(Vec3A::Y, Vec3A::Y).is_none());
    }

    #[test]
    fn hierarchy_bounds_in_local_space() {
        let a = Shape::Box {
            half_extents: Vec3A::splat(0.5),
        };
        let b = Shape::Sphere { radius: 0.25 };
        let ta = Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let tb = Affine3A::from_translation(Vec3::new(12.0, 0.0, 0.0));
        let to_local = Affine3A::from_translation(Vec3::new(-10.0, 0.0, 0.0));

        let bounds = hierarchy_bounds([(&a, &ta), (&b, &tb)], &to_local).unwrap();
        assert!(bounds.min.abs_diff_eq(Vec3A::new(-0.5, -0.5, -0.5), 1e-5));
        assert!(bounds.max.abs_diff_eq(Vec3A::new(2.25, 0.5, 0.5), 1e-5));

        assert!(hierarchy_bounds(std::iter::empty::<(&Shape, &Affine3A)>(), &to_local).is_none());
    }
}
