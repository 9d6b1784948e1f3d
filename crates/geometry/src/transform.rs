//! Rigid transforms in the simulator convention.
//!
//! Rotation is applied as yaw (z), then pitch (y), then roll (x), with angles
//! in degrees and a left-handed frame.

use contracts::{ActorSnapshot, Location, Rotation, Transform};
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// Rotation part of [`transform_matrix`].
pub fn rotation_matrix(rotation: &Rotation) -> Matrix3<f64> {
    let (sy, cy) = rotation.yaw.to_radians().sin_cos();
    let (sr, cr) = rotation.roll.to_radians().sin_cos();
    let (sp, cp) = rotation.pitch.to_radians().sin_cos();

    Matrix3::new(
        cp * cy,
        cy * sp * sr - sy * cr,
        -cy * sp * cr - sy * sr,
        cp * sy,
        sy * sp * sr + cy * cr,
        -sy * sp * cr + cy * sr,
        sp,
        -cp * sr,
        cp * cr,
    )
}

/// Local-to-world 4×4 matrix of a transform.
pub fn transform_matrix(transform: &Transform) -> Matrix4<f64> {
    let mut matrix = Matrix4::identity();
    matrix
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&rotation_matrix(&transform.rotation));
    matrix[(0, 3)] = transform.location.x;
    matrix[(1, 3)] = transform.location.y;
    matrix[(2, 3)] = transform.location.z;
    matrix
}

/// World-to-local 4×4 matrix (rigid inverse of [`transform_matrix`]).
pub fn inverse_matrix(transform: &Transform) -> Matrix4<f64> {
    let rotation_t = rotation_matrix(&transform.rotation).transpose();
    let translation = -(rotation_t * to_vector(&transform.location));

    let mut matrix = Matrix4::identity();
    matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_t);
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    matrix
}

/// Unit vector along the local x axis.
pub fn forward_vector(rotation: &Rotation) -> Vector3<f64> {
    let (sy, cy) = rotation.yaw.to_radians().sin_cos();
    let (sp, cp) = rotation.pitch.to_radians().sin_cos();
    Vector3::new(cp * cy, cp * sy, sp)
}

/// Map a point from `transform`'s local frame into the parent frame.
pub fn transform_point(transform: &Transform, point: &Location) -> Location {
    let world = transform_matrix(transform) * homogeneous(point);
    Location::new(world.x, world.y, world.z)
}

/// Pose of `child` (given relative to `parent`) in the parent's frame.
pub fn compose(parent: &Transform, child: &Transform) -> Transform {
    let matrix = transform_matrix(parent) * transform_matrix(child);

    let pitch = matrix[(2, 0)].clamp(-1.0, 1.0).asin();
    let yaw = matrix[(1, 0)].atan2(matrix[(0, 0)]);
    let roll = (-matrix[(2, 1)]).atan2(matrix[(2, 2)]);

    Transform::new(
        Location::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]),
        Rotation::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees()),
    )
}

/// The 8 world-space corners of an actor's oriented bounding box.
///
/// Bottom face first (counter-clockwise from +x+y), then the top face in the
/// same order.
pub fn world_vertices(actor: &ActorSnapshot) -> [Vector3<f64>; 8] {
    let extent = &actor.bounding_box.extent;
    let box_transform = Transform::new(actor.bounding_box.location, actor.bounding_box.rotation);
    let box_to_world = transform_matrix(&actor.transform) * transform_matrix(&box_transform);

    let corners = [
        (1.0, 1.0, -1.0),
        (-1.0, 1.0, -1.0),
        (-1.0, -1.0, -1.0),
        (1.0, -1.0, -1.0),
        (1.0, 1.0, 1.0),
        (-1.0, 1.0, 1.0),
        (-1.0, -1.0, 1.0),
        (1.0, -1.0, 1.0),
    ];

    corners.map(|(sx, sy, sz)| {
        let local = Vector4::new(sx * extent.x, sy * extent.y, sz * extent.z, 1.0);
        let world = box_to_world * local;
        Vector3::new(world.x, world.y, world.z)
    })
}

pub(crate) fn to_vector(location: &Location) -> Vector3<f64> {
    Vector3::new(location.x, location.y, location.z)
}

pub(crate) fn homogeneous(location: &Location) -> Vector4<f64> {
    Vector4::new(location.x, location.y, location.z, 1.0)
}
