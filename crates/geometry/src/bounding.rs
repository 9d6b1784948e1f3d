//! 2D bounding boxes from actor state.

use contracts::{ActorId, ActorSnapshot, BoundingBox, BoundingBoxSet, Transform};
use nalgebra::Matrix4;
use tracing::trace;

use crate::projection::{project_with_depth, IntrinsicMatrix};
use crate::transform::{forward_vector, inverse_matrix, to_vector, world_vertices};

/// Channels of the annotated RGB image
const IMAGE_DEPTH: u32 = 3;

/// Minimum forward projection of the ego→actor ray (meters)
const FORWARD_GATE: f64 = 1.0;

/// Ego pose used to gate candidates
#[derive(Debug, Clone, Copy)]
pub struct EgoPose {
    pub id: ActorId,
    pub transform: Transform,
}

/// Compute the fully visible 2D boxes of `candidates`.
///
/// Candidates are dropped when they are the ego, are at least `max_distance`
/// away, sit within [`FORWARD_GATE`] of the ego's lateral plane, have a vertex
/// at or behind the image plane, or project outside the image on any side.
/// Survivors keep their input order.
#[allow(clippy::too_many_arguments)]
pub fn extract(
    candidates: &[ActorSnapshot],
    ego: &EgoPose,
    intrinsic: &IntrinsicMatrix,
    world_to_camera: &Matrix4<f64>,
    image_width: u32,
    image_height: u32,
    max_distance: f64,
) -> BoundingBoxSet {
    let ego_location = to_vector(&ego.transform.location);
    let ego_forward = forward_vector(&ego.transform.rotation);

    let boxes = candidates
        .iter()
        .filter(|actor| actor.id != ego.id)
        .filter_map(|actor| {
            let ray = to_vector(&actor.transform.location) - ego_location;
            let distance = ray.norm();
            if distance >= max_distance {
                trace!(actor = actor.id, distance, "Beyond max distance");
                return None;
            }
            if ego_forward.dot(&ray) <= FORWARD_GATE {
                trace!(actor = actor.id, "Not in front of ego");
                return None;
            }

            let mut xmin = f64::INFINITY;
            let mut ymin = f64::INFINITY;
            let mut xmax = f64::NEG_INFINITY;
            let mut ymax = f64::NEG_INFINITY;
            for vertex in world_vertices(actor) {
                let (pixel, depth) = project_with_depth(&vertex, intrinsic, world_to_camera);
                if depth <= 0.0 {
                    trace!(actor = actor.id, "Vertex behind camera");
                    return None;
                }
                xmin = xmin.min(pixel.x);
                ymin = ymin.min(pixel.y);
                xmax = xmax.max(pixel.x);
                ymax = ymax.max(pixel.y);
            }

            let candidate = BoundingBox {
                class_name: actor.class_name().to_string(),
                xmin,
                ymin,
                xmax,
                ymax,
            };
            if !candidate.is_inside(image_width, image_height) {
                trace!(actor = actor.id, xmin, ymin, xmax, ymax, "Box leaves the image");
                return None;
            }
            Some(candidate)
        })
        .collect();

    BoundingBoxSet::new(image_width, image_height, IMAGE_DEPTH, boxes)
}

/// Extractor bound to one camera configuration
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxExtractor {
    intrinsic: IntrinsicMatrix,
    max_distance: f64,
}

impl BoundingBoxExtractor {
    pub fn new(intrinsic: IntrinsicMatrix, max_distance: f64) -> Self {
        Self {
            intrinsic,
            max_distance,
        }
    }

    pub fn intrinsic(&self) -> &IntrinsicMatrix {
        &self.intrinsic
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Boxes as seen by a camera at `camera` (world pose)
    pub fn extract(
        &self,
        candidates: &[ActorSnapshot],
        ego: &EgoPose,
        camera: &Transform,
    ) -> BoundingBoxSet {
        extract(
            candidates,
            ego,
            &self.intrinsic,
            &inverse_matrix(camera),
            self.intrinsic.width(),
            self.intrinsic.height(),
            self.max_distance,
        )
    }
}
