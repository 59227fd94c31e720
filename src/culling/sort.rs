/// Front-to-back ordering of clipped occluders
use super::clip::ClippedOccluder;
use std::cmp::Ordering;

/// Drop empty occluders and stable-sort the rest nearest first.
///
/// Nearer occluders fill the depth buffer early, so later triangles hit the
/// early-out in the tile update more often.
pub fn sort_front_to_back(occluders: &mut Vec<ClippedOccluder>) {
    occluders.retain(|o| o.vertex_count > 0);
    occluders.sort_by(|a, b| {
        a.screen_min
            .z
            .partial_cmp(&b.screen_min.z)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn occluder(offset: usize, count: usize, near: f32) -> ClippedOccluder {
        ClippedOccluder {
            vertex_offset: offset,
            vertex_count: count,
            screen_min: Vec3::new(-1.0, -1.0, near),
            screen_max: Vec3::new(1.0, 1.0, near + 1.0),
        }
    }

    #[test]
    fn sorts_nearest_first_and_drops_empty() {
        let mut list = vec![
            occluder(0, 3, 5.0),
            occluder(6, 0, 0.1),
            occluder(12, 6, 1.0),
            occluder(18, 3, 5.0),
        ];
        sort_front_to_back(&mut list);
        let offsets: Vec<usize> = list.iter().map(|o| o.vertex_offset).collect();
        assert_eq!(offsets, vec![12, 0, 18], "stable order for equal depth, empty removed");
    }
}
