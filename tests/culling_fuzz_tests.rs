//! Seeded fuzzing of the conservative guarantees
//!
//! The depth buffer may under-occlude but must never hide something that is
//! in front of every occluder, and shared triangle edges must never leave gaps.
use glam::{Affine3A, Mat4, Vec3, Vec4};
use masked_occlusion::culling::debug::{coverage, decode_depth};
use masked_occlusion::{
    BackfaceWinding, CullingConfig, Occludee, OccludeeChunk, OccluderInstance, OccluderMesh,
    OcclusionCulling, Projection, ViewKey, ViewParams,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

const WIDTH: u32 = 256;
const HEIGHT: u32 = 128;

fn depth_is_z() -> Mat4 {
    Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::W, Vec4::ZERO)
}

fn view(key: u64) -> ViewParams {
    ViewParams {
        key: ViewKey::new(key),
        view_projection: depth_is_z(),
        near_clip: 0.1,
        projection: Projection::Perspective,
        width: WIDTH,
        height: HEIGHT,
    }
}

fn config() -> CullingConfig {
    CullingConfig {
        backface: BackfaceWinding::None,
        buffer_count: 3,
        ..CullingConfig::default()
    }
}

/// Random axis-aligned rectangle facing the viewer at world depth `z`
fn random_wall(rng: &mut ChaCha8Rng, z: f32) -> OccluderInstance {
    let cx = rng.gen_range(-1.5..1.5) * z;
    let cy = rng.gen_range(-1.5..1.5) * z;
    let hx = rng.gen_range(0.05..1.0) * z;
    let hy = rng.gen_range(0.05..1.0) * z;
    let mesh = OccluderMesh::new(
        vec![
            Vec3::new(cx - hx, cy - hy, z),
            Vec3::new(cx + hx, cy - hy, z),
            Vec3::new(cx + hx, cy + hy, z),
            Vec3::new(cx - hx, cy + hy, z),
        ],
        vec![0, 1, 2, 0, 2, 3],
        Affine3A::IDENTITY,
    )
    .unwrap();
    OccluderInstance::new(Arc::new(mesh), Affine3A::IDENTITY)
}

fn random_box(rng: &mut ChaCha8Rng, z_range: std::ops::Range<f32>) -> Occludee {
    let z = rng.gen_range(z_range);
    let center = Vec3::new(rng.gen_range(-1.5..1.5) * z, rng.gen_range(-1.5..1.5) * z, z);
    let half = Vec3::new(rng.gen_range(0.0..0.3), rng.gen_range(0.0..0.3), rng.gen_range(0.0..0.05)) * z;
    Occludee::new(-half, half, Affine3A::from_translation(center))
}

#[test]
fn boxes_in_front_of_every_occluder_are_never_occluded() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0001);
    let mut culling = OcclusionCulling::new(config());

    for round in 0..40 {
        let occluders: Vec<OccluderInstance> = (0..rng.gen_range(1..12))
            .map(|_| {
                let z = rng.gen_range(5.0..20.0);
                random_wall(&mut rng, z)
            })
            .collect();

        let mut chunks: Vec<OccludeeChunk> = (0..3)
            .map(|_| {
                let mut chunk = OccludeeChunk::new();
                for _ in 0..rng.gen_range(1..100) {
                    // Every box ends before the nearest possible wall
                    chunk.push(random_box(&mut rng, 0.5..4.5)).unwrap();
                }
                chunk
            })
            .collect();

        let stats = culling.cull(&view(round), &occluders, &mut chunks);
        assert_eq!(
            stats.occludees_occluded, 0,
            "round {round}: a box in front of all walls was reported occluded ({stats:?})"
        );
    }
}

#[test]
fn boxes_behind_a_covering_wall_are_always_occluded() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0002);
    let mut culling = OcclusionCulling::new(config());

    for round in 0..20 {
        let z = rng.gen_range(2.0..6.0);
        let s = 3.0 * z;
        let wall = OccluderInstance::new(
            Arc::new(
                OccluderMesh::new(
                    vec![
                        Vec3::new(-s, -s, z),
                        Vec3::new(s, -s, z),
                        Vec3::new(s, s, z),
                        Vec3::new(-s, s, z),
                    ],
                    vec![0, 2, 1, 0, 3, 2],
                    Affine3A::IDENTITY,
                )
                .unwrap(),
            ),
            Affine3A::IDENTITY,
        );

        let mut chunk = OccludeeChunk::new();
        for _ in 0..64 {
            let mut b = random_box(&mut rng, (z + 1.0)..(z + 30.0));
            // Keep the box on screen so it cannot be view-culled
            b.world = Affine3A::from_translation(Vec3::new(0.0, 0.0, b.world.translation.z));
            chunk.push(b).unwrap();
        }
        let mut chunks = vec![chunk];

        let stats = culling.cull(&view(100 + round), &[wall], &mut chunks);
        assert_eq!(chunks[0].visibility(), 0, "round {round}: box behind a fullscreen wall survived ({stats:?})");
    }
}

#[test]
fn empty_buffer_keeps_every_on_screen_box() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0003);
    let mut culling = OcclusionCulling::new(config());

    let mut chunk = OccludeeChunk::new();
    for _ in 0..128 {
        let z = rng.gen_range(0.5..50.0);
        let center = Vec3::new(rng.gen_range(-0.9..0.9) * z, rng.gen_range(-0.9..0.9) * z, z);
        chunk
            .push(Occludee::new(Vec3::splat(-0.01), Vec3::splat(0.01), Affine3A::from_translation(center)))
            .unwrap();
    }
    let mut chunks = vec![chunk];
    let stats = culling.cull(&view(7), &[], &mut chunks);
    assert_eq!(stats.occludees_visible, 128, "{stats:?}");
    assert_eq!(chunks[0].visibility(), u128::MAX);
}

/// Jittered grid mesh larger than the screen, at one depth
fn jittered_grid(rng: &mut ChaCha8Rng, cells: usize, z: f32) -> OccluderInstance {
    let extent = 1.3;
    let step = 2.0 * extent / cells as f32;
    let mut vertices = Vec::with_capacity((cells + 1) * (cells + 1));
    for j in 0..=cells {
        for i in 0..=cells {
            let border = i == 0 || j == 0 || i == cells || j == cells;
            let jitter = if border {
                (0.0, 0.0)
            } else {
                (rng.gen_range(-0.12..0.12) * step, rng.gen_range(-0.12..0.12) * step)
            };
            let x = -extent + i as f32 * step + jitter.0;
            let y = -extent + j as f32 * step + jitter.1;
            vertices.push(Vec3::new(x * z, y * z, z));
        }
    }
    let row = cells as u32 + 1;
    let mut indices = Vec::with_capacity(cells * cells * 6);
    for j in 0..cells as u32 {
        for i in 0..cells as u32 {
            let a = j * row + i;
            let (b, c, d) = (a + 1, a + row + 1, a + row);
            if (i + j) % 2 == 0 {
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            } else {
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }
    let mesh = OccluderMesh::new(vertices, indices, Affine3A::IDENTITY).unwrap();
    OccluderInstance::new(Arc::new(mesh), Affine3A::IDENTITY)
}

#[test]
fn shared_edges_are_watertight() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_0004);
    for round in 0..8 {
        let mut culling = OcclusionCulling::new(config());
        let cells = rng.gen_range(3..17);
        let z = rng.gen_range(1.0..8.0);
        let mesh = jittered_grid(&mut rng, cells, z);
        let params = view(200 + round);
        culling.cull(&params, &[mesh], &mut []);

        let group = culling.view(params.key).unwrap();
        let depth = decode_depth(group);
        if let Some(hole) = depth.iter().position(|&d| d < 0.0) {
            panic!(
                "round {round}: {cells}x{cells} grid left pixel ({}, {}) uncovered",
                hole as u32 % WIDTH,
                hole as u32 / WIDTH
            );
        }
        assert_eq!(coverage(group), 1.0);
        let expected = 1.0 / z;
        for d in &depth {
            assert!((d - expected).abs() < 1e-4 * expected.max(1.0), "depth {d} should be {expected}");
        }
    }
}
