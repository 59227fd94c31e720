/// Merge of worker-local depth buffers into buffer 0
use super::buffer_group::BufferGroup;
use super::tile::Tile;
use crate::count_call;
use crate::perf::CULLING_COUNTERS;
use crate::simd::F32x4;
use rayon::prelude::*;

/// Fold `src` into `dst` with the same masked update the rasterizer uses.
///
/// Layer 0 of `src` covers the pixels whose mask bit is clear, layer 1 the
/// ones whose bit is set. Lanes of a layer still at the cleared sentinel
/// contribute nothing.
#[inline]
pub fn merge_tile(dst: &mut Tile, src: &Tile) {
    if src.is_cleared() {
        return;
    }
    if dst.is_cleared() {
        *dst = *src;
        count_call!(CULLING_COUNTERS.tiles_merged);
        return;
    }

    let [z0, z1] = src.z_min;
    let valid0 = z0.cmp_ge(F32x4::zero());
    let valid1 = z1.cmp_ge(F32x4::zero());

    let layer0 = (!src.mask) & valid0;
    if !layer0.is_zero() {
        dst.update(layer0, z0);
    }
    let layer1 = src.mask & valid1;
    if !layer1.is_zero() {
        dst.update(layer1, z1);
    }
    count_call!(CULLING_COUNTERS.tiles_merged);
}

/// Merge buffers `1..` of `group` into buffer 0, one bin-sized range per task
pub fn merge_buffers(group: &mut BufferGroup) {
    let chunk = group.grid.tiles_per_bin();
    let Some((first, rest)) = group.buffers.split_first_mut() else {
        return;
    };
    if rest.is_empty() {
        return;
    }
    let rest: &[Vec<Tile>] = rest;

    first
        .par_chunks_mut(chunk)
        .enumerate()
        .for_each(|(index, dst)| {
            let start = index * chunk;
            for buffer in rest {
                let src = &buffer[start..start + dst.len()];
                for (d, s) in dst.iter_mut().zip(src) {
                    merge_tile(d, s);
                }
            }
        });
}
