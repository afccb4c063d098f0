// crates/livecut-core/src/helpers/resample.rs
//
// Area resampling for packed RGB bitmaps. Every consumer of camera frames
// (preview tiles, the motion feature, the AVI writer) normalizes through
// here, so the box filter is the one scaling algorithm in the codebase.
//
// Each destination pixel averages the source box that maps onto it — the
// classic area filter. Downscales stay alias-free; upscales degenerate to
// nearest-neighbour (a 1×1 source box), which is fine for preview tiles.

use rayon::prelude::*;

use crate::frame::VideoFrame;

/// Resample `src` to `dst_w` × `dst_h`. Returns the input unchanged (cloned)
/// when the dimensions already match.
pub fn resample_area(src: &VideoFrame, dst_w: u32, dst_h: u32) -> VideoFrame {
    if src.width == dst_w && src.height == dst_h {
        return src.clone();
    }
    VideoFrame {
        width:  dst_w,
        height: dst_h,
        data:   resample_rgb(&src.data, src.width, src.height, dst_w, dst_h),
        seq:    src.seq,
    }
}

/// The underlying byte-level resample. `data.len()` must equal `sw * sh * 3`.
pub fn resample_rgb(data: &[u8], sw: u32, sh: u32, dw: u32, dh: u32) -> Vec<u8> {
    assert_eq!(data.len(), sw as usize * sh as usize * 3, "source size mismatch");
    if dw == 0 || dh == 0 {
        return Vec::new();
    }

    let x_ratio = sw as f64 / dw as f64;
    let y_ratio = sh as f64 / dh as f64;
    let src_row = sw as usize * 3;
    let dst_row = dw as usize * 3;

    let mut out = vec![0u8; dst_row * dh as usize];

    out.par_chunks_mut(dst_row).enumerate().for_each(|(dy, row)| {
        let y0 = (dy as f64 * y_ratio) as usize;
        let y1 = (((dy + 1) as f64 * y_ratio).ceil() as usize).clamp(y0 + 1, sh as usize);

        for dx in 0..dw as usize {
            let x0 = (dx as f64 * x_ratio) as usize;
            let x1 = (((dx + 1) as f64 * x_ratio).ceil() as usize).clamp(x0 + 1, sw as usize);

            let mut acc = [0u64; 3];
            for sy in y0..y1 {
                let base = sy * src_row;
                for sx in x0..x1 {
                    let p = base + sx * 3;
                    acc[0] += data[p] as u64;
                    acc[1] += data[p + 1] as u64;
                    acc[2] += data[p + 2] as u64;
                }
            }
            let count = ((y1 - y0) * (x1 - x0)) as u64;
            let d = dx * 3;
            row[d]     = (acc[0] / count) as u8;
            row[d + 1] = (acc[1] / count) as u8;
            row[d + 2] = (acc[2] / count) as u8;
        }
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> VideoFrame {
        let mut f = VideoFrame::black(w, h);
        for px in f.data.chunks_mut(3) {
            px.copy_from_slice(&rgb);
        }
        f
    }

    #[test]
    fn identity_dimensions_are_a_clone() {
        let f = solid(8, 6, [10, 20, 30]);
        let r = resample_area(&f, 8, 6);
        assert_eq!(r, f);
    }

    #[test]
    fn solid_color_survives_any_scale() {
        let f = solid(64, 48, [200, 100, 50]);
        for (w, h) in [(32, 24), (7, 5), (128, 96)] {
            let r = resample_area(&f, w, h);
            assert_eq!(r.width, w);
            assert_eq!(r.height, h);
            assert!(r.data.chunks(3).all(|px| px == [200, 100, 50]));
        }
    }

    #[test]
    fn downscale_by_two_averages_the_box() {
        // 2×2 checkerboard of 0 and 255 → single gray pixel.
        let mut f = VideoFrame::black(2, 2);
        f.data[0..3].copy_from_slice(&[255, 255, 255]);
        f.data[9..12].copy_from_slice(&[255, 255, 255]);
        let r = resample_area(&f, 1, 1);
        assert_eq!(&r.data, &[127, 127, 127]);
    }

    #[test]
    fn sequence_number_is_preserved() {
        let mut f = solid(4, 4, [1, 2, 3]);
        f.seq = 42;
        assert_eq!(resample_area(&f, 2, 2).seq, 42);
    }
}
