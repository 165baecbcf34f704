//! Test-only QR symbol writer and image helpers.
//!
//! Builds symbols module by module (segments, padding, Reed-Solomon blocks,
//! interleave, placement, mask, format and version fields) so the decoder can
//! be checked against known content without fixture files.

#![allow(dead_code)]

use image::{GrayImage, Luma};
use qr_reader::decoder::bch::BchDecoder;
use qr_reader::decoder::function_mask::{FunctionMask, alignment_pattern_positions};
use qr_reader::decoder::modes::Mode;
use qr_reader::decoder::reed_solomon::Gf256;
use qr_reader::decoder::tables::ec_block_info;
use qr_reader::utils::geometry::PerspectiveTransform;
use qr_reader::{BitMatrix, ECLevel, MaskPattern, Point, Version};

pub const BLACK: u8 = 20;
pub const WHITE: u8 = 235;

const ALPHANUMERIC: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// One segment to encode
#[derive(Debug, Clone)]
pub enum Seg<'a> {
    Numeric(&'a str),
    Alphanumeric(&'a str),
    Bytes(&'a [u8]),
    /// Shift JIS double-byte codes
    Kanji(&'a [u16]),
    Eci(u32),
    /// Sequence index, total symbols, parity
    StructuredAppend(u8, u8, u8),
}

#[derive(Default)]
struct Bits(Vec<bool>);

impl Bits {
    fn push(&mut self, value: u32, count: usize) {
        for i in (0..count).rev() {
            self.0.push((value >> i) & 1 != 0);
        }
    }
}

fn segment_bits(segments: &[Seg], version: Version) -> Bits {
    let mut bits = Bits::default();
    for seg in segments {
        match seg {
            Seg::Numeric(digits) => {
                bits.push(0b0001, 4);
                bits.push(digits.len() as u32, Mode::Numeric.count_bits(version));
                for chunk in digits.as_bytes().chunks(3) {
                    let value = chunk.iter().fold(0u32, |acc, d| acc * 10 + (d - b'0') as u32);
                    bits.push(value, [0, 4, 7, 10][chunk.len()]);
                }
            }
            Seg::Alphanumeric(text) => {
                bits.push(0b0010, 4);
                bits.push(text.len() as u32, Mode::Alphanumeric.count_bits(version));
                let values: Vec<u32> = text
                    .chars()
                    .map(|c| ALPHANUMERIC.find(c).expect("alphanumeric character") as u32)
                    .collect();
                for pair in values.chunks(2) {
                    match pair {
                        [a, b] => bits.push(a * 45 + b, 11),
                        [a] => bits.push(*a, 6),
                        _ => unreachable!(),
                    }
                }
            }
            Seg::Bytes(data) => {
                bits.push(0b0100, 4);
                bits.push(data.len() as u32, Mode::Byte.count_bits(version));
                for &b in *data {
                    bits.push(b as u32, 8);
                }
            }
            Seg::Kanji(codes) => {
                bits.push(0b1000, 4);
                bits.push(codes.len() as u32, Mode::Kanji.count_bits(version));
                for &code in *codes {
                    let c = u32::from(if code < 0xE040 { code - 0x8140 } else { code - 0xC140 });
                    bits.push((c >> 8) * 0xC0 + (c & 0xFF), 13);
                }
            }
            Seg::Eci(assignment) => {
                bits.push(0b0111, 4);
                match *assignment {
                    a if a < 128 => bits.push(a, 8),
                    a if a < 16384 => bits.push(0x8000 | a, 16),
                    a => bits.push(0xC0_0000 | a, 24),
                }
            }
            Seg::StructuredAppend(index, total, parity) => {
                bits.push(0b0011, 4);
                bits.push(*index as u32, 4);
                bits.push(*total as u32 - 1, 4);
                bits.push(*parity as u32, 8);
            }
        }
    }
    bits
}

/// Segments that carry `text` in the most compact single mode
pub fn segments_for(text: &str) -> Vec<Seg<'_>> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        vec![Seg::Numeric(text)]
    } else if !text.is_empty() && text.chars().all(|c| ALPHANUMERIC.contains(c)) {
        vec![Seg::Alphanumeric(text)]
    } else {
        vec![Seg::Bytes(text.as_bytes())]
    }
}

/// Data codewords with terminator and padding, or `None` when they do not fit
pub fn data_codewords(segments: &[Seg], version: Version, ec: ECLevel) -> Option<Vec<u8>> {
    let capacity = ec_block_info(version, ec).data_codewords() * 8;
    let mut bits = segment_bits(segments, version);
    if bits.0.len() > capacity {
        return None;
    }
    let terminator = (capacity - bits.0.len()).min(4);
    bits.push(0, terminator);
    while bits.0.len() % 8 != 0 {
        bits.0.push(false);
    }
    let mut bytes: Vec<u8> = bits
        .0
        .chunks(8)
        .map(|c| c.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
        .collect();
    for pad in [0xEC, 0x11].into_iter().cycle() {
        if bytes.len() * 8 >= capacity {
            break;
        }
        bytes.push(pad);
    }
    Some(bytes)
}

/// Parity codewords for `data`, generator roots alpha^0 .. alpha^(ecc-1)
pub fn rs_parity(data: &[u8], ecc: usize) -> Vec<u8> {
    let mut generator = vec![1u8];
    for i in 0..ecc {
        let root = Gf256::exp(i);
        let mut next = vec![0u8; generator.len() + 1];
        for (j, &g) in generator.iter().enumerate() {
            next[j] ^= g;
            next[j + 1] ^= Gf256::mul(g, root);
        }
        generator = next;
    }
    let mut remainder = vec![0u8; ecc];
    for &d in data {
        let factor = d ^ remainder[0];
        remainder.rotate_left(1);
        remainder[ecc - 1] = 0;
        for (r, &g) in remainder.iter_mut().zip(&generator[1..]) {
            *r ^= Gf256::mul(g, factor);
        }
    }
    remainder
}

/// Split into blocks, add parity and interleave
pub fn interleave(data: &[u8], version: Version, ec: ECLevel) -> Vec<u8> {
    let info = ec_block_info(version, ec);
    let mut offset = 0;
    let mut blocks = Vec::with_capacity(info.num_blocks);
    for b in 0..info.num_blocks {
        let len = info.data_len(b);
        let block = &data[offset..offset + len];
        offset += len;
        blocks.push((block.to_vec(), rs_parity(block, info.ecc_per_block)));
    }

    let mut out = Vec::with_capacity(info.total_codewords);
    for i in 0..=info.short_data_len() {
        for (block, _) in &blocks {
            if let Some(&byte) = block.get(i) {
                out.push(byte);
            }
        }
    }
    for i in 0..info.ecc_per_block {
        for (_, parity) in &blocks {
            out.push(parity[i]);
        }
    }
    out
}

fn draw_function_patterns(m: &mut BitMatrix, version: Version) {
    let size = version.size();
    for (ox, oy) in [(0, 0), (size - 7, 0), (0, size - 7)] {
        for dy in 0..7 {
            for dx in 0..7 {
                let d = (dx as isize - 3).abs().max((dy as isize - 3).abs());
                m.set(ox + dx, oy + dy, d == 3 || d <= 1);
            }
        }
    }
    for i in 8..size - 8 {
        m.set(i, 6, i % 2 == 0);
        m.set(6, i, i % 2 == 0);
    }
    let align = alignment_pattern_positions(version.number());
    if let (Some(&first), Some(&last)) = (align.first(), align.last()) {
        for &cy in &align {
            for &cx in &align {
                let on_finder = (cx == first && cy == first)
                    || (cx == last && cy == first)
                    || (cx == first && cy == last);
                if on_finder {
                    continue;
                }
                for dy in 0..5 {
                    for dx in 0..5 {
                        let d = (dx as isize - 2).abs().max((dy as isize - 2).abs());
                        m.set(cx - 2 + dx, cy - 2 + dy, d != 1);
                    }
                }
            }
        }
    }
    // Dark module
    m.set(8, size - 8, true);
}

fn draw_format(m: &mut BitMatrix, ec: ECLevel, mask: MaskPattern) {
    let size = m.width();
    let codeword = BchDecoder::format_codeword((ec.to_bits() << 3) | mask.number());
    let bit = |i: usize| (codeword >> (14 - i)) & 1 == 1;

    let mut first = Vec::with_capacity(15);
    first.extend((0..6).map(|x| (x, 8)));
    first.extend([(7, 8), (8, 8), (8, 7)]);
    first.extend((0..6).rev().map(|y| (8, y)));
    let mut second = Vec::with_capacity(15);
    second.extend((size - 7..size).rev().map(|y| (8, y)));
    second.extend((size - 8..size).map(|x| (x, 8)));

    for (i, (&(x1, y1), &(x2, y2))) in first.iter().zip(&second).enumerate() {
        m.set(x1, y1, bit(i));
        m.set(x2, y2, bit(i));
    }
}

fn draw_version(m: &mut BitMatrix, version: Version) {
    let Some(codeword) = BchDecoder::version_codeword(version.number()) else {
        return;
    };
    let size = m.width();
    for k in 0..18 {
        let bit = (codeword >> k) & 1 == 1;
        m.set(size - 11 + k % 3, k / 3, bit);
        m.set(k / 3, size - 11 + k % 3, bit);
    }
}

/// Finder, timing and alignment patterns only: format area and data all white
pub fn skeleton(version: Version) -> BitMatrix {
    let mut m = BitMatrix::new(version.size(), version.size());
    draw_function_patterns(&mut m, version);
    m
}

/// Place interleaved codewords into a full symbol
pub fn place(codewords: &[u8], version: Version, ec: ECLevel, mask: MaskPattern) -> BitMatrix {
    let size = version.size();
    let func = FunctionMask::new(version);
    let mut m = BitMatrix::new(size, size);
    draw_function_patterns(&mut m, version);
    draw_format(&mut m, ec, mask);
    draw_version(&mut m, version);

    let bits: Vec<bool> = codewords
        .iter()
        .flat_map(|&b| (0..8).rev().map(move |i| (b >> i) & 1 == 1))
        .collect();
    let mut next = 0;
    let mut right = size as isize - 1;
    while right >= 1 {
        if right == 6 {
            right = 5;
        }
        let upward = (right + 1) & 2 == 0;
        for vert in 0..size {
            let y = if upward { size - 1 - vert } else { vert };
            for x in [right as usize, right as usize - 1] {
                if func.is_function(x, y) {
                    continue;
                }
                let bit = bits.get(next).copied().unwrap_or(false);
                next += 1;
                m.set(x, y, bit ^ mask.is_masked(y, x));
            }
        }
        right -= 2;
    }
    m
}

/// Encode segments into a symbol; `corrupt` may damage the interleaved codewords first
pub fn encode_with(
    segments: &[Seg],
    version: Version,
    ec: ECLevel,
    mask: MaskPattern,
    corrupt: impl FnOnce(&mut Vec<u8>),
) -> Option<BitMatrix> {
    let data = data_codewords(segments, version, ec)?;
    let mut codewords = interleave(&data, version, ec);
    corrupt(&mut codewords);
    Some(place(&codewords, version, ec, mask))
}

pub fn encode(
    segments: &[Seg],
    version: Version,
    ec: ECLevel,
    mask: MaskPattern,
) -> Option<BitMatrix> {
    encode_with(segments, version, ec, mask, |_| {})
}

/// Encode text in the smallest version that holds it
pub fn encode_text(text: &str, ec: ECLevel, mask: MaskPattern) -> BitMatrix {
    let segments = segments_for(text);
    (1..=40)
        .filter_map(Version::new)
        .find_map(|v| encode(&segments, v, ec, mask))
        .expect("text fits in version 40")
}

/// Render modules at `scale` pixels each with a `quiet`-module white border
pub fn render(m: &BitMatrix, scale: u32, quiet: u32) -> GrayImage {
    let side = (m.width() as u32 + 2 * quiet) * scale;
    GrayImage::from_fn(side, side, |px, py| {
        let (mx, my) = (px / scale, py / scale);
        let inside = mx >= quiet
            && my >= quiet
            && ((mx - quiet) as usize) < m.width()
            && ((my - quiet) as usize) < m.height();
        let black = inside && m.get((mx - quiet) as usize, (my - quiet) as usize);
        Luma([if black { BLACK } else { WHITE }])
    })
}

/// Map `src` onto the quadrilateral `quad` (images of its TL, TR, BR, BL corners)
/// in a white `width` x `height` canvas, bilinearly sampled
pub fn warp(src: &GrayImage, width: u32, height: u32, quad: [Point; 4]) -> GrayImage {
    let (w, h) = (src.width() as f32, src.height() as f32);
    let rect = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ];
    let to_src = PerspectiveTransform::from_points(&quad, &rect).expect("non-degenerate quad");
    GrayImage::from_fn(width, height, |x, y| {
        let p = to_src.transform(&Point::new(x as f32 + 0.5, y as f32 + 0.5));
        Luma([bilinear(src, p.x - 0.5, p.y - 0.5)])
    })
}

fn bilinear(img: &GrayImage, x: f32, y: f32) -> u8 {
    if !x.is_finite() || !y.is_finite() {
        return WHITE;
    }
    let fetch = |xi: i64, yi: i64| -> f32 {
        if xi < 0 || yi < 0 || xi >= img.width() as i64 || yi >= img.height() as i64 {
            WHITE as f32
        } else {
            img.get_pixel(xi as u32, yi as u32)[0] as f32
        }
    };
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (xi, yi) = (x0 as i64, y0 as i64);
    let top = fetch(xi, yi) * (1.0 - fx) + fetch(xi + 1, yi) * fx;
    let bottom = fetch(xi, yi + 1) * (1.0 - fx) + fetch(xi + 1, yi + 1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

/// Quad for a square of side `side` centred at (cx, cy), turned by `degrees`
/// and with its right edge shortened by `squeeze` (0 = none) to fake a tilt
pub fn tilted_quad(cx: f32, cy: f32, side: f32, degrees: f32, squeeze: f32) -> [Point; 4] {
    let half = side / 2.0;
    let right = half * (1.0 - squeeze);
    let local = [(-half, -half), (half, -right), (half, right), (-half, half)];
    let (sin, cos) = degrees.to_radians().sin_cos();
    local.map(|(x, y)| Point::new(cx + x * cos - y * sin, cy + x * sin + y * cos))
}

/// White canvas with each image pasted at its offset
pub fn compose(width: u32, height: u32, parts: &[(&GrayImage, i64, i64)]) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(width, height, Luma([WHITE]));
    for (img, x, y) in parts {
        image::imageops::overlay(&mut canvas, *img, *x, *y);
    }
    canvas
}

/// Mirror an image left to right
pub fn mirror(img: &GrayImage) -> GrayImage {
    image::imageops::flip_horizontal(img)
}

/// Install a test logger once; `RUST_LOG=debug` shows pipeline rejections
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
