//! Minimal encoder for type 0 (monochrome, uncompressed) Wireless Bitmaps,
//! which the `image` crate does not write.

use image::GrayImage;
use std::io::Write;

/// Luma values at or above this threshold become white pixels.
const WHITE_THRESHOLD: u8 = 128;

pub(crate) fn encode<W: Write>(canvas: &GrayImage, out: &mut W) -> std::io::Result<()> {
    // Type 0 image, no extension headers.
    out.write_all(&[0x00, 0x00])?;
    out.write_all(&multibyte(canvas.width()))?;
    out.write_all(&multibyte(canvas.height()))?;

    // Rows are padded to whole bytes, most significant bit first.
    let mut row = vec![0u8; (canvas.width() as usize).div_ceil(8)];
    for y in 0..canvas.height() {
        row.fill(0);
        for x in 0..canvas.width() {
            if canvas.get_pixel(x, y).0[0] >= WHITE_THRESHOLD {
                row[x as usize / 8] |= 0x80 >> (x % 8);
            }
        }
        out.write_all(&row)?;
    }
    out.flush()
}

/// Encodes `value` as a WBMP multi-byte integer: big-endian 7-bit groups,
/// every byte but the last with its high bit set.
fn multibyte(value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7f) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        bytes.push((rest & 0x7f) as u8 | 0x80);
        rest >>= 7;
    }
    bytes.reverse();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn multibyte_integers() {
        assert_eq!(multibyte(0), vec![0x00]);
        assert_eq!(multibyte(10), vec![0x0a]);
        assert_eq!(multibyte(127), vec![0x7f]);
        assert_eq!(multibyte(200), vec![0x81, 0x48]);
    }

    #[test]
    fn rows_are_padded_to_bytes() {
        let mut canvas = GrayImage::from_pixel(10, 2, Luma([0]));
        canvas.put_pixel(0, 0, Luma([255]));
        canvas.put_pixel(9, 1, Luma([255]));

        let mut out = Vec::new();
        encode(&canvas, &mut out).unwrap();

        assert_eq!(out, vec![0x00, 0x00, 10, 2, 0x80, 0x00, 0x00, 0x40]);
    }
}
