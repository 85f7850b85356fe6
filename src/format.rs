//! Surface formats and element-level dimension translation.
//!
//! The layout engine works in storage elements rather than logical pixels.
//! Most formats store one element per pixel, but three kinds do not:
//!
//! - wide 3-component formats (`FMT_8_8_8`, `FMT_16_16_16`, `FMT_32_32_32`)
//!   are expanded to three single-component elements per pixel,
//! - packed formats (1-bit and the GBGR/BGRG pairs) store several pixels
//!   per element,
//! - block-compressed formats store a 4x4 pixel block per element.
//!
//! [`ElemMode::adjust`] rewrites (bpp, width, height) from pixel space into
//! element space before sizing, and [`ElemMode::restore`] maps the padded
//! results back.

/// A surface format code.
///
/// The values match the hardware's neutral format enumeration, so the type
/// is an open set: any `u32` round-trips through the C API. Unlisted values
/// classify as zero bits per element and are rejected by the sizing entry
/// point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct SurfaceFormat(pub u32);

impl SurfaceFormat {
    pub const INVALID: Self = Self(0x00);
    pub const FMT_8: Self = Self(0x01);
    pub const FMT_4_4: Self = Self(0x02);
    pub const FMT_3_3_2: Self = Self(0x03);
    pub const FMT_16: Self = Self(0x05);
    pub const FMT_16_FLOAT: Self = Self(0x06);
    pub const FMT_8_8: Self = Self(0x07);
    pub const FMT_5_6_5: Self = Self(0x08);
    pub const FMT_6_5_5: Self = Self(0x09);
    pub const FMT_1_5_5_5: Self = Self(0x0a);
    pub const FMT_4_4_4_4: Self = Self(0x0b);
    pub const FMT_5_5_5_1: Self = Self(0x0c);
    pub const FMT_32: Self = Self(0x0d);
    pub const FMT_32_FLOAT: Self = Self(0x0e);
    pub const FMT_16_16: Self = Self(0x0f);
    pub const FMT_16_16_FLOAT: Self = Self(0x10);
    pub const FMT_8_24: Self = Self(0x11);
    pub const FMT_8_24_FLOAT: Self = Self(0x12);
    pub const FMT_24_8: Self = Self(0x13);
    pub const FMT_24_8_FLOAT: Self = Self(0x14);
    pub const FMT_10_11_11: Self = Self(0x15);
    pub const FMT_10_11_11_FLOAT: Self = Self(0x16);
    pub const FMT_11_11_10: Self = Self(0x17);
    pub const FMT_11_11_10_FLOAT: Self = Self(0x18);
    pub const FMT_2_10_10_10: Self = Self(0x19);
    pub const FMT_8_8_8_8: Self = Self(0x1a);
    pub const FMT_10_10_10_2: Self = Self(0x1b);
    pub const FMT_X24_8_32_FLOAT: Self = Self(0x1c);
    pub const FMT_32_32: Self = Self(0x1d);
    pub const FMT_32_32_FLOAT: Self = Self(0x1e);
    pub const FMT_16_16_16_16: Self = Self(0x1f);
    pub const FMT_16_16_16_16_FLOAT: Self = Self(0x20);
    pub const FMT_32_32_32_32: Self = Self(0x22);
    pub const FMT_32_32_32_32_FLOAT: Self = Self(0x23);
    pub const FMT_1: Self = Self(0x25);
    pub const FMT_1_REVERSED: Self = Self(0x26);
    pub const FMT_GB_GR: Self = Self(0x27);
    pub const FMT_BG_RG: Self = Self(0x28);
    pub const FMT_32_AS_8: Self = Self(0x29);
    pub const FMT_32_AS_8_8: Self = Self(0x2a);
    pub const FMT_5_9_9_9_SHAREDEXP: Self = Self(0x2b);
    pub const FMT_8_8_8: Self = Self(0x2c);
    pub const FMT_16_16_16: Self = Self(0x2d);
    pub const FMT_16_16_16_FLOAT: Self = Self(0x2e);
    pub const FMT_32_32_32: Self = Self(0x2f);
    pub const FMT_32_32_32_FLOAT: Self = Self(0x30);
    pub const FMT_BC1: Self = Self(0x31);
    pub const FMT_BC2: Self = Self(0x32);
    pub const FMT_BC3: Self = Self(0x33);
    pub const FMT_BC4: Self = Self(0x34);
    pub const FMT_BC5: Self = Self(0x35);
    pub const FMT_BC6: Self = Self(0x36);
    pub const FMT_BC7: Self = Self(0x37);
    pub const FMT_CTX1: Self = Self(0x3e);

    /// Returns true for the block-compressed formats BC1 through BC7.
    pub const fn is_block_compressed(self) -> bool {
        self.0 >= Self::FMT_BC1.0 && self.0 <= Self::FMT_BC7.0
    }
}

/// How a format's stored elements relate to its logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum ElemMode {
    /// One element per pixel.
    Uncompressed,
    /// One pixel split across `expand_x * expand_y` elements.
    Expanded,
    /// `expand_x * expand_y` pixels packed into one element.
    PackedStd,
    /// Like [`ElemMode::PackedStd`] with reversed bit order.
    PackedRev,
    /// Two pixels sharing chroma, G B G R byte order.
    PackedGbgr,
    /// Two pixels sharing chroma, B G R G byte order.
    PackedBgrg,
    /// A 64-bit 4x4 block (BC1).
    PackedBc1,
    /// A 128-bit 4x4 block (BC2).
    PackedBc2,
    /// A 128-bit 4x4 block (BC3).
    PackedBc3,
    /// A 64-bit 4x4 block (BC4).
    PackedBc4,
    /// A 128-bit 4x4 block (BC5/BC6/BC7).
    PackedBc5,
}

impl ElemMode {
    const fn is_bcn(self) -> bool {
        matches!(
            self,
            ElemMode::PackedBc1
                | ElemMode::PackedBc2
                | ElemMode::PackedBc3
                | ElemMode::PackedBc4
                | ElemMode::PackedBc5
        )
    }

    /// Rewrites `bpp`, `width` and `height` from pixel space to element
    /// space. Dimensions are clamped to at least 1.
    pub fn adjust(self, expand_x: u32, expand_y: u32, bpp: &mut u32, width: &mut u32, height: &mut u32) {
        match self {
            ElemMode::Expanded => *bpp = *bpp / expand_x / expand_y,
            ElemMode::PackedStd | ElemMode::PackedRev => *bpp = expand_y * expand_x * *bpp,
            ElemMode::PackedBc1 | ElemMode::PackedBc4 => *bpp = 64,
            ElemMode::PackedBc2 | ElemMode::PackedBc3 | ElemMode::PackedBc5 => *bpp = 128,
            ElemMode::Uncompressed | ElemMode::PackedGbgr | ElemMode::PackedBgrg => (),
        }

        if expand_x > 1 || expand_y > 1 {
            let (w, h) = if self == ElemMode::Expanded {
                (expand_x * *width, expand_y * *height)
            } else if self.is_bcn() {
                (*width / expand_x, *height / expand_y)
            } else {
                (
                    (*width + expand_x - 1) / expand_x,
                    (*height + expand_y - 1) / expand_y,
                )
            };

            *width = w.max(1);
            *height = h.max(1);
        }
    }

    /// Reverse of [`ElemMode::adjust`].
    ///
    /// For the block-compressed modes the bpp is not reconstructed to the
    /// format's pixel bpp; it stays at the 64 or 128 bit element size.
    /// Callers must not rely on a lossless bpp round-trip for BCn formats.
    pub fn restore(self, expand_x: u32, expand_y: u32, bpp: &mut u32, width: &mut u32, height: &mut u32) {
        match self {
            ElemMode::Expanded => *bpp = expand_x * expand_y * *bpp,
            ElemMode::PackedStd | ElemMode::PackedRev => *bpp = *bpp / expand_x / expand_y,
            ElemMode::PackedBc1 | ElemMode::PackedBc4 => *bpp = 64,
            ElemMode::PackedBc2 | ElemMode::PackedBc3 | ElemMode::PackedBc5 => *bpp = 128,
            ElemMode::Uncompressed | ElemMode::PackedGbgr | ElemMode::PackedBgrg => (),
        }

        if expand_x > 1 || expand_y > 1 {
            if self == ElemMode::Expanded {
                *width /= expand_x;
                *height /= expand_y;
            } else {
                *width *= expand_x;
                *height *= expand_y;
            }
        }

        *width = (*width).max(1);
        *height = (*height).max(1);
    }
}

/// Per-format element classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementInfo {
    /// Bits per stored element. Zero for unrecognized formats.
    pub bpp: u32,
    pub elem_mode: ElemMode,
    pub expand_x: u32,
    pub expand_y: u32,
    /// Bits of each element not backed by data. Only the combined
    /// depth-stencil float format carries unused bits.
    pub unused_bits: u32,
}

/// Classifies `format` into bits per element and expansion factors.
pub fn element_info(format: SurfaceFormat) -> ElementInfo {
    let mut info = ElementInfo {
        bpp: 0,
        elem_mode: ElemMode::Uncompressed,
        expand_x: 1,
        expand_y: 1,
        unused_bits: 0,
    };

    match format {
        SurfaceFormat::FMT_8 | SurfaceFormat::FMT_4_4 | SurfaceFormat::FMT_3_3_2 => info.bpp = 8,
        SurfaceFormat::FMT_1_5_5_5
        | SurfaceFormat::FMT_5_6_5
        | SurfaceFormat::FMT_6_5_5
        | SurfaceFormat::FMT_8_8
        | SurfaceFormat::FMT_4_4_4_4
        | SurfaceFormat::FMT_5_5_5_1
        | SurfaceFormat::FMT_16
        | SurfaceFormat::FMT_16_FLOAT => info.bpp = 16,
        SurfaceFormat::FMT_GB_GR => {
            info.elem_mode = ElemMode::PackedGbgr;
            info.bpp = 16;
        }
        SurfaceFormat::FMT_BG_RG => {
            info.elem_mode = ElemMode::PackedBgrg;
            info.bpp = 16;
        }
        SurfaceFormat::FMT_8_8_8_8
        | SurfaceFormat::FMT_2_10_10_10
        | SurfaceFormat::FMT_10_11_11
        | SurfaceFormat::FMT_11_11_10
        | SurfaceFormat::FMT_16_16
        | SurfaceFormat::FMT_16_16_FLOAT
        | SurfaceFormat::FMT_32
        | SurfaceFormat::FMT_32_FLOAT
        | SurfaceFormat::FMT_24_8
        | SurfaceFormat::FMT_24_8_FLOAT
        | SurfaceFormat::FMT_8_24
        | SurfaceFormat::FMT_8_24_FLOAT
        | SurfaceFormat::FMT_10_11_11_FLOAT
        | SurfaceFormat::FMT_11_11_10_FLOAT
        | SurfaceFormat::FMT_10_10_10_2
        | SurfaceFormat::FMT_32_AS_8
        | SurfaceFormat::FMT_32_AS_8_8
        | SurfaceFormat::FMT_5_9_9_9_SHAREDEXP => info.bpp = 32,
        SurfaceFormat::FMT_16_16_16_16
        | SurfaceFormat::FMT_16_16_16_16_FLOAT
        | SurfaceFormat::FMT_32_32
        | SurfaceFormat::FMT_32_32_FLOAT
        | SurfaceFormat::FMT_CTX1 => info.bpp = 64,
        SurfaceFormat::FMT_32_32_32_32 | SurfaceFormat::FMT_32_32_32_32_FLOAT => info.bpp = 128,
        SurfaceFormat::FMT_X24_8_32_FLOAT => {
            info.bpp = 64;
            info.unused_bits = 24;
        }
        SurfaceFormat::FMT_1_REVERSED => {
            info.elem_mode = ElemMode::PackedRev;
            info.expand_x = 8;
            info.bpp = 1;
        }
        SurfaceFormat::FMT_1 => {
            info.elem_mode = ElemMode::PackedStd;
            info.expand_x = 8;
            info.bpp = 1;
        }
        SurfaceFormat::FMT_8_8_8 => {
            info.elem_mode = ElemMode::Expanded;
            info.expand_x = 3;
            info.bpp = 24;
        }
        SurfaceFormat::FMT_16_16_16 | SurfaceFormat::FMT_16_16_16_FLOAT => {
            info.elem_mode = ElemMode::Expanded;
            info.expand_x = 3;
            info.bpp = 48;
        }
        SurfaceFormat::FMT_32_32_32 | SurfaceFormat::FMT_32_32_32_FLOAT => {
            info.elem_mode = ElemMode::Expanded;
            info.expand_x = 3;
            info.bpp = 96;
        }
        SurfaceFormat::FMT_BC1 => {
            info.elem_mode = ElemMode::PackedBc1;
            info.expand_x = 4;
            info.expand_y = 4;
            info.bpp = 64;
        }
        SurfaceFormat::FMT_BC4 => {
            info.elem_mode = ElemMode::PackedBc4;
            info.expand_x = 4;
            info.expand_y = 4;
            info.bpp = 64;
        }
        SurfaceFormat::FMT_BC2 => {
            info.elem_mode = ElemMode::PackedBc2;
            info.expand_x = 4;
            info.expand_y = 4;
            info.bpp = 128;
        }
        SurfaceFormat::FMT_BC3 => {
            info.elem_mode = ElemMode::PackedBc3;
            info.expand_x = 4;
            info.expand_y = 4;
            info.bpp = 128;
        }
        SurfaceFormat::FMT_BC5 | SurfaceFormat::FMT_BC6 | SurfaceFormat::FMT_BC7 => {
            info.elem_mode = ElemMode::PackedBc5;
            info.expand_x = 4;
            info.expand_y = 4;
            info.bpp = 128;
        }
        _ => info.bpp = 0,
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn classification_table() {
        assert_eq!(32, element_info(SurfaceFormat::FMT_8_8_8_8).bpp);
        assert_eq!(16, element_info(SurfaceFormat::FMT_5_6_5).bpp);
        assert_eq!(128, element_info(SurfaceFormat::FMT_32_32_32_32_FLOAT).bpp);
        assert_eq!(0, element_info(SurfaceFormat::INVALID).bpp);
        assert_eq!(0, element_info(SurfaceFormat(0x24)).bpp);

        let depth_stencil = element_info(SurfaceFormat::FMT_X24_8_32_FLOAT);
        assert_eq!(64, depth_stencil.bpp);
        assert_eq!(24, depth_stencil.unused_bits);

        let triple = element_info(SurfaceFormat::FMT_32_32_32_FLOAT);
        assert_eq!(ElemMode::Expanded, triple.elem_mode);
        assert_eq!((3, 1), (triple.expand_x, triple.expand_y));
        assert_eq!(96, triple.bpp);

        let one_bit = element_info(SurfaceFormat::FMT_1);
        assert_eq!(ElemMode::PackedStd, one_bit.elem_mode);
        assert_eq!(8, one_bit.expand_x);

        // CTX1 classifies as a plain 64 bit element with no expansion.
        let ctx1 = element_info(SurfaceFormat::FMT_CTX1);
        assert_eq!(ElemMode::Uncompressed, ctx1.elem_mode);
        assert_eq!(64, ctx1.bpp);
    }

    #[test]
    fn block_compressed_range() {
        assert!(SurfaceFormat::FMT_BC1.is_block_compressed());
        assert!(SurfaceFormat::FMT_BC7.is_block_compressed());
        assert!(!SurfaceFormat::FMT_8_8_8_8.is_block_compressed());
        assert!(!SurfaceFormat::FMT_CTX1.is_block_compressed());
    }

    #[test]
    fn adjust_expanded_triple() {
        let info = element_info(SurfaceFormat::FMT_32_32_32);
        let (mut bpp, mut w, mut h) = (info.bpp, 100, 40);
        info.elem_mode.adjust(info.expand_x, info.expand_y, &mut bpp, &mut w, &mut h);
        assert_eq!((32, 300, 40), (bpp, w, h));

        info.elem_mode.restore(info.expand_x, info.expand_y, &mut bpp, &mut w, &mut h);
        assert_eq!((96, 100, 40), (bpp, w, h));
    }

    #[test]
    fn adjust_packed_one_bit() {
        let info = element_info(SurfaceFormat::FMT_1);
        let (mut bpp, mut w, mut h) = (info.bpp, 100, 40);
        info.elem_mode.adjust(info.expand_x, info.expand_y, &mut bpp, &mut w, &mut h);
        assert_eq!((8, 13, 40), (bpp, w, h));
    }

    #[test]
    fn adjust_bcn_keeps_element_bpp() {
        let info = element_info(SurfaceFormat::FMT_BC1);
        let (mut bpp, mut w, mut h) = (info.bpp, 128, 128);
        info.elem_mode.adjust(info.expand_x, info.expand_y, &mut bpp, &mut w, &mut h);
        assert_eq!((64, 32, 32), (bpp, w, h));

        // The bpp does not round-trip for block-compressed formats. The
        // element size is all the addressing layer ever sees.
        info.elem_mode.restore(info.expand_x, info.expand_y, &mut bpp, &mut w, &mut h);
        assert_eq!((64, 128, 128), (bpp, w, h));
    }

    #[test]
    fn adjust_restore_round_trips_dimensions() {
        let formats = [
            SurfaceFormat::FMT_8,
            SurfaceFormat::FMT_8_8_8_8,
            SurfaceFormat::FMT_16_16_16_FLOAT,
            SurfaceFormat::FMT_32_32_32,
            SurfaceFormat::FMT_GB_GR,
            SurfaceFormat::FMT_1,
            SurfaceFormat::FMT_1_REVERSED,
        ];

        let seed = [7u8; 32];
        let mut rng: StdRng = SeedableRng::from_seed(seed);

        for format in formats {
            let info = element_info(format);
            for _ in 0..100 {
                // Stay on expansion-grid dimensions so the ceiling division
                // of the packed modes is exact.
                let w0 = rng.gen_range(1..256u32) * info.expand_x;
                let h0 = rng.gen_range(1..256u32) * info.expand_y;
                let (mut bpp, mut w, mut h) = (info.bpp, w0, h0);

                info.elem_mode.adjust(info.expand_x, info.expand_y, &mut bpp, &mut w, &mut h);
                info.elem_mode.restore(info.expand_x, info.expand_y, &mut bpp, &mut w, &mut h);

                assert_eq!((info.bpp, w0, h0), (bpp, w, h), "{format:?}");
            }
        }
    }
}
