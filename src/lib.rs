//! # r600_tiling
//! r600_tiling is an unofficial CPU implementation of the surface layout
//! rules of R600/R700 class GPUs.
//!
//! The library is pure computation. Given a logical surface description
//! and the memory controller geometry decoded from the tiling
//! configuration register, it answers three kinds of queries:
//!
//! - **surface sizing**: padded pitch/height/depth, per-dimension
//!   alignments, total and per-slice sizes, and the tile mode actually
//!   usable for the request (see [`Tiler::surface_info`]),
//! - **address resolution**: the byte address and bit position of pixel
//!   `(x, y, slice, sample)` inside such a surface (see
//!   [`Tiler::surface_addr`]),
//! - **auxiliary queries**: HTILE (hierarchical depth metadata) sizing,
//!   bank/pipe swizzle extraction, and per-slice tile swizzles.
//!
//! # Getting Started
//! Create a [`Tiler`] from the chip identification and register value,
//! then issue requests against it. The example sizes a micro-tiled
//! texture on a 4-pipe, 4-bank configuration.
/*!
```rust
use r600_tiling::{
    CreateFlags, CreateParams, SurfaceFormat, SurfaceInfoRequest, TileMode, Tiler,
    CHIP_ENGINE_R600,
};

# fn main() -> Result<(), r600_tiling::TilingError> {
let tiler = Tiler::new(&CreateParams {
    chip_engine: CHIP_ENGINE_R600,
    chip_family: 0x51,
    chip_revision: 0,
    // 4 pipes, 4 banks, 256B interleave, 2KB rows, 256B swap, 2KB split.
    gb_tiling_config: 0x4904,
    flags: CreateFlags::empty(),
})?;

let info = tiler.surface_info(&SurfaceInfoRequest {
    tile_mode: TileMode::Tiled1DThin1,
    format: SurfaceFormat::FMT_8_8_8_8,
    width: 65,
    height: 65,
    ..Default::default()
})?;

// Micro tiles are 8x8, so both dimensions pad up to 72.
assert_eq!(72, info.pitch);
assert_eq!(72, info.height);
assert_eq!(72 * 72 * 4, info.surf_size);
# Ok(())
# }
```
*/
//! # Scope
//! Only the R6xx and R7xx chip families are modeled. The library never
//! touches a GPU or reads surface memory; it produces numbers. Instances
//! are immutable after creation, and every request passes its state
//! through the call arguments.

mod engine;
mod format;
mod math;
mod r600;
mod surface;
mod tile;

// The C API mirrors the Rust entry points one to one.
pub mod ffi;

pub use format::{element_info, ElemMode, ElementInfo, SurfaceFormat};
pub use surface::{
    BankPipeSwizzle, HtileBlockSize, HtileInfo, HtileRequest, SliceSwizzleRequest, StereoInfo,
    SurfaceAddrRequest, SurfaceAddress, SurfaceFlags, SurfaceInfo, SurfaceInfoRequest, TileInfo,
};
pub use tile::{TileMode, TileType};

use bitflags::bitflags;
use thiserror::Error;

use engine::HwlEngine;
use math::{bits_to_bytes, mip_dim, next_pow2, pow2_align};

/// Chip engine identifier accepted by [`Tiler::new`].
pub const CHIP_ENGINE_R600: u32 = 6;

/// Errors reported by the surface queries.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TilingError {
    /// The request could not be completed.
    #[error("operation failed")]
    Failed,
    /// An allocation callback returned no memory.
    #[error("out of memory")]
    OutOfMemory,
    /// A parameter is outside the range the hardware supports.
    #[error("invalid parameters")]
    InvalidParams,
    /// The chip family is not one this library models.
    #[error("not supported")]
    NotSupported,
    /// The operation exists but has no implementation for this family.
    #[error("not implemented")]
    NotImplemented,
    /// A self-reported struct size did not match the compiled layout.
    #[error("parameter size mismatch")]
    SizeMismatch,
}

/// Chip family after normalization of the raw family identifier.
///
/// Only [`ChipFamily::R6xx`] and [`ChipFamily::R7xx`] are implemented;
/// the remaining families exist so the normalization has names for
/// neighbours handled by other libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipFamily {
    R6xx,
    R7xx,
    R8xx,
    R9xx,
    SouthernIslands,
}

bitflags! {
    /// Creation-time options for [`Tiler::new`].
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct CreateFlags: u32 {
        const FORCE_LINEAR_ALIGNED = 1 << 0;
        /// Keep cube-map mip chains at their real slice count instead of
        /// padding to a power of two. Implied on R6xx.
        const NO_CUBE_MIP_SLICES_PAD = 1 << 1;
        /// Compute per-slice sizes from the padded pitch instead of the
        /// surface-size quotient.
        const SLICE_SIZE_COMPUTING = 1 << 2;
        /// Enable struct-size validation on the C API.
        const FILL_SIZE_FIELDS = 1 << 3;
        const USE_TILE_INDEX = 1 << 4;
        const USE_TILE_CAPS = 1 << 5;
    }
}

/// Parameters for [`Tiler::new`].
#[derive(Debug, Clone, Copy)]
pub struct CreateParams {
    /// Must be [`CHIP_ENGINE_R600`].
    pub chip_engine: u32,
    /// Raw chip family identifier, normalized internally.
    pub chip_family: u32,
    pub chip_revision: u32,
    /// The 32-bit tiling configuration register value.
    pub gb_tiling_config: u32,
    pub flags: CreateFlags,
}

/// An address library instance for one hardware configuration.
///
/// Immutable after construction. Queries against distinct instances are
/// independent; the instance holds no request state.
pub struct Tiler {
    hwl: Box<dyn HwlEngine>,
}

impl Tiler {
    /// Builds an instance from the chip identification and the tiling
    /// configuration register.
    ///
    /// Fails with [`TilingError::Failed`] for an unknown chip engine,
    /// [`TilingError::NotSupported`] for a chip family outside R6xx/R7xx,
    /// and [`TilingError::InvalidParams`] when a register field is out of
    /// range.
    pub fn new(params: &CreateParams) -> Result<Self, TilingError> {
        if params.chip_engine != CHIP_ENGINE_R600 {
            return Err(TilingError::Failed);
        }

        let hwl = r600::R600Engine::new(params)?;
        Ok(Self { hwl: Box::new(hwl) })
    }

    pub fn chip_family(&self) -> ChipFamily {
        self.hwl.chip_family()
    }

    pub fn chip_revision(&self) -> u32 {
        self.hwl.chip_revision()
    }

    pub fn pipes(&self) -> u32 {
        self.hwl.pipes()
    }

    pub fn banks(&self) -> u32 {
        self.hwl.banks()
    }

    pub fn pipe_interleave_bytes(&self) -> u32 {
        self.hwl.pipe_interleave_bytes()
    }

    pub fn row_size(&self) -> u32 {
        self.hwl.row_size()
    }

    pub fn bank_swap_size(&self) -> u32 {
        self.hwl.swap_size()
    }

    pub fn sample_split_size(&self) -> u32 {
        self.hwl.split_size()
    }

    /// True when the C API should validate self-reported struct sizes.
    pub fn fill_size_fields(&self) -> bool {
        self.hwl
            .config_flags()
            .contains(engine::ConfigFlags::FILL_SIZE_FIELDS)
    }

    /// Reduces base-map dimensions to the requested mip level.
    ///
    /// Block-compressed formats pad to the 4x4 block grid first and let
    /// the hardware layer do the reduction; everything else shifts the
    /// base dimensions down and rounds to powers of two, except the
    /// 3-component 32-bit formats whose pitch is not a power of two.
    fn compute_mip_level(&self, req: &mut SurfaceInfoRequest) {
        if req.format.is_block_compressed()
            && (req.mip_level == 0 || req.flags.contains(SurfaceFlags::INPUT_BASE_MAP))
        {
            req.width = pow2_align(req.width, 4);
            req.height = pow2_align(req.height, 4);
        }

        if !self.hwl.compute_mip_level(req)
            && req.mip_level > 0
            && req.flags.contains(SurfaceFlags::INPUT_BASE_MAP)
        {
            let width = mip_dim(req.width, req.mip_level);
            let height = mip_dim(req.height, req.mip_level);
            let slices = if req.flags.contains(SurfaceFlags::CUBE) {
                req.num_slices.max(1)
            } else {
                mip_dim(req.num_slices, req.mip_level)
            };

            if req.format != SurfaceFormat::FMT_32_32_32
                && req.format != SurfaceFormat::FMT_32_32_32_FLOAT
            {
                req.width = next_pow2(width);
                req.height = next_pow2(height);
                req.num_slices = next_pow2(slices);
            } else {
                req.width = width;
                req.height = height;
                req.num_slices = slices;
            }
        }
    }

    /// Computes the padded shape, alignments, and sizes of a surface,
    /// degrading the tile mode where the request cannot be laid out as
    /// asked.
    pub fn surface_info(&self, request: &SurfaceInfoRequest) -> Result<SurfaceInfo, TilingError> {
        if request.bpp > 128 {
            return Err(TilingError::InvalidParams);
        }

        let mut req = *request;
        req.num_samples = req.num_samples.max(1);

        self.compute_mip_level(&mut req);

        self.hwl.setup_tile_cfg(req.tile_index, req.tile_info.as_mut())?;

        let mut out = SurfaceInfo {
            pixel_bits: req.bpp,
            ..Default::default()
        };

        let elem = if req.format != SurfaceFormat::INVALID {
            let info = element_info(req.format);
            let mut bpp = info.bpp;
            let mut width = req.width;
            let mut height = req.height;

            // A 3-element expanded format on a linear-aligned surface pads
            // in single-element units with the width tripled around it.
            if info.elem_mode == ElemMode::Expanded
                && info.expand_x == 3
                && req.tile_mode == TileMode::LinearAligned
            {
                req.flags |= SurfaceFlags::LINEAR_WA;
            }

            info.elem_mode
                .adjust(info.expand_x, info.expand_y, &mut bpp, &mut width, &mut height);
            req.width = width;
            req.height = height;
            req.bpp = bpp;

            if req.bpp == 0 {
                return Err(TilingError::InvalidParams);
            }

            Some(info)
        } else if req.bpp != 0 {
            req.width = req.width.max(1);
            req.height = req.height.max(1);
            None
        } else {
            return Err(TilingError::InvalidParams);
        };

        self.hwl.compute_surface_info(&req, &mut out)?;

        out.bpp = req.bpp;
        out.pixel_pitch = out.pitch;
        out.pixel_height = out.height;
        out.tile_type = req.tile_type;
        out.tile_index = req.tile_index;
        out.tile_info = req.tile_info;

        if let Some(info) = elem {
            if !req.flags.contains(SurfaceFlags::LINEAR_WA) || req.mip_level == 0 {
                // Only the dimensions are translated back; the bpp stays in
                // element space.
                let mut scratch_bpp = request.bpp;
                info.elem_mode.restore(
                    info.expand_x,
                    info.expand_y,
                    &mut scratch_bpp,
                    &mut out.pixel_pitch,
                    &mut out.pixel_height,
                );
            }
        }

        if req.flags.contains(SurfaceFlags::QB_STEREO) {
            out.stereo = Some(StereoInfo {
                eye_height: out.height,
                right_offset: out.surf_size as u32,
            });
            out.height <<= 1;
            out.pixel_height <<= 1;
            out.surf_size <<= 1;
        }

        match self.hwl.slice_size_mode() {
            1 => {
                out.slice_size = bits_to_bytes(
                    u64::from(out.height)
                        * u64::from(out.pitch)
                        * u64::from(out.bpp)
                        * u64::from(req.num_samples),
                ) as u32;
            }
            _ if req.flags.contains(SurfaceFlags::VOLUME) => {
                out.slice_size = out.surf_size as u32;
            }
            _ => {
                out.slice_size = (out.surf_size / u64::from(out.depth)) as u32;

                // The caller sizing the last slice of a clipped range also
                // absorbs the tail padding.
                if req.num_slices > 1 && req.slice == req.num_slices - 1 {
                    out.slice_size += out.slice_size * out.depth.saturating_sub(req.num_slices);
                }
            }
        }

        out.pitch_tile_max = (out.pitch / 8).wrapping_sub(1);
        out.height_tile_max = (out.height / 8).wrapping_sub(1);
        out.slice_tile_max = (out.pitch * (out.height / 64)).wrapping_sub(1);

        Ok(out)
    }

    /// Resolves pixel `(x, y, slice, sample)` of a sized surface to its
    /// byte address and intra-byte bit position.
    pub fn surface_addr(
        &self,
        request: &SurfaceAddrRequest,
    ) -> Result<SurfaceAddress, TilingError> {
        let mut req = *request;
        self.hwl.setup_tile_cfg(req.tile_index, req.tile_info.as_mut())?;
        self.hwl.compute_surface_addr(&req)
    }

    /// Decomposes a base address, in 256-byte units, into its bank and
    /// pipe swizzle.
    pub fn bank_pipe_swizzle(&self, base256b: u32) -> BankPipeSwizzle {
        self.hwl.extract_bank_pipe_swizzle(base256b)
    }

    /// Computes HTILE buffer parameters for a depth surface.
    pub fn htile_info(&self, req: &HtileRequest) -> Result<HtileInfo, TilingError> {
        let is_width8 = req.block_width == HtileBlockSize::Eight;
        let is_height8 = req.block_height == HtileBlockSize::Eight;

        let mut req = *req;
        self.hwl.setup_tile_cfg(req.tile_index, req.tile_info.as_mut())?;

        let pipes = self.hwl.pipes();
        let bpp = self.hwl.htile_bpp(is_width8, is_height8);

        let (macro_width, macro_height) = if req.is_linear {
            self.hwl.htile_macro_dims_linear(bpp)
        } else {
            engine::tile_data_dims(bpp, tile::HTILE_CACHE_BITS, pipes)
        };

        let pitch = pow2_align(req.pitch, macro_width);
        let height = pow2_align(req.height, macro_height);

        let base_align = self.hwl.htile_base_align(req.is_linear, pipes);
        let htile_bytes =
            self.hwl
                .htile_bytes(pitch, height, bpp, req.is_linear, req.num_slices, base_align);

        Ok(HtileInfo {
            pitch,
            height,
            htile_bytes,
            base_align,
            bpp,
            macro_width,
            macro_height,
        })
    }

    /// Computes the tile swizzle of a cube face or volume slice, folding
    /// the per-slice rotation into the base swizzle and address.
    pub fn slice_swizzle(&self, req: &SliceSwizzleRequest) -> Result<u32, TilingError> {
        let mut req = *req;
        self.hwl.setup_tile_cfg(req.tile_index, req.tile_info.as_mut())?;
        Ok(self.hwl.slice_tile_swizzle(&req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiler() -> Tiler {
        // 4 pipes, 4 banks, 256B interleave, 2KB rows, 256B swap, 2KB
        // split, on an RV710.
        Tiler::new(&CreateParams {
            chip_engine: CHIP_ENGINE_R600,
            chip_family: 0x51,
            chip_revision: 0,
            gb_tiling_config: 0x4904,
            flags: CreateFlags::empty(),
        })
        .unwrap()
    }

    fn tiler_with_flags(flags: CreateFlags) -> Tiler {
        Tiler::new(&CreateParams {
            chip_engine: CHIP_ENGINE_R600,
            chip_family: 0x51,
            chip_revision: 0,
            gb_tiling_config: 0x4904,
            flags,
        })
        .unwrap()
    }

    #[test]
    fn create_rejects_unknown_engine() {
        let result = Tiler::new(&CreateParams {
            chip_engine: 7,
            chip_family: 0x51,
            chip_revision: 0,
            gb_tiling_config: 0x4904,
            flags: CreateFlags::empty(),
        });
        assert!(matches!(result, Err(TilingError::Failed)));
    }

    #[test]
    fn create_rejects_bad_register() {
        // pipe-tiling 4 is out of range.
        let result = Tiler::new(&CreateParams {
            chip_engine: CHIP_ENGINE_R600,
            chip_family: 0x51,
            chip_revision: 0,
            gb_tiling_config: 4 << 1,
            flags: CreateFlags::empty(),
        });
        assert!(matches!(result, Err(TilingError::InvalidParams)));
    }

    #[test]
    fn geometry_accessors() {
        let tiler = tiler();
        assert_eq!(ChipFamily::R7xx, tiler.chip_family());
        assert_eq!(4, tiler.pipes());
        assert_eq!(4, tiler.banks());
        assert_eq!(256, tiler.pipe_interleave_bytes());
        assert_eq!(2048, tiler.row_size());
        assert_eq!(256, tiler.bank_swap_size());
        assert_eq!(2048, tiler.sample_split_size());
    }

    #[test]
    fn linear_1d_texture() {
        let info = tiler()
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::LinearAligned,
                format: SurfaceFormat::FMT_8_8_8_8,
                width: 128,
                height: 1,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(TileMode::LinearAligned, info.tile_mode);
        assert_eq!(128, info.pitch);
        assert_eq!(1, info.height);
        assert_eq!(512, info.surf_size);
        assert_eq!(64, info.pitch_align);
        assert_eq!(256, info.base_align);
        assert_eq!(512, info.slice_size);
        assert_eq!(32, info.bpp);
    }

    #[test]
    fn micro_tiled_color_base_level() {
        let info = tiler()
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::Tiled1DThin1,
                format: SurfaceFormat::FMT_8_8_8_8,
                width: 65,
                height: 65,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(TileMode::Tiled1DThin1, info.tile_mode);
        assert_eq!(8, info.pitch_align);
        assert_eq!(8, info.height_align);
        assert_eq!(72, info.pitch);
        assert_eq!(72, info.height);
        assert_eq!(72 * 72 * 4, info.surf_size);
        assert_eq!(256, info.base_align);
        assert_eq!(8, info.pitch_tile_max);
        assert_eq!(8, info.height_tile_max);
        assert_eq!(71, info.slice_tile_max);
    }

    #[test]
    fn small_mip_degrades_to_micro_tiled() {
        let info = tiler()
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::Tiled2DThin1,
                format: SurfaceFormat::FMT_8_8_8_8,
                width: 16,
                height: 16,
                mip_level: 3,
                flags: SurfaceFlags::INPUT_BASE_MAP,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(TileMode::Tiled1DThin1, info.tile_mode);
        assert_eq!(8, info.pitch);
        assert_eq!(8, info.height);
    }

    #[test]
    fn stereo_doubles_height_and_size() {
        let info = tiler()
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::LinearAligned,
                format: SurfaceFormat::FMT_8_8_8_8,
                width: 128,
                height: 64,
                flags: SurfaceFlags::QB_STEREO,
                ..Default::default()
            })
            .unwrap();

        let stereo = info.stereo.unwrap();
        assert_eq!(64, stereo.eye_height);
        assert_eq!(128 * 64 * 4, stereo.right_offset);
        assert_eq!(128, info.height);
        assert_eq!(128, info.pixel_height);
        assert_eq!(128 * 64 * 4 * 2, info.surf_size);
    }

    #[test]
    fn linear_width_workaround_triples_pitch() {
        let info = tiler()
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::LinearAligned,
                format: SurfaceFormat::FMT_32_32_32_FLOAT,
                bpp: 96,
                width: 100,
                height: 1,
                ..Default::default()
            })
            .unwrap();

        // 100 pixels expand to 300 elements; padding runs on the
        // power-of-two single-element width and the result is re-tripled.
        assert_eq!(384, info.pitch);
        assert_eq!(128, info.pixel_pitch);
        assert_eq!(32, info.bpp);
        assert_eq!(96, info.pixel_bits);
    }

    #[test]
    fn block_compressed_mip_reduction() {
        let info = tiler()
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::Tiled1DThin1,
                format: SurfaceFormat::FMT_BC1,
                width: 128,
                height: 128,
                mip_level: 2,
                flags: SurfaceFlags::INPUT_BASE_MAP,
                ..Default::default()
            })
            .unwrap();

        // 128 pixels -> 32 at mip 2 -> 8 blocks, padded to the 8-wide
        // micro tile.
        assert_eq!(8, info.pitch);
        assert_eq!(8, info.height);
        assert_eq!(64, info.bpp);
        // Pixel-space dimensions scale back to the block grid.
        assert_eq!(32, info.pixel_pitch);
        assert_eq!(32, info.pixel_height);
    }

    #[test]
    fn volume_slice_size_is_whole_surface() {
        let info = tiler()
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::Tiled1DThin1,
                format: SurfaceFormat::FMT_8_8_8_8,
                width: 32,
                height: 32,
                num_slices: 8,
                flags: SurfaceFlags::VOLUME,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(info.surf_size as u32, info.slice_size);
    }

    #[test]
    fn packed_slice_size_mode() {
        let tiler = tiler_with_flags(CreateFlags::SLICE_SIZE_COMPUTING);
        let info = tiler
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::Tiled1DThin1,
                format: SurfaceFormat::FMT_8_8_8_8,
                width: 32,
                height: 32,
                num_slices: 8,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(32 * 32 * 4, info.slice_size);
    }

    #[test]
    fn last_slice_absorbs_tail_padding() {
        // A thick surface pads its slice count to the tile thickness; the
        // last slice of the clipped range accounts for the padded tail.
        let tiler = tiler();
        let base = SurfaceInfoRequest {
            tile_mode: TileMode::Tiled1DThick,
            format: SurfaceFormat::FMT_8_8_8_8,
            width: 32,
            height: 32,
            num_slices: 6,
            ..Default::default()
        };

        let first = tiler
            .surface_info(&SurfaceInfoRequest { slice: 0, ..base })
            .unwrap();
        let last = tiler
            .surface_info(&SurfaceInfoRequest { slice: 5, ..base })
            .unwrap();

        assert_eq!(TileMode::Tiled1DThick, first.tile_mode);
        assert_eq!(8, first.depth);
        assert_eq!(first.slice_size * 3, last.slice_size);
    }

    #[test]
    fn rejects_oversized_bpp_and_missing_format() {
        let tiler = tiler();

        let result = tiler.surface_info(&SurfaceInfoRequest {
            bpp: 256,
            ..Default::default()
        });
        assert!(matches!(result, Err(TilingError::InvalidParams)));

        let result = tiler.surface_info(&SurfaceInfoRequest {
            format: SurfaceFormat::INVALID,
            bpp: 0,
            width: 16,
            height: 16,
            ..Default::default()
        });
        assert!(matches!(result, Err(TilingError::InvalidParams)));

        // An unlisted format value classifies to zero bits per element.
        let result = tiler.surface_info(&SurfaceInfoRequest {
            format: SurfaceFormat(0x24),
            width: 16,
            height: 16,
            ..Default::default()
        });
        assert!(matches!(result, Err(TilingError::InvalidParams)));
    }

    #[test]
    fn linear_addresses_match_closed_form() {
        let tiler = tiler();

        let info = tiler
            .surface_info(&SurfaceInfoRequest {
                tile_mode: TileMode::LinearAligned,
                format: SurfaceFormat::FMT_8_8,
                width: 70,
                height: 20,
                num_slices: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(TileMode::LinearAligned, info.tile_mode);

        for (x, y, slice) in [(0, 0, 0), (5, 3, 0), (69, 19, 2), (0, 19, 1)] {
            let addr = tiler
                .surface_addr(&SurfaceAddrRequest {
                    x,
                    y,
                    slice,
                    bpp: info.bpp,
                    pitch: info.pitch,
                    height: info.height,
                    num_slices: info.depth,
                    tile_mode: info.tile_mode,
                    ..Default::default()
                })
                .unwrap();

            let bits = u64::from(slice) * u64::from(info.pitch) * u64::from(info.height)
                * u64::from(info.bpp)
                + u64::from(y) * u64::from(info.pitch) * u64::from(info.bpp)
                + u64::from(x) * u64::from(info.bpp);
            assert_eq!(bits / 8, addr.addr);
            assert_eq!((bits % 8) as u32, addr.bit_position);
        }
    }

    #[test]
    fn alignment_invariants_hold_across_modes() {
        let tiler = tiler();

        let modes = [
            TileMode::LinearAligned,
            TileMode::Tiled1DThin1,
            TileMode::Tiled2DThin1,
            TileMode::Tiled2DThin2,
            TileMode::Tiled2BThin1,
            TileMode::Tiled3DThin1,
            TileMode::Tiled2DThick,
        ];
        let formats = [
            SurfaceFormat::FMT_8,
            SurfaceFormat::FMT_8_8,
            SurfaceFormat::FMT_8_8_8_8,
            SurfaceFormat::FMT_16_16_16_16,
            SurfaceFormat::FMT_32_32_32_32_FLOAT,
            SurfaceFormat::FMT_BC1,
            SurfaceFormat::FMT_BC3,
        ];

        for tile_mode in modes {
            for format in formats {
                for (width, height) in [(64, 64), (65, 33), (257, 129), (1000, 600)] {
                    let info = tiler
                        .surface_info(&SurfaceInfoRequest {
                            tile_mode,
                            format,
                            width,
                            height,
                            num_slices: 8,
                            ..Default::default()
                        })
                        .unwrap();

                    let label = format!("{tile_mode:?} {format:?} {width}x{height}");
                    assert_ne!(0, info.pitch_align, "{label}");
                    assert_eq!(0, info.pitch % info.pitch_align, "{label}");
                    assert_eq!(0, info.height % info.height_align, "{label}");
                    assert_eq!(0, info.depth % info.depth_align, "{label}");
                    assert_eq!(info.depth_align, info.tile_mode.thickness(), "{label}");

                    let payload = bits_to_bytes(
                        u64::from(info.height)
                            * u64::from(info.pitch)
                            * u64::from(info.depth)
                            * u64::from(info.bpp),
                    );
                    assert_eq!(payload, info.surf_size, "{label}");
                }
            }
        }
    }

    #[test]
    fn htile_linear_scenario() {
        let info = tiler()
            .htile_info(&HtileRequest {
                pitch: 1024,
                height: 1024,
                num_slices: 1,
                is_linear: true,
                block_width: HtileBlockSize::Eight,
                block_height: HtileBlockSize::Eight,
                tile_index: -1,
                tile_info: None,
            })
            .unwrap();

        assert_eq!(32, info.bpp);
        assert_eq!(128, info.macro_width);
        assert_eq!(32, info.macro_height);
        assert_eq!(1024, info.pitch);
        assert_eq!(1024, info.height);
        assert_eq!(8192, info.base_align);
        assert_eq!(65536, info.htile_bytes);
        assert_eq!(0, info.htile_bytes % u64::from(info.base_align));
    }

    #[test]
    fn htile_tiled_uses_cache_shape() {
        let info = tiler()
            .htile_info(&HtileRequest {
                pitch: 100,
                height: 100,
                num_slices: 1,
                is_linear: false,
                block_width: HtileBlockSize::Eight,
                block_height: HtileBlockSize::Eight,
                tile_index: -1,
                tile_info: None,
            })
            .unwrap();

        // The 16K-bit cache folds to 64x8 lines: 512x256 pixel macro dims.
        assert_eq!(512, info.macro_width);
        assert_eq!(256, info.macro_height);
        assert_eq!(512, info.pitch);
        assert_eq!(256, info.height);
        assert_eq!(1024, info.base_align);
        assert_eq!(8192, info.htile_bytes);
    }

    #[test]
    fn swizzle_round_trip_through_base_address() {
        let tiler = tiler();

        // pipe 2, bank 1 at a 256B interleave: base256b = pipe + pipes*bank.
        let swizzle = tiler.bank_pipe_swizzle(2 + 4);
        assert_eq!(2, swizzle.pipe_swizzle);
        assert_eq!(1, swizzle.bank_swizzle);
    }

    #[test]
    fn slice_swizzle_is_zero_for_non_macro() {
        let tiler = tiler();
        let swizzle = tiler
            .slice_swizzle(&SliceSwizzleRequest {
                tile_mode: TileMode::LinearAligned,
                base_swizzle: 5,
                slice: 3,
                base_addr: 0x12345600,
                tile_index: -1,
                tile_info: None,
            })
            .unwrap();
        assert_eq!(0, swizzle);
    }
}
