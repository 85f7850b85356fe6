//! The seam between the family-independent driver and a hardware layer.
//!
//! The driver in `lib.rs` owns request validation, format translation, and
//! result finalization. Everything that depends on the memory controller
//! geometry of a particular chip family goes through [`HwlEngine`]. The
//! R6xx/R7xx engine is the only implementation; a future family plugs in
//! another without touching the driver.

use bitflags::bitflags;

use crate::math::{is_pow2, next_pow2, pad_align, pow2_align};
use crate::surface::{
    BankPipeSwizzle, SliceSwizzleRequest, SurfaceAddrRequest, SurfaceAddress, SurfaceFlags,
    SurfaceInfo, SurfaceInfoRequest, TileInfo,
};
use crate::tile::TileMode;
use crate::{ChipFamily, TilingError};

bitflags! {
    /// Instance-wide configuration, fixed at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct ConfigFlags: u32 {
        const FORCE_LINEAR_ALIGNED = 1 << 0;
        /// Derived from the row configuration of the hardware register.
        const OPTIMAL_BANK_SWAP = 1 << 1;
        /// Set unconditionally for this family: multisampled surfaces may
        /// not stay 1D tiled.
        const NO_1D_TILED_MSAA = 1 << 2;
        const NO_CUBE_MIP_SLICES_PAD = 1 << 3;
        const FILL_SIZE_FIELDS = 1 << 4;
        const USE_TILE_INDEX = 1 << 5;
        const USE_TILE_CAPS = 1 << 6;
    }
}

/// The capability set a hardware layer supplies to the driver.
pub(crate) trait HwlEngine {
    fn chip_family(&self) -> ChipFamily;
    fn chip_revision(&self) -> u32;
    fn config_flags(&self) -> ConfigFlags;
    /// Slice-size policy selector (see the finalization step).
    fn slice_size_mode(&self) -> u32;

    fn pipes(&self) -> u32;
    fn banks(&self) -> u32;
    fn pipe_interleave_bytes(&self) -> u32;
    fn row_size(&self) -> u32;
    fn swap_size(&self) -> u32;
    fn split_size(&self) -> u32;

    /// Gives the hardware layer first refusal on mip-level reduction.
    /// Returns true when the request was fully handled.
    fn compute_mip_level(&self, req: &mut SurfaceInfoRequest) -> bool;

    /// Maps a tile index to explicit tile parameters. A no-op on families
    /// that don't use indexed tile configurations.
    fn setup_tile_cfg(&self, tile_index: i32, tile_info: Option<&mut TileInfo>)
        -> Result<(), TilingError>;

    fn compute_surface_info(
        &self,
        req: &SurfaceInfoRequest,
        out: &mut SurfaceInfo,
    ) -> Result<(), TilingError>;

    fn compute_surface_addr(&self, req: &SurfaceAddrRequest)
        -> Result<SurfaceAddress, TilingError>;

    fn extract_bank_pipe_swizzle(&self, base256b: u32) -> BankPipeSwizzle;

    fn htile_bpp(&self, is_width8: bool, is_height8: bool) -> u32;
    fn htile_base_align(&self, is_linear: bool, pipes: u32) -> u32;
    fn htile_bytes(
        &self,
        pitch: u32,
        height: u32,
        bpp: u32,
        is_linear: bool,
        num_slices: u32,
        base_align: u32,
    ) -> u64;
    /// Cache shape for linear per-tile metadata, in pixels.
    fn htile_macro_dims_linear(&self, bpp: u32) -> (u32, u32);

    fn slice_tile_swizzle(&self, req: &SliceSwizzleRequest) -> u32;
}

/// Pads pitch, height, and slice count to their alignments.
///
/// `pad_dims` selects how many dimensions participate (0 means all three).
/// Cube-map slices round to a power of two unless the instance opted out,
/// and thick modes always align slices to the tile thickness.
pub(crate) fn pad_dimensions(
    tile_mode: TileMode,
    flags: SurfaceFlags,
    config: ConfigFlags,
    mut pad_dims: u32,
    pitch: &mut u32,
    pitch_align: u32,
    height: &mut u32,
    height_align: u32,
    slices: &mut u32,
    slice_align: u32,
) -> u32 {
    let thickness = tile_mode.thickness();

    if pad_dims == 0 {
        pad_dims = 3;
    }

    if is_pow2(pitch_align) {
        *pitch = pow2_align(*pitch, pitch_align);
    } else {
        *pitch = pad_align(*pitch, pitch_align);
    }

    if pad_dims > 1 {
        *height = pow2_align(*height, height_align);
    }

    if pad_dims > 2 || thickness > 1 {
        if flags.contains(SurfaceFlags::CUBE)
            && (!config.contains(ConfigFlags::NO_CUBE_MIP_SLICES_PAD)
                || flags.contains(SurfaceFlags::CUBE_AS_ARRAY))
        {
            *slices = next_pow2(*slices);
        }

        if thickness > 1 {
            *slices = pow2_align(*slices, slice_align);
        }
    }

    pad_dims
}

/// Pitch alignment fix-up for scan-out surfaces.
pub(crate) fn adjust_pitch_alignment(flags: SurfaceFlags, pitch_align: &mut u32) {
    if flags.contains(SurfaceFlags::DISPLAY) {
        *pitch_align = pow2_align(*pitch_align, 32);
    }
}

/// Closed-form address of `(x, y, slice, sample)` in a linear surface.
/// Returns the byte address and the bit position inside that byte.
pub(crate) fn linear_addr(
    x: u32,
    y: u32,
    slice: u32,
    sample: u32,
    bpp: u32,
    pitch: u32,
    height: u32,
    num_slices: u32,
) -> (u64, u32) {
    let slice_size = u64::from(pitch) * u64::from(height);

    let slice_offset = slice_size * (u64::from(slice) + u64::from(sample) * u64::from(num_slices));
    let row_offset = u64::from(y) * u64::from(pitch);

    let addr_bits = (slice_offset + row_offset + u64::from(x)) * u64::from(bpp);

    ((addr_bits / 8), (addr_bits % 8) as u32)
}

/// Squared cache shape for per-tile metadata, in pixels.
///
/// Starts from a one-row cache line of `cache_bits / bpp` entries and folds
/// it in half until the width no longer dominates `2 * pipes * height`.
pub(crate) fn tile_data_dims(bpp: u32, cache_bits: u32, pipes: u32) -> (u32, u32) {
    let mut height = 1;
    let mut width = cache_bits / bpp;

    while width > height * 2 * pipes && width % 2 == 0 {
        width /= 2;
        height *= 2;
    }

    (8 * width, 8 * height * pipes)
}
