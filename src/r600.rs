//! The R6xx/R7xx hardware layer.
//!
//! Everything here is parameterized by the memory controller geometry
//! decoded from the tiling-configuration register: pipes, banks, the pipe
//! interleave, row size, bank-swap size, and sample-split size. The layout
//! rules are fixed by the memory controller, so the arithmetic below is
//! contractual down to the bit level.

use log::{debug, trace};

use crate::engine::{
    adjust_pitch_alignment, linear_addr, pad_dimensions, ConfigFlags, HwlEngine,
};
use crate::math::{
    bit, bits_to_bytes, bits_to_bytes32, log2, mip_dim, next_pow2, pow2_align_u64,
};
use crate::surface::{
    BankPipeSwizzle, SliceSwizzleRequest, SurfaceAddrRequest, SurfaceAddress, SurfaceFlags,
    SurfaceInfo, SurfaceInfoRequest, TileInfo,
};
use crate::tile::{
    pixel_index_in_micro_tile, TileMode, TileType, HTILE_CACHE_BITS, MICRO_TILE_HEIGHT,
    MICRO_TILE_PIXELS, MICRO_TILE_WIDTH, THICK_TILE_THICKNESS,
};
use crate::{ChipFamily, CreateFlags, CreateParams, TilingError};

/// Bank permutation applied when a bank-swapped surface crosses a swap
/// boundary along the pitch. Only the first `banks` entries are reachable;
/// indexing masks with `banks - 1`.
const BANK_SWAP_ORDER: [u32; 10] = [0, 1, 3, 2, 6, 7, 5, 4, 0, 0];

/// The tiling-configuration register, decoded positionally.
///
/// Layout, LSB first: 1 unused bit, pipe-tiling:3, bank-tiling:2,
/// group-size:2, row-tiling:3, bank-swaps:3, sample-split:2,
/// backend-map:16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TilingConfig {
    pub pipes: u32,
    pub banks: u32,
    pub pipe_interleave_bytes: u32,
    pub row_size: u32,
    pub swap_size: u32,
    pub split_size: u32,
    pub optimal_bank_swap: bool,
    pub backend_map: u32,
}

impl TilingConfig {
    pub(crate) fn decode(value: u32) -> Option<Self> {
        let pipe_tiling = (value >> 1) & 0x7;
        let bank_tiling = (value >> 4) & 0x3;
        let group_size = (value >> 6) & 0x3;
        let row_tiling = (value >> 8) & 0x7;
        let bank_swaps = (value >> 11) & 0x7;
        let sample_split = (value >> 14) & 0x3;
        let backend_map = value >> 16;

        let pipes = match pipe_tiling {
            0 => 1,
            1 => 2,
            2 => 4,
            3 => 8,
            _ => return None,
        };

        let banks = match bank_tiling {
            0 => 4,
            1 => 8,
            _ => return None,
        };

        let pipe_interleave_bytes = match group_size {
            0 => 256,
            1 => 512,
            _ => return None,
        };

        // Row values 4..=7 select the same row sizes with the optimized
        // bank-swap address mapping. The flag is written either way.
        let row_size = 1024 << (row_tiling & 0x3);
        let optimal_bank_swap = row_tiling >= 4;

        let swap_size = match bank_swaps {
            0 => 128,
            1 => 256,
            2 => 512,
            3 => 1024,
            _ => return None,
        };

        let split_size = 1024 << sample_split;

        Some(Self {
            pipes,
            banks,
            pipe_interleave_bytes,
            row_size,
            swap_size,
            split_size,
            optimal_bank_swap,
            backend_map,
        })
    }
}

fn convert_chip_family(chip_family: u32) -> Option<ChipFamily> {
    match chip_family {
        // RV620, RV635, RV670, RV680
        0x46 | 0x47 | 0x48 | 0x4b => Some(ChipFamily::R6xx),
        // RV710, RV730, RV740
        0x51 | 0x52 | 0x55 => Some(ChipFamily::R7xx),
        _ => None,
    }
}

pub(crate) struct R600Engine {
    chip_family: ChipFamily,
    chip_revision: u32,
    flags: ConfigFlags,
    slice_size_mode: u32,
    pipes: u32,
    banks: u32,
    pipe_interleave_bytes: u32,
    row_size: u32,
    swap_size: u32,
    split_size: u32,
}

impl R600Engine {
    pub(crate) fn new(params: &CreateParams) -> Result<Self, TilingError> {
        let chip_family =
            convert_chip_family(params.chip_family).ok_or(TilingError::NotSupported)?;

        let mut flags = ConfigFlags::NO_1D_TILED_MSAA;
        flags.set(
            ConfigFlags::FORCE_LINEAR_ALIGNED,
            params.flags.contains(CreateFlags::FORCE_LINEAR_ALIGNED),
        );
        flags.set(
            ConfigFlags::NO_CUBE_MIP_SLICES_PAD,
            params.flags.contains(CreateFlags::NO_CUBE_MIP_SLICES_PAD)
                || chip_family == ChipFamily::R6xx,
        );
        flags.set(
            ConfigFlags::FILL_SIZE_FIELDS,
            params.flags.contains(CreateFlags::FILL_SIZE_FIELDS),
        );
        flags.set(
            ConfigFlags::USE_TILE_INDEX,
            params.flags.contains(CreateFlags::USE_TILE_INDEX),
        );
        flags.set(
            ConfigFlags::USE_TILE_CAPS,
            params.flags.contains(CreateFlags::USE_TILE_CAPS),
        );

        let config =
            TilingConfig::decode(params.gb_tiling_config).ok_or(TilingError::InvalidParams)?;
        flags.set(ConfigFlags::OPTIMAL_BANK_SWAP, config.optimal_bank_swap);

        debug!(
            "tiling config: {} pipes, {} banks, {}B interleave, {}B rows, {}B swap, {}B split",
            config.pipes,
            config.banks,
            config.pipe_interleave_bytes,
            config.row_size,
            config.swap_size,
            config.split_size,
        );

        Ok(Self {
            chip_family,
            chip_revision: params.chip_revision,
            flags,
            slice_size_mode: u32::from(params.flags.contains(CreateFlags::SLICE_SIZE_COMPUTING)),
            pipes: config.pipes,
            banks: config.banks,
            pipe_interleave_bytes: config.pipe_interleave_bytes,
            row_size: config.row_size,
            swap_size: config.swap_size,
            split_size: config.split_size,
        })
    }

    /// Micro-tile pixel order for addressing: depth surfaces use the
    /// non-displayable order, color surfaces the displayable one.
    fn tile_type(is_depth: bool) -> TileType {
        if is_depth {
            TileType::NonDisplayable
        } else {
            TileType::Displayable
        }
    }

    /// Width-to-height shape of the macro tile for a mode.
    fn macro_tile_aspect_ratio(tile_mode: TileMode) -> u32 {
        match tile_mode {
            TileMode::Tiled2DThin2 | TileMode::Tiled2BThin2 => 2,
            TileMode::Tiled2DThin4 | TileMode::Tiled2BThin4 => 4,
            _ => 1,
        }
    }

    /// Per-slice bank/pipe rotation of a macro-tiled mode.
    fn rotation(&self, tile_mode: TileMode) -> u32 {
        match tile_mode {
            TileMode::Tiled2DThin1
            | TileMode::Tiled2DThin2
            | TileMode::Tiled2DThin4
            | TileMode::Tiled2DThick
            | TileMode::Tiled2BThin1
            | TileMode::Tiled2BThin2
            | TileMode::Tiled2BThin4
            | TileMode::Tiled2BThick => self.pipes * ((self.banks >> 1) - 1),
            TileMode::Tiled3DThin1
            | TileMode::Tiled3DThick
            | TileMode::Tiled3BThin1
            | TileMode::Tiled3BThick => {
                if self.pipes >= 4 {
                    (self.pipes >> 1) - 1
                } else {
                    1
                }
            }
            _ => 0,
        }
    }

    /// Number of slices a micro tile splits into when its sample data
    /// exceeds the split size. Thick modes budget for 4 samples.
    fn surface_tile_slices(&self, tile_mode: TileMode, bpp: u32, num_samples: u32) -> u32 {
        let bytes_per_sample = bits_to_bytes32(bpp * MICRO_TILE_PIXELS);
        let num_samples = if tile_mode.thickness() > 1 { 4 } else { num_samples };
        let mut tile_slices = 1;

        if bytes_per_sample != 0 {
            let samples_per_tile = self.split_size / bytes_per_sample;
            if samples_per_tile != 0 {
                tile_slices = (num_samples / samples_per_tile).max(1);
            }
        }

        tile_slices
    }

    /// First stage of tile-mode degradation: thick and split-constrained
    /// modes fall back towards their thin equivalents.
    fn degrade_thick_tile_mode(
        &self,
        tile_mode: TileMode,
        num_samples: u32,
        tile_slices: u32,
        is_depth: bool,
    ) -> TileMode {
        match tile_mode {
            TileMode::Tiled1DThin1 => {
                if num_samples > 1 && self.flags.contains(ConfigFlags::NO_1D_TILED_MSAA) {
                    TileMode::Tiled2DThin1
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled1DThick => {
                let mode = if num_samples > 1 || is_depth {
                    TileMode::Tiled1DThin1
                } else {
                    tile_mode
                };
                if num_samples == 2 || num_samples == 4 {
                    TileMode::Tiled2DThick
                } else {
                    mode
                }
            }
            TileMode::Tiled2DThin2 => {
                if 2 * self.pipe_interleave_bytes > self.split_size {
                    TileMode::Tiled2DThin1
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled2DThin4 => {
                if 4 * self.pipe_interleave_bytes > self.split_size {
                    TileMode::Tiled2DThin2
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled2BThin2 => {
                if 2 * self.pipe_interleave_bytes > self.split_size {
                    TileMode::Tiled2BThin1
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled2BThin4 => {
                if 4 * self.pipe_interleave_bytes > self.split_size {
                    TileMode::Tiled2BThin2
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled2DThick => {
                if num_samples > 1 || tile_slices > 1 || is_depth {
                    TileMode::Tiled2DThin1
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled2BThick => {
                if num_samples > 1 || tile_slices > 1 || is_depth {
                    TileMode::Tiled2BThin1
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled3DThick => {
                if num_samples > 1 || tile_slices > 1 || is_depth {
                    TileMode::Tiled3DThin1
                } else {
                    tile_mode
                }
            }
            TileMode::Tiled3BThick => {
                if num_samples > 1 || tile_slices > 1 || is_depth {
                    TileMode::Tiled3BThin1
                } else {
                    tile_mode
                }
            }
            _ => tile_mode,
        }
    }

    /// Full degradation decision tree for a mip level.
    ///
    /// Applies the thick degradation, demotes 3D modes whose rotation is a
    /// multiple of the pipe count, and for sub-levels shrinks macro modes
    /// that no longer fill a macro tile, recursing once to settle.
    #[allow(clippy::too_many_arguments)]
    fn mip_level_tile_mode(
        &self,
        base_tile_mode: TileMode,
        bpp: u32,
        level: u32,
        width: u32,
        height: u32,
        num_slices: u32,
        num_samples: u32,
        is_depth: bool,
        no_recursive: bool,
    ) -> TileMode {
        let tile_slices = self.surface_tile_slices(base_tile_mode, bpp, num_samples);
        let mut tile_mode =
            self.degrade_thick_tile_mode(base_tile_mode, num_samples, tile_slices, is_depth);
        let rotation = self.rotation(tile_mode);

        if rotation % self.pipes == 0 {
            tile_mode = match tile_mode {
                TileMode::Tiled3DThin1 => TileMode::Tiled2DThin1,
                TileMode::Tiled3DThick => TileMode::Tiled2DThick,
                TileMode::Tiled3BThin1 => TileMode::Tiled2BThin1,
                TileMode::Tiled3BThick => TileMode::Tiled2BThick,
                other => other,
            };
        }

        if no_recursive || level == 0 {
            return tile_mode;
        }

        let bpp = match bpp {
            24 | 48 | 96 => bpp / 3,
            other => other,
        };

        let width = next_pow2(width);
        let height = next_pow2(height);
        let num_slices = next_pow2(num_slices);

        tile_mode = tile_mode.without_bank_swap();

        let thickness = tile_mode.thickness();
        let micro_tile_bytes =
            bits_to_bytes32(num_samples * bpp * thickness * MICRO_TILE_PIXELS);
        let width_align_factor = if micro_tile_bytes <= self.pipe_interleave_bytes {
            self.pipe_interleave_bytes / micro_tile_bytes
        } else {
            1
        };

        let mut macro_tile_width = MICRO_TILE_WIDTH * self.banks;
        let mut macro_tile_height = MICRO_TILE_HEIGHT * self.pipes;

        // Reduce from macro to 1D tiling when a mip no longer fills the
        // macro tile.
        match tile_mode {
            TileMode::Tiled2DThin1 | TileMode::Tiled3DThin1 => {
                if width < width_align_factor * macro_tile_width || height < macro_tile_height {
                    tile_mode = TileMode::Tiled1DThin1;
                }
            }
            TileMode::Tiled2DThin2 => {
                macro_tile_width >>= 1;
                macro_tile_height *= 2;
                if width < width_align_factor * macro_tile_width || height < macro_tile_height {
                    tile_mode = TileMode::Tiled1DThin1;
                }
            }
            TileMode::Tiled2DThin4 => {
                macro_tile_width >>= 2;
                macro_tile_height *= 4;
                if width < width_align_factor * macro_tile_width || height < macro_tile_height {
                    tile_mode = TileMode::Tiled1DThin1;
                }
            }
            TileMode::Tiled2DThick | TileMode::Tiled3DThick => {
                if width < width_align_factor * macro_tile_width || height < macro_tile_height {
                    tile_mode = TileMode::Tiled1DThick;
                }
            }
            _ => (),
        }

        if num_slices < 4 {
            tile_mode = match tile_mode {
                TileMode::Tiled1DThick => TileMode::Tiled1DThin1,
                TileMode::Tiled2DThick => TileMode::Tiled2DThin1,
                TileMode::Tiled3DThick => TileMode::Tiled3DThin1,
                other => other,
            };
        }

        self.mip_level_tile_mode(
            tile_mode,
            bpp,
            level,
            width,
            height,
            num_slices,
            num_samples,
            is_depth,
            true,
        )
    }

    fn alignments_linear(
        &self,
        tile_mode: TileMode,
        bpp: u32,
        flags: SurfaceFlags,
    ) -> (u32, u32, u32) {
        let (base_align, mut pitch_align, height_align) = match tile_mode {
            TileMode::LinearGeneral => (1, if bpp != 1 { 1 } else { 8 }, 1),
            TileMode::LinearAligned => (
                self.pipe_interleave_bytes,
                ((8 * self.pipe_interleave_bytes) / bpp).max(64),
                1,
            ),
            _ => (1, 1, 1),
        };

        adjust_pitch_alignment(flags, &mut pitch_align);
        (base_align, pitch_align, height_align)
    }

    fn alignments_micro_tiled(
        &self,
        tile_mode: TileMode,
        bpp: u32,
        flags: SurfaceFlags,
        num_samples: u32,
    ) -> (u32, u32, u32) {
        let bpp = match bpp {
            24 | 48 | 96 => bpp / 3,
            other => other,
        };

        let thickness = tile_mode.thickness();
        let mut pitch_align =
            (self.pipe_interleave_bytes / bpp / num_samples / thickness).max(8);

        adjust_pitch_alignment(flags, &mut pitch_align);
        (self.pipe_interleave_bytes, pitch_align, 8)
    }

    fn dual_base_align_needed(&self, tile_mode: TileMode) -> bool {
        self.chip_family == ChipFamily::R6xx && tile_mode as u32 > TileMode::Tiled1DThick as u32
    }

    /// Alignments plus macro-tile dimensions for a macro-tiled mode.
    fn alignments_macro_tiled(
        &self,
        tile_mode: TileMode,
        bpp: u32,
        flags: SurfaceFlags,
        num_samples: u32,
    ) -> (u32, u32, u32, u32, u32) {
        let aspect_ratio = Self::macro_tile_aspect_ratio(tile_mode);
        let thickness = tile_mode.thickness();

        let bpp = match bpp {
            24 | 48 | 96 => bpp / 3,
            other => other,
        };
        let bpp = if bpp == 3 { 1 } else { bpp };

        let macro_tile_width = MICRO_TILE_WIDTH * self.banks / aspect_ratio;
        let macro_tile_height = aspect_ratio * MICRO_TILE_HEIGHT * self.pipes;
        let mut pitch_align = macro_tile_width.max(
            macro_tile_width
                * (self.pipe_interleave_bytes / bpp / (8 * thickness) / num_samples),
        );
        let height_align = macro_tile_height;

        let mut macro_tile_bytes =
            num_samples * bits_to_bytes32(bpp * macro_tile_height * macro_tile_width);

        if self.chip_family == ChipFamily::R6xx && num_samples == 1 {
            macro_tile_bytes *= 2;
        }

        let mut base_align = if thickness == 1 {
            macro_tile_bytes.max(bits_to_bytes(
                u64::from(num_samples) * u64::from(height_align) * u64::from(bpp)
                    * u64::from(pitch_align),
            ) as u32)
        } else {
            self.pipe_interleave_bytes.max(bits_to_bytes(
                4 * u64::from(height_align) * u64::from(bpp) * u64::from(pitch_align),
            ) as u32)
        };

        let micro_tile_bytes =
            bits_to_bytes32(thickness * num_samples * bpp * MICRO_TILE_PIXELS);
        let num_slices_per_micro_tile = if micro_tile_bytes >= self.split_size {
            micro_tile_bytes / self.split_size
        } else {
            1
        };

        base_align /= num_slices_per_micro_tile;

        if self.dual_base_align_needed(tile_mode) {
            let macro_bytes = bits_to_bytes32(bpp * macro_tile_height * macro_tile_width);

            if (base_align / macro_bytes) % 2 != 0 {
                base_align += macro_bytes;
            }
        }

        adjust_pitch_alignment(flags, &mut pitch_align);
        (
            base_align,
            pitch_align,
            height_align,
            macro_tile_width,
            macro_tile_height,
        )
    }

    fn dual_pitch_align_needed(&self, tile_mode: TileMode, is_depth: bool, mip_level: u32) -> bool {
        if is_depth || mip_level != 0 || self.chip_family != ChipFamily::R6xx {
            return false;
        }

        !matches!(
            tile_mode,
            TileMode::LinearGeneral
                | TileMode::LinearAligned
                | TileMode::Tiled1DThin1
                | TileMode::Tiled1DThick
                | TileMode::Tiled2DThick
                | TileMode::Tiled2BThick
                | TileMode::Tiled3DThick
                | TileMode::Tiled3BThick
        )
    }

    /// Width in pixels after which a bank-swapped surface permutes its
    /// banks. Zero for non-swapped modes.
    fn bank_swapped_width(
        &self,
        tile_mode: TileMode,
        bpp: u32,
        mut num_samples: u32,
        pitch: u32,
    ) -> u32 {
        let bytes_per_sample = 8 * bpp;
        let mut slices_per_tile = 1;

        if bytes_per_sample != 0 && self.split_size / bytes_per_sample != 0 {
            let samples_per_tile = self.split_size / bytes_per_sample;
            slices_per_tile = (num_samples / samples_per_tile).max(1);
        }

        if tile_mode.is_thick_macro_tiled() {
            num_samples = 4;
        }

        let bytes_per_tile_slice = num_samples * bytes_per_sample / slices_per_tile;

        if !tile_mode.is_bank_swapped() {
            return 0;
        }

        let factor = Self::macro_tile_aspect_ratio(tile_mode);
        let swap_tiles = ((self.swap_size >> 1) / bpp).max(1);
        let swap_width = swap_tiles * MICRO_TILE_WIDTH * self.banks;
        let height_bytes = num_samples * factor * self.pipes * bpp / slices_per_tile;
        let swap_max = self.pipes * self.banks * self.row_size / height_bytes;
        let swap_min = self.pipe_interleave_bytes * MICRO_TILE_WIDTH * self.banks
            / bytes_per_tile_slice;

        let mut bank_swap_width = swap_max.min(swap_min.max(swap_width));

        while bank_swap_width >= 2 * pitch && bank_swap_width != 0 {
            bank_swap_width >>= 1;
        }

        bank_swap_width
    }

    fn surface_info_linear(
        &self,
        req: &SurfaceInfoRequest,
        out: &mut SurfaceInfo,
        mut pad_dims: u32,
        tile_mode: TileMode,
    ) -> Result<(), TilingError> {
        let thickness = tile_mode.thickness();
        let mut pitch = req.width;
        let mut height = req.height;
        let mut num_slices = req.num_slices;
        let num_samples = req.num_samples;
        let mip_level = req.mip_level;
        let bpp = req.bpp;

        let (base_align, pitch_align, height_align) =
            self.alignments_linear(tile_mode, bpp, req.flags);
        out.base_align = base_align;
        out.pitch_align = pitch_align;
        out.height_align = height_align;

        let linear_wa = req.flags.contains(SurfaceFlags::LINEAR_WA);

        if linear_wa && mip_level == 0 {
            pitch = next_pow2(pitch / 3);
        }

        if mip_level > 0 {
            pitch = next_pow2(pitch);
            height = next_pow2(height);

            if req.flags.contains(SurfaceFlags::CUBE) {
                pad_dims = if num_slices <= 1 { 2 } else { 0 };
            } else {
                num_slices = next_pow2(num_slices);
            }
        }

        pad_dimensions(
            tile_mode,
            req.flags,
            self.flags,
            pad_dims,
            &mut pitch,
            out.pitch_align,
            &mut height,
            out.height_align,
            &mut num_slices,
            thickness,
        );

        if linear_wa && mip_level == 0 {
            pitch *= 3;
        }

        let slices = num_slices / thickness;
        out.surf_size = bits_to_bytes(
            u64::from(height)
                * u64::from(pitch)
                * u64::from(slices)
                * u64::from(bpp)
                * u64::from(num_samples),
        );

        out.pitch = pitch;
        out.height = height;
        out.depth = num_slices;
        out.depth_align = thickness;
        out.tile_mode = tile_mode;
        Ok(())
    }

    fn surface_info_micro_tiled(
        &self,
        req: &SurfaceInfoRequest,
        out: &mut SurfaceInfo,
        mut pad_dims: u32,
        mut tile_mode: TileMode,
    ) -> Result<(), TilingError> {
        let mut thickness = tile_mode.thickness();
        let mut pitch = req.width;
        let mut height = req.height;
        let mut num_slices = req.num_slices;
        let num_samples = req.num_samples;
        let mip_level = req.mip_level;
        let bpp = req.bpp;

        if mip_level > 0 {
            pitch = next_pow2(pitch);
            height = next_pow2(height);

            if req.flags.contains(SurfaceFlags::CUBE) {
                pad_dims = if num_slices <= 1 { 2 } else { 0 };
            } else {
                num_slices = next_pow2(num_slices);
            }

            if tile_mode == TileMode::Tiled1DThick && num_slices < 4 {
                tile_mode = TileMode::Tiled1DThin1;
                thickness = 1;
            }
        }

        let (base_align, pitch_align, height_align) =
            self.alignments_micro_tiled(tile_mode, bpp, req.flags, num_samples);
        out.base_align = base_align;
        out.pitch_align = pitch_align;
        out.height_align = height_align;

        pad_dimensions(
            tile_mode,
            req.flags,
            self.flags,
            pad_dims,
            &mut pitch,
            out.pitch_align,
            &mut height,
            out.height_align,
            &mut num_slices,
            thickness,
        );

        out.surf_size = bits_to_bytes(
            u64::from(height)
                * u64::from(pitch)
                * u64::from(num_slices)
                * u64::from(bpp)
                * u64::from(num_samples),
        );

        out.pitch = pitch;
        out.height = height;
        out.depth = num_slices;
        out.depth_align = thickness;
        out.tile_mode = tile_mode;
        Ok(())
    }

    fn surface_info_macro_tiled(
        &self,
        req: &SurfaceInfoRequest,
        out: &mut SurfaceInfo,
        mut pad_dims: u32,
        mut tile_mode: TileMode,
        base_tile_mode: TileMode,
    ) -> Result<(), TilingError> {
        let mut thickness = tile_mode.thickness();
        let mut pitch = req.width;
        let mut height = req.height;
        let mut num_slices = req.num_slices;
        let num_samples = req.num_samples;
        let mip_level = req.mip_level;
        let bpp = req.bpp;

        if mip_level > 0 {
            pitch = next_pow2(pitch);
            height = next_pow2(height);

            if req.flags.contains(SurfaceFlags::CUBE) {
                pad_dims = if num_slices <= 1 { 2 } else { 0 };
            } else {
                num_slices = next_pow2(num_slices);
            }

            if tile_mode == TileMode::Tiled2DThick && num_slices < 4 {
                tile_mode = TileMode::Tiled2DThin1;
                thickness = 1;
            }
        }

        // A sub-level that dropped out of a thick base layout keeps the
        // base mode's footprint requirement; too-small levels fall back to
        // 1D tiling outright.
        if tile_mode != base_tile_mode
            && mip_level != 0
            && base_tile_mode.is_thick_macro_tiled()
            && !tile_mode.is_thick_macro_tiled()
        {
            let (base_align, pitch_align, height_align, _, _) =
                self.alignments_macro_tiled(base_tile_mode, bpp, req.flags, num_samples);
            out.base_align = base_align;
            out.pitch_align = pitch_align;
            out.height_align = height_align;

            let pitch_align_factor = ((self.pipe_interleave_bytes >> 3) / bpp).max(1);

            if pitch < out.pitch_align * pitch_align_factor || height < out.height_align {
                return self.surface_info_micro_tiled(
                    req,
                    out,
                    pad_dims,
                    TileMode::Tiled1DThin1,
                );
            }
        }

        let (base_align, mut pitch_align, height_align, macro_width, macro_height) =
            self.alignments_macro_tiled(tile_mode, bpp, req.flags, num_samples);
        out.base_align = base_align;
        out.height_align = height_align;

        let bank_swapped_width = self.bank_swapped_width(tile_mode, bpp, num_samples, pitch);
        pitch_align = pitch_align.max(bank_swapped_width);

        // Pitch parity fix-up for single-sample color bases on R6xx.
        if self.dual_pitch_align_needed(tile_mode, req.flags.contains(SurfaceFlags::DEPTH), mip_level)
        {
            let tile_per_group = (((self.pipe_interleave_bytes >> 3) / bpp / num_samples)
                / tile_mode.thickness())
            .max(1);

            let even_width = ((pitch - 1) / macro_width) & 1;
            let even_height = ((height - 1) / macro_height) & 1;

            if num_samples == 1
                && tile_per_group == 1
                && even_width == 0
                && (pitch > macro_width || (even_height == 0 && height > macro_height))
            {
                pitch += macro_width;
            }
        }

        pad_dimensions(
            tile_mode,
            req.flags,
            self.flags,
            pad_dims,
            &mut pitch,
            pitch_align,
            &mut height,
            out.height_align,
            &mut num_slices,
            thickness,
        );

        out.surf_size = bits_to_bytes(
            u64::from(height)
                * u64::from(pitch)
                * u64::from(num_slices)
                * u64::from(bpp)
                * u64::from(num_samples),
        );

        out.pitch = pitch;
        out.height = height;
        out.depth = num_slices;
        out.pitch_align = pitch_align;
        out.depth_align = thickness;
        out.tile_mode = tile_mode;
        Ok(())
    }

    fn pipe_from_coord(&self, x: u32, y: u32) -> u32 {
        let (x3, x4, x5) = (bit(x, 3), bit(x, 4), bit(x, 5));
        let (y3, y4, y5) = (bit(y, 3), bit(y, 4), bit(y, 5));

        match self.pipes {
            2 => y3 ^ x3,
            4 => (y3 ^ x4) | ((y4 ^ x3) << 1),
            8 => (y3 ^ x5) | ((y4 ^ x5 ^ x4) << 1) | ((y5 ^ x3) << 2),
            _ => 0,
        }
    }

    fn bank_from_coord(&self, x: u32, y: u32) -> u32 {
        let bank_opt = self.flags.contains(ConfigFlags::OPTIMAL_BANK_SWAP);

        let tx = x / self.banks;
        let ty = y / self.pipes;

        let (x3, x4, x5) = (bit(x, 3), bit(x, 4), bit(x, 5));
        let tx3 = bit(tx, 3);
        let (ty3, ty4, ty5) = (bit(ty, 3), bit(ty, 4), bit(ty, 5));

        match self.banks {
            4 => {
                let mut bank_bit0 = ty4 ^ x3;
                if bank_opt && self.pipes == 8 {
                    bank_bit0 ^= x5;
                }
                bank_bit0 | ((ty3 ^ x4) << 1)
            }
            8 => {
                let mut bank_bit0 = ty5 ^ x3;
                if bank_opt && self.pipes == 8 {
                    bank_bit0 ^= tx3;
                }
                bank_bit0 | ((ty5 ^ ty4 ^ x4) << 1) | ((ty3 ^ x5) << 2)
            }
            _ => 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn addr_micro_tiled(
        &self,
        x: u32,
        y: u32,
        slice: u32,
        bpp: u32,
        pitch: u32,
        height: u32,
        tile_mode: TileMode,
        is_depth: bool,
        tile_base: u32,
        comp_bits: u32,
    ) -> SurfaceAddress {
        let thickness: u64 = if tile_mode == TileMode::Tiled1DThick {
            u64::from(THICK_TILE_THICKNESS)
        } else {
            1
        };

        let micro_tile_bytes =
            bits_to_bytes(u64::from(MICRO_TILE_PIXELS) * thickness * u64::from(bpp));
        let micro_tiles_per_row = u64::from(pitch / MICRO_TILE_WIDTH);
        let micro_tile_index_x = u64::from(x / MICRO_TILE_WIDTH);
        let micro_tile_index_y = u64::from(y / MICRO_TILE_HEIGHT);
        let micro_tile_index_z = u64::from(slice) / thickness;

        let micro_tile_offset =
            micro_tile_bytes * (micro_tile_index_x + micro_tile_index_y * micro_tiles_per_row);

        let slice_bytes =
            bits_to_bytes(u64::from(pitch) * u64::from(height) * thickness * u64::from(bpp));
        let slice_offset = micro_tile_index_z * slice_bytes;

        let pixel_index = u64::from(pixel_index_in_micro_tile(
            x,
            y,
            slice,
            bpp,
            tile_mode,
            Self::tile_type(is_depth),
        ));

        let pixel_offset = if comp_bits != 0 && comp_bits != bpp && is_depth {
            u64::from(tile_base) + u64::from(comp_bits) * pixel_index
        } else {
            u64::from(bpp) * pixel_index
        };

        SurfaceAddress {
            addr: pixel_offset / 8 + micro_tile_offset + slice_offset,
            bit_position: (pixel_offset % 8) as u32,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn addr_macro_tiled(
        &self,
        x: u32,
        y: u32,
        slice: u32,
        sample: u32,
        bpp: u32,
        pitch: u32,
        height: u32,
        mut num_samples: u32,
        tile_mode: TileMode,
        is_depth: bool,
        tile_base: u32,
        comp_bits: u32,
        pipe_swizzle: u32,
        bank_swizzle: u32,
    ) -> SurfaceAddress {
        let num_pipes = u64::from(self.pipes);
        let num_banks = u64::from(self.banks);
        let num_group_bits = log2(self.pipe_interleave_bytes);
        let num_pipe_bits = log2(self.pipes);
        let num_bank_bits = log2(self.banks);

        let thickness = u64::from(tile_mode.thickness());
        let micro_tile_bits = u64::from(MICRO_TILE_PIXELS)
            * thickness
            * u64::from(bpp)
            * u64::from(num_samples);
        let micro_tile_bytes = micro_tile_bits / 8;

        let pixel_index = u64::from(pixel_index_in_micro_tile(
            x,
            y,
            slice,
            bpp,
            tile_mode,
            Self::tile_type(is_depth),
        ));

        let (sample_offset, pixel_offset) = if is_depth {
            if comp_bits != 0 && comp_bits != bpp {
                (
                    u64::from(tile_base) + u64::from(comp_bits) * u64::from(sample),
                    u64::from(num_samples) * u64::from(comp_bits) * pixel_index,
                )
            } else {
                (
                    u64::from(bpp) * u64::from(sample),
                    u64::from(num_samples) * u64::from(bpp) * pixel_index,
                )
            }
        } else {
            (
                u64::from(sample) * (micro_tile_bits / u64::from(num_samples)),
                u64::from(bpp) * pixel_index,
            )
        };

        let mut elem_offset = pixel_offset + sample_offset;
        let bit_position = (elem_offset % 8) as u32;

        // Split oversized multisampled micro tiles across sample slices.
        let bytes_per_sample = micro_tile_bytes / u64::from(num_samples);
        let (num_sample_splits, sample_slice) =
            if num_samples > 1 && micro_tile_bytes > u64::from(self.split_size) {
                let samples_per_slice =
                    (u64::from(self.split_size) / bytes_per_sample).max(1);
                let num_sample_splits = u64::from(num_samples) / samples_per_slice;
                num_samples = samples_per_slice as u32;

                let tile_slice_bits = micro_tile_bits / num_sample_splits;
                let sample_slice = elem_offset / tile_slice_bits;
                elem_offset %= tile_slice_bits;
                (num_sample_splits, sample_slice)
            } else {
                (1, 0)
            };

        let elem_offset = elem_offset / 8;

        let pipe = u64::from(self.pipe_from_coord(x, y));
        let bank = u64::from(self.bank_from_coord(x, y));

        let mut bank_pipe = pipe + num_pipes * bank;
        let rotation = u64::from(self.rotation(tile_mode));
        let swizzle = u64::from(pipe_swizzle) + num_pipes * u64::from(bank_swizzle);
        let mut slice_in = u64::from(slice);

        if tile_mode.is_thick_macro_tiled() {
            slice_in /= u64::from(THICK_TILE_THICKNESS);
        }

        bank_pipe ^=
            num_pipes * sample_slice * ((num_banks >> 1) + 1) ^ (swizzle + slice_in * rotation);
        bank_pipe %= num_pipes * num_banks;
        let pipe = bank_pipe % num_pipes;
        let mut bank = bank_pipe / num_pipes;

        let slice_bytes = bits_to_bytes(
            u64::from(pitch)
                * u64::from(height)
                * thickness
                * u64::from(bpp)
                * u64::from(num_samples),
        );
        let slice_offset =
            slice_bytes * ((sample_slice + num_sample_splits * u64::from(slice)) / thickness);

        let mut macro_tile_pitch = u64::from(MICRO_TILE_WIDTH) * num_banks;
        let mut macro_tile_height = u64::from(MICRO_TILE_HEIGHT) * num_pipes;

        match tile_mode {
            TileMode::Tiled2DThin2 | TileMode::Tiled2BThin2 => {
                macro_tile_pitch /= 2;
                macro_tile_height *= 2;
            }
            TileMode::Tiled2DThin4 | TileMode::Tiled2BThin4 => {
                macro_tile_pitch /= 4;
                macro_tile_height *= 4;
            }
            _ => (),
        }

        let macro_tiles_per_row = u64::from(pitch) / macro_tile_pitch;
        let macro_tile_bytes = bits_to_bytes(
            u64::from(num_samples)
                * thickness
                * u64::from(bpp)
                * macro_tile_height
                * macro_tile_pitch,
        );
        let macro_tile_index_x = u64::from(x) / macro_tile_pitch;
        let macro_tile_index_y = u64::from(y) / macro_tile_height;
        let macro_tile_offset =
            macro_tile_bytes * (macro_tile_index_x + macro_tiles_per_row * macro_tile_index_y);

        if tile_mode.is_bank_swapped() {
            let bank_swap_width =
                u64::from(self.bank_swapped_width(tile_mode, bpp, num_samples, pitch));
            if bank_swap_width != 0 {
                let swap_index = macro_tile_pitch * macro_tile_index_x / bank_swap_width;
                bank ^= u64::from(
                    BANK_SWAP_ORDER[(swap_index & u64::from(self.banks - 1)) as usize],
                );
            }
        }

        // Final assembly: [offset_high : bank : pipe : offset_low], with
        // offset_low spanning the pipe-interleave bits.
        let group_mask = (1u64 << num_group_bits) - 1;
        let total_offset =
            elem_offset + ((macro_tile_offset + slice_offset) >> (num_bank_bits + num_pipe_bits));

        let offset_high = (total_offset & !group_mask) << (num_bank_bits + num_pipe_bits);
        let offset_low = total_offset & group_mask;
        let bank_bits = bank << (num_pipe_bits + num_group_bits);
        let pipe_bits = pipe << num_group_bits;

        SurfaceAddress {
            addr: bank_bits | pipe_bits | offset_low | offset_high,
            bit_position,
        }
    }

    fn dispatch_surface_addr(&self, req: &SurfaceAddrRequest) -> SurfaceAddress {
        let num_samples = req.num_samples.max(1);

        match req.tile_mode {
            TileMode::LinearGeneral | TileMode::LinearAligned => {
                let (addr, bit_position) = linear_addr(
                    req.x,
                    req.y,
                    req.slice,
                    req.sample,
                    req.bpp,
                    req.pitch,
                    req.height,
                    req.num_slices,
                );
                SurfaceAddress { addr, bit_position }
            }
            TileMode::Tiled1DThin1 | TileMode::Tiled1DThick => self.addr_micro_tiled(
                req.x,
                req.y,
                req.slice,
                req.bpp,
                req.pitch,
                req.height,
                req.tile_mode,
                req.is_depth,
                req.tile_base,
                req.comp_bits,
            ),
            TileMode::Tiled2DXThick | TileMode::Tiled3DXThick => SurfaceAddress::default(),
            _ => self.addr_macro_tiled(
                req.x,
                req.y,
                req.slice,
                req.sample,
                req.bpp,
                req.pitch,
                req.height,
                num_samples,
                req.tile_mode,
                req.is_depth,
                req.tile_base,
                req.comp_bits,
                req.pipe_swizzle,
                req.bank_swizzle,
            ),
        }
    }
}

impl HwlEngine for R600Engine {
    fn chip_family(&self) -> ChipFamily {
        self.chip_family
    }

    fn chip_revision(&self) -> u32 {
        self.chip_revision
    }

    fn config_flags(&self) -> ConfigFlags {
        self.flags
    }

    fn slice_size_mode(&self) -> u32 {
        self.slice_size_mode
    }

    fn pipes(&self) -> u32 {
        self.pipes
    }

    fn banks(&self) -> u32 {
        self.banks
    }

    fn pipe_interleave_bytes(&self) -> u32 {
        self.pipe_interleave_bytes
    }

    fn row_size(&self) -> u32 {
        self.row_size
    }

    fn swap_size(&self) -> u32 {
        self.swap_size
    }

    fn split_size(&self) -> u32 {
        self.split_size
    }

    fn compute_mip_level(&self, req: &mut SurfaceInfoRequest) -> bool {
        if !req.format.is_block_compressed() {
            return false;
        }

        if req.mip_level > 0 {
            let mut width = req.width;
            let mut height = req.height;
            let mut slices = req.num_slices;

            if req.flags.contains(SurfaceFlags::INPUT_BASE_MAP) {
                width = mip_dim(width, req.mip_level);
                height = mip_dim(height, req.mip_level);

                if !req.flags.contains(SurfaceFlags::CUBE) {
                    slices = mip_dim(slices, req.mip_level);
                } else {
                    slices = slices.max(1);
                }
            }

            req.width = next_pow2(width);
            req.height = next_pow2(height);
            req.num_slices = slices;
        }

        true
    }

    fn setup_tile_cfg(
        &self,
        _tile_index: i32,
        _tile_info: Option<&mut TileInfo>,
    ) -> Result<(), TilingError> {
        // This family has no indexed tile configurations; requests keep the
        // explicit parameters they came with.
        Ok(())
    }

    fn compute_surface_info(
        &self,
        req: &SurfaceInfoRequest,
        out: &mut SurfaceInfo,
    ) -> Result<(), TilingError> {
        let num_samples = req.num_samples.max(1);

        let pad_dims = if req.flags.contains(SurfaceFlags::CUBE) && req.mip_level == 0 {
            2
        } else {
            0
        };

        let tile_mode = if req.flags.contains(SurfaceFlags::FMASK) {
            req.tile_mode.without_bank_swap()
        } else {
            self.mip_level_tile_mode(
                req.tile_mode,
                req.bpp,
                req.mip_level,
                req.width,
                req.height,
                req.num_slices,
                num_samples,
                req.flags.contains(SurfaceFlags::DEPTH),
                false,
            )
        };

        if tile_mode != req.tile_mode {
            trace!("tile mode degraded: {:?} -> {:?}", req.tile_mode, tile_mode);
        }

        match tile_mode {
            TileMode::LinearGeneral | TileMode::LinearAligned => {
                self.surface_info_linear(req, out, pad_dims, tile_mode)
            }
            TileMode::Tiled1DThin1 | TileMode::Tiled1DThick => {
                self.surface_info_micro_tiled(req, out, pad_dims, tile_mode)
            }
            TileMode::Tiled2DXThick | TileMode::Tiled3DXThick => Err(TilingError::InvalidParams),
            _ => self.surface_info_macro_tiled(req, out, pad_dims, tile_mode, req.tile_mode),
        }
    }

    fn compute_surface_addr(
        &self,
        req: &SurfaceAddrRequest,
    ) -> Result<SurfaceAddress, TilingError> {
        if req.pipe_swizzle >= self.pipes
            || req.bank_swizzle >= self.banks
            || req.x > req.pitch
            || req.y > req.height
            || req.num_samples > 8
            || req.bpp == 0
        {
            return Err(TilingError::InvalidParams);
        }

        Ok(self.dispatch_surface_addr(req))
    }

    fn extract_bank_pipe_swizzle(&self, base256b: u32) -> BankPipeSwizzle {
        let bank_mask = (1 << log2(self.banks)) - 1;
        let pipe_mask = (1 << log2(self.pipes)) - 1;
        let group_units = self.pipe_interleave_bytes >> 8;

        BankPipeSwizzle {
            pipe_swizzle: (base256b / group_units) & pipe_mask,
            bank_swizzle: (base256b / group_units / self.pipes) & bank_mask,
        }
    }

    fn htile_bpp(&self, is_width8: bool, is_height8: bool) -> u32 {
        let htile_x = if is_width8 { 1 } else { 2 };
        let htile_y = if is_height8 { 1 } else { 2 };

        htile_x * htile_y * 32
    }

    fn htile_base_align(&self, is_linear: bool, pipes: u32) -> u32 {
        let mut align = pipes * self.pipe_interleave_bytes;

        if is_linear {
            align = align.max(bits_to_bytes32(pipes * HTILE_CACHE_BITS));
        }

        align
    }

    fn htile_bytes(
        &self,
        pitch: u32,
        height: u32,
        bpp: u32,
        is_linear: bool,
        num_slices: u32,
        base_align: u32,
    ) -> u64 {
        let cache_line_bytes = bits_to_bytes(u64::from(HTILE_CACHE_BITS));
        let slice_bytes = bits_to_bytes(
            u64::from(height) * u64::from(pitch) * u64::from(bpp) * u64::from(num_slices) / 64,
        );
        let mut htile_bytes =
            pow2_align_u64(slice_bytes, u64::from(self.pipes) * cache_line_bytes);

        if is_linear {
            htile_bytes = pow2_align_u64(htile_bytes, u64::from(base_align));
        }

        htile_bytes
    }

    fn htile_macro_dims_linear(&self, bpp: u32) -> (u32, u32) {
        ((8 * 512) / bpp, 8 * self.pipes)
    }

    fn slice_tile_swizzle(&self, req: &SliceSwizzleRequest) -> u32 {
        if !req.tile_mode.is_macro_tiled() {
            return 0;
        }

        let thickness = req.tile_mode.thickness();
        let rotation = self.rotation(req.tile_mode);
        let group_mask = (self.pipes * self.banks) - 1;

        let first_slice = req.slice / thickness;
        let tile_swizzle = (req.base_swizzle + first_slice * rotation) & group_mask;

        let mut base_addr = req.base_addr;
        base_addr ^= u64::from(tile_swizzle) * u64::from(self.pipe_interleave_bytes);
        base_addr >>= 8;

        base_addr as u32
    }
}
