//! Request and result types for the surface queries.

use bitflags::bitflags;

use crate::format::SurfaceFormat;
use crate::tile::{TileMode, TileType};

bitflags! {
    /// Properties of the surface being laid out.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SurfaceFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const TEXTURE = 1 << 3;
        const CUBE = 1 << 4;
        const VOLUME = 1 << 5;
        const FMASK = 1 << 6;
        const CUBE_AS_ARRAY = 1 << 7;
        const COMPRESS_Z = 1 << 8;
        /// Marker for 3-component formats on linear-aligned surfaces; the
        /// width is tripled around padding. Set internally, but accepted on
        /// input for sub-level calls.
        const LINEAR_WA = 1 << 9;
        const OVERLAY = 1 << 10;
        const NO_STENCIL = 1 << 11;
        /// The request carries base-map dimensions and `mip_level` selects
        /// the sub-level to size.
        const INPUT_BASE_MAP = 1 << 12;
        /// Scan-out surface; pitch alignment is raised to 32.
        const DISPLAY = 1 << 13;
        const OPT4_SPACE = 1 << 14;
        const PRT = 1 << 15;
        /// Quad-buffer stereo: the layout packs both eyes into one surface.
        const QB_STEREO = 1 << 16;
        const POW2_PAD = 1 << 17;
    }
}

/// Bank/tiling parameters. Zero-filled values mean "let the library pick";
/// on output they are the parameters actually used.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TileInfo {
    pub banks: u32,
    pub bank_width: u32,
    pub bank_height: u32,
    pub macro_aspect_ratio: u32,
    pub tile_split_bytes: u32,
    pub pipe_config: u32,
}

/// Right-eye placement for quad-buffer stereo surfaces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct StereoInfo {
    /// Height of one eye's image, before doubling.
    pub eye_height: u32,
    /// Byte offset of the right eye's image.
    pub right_offset: u32,
}

/// Input to [`crate::Tiler::surface_info`].
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInfoRequest {
    pub tile_mode: TileMode,
    pub format: SurfaceFormat,
    /// Bits per pixel. Ignored when `format` is valid (the format table
    /// decides), required otherwise.
    pub bpp: u32,
    pub num_samples: u32,
    pub width: u32,
    pub height: u32,
    pub num_slices: u32,
    /// Slice the caller is interested in; only consulted by the slice-size
    /// tail adjustment.
    pub slice: u32,
    pub mip_level: u32,
    pub flags: SurfaceFlags,
    pub num_frags: u32,
    pub tile_type: TileType,
    pub tile_index: i32,
    pub tile_info: Option<TileInfo>,
}

impl Default for SurfaceInfoRequest {
    fn default() -> Self {
        Self {
            tile_mode: TileMode::LinearGeneral,
            format: SurfaceFormat::INVALID,
            bpp: 0,
            num_samples: 1,
            width: 0,
            height: 0,
            num_slices: 1,
            slice: 0,
            mip_level: 0,
            flags: SurfaceFlags::empty(),
            num_frags: 0,
            tile_type: TileType::Displayable,
            tile_index: -1,
            tile_info: None,
        }
    }
}

/// Output of [`crate::Tiler::surface_info`].
///
/// Pitch, height, and depth are padded element-space dimensions; the
/// `pixel_*` fields are translated back to pixel space.
#[derive(Debug, Default, Clone, Copy)]
pub struct SurfaceInfo {
    pub pitch: u32,
    pub height: u32,
    pub depth: u32,
    pub surf_size: u64,
    /// The tile mode actually chosen, possibly degraded from the request.
    pub tile_mode: TileMode,
    pub base_align: u32,
    pub pitch_align: u32,
    pub height_align: u32,
    pub depth_align: u32,
    pub bpp: u32,
    pub pixel_pitch: u32,
    pub pixel_height: u32,
    pub pixel_bits: u32,
    pub slice_size: u32,
    /// `pitch / 8 - 1`, the register encoding of the pitch.
    pub pitch_tile_max: u32,
    /// `height / 8 - 1`.
    pub height_tile_max: u32,
    /// `pitch * (height / 64) - 1`.
    pub slice_tile_max: u32,
    pub tile_type: TileType,
    pub tile_index: i32,
    pub tile_info: Option<TileInfo>,
    /// Present when the request asked for quad-buffer stereo.
    pub stereo: Option<StereoInfo>,
}

/// Input to [`crate::Tiler::surface_addr`].
#[derive(Debug, Clone, Copy)]
pub struct SurfaceAddrRequest {
    pub x: u32,
    pub y: u32,
    pub slice: u32,
    pub sample: u32,
    /// Bits per element, as produced by surface sizing.
    pub bpp: u32,
    pub pitch: u32,
    pub height: u32,
    pub num_slices: u32,
    pub num_samples: u32,
    pub tile_mode: TileMode,
    /// Depth surfaces use the non-displayable pixel order and honor
    /// `tile_base`/`comp_bits`.
    pub is_depth: bool,
    /// Bit offset of the depth plane inside a compressed depth tile.
    pub tile_base: u32,
    /// Stored bits per depth component when it differs from `bpp`.
    pub comp_bits: u32,
    pub pipe_swizzle: u32,
    pub bank_swizzle: u32,
    pub num_frags: u32,
    pub tile_type: TileType,
    pub tile_index: i32,
    pub tile_info: Option<TileInfo>,
}

impl Default for SurfaceAddrRequest {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            slice: 0,
            sample: 0,
            bpp: 0,
            pitch: 0,
            height: 0,
            num_slices: 1,
            num_samples: 1,
            tile_mode: TileMode::LinearGeneral,
            is_depth: false,
            tile_base: 0,
            comp_bits: 0,
            pipe_swizzle: 0,
            bank_swizzle: 0,
            num_frags: 0,
            tile_type: TileType::Displayable,
            tile_index: -1,
            tile_info: None,
        }
    }
}

/// Output of [`crate::Tiler::surface_addr`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceAddress {
    /// Byte address of the element holding the pixel.
    pub addr: u64,
    /// Bit position of the pixel inside that element's first byte.
    pub bit_position: u32,
}

/// Bank and pipe swizzle decomposed from a 256-byte-unit base address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BankPipeSwizzle {
    pub bank_swizzle: u32,
    pub pipe_swizzle: u32,
}

/// Edge length of the depth blocks summarized by one HTILE entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[repr(u32)]
pub enum HtileBlockSize {
    Four = 4,
    Eight = 8,
}

impl HtileBlockSize {
    /// Attempts to construct a block size from `value`.
    pub const fn new(value: u32) -> Option<Self> {
        match value {
            4 => Some(HtileBlockSize::Four),
            8 => Some(HtileBlockSize::Eight),
            _ => None,
        }
    }
}

/// Input to [`crate::Tiler::htile_info`].
#[derive(Debug, Clone, Copy)]
pub struct HtileRequest {
    /// Padded pitch of the depth surface.
    pub pitch: u32,
    /// Padded height of the depth surface.
    pub height: u32,
    pub num_slices: u32,
    pub is_linear: bool,
    pub block_width: HtileBlockSize,
    pub block_height: HtileBlockSize,
    pub tile_index: i32,
    pub tile_info: Option<TileInfo>,
}

/// Output of [`crate::Tiler::htile_info`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HtileInfo {
    /// Depth-surface pitch padded to the HTILE macro width.
    pub pitch: u32,
    /// Depth-surface height padded to the HTILE macro height.
    pub height: u32,
    pub htile_bytes: u64,
    pub base_align: u32,
    /// Bits of HTILE data per 8x8 depth tile.
    pub bpp: u32,
    pub macro_width: u32,
    pub macro_height: u32,
}

/// Input to [`crate::Tiler::slice_swizzle`].
#[derive(Debug, Clone, Copy)]
pub struct SliceSwizzleRequest {
    pub tile_mode: TileMode,
    /// Combined `pipe + pipes * bank` swizzle of the base slice.
    pub base_swizzle: u32,
    pub slice: u32,
    pub base_addr: u64,
    pub tile_index: i32,
    pub tile_info: Option<TileInfo>,
}
