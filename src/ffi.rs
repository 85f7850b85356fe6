//! C API for the library.
//!
//! The entry points mirror the Rust methods on [`Tiler`] one to one,
//! with `#[repr(C)]` request/response structs. Every struct carries a
//! self-reported `size` field; when the instance was created with the
//! fill-size-fields flag, each call validates those sizes against the
//! compiled layout and fails with [`ReturnCode::ParamSizeMismatch`] on
//! drift before doing any work.
//!
//! Instances are allocated through the caller-supplied allocation
//! callback and released through the free callback, paired exactly once
//! per successful create. The optional debug-print callback receives
//! advisory messages on failures; it never affects results.

use std::ffi::{c_char, c_void, CStr};
use std::mem::size_of;

use crate::surface::{StereoInfo, SurfaceFlags, TileInfo};
use crate::{
    CreateFlags, CreateParams, HtileBlockSize, HtileRequest, SliceSwizzleRequest,
    SurfaceAddrRequest, SurfaceFormat, SurfaceInfoRequest, TileMode, TileType, Tiler, TilingError,
};

/// Status of a C API call.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok = 0,
    Error = 1,
    OutOfMemory = 2,
    InvalidParams = 3,
    NotSupported = 4,
    NotImplemented = 5,
    ParamSizeMismatch = 6,
}

impl From<TilingError> for ReturnCode {
    fn from(error: TilingError) -> Self {
        match error {
            TilingError::Failed => ReturnCode::Error,
            TilingError::OutOfMemory => ReturnCode::OutOfMemory,
            TilingError::InvalidParams => ReturnCode::InvalidParams,
            TilingError::NotSupported => ReturnCode::NotSupported,
            TilingError::NotImplemented => ReturnCode::NotImplemented,
            TilingError::SizeMismatch => ReturnCode::ParamSizeMismatch,
        }
    }
}

#[repr(C)]
pub struct AllocSysMemInput {
    pub size: u32,
    pub flags: u32,
    pub size_in_bytes: u32,
    pub client_handle: *mut c_void,
}

#[repr(C)]
pub struct FreeSysMemInput {
    pub size: u32,
    pub virt_addr: *mut c_void,
    pub client_handle: *mut c_void,
}

#[repr(C)]
pub struct DebugPrintInput {
    pub size: u32,
    pub message: *const c_char,
    pub client_handle: *mut c_void,
}

pub type AllocSysMemFn = unsafe extern "C" fn(*const AllocSysMemInput) -> *mut c_void;
pub type FreeSysMemFn = unsafe extern "C" fn(*const FreeSysMemInput) -> u32;
pub type DebugPrintFn = unsafe extern "C" fn(*const DebugPrintInput) -> u32;

/// Caller-supplied system services. Allocation and free are required;
/// debug printing is optional.
#[repr(C)]
pub struct Callbacks {
    pub alloc_sys_mem: Option<AllocSysMemFn>,
    pub free_sys_mem: Option<FreeSysMemFn>,
    pub debug_print: Option<DebugPrintFn>,
}

#[repr(C)]
pub struct CreateInput {
    pub size: u32,
    pub chip_engine: u32,
    pub chip_family: u32,
    pub chip_revision: u32,
    pub callbacks: Callbacks,
    pub create_flags: u32,
    pub gb_tiling_config: u32,
    pub client_handle: *mut c_void,
}

#[repr(C)]
pub struct CreateOutput {
    pub size: u32,
    pub handle: *mut c_void,
}

#[repr(C)]
pub struct ComputeSurfaceInfoInput {
    pub size: u32,
    pub tile_mode: u32,
    pub format: u32,
    pub bpp: u32,
    pub num_samples: u32,
    pub width: u32,
    pub height: u32,
    pub num_slices: u32,
    pub slice: u32,
    pub mip_level: u32,
    pub flags: u32,
    pub num_frags: u32,
    pub p_tile_info: *mut TileInfo,
    pub tile_type: u32,
    pub tile_index: i32,
}

#[repr(C)]
pub struct ComputeSurfaceInfoOutput {
    pub size: u32,
    pub pitch: u32,
    pub height: u32,
    pub depth: u32,
    pub surf_size: u64,
    pub tile_mode: u32,
    pub base_align: u32,
    pub pitch_align: u32,
    pub height_align: u32,
    pub depth_align: u32,
    pub bpp: u32,
    pub pixel_pitch: u32,
    pub pixel_height: u32,
    pub pixel_bits: u32,
    pub slice_size: u32,
    pub pitch_tile_max: u32,
    pub height_tile_max: u32,
    pub slice_tile_max: u32,
    pub p_tile_info: *mut TileInfo,
    pub tile_type: u32,
    pub tile_index: i32,
    pub p_stereo_info: *mut StereoInfo,
}

#[repr(C)]
pub struct ComputeSurfaceAddrInput {
    pub size: u32,
    pub x: u32,
    pub y: u32,
    pub slice: u32,
    pub sample: u32,
    pub bpp: u32,
    pub pitch: u32,
    pub height: u32,
    pub num_slices: u32,
    pub num_samples: u32,
    pub tile_mode: u32,
    pub is_depth: u32,
    pub tile_base: u32,
    pub comp_bits: u32,
    pub pipe_swizzle: u32,
    pub bank_swizzle: u32,
    pub num_frags: u32,
    pub tile_type: u32,
    pub p_tile_info: *mut TileInfo,
    pub tile_index: i32,
}

#[repr(C)]
pub struct ComputeSurfaceAddrOutput {
    pub size: u32,
    pub addr: u64,
    pub bit_position: u32,
}

#[repr(C)]
pub struct ExtractBankPipeSwizzleInput {
    pub size: u32,
    pub base256b: u32,
    pub p_tile_info: *mut TileInfo,
    pub tile_index: i32,
}

#[repr(C)]
pub struct ExtractBankPipeSwizzleOutput {
    pub size: u32,
    pub bank_swizzle: u32,
    pub pipe_swizzle: u32,
}

#[repr(C)]
pub struct ComputeHtileInfoInput {
    pub size: u32,
    pub pitch: u32,
    pub height: u32,
    pub num_slices: u32,
    pub is_linear: u32,
    pub block_width: u32,
    pub block_height: u32,
    pub p_tile_info: *mut TileInfo,
    pub tile_index: i32,
}

#[repr(C)]
pub struct ComputeHtileInfoOutput {
    pub size: u32,
    pub pitch: u32,
    pub height: u32,
    pub htile_bytes: u64,
    pub base_align: u32,
    pub bpp: u32,
    pub macro_width: u32,
    pub macro_height: u32,
}

#[repr(C)]
pub struct ComputeSliceSwizzleInput {
    pub size: u32,
    pub tile_mode: u32,
    pub base_swizzle: u32,
    pub slice: u32,
    pub base_addr: u64,
    pub p_tile_info: *mut TileInfo,
    pub tile_index: i32,
}

#[repr(C)]
pub struct ComputeSliceSwizzleOutput {
    pub size: u32,
    pub tile_swizzle: u32,
}

/// The allocation behind an opaque handle.
struct Handle {
    tiler: Tiler,
    free_sys_mem: FreeSysMemFn,
    debug_print: Option<DebugPrintFn>,
    client_handle: *mut c_void,
}

impl Handle {
    /// Forwards an advisory message to the debug callback, if installed.
    unsafe fn advise(&self, message: &CStr) {
        if let Some(debug_print) = self.debug_print {
            debug_print(&DebugPrintInput {
                size: size_of::<DebugPrintInput>() as u32,
                message: message.as_ptr(),
                client_handle: self.client_handle,
            });
        }
    }
}

unsafe fn handle_ref<'a>(handle: *mut c_void) -> Option<&'a Handle> {
    (handle as *const Handle).as_ref()
}

fn size_mismatch(fill_size_fields: bool, in_size: u32, in_expected: usize, out_size: u32, out_expected: usize) -> bool {
    fill_size_fields && (in_size != in_expected as u32 || out_size != out_expected as u32)
}

/// Creates a library instance and returns its opaque handle.
///
/// # Safety
/// `p_in` and `p_out` must point to valid structs of the declared types.
/// The allocation callback must return memory of at least the requested
/// size, aligned for any object, or null.
#[no_mangle]
pub unsafe extern "C" fn r600_tiling_create(
    p_in: *const CreateInput,
    p_out: *mut CreateOutput,
) -> ReturnCode {
    let (Some(input), Some(output)) = (p_in.as_ref(), p_out.as_mut()) else {
        return ReturnCode::InvalidParams;
    };

    let create_flags = CreateFlags::from_bits_truncate(input.create_flags);

    if create_flags.contains(CreateFlags::FILL_SIZE_FIELDS)
        && (input.size != size_of::<CreateInput>() as u32
            || output.size != size_of::<CreateOutput>() as u32)
    {
        return ReturnCode::ParamSizeMismatch;
    }

    let (Some(alloc_sys_mem), Some(free_sys_mem)) =
        (input.callbacks.alloc_sys_mem, input.callbacks.free_sys_mem)
    else {
        return ReturnCode::Error;
    };

    let tiler = match Tiler::new(&CreateParams {
        chip_engine: input.chip_engine,
        chip_family: input.chip_family,
        chip_revision: input.chip_revision,
        gb_tiling_config: input.gb_tiling_config,
        flags: create_flags,
    }) {
        Ok(tiler) => tiler,
        Err(error) => return error.into(),
    };

    let memory = alloc_sys_mem(&AllocSysMemInput {
        size: size_of::<AllocSysMemInput>() as u32,
        flags: 0,
        size_in_bytes: size_of::<Handle>() as u32,
        client_handle: input.client_handle,
    }) as *mut Handle;

    if memory.is_null() {
        return ReturnCode::OutOfMemory;
    }

    memory.write(Handle {
        tiler,
        free_sys_mem,
        debug_print: input.callbacks.debug_print,
        client_handle: input.client_handle,
    });

    output.handle = memory as *mut c_void;
    ReturnCode::Ok
}

/// Destroys an instance created by [`r600_tiling_create`], releasing its
/// memory through the free callback supplied at creation.
///
/// # Safety
/// `handle` must be a handle returned by a successful create that has
/// not been destroyed yet, or null.
#[no_mangle]
pub unsafe extern "C" fn r600_tiling_destroy(handle: *mut c_void) -> ReturnCode {
    if handle.is_null() {
        return ReturnCode::Error;
    }

    let Handle {
        tiler,
        free_sys_mem,
        client_handle,
        ..
    } = (handle as *mut Handle).read();
    drop(tiler);

    free_sys_mem(&FreeSysMemInput {
        size: size_of::<FreeSysMemInput>() as u32,
        virt_addr: handle,
        client_handle,
    });

    ReturnCode::Ok
}

/// Computes surface shape, alignments, and sizes.
/// See the safe alternative [`Tiler::surface_info`].
///
/// # Safety
/// `handle` must be a live handle. `p_in` and `p_out` must point to valid
/// structs; the optional tile-info and stereo-info pointers must be valid
/// when non-null.
#[no_mangle]
pub unsafe extern "C" fn r600_tiling_compute_surface_info(
    handle: *mut c_void,
    p_in: *const ComputeSurfaceInfoInput,
    p_out: *mut ComputeSurfaceInfoOutput,
) -> ReturnCode {
    let Some(lib) = handle_ref(handle) else {
        return ReturnCode::Error;
    };
    let (Some(input), Some(output)) = (p_in.as_ref(), p_out.as_mut()) else {
        return ReturnCode::InvalidParams;
    };

    if size_mismatch(
        lib.tiler.fill_size_fields(),
        input.size,
        size_of::<ComputeSurfaceInfoInput>(),
        output.size,
        size_of::<ComputeSurfaceInfoOutput>(),
    ) {
        return ReturnCode::ParamSizeMismatch;
    }

    let (Some(tile_mode), Some(tile_type)) =
        (TileMode::new(input.tile_mode), TileType::new(input.tile_type))
    else {
        lib.advise(c"compute_surface_info: unknown tile mode or type");
        return ReturnCode::InvalidParams;
    };

    let mut req = SurfaceInfoRequest {
        tile_mode,
        format: SurfaceFormat(input.format),
        bpp: input.bpp,
        num_samples: input.num_samples,
        width: input.width,
        height: input.height,
        num_slices: input.num_slices,
        slice: input.slice,
        mip_level: input.mip_level,
        flags: SurfaceFlags::from_bits_truncate(input.flags),
        num_frags: input.num_frags,
        tile_type,
        tile_index: input.tile_index,
        tile_info: input.p_tile_info.as_ref().copied(),
    };

    // Stereo output is opt-in through the output pointer.
    if output.p_stereo_info.is_null() {
        req.flags.remove(SurfaceFlags::QB_STEREO);
    }

    let info = match lib.tiler.surface_info(&req) {
        Ok(info) => info,
        Err(error) => {
            lib.advise(c"compute_surface_info failed");
            return error.into();
        }
    };

    output.pitch = info.pitch;
    output.height = info.height;
    output.depth = info.depth;
    output.surf_size = info.surf_size;
    output.tile_mode = info.tile_mode as u32;
    output.base_align = info.base_align;
    output.pitch_align = info.pitch_align;
    output.height_align = info.height_align;
    output.depth_align = info.depth_align;
    output.bpp = info.bpp;
    output.pixel_pitch = info.pixel_pitch;
    output.pixel_height = info.pixel_height;
    output.pixel_bits = info.pixel_bits;
    output.slice_size = info.slice_size;
    output.pitch_tile_max = info.pitch_tile_max;
    output.height_tile_max = info.height_tile_max;
    output.slice_tile_max = info.slice_tile_max;
    output.tile_type = info.tile_type as u32;
    output.tile_index = info.tile_index;

    if let (Some(tile_info), false) = (info.tile_info, output.p_tile_info.is_null()) {
        output.p_tile_info.write(tile_info);
    }

    if let Some(stereo) = info.stereo {
        output.p_stereo_info.write(stereo);
    }

    ReturnCode::Ok
}

/// Computes the byte address and bit position of a pixel.
/// See the safe alternative [`Tiler::surface_addr`].
///
/// # Safety
/// `handle` must be a live handle. `p_in` and `p_out` must point to valid
/// structs; the optional tile-info pointer must be valid when non-null.
#[no_mangle]
pub unsafe extern "C" fn r600_tiling_compute_surface_addr(
    handle: *mut c_void,
    p_in: *const ComputeSurfaceAddrInput,
    p_out: *mut ComputeSurfaceAddrOutput,
) -> ReturnCode {
    let Some(lib) = handle_ref(handle) else {
        return ReturnCode::Error;
    };
    let (Some(input), Some(output)) = (p_in.as_ref(), p_out.as_mut()) else {
        return ReturnCode::InvalidParams;
    };

    if size_mismatch(
        lib.tiler.fill_size_fields(),
        input.size,
        size_of::<ComputeSurfaceAddrInput>(),
        output.size,
        size_of::<ComputeSurfaceAddrOutput>(),
    ) {
        return ReturnCode::ParamSizeMismatch;
    }

    let (Some(tile_mode), Some(tile_type)) =
        (TileMode::new(input.tile_mode), TileType::new(input.tile_type))
    else {
        lib.advise(c"compute_surface_addr: unknown tile mode or type");
        return ReturnCode::InvalidParams;
    };

    let req = SurfaceAddrRequest {
        x: input.x,
        y: input.y,
        slice: input.slice,
        sample: input.sample,
        bpp: input.bpp,
        pitch: input.pitch,
        height: input.height,
        num_slices: input.num_slices,
        num_samples: input.num_samples,
        tile_mode,
        is_depth: input.is_depth != 0,
        tile_base: input.tile_base,
        comp_bits: input.comp_bits,
        pipe_swizzle: input.pipe_swizzle,
        bank_swizzle: input.bank_swizzle,
        num_frags: input.num_frags,
        tile_type,
        tile_index: input.tile_index,
        tile_info: input.p_tile_info.as_ref().copied(),
    };

    match lib.tiler.surface_addr(&req) {
        Ok(addr) => {
            output.addr = addr.addr;
            output.bit_position = addr.bit_position;
            ReturnCode::Ok
        }
        Err(error) => {
            lib.advise(c"compute_surface_addr failed");
            error.into()
        }
    }
}

/// Decomposes a 256-byte-unit base address into bank and pipe swizzles.
/// See the safe alternative [`Tiler::bank_pipe_swizzle`].
///
/// # Safety
/// `handle` must be a live handle. `p_in` and `p_out` must point to valid
/// structs.
#[no_mangle]
pub unsafe extern "C" fn r600_tiling_extract_bank_pipe_swizzle(
    handle: *mut c_void,
    p_in: *const ExtractBankPipeSwizzleInput,
    p_out: *mut ExtractBankPipeSwizzleOutput,
) -> ReturnCode {
    let Some(lib) = handle_ref(handle) else {
        return ReturnCode::Error;
    };
    let (Some(input), Some(output)) = (p_in.as_ref(), p_out.as_mut()) else {
        return ReturnCode::InvalidParams;
    };

    if size_mismatch(
        lib.tiler.fill_size_fields(),
        input.size,
        size_of::<ExtractBankPipeSwizzleInput>(),
        output.size,
        size_of::<ExtractBankPipeSwizzleOutput>(),
    ) {
        return ReturnCode::ParamSizeMismatch;
    }

    let swizzle = lib.tiler.bank_pipe_swizzle(input.base256b);
    output.bank_swizzle = swizzle.bank_swizzle;
    output.pipe_swizzle = swizzle.pipe_swizzle;
    ReturnCode::Ok
}

/// Computes HTILE buffer parameters for a depth surface.
/// See the safe alternative [`Tiler::htile_info`].
///
/// # Safety
/// `handle` must be a live handle. `p_in` and `p_out` must point to valid
/// structs; the optional tile-info pointer must be valid when non-null.
#[no_mangle]
pub unsafe extern "C" fn r600_tiling_compute_htile_info(
    handle: *mut c_void,
    p_in: *const ComputeHtileInfoInput,
    p_out: *mut ComputeHtileInfoOutput,
) -> ReturnCode {
    let Some(lib) = handle_ref(handle) else {
        return ReturnCode::Error;
    };
    let (Some(input), Some(output)) = (p_in.as_ref(), p_out.as_mut()) else {
        return ReturnCode::InvalidParams;
    };

    if size_mismatch(
        lib.tiler.fill_size_fields(),
        input.size,
        size_of::<ComputeHtileInfoInput>(),
        output.size,
        size_of::<ComputeHtileInfoOutput>(),
    ) {
        return ReturnCode::ParamSizeMismatch;
    }

    let (Some(block_width), Some(block_height)) = (
        HtileBlockSize::new(input.block_width),
        HtileBlockSize::new(input.block_height),
    ) else {
        lib.advise(c"compute_htile_info: block sizes must be 4 or 8");
        return ReturnCode::InvalidParams;
    };

    let req = HtileRequest {
        pitch: input.pitch,
        height: input.height,
        num_slices: input.num_slices,
        is_linear: input.is_linear != 0,
        block_width,
        block_height,
        tile_index: input.tile_index,
        tile_info: input.p_tile_info.as_ref().copied(),
    };

    match lib.tiler.htile_info(&req) {
        Ok(info) => {
            output.pitch = info.pitch;
            output.height = info.height;
            output.htile_bytes = info.htile_bytes;
            output.base_align = info.base_align;
            output.bpp = info.bpp;
            output.macro_width = info.macro_width;
            output.macro_height = info.macro_height;
            ReturnCode::Ok
        }
        Err(error) => {
            lib.advise(c"compute_htile_info failed");
            error.into()
        }
    }
}

/// Computes the tile swizzle of a cube face or volume slice.
/// See the safe alternative [`Tiler::slice_swizzle`].
///
/// # Safety
/// `handle` must be a live handle. `p_in` and `p_out` must point to valid
/// structs; the optional tile-info pointer must be valid when non-null.
#[no_mangle]
pub unsafe extern "C" fn r600_tiling_compute_slice_swizzle(
    handle: *mut c_void,
    p_in: *const ComputeSliceSwizzleInput,
    p_out: *mut ComputeSliceSwizzleOutput,
) -> ReturnCode {
    let Some(lib) = handle_ref(handle) else {
        return ReturnCode::Error;
    };
    let (Some(input), Some(output)) = (p_in.as_ref(), p_out.as_mut()) else {
        return ReturnCode::InvalidParams;
    };

    if size_mismatch(
        lib.tiler.fill_size_fields(),
        input.size,
        size_of::<ComputeSliceSwizzleInput>(),
        output.size,
        size_of::<ComputeSliceSwizzleOutput>(),
    ) {
        return ReturnCode::ParamSizeMismatch;
    }

    let Some(tile_mode) = TileMode::new(input.tile_mode) else {
        lib.advise(c"compute_slice_swizzle: unknown tile mode");
        return ReturnCode::InvalidParams;
    };

    let req = SliceSwizzleRequest {
        tile_mode,
        base_swizzle: input.base_swizzle,
        slice: input.slice,
        base_addr: input.base_addr,
        tile_index: input.tile_index,
        tile_info: input.p_tile_info.as_ref().copied(),
    };

    match lib.tiler.slice_swizzle(&req) {
        Ok(tile_swizzle) => {
            output.tile_swizzle = tile_swizzle;
            ReturnCode::Ok
        }
        Err(error) => {
            lib.advise(c"compute_slice_swizzle failed");
            error.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::alloc::Layout;
    use std::ptr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static ALLOCS: AtomicUsize = AtomicUsize::new(0);
    static FREES: AtomicUsize = AtomicUsize::new(0);
    static DEBUG_MESSAGES: AtomicUsize = AtomicUsize::new(0);

    // A 16-byte header in front of each block records its size so the
    // free callback can rebuild the layout.
    const HEADER: usize = 16;

    unsafe extern "C" fn recording_alloc(input: *const AllocSysMemInput) -> *mut c_void {
        let size = (*input).size_in_bytes as usize;
        let layout = Layout::from_size_align(size + HEADER, 16).unwrap();
        let base = std::alloc::alloc(layout);
        if base.is_null() {
            return ptr::null_mut();
        }

        ALLOCS.fetch_add(1, Ordering::SeqCst);
        (base as *mut usize).write(size);
        base.add(HEADER) as *mut c_void
    }

    unsafe extern "C" fn recording_free(input: *const FreeSysMemInput) -> u32 {
        let base = ((*input).virt_addr as *mut u8).sub(HEADER);
        let size = (base as *mut usize).read();
        std::alloc::dealloc(
            base,
            Layout::from_size_align(size + HEADER, 16).unwrap(),
        );

        FREES.fetch_add(1, Ordering::SeqCst);
        ReturnCode::Ok as u32
    }

    unsafe extern "C" fn counting_debug_print(_input: *const DebugPrintInput) -> u32 {
        DEBUG_MESSAGES.fetch_add(1, Ordering::SeqCst);
        ReturnCode::Ok as u32
    }

    fn create_input(create_flags: u32) -> CreateInput {
        CreateInput {
            size: size_of::<CreateInput>() as u32,
            chip_engine: crate::CHIP_ENGINE_R600,
            chip_family: 0x51,
            chip_revision: 0,
            callbacks: Callbacks {
                alloc_sys_mem: Some(recording_alloc),
                free_sys_mem: Some(recording_free),
                debug_print: Some(counting_debug_print),
            },
            create_flags,
            // 4 pipes, 4 banks, 256B interleave, 2KB rows, 256B swap,
            // 2KB split.
            gb_tiling_config: 0x4904,
            client_handle: ptr::null_mut(),
        }
    }

    unsafe fn create(create_flags: u32) -> *mut c_void {
        let mut output = CreateOutput {
            size: size_of::<CreateOutput>() as u32,
            handle: ptr::null_mut(),
        };
        assert_eq!(
            ReturnCode::Ok,
            r600_tiling_create(&create_input(create_flags), &mut output)
        );
        assert!(!output.handle.is_null());
        output.handle
    }

    static NEUTRAL_ALLOCS: AtomicUsize = AtomicUsize::new(0);
    static NEUTRAL_FREES: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn neutral_alloc(input: *const AllocSysMemInput) -> *mut c_void {
        NEUTRAL_ALLOCS.fetch_add(1, Ordering::SeqCst);
        recording_alloc(input)
    }

    unsafe extern "C" fn neutral_free(input: *const FreeSysMemInput) -> u32 {
        NEUTRAL_FREES.fetch_add(1, Ordering::SeqCst);
        recording_free(input)
    }

    #[test]
    fn create_destroy_is_allocation_neutral() {
        unsafe {
            let mut input = create_input(0);
            input.callbacks.alloc_sys_mem = Some(neutral_alloc);
            input.callbacks.free_sys_mem = Some(neutral_free);

            let mut output = CreateOutput {
                size: size_of::<CreateOutput>() as u32,
                handle: ptr::null_mut(),
            };
            assert_eq!(ReturnCode::Ok, r600_tiling_create(&input, &mut output));
            assert_eq!(ReturnCode::Ok, r600_tiling_destroy(output.handle));

            assert_eq!(
                NEUTRAL_ALLOCS.load(Ordering::SeqCst),
                NEUTRAL_FREES.load(Ordering::SeqCst)
            );
            assert!(NEUTRAL_ALLOCS.load(Ordering::SeqCst) > 0);
        }
    }

    #[test]
    fn destroy_rejects_null_handle() {
        unsafe {
            assert_eq!(ReturnCode::Error, r600_tiling_destroy(ptr::null_mut()));
        }
    }

    #[test]
    fn create_requires_allocator_callbacks() {
        unsafe {
            let mut input = create_input(0);
            input.callbacks.alloc_sys_mem = None;

            let mut output = CreateOutput {
                size: size_of::<CreateOutput>() as u32,
                handle: ptr::null_mut(),
            };
            assert_eq!(ReturnCode::Error, r600_tiling_create(&input, &mut output));
        }
    }

    #[test]
    fn size_fields_are_validated_when_enabled() {
        unsafe {
            let fill = CreateFlags::FILL_SIZE_FIELDS.bits();

            // A wrong size at create is rejected outright.
            let mut input = create_input(fill);
            input.size -= 4;
            let mut output = CreateOutput {
                size: size_of::<CreateOutput>() as u32,
                handle: ptr::null_mut(),
            };
            assert_eq!(
                ReturnCode::ParamSizeMismatch,
                r600_tiling_create(&input, &mut output)
            );

            // With a live instance, each entry checks its own structs.
            let handle = create(fill);

            let info_in = ComputeSurfaceInfoInput {
                size: size_of::<ComputeSurfaceInfoInput>() as u32 - 4,
                tile_mode: TileMode::Tiled1DThin1 as u32,
                format: SurfaceFormat::FMT_8_8_8_8.0,
                bpp: 0,
                num_samples: 1,
                width: 64,
                height: 64,
                num_slices: 1,
                slice: 0,
                mip_level: 0,
                flags: 0,
                num_frags: 0,
                p_tile_info: ptr::null_mut(),
                tile_type: 0,
                tile_index: -1,
            };
            let mut info_out = ComputeSurfaceInfoOutput {
                size: size_of::<ComputeSurfaceInfoOutput>() as u32,
                ..std::mem::zeroed()
            };
            assert_eq!(
                ReturnCode::ParamSizeMismatch,
                r600_tiling_compute_surface_info(handle, &info_in, &mut info_out)
            );

            r600_tiling_destroy(handle);
        }
    }

    #[test]
    fn surface_info_matches_safe_api() {
        unsafe {
            let handle = create(0);

            let info_in = ComputeSurfaceInfoInput {
                size: size_of::<ComputeSurfaceInfoInput>() as u32,
                tile_mode: TileMode::Tiled1DThin1 as u32,
                format: SurfaceFormat::FMT_8_8_8_8.0,
                bpp: 0,
                num_samples: 1,
                width: 65,
                height: 65,
                num_slices: 1,
                slice: 0,
                mip_level: 0,
                flags: 0,
                num_frags: 0,
                p_tile_info: ptr::null_mut(),
                tile_type: 0,
                tile_index: -1,
            };
            let mut info_out = ComputeSurfaceInfoOutput {
                size: size_of::<ComputeSurfaceInfoOutput>() as u32,
                ..std::mem::zeroed()
            };
            assert_eq!(
                ReturnCode::Ok,
                r600_tiling_compute_surface_info(handle, &info_in, &mut info_out)
            );

            assert_eq!(72, info_out.pitch);
            assert_eq!(72, info_out.height);
            assert_eq!(72 * 72 * 4, info_out.surf_size);
            assert_eq!(TileMode::Tiled1DThin1 as u32, info_out.tile_mode);

            r600_tiling_destroy(handle);
        }
    }

    #[test]
    fn addr_and_failure_advisories() {
        unsafe {
            let handle = create(0);

            let mut addr_in = ComputeSurfaceAddrInput {
                size: size_of::<ComputeSurfaceAddrInput>() as u32,
                x: 40,
                y: 24,
                slice: 0,
                sample: 0,
                bpp: 32,
                pitch: 256,
                height: 256,
                num_slices: 1,
                num_samples: 1,
                tile_mode: TileMode::Tiled2BThin1 as u32,
                is_depth: 0,
                tile_base: 0,
                comp_bits: 0,
                pipe_swizzle: 0,
                bank_swizzle: 0,
                num_frags: 0,
                tile_type: 0,
                p_tile_info: ptr::null_mut(),
                tile_index: -1,
            };
            let mut addr_out = ComputeSurfaceAddrOutput {
                size: size_of::<ComputeSurfaceAddrOutput>() as u32,
                addr: 0,
                bit_position: 0,
            };
            assert_eq!(
                ReturnCode::Ok,
                r600_tiling_compute_surface_addr(handle, &addr_in, &mut addr_out)
            );
            assert_eq!(5376, addr_out.addr);

            // An out-of-range swizzle fails and pings the debug callback.
            let messages_before = DEBUG_MESSAGES.load(Ordering::SeqCst);
            addr_in.pipe_swizzle = 4;
            assert_eq!(
                ReturnCode::InvalidParams,
                r600_tiling_compute_surface_addr(handle, &addr_in, &mut addr_out)
            );
            assert!(DEBUG_MESSAGES.load(Ordering::SeqCst) > messages_before);

            r600_tiling_destroy(handle);
        }
    }

    #[test]
    fn swizzle_htile_and_slice_entries() {
        unsafe {
            let handle = create(0);

            let swizzle_in = ExtractBankPipeSwizzleInput {
                size: size_of::<ExtractBankPipeSwizzleInput>() as u32,
                base256b: 6,
                p_tile_info: ptr::null_mut(),
                tile_index: -1,
            };
            let mut swizzle_out = ExtractBankPipeSwizzleOutput {
                size: size_of::<ExtractBankPipeSwizzleOutput>() as u32,
                bank_swizzle: 0,
                pipe_swizzle: 0,
            };
            assert_eq!(
                ReturnCode::Ok,
                r600_tiling_extract_bank_pipe_swizzle(handle, &swizzle_in, &mut swizzle_out)
            );
            assert_eq!(2, swizzle_out.pipe_swizzle);
            assert_eq!(1, swizzle_out.bank_swizzle);

            let htile_in = ComputeHtileInfoInput {
                size: size_of::<ComputeHtileInfoInput>() as u32,
                pitch: 1024,
                height: 1024,
                num_slices: 1,
                is_linear: 1,
                block_width: 8,
                block_height: 8,
                p_tile_info: ptr::null_mut(),
                tile_index: -1,
            };
            let mut htile_out = ComputeHtileInfoOutput {
                size: size_of::<ComputeHtileInfoOutput>() as u32,
                ..std::mem::zeroed()
            };
            assert_eq!(
                ReturnCode::Ok,
                r600_tiling_compute_htile_info(handle, &htile_in, &mut htile_out)
            );
            assert_eq!(8192, htile_out.base_align);
            assert_eq!(65536, htile_out.htile_bytes);

            let slice_in = ComputeSliceSwizzleInput {
                size: size_of::<ComputeSliceSwizzleInput>() as u32,
                tile_mode: TileMode::Tiled2DThin1 as u32,
                base_swizzle: 3,
                slice: 2,
                base_addr: 0x10000,
                p_tile_info: ptr::null_mut(),
                tile_index: -1,
            };
            let mut slice_out = ComputeSliceSwizzleOutput {
                size: size_of::<ComputeSliceSwizzleOutput>() as u32,
                tile_swizzle: 0,
            };
            assert_eq!(
                ReturnCode::Ok,
                r600_tiling_compute_slice_swizzle(handle, &slice_in, &mut slice_out)
            );
            assert_eq!((0x10000u32 ^ (11 * 256)) >> 8, slice_out.tile_swizzle);

            r600_tiling_destroy(handle);
        }
    }
}
