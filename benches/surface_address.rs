use criterion::{criterion_group, criterion_main, Criterion};
use r600_tiling::{
    CreateFlags, CreateParams, SurfaceAddrRequest, SurfaceFormat, SurfaceInfoRequest, TileMode,
    Tiler, CHIP_ENGINE_R600,
};

use criterion::BenchmarkId;
use criterion::Throughput;

fn surface_addr_benchmark(c: &mut Criterion) {
    // 4 pipes, 4 banks, 256B interleave, 2KB rows, 256B swap, 2KB split.
    let tiler = Tiler::new(&CreateParams {
        chip_engine: CHIP_ENGINE_R600,
        chip_family: 0x51,
        chip_revision: 0,
        gb_tiling_config: 0x4904,
        flags: CreateFlags::empty(),
    })
    .unwrap();

    let mut group = c.benchmark_group("surface_addr");
    for tile_mode in [
        TileMode::LinearAligned,
        TileMode::Tiled1DThin1,
        TileMode::Tiled2DThin1,
        TileMode::Tiled2BThin1,
    ] {
        let info = tiler
            .surface_info(&SurfaceInfoRequest {
                tile_mode,
                format: SurfaceFormat::FMT_8_8_8_8,
                width: 512,
                height: 512,
                ..Default::default()
            })
            .unwrap();

        group.throughput(Throughput::Elements(512 * 512));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{tile_mode:?}")),
            &info,
            |b, info| {
                b.iter(|| {
                    let mut sum = 0u64;
                    for y in 0..512 {
                        for x in 0..512 {
                            let addr = tiler
                                .surface_addr(&SurfaceAddrRequest {
                                    x,
                                    y,
                                    bpp: info.bpp,
                                    pitch: info.pitch,
                                    height: info.height,
                                    num_slices: info.depth,
                                    tile_mode: info.tile_mode,
                                    ..Default::default()
                                })
                                .unwrap();
                            sum = sum.wrapping_add(addr.addr);
                        }
                    }
                    sum
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, surface_addr_benchmark);
criterion_main!(benches);
