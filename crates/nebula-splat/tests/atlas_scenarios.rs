//! End-to-end catalog loading and atlas builds through the public API.

use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use nebula_splat::{
    AtlasBuilder, FileFetcher, InternalFormat, MemoryFetcher, PixelFormat, SplatCatalog,
    SplatTextureDef,
};

fn load(fetcher: &MemoryFetcher, doc: &str) -> SplatCatalog {
    let fetcher = fetcher.clone().with_document("splat/catalog.ron", doc);
    SplatCatalog::read("splat/catalog.ron", &fetcher).unwrap()
}

fn build(fetcher: &MemoryFetcher, catalog: &mut SplatCatalog) -> SplatTextureDef {
    AtlasBuilder::new(fetcher).build(catalog)
}

fn texel(def: &SplatTextureDef, layer: u32) -> [u8; 4] {
    let atlas = def.rgbh_atlas.as_ref().unwrap();
    let bytes = atlas.layer_bytes(layer).unwrap();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn solid(width: u32, height: u32, px: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(px))
}

fn gray(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

#[test]
fn single_diffuse_entry_fills_two_layers() {
    let fetcher =
        MemoryFetcher::new().with_image("splat/rock.png", solid(16, 16, [90, 80, 70, 255]));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "rock", "lods": [ { "diffuse": "rock.png" } ] },
        ] } }"#,
    );

    let def = build(&fetcher, &mut catalog);

    assert!(def.has_atlas());
    assert_eq!(def.rgbh_atlas.as_ref().unwrap().layer_count(), 2);
    let rock = catalog.primitive("rock").unwrap();
    assert_eq!(rock.lods.lod(0).unwrap().texture_atlas_index(), Some(0));
    assert_eq!(texel(&def, 0), [90, 80, 70, 0]);
    assert_eq!(texel(&def, 1), [128, 128, 64, 51]);
}

#[test]
fn empty_catalog_is_not_loaded() {
    let fetcher = MemoryFetcher::new().with_document(
        "splat/catalog.ron",
        r#"{ "splat_catalog": { "name": "bare", "primitives": [], "classes": [] } }"#,
    );
    assert!(SplatCatalog::read("splat/catalog.ron", &fetcher).is_none());
}

#[test]
fn water_roughness_is_not_overridden() {
    let fetcher = MemoryFetcher::new()
        .with_image("splat/water.png", solid(8, 8, [20, 40, 120, 255]))
        .with_image("splat/water_rough.png", gray(8, 8, 51));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "water", "lods": [
                { "diffuse": "water.png", "roughness": "water_rough.png" },
            ] },
        ] } }"#,
    );

    let def = build(&fetcher, &mut catalog);

    let material = texel(&def, 1);
    assert_eq!(material[2], 255 - 51);
    assert_eq!(material[3], 51);
}

#[test]
fn water_without_smoothness_uses_water_default() {
    let fetcher =
        MemoryFetcher::new().with_image("splat/water.png", solid(8, 8, [20, 40, 120, 255]));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "water", "lods": [ { "diffuse": "water.png" } ] },
            { "name": "wet_sand", "lods": [ { "diffuse": "water.png" } ] },
        ] } }"#,
    );

    let def = build(&fetcher, &mut catalog);

    assert_eq!(texel(&def, 1)[2], 166);
    assert_eq!(texel(&def, 3)[2], 64);
}

#[test]
fn mixed_pixel_formats_are_converted_to_the_first() {
    let grass = RgbImage::from_pixel(8, 8, Rgb([30, 160, 40]));
    let fetcher = MemoryFetcher::new()
        .with_image("splat/grass.png", grass)
        .with_image("splat/snow.png", gray(8, 8, 240));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "grass", "lods": [ { "diffuse": "grass.png" } ] },
            { "name": "snow", "lods": [ { "diffuse": "snow.png" } ] },
        ] } }"#,
    );

    let def = build(&fetcher, &mut catalog);

    let atlas = def.rgbh_atlas.as_ref().unwrap();
    assert_eq!(atlas.layer_count(), 4);
    let snow = atlas.image(2).unwrap();
    assert_eq!(snow.pixel_format(), PixelFormat::Rgba);
    assert_eq!(snow.internal_format(), InternalFormat::Rgba8);
    assert_eq!(texel(&def, 2), [240, 240, 240, 0]);
}

#[test]
fn layers_take_the_first_diffuse_dimensions() {
    let fetcher = MemoryFetcher::new()
        .with_image("splat/a.png", solid(16, 8, [1, 2, 3, 255]))
        .with_image("splat/b.png", solid(64, 64, [4, 5, 6, 255]));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "a", "lods": [ { "diffuse": "a.png" } ] },
            { "name": "b", "lods": [ { "diffuse": "b.png" } ] },
        ] } }"#,
    );

    let def = build(&fetcher, &mut catalog);

    let atlas = def.rgbh_atlas.as_ref().unwrap();
    assert_eq!((atlas.width(), atlas.height()), (16, 8));
    for layer in 0..atlas.layer_count() {
        let image = atlas.image(layer).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
    }
    let desc = atlas.wgpu_descriptor(Some("splat")).unwrap();
    assert_eq!(desc.size.depth_or_array_layers, 4);
}

#[test]
fn lod_entries_without_diffuse_are_skipped() {
    let fetcher = MemoryFetcher::new().with_image("splat/rock.png", solid(4, 4, [9, 9, 9, 255]));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "rock", "lods": [
                { "max_level": 10, "height": "rock_h.png" },
                { "diffuse": "rock.png" },
            ] },
        ] } }"#,
    );

    let def = build(&fetcher, &mut catalog);

    let lods = &catalog.primitive("rock").unwrap().lods;
    assert_eq!(lods.lod(3).unwrap().texture_atlas_index(), None);
    assert_eq!(lods.lod(3).unwrap().atlas_index_or_unset(), -1);
    assert_eq!(lods.lod(11).unwrap().texture_atlas_index(), Some(0));

    let lut = def.lut_buffer.as_ref().unwrap();
    assert_eq!(lut.lookup("rock", 3).unwrap().atlas_index, -1);
    assert_eq!(lut.lookup("rock", 11).unwrap().atlas_index, 0);
}

#[test]
fn unusable_diffuse_drops_only_its_entry() {
    let fetcher = MemoryFetcher::new()
        .with_image("splat/blank.png", RgbaImage::new(0, 0))
        .with_image("splat/rock.png", solid(8, 8, [50, 60, 70, 255]));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "ash", "lods": [ { "diffuse": "blank.png" } ] },
            { "name": "rock", "lods": [
                { "max_level": 8, "diffuse": "blank.png" },
                { "diffuse": "rock.png" },
            ] },
        ] } }"#,
    );

    let def = build(&fetcher, &mut catalog);

    let ash = &catalog.primitive("ash").unwrap().lods;
    assert_eq!(ash.lod(0).unwrap().texture_atlas_index(), None);
    let rock = &catalog.primitive("rock").unwrap().lods;
    assert_eq!(rock.lod(0).unwrap().texture_atlas_index(), None);
    assert_eq!(rock.lod(9).unwrap().texture_atlas_index(), Some(0));

    let atlas = def.rgbh_atlas.as_ref().unwrap();
    assert_eq!(atlas.layer_count(), 2);
    assert_eq!((atlas.width(), atlas.height()), (8, 8));
    assert_eq!(texel(&def, 0), [50, 60, 70, 0]);
}

#[test]
fn rebuilding_is_idempotent() {
    let fetcher = MemoryFetcher::new()
        .with_image("splat/a.png", solid(4, 4, [1, 1, 1, 255]))
        .with_image("splat/b.png", solid(4, 4, [2, 2, 2, 255]));
    let mut catalog = load(
        &fetcher,
        r#"{ "splat_catalog": { "primitives": [
            { "name": "a", "lods": [
                { "max_level": 6, "diffuse": "a.png" },
                { "diffuse": "b.png" },
            ] },
            { "name": "b", "lods": [ { "diffuse": "b.png" } ] },
        ] } }"#,
    );

    let first = build(&fetcher, &mut catalog);
    let first_lut = first.lut_buffer.as_ref().unwrap().as_bytes().to_vec();
    let second = build(&fetcher, &mut catalog);

    let second_lut = second.lut_buffer.as_ref().unwrap().as_bytes();
    assert_eq!(second_lut, first_lut.as_slice());
    assert_eq!(
        first.rgbh_atlas.unwrap().layer_count(),
        second.rgbh_atlas.unwrap().layer_count()
    );
}

#[test]
fn catalog_builds_from_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let splat_dir = dir.path().join("splat");
    std::fs::create_dir_all(&splat_dir).unwrap();
    solid(8, 8, [100, 110, 120, 255])
        .save(splat_dir.join("dirt.png"))
        .unwrap();
    gray(8, 8, 77).save(splat_dir.join("dirt_h.png")).unwrap();
    std::fs::write(
        splat_dir.join("catalog.ron"),
        r#"{ "splat_catalog": { "name": "lowland", "primitives": [
            { "name": "dirt", "lods": [ { "diffuse": "dirt.png", "height": "dirt_h.png" } ] },
        ] } }"#,
    )
    .unwrap();

    let fetcher = FileFetcher::new(dir.path());
    let mut catalog = SplatCatalog::read("splat/catalog.ron", &fetcher).unwrap();
    assert_eq!(catalog.name.as_deref(), Some("lowland"));

    let def = AtlasBuilder::new(&fetcher).build(&mut catalog);
    assert!(def.has_atlas());
    assert_eq!(texel(&def, 0), [100, 110, 120, 77]);
}
