use criterion::{black_box, criterion_group, criterion_main, Criterion};

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_END: u32 = 0x9;

/// Build a synthetic blob with a flat bus of `n` devices, each carrying
/// a handful of properties.
fn synthetic_blob(n: u32) -> Vec<u8> {
    let mut structure = Vec::new();
    let mut strings = Vec::new();

    let mut string_offset = |name: &str, strings: &mut Vec<u8>| -> u32 {
        let off = strings.len() as u32;
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
        off
    };

    let compatible_off = string_offset("compatible", &mut strings);
    let reg_off = string_offset("reg", &mut strings);
    let phandle_off = string_offset("phandle", &mut strings);

    let mut begin = |name: &str, structure: &mut Vec<u8>| {
        structure.extend_from_slice(&FDT_BEGIN_NODE.to_be_bytes());
        structure.extend_from_slice(name.as_bytes());
        structure.push(0);
        while structure.len() % 4 != 0 {
            structure.push(0);
        }
    };
    let prop = |nameoff: u32, value: &[u8], structure: &mut Vec<u8>| {
        structure.extend_from_slice(&FDT_PROP.to_be_bytes());
        structure.extend_from_slice(&(value.len() as u32).to_be_bytes());
        structure.extend_from_slice(&nameoff.to_be_bytes());
        structure.extend_from_slice(value);
        while structure.len() % 4 != 0 {
            structure.push(0);
        }
    };

    begin("", &mut structure);
    begin("soc", &mut structure);
    for i in 0..n {
        begin(&format!("device@{i}"), &mut structure);
        prop(compatible_off, b"acme,widget\0", &mut structure);
        prop(reg_off, &i.to_be_bytes(), &mut structure);
        prop(phandle_off, &(i + 1).to_be_bytes(), &mut structure);
        structure.extend_from_slice(&FDT_END_NODE.to_be_bytes());
    }
    structure.extend_from_slice(&FDT_END_NODE.to_be_bytes());
    structure.extend_from_slice(&FDT_END_NODE.to_be_bytes());
    structure.extend_from_slice(&FDT_END.to_be_bytes());

    let off_dt_struct = 40 + 16u32;
    let off_dt_strings = off_dt_struct + structure.len() as u32;
    let totalsize = off_dt_strings + strings.len() as u32;

    let mut blob = Vec::with_capacity(totalsize as usize);
    for field in [
        0xd00d_feed,
        totalsize,
        off_dt_struct,
        off_dt_strings,
        40,
        17,
        16,
        0,
        strings.len() as u32,
        structure.len() as u32,
    ] {
        blob.extend_from_slice(&field.to_be_bytes());
    }
    blob.extend_from_slice(&[0u8; 16]);
    blob.extend_from_slice(&structure);
    blob.extend_from_slice(&strings);
    blob
}

pub fn parse(c: &mut Criterion) {
    let blob = synthetic_blob(512);

    c.bench_function("Fdt::parse 512-device blob", |b| {
        b.iter(|| fdt_parser::Fdt::parse(black_box(&blob)).unwrap())
    });
}

criterion_group!(benches, parse);
criterion_main!(benches);
