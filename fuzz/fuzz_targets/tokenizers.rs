#![no_main]

use libfuzzer_sys::fuzz_target;

use simd_csv_tokenizer::{OwnedRecord, ReaderBuilder, Result};

fn read_all(data: &[u8], simd: bool) -> Vec<Result<OwnedRecord<u8>>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .simd(simd)
        .from_slice(data)
        .unwrap();

    let mut records = Vec::new();

    for record in reader.records() {
        let failed = record.is_err();
        records.push(record);

        if failed {
            break;
        }
    }

    records
}

fuzz_target!(|data: &[u8]| {
    let simd = read_all(data, true);
    let scalar = read_all(data, false);

    assert_eq!(simd.len(), scalar.len());

    for (a, b) in simd.iter().zip(scalar.iter()) {
        match (a, b) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
            _ => panic!("simd & scalar tokenizers disagree: {:?} / {:?}", a, b),
        }
    }
});
