#![no_main]

use libfuzzer_sys::fuzz_target;

use simd_csv_tokenizer::ReaderBuilder;

fuzz_target!(|data: &[u8]| {
    let mut reader = ReaderBuilder::with_capacity(0)
        .flexible(true)
        .from_reader(data)
        .unwrap();

    while let Ok(Some(mut record)) = reader.read_record() {
        for i in 0..record.len() {
            if record.field(i).is_err() {
                break;
            }
        }

        assert!(matches!(record.field(record.len()), Ok(None)));
    }
});
