use std::fs::File;

use clap::Parser;
use simd_csv_tokenizer::ReaderBuilder;

#[derive(Parser, Debug)]
struct Args {
    /// Path to target CSV file
    path: String,

    /// Whether to use the `csv` crate instead, to diff outputs
    #[arg(long)]
    csv: bool,

    /// Whether to disable SIMD acceleration
    #[arg(long)]
    scalar: bool,
}

impl Args {
    fn delimiter(&self) -> u8 {
        if self.path.ends_with(".tsv") {
            b'\t'
        } else {
            b','
        }
    }
}

const BUFFER_CAPACITY: usize = 1024 * (1 << 10);

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let file = File::open(&args.path)?;
    let mut writer = csv::WriterBuilder::new().from_writer(std::io::stdout());

    if args.csv {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(args.delimiter())
            .has_headers(false)
            .from_reader(file);
        let mut record = csv::ByteRecord::new();

        while reader.read_byte_record(&mut record)? {
            writer.write_record(record.iter())?;
        }
    } else {
        let mut reader = ReaderBuilder::with_capacity(BUFFER_CAPACITY)
            .delimiter(args.delimiter())
            .simd(!args.scalar)
            .from_reader(file)?;

        for record in reader.records() {
            writer.write_record(record?.iter())?;
        }
    }

    writer.flush()?;

    Ok(())
}
